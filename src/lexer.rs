// ABOUTME: Lexer module turning TL source text into a stream of tokens

use crate::error::LexError;

/// Reserved words recognized by the lexer; an identifier lexeme matching one
/// of these is reclassified as `TokenKind::Keyword`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Keyword {
    If,
    Else,
    While,
    For,
    Foreach,
    In,
    Return,
    Namespace,
    Using,
    Var,
    Int,
    Float,
    String,
    Bool,
    List,
    True,
    False,
}

impl Keyword {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "foreach" => Keyword::Foreach,
            "in" => Keyword::In,
            "return" => Keyword::Return,
            "namespace" => Keyword::Namespace,
            "using" => Keyword::Using,
            "var" => Keyword::Var,
            "int" => Keyword::Int,
            "float" => Keyword::Float,
            "string" => Keyword::String,
            "bool" => Keyword::Bool,
            "List" => Keyword::List,
            "true" => Keyword::True,
            "false" => Keyword::False,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Operator,
    Keyword(Keyword),
    Eof,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Original source text for the token (decoded string contents for
    /// `String` tokens, the literal punctuation for `Operator`, etc).
    pub lexeme: String,
    /// Byte offset into the source where the token begins.
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            offset,
        }
    }
}

/// Multi-character operators, longest first so the scanner never matches a
/// prefix (`=`) before the full form (`==`).
const MULTI_CHAR_OPS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||"];
const SINGLE_CHAR_OPS: &str = "+-*/%<>=!.,;:{}()[]";

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenizes the whole source, returning tokens followed by one `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let start = self.pos;
            if self.pos >= self.bytes.len() {
                tokens.push(Token::new(TokenKind::Eof, "", start));
                return Ok(tokens);
            }

            let c = self.bytes[self.pos] as char;

            if c.is_ascii_digit() {
                tokens.push(self.lex_number(start));
                continue;
            }
            if c == '"' {
                tokens.push(self.lex_string(start)?);
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                tokens.push(self.lex_identifier(start));
                continue;
            }
            if let Some(op) = self.try_lex_operator() {
                tokens.push(op);
                continue;
            }

            return Err(LexError {
                message: format!("unrecognized character '{}'", c),
                offset: start,
            });
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_whitespace() {
                self.pos += 1;
            }
            if self.pos + 1 < self.bytes.len()
                && self.bytes[self.pos] == b'/'
                && self.bytes[self.pos + 1] == b'/'
            {
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos < self.bytes.len()
            && self.bytes[self.pos] == b'.'
            && self.pos + 1 < self.bytes.len()
            && (self.bytes[self.pos + 1] as char).is_ascii_digit()
        {
            self.pos += 1;
            while self.pos < self.bytes.len() && (self.bytes[self.pos] as char).is_ascii_digit() {
                self.pos += 1;
            }
        }
        Token::new(TokenKind::Number, &self.src[start..self.pos], start)
    }

    fn lex_string(&mut self, start: usize) -> Result<Token, LexError> {
        self.pos += 1; // opening quote
        let mut decoded = std::string::String::new();
        loop {
            if self.pos >= self.bytes.len() {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    offset: start,
                });
            }
            let c = self.bytes[self.pos] as char;
            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    if self.pos >= self.bytes.len() {
                        return Err(LexError {
                            message: "unterminated escape sequence".to_string(),
                            offset: start,
                        });
                    }
                    let escaped = self.bytes[self.pos] as char;
                    decoded.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        other => other,
                    });
                    self.pos += 1;
                }
                other => {
                    decoded.push(other);
                    self.pos += 1;
                }
            }
        }
        Ok(Token::new(TokenKind::String, decoded, start))
    }

    fn lex_identifier(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos] as char;
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let lexeme = &self.src[start..self.pos];
        match Keyword::from_str(lexeme) {
            Some(kw) => Token::new(TokenKind::Keyword(kw), lexeme, start),
            None => Token::new(TokenKind::Identifier, lexeme, start),
        }
    }

    fn try_lex_operator(&mut self) -> Option<Token> {
        let start = self.pos;
        let remaining = &self.src[self.pos..];
        for op in MULTI_CHAR_OPS {
            if remaining.starts_with(op) {
                self.pos += op.len();
                return Some(Token::new(TokenKind::Operator, *op, start));
            }
        }
        let c = self.bytes[self.pos] as char;
        if SINGLE_CHAR_OPS.contains(c) {
            self.pos += 1;
            return Some(Token::new(TokenKind::Operator, c.to_string(), start));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_number_literals() {
        let tokens = Lexer::new("42 3.14").tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].lexeme, "3.14");
    }

    #[test]
    fn number_has_no_leading_dot_form() {
        // `.5` is not a valid TL number: the leading `.` lexes as an operator.
        let tokens = Lexer::new(".5").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Operator);
        assert_eq!(tokens[0].lexeme, ".");
        assert_eq!(tokens[1].lexeme, "5");
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = Lexer::new(r#""a\nb\tc\\d\"e""#).tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "a\nb\tc\\d\"e");
    }

    #[test]
    fn reclassifies_reserved_words_as_keywords() {
        let tokens = Lexer::new("if else foo").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::If));
        assert_eq!(tokens[1].kind, TokenKind::Keyword(Keyword::Else));
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn prefers_multi_char_operators_over_prefixes() {
        let tokens = Lexer::new("== != <= >= && ||").tokenize().unwrap();
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(lexemes, vec!["==", "!=", "<=", ">=", "&&", "||", ""]);
    }

    #[test]
    fn skips_whitespace_and_line_comments() {
        let kinds = kinds("// a comment\n  42 // trailing\n");
        assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn ends_with_eof_sentinel() {
        let tokens = Lexer::new("").tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn reports_offset_on_unrecognized_character() {
        let err = Lexer::new("x = @;").tokenize().unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn identifiers_allow_leading_underscore_and_digits() {
        let tokens = Lexer::new("_foo1 bar_2").tokenize().unwrap();
        assert_eq!(tokens[0].lexeme, "_foo1");
        assert_eq!(tokens[1].lexeme, "bar_2");
    }
}
