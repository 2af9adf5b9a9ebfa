// ABOUTME: Recursive-descent / Pratt parser turning a token stream into an AST

use crate::ast::{BinOp, Expr, Program, Stmt, UnOp};
use crate::error::{ParseError, TlError};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// Lexes and parses a complete TL source string.
pub fn parse(src: &str) -> Result<Program, TlError> {
    let tokens = Lexer::new(src).tokenize()?;
    Ok(Parser::new(tokens).parse_program()?)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ===== token stream helpers =====

    fn token_at(&self, offset: usize) -> &Token {
        let idx = self.pos + offset;
        if idx < self.tokens.len() {
            &self.tokens[idx]
        } else {
            self.tokens.last().expect("token stream always has Eof")
        }
    }

    fn peek(&self) -> &Token {
        self.token_at(0)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_operator(&self, op: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Operator) && self.peek().lexeme == op
    }

    fn is_operator_at(&self, offset: usize, op: &str) -> bool {
        let tok = self.token_at(offset);
        matches!(tok.kind, TokenKind::Operator) && tok.lexeme == op
    }

    fn is_identifier_at(&self, offset: usize) -> bool {
        matches!(self.token_at(offset).kind, TokenKind::Identifier)
    }

    fn describe(tok: &Token) -> String {
        match &tok.kind {
            TokenKind::Number => "a number".to_string(),
            TokenKind::String => "a string".to_string(),
            TokenKind::Identifier => format!("identifier '{}'", tok.lexeme),
            TokenKind::Operator => format!("'{}'", tok.lexeme),
            TokenKind::Keyword(_) => format!("keyword '{}'", tok.lexeme),
            TokenKind::Eof => "end of input".to_string(),
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<Token, ParseError> {
        if self.is_operator(op) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(ParseError::new(
                format!("'{}'", op),
                Self::describe(&tok),
                tok.lexeme,
                tok.offset,
            ))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<Token, ParseError> {
        if self.peek().kind == TokenKind::Keyword(kw) {
            Ok(self.advance())
        } else {
            let tok = self.peek().clone();
            Err(ParseError::new(
                format!("keyword '{:?}'", kw),
                Self::describe(&tok),
                tok.lexeme,
                tok.offset,
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if matches!(self.peek().kind, TokenKind::Identifier) {
            Ok(self.advance().lexeme)
        } else {
            let tok = self.peek().clone();
            Err(ParseError::new(
                "an identifier",
                Self::describe(&tok),
                tok.lexeme,
                tok.offset,
            ))
        }
    }

    /// Skips a `<...>` generic argument list after `List`, per spec.md 4.2:
    /// "Optional `List<...>` angle-bracket contents are consumed and
    /// ignored syntactically." Does not track nested `<`/`>` depth, matching
    /// the original implementation's simple scan-to-first-`>` behavior.
    fn skip_generic_args(&mut self) -> Result<(), ParseError> {
        if !self.is_operator("<") {
            return Ok(());
        }
        self.advance();
        loop {
            if self.is_operator(">") {
                self.advance();
                return Ok(());
            }
            if self.at_eof() {
                let tok = self.peek().clone();
                return Err(ParseError::new("'>'", "end of input", tok.lexeme, tok.offset));
            }
            self.advance();
        }
    }

    /// True when the current position starts a type-or-var token: one of
    /// the six type keywords, or a bare identifier immediately followed by
    /// another identifier (a custom type name before a declared name).
    fn looks_like_type_start(&self) -> bool {
        if matches!(
            self.peek().kind,
            TokenKind::Keyword(Keyword::Var)
                | TokenKind::Keyword(Keyword::Int)
                | TokenKind::Keyword(Keyword::Float)
                | TokenKind::Keyword(Keyword::String)
                | TokenKind::Keyword(Keyword::Bool)
                | TokenKind::Keyword(Keyword::List)
        ) {
            return true;
        }
        self.is_identifier_at(0) && self.is_identifier_at(1)
    }

    // ===== top level =====

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            if self.peek().kind == TokenKind::Keyword(Keyword::Using) {
                self.advance();
                self.expect_identifier()?;
                while self.is_operator(".") {
                    self.advance();
                    self.expect_identifier()?;
                }
                self.expect_operator(";")?;
                continue;
            }
            if self.peek().kind == TokenKind::Keyword(Keyword::Namespace) {
                self.advance();
                self.expect_identifier()?;
                let inner = self.parse_braced_block()?;
                body.push(Stmt::Block { body: inner });
                continue;
            }
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    fn parse_braced_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_operator("{")?;
        let mut body = Vec::new();
        while !self.is_operator("}") {
            if self.at_eof() {
                let tok = self.peek().clone();
                return Err(ParseError::new("'}'", "end of input", tok.lexeme, tok.offset));
            }
            body.push(self.parse_statement()?);
        }
        self.expect_operator("}")?;
        Ok(body)
    }

    // ===== statements =====

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.is_operator("{") {
            return Ok(Stmt::Block {
                body: self.parse_braced_block()?,
            });
        }
        match &self.peek().kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Foreach) => self.parse_foreach(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            _ if self.looks_like_type_start() => {
                if self.is_identifier_at(1) && self.is_operator_at(2, "(") {
                    self.parse_func_decl()
                } else {
                    self.parse_var_decl()
                }
            }
            _ => self.parse_expr_stmt_or_assign(),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::If)?;
        self.expect_operator("(")?;
        let cond = self.parse_expression()?;
        self.expect_operator(")")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.peek().kind == TokenKind::Keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::While)?;
        self.expect_operator("(")?;
        let cond = self.parse_expression()?;
        self.expect_operator(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::For)?;
        self.expect_operator("(")?;

        let init = if self.is_operator(";") {
            self.advance();
            None
        } else if self.looks_like_type_start() {
            Some(Box::new(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect_operator(";")?;
            Some(Box::new(Stmt::ExprStmt { expr }))
        };

        let cond = if self.is_operator(";") {
            self.advance();
            None
        } else {
            let expr = self.parse_expression()?;
            self.expect_operator(";")?;
            Some(expr)
        };

        let post = if self.is_operator(")") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_operator(")")?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            cond,
            post,
            body,
        })
    }

    fn parse_foreach(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Foreach)?;
        self.expect_operator("(")?;
        if self.looks_like_type_start() && !self.is_operator_at(1, "in") {
            // consume the optional declared type of the loop variable
            self.advance();
        }
        let var_name = self.expect_identifier()?;
        self.expect_keyword(Keyword::In)?;
        let seq_name = self.expect_identifier()?;
        self.expect_operator(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::Foreach {
            var_name,
            seq_name,
            body,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.expect_keyword(Keyword::Return)?;
        if self.is_operator(";") {
            self.advance();
            return Ok(Stmt::Return { value: None });
        }
        let value = self.parse_expression()?;
        self.expect_operator(";")?;
        Ok(Stmt::Return { value: Some(value) })
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, ParseError> {
        let type_tok = self.advance();
        let declared_type = type_tok.lexeme.clone();
        if declared_type == "List" {
            self.skip_generic_args()?;
        }
        let name = self.expect_identifier()?;
        let init = if self.is_operator("=") {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect_operator(";")?;
        Ok(Stmt::VarDecl {
            declared_type,
            name,
            init,
        })
    }

    fn parse_func_decl(&mut self) -> Result<Stmt, ParseError> {
        let type_tok = self.advance();
        let return_type = type_tok.lexeme.clone();
        if return_type == "List" {
            self.skip_generic_args()?;
        }
        let name = self.expect_identifier()?;
        self.expect_operator("(")?;
        let mut params = Vec::new();
        if !self.is_operator(")") {
            loop {
                // A parameter may have an optional type token before its
                // name (spec.md 4.2). Only consume one when it's genuinely
                // followed by another identifier, so bare untyped
                // parameters (`Add(a, b)`) parse correctly too.
                let has_type = matches!(
                    self.peek().kind,
                    TokenKind::Keyword(Keyword::Var)
                        | TokenKind::Keyword(Keyword::Int)
                        | TokenKind::Keyword(Keyword::Float)
                        | TokenKind::Keyword(Keyword::String)
                        | TokenKind::Keyword(Keyword::Bool)
                        | TokenKind::Keyword(Keyword::List)
                ) || (self.is_identifier_at(0) && self.is_identifier_at(1));
                if has_type {
                    let t = self.advance();
                    if t.lexeme == "List" {
                        self.skip_generic_args()?;
                    }
                }
                params.push(self.expect_identifier()?);
                if self.is_operator(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect_operator(")")?;
        let body = self.parse_braced_block()?;
        Ok(Stmt::FuncDecl {
            name,
            params,
            body,
            return_type,
        })
    }

    fn parse_expr_stmt_or_assign(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression()?;
        if matches!(expr, Expr::VarRef { .. } | Expr::Index { .. }) && self.is_operator("=") {
            self.advance();
            let value = self.parse_expression()?;
            self.expect_operator(";")?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
            });
        }
        self.expect_operator(";")?;
        Ok(Stmt::ExprStmt { expr })
    }

    // ===== expressions: Pratt / precedence climbing =====

    fn binop_prec(&self) -> Option<(BinOp, u8)> {
        if !matches!(self.peek().kind, TokenKind::Operator) {
            return None;
        }
        Some(match self.peek().lexeme.as_str() {
            "||" => (BinOp::Or, 1),
            "&&" => (BinOp::And, 2),
            "==" => (BinOp::Eq, 3),
            "!=" => (BinOp::NotEq, 3),
            "<" => (BinOp::Lt, 4),
            ">" => (BinOp::Gt, 4),
            "<=" => (BinOp::LtEq, 4),
            ">=" => (BinOp::GtEq, 4),
            "+" => (BinOp::Add, 5),
            "-" => (BinOp::Sub, 5),
            "*" => (BinOp::Mul, 6),
            "/" => (BinOp::Div, 6),
            "%" => (BinOp::Mod, 6),
            _ => return None,
        })
    }

    fn unop(&self) -> Option<UnOp> {
        if !matches!(self.peek().kind, TokenKind::Operator) {
            return None;
        }
        match self.peek().lexeme.as_str() {
            "-" => Some(UnOp::Neg),
            "!" => Some(UnOp::Not),
            "+" => Some(UnOp::Pos),
            _ => None,
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = self.binop_prec() {
            if prec < min_prec {
                break;
            }
            self.advance();
            // left-associative: the right side only grabs operators that
            // bind strictly tighter, so equal-precedence ties resolve left
            // to right.
            let right = self.parse_binary(prec + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = self.unop() {
            self.advance();
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary { op, operand });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Number => {
                self.advance();
                Ok(parse_number_literal(&tok.lexeme))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::StringLiteral { value: tok.lexeme })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::BoolLiteral { value: true })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::BoolLiteral { value: false })
            }
            TokenKind::Identifier | TokenKind::Keyword(Keyword::List) => self.parse_dotted_chain(),
            TokenKind::Operator if tok.lexeme == "(" => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_operator(")")?;
                Ok(expr)
            }
            _ => Err(ParseError::new(
                "an expression",
                Self::describe(&tok),
                tok.lexeme,
                tok.offset,
            )),
        }
    }

    /// Parses `ID ('.' ID)*` optionally followed by `(args)` (Call) or
    /// `[index]` (Index); otherwise a bare `VarRef`.
    fn parse_dotted_chain(&mut self) -> Result<Expr, ParseError> {
        let mut parts = vec![self.advance().lexeme];
        while self.is_operator(".") {
            self.advance();
            parts.push(self.expect_identifier()?);
        }
        let name = parts.join(".");

        if self.is_operator("(") {
            self.advance();
            let mut args = Vec::new();
            if !self.is_operator(")") {
                loop {
                    args.push(self.parse_expression()?);
                    if self.is_operator(",") {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            self.expect_operator(")")?;
            return Ok(Expr::Call { callee: name, args });
        }

        if self.is_operator("[") {
            self.advance();
            let index = Box::new(self.parse_expression()?);
            self.expect_operator("]")?;
            return Ok(Expr::Index { target: name, index });
        }

        Ok(Expr::VarRef { name })
    }
}

/// Classifies a number token as `IntLiteral` or `FloatLiteral` by the
/// presence of a decimal point, per spec.md section 3. Falls back to a
/// float on integer overflow rather than panicking.
fn parse_number_literal(lexeme: &str) -> Expr {
    if lexeme.contains('.') {
        Expr::FloatLiteral {
            value: lexeme.parse().expect("lexer only emits valid float text"),
        }
    } else {
        match lexeme.parse::<i64>() {
            Ok(value) => Expr::IntLiteral { value },
            Err(_) => Expr::FloatLiteral {
                value: lexeme.parse().expect("lexer only emits valid digit text"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        parse(src).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", src, e))
    }

    #[test]
    fn parses_var_decl_with_initializer() {
        let prog = parse_ok("var x = 5;");
        assert_eq!(prog.body.len(), 1);
        match &prog.body[0] {
            Stmt::VarDecl {
                declared_type,
                name,
                init,
            } => {
                assert_eq!(declared_type, "var");
                assert_eq!(name, "x");
                assert!(matches!(init, Some(Expr::IntLiteral { value: 5 })));
            }
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_with_untyped_params() {
        let prog = parse_ok("int Add(a, b) { return a + b; }");
        match &prog.body[0] {
            Stmt::FuncDecl {
                name,
                params,
                return_type,
                body,
            } => {
                assert_eq!(name, "Add");
                assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
                assert_eq!(return_type, "int");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected FuncDecl, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_call_as_expr_stmt() {
        let prog = parse_ok("Add(2, 3);");
        match &prog.body[0] {
            Stmt::ExprStmt {
                expr: Expr::Call { callee, args },
            } => {
                assert_eq!(callee, "Add");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected ExprStmt(Call), got {:?}", other),
        }
    }

    #[test]
    fn precedence_matches_spec_example() {
        // 1 + 2 * 3 must parse as 1 + (2 * 3)
        let prog = parse_ok("1 + 2 * 3;");
        match &prog.body[0] {
            Stmt::ExprStmt {
                expr:
                    Expr::Binary {
                        op: BinOp::Add,
                        right,
                        ..
                    },
            } => {
                assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn left_associative_on_equal_precedence() {
        // 10 - 3 - 2 must parse as (10 - 3) - 2
        let prog = parse_ok("10 - 3 - 2;");
        match &prog.body[0] {
            Stmt::ExprStmt {
                expr:
                    Expr::Binary {
                        op: BinOp::Sub,
                        left,
                        ..
                    },
            } => {
                assert!(matches!(**left, Expr::Binary { op: BinOp::Sub, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn unary_stacks_right_associatively() {
        let prog = parse_ok("!!true;");
        match &prog.body[0] {
            Stmt::ExprStmt {
                expr: Expr::Unary {
                    op: UnOp::Not,
                    operand,
                },
            } => {
                assert!(matches!(**operand, Expr::Unary { op: UnOp::Not, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn parses_list_call_and_index() {
        let prog = parse_ok("var xs = List(); xs[0];");
        match &prog.body[1] {
            Stmt::ExprStmt {
                expr: Expr::Index { target, .. },
            } => assert_eq!(target, "xs"),
            other => panic!("unexpected shape: {:?}", other),
        }
        match &prog.body[0] {
            Stmt::VarDecl { init: Some(Expr::Call { callee, args }), .. } => {
                assert_eq!(callee, "List");
                assert!(args.is_empty());
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn parses_dotted_console_call() {
        let prog = parse_ok(r#"Console.WriteLine("hi");"#);
        match &prog.body[0] {
            Stmt::ExprStmt {
                expr: Expr::Call { callee, args },
            } => {
                assert_eq!(callee, "Console.WriteLine");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn using_and_namespace_are_flattened() {
        let prog = parse_ok("using System; namespace Foo { var x = 1; }");
        assert_eq!(prog.body.len(), 1);
        assert!(matches!(prog.body[0], Stmt::Block { .. }));
    }

    #[test]
    fn assignment_vs_expr_stmt() {
        let prog = parse_ok("x = 5; foo();");
        assert!(matches!(prog.body[0], Stmt::Assign { .. }));
        assert!(matches!(prog.body[1], Stmt::ExprStmt { .. }));
    }

    #[test]
    fn for_loop_all_three_parts() {
        let prog = parse_ok("for (var i = 0; i < 5; i = i + 1) { }");
        match &prog.body[0] {
            Stmt::For {
                init,
                cond,
                post,
                body: _,
            } => {
                assert!(matches!(init, Some(boxed) if matches!(**boxed, Stmt::VarDecl { .. })));
                assert!(cond.is_some());
                assert!(post.is_some());
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn for_loop_all_parts_empty() {
        let prog = parse_ok("for (;;) { }");
        match &prog.body[0] {
            Stmt::For {
                init, cond, post, ..
            } => {
                assert!(init.is_none());
                assert!(cond.is_none());
                assert!(post.is_none());
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn foreach_parses_loop_variable_and_sequence() {
        let prog = parse_ok("foreach (var x in xs) { Console.WriteLine(x); }");
        match &prog.body[0] {
            Stmt::Foreach {
                var_name, seq_name, ..
            } => {
                assert_eq!(var_name, "x");
                assert_eq!(seq_name, "xs");
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn parse_error_reports_offset_and_expectation() {
        let err = parse("var x = ;").unwrap_err();
        match err {
            TlError::Parse(e) => {
                assert_eq!(e.offset, 8);
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn list_generic_annotation_is_ignored() {
        let prog = parse_ok("List<int> xs = List();");
        match &prog.body[0] {
            Stmt::VarDecl { declared_type, .. } => assert_eq!(declared_type, "List"),
            other => panic!("unexpected shape: {:?}", other),
        }
    }
}
