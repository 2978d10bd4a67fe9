// File: src/parser.rs
//
// Recursive-descent parser with precedence climbing for the keai
// language. Errors are accumulated rather than aborting the parse; the
// caller decides whether they are fatal (batch mode) or merely reported
// (REPL, module import).

use crate::ast::{Expr, Stmt};
use crate::lexer::{Token, TokenKind};

const LOWEST: u8 = 0;
const COND: u8 = 1; // && ||
const BIT_OR: u8 = 2; // |
const BIT_XOR: u8 = 3; // ^
const BIT_AND: u8 = 4; // &
const EQUALS: u8 = 5; // == !=
const COMPARE: u8 = 6; // < <= > >=
const SHIFT: u8 = 7; // << >>
const RANGE: u8 = 8; // ..
const SUM: u8 = 9; // + -
const PRODUCT: u8 = 10; // * / %
const POWER: u8 = 11; // **
const PREFIX: u8 = 12; // ! - ~
const CALL: u8 = 13; // () [] .

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/="];

fn infix_precedence(op: &str) -> Option<u8> {
    let prec = match op {
        "&&" | "||" => COND,
        "|" => BIT_OR,
        "^" => BIT_XOR,
        "&" => BIT_AND,
        "==" | "!=" => EQUALS,
        "<" | "<=" | ">" | ">=" => COMPARE,
        "<<" | ">>" => SHIFT,
        ".." => RANGE,
        "+" | "-" => SUM,
        "*" | "/" | "%" => PRODUCT,
        "**" => POWER,
        _ => return None,
    };
    Some(prec)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    errors: Vec<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, depth: 0, errors: Vec::new() }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn peek(&self) -> &TokenKind {
        self.tokens.get(self.pos).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens.get(self.pos + offset).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn line(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.line).unwrap_or(0)
    }

    fn advance(&mut self) -> TokenKind {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(format!("line {}: {}", self.line(), message.into()));
    }

    fn expect_punct(&mut self, c: char) -> bool {
        if self.peek() == &TokenKind::Punctuation(c) {
            self.advance();
            true
        } else {
            self.error(format!("expected `{}`, got {:?}", c, self.peek()));
            false
        }
    }

    fn skip_semicolons(&mut self) {
        while self.peek() == &TokenKind::Punctuation(';') {
            self.advance();
        }
    }

    /// Parses a whole program.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        self.skip_semicolons();
        while self.peek() != &TokenKind::Eof {
            let before = self.pos;
            if let Some(stmt) = self.parse_stmt() {
                stmts.push(stmt);
            }
            // always make progress, even on a parse error
            if self.pos == before {
                self.advance();
            }
            self.skip_semicolons();
        }
        stmts
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        match self.peek() {
            TokenKind::Keyword(k) if k == "let" => self.parse_let(),
            TokenKind::Keyword(k) if k == "mutable" => self.parse_mutable(),
            TokenKind::Keyword(k) if k == "return" => self.parse_return(),
            TokenKind::Identifier(_) => {
                if let TokenKind::Operator(op) = self.peek_at(1) {
                    if ASSIGN_OPS.contains(&op.as_str()) {
                        return self.parse_assign();
                    }
                }
                self.parse_expr(LOWEST).map(Stmt::Expr)
            }
            _ => self.parse_expr(LOWEST).map(Stmt::Expr),
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        match self.advance() {
            TokenKind::Identifier(name) => Some(name),
            other => {
                self.error(format!("expected identifier, got {:?}", other));
                None
            }
        }
    }

    fn parse_let(&mut self) -> Option<Stmt> {
        self.advance(); // let
        let name = self.parse_name()?;
        if !matches!(self.peek(), TokenKind::Operator(op) if op == "=") {
            self.error("expected `=` after let name");
            return None;
        }
        self.advance();
        let value = self.parse_expr(LOWEST)?;
        Some(Stmt::Let { name, value })
    }

    fn parse_mutable(&mut self) -> Option<Stmt> {
        if self.depth == 0 {
            self.error("`mutable` is only allowed inside a block; use `let` at the top level");
        }
        self.advance(); // mutable
        let name = self.parse_name()?;
        if !matches!(self.peek(), TokenKind::Operator(op) if op == "=") {
            self.error("expected `=` after mutable name");
            return None;
        }
        self.advance();
        let value = self.parse_expr(LOWEST)?;
        Some(Stmt::Mutable { name, value })
    }

    fn parse_return(&mut self) -> Option<Stmt> {
        self.advance(); // return
        match self.peek() {
            TokenKind::Punctuation('}') | TokenKind::Punctuation(';') | TokenKind::Eof => {
                Some(Stmt::Return(Expr::Null))
            }
            _ => Some(Stmt::Return(self.parse_expr(LOWEST)?)),
        }
    }

    fn parse_assign(&mut self) -> Option<Stmt> {
        let name = self.parse_name()?;
        let op = match self.advance() {
            TokenKind::Operator(op) => op,
            _ => unreachable!("caller checked the assignment operator"),
        };
        let value = self.parse_expr(LOWEST)?;
        Some(Stmt::Assign { name, op, value })
    }

    /// Parses a `{ ... }` block and returns its statements.
    fn parse_block(&mut self) -> Option<Vec<Stmt>> {
        if !self.expect_punct('{') {
            return None;
        }
        self.depth += 1;
        let mut stmts = Vec::new();
        self.skip_semicolons();
        while self.peek() != &TokenKind::Punctuation('}') && self.peek() != &TokenKind::Eof {
            let before = self.pos;
            if let Some(stmt) = self.parse_stmt() {
                stmts.push(stmt);
            }
            if self.pos == before {
                self.advance();
            }
            self.skip_semicolons();
        }
        self.depth -= 1;
        self.expect_punct('}');
        Some(stmts)
    }

    fn parse_expr(&mut self, precedence: u8) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        loop {
            match self.peek() {
                TokenKind::Operator(op) => {
                    let op = op.clone();
                    match infix_precedence(&op) {
                        Some(prec) if prec > precedence => {
                            self.advance();
                            let right = self.parse_expr(prec)?;
                            left = Expr::Infix { left: Box::new(left), op, right: Box::new(right) };
                        }
                        _ => break,
                    }
                }
                TokenKind::Punctuation('(') if CALL > precedence => {
                    self.advance();
                    let arguments = self.parse_expr_list(')')?;
                    left = Expr::Call { function: Box::new(left), arguments };
                }
                TokenKind::Punctuation('[') if CALL > precedence => {
                    self.advance();
                    let index = self.parse_expr(LOWEST)?;
                    self.expect_punct(']');
                    left = Expr::Index { left: Box::new(left), index: Box::new(index) };
                }
                TokenKind::Punctuation('.') if CALL > precedence => {
                    self.advance();
                    let member = self.parse_name()?;
                    left = Expr::Index { left: Box::new(left), index: Box::new(Expr::Str(member)) };
                }
                _ => break,
            }
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.advance() {
            TokenKind::Int(n) => Some(Expr::Integer(n)),
            TokenKind::Float(n) => Some(Expr::Float(n)),
            TokenKind::Str(s) => Some(Expr::Str(s)),
            TokenKind::Bool(b) => Some(Expr::Bool(b)),
            TokenKind::Keyword(k) if k == "null" => Some(Expr::Null),
            TokenKind::Identifier(name) => {
                // postfix increment/decrement binds directly to the name
                if let TokenKind::Operator(op) = self.peek() {
                    if op == "++" || op == "--" {
                        let op = op.clone();
                        self.advance();
                        return Some(Expr::Postfix { op, name });
                    }
                }
                Some(Expr::Identifier(name))
            }
            TokenKind::Operator(op) if op == "!" || op == "-" || op == "~" => {
                let right = self.parse_expr(PREFIX)?;
                Some(Expr::Prefix { op, right: Box::new(right) })
            }
            TokenKind::Operator(op) if op == "..." => match self.peek() {
                TokenKind::Identifier(_) => {
                    let name = self.parse_name()?;
                    Some(Expr::Spread(name))
                }
                _ => Some(Expr::CurrentArgs),
            },
            TokenKind::Punctuation('(') => {
                let expr = self.parse_expr(LOWEST)?;
                self.expect_punct(')');
                Some(expr)
            }
            TokenKind::Punctuation('[') => {
                let elements = self.parse_expr_list(']')?;
                Some(Expr::Array(elements))
            }
            TokenKind::Punctuation('{') => self.parse_hash(),
            TokenKind::Keyword(k) if k == "fn" => self.parse_function(),
            TokenKind::Keyword(k) if k == "if" => self.parse_if(),
            TokenKind::Keyword(k) if k == "for" => self.parse_for(),
            TokenKind::Keyword(k) if k == "foreach" => self.parse_foreach(),
            TokenKind::Keyword(k) if k == "import" => self.parse_import(),
            other => {
                self.error(format!("unexpected token {:?}", other));
                None
            }
        }
    }

    /// Parses a comma-separated expression list up to the closing
    /// punctuation (already past the opener).
    fn parse_expr_list(&mut self, close: char) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        if self.peek() == &TokenKind::Punctuation(close) {
            self.advance();
            return Some(items);
        }
        items.push(self.parse_expr(LOWEST)?);
        while self.peek() == &TokenKind::Punctuation(',') {
            self.advance();
            if self.peek() == &TokenKind::Punctuation(close) {
                break; // trailing comma
            }
            items.push(self.parse_expr(LOWEST)?);
        }
        self.expect_punct(close);
        Some(items)
    }

    fn parse_hash(&mut self) -> Option<Expr> {
        let mut pairs = Vec::new();
        if self.peek() == &TokenKind::Punctuation('}') {
            self.advance();
            return Some(Expr::Hash(pairs));
        }
        loop {
            let key = self.parse_expr(LOWEST)?;
            self.expect_punct(':');
            let value = self.parse_expr(LOWEST)?;
            pairs.push((key, value));
            if self.peek() == &TokenKind::Punctuation(',') {
                self.advance();
                if self.peek() == &TokenKind::Punctuation('}') {
                    break;
                }
            } else {
                break;
            }
        }
        self.expect_punct('}');
        Some(Expr::Hash(pairs))
    }

    fn parse_function(&mut self) -> Option<Expr> {
        if !self.expect_punct('(') {
            return None;
        }
        let mut parameters = Vec::new();
        let mut defaults = Vec::new();
        while self.peek() != &TokenKind::Punctuation(')') && self.peek() != &TokenKind::Eof {
            match self.advance() {
                TokenKind::Identifier(name) => {
                    if matches!(self.peek(), TokenKind::Operator(op) if op == "=") {
                        self.advance();
                        let default = self.parse_expr(LOWEST)?;
                        defaults.push((name.clone(), default));
                    }
                    parameters.push(name);
                }
                // a bare `...` parameter list; arguments arrive as
                // current-args instead of named bindings
                TokenKind::Operator(op) if op == "..." => {}
                other => {
                    self.error(format!("unexpected token in parameter list: {:?}", other));
                    return None;
                }
            }
            if self.peek() == &TokenKind::Punctuation(',') {
                self.advance();
            }
        }
        self.expect_punct(')');

        let body = self.parse_block()?;
        let docstring = match body.first() {
            Some(Stmt::Expr(Expr::Str(s))) => Some(s.clone()),
            _ => None,
        };
        Some(Expr::Function { parameters, defaults, body, docstring })
    }

    fn parse_if(&mut self) -> Option<Expr> {
        let condition = self.parse_expr(LOWEST)?;
        let consequence = self.parse_block()?;
        let alternative = if matches!(self.peek(), TokenKind::Keyword(k) if k == "else") {
            self.advance();
            if matches!(self.peek(), TokenKind::Keyword(k) if k == "if") {
                self.advance();
                let nested = self.parse_if()?;
                Some(vec![Stmt::Expr(nested)])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Some(Expr::If { condition: Box::new(condition), consequence, alternative })
    }

    fn parse_for(&mut self) -> Option<Expr> {
        let condition = self.parse_expr(LOWEST)?;
        let body = self.parse_block()?;
        Some(Expr::For { condition: Box::new(condition), body })
    }

    fn parse_foreach(&mut self) -> Option<Expr> {
        let ident = self.parse_name()?;
        let index = if self.peek() == &TokenKind::Punctuation(',') {
            self.advance();
            Some(self.parse_name()?)
        } else {
            None
        };
        if !matches!(self.peek(), TokenKind::Keyword(k) if k == "in") {
            self.error("expected `in` in foreach");
            return None;
        }
        self.advance();
        let iterable = self.parse_expr(LOWEST)?;
        let body = self.parse_block()?;
        Some(Expr::Foreach { ident, index, iterable: Box::new(iterable), body })
    }

    fn parse_import(&mut self) -> Option<Expr> {
        let path = self.parse_expr(PREFIX)?;
        let literal = path.to_string();
        Some(Expr::Import { path: Box::new(path), literal })
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::ast::{Expr, Stmt};
    use crate::lexer::tokenize;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let mut parser = Parser::new(tokenize(source));
        let program = parser.parse();
        (program, parser.errors().to_vec())
    }

    #[test]
    fn test_dot_access_parses_to_string_index() {
        let (program, errors) = parse("xs.map(f)");
        assert!(errors.is_empty(), "{:?}", errors);
        match &program[0] {
            Stmt::Expr(Expr::Call { function, .. }) => match function.as_ref() {
                Expr::Index { index, .. } => {
                    assert!(matches!(index.as_ref(), Expr::Str(s) if s == "map"))
                }
                other => panic!("expected index expression, got {:?}", other),
            },
            other => panic!("expected call statement, got {:?}", other),
        }
    }

    #[test]
    fn test_mutable_rejected_at_top_level() {
        let (_, errors) = parse("mutable x = 1");
        assert!(!errors.is_empty());

        let (_, errors) = parse("if true { mutable x = 1 }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_function_defaults_and_docstring() {
        let (program, errors) = parse(r#"let f = fn(a, b = 2) { "adds things" return a + b }"#);
        assert!(errors.is_empty(), "{:?}", errors);
        match &program[0] {
            Stmt::Let { value: Expr::Function { parameters, defaults, docstring, .. }, .. } => {
                assert_eq!(parameters, &vec!["a".to_string(), "b".to_string()]);
                assert_eq!(defaults.len(), 1);
                assert_eq!(docstring.as_deref(), Some("adds things"));
            }
            other => panic!("expected function let, got {:?}", other),
        }
    }

    #[test]
    fn test_dotted_let_binds_single_name() {
        let (program, errors) = parse("let array.twice = fn() { return self }");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(matches!(&program[0], Stmt::Let { name, .. } if name == "array.twice"));
    }

    #[test]
    fn test_postfix_binds_to_identifier() {
        let (program, errors) = parse("i++");
        assert!(errors.is_empty(), "{:?}", errors);
        assert!(
            matches!(&program[0], Stmt::Expr(Expr::Postfix { op, name }) if op == "++" && name == "i")
        );
    }

    #[test]
    fn test_precedence_of_range_and_arithmetic() {
        let (program, errors) = parse("1 + 2 * 3");
        assert!(errors.is_empty(), "{:?}", errors);
        // (1 + (2 * 3))
        assert_eq!(format!("{:?}", program[0]).matches("Infix").count(), 2);

        let (program, errors) = parse("0 .. n - 1");
        assert!(errors.is_empty(), "{:?}", errors);
        match &program[0] {
            Stmt::Expr(Expr::Infix { op, .. }) => assert_eq!(op, ".."),
            other => panic!("expected range at the top, got {:?}", other),
        }
    }
}
