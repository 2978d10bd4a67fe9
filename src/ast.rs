// File: src/ast.rs
//
// Abstract syntax tree for the keai language. The parser produces these
// nodes and the interpreter walks them; nothing else in the crate needs
// to know about their shape.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// Raw literal text; interpolation happens at evaluation time.
    Str(String),
    Prefix {
        op: String,
        right: Box<Expr>,
    },
    /// `name++` / `name--`; only valid directly after an identifier.
    Postfix {
        op: String,
        name: String,
    },
    Infix {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Vec<Stmt>,
        alternative: Option<Vec<Stmt>>,
    },
    /// `for cond { body }`; the body runs in the enclosing environment.
    For {
        condition: Box<Expr>,
        body: Vec<Stmt>,
    },
    /// `foreach ident [, index] in iterable { body }`
    Foreach {
        ident: String,
        index: Option<String>,
        iterable: Box<Expr>,
        body: Vec<Stmt>,
    },
    Function {
        parameters: Vec<String>,
        defaults: Vec<(String, Expr)>,
        body: Vec<Stmt>,
        docstring: Option<String>,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Hash(Vec<(Expr, Expr)>),
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    /// `import <path-expr>`; `literal` is the path text as written, used
    /// as the module cache key.
    Import {
        path: Box<Expr>,
        literal: String,
    },
    /// `...name` — the named array, marked as current-args.
    Spread(String),
    /// Bare `...` — the enclosing call's arguments.
    CurrentArgs,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let { name: String, value: Expr },
    Mutable { name: String, value: Expr },
    Return(Expr),
    Assign { name: String, op: String, value: Expr },
    Expr(Expr),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Integer(n) => write!(f, "{}", n),
            Expr::Float(n) => write!(f, "{}", n),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Null => write!(f, "null"),
            Expr::Str(s) => write!(f, "{}", s),
            Expr::Prefix { op, right } => write!(f, "({}{})", op, right),
            Expr::Postfix { op, name } => write!(f, "({}{})", name, op),
            Expr::Infix { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Index { left, index } => match index.as_ref() {
                Expr::Str(name) => write!(f, "{}.{}", left, name),
                other => write!(f, "{}[{}]", left, other),
            },
            Expr::Call { function, arguments } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", function, args.join(", "))
            }
            Expr::Function { parameters, .. } => write!(f, "fn({})", parameters.join(", ")),
            Expr::Array(elements) => {
                let parts: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Expr::Hash(pairs) => {
                let parts: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Expr::Import { literal, .. } => write!(f, "import {}", literal),
            Expr::Spread(name) => write!(f, "...{}", name),
            Expr::CurrentArgs => write!(f, "..."),
            Expr::If { .. } => write!(f, "if"),
            Expr::For { .. } => write!(f, "for"),
            Expr::Foreach { .. } => write!(f, "foreach"),
        }
    }
}
