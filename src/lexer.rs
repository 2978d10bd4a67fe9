// File: src/lexer.rs
//
// Lexical analyzer for the keai language. Converts source text into a
// stream of tokens for the parser.
//
// Two points worth knowing:
// - Identifiers may contain dots, but only when the leading segment is a
//   known namespace prefix. `math.sqrt` is a single identifier (it names
//   a registry entry or a stdlib binding), while `xs.map` lexes as three
//   tokens and becomes method resolution in the parser.
// - String literals keep their backslash escapes verbatim (apart from
//   `\"`, which must be collapsed so it doesn't terminate the literal).
//   Un-escaping is the job of `print`, not the lexer.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Keyword(String),
    Operator(String),
    Punctuation(char),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Namespace prefixes that keep a following dot inside the identifier.
/// These cover the built-in registry namespaces and the lowercased type
/// tags that user code binds methods under (`let array.map = fn(...)`).
const DOTTED_PREFIXES: &[&str] = &[
    "array", "boolean", "error", "file", "float", "fs", "hash", "http", "integer", "json", "math",
    "module", "null", "object", "string", "time",
];

const KEYWORDS: &[&str] =
    &["let", "mutable", "fn", "return", "if", "else", "for", "foreach", "in", "import", "null"];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenizes keai source into a vector of tokens, always terminated by Eof.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    macro_rules! push {
        ($kind:expr) => {
            tokens.push(Token { kind: $kind, line })
        };
    }

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' => {
                chars.next();
                line += 1;
            }
            '#' => {
                // comment to end of line
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '"' {
                        chars.next();
                        break;
                    }
                    if ch == '\n' {
                        line += 1;
                    }
                    if ch == '\\' {
                        chars.next();
                        match chars.peek() {
                            Some(&'"') => {
                                chars.next();
                                text.push('"');
                            }
                            Some(&esc) => {
                                chars.next();
                                text.push('\\');
                                text.push(esc);
                            }
                            None => break,
                        }
                    } else {
                        chars.next();
                        text.push(ch);
                    }
                }
                push!(TokenKind::Str(text));
            }
            '0'..='9' => {
                let mut num = String::new();
                let mut is_float = false;
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() {
                        num.push(ch);
                        chars.next();
                    } else if ch == '.' && !is_float {
                        // a digit must follow, otherwise this is `..` or
                        // a method call on the number
                        let mut ahead = chars.clone();
                        ahead.next();
                        match ahead.peek() {
                            Some(d) if d.is_ascii_digit() => {
                                is_float = true;
                                num.push(ch);
                                chars.next();
                            }
                            _ => break,
                        }
                    } else {
                        break;
                    }
                }
                if is_float {
                    push!(TokenKind::Float(num.parse().unwrap_or(0.0)));
                } else {
                    push!(TokenKind::Int(num.parse().unwrap_or(0)));
                }
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if is_ident_char(ch) {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // keep dots for namespace-prefixed identifiers
                if DOTTED_PREFIXES.contains(&ident.as_str()) {
                    while chars.peek() == Some(&'.') {
                        let mut ahead = chars.clone();
                        ahead.next();
                        match ahead.peek() {
                            Some(&ch) if is_ident_start(ch) => {
                                chars.next();
                                ident.push('.');
                                while let Some(&ch) = chars.peek() {
                                    if is_ident_char(ch) {
                                        ident.push(ch);
                                        chars.next();
                                    } else {
                                        break;
                                    }
                                }
                            }
                            _ => break,
                        }
                    }
                }

                let kind = match ident.as_str() {
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    k if KEYWORDS.contains(&k) => TokenKind::Keyword(ident),
                    _ => TokenKind::Identifier(ident),
                };
                push!(kind);
            }
            '=' | '!' | '<' | '>' => {
                let op = chars.next().unwrap();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::Operator(format!("{}=", op)));
                } else if op == '<' && chars.peek() == Some(&'<') {
                    chars.next();
                    push!(TokenKind::Operator("<<".into()));
                } else if op == '>' && chars.peek() == Some(&'>') {
                    chars.next();
                    push!(TokenKind::Operator(">>".into()));
                } else {
                    push!(TokenKind::Operator(op.to_string()));
                }
            }
            '+' | '-' => {
                let op = chars.next().unwrap();
                if chars.peek() == Some(&op) {
                    chars.next();
                    push!(TokenKind::Operator(format!("{}{}", op, op)));
                } else if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::Operator(format!("{}=", op)));
                } else {
                    push!(TokenKind::Operator(op.to_string()));
                }
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    push!(TokenKind::Operator("**".into()));
                } else if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::Operator("*=".into()));
                } else {
                    push!(TokenKind::Operator("*".into()));
                }
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    // comment to end of line
                    for ch in chars.by_ref() {
                        if ch == '\n' {
                            line += 1;
                            break;
                        }
                    }
                } else if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::Operator("/=".into()));
                } else {
                    push!(TokenKind::Operator("/".into()));
                }
            }
            '%' | '~' | '^' => {
                chars.next();
                push!(TokenKind::Operator(c.to_string()));
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    push!(TokenKind::Operator("&&".into()));
                } else {
                    push!(TokenKind::Operator("&".into()));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    push!(TokenKind::Operator("||".into()));
                } else {
                    push!(TokenKind::Operator("|".into()));
                }
            }
            '.' => {
                chars.next();
                if chars.peek() == Some(&'.') {
                    chars.next();
                    if chars.peek() == Some(&'.') {
                        chars.next();
                        push!(TokenKind::Operator("...".into()));
                    } else {
                        push!(TokenKind::Operator("..".into()));
                    }
                } else {
                    push!(TokenKind::Punctuation('.'));
                }
            }
            '(' | ')' | '{' | '}' | '[' | ']' | ',' | ';' | ':' => {
                chars.next();
                push!(TokenKind::Punctuation(c));
            }
            _ => {
                // unknown character; skip it
                chars.next();
            }
        }
    }

    tokens.push(Token { kind: TokenKind::Eof, line });
    tokens
}

#[cfg(test)]
mod tests {
    use super::{tokenize, TokenKind};

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_dotted_identifier_kept_for_known_prefixes() {
        let toks = kinds("math.sqrt(2)");
        assert_eq!(toks[0], TokenKind::Identifier("math.sqrt".into()));
        assert_eq!(toks[1], TokenKind::Punctuation('('));
    }

    #[test]
    fn test_dotted_access_split_for_plain_identifiers() {
        let toks = kinds("xs.map");
        assert_eq!(toks[0], TokenKind::Identifier("xs".into()));
        assert_eq!(toks[1], TokenKind::Punctuation('.'));
        assert_eq!(toks[2], TokenKind::Identifier("map".into()));
    }

    #[test]
    fn test_range_and_float_disambiguation() {
        let toks = kinds("1..5");
        assert_eq!(toks[0], TokenKind::Int(1));
        assert_eq!(toks[1], TokenKind::Operator("..".into()));
        assert_eq!(toks[2], TokenKind::Int(5));

        let toks = kinds("1.5");
        assert_eq!(toks[0], TokenKind::Float(1.5));
    }

    #[test]
    fn test_string_preserves_escape_text() {
        let toks = kinds(r#""a\nb""#);
        assert_eq!(toks[0], TokenKind::Str("a\\nb".into()));
    }

    #[test]
    fn test_compound_operators() {
        let toks = kinds("i += 1 i++ a ** b c .. d ...");
        assert!(toks.contains(&TokenKind::Operator("+=".into())));
        assert!(toks.contains(&TokenKind::Operator("++".into())));
        assert!(toks.contains(&TokenKind::Operator("**".into())));
        assert!(toks.contains(&TokenKind::Operator("..".into())));
        assert!(toks.contains(&TokenKind::Operator("...".into())));
    }
}
