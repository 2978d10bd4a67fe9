// File: src/stdlib.rs
//
// The embedded keai-language standard library. The .keai sources under
// stdlib/ are compiled into the binary and prepended (in a stable
// order) to every program and REPL session.

pub fn stdlib_source() -> String {
    const SOURCES: &[&str] = &[
        include_str!("../stdlib/array.keai"),
        include_str!("../stdlib/hash.keai"),
        include_str!("../stdlib/object.keai"),
        include_str!("../stdlib/string.keai"),
    ];
    SOURCES.join("\n")
}

#[cfg(test)]
mod tests {
    use super::stdlib_source;
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    #[test]
    fn test_embedded_stdlib_parses_cleanly() {
        let mut parser = Parser::new(tokenize(&stdlib_source()));
        let program = parser.parse();
        assert!(parser.errors().is_empty(), "stdlib parse errors: {:?}", parser.errors());
        assert!(!program.is_empty());
    }
}
