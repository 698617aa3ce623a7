use crate::RewriteError;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Script bodies are always parsed as TSX modules so that plain JavaScript,
/// JSX and TypeScript share a single grammar.
pub fn script_source_type() -> SourceType {
    SourceType::tsx()
}

pub fn parse_script<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
) -> Result<Program<'a>, RewriteError> {
    let ret = Parser::new(allocator, source_text, script_source_type()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|err| err.message.to_string())
            .unwrap_or_else(|| "parser gave up".to_string());
        return Err(RewriteError::Parse(message));
    }
    Ok(ret.program)
}

/// Prints with comments kept and `\n` line endings.
pub fn print_program(program: &Program<'_>) -> String {
    Codegen::new().build(program).code
}

#[cfg(test)]
mod tests {
    use super::{parse_script, print_program};
    use crate::RewriteError;
    use oxc_allocator::Allocator;

    #[test]
    fn prints_comments_and_statements() {
        let allocator = Allocator::default();
        let program = parse_script(&allocator, "// greet\nconsole.log('hi')")
            .expect("parse should work");
        let out = print_program(&program);
        assert!(out.contains("// greet"), "{out}");
        assert!(out.contains("console.log(\"hi\");"), "{out}");
        assert!(!out.contains('\r'));
    }

    #[test]
    fn accepts_typescript_and_jsx() {
        let allocator = Allocator::default();
        let src = "const n: number = 1;\nconst el = <div>{n}</div>;";
        assert!(parse_script(&allocator, src).is_ok());
    }

    #[test]
    fn unbalanced_braces_fail() {
        let allocator = Allocator::default();
        let err = parse_script(&allocator, "function f() {").expect_err("parse should fail");
        assert!(matches!(err, RewriteError::Parse(_)));
    }
}
