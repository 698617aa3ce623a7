use crate::RewriteError;
use crate::jsx::UiLibrary;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_semantic::SemanticBuilder;
use oxc_transformer::{JsxOptions, JsxRuntime, TransformOptions, Transformer, TypeScriptOptions};
use std::path::Path;

/// Strips TypeScript syntax and lowers JSX to classic
/// `<global>.createElement` calls. Nothing is type checked and no syntax
/// downleveling happens.
pub fn lower<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    ui: &UiLibrary,
) -> Result<(), RewriteError> {
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();

    let options = TransformOptions {
        jsx: JsxOptions {
            runtime: JsxRuntime::Classic,
            pragma: Some(format!("{}.createElement", ui.global)),
            pragma_frag: Some(format!("{}.Fragment", ui.global)),
            ..JsxOptions::default()
        },
        typescript: TypeScriptOptions {
            // Imports only used from JSX must survive until lowering.
            only_remove_type_imports: true,
            ..TypeScriptOptions::default()
        },
        ..TransformOptions::default()
    };

    let ret = Transformer::new(allocator, Path::new("script.tsx"), &options)
        .build_with_scoping(scoping, program);
    if let Some(err) = ret.errors.first() {
        return Err(RewriteError::Transform(err.message.to_string()));
    }
    Ok(())
}
