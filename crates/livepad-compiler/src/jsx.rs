use crate::RewriteError;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Declaration, ImportDeclarationSpecifier, JSXElement, JSXFragment, Program, Statement,
    VariableDeclaration,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// The library JSX lowers onto: `package` is what gets imported, `global` is
/// the binding the lowered `createElement` calls go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiLibrary {
    pub package: String,
    pub global: String,
}

impl Default for UiLibrary {
    fn default() -> Self {
        Self {
            package: "react".to_string(),
            global: "React".to_string(),
        }
    }
}

impl UiLibrary {
    pub fn new(package: impl Into<String>, global: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            global: global.into(),
        }
    }

    /// `react`, `react@19`, `https://esm.sh/react` and `.../react@19` all count,
    /// with or without a `?query` or `#hash`.
    pub fn matches_specifier(&self, specifier: &str) -> bool {
        let pkg = self.package.as_str();
        let specifier = specifier
            .split(['?', '#'])
            .next()
            .unwrap_or(specifier);
        let tail = specifier.rsplit('/').next().unwrap_or(specifier);
        let is_variant = |candidate: &str| {
            candidate == pkg
                || candidate
                    .strip_prefix(pkg)
                    .is_some_and(|rest| rest.starts_with('@'))
        };
        is_variant(specifier) || (specifier.contains('/') && is_variant(tail))
    }
}

pub fn contains_jsx(program: &Program<'_>) -> bool {
    let mut finder = JsxFinder { found: false };
    finder.visit_program(program);
    finder.found
}

struct JsxFinder {
    found: bool,
}

impl<'a> Visit<'a> for JsxFinder {
    fn visit_jsx_element(&mut self, _it: &JSXElement<'a>) {
        self.found = true;
    }

    fn visit_jsx_fragment(&mut self, _it: &JSXFragment<'a>) {
        self.found = true;
    }
}

/// True when the module scope binds `global` through a default import, a
/// namespace import or a variable declaration (exported or not).
pub fn has_module_binding(program: &Program<'_>, global: &str) -> bool {
    program.body.iter().any(|stmt| match stmt {
        Statement::ImportDeclaration(decl) => decl.specifiers.iter().flatten().any(|spec| {
            match spec {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    s.local.name.as_str() == global
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    s.local.name.as_str() == global
                }
                ImportDeclarationSpecifier::ImportSpecifier(_) => false,
            }
        }),
        Statement::VariableDeclaration(decl) => declares(decl, global),
        Statement::ExportNamedDeclaration(export) => matches!(
            &export.declaration,
            Some(Declaration::VariableDeclaration(decl)) if declares(decl, global)
        ),
        _ => false,
    })
}

fn declares(decl: &VariableDeclaration<'_>, name: &str) -> bool {
    decl.declarations.iter().any(|d| {
        d.id.get_binding_identifier()
            .is_some_and(|id| id.name.as_str() == name)
    })
}

pub fn needs_injection(program: &Program<'_>, ui: &UiLibrary) -> bool {
    contains_jsx(program) && !has_module_binding(program, &ui.global)
}

/// The specifier the injected import should use: the first import in the
/// program that already names the library, else the bare package name.
pub fn injection_specifier(program: &Program<'_>, ui: &UiLibrary) -> String {
    program
        .body
        .iter()
        .find_map(|stmt| match stmt {
            Statement::ImportDeclaration(decl)
                if ui.matches_specifier(decl.source.value.as_str()) =>
            {
                Some(decl.source.value.to_string())
            }
            _ => None,
        })
        .unwrap_or_else(|| ui.package.clone())
}

/// Prepends `import <global> from "<specifier>";` ahead of every statement.
pub fn inject<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    ui: &UiLibrary,
) -> Result<(), RewriteError> {
    let specifier = injection_specifier(program, ui);
    let quoted = serde_json::to_string(&specifier)
        .map_err(|err| RewriteError::Inject(err.to_string()))?;
    let stub_text: &'a str =
        allocator.alloc_str(&format!("import {} from {quoted};", ui.global));

    let mut stub = Parser::new(allocator, stub_text, SourceType::mjs()).parse();
    if !stub.errors.is_empty() || stub.program.body.is_empty() {
        return Err(RewriteError::Inject(format!(
            "`{}` is not a valid import binding",
            ui.global
        )));
    }
    let statement = stub.program.body.remove(0);
    program.body.insert(0, statement);
    Ok(())
}
