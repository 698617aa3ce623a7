use crate::specifier::CdnOrigin;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportExpression, Program, StringLiteral,
};
use oxc_ast_visit::{VisitMut, walk_mut};
use oxc_span::Atom;

/// Rewrites the specifier literal of every import declaration, literal
/// dynamic `import()` and `export ... from` in the program. Returns the number
/// of literals that changed.
pub fn rewrite_imports<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    origin: &CdnOrigin,
) -> usize {
    let mut rewriter = ImportRewriter {
        allocator,
        origin,
        rewritten: 0,
    };
    rewriter.visit_program(program);
    rewriter.rewritten
}

struct ImportRewriter<'a, 'o> {
    allocator: &'a Allocator,
    origin: &'o CdnOrigin,
    rewritten: usize,
}

impl<'a> ImportRewriter<'a, '_> {
    fn rewrite_literal(&mut self, lit: &mut StringLiteral<'a>) {
        let Some(resolved) = self.origin.resolve(lit.value.as_str()) else {
            return;
        };
        if resolved == lit.value.as_str() {
            return;
        }
        let stored: &'a str = self.allocator.alloc_str(&resolved);
        lit.value = Atom::from(stored);
        lit.raw = None;
        self.rewritten += 1;
    }
}

impl<'a> VisitMut<'a> for ImportRewriter<'a, '_> {
    fn visit_import_declaration(&mut self, it: &mut ImportDeclaration<'a>) {
        self.rewrite_literal(&mut it.source);
        walk_mut::walk_import_declaration(self, it);
    }

    fn visit_import_expression(&mut self, it: &mut ImportExpression<'a>) {
        // Only a literal first argument can be resolved statically.
        if let Expression::StringLiteral(lit) = &mut it.source {
            self.rewrite_literal(lit);
        }
        walk_mut::walk_import_expression(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &mut ExportNamedDeclaration<'a>) {
        if let Some(source) = it.source.as_mut() {
            self.rewrite_literal(source);
        }
        walk_mut::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &mut ExportAllDeclaration<'a>) {
        self.rewrite_literal(&mut it.source);
        walk_mut::walk_export_all_declaration(self, it);
    }
}
