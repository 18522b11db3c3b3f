//! The type compiler: type syntax to descriptors.
//!
//! Compilation never fails. Unknown names and malformed pieces are reported
//! and replaced with `Anything`, so a type annotation with a typo stops
//! checking for that one annotation only.

use rustc_hash::FxHashSet;

use tarn_ast::{Ast, ErrorKind, Errors, NodeId, TypeKind};

use crate::scope::{ScopeId, Scopes};
use crate::ty::{Field, TypeId, TypeTable};

pub struct TypeCompiler<'a> {
    pub ast: &'a Ast,
    pub table: &'a mut TypeTable,
    pub scopes: &'a mut Scopes<TypeId>,
    pub errors: &'a mut Errors,
}

/// Compile the type node `node` with names resolved from `scope`.
///
/// Fresh wildcards are bound in `scope`, so every `$T` in one signature
/// denotes the same parameter.
pub fn compile_type(
    ast: &Ast,
    node: NodeId,
    table: &mut TypeTable,
    scopes: &mut Scopes<TypeId>,
    scope: ScopeId,
    errors: &mut Errors,
) -> TypeId {
    TypeCompiler {
        ast,
        table,
        scopes,
        errors,
    }
    .compile(node, scope)
}

impl TypeCompiler<'_> {
    pub fn compile(&mut self, node: NodeId, scope: ScopeId) -> TypeId {
        let anything = self.table.builtins().anything;
        let Some(kind) = self.ast.type_kind(node).cloned() else {
            log::warn!(
                "compile_type called on non-type node {}",
                self.ast.kind(node).name()
            );
            return anything;
        };
        let children = self.ast.types(node);
        match kind {
            TypeKind::Empty => self.table.builtins().empty,
            TypeKind::Simple { name } => match self.scopes.get(scope, &name) {
                Some(&ty) => ty,
                None => {
                    self.errors
                        .report(self.ast, node, ErrorKind::UnresolvedType { name });
                    anything
                }
            },
            TypeKind::Parameter { name } => {
                let key = format!("${}", name);
                if let Some(&bound) = self.scopes.get(scope, &key) {
                    return bound;
                }
                let wildcard = self.table.wildcard(&key);
                self.scopes.add(scope, key, wildcard);
                wildcard
            }
            TypeKind::TypedField { .. } | TypeKind::NestedType => match children.first() {
                Some(&inner) => self.compile(inner, scope),
                None => anything,
            },
            TypeKind::Compound => self.compound(&children, scope),
            TypeKind::Template { name } => self.template(node, &name, &children, scope),
            TypeKind::FunctionType => match children.as_slice() {
                &[arg, result] => {
                    let arg = self.compile(arg, scope);
                    let result = self.compile(result, scope);
                    self.table.function(arg, result)
                }
                _ => anything,
            },
            TypeKind::MergedType => {
                let parts: Vec<TypeId> = children
                    .iter()
                    .map(|&part| self.compile(part, scope))
                    .collect();
                self.table.merge(&parts)
            }
            TypeKind::InlineType => {
                let ty = self.table.simple();
                for declaration in children {
                    self.declare(ty, declaration, scope);
                }
                ty
            }
            TypeKind::InlineDeclaration { .. } => {
                let ty = self.table.simple();
                self.declare(ty, node, scope);
                ty
            }
        }
    }

    fn compound(&mut self, children: &[NodeId], scope: ScopeId) -> TypeId {
        let mut fields = Vec::with_capacity(children.len());
        let mut seen = FxHashSet::default();
        for (index, &child) in children.iter().enumerate() {
            let Some(TypeKind::TypedField { name }) = self.ast.type_kind(child) else {
                continue;
            };
            let name = name.clone().unwrap_or_else(|| format!("?{}", index));
            if !seen.insert(name.clone()) {
                self.errors
                    .report(self.ast, child, ErrorKind::DuplicateField { name });
                continue;
            }
            let ty = self.compile(child, scope);
            let has_default = !self.ast.expressions(child).is_empty();
            fields.push(Field {
                name,
                ty,
                has_default,
            });
        }
        self.table.compound(fields)
    }

    fn template(&mut self, node: NodeId, name: &str, args: &[NodeId], scope: ScopeId) -> TypeId {
        let anything = self.table.builtins().anything;
        let Some(&template) = self.scopes.get(scope, name) else {
            self.errors.report(
                self.ast,
                node,
                ErrorKind::UnresolvedType {
                    name: name.to_string(),
                },
            );
            return anything;
        };
        let args: Vec<TypeId> = args.iter().map(|&arg| self.compile(arg, scope)).collect();
        let expected = self.table.get(template).params.len();
        if expected != args.len() {
            self.errors.report(
                self.ast,
                node,
                ErrorKind::TemplateArity {
                    name: name.to_string(),
                    expected,
                    found: args.len(),
                },
            );
            return anything;
        }
        self.table.instantiate(template, &args)
    }

    /// Add one inline declaration's handler to `ty`.
    fn declare(&mut self, ty: TypeId, declaration: NodeId, scope: ScopeId) {
        let Some(TypeKind::InlineDeclaration { symbol }) = self.ast.type_kind(declaration).cloned()
        else {
            return;
        };
        let parts = self.ast.types(declaration);
        match (symbol, parts.as_slice()) {
            (Some(symbol), &[result]) => {
                let result = self.compile(result, scope);
                self.table.add_symbol_handler(ty, &symbol, result);
            }
            (None, &[guard, result]) => {
                let guard = self.compile(guard, scope);
                let result = self.compile(result, scope);
                self.table.add_type_handler(ty, guard, result);
            }
            _ => {}
        }
    }
}
