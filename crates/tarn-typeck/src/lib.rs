//! Tarn type system: structural types computed over a desugared tree.
//!
//! Types are descriptors in a [`TypeTable`]: simple types that answer
//! messages through handlers, compound types with named fields, and
//! `$`-wildcards bound by unification. Assignability is structural and
//! memoized per pair. Nothing here rejects a program outright; every problem
//! becomes an entry in the shared error log and checking carries on with
//! `Anything` in place of the broken piece.
//!
//! # Architecture
//!
//! - [`ty`]: descriptors, the table, merge and substitution
//! - [`builtins`]: primitive types and their operator handlers
//! - [`scope`]: chained symbol tables for terms and type names
//! - [`unify`]: the assignability checker and wildcard bindings
//! - [`compile`]: type syntax to descriptors
//! - `infer`: the type-compute pass over expressions
//! - [`diagnostics`]: rendering errors with source context
//!
//! [`check`] types an already desugared tree; [`compile`](fn@compile) runs
//! desugaring and checking together.

pub mod builtins;
pub mod compile;
pub mod diagnostics;
mod infer;
pub mod scope;
pub mod ty;
pub mod unify;

use rustc_hash::FxHashMap;

use tarn_ast::{Ast, Errors, NodeId};
use tarn_desugar::DesugarConfig;

pub use infer::{Binding, UnresolvedId, UnresolvedType, Variable};
pub use ty::{Descriptor, Field, Shape, TypeId, TypeTable};
pub use unify::Checker;

/// Configuration for the type-compute pass.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Report the first statement after a `return` in a block. Default: true.
    pub report_unreachable: bool,
    /// When a single-field compound's field is itself a compound, let it
    /// accept a value matching that inner compound directly. Default: true.
    pub unwrap_single_field: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            report_unreachable: true,
            unwrap_single_field: true,
        }
    }
}

/// Configuration for the whole front end.
#[derive(Debug, Clone, Default)]
pub struct CompileConfig {
    pub desugar: DesugarConfig,
    pub check: CheckConfig,
}

/// Types computed for one tree.
#[derive(Debug)]
pub struct TypeckResult {
    /// Type of every expression node the pass visited.
    pub types: FxHashMap<NodeId, TypeId>,
    /// For each call dispatched through a type handler, the guard it matched.
    pub coercions: FxHashMap<NodeId, TypeId>,
    pub table: TypeTable,
    /// Merge of the root's natural type and everything that escaped it.
    pub result_type: TypeId,
}

impl TypeckResult {
    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).copied()
    }

    /// Human-readable type of `node`, e.g. `"Number -> Boolean"`.
    pub fn display_type(&self, node: NodeId) -> Option<String> {
        self.type_of(node)
            .map(|ty| self.table.display(ty).to_string())
    }

    pub fn result_display(&self) -> String {
        self.table.display(self.result_type).to_string()
    }
}

/// Compute types for the desugared tree under `root`.
///
/// Errors go to `errors`; the returned result always covers the whole tree.
pub fn check(ast: &Ast, root: NodeId, errors: &mut Errors, config: &CheckConfig) -> TypeckResult {
    let before = errors.len();
    let result = infer::Infer::new(ast, errors, config).run(root);
    log::debug!("check: {} type errors", errors.len() - before);
    result
}

/// Output of [`compile`](fn@compile).
#[derive(Debug)]
pub struct CompileResult {
    /// The desugared root.
    pub root: NodeId,
    pub typeck: TypeckResult,
    /// Legality errors first, then type errors, each in discovery order.
    pub errors: Errors,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render every error against `source`.
    pub fn render_errors(&self, source: &str, filename: &str) -> Vec<String> {
        self.errors
            .iter()
            .map(|error| diagnostics::render_diagnostic(error, source, filename))
            .collect()
    }
}

/// Desugar, then type the tree under `root`.
pub fn compile(ast: &mut Ast, root: NodeId, config: &CompileConfig) -> CompileResult {
    let mut errors = Errors::new();
    let root = tarn_desugar::simplify_with(ast, root, &mut errors, &config.desugar);
    let typeck = check(ast, root, &mut errors, &config.check);
    CompileResult {
        root,
        typeck,
        errors,
    }
}
