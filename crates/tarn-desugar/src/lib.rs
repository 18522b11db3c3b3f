//! Tarn desugaring: rewrite surface syntax into the canonical core form.
//!
//! The pass runs once per top-level tree. It rewrites operators into
//! message sends, `while` into `repeat`, functions into `new`/`on` objects,
//! fills in missing `else` branches, and collapses trivial blocks. Along the
//! way it checks the structural rules that are only decidable once the
//! enclosing context is known (assignment outside a block, `return` outside
//! a handler, ...). Violations are recorded in the shared [`Errors`] log; the
//! pass itself never fails.
//!
//! # Architecture
//!
//! - [`simplify`] / [`simplify_with`]: entry points
//! - `rewrite`: the per-kind rewrites
//! - `legality`: contextual checks
//! - `names`: fresh temporary names that never collide with user names

mod legality;
mod names;
mod rewrite;

use tarn_ast::{Ast, Errors, NodeId};

use crate::rewrite::Desugarer;

/// Configuration for the desugar pass.
#[derive(Debug, Clone)]
pub struct DesugarConfig {
    /// Prefix of generated loop temporaries. Default: `"_"`, giving `_0`,
    /// `_1`, ...
    pub temp_prefix: String,
}

impl Default for DesugarConfig {
    fn default() -> Self {
        Self {
            temp_prefix: "_".to_string(),
        }
    }
}

/// Desugar the tree under `root` with the default configuration.
///
/// Returns the handle of the rewritten root, which differs from `root` when
/// the root itself was rewritten.
pub fn simplify(ast: &mut Ast, root: NodeId, errors: &mut Errors) -> NodeId {
    simplify_with(ast, root, errors, &DesugarConfig::default())
}

/// Desugar the tree under `root`.
pub fn simplify_with(
    ast: &mut Ast,
    root: NodeId,
    errors: &mut Errors,
    config: &DesugarConfig,
) -> NodeId {
    let before = errors.len();
    let mut desugarer = Desugarer::new(ast, root, errors, config);
    let root = ast.rewrite(root, &mut |ast: &mut Ast, id: NodeId| desugarer.visit(ast, id));
    let rewrites = desugarer.rewrites();
    log::debug!(
        "simplify: {} rewrites, {} legality errors",
        rewrites,
        errors.len() - before
    );
    root
}
