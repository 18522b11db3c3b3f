//! Structural rules that depend on the enclosing context.

use rustc_hash::FxHashSet;

use tarn_ast::{Ast, ErrorKind, Errors, ExprKind, NodeId};

/// Name positional fields `?i` in place, and reject positional-after-named
/// and duplicate names.
pub(crate) fn check_struct(ast: &mut Ast, id: NodeId, errors: &mut Errors) {
    let mut named_seen = false;
    let mut seen = FxHashSet::default();
    for (index, field) in ast.expressions(id).into_iter().enumerate() {
        let declared = match ast.expr(field) {
            Some(ExprKind::StructField { name }) => name.clone(),
            _ => continue,
        };
        let (name, positional) = match declared {
            Some(name) => {
                let positional = name.starts_with('?');
                (name, positional)
            }
            None => {
                let name = format!("?{}", index);
                if let Some(ExprKind::StructField { name: slot }) = ast.expr_mut(field) {
                    *slot = Some(name.clone());
                }
                (name, true)
            }
        };
        if positional && named_seen {
            errors.report(ast, field, ErrorKind::PositionalAfterNamed);
        }
        named_seen |= !positional;
        if !seen.insert(name.clone()) {
            errors.report(ast, field, ErrorKind::DuplicateField { name });
        }
    }
}

/// `new` needs an `on` handler, directly or as an item of its block.
pub(crate) fn check_new(ast: &Ast, id: NodeId, errors: &mut Errors) {
    let is_handler = |node: NodeId| matches!(ast.expr(node), Some(ExprKind::On));
    let ok = match ast.expressions(id).first() {
        Some(&code) if is_handler(code) => true,
        Some(&code) if matches!(ast.expr(code), Some(ExprKind::Block)) => {
            ast.expressions(code).into_iter().any(is_handler)
        }
        _ => false,
    };
    if !ok {
        errors.report(ast, id, ErrorKind::NewWithoutHandler);
    }
}

/// The nearest enclosing expression must be a block.
pub(crate) fn check_in_block(ast: &Ast, id: NodeId, errors: &mut Errors, kind: ErrorKind) {
    let in_block = ast
        .enclosing_expr(id)
        .is_some_and(|parent| matches!(ast.expr(parent), Some(ExprKind::Block)));
    if !in_block {
        errors.report(ast, id, kind);
    }
}

pub(crate) fn check_return(ast: &Ast, id: NodeId, errors: &mut Errors) {
    if ast
        .contained_inside(id, |kind| matches!(kind, ExprKind::On))
        .is_none()
    {
        errors.report(ast, id, ErrorKind::ReturnOutsideHandler);
    }
}

pub(crate) fn check_break(ast: &Ast, id: NodeId, errors: &mut Errors) {
    if ast
        .contained_inside(id, |kind| matches!(kind, ExprKind::Repeat))
        .is_none()
    {
        errors.report(ast, id, ErrorKind::BreakOutsideRepeat);
    }
}
