use rustc_hash::FxHashSet;

use tarn_ast::{Ast, ExprKind, NodeId};

/// Generator of `<prefix>N` names that avoid every name bound or used in the
/// tree it was seeded from.
pub(crate) struct FreshNames {
    prefix: String,
    taken: FxHashSet<String>,
    next: u32,
}

impl FreshNames {
    pub(crate) fn new(ast: &Ast, root: NodeId, prefix: &str) -> Self {
        let mut taken = FxHashSet::default();
        collect_names(ast, root, &mut taken);
        FreshNames {
            prefix: prefix.to_string(),
            taken,
            next: 0,
        }
    }

    pub(crate) fn fresh(&mut self) -> String {
        loop {
            let candidate = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn collect_names(ast: &Ast, id: NodeId, taken: &mut FxHashSet<String>) {
    match ast.expr(id) {
        Some(ExprKind::Reference { name })
        | Some(ExprKind::Assignment { name })
        | Some(ExprKind::Local { name, .. }) => {
            taken.insert(name.clone());
        }
        _ => {}
    }
    for &child in ast.children(id) {
        collect_names(ast, child, taken);
    }
}
