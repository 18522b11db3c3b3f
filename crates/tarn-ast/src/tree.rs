//! Arena storage for the syntax tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`] handles.
//! Parent links are handles too, so the tree can be rewritten in place
//! without ownership cycles while "who is my parent" stays O(1).

use tarn_common::{Span, Token};

use crate::kind::{ExprKind, NodeKind, TypeKind};

/// Stable handle of a node inside an [`Ast`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage for one node.
#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    children: Vec<NodeId>,
    span: Span,
    parent: Option<NodeId>,
    grouped: bool,
}

/// A child list under construction.
///
/// Producers hand over nested lists, optional parts, and bare tokens; the
/// arena flattens them, drops absent parts, and wraps tokens in leaf nodes.
#[derive(Debug, Clone)]
pub enum Element {
    Node(NodeId),
    Token(Token),
    Many(Vec<Element>),
    Absent,
}

impl From<NodeId> for Element {
    fn from(id: NodeId) -> Self {
        Element::Node(id)
    }
}

impl From<Token> for Element {
    fn from(token: Token) -> Self {
        Element::Token(token)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(part: Option<T>) -> Self {
        part.map_or(Element::Absent, Into::into)
    }
}

impl<T: Into<Element>> From<Vec<T>> for Element {
    fn from(parts: Vec<T>) -> Self {
        Element::Many(parts.into_iter().map(Into::into).collect())
    }
}

/// The syntax tree arena.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<NodeData>,
}

impl Ast {
    pub fn new() -> Self {
        Ast { nodes: Vec::new() }
    }

    /// Number of nodes ever allocated, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Construction ───────────────────────────────────────────────────

    /// Allocate a leaf node with an explicit span.
    pub fn leaf(&mut self, kind: impl Into<NodeKind>, span: Span) -> NodeId {
        self.push(NodeData {
            kind: kind.into(),
            children: Vec::new(),
            span,
            parent: None,
            grouped: false,
        })
    }

    /// Allocate a composite node.
    ///
    /// The child list is flattened, absent parts are discarded, tokens are
    /// wrapped in leaf nodes, every child gets its parent set, and the span
    /// is the hull of the first and last child spans.
    pub fn alloc(&mut self, kind: impl Into<NodeKind>, elements: Vec<Element>) -> NodeId {
        let children = self.flatten(elements);
        let span = match (children.first(), children.last()) {
            (Some(first), Some(last)) => self.span(*first).merge(self.span(*last)),
            _ => {
                debug_assert!(false, "composite node allocated without children");
                Span::default()
            }
        };
        self.attach(kind.into(), children, span)
    }

    /// Allocate a composite node with an explicit span override.
    pub fn alloc_with_span(
        &mut self,
        kind: impl Into<NodeKind>,
        elements: Vec<Element>,
        span: Span,
    ) -> NodeId {
        let children = self.flatten(elements);
        self.attach(kind.into(), children, span)
    }

    /// Allocate a leaf node holding a token.
    pub fn token(&mut self, token: Token) -> NodeId {
        let span = token.span;
        self.leaf(NodeKind::Token(token), span)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn attach(&mut self, kind: NodeKind, children: Vec<NodeId>, span: Span) -> NodeId {
        let id = self.push(NodeData {
            kind,
            children: Vec::new(),
            span,
            parent: None,
            grouped: false,
        });
        for &child in &children {
            debug_assert!(
                self.node(child).parent.is_none(),
                "node {child:?} already has a parent"
            );
            self.node_mut(child).parent = Some(id);
        }
        self.node_mut(id).children = children;
        id
    }

    fn flatten(&mut self, elements: Vec<Element>) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(elements.len());
        self.flatten_into(elements, &mut out);
        out
    }

    fn flatten_into(&mut self, elements: Vec<Element>, out: &mut Vec<NodeId>) {
        for element in elements {
            match element {
                Element::Node(id) => out.push(id),
                Element::Token(token) => {
                    let id = self.token(token);
                    out.push(id);
                }
                Element::Many(nested) => self.flatten_into(nested, out),
                Element::Absent => {}
            }
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.node_mut(id).kind
    }

    pub fn expr(&self, id: NodeId) -> Option<&ExprKind> {
        self.kind(id).as_expr()
    }

    pub fn expr_mut(&mut self, id: NodeId) -> Option<&mut ExprKind> {
        match self.kind_mut(id) {
            NodeKind::Expr(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn type_kind(&self, id: NodeId) -> Option<&TypeKind> {
        self.kind(id).as_type()
    }

    pub fn is_expr(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Expr(_))
    }

    pub fn is_type(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Type(_))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Whether the node stands in for a collapsed block, i.e. carries the
    /// precedence of its former braces.
    pub fn is_grouped(&self, id: NodeId) -> bool {
        self.node(id).grouped
    }

    pub fn set_grouped(&mut self, id: NodeId, grouped: bool) {
        self.node_mut(id).grouped = grouped;
    }

    /// Expression-kind children, in order.
    ///
    /// Token leaves and type annotations are skipped; the walk never crosses
    /// into a nested expression.
    pub fn expressions(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_expr(child))
            .collect()
    }

    /// Type-kind children, in order.
    pub fn types(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_type(child))
            .collect()
    }

    /// Token children, in order.
    pub fn tokens(&self, id: NodeId) -> impl Iterator<Item = &Token> + '_ {
        self.children(id)
            .iter()
            .filter_map(move |&child| self.kind(child).as_token())
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Nearest ancestor that is an expression.
    pub fn enclosing_expr(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.is_expr(a))
    }

    /// Nearest ancestor whose expression kind satisfies `pred`.
    pub fn contained_inside(&self, id: NodeId, pred: impl Fn(&ExprKind) -> bool) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| self.expr(a).is_some_and(|kind| pred(kind)))
    }

    // ── Mutation ───────────────────────────────────────────────────────

    /// Put `new` where `old` sits in its parent's child list.
    ///
    /// `old` ends up detached. Replacing a root is a no-op on the tree; the
    /// caller holds the new root handle.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        if let Some(parent) = self.node(new).parent {
            self.remove_child(parent, new);
        }
        let parent = self.node(old).parent;
        if let Some(parent) = parent {
            if let Some(slot) = self
                .node_mut(parent)
                .children
                .iter_mut()
                .find(|c| **c == old)
            {
                *slot = new;
            }
        }
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = parent;
    }

    /// Remove a node from its parent's child list.
    pub fn detach(&mut self, id: NodeId) -> NodeId {
        if let Some(parent) = self.node(id).parent {
            self.remove_child(parent, id);
        }
        self.node_mut(id).parent = None;
        id
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.retain(|c| *c != child);
    }

    /// Append a child list to an existing node, growing its span.
    pub fn append(&mut self, id: NodeId, elements: Vec<Element>) {
        let added = self.flatten(elements);
        let mut span = self.span(id);
        for &child in &added {
            debug_assert!(self.node(child).parent.is_none());
            self.node_mut(child).parent = Some(id);
            span = span.merge(self.span(child));
        }
        let data = self.node_mut(id);
        data.children.extend(added);
        data.span = span;
    }

    /// Copy a subtree. The copy is detached and shares nothing with the
    /// original.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let original = self.node(id).clone();
        let children: Vec<NodeId> = original
            .children
            .iter()
            .map(|&child| self.deep_copy(child))
            .collect();
        let copy = self.push(NodeData {
            kind: original.kind,
            children: Vec::new(),
            span: original.span,
            parent: None,
            grouped: original.grouped,
        });
        for &child in &children {
            self.node_mut(child).parent = Some(copy);
        }
        self.node_mut(copy).children = children;
        copy
    }

    /// Depth-first rewrite.
    ///
    /// `transform` is applied to a node repeatedly until it reports no
    /// change (`None`, or the same handle), each replacement being spliced
    /// into the parent before the next application. Then the children of the
    /// surviving node are rewritten in order. Returns the handle now standing
    /// where `root` stood.
    pub fn rewrite<F>(&mut self, root: NodeId, transform: &mut F) -> NodeId
    where
        F: FnMut(&mut Ast, NodeId) -> Option<NodeId>,
    {
        let mut current = root;
        while let Some(next) = transform(self, current) {
            if next == current {
                break;
            }
            self.replace(current, next);
            current = next;
        }
        let mut i = 0;
        while i < self.children(current).len() {
            let child = self.children(current)[i];
            self.rewrite(child, transform);
            i += 1;
        }
        current
    }

    /// Whether two subtrees have the same shape and payloads, ignoring spans.
    pub fn same_shape(&self, a: NodeId, b: NodeId) -> bool {
        let (na, nb) = (self.node(a), self.node(b));
        let kinds_match = match (&na.kind, &nb.kind) {
            (NodeKind::Token(ta), NodeKind::Token(tb)) => ta.kind == tb.kind && ta.text == tb.text,
            (ka, kb) => ka == kb,
        };
        kinds_match
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(&ca, &cb)| self.same_shape(ca, cb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Constant, ExprKind};
    use tarn_common::TokenKind;

    fn reference(ast: &mut Ast, name: &str, start: u32) -> NodeId {
        ast.leaf(
            ExprKind::Reference { name: name.into() },
            Span::new(start, start + name.len() as u32),
        )
    }

    #[test]
    fn alloc_flattens_and_sets_parents() {
        let mut ast = Ast::new();
        let a = reference(&mut ast, "a", 0);
        let b = reference(&mut ast, "b", 4);
        let plus = Token::new(TokenKind::Operator, "+", 2, 3);
        let bin = ast.alloc(
            ExprKind::Binary { op: "+".into() },
            vec![
                a.into(),
                Element::from(vec![Element::from(plus), Element::Absent]),
                Some(b).into(),
            ],
        );

        assert_eq!(ast.children(bin).len(), 3);
        assert_eq!(ast.parent(a), Some(bin));
        assert_eq!(ast.parent(b), Some(bin));
        assert_eq!(ast.span(bin), Span::new(0, 5));
        assert_eq!(ast.expressions(bin), vec![a, b]);
        assert_eq!(ast.tokens(bin).count(), 1);
    }

    #[test]
    fn replace_splices_into_parent() {
        let mut ast = Ast::new();
        let a = reference(&mut ast, "a", 0);
        let nested = ast.alloc(ExprKind::Nested, vec![a.into()]);
        let b = reference(&mut ast, "b", 0);

        ast.replace(a, b);
        assert_eq!(ast.children(nested), &[b]);
        assert_eq!(ast.parent(b), Some(nested));
        assert_eq!(ast.parent(a), None);
    }

    #[test]
    fn deep_copy_is_detached_and_equal() {
        let mut ast = Ast::new();
        let a = reference(&mut ast, "a", 0);
        let nested = ast.alloc(ExprKind::Nested, vec![a.into()]);
        let outer = ast.alloc(ExprKind::Repeat, vec![nested.into()]);

        let copy = ast.deep_copy(nested);
        assert_ne!(copy, nested);
        assert_eq!(ast.parent(copy), None);
        assert_eq!(ast.parent(nested), Some(outer));
        assert!(ast.same_shape(copy, nested));
        assert_ne!(ast.children(copy)[0], a);
    }

    #[test]
    fn rewrite_reaches_fixed_point_and_recurses() {
        let mut ast = Ast::new();
        let a = reference(&mut ast, "a", 0);
        let inner = ast.alloc(ExprKind::Nested, vec![a.into()]);
        let outer = ast.alloc(ExprKind::Nested, vec![inner.into()]);

        // Unwrap every `Nested` node.
        let root = ast.rewrite(outer, &mut |ast: &mut Ast, id: NodeId| {
            if ast.expr(id) == Some(&ExprKind::Nested) {
                let child = ast.children(id)[0];
                Some(ast.detach(child))
            } else {
                None
            }
        });
        assert_eq!(root, a);
    }

    #[test]
    fn contained_inside_walks_ancestors() {
        let mut ast = Ast::new();
        let c = ast.leaf(ExprKind::Constant(Constant::nothing()), Span::at(0));
        let ret = ast.alloc(ExprKind::Return, vec![c.into()]);
        let block = ast.alloc(ExprKind::Block, vec![ret.into()]);
        let rep = ast.alloc(ExprKind::Repeat, vec![block.into()]);

        assert_eq!(ast.enclosing_expr(ret), Some(block));
        assert_eq!(
            ast.contained_inside(c, |k| matches!(k, ExprKind::Repeat)),
            Some(rep)
        );
        assert_eq!(ast.contained_inside(c, |k| matches!(k, ExprKind::On)), None);
    }
}
