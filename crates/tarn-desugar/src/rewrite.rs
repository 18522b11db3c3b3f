//! Per-kind rewrites.
//!
//! | surface | core |
//! |---|---|
//! | `op a` | `a .op` (`-a` becomes `a .negative`) |
//! | `a and b`, `a or b` | `Logic` node |
//! | `a op b` | `(a .op) b` |
//! | `if c then t` | `if c then t else ()` |
//! | `while c do body` | `if c then repeat { let _N = body; if c .not then break _N else () } else ()` |
//! | `fn [In] [-> Out] body` | `new { on In [-> Out] body }` |
//! | `{ e }` | `e`, marked grouped |

use tarn_ast::{Ast, Constant, ErrorKind, Errors, ExprKind, LogicOp, NodeId, TypeKind};
use tarn_common::{Keyword, Span, Token, TokenKind};

use crate::legality;
use crate::names::FreshNames;
use crate::DesugarConfig;

pub(crate) struct Desugarer<'e> {
    errors: &'e mut Errors,
    names: FreshNames,
    rewrites: usize,
}

impl<'e> Desugarer<'e> {
    pub(crate) fn new(ast: &Ast, root: NodeId, errors: &'e mut Errors, config: &DesugarConfig) -> Self {
        Desugarer {
            errors,
            names: FreshNames::new(ast, root, &config.temp_prefix),
            rewrites: 0,
        }
    }

    pub(crate) fn rewrites(&self) -> usize {
        self.rewrites
    }

    /// Rewrite one node. `None` means the node is already in core form.
    ///
    /// Children have not been visited yet, so the legality checks see the
    /// already-rewritten ancestors.
    pub(crate) fn visit(&mut self, ast: &mut Ast, id: NodeId) -> Option<NodeId> {
        let kind = ast.expr(id)?.clone();
        let replacement = match &kind {
            ExprKind::Unary { op } => unary(ast, id, op),
            ExprKind::Binary { op } => match LogicOp::from_op(op) {
                Some(logic) => logic_node(ast, id, logic),
                None => binary(ast, id, op),
            },
            ExprKind::While => self.while_loop(ast, id),
            ExprKind::Function { input, output } => function(ast, id, *input, *output),
            ExprKind::Block => collapse_block(ast, id),
            ExprKind::If => {
                if complete_if(ast, id) {
                    self.rewrites += 1;
                }
                None
            }
            ExprKind::Struct => {
                legality::check_struct(ast, id, self.errors);
                None
            }
            ExprKind::New => {
                legality::check_new(ast, id, self.errors);
                None
            }
            ExprKind::Assignment { .. } => {
                legality::check_in_block(ast, id, self.errors, ErrorKind::AssignmentOutsideBlock);
                None
            }
            ExprKind::Locals => {
                legality::check_in_block(ast, id, self.errors, ErrorKind::LocalOutsideBlock);
                None
            }
            ExprKind::Local { .. } => {
                let in_group = matches!(
                    ast.parent(id).and_then(|p| ast.expr(p)),
                    Some(ExprKind::Locals)
                );
                if !in_group {
                    legality::check_in_block(ast, id, self.errors, ErrorKind::LocalOutsideBlock);
                }
                None
            }
            ExprKind::Return => {
                legality::check_return(ast, id, self.errors);
                None
            }
            ExprKind::Break => {
                legality::check_break(ast, id, self.errors);
                None
            }
            _ => None,
        };
        if let Some(new) = replacement {
            self.rewrites += 1;
            if ast.is_grouped(id) {
                ast.set_grouped(new, true);
            }
            log::trace!(
                "rewrote {} at {} into {}",
                kind.name(),
                ast.span(new),
                ast.kind(new).name()
            );
        }
        replacement
    }

    fn while_loop(&mut self, ast: &mut Ast, id: NodeId) -> Option<NodeId> {
        let (cond, body) = two_operands(ast, id)?;
        let span = ast.span(id);
        let cond_span = ast.span(cond);
        let body_span = ast.span(body);
        ast.detach(cond);
        ast.detach(body);
        let temp = self.names.fresh();

        // let _N = body
        let local = ast.alloc_with_span(
            ExprKind::Local {
                name: temp.clone(),
                mutable: false,
            },
            vec![
                Token::synthesized(TokenKind::Identifier, temp.as_str(), body_span.start).into(),
                body.into(),
            ],
            body_span,
        );
        let binding = ast.alloc_with_span(
            ExprKind::Locals,
            vec![Token::keyword(Keyword::Let, body_span.start).into(), local.into()],
            body_span,
        );

        // if cond .not then break _N
        let again = ast.deep_copy(cond);
        let not = ast.leaf(
            ExprKind::Constant(Constant::symbol("not")),
            cond_span.end_point(),
        );
        let negated = ast.alloc(ExprKind::Call, vec![again.into(), not.into()]);
        let result = ast.leaf(ExprKind::Reference { name: temp }, span.end_point());
        let exit = ast.alloc(
            ExprKind::Break,
            vec![Token::keyword(Keyword::Break, span.end).into(), result.into()],
        );
        let check = ast.alloc(
            ExprKind::If,
            vec![
                Token::keyword(Keyword::If, cond_span.start).into(),
                negated.into(),
                Token::keyword(Keyword::Then, span.end).into(),
                exit.into(),
            ],
        );

        let code = ast.alloc(
            ExprKind::Block,
            vec![
                Token::synthesized(TokenKind::Punctuation, "{", body_span.start).into(),
                binding.into(),
                check.into(),
                Token::synthesized(TokenKind::Punctuation, "}", span.end).into(),
            ],
        );
        let repeat = ast.alloc(
            ExprKind::Repeat,
            vec![Token::keyword(Keyword::Repeat, body_span.start).into(), code.into()],
        );
        Some(ast.alloc_with_span(
            ExprKind::If,
            vec![
                Token::keyword(Keyword::If, span.start).into(),
                cond.into(),
                Token::keyword(Keyword::Then, cond_span.end).into(),
                repeat.into(),
            ],
            span,
        ))
    }
}

fn two_operands(ast: &Ast, id: NodeId) -> Option<(NodeId, NodeId)> {
    match ast.expressions(id).as_slice() {
        &[a, b] => Some((a, b)),
        _ => None,
    }
}

/// Span of the operator token, or the node start when it was synthesized
/// without one.
fn operator_span(ast: &Ast, id: NodeId) -> Span {
    ast.tokens(id)
        .next()
        .map(|token| token.span)
        .unwrap_or_else(|| ast.span(id).start_point())
}

fn unary(ast: &mut Ast, id: NodeId, op: &str) -> Option<NodeId> {
    let operand = *ast.expressions(id).first()?;
    let span = ast.span(id);
    let op_span = operator_span(ast, id);
    let message = if op == "-" { "negative" } else { op };
    ast.detach(operand);
    let message = ast.leaf(ExprKind::Constant(Constant::symbol(message)), op_span);
    Some(ast.alloc_with_span(
        ExprKind::Call,
        vec![operand.into(), message.into()],
        span,
    ))
}

fn binary(ast: &mut Ast, id: NodeId, op: &str) -> Option<NodeId> {
    let (lhs, rhs) = two_operands(ast, id)?;
    let span = ast.span(id);
    let op_span = operator_span(ast, id);
    ast.detach(lhs);
    ast.detach(rhs);
    let message = ast.leaf(ExprKind::Constant(Constant::symbol(op)), op_span);
    let partial = ast.alloc(ExprKind::Call, vec![lhs.into(), message.into()]);
    Some(ast.alloc_with_span(ExprKind::Call, vec![partial.into(), rhs.into()], span))
}

fn logic_node(ast: &mut Ast, id: NodeId, op: LogicOp) -> Option<NodeId> {
    two_operands(ast, id)?;
    let span = ast.span(id);
    let children = ast.children(id).to_vec();
    for &child in &children {
        ast.detach(child);
    }
    Some(ast.alloc_with_span(ExprKind::Logic { op }, vec![children.into()], span))
}

/// Append `else ()` to a two-armed `if`. Returns whether anything changed.
fn complete_if(ast: &mut Ast, id: NodeId) -> bool {
    if ast.expressions(id).len() != 2 {
        return false;
    }
    let end = ast.span(id).end;
    let nothing = ast.leaf(ExprKind::Constant(Constant::nothing()), Span::at(end));
    ast.append(
        id,
        vec![Token::keyword(Keyword::Else, end).into(), nothing.into()],
    );
    true
}

fn function(ast: &mut Ast, id: NodeId, input: bool, output: bool) -> Option<NodeId> {
    let body = *ast.expressions(id).first()?;
    let span = ast.span(id);
    let mut types = ast.types(id).into_iter();
    let input_ty = if input { types.next() } else { None };
    let output_ty = if output { types.next() } else { None };
    for part in [Some(body), input_ty, output_ty].into_iter().flatten() {
        ast.detach(part);
    }
    let input_ty = match input_ty {
        Some(ty) => ty,
        None => ast.leaf(TypeKind::Empty, span.start_point()),
    };

    let handler = ast.alloc_with_span(
        ExprKind::On,
        vec![
            Token::keyword(Keyword::On, span.start).into(),
            input_ty.into(),
            output_ty.into(),
            body.into(),
        ],
        span,
    );
    let code = ast.alloc_with_span(
        ExprKind::Block,
        vec![
            Token::synthesized(TokenKind::Punctuation, "{", span.start).into(),
            handler.into(),
            Token::synthesized(TokenKind::Punctuation, "}", span.end).into(),
        ],
        span,
    );
    Some(ast.alloc_with_span(
        ExprKind::New,
        vec![Token::keyword(Keyword::New, span.start).into(), code.into()],
        span,
    ))
}

/// Replace a single-item block by its item, unless the item only makes
/// sense directly inside a block.
fn collapse_block(ast: &mut Ast, id: NodeId) -> Option<NodeId> {
    let item = match ast.expressions(id).as_slice() {
        &[item] => item,
        _ => return None,
    };
    let keeps_block = matches!(
        ast.expr(item),
        Some(
            ExprKind::Locals
                | ExprKind::Local { .. }
                | ExprKind::Assignment { .. }
                | ExprKind::On
        )
    );
    if keeps_block {
        return None;
    }
    ast.detach(item);
    ast.set_grouped(item, true);
    Some(item)
}
