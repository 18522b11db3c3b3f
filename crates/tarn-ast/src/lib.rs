//! Tarn syntax tree: a source-preserving, rewritable arena of nodes.
//!
//! Every later phase works on this representation. The tree keeps token
//! leaves next to expression and type nodes so that regenerated source text
//! round-trips, and parent links so that passes can ask contextual questions
//! ("is my nearest enclosing expression a block?") without re-walking.
//!
//! # Architecture
//!
//! - [`kind`]: closed enumerations of expression and type node kinds
//! - [`tree`]: the [`Ast`] arena, [`NodeId`] handles, queries, and the
//!   generic [`Ast::rewrite`] primitive
//! - [`builder`]: source-ordered construction with real spans
//! - [`error`]: the shared, ordered [`Errors`] log
//! - `dump`: [`Ast::debug_tree`] rendering

pub mod builder;
mod dump;
pub mod error;
pub mod kind;
pub mod tree;

pub use builder::Builder;
pub use error::{Error, ErrorKind, ErrorMark, Errors, Phase};
pub use kind::{ConstKind, Constant, ExprKind, LogicOp, NodeKind, TypeKind};
pub use tree::{Ast, Element, NodeId};
