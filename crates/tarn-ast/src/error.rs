//! The compile error log shared by every phase.
//!
//! Errors never abort a phase. Each one is recorded against the offending
//! node and the phase continues with a best-effort result, so the log ends up
//! exhaustive rather than stopping at the first fault.

use std::fmt;

use tarn_common::Span;

use crate::tree::{Ast, NodeId};

/// Which phase reports a given error kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Structural misuse found while desugaring.
    Legality,
    /// Type errors found while computing types.
    Type,
}

/// What went wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An unnamed struct field follows a named one.
    PositionalAfterNamed,
    /// The same field name appears twice in one struct or compound type.
    DuplicateField { name: String },
    /// `new` whose code is neither an `on` nor a block holding one.
    NewWithoutHandler,
    /// An assignment whose nearest enclosing expression is not a block.
    AssignmentOutsideBlock,
    /// A `let`/`var` whose nearest enclosing expression is not a block.
    LocalOutsideBlock,
    ReturnOutsideHandler,
    BreakOutsideRepeat,
    UnresolvedType { name: String },
    UnresolvedName { name: String },
    NonBooleanCondition,
    NonBooleanOperand { op: String },
    IncompatibleAssignment,
    ImmutableAssignment { name: String },
    NoMatchingHandler,
    IncompatibleReturn,
    /// A definition that depends on itself without an annotated type.
    RecursiveDefinition { name: String },
    UnreachableCode,
    /// A wildcard asked to bind to a second, incompatible type.
    WildcardConflict { name: String, bound: String },
    TemplateArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

impl ErrorKind {
    pub fn phase(&self) -> Phase {
        match self {
            ErrorKind::PositionalAfterNamed
            | ErrorKind::NewWithoutHandler
            | ErrorKind::AssignmentOutsideBlock
            | ErrorKind::LocalOutsideBlock
            | ErrorKind::ReturnOutsideHandler
            | ErrorKind::BreakOutsideRepeat => Phase::Legality,
            // Duplicate names are caught by both phases: struct literals by
            // the desugar pass, compound types by the type compiler.
            ErrorKind::DuplicateField { .. } => Phase::Legality,
            _ => Phase::Type,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PositionalAfterNamed => write!(f, "Positional field after named field"),
            ErrorKind::DuplicateField { name } => write!(f, "Duplicate field name '{}'", name),
            ErrorKind::NewWithoutHandler => write!(f, "'new' requires an 'on' handler"),
            ErrorKind::AssignmentOutsideBlock => {
                write!(f, "Assignment must be directly inside a block")
            }
            ErrorKind::LocalOutsideBlock => {
                write!(f, "Local declaration must be directly inside a block")
            }
            ErrorKind::ReturnOutsideHandler => write!(f, "'return' outside of an 'on' handler"),
            ErrorKind::BreakOutsideRepeat => write!(f, "'break' outside of a 'repeat' loop"),
            ErrorKind::UnresolvedType { name } => write!(f, "Unresolved type '{}'", name),
            ErrorKind::UnresolvedName { name } => write!(f, "Unresolved name '{}'", name),
            ErrorKind::NonBooleanCondition => write!(f, "Condition must be Boolean"),
            ErrorKind::NonBooleanOperand { op } => {
                write!(f, "Operand of '{}' must be Boolean", op)
            }
            ErrorKind::IncompatibleAssignment => write!(f, "Incompatible types in assignment"),
            ErrorKind::ImmutableAssignment { name } => {
                write!(f, "Cannot assign to immutable '{}'", name)
            }
            ErrorKind::NoMatchingHandler => write!(f, "No matching handler found"),
            ErrorKind::IncompatibleReturn => write!(f, "Incompatible return type"),
            ErrorKind::RecursiveDefinition { name } => write!(
                f,
                "Recursive definition of '{}' requires a type annotation",
                name
            ),
            ErrorKind::UnreachableCode => write!(f, "Unreachable code after 'return'"),
            ErrorKind::WildcardConflict { name, bound } => {
                write!(f, "Wildcard '{}' already resolved to '{}'", name, bound)
            }
            ErrorKind::TemplateArity {
                name,
                expected,
                found,
            } => write!(
                f,
                "Template '{}' expects {} argument(s), found {}",
                name, expected, found
            ),
        }
    }
}

/// One recorded error: what, and which node it is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub node: NodeId,
    pub span: Span,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

/// Position in an [`Errors`] log, taken before a speculative step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorMark(usize);

/// Append-only, ordered error log.
#[derive(Clone, Debug, Default)]
pub struct Errors {
    list: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Errors { list: Vec::new() }
    }

    /// Record an error against `node`, taking its span from the tree.
    pub fn report(&mut self, ast: &Ast, node: NodeId, kind: ErrorKind) {
        let span = ast.span(node);
        log::trace!("error {} at {}: {}", kind.phase_tag(), span, kind);
        self.list.push(Error { kind, node, span });
    }

    pub fn mark(&self) -> ErrorMark {
        ErrorMark(self.list.len())
    }

    /// Drop everything recorded since `mark`.
    pub fn restore(&mut self, mark: ErrorMark) {
        self.list.truncate(mark.0);
    }

    /// Errors recorded since `mark`.
    pub fn since(&self, mark: ErrorMark) -> &[Error] {
        &self.list[mark.0.min(self.list.len())..]
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[Error] {
        &self.list
    }

    /// `[start:end] message`, comma-joined across the log.
    pub fn inspect(&self) -> String {
        self.list
            .iter()
            .map(|e| format!("{} {}", e.span, e.kind))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ErrorKind {
    fn phase_tag(&self) -> &'static str {
        match self.phase() {
            Phase::Legality => "legality",
            Phase::Type => "type",
        }
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ExprKind;

    fn tree() -> (Ast, NodeId, NodeId) {
        let mut ast = Ast::new();
        let a = ast.leaf(ExprKind::Reference { name: "a".into() }, Span::new(0, 1));
        let b = ast.leaf(ExprKind::Reference { name: "b".into() }, Span::new(4, 9));
        (ast, a, b)
    }

    #[test]
    fn inspect_formats_spans_and_messages() {
        let (ast, a, b) = tree();
        let mut errors = Errors::new();
        errors.report(&ast, a, ErrorKind::UnresolvedName { name: "a".into() });
        errors.report(&ast, b, ErrorKind::NoMatchingHandler);
        assert_eq!(
            errors.inspect(),
            "[0:1] Unresolved name 'a', [4:9] No matching handler found"
        );
    }

    #[test]
    fn restore_rolls_back_speculative_errors() {
        let (ast, a, b) = tree();
        let mut errors = Errors::new();
        errors.report(&ast, a, ErrorKind::UnreachableCode);
        let mark = errors.mark();
        errors.report(&ast, b, ErrorKind::IncompatibleAssignment);
        assert_eq!(errors.since(mark).len(), 1);

        errors.restore(mark);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.as_slice()[0].kind, ErrorKind::UnreachableCode);
    }

    #[test]
    fn phases_are_classified() {
        assert_eq!(ErrorKind::BreakOutsideRepeat.phase(), Phase::Legality);
        assert_eq!(ErrorKind::NoMatchingHandler.phase(), Phase::Type);
    }
}
