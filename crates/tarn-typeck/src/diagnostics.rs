//! Ariadne-based rendering of recorded errors.
//!
//! Output is colorless so it can be compared in tests. Each diagnostic
//! carries an error code, the message, one label on the offending node, a
//! `file:line:col` note, and a help line where a fix is obvious.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use tarn_ast::{Error, ErrorKind};
use tarn_common::LineIndex;

// ── Error Codes ────────────────────────────────────────────────────────

fn error_code(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PositionalAfterNamed => "E0001",
        ErrorKind::DuplicateField { .. } => "E0002",
        ErrorKind::NewWithoutHandler => "E0003",
        ErrorKind::AssignmentOutsideBlock => "E0004",
        ErrorKind::LocalOutsideBlock => "E0005",
        ErrorKind::ReturnOutsideHandler => "E0006",
        ErrorKind::BreakOutsideRepeat => "E0007",
        ErrorKind::UnresolvedType { .. } => "E0008",
        ErrorKind::UnresolvedName { .. } => "E0009",
        ErrorKind::NonBooleanCondition => "E0010",
        ErrorKind::NonBooleanOperand { .. } => "E0011",
        ErrorKind::IncompatibleAssignment => "E0012",
        ErrorKind::ImmutableAssignment { .. } => "E0013",
        ErrorKind::NoMatchingHandler => "E0014",
        ErrorKind::IncompatibleReturn => "E0015",
        ErrorKind::RecursiveDefinition { .. } => "E0016",
        ErrorKind::UnreachableCode => "W0001",
        ErrorKind::WildcardConflict { .. } => "E0017",
        ErrorKind::TemplateArity { .. } => "E0018",
    }
}

fn label(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::PositionalAfterNamed => "positional field here".to_string(),
        ErrorKind::DuplicateField { name } => format!("'{}' defined again here", name),
        ErrorKind::NewWithoutHandler => "no handler in this object".to_string(),
        ErrorKind::AssignmentOutsideBlock | ErrorKind::LocalOutsideBlock => {
            "not a block item".to_string()
        }
        ErrorKind::ReturnOutsideHandler => "no enclosing handler".to_string(),
        ErrorKind::BreakOutsideRepeat => "no enclosing loop".to_string(),
        ErrorKind::UnresolvedType { .. } => "unknown type".to_string(),
        ErrorKind::UnresolvedName { .. } => "not found in scope".to_string(),
        ErrorKind::NonBooleanCondition | ErrorKind::NonBooleanOperand { .. } => {
            "expected Boolean".to_string()
        }
        ErrorKind::IncompatibleAssignment => "value does not fit".to_string(),
        ErrorKind::ImmutableAssignment { name } => format!("'{}' is immutable", name),
        ErrorKind::NoMatchingHandler => "message not understood".to_string(),
        ErrorKind::IncompatibleReturn => "returned here".to_string(),
        ErrorKind::RecursiveDefinition { .. } => "defined in terms of itself".to_string(),
        ErrorKind::UnreachableCode => "never runs".to_string(),
        ErrorKind::WildcardConflict { bound, .. } => format!("conflicts with {}", bound),
        ErrorKind::TemplateArity { expected, .. } => format!("expected {} argument(s)", expected),
    }
}

fn help(kind: &ErrorKind) -> Option<String> {
    match kind {
        ErrorKind::PositionalAfterNamed => {
            Some("move positional fields before named ones".to_string())
        }
        ErrorKind::AssignmentOutsideBlock => Some("wrap the assignment in '{ }'".to_string()),
        ErrorKind::ImmutableAssignment { name } => {
            Some(format!("declare '{}' with 'var' to make it mutable", name))
        }
        ErrorKind::RecursiveDefinition { name } => {
            Some(format!("annotate '{}' with its type", name))
        }
        ErrorKind::UnreachableCode => Some("remove the code after 'return'".to_string()),
        _ => None,
    }
}

// ── Main Rendering Function ────────────────────────────────────────────

/// Render one recorded error against `source`.
pub fn render_diagnostic(error: &Error, source: &str, filename: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // ariadne needs a non-empty span inside the source.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };
    let span = clamp(error.span.start as usize..error.span.end as usize);
    let (line, col) = LineIndex::new(source).line_col(span.start as u32);

    let kind = if matches!(error.kind, ErrorKind::UnreachableCode) {
        ReportKind::Warning
    } else {
        ReportKind::Error
    };
    let mut builder = Report::build(kind, span.clone())
        .with_code(error_code(&error.kind))
        .with_message(error.kind.to_string())
        .with_config(config)
        .with_label(
            Label::new(span)
                .with_message(label(&error.kind))
                .with_color(Color::Red),
        )
        .with_note(format!("at {}:{}:{}", filename, line, col));
    if let Some(fix) = help(&error.kind) {
        builder.set_help(fix);
    }
    let report = builder.finish();

    let mut buf = Vec::new();
    if report.write(Source::from(source), &mut buf).is_err() {
        return format!("{}:{}:{}: {}", filename, line, col, error.kind);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_ast::NodeId;
    use tarn_common::Span;

    fn error(kind: ErrorKind, start: u32, end: u32) -> Error {
        Error {
            kind,
            node: NodeId(0),
            span: Span::new(start, end),
        }
    }

    #[test]
    fn renders_code_message_and_location() {
        let src = "let x = 1\nx := 2";
        let err = error(
            ErrorKind::ImmutableAssignment {
                name: "x".to_string(),
            },
            10,
            16,
        );
        let output = render_diagnostic(&err, src, "main.tarn");

        assert!(output.contains("E0013"), "{}", output);
        assert!(output.contains("Cannot assign to immutable 'x'"), "{}", output);
        assert!(output.contains("'x' is immutable"), "{}", output);
        assert!(output.contains("main.tarn:2:1"), "{}", output);
        assert!(output.contains("declare 'x' with 'var'"), "{}", output);
    }

    #[test]
    fn unreachable_code_is_a_warning() {
        let src = "return 1; 2";
        let output = render_diagnostic(&error(ErrorKind::UnreachableCode, 10, 11), src, "t");
        assert!(output.contains("W0001"), "{}", output);
        assert!(output.contains("Warning"), "{}", output);
    }

    #[test]
    fn empty_span_is_widened() {
        let src = "abc def";
        let output = render_diagnostic(&error(ErrorKind::NoMatchingHandler, 4, 4), src, "t");
        assert!(output.contains("E0014"), "{}", output);
        assert!(output.contains("No matching handler found"), "{}", output);
        assert!(output.contains("t:1:5"), "{}", output);
    }

    #[test]
    fn codes_are_unique() {
        let kinds = [
            ErrorKind::PositionalAfterNamed,
            ErrorKind::NewWithoutHandler,
            ErrorKind::AssignmentOutsideBlock,
            ErrorKind::LocalOutsideBlock,
            ErrorKind::ReturnOutsideHandler,
            ErrorKind::BreakOutsideRepeat,
            ErrorKind::NonBooleanCondition,
            ErrorKind::IncompatibleAssignment,
            ErrorKind::NoMatchingHandler,
            ErrorKind::IncompatibleReturn,
            ErrorKind::UnreachableCode,
        ];
        let mut codes: Vec<&str> = kinds.iter().map(error_code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }
}
