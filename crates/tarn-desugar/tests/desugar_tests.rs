//! End-to-end tests for the desugar pass, pinned with tree dumps.

use tarn_ast::{Ast, Builder, ErrorKind, Errors, ExprKind, NodeId};
use tarn_desugar::{simplify, simplify_with, DesugarConfig};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(b: Builder, root: NodeId) -> (Ast, NodeId, Errors) {
    init();
    let (mut ast, _) = b.finish();
    let mut errors = Errors::new();
    let root = simplify(&mut ast, root, &mut errors);
    (ast, root, errors)
}

fn kinds(errors: &Errors) -> Vec<ErrorKind> {
    errors.iter().map(|e| e.kind.clone()).collect()
}

// ── Operators ──────────────────────────────────────────────────────────

#[test]
fn binary_chain_becomes_nested_sends() {
    // a + b * c + d, parsed as (a + (b * c)) + d
    let mut b = Builder::new();
    let root = b.binary(
        |b| {
            b.binary(
                |b| b.reference("a"),
                "+",
                |b| b.binary(|b| b.reference("b"), "*", |b| b.reference("c")),
            )
        },
        "+",
        |b| b.reference("d"),
    );
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty());
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Call
      Call
        Call
          Call
            Reference a
            Constant Symbol +
          Call
            Call
              Reference b
              Constant Symbol *
            Reference c
        Constant Symbol +
      Reference d
    ");
}

#[test]
fn not_becomes_send() {
    let mut b = Builder::new();
    let root = b.unary("not", |b| b.reference("flag"));
    let (ast, root, _) = run(b, root);

    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Call
      Reference flag
      Constant Symbol not
    ");
}

#[test]
fn and_becomes_logic() {
    let mut b = Builder::new();
    let root = b.binary(|b| b.reference("p"), "and", |b| b.reference("q"));
    let (ast, root, _) = run(b, root);

    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Logic and
      Reference p
      Reference q
    ");
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn if_without_else_gets_nothing_branch() {
    let mut b = Builder::new();
    let root = b.if_then(|b| b.reference("c"), |b| b.number("1"));
    let (ast, root, _) = run(b, root);

    insta::assert_snapshot!(ast.debug_tree(root), @r"
    If
      Reference c
      Constant Number 1
      Constant ()
    ");
}

#[test]
fn while_becomes_guarded_repeat() {
    let mut b = Builder::new();
    let root = b.while_do(|b| b.reference("c"), |b| b.reference("body"));
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty(), "unexpected errors: {}", errors.inspect());
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    If
      Reference c
      Repeat
        Block
          Locals
            Local _0
              Reference body
          If
            Call
              Reference c
              Constant Symbol not
            Break
              Reference _0
            Constant ()
      Constant ()
    ");
}

#[test]
fn while_temporary_avoids_user_names() {
    let mut b = Builder::new();
    let root = b.while_do(|b| b.reference("_0"), |b| b.reference("x"));
    let (ast, root, _) = run(b, root);

    let dump = ast.debug_tree(root);
    assert!(dump.contains("Local _1"), "got:\n{}", dump);
    assert!(!dump.contains("Local _0"), "got:\n{}", dump);
}

#[test]
fn temp_prefix_is_configurable() {
    init();
    let mut b = Builder::new();
    let root = b.while_do(|b| b.reference("c"), |b| b.reference("x"));
    let (mut ast, _) = b.finish();
    let mut errors = Errors::new();
    let config = DesugarConfig {
        temp_prefix: "loop".to_string(),
    };
    let root = simplify_with(&mut ast, root, &mut errors, &config);

    assert!(ast.debug_tree(root).contains("Local loop0"));
}

#[test]
fn break_inside_while_is_legal() {
    let mut b = Builder::new();
    let root = b.while_do(|b| b.reference("c"), |b| b.break_empty());
    let (_, _, errors) = run(b, root);
    assert!(errors.is_empty(), "unexpected errors: {}", errors.inspect());
}

#[test]
fn simplify_is_idempotent() {
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.var("n", |b| b.number("0")),
            b.while_do(
                |b| b.binary(|b| b.reference("n"), "<", |b| b.number("3")),
                |b| b.block(|b| vec![b.assign("n", |b| b.binary(|b| b.reference("n"), "+", |b| b.number("1")))]),
            ),
        ]
    });
    let (mut ast, root, errors) = run(b, root);
    assert!(errors.is_empty(), "unexpected errors: {}", errors.inspect());
    let first = ast.debug_tree(root);

    let mut again = Errors::new();
    let root2 = simplify(&mut ast, root, &mut again);
    assert_eq!(root2, root);
    assert!(again.is_empty());
    assert_eq!(ast.debug_tree(root2), first);
}

#[test]
fn no_surface_forms_survive() {
    fn walk(ast: &Ast, id: NodeId, out: &mut Vec<&'static str>) {
        if let Some(kind) = ast.expr(id).filter(|k| k.is_surface_only()) {
            out.push(kind.name());
        }
        for child in ast.expressions(id) {
            walk(ast, child, out);
        }
    }

    let mut b = Builder::new();
    let root = b.function(
        |_| (None, None),
        |b| {
            b.while_do(
                |b| b.unary("not", |b| b.boolean(false)),
                |b| b.binary(|b| b.number("1"), "-", |b| b.number("2")),
            )
        },
    );
    let (ast, root, errors) = run(b, root);
    assert!(errors.is_empty(), "unexpected errors: {}", errors.inspect());

    let mut left = Vec::new();
    walk(&ast, root, &mut left);
    assert!(left.is_empty(), "surface forms left: {:?}", left);
}

// ── Blocks and legality ────────────────────────────────────────────────

#[test]
fn assignment_inside_expression_is_reported() {
    // { y + (x := 3) }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![b.binary(
            |b| b.reference("y"),
            "+",
            |b| b.nested(|b| b.assign("x", |b| b.number("3"))),
        )]
    });
    let (ast, root, errors) = run(b, root);

    assert_eq!(errors.inspect(), "[8:14] Assignment must be directly inside a block");
    assert!(ast.is_grouped(root));
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Call
      Call
        Reference y
        Constant Symbol +
      Nested
        Assignment x
          Constant Number 3
    ");
}

#[test]
fn local_outside_block_is_reported() {
    let mut b = Builder::new();
    let root = b.nested(|b| b.let_("x", |b| b.number("1")));
    let (_, _, errors) = run(b, root);
    assert_eq!(kinds(&errors), vec![ErrorKind::LocalOutsideBlock]);
}

#[test]
fn struct_fields_get_positional_names() {
    let mut b = Builder::new();
    let root = b.structure(|b| {
        vec![
            b.field(None, |b| b.number("1")),
            b.field(Some("x"), |b| b.number("2")),
        ]
    });
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty());
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Struct
      StructField ?0
        Constant Number 1
      StructField x
        Constant Number 2
    ");
}

#[test]
fn struct_field_order_and_duplicates_are_checked() {
    let mut b = Builder::new();
    let root = b.structure(|b| {
        vec![
            b.field(Some("x"), |b| b.number("1")),
            b.field(None, |b| b.number("2")),
            b.field(Some("x"), |b| b.number("3")),
        ]
    });
    let (_, _, errors) = run(b, root);

    assert_eq!(
        kinds(&errors),
        vec![
            ErrorKind::PositionalAfterNamed,
            ErrorKind::DuplicateField { name: "x".into() },
        ]
    );
}

#[test]
fn function_becomes_object_with_handler() {
    let mut b = Builder::new();
    let root = b.function(
        |b| (Some(b.simple_type("Number")), Some(b.simple_type("Number"))),
        |b| b.reference("n"),
    );
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty());
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    New
      Block
        On
          SimpleType Number
          SimpleType Number
          Reference n
    ");
}

#[test]
fn function_without_input_takes_empty_type() {
    let mut b = Builder::new();
    let root = b.function(|_| (None, None), |b| b.return_(|b| b.number("1")));
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty(), "unexpected errors: {}", errors.inspect());
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    New
      Block
        On
          EmptyType
          Return
            Constant Number 1
    ");
}

#[test]
fn new_without_handler_is_reported() {
    let mut b = Builder::new();
    let root = b.new_object(|b| b.block(|b| vec![b.number("1"), b.number("2")]));
    let (_, _, errors) = run(b, root);
    assert_eq!(kinds(&errors), vec![ErrorKind::NewWithoutHandler]);
}

#[test]
fn return_and_break_need_their_context() {
    let mut b = Builder::new();
    let root = b.block(|b| vec![b.return_empty(), b.break_empty()]);
    let (_, _, errors) = run(b, root);

    assert_eq!(
        kinds(&errors),
        vec![ErrorKind::ReturnOutsideHandler, ErrorKind::BreakOutsideRepeat]
    );
}

#[test]
fn break_inside_repeat_is_legal() {
    let mut b = Builder::new();
    let root = b.repeat(|b| b.block(|b| vec![b.reference("x"), b.break_empty()]));
    let (ast, root, errors) = run(b, root);

    assert!(errors.is_empty());
    assert_eq!(ast.expr(root), Some(&ExprKind::Repeat));
}
