//! Tree construction and dumps through the public API.

use tarn_ast::{Builder, ExprKind};

#[test]
fn function_signature_dump() {
    let mut b = Builder::new();
    let root = b.function(
        |b| {
            let input = b.compound_type(|b| {
                vec![b.typed_field(Some("x"), |b| b.simple_type("Number"))]
            });
            (Some(input), Some(b.simple_type("Number")))
        },
        |b| b.block(|b| vec![b.reference("x")]),
    );

    insta::assert_snapshot!(b.ast().debug_tree(root), @r"
    Function
      CompoundType
        TypedField x
          SimpleType Number
      SimpleType Number
      Block
        Reference x
    ");
}

#[test]
fn annotated_local_spans_its_source() {
    let mut b = Builder::new();
    let root = b.let_typed("n", &|b: &mut Builder| b.simple_type("Number"), |b| b.number("1"));
    let (ast, source) = b.finish();

    let span = ast.span(root);
    assert_eq!(&source[span.start as usize..span.end as usize], "let n : Number = 1");
    let local = ast.expressions(root)[0];
    assert_eq!(
        ast.expr(local),
        Some(&ExprKind::Local {
            name: "n".to_string(),
            mutable: false
        })
    );
    assert_eq!(ast.types(local).len(), 1);
    insta::assert_snapshot!(ast.debug_tree(root), @r"
    Locals
      Local n
        SimpleType Number
        Constant Number 1
    ");
}
