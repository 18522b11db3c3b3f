//! End-to-end tests: build a surface tree, desugar it, type it.

use tarn_ast::{Ast, Builder, ErrorKind, NodeId};
use tarn_typeck::{compile, CheckConfig, CompileConfig, CompileResult};

// ── Helpers ────────────────────────────────────────────────────────────

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Compiled {
    ast: Ast,
    source: String,
    result: CompileResult,
}

impl Compiled {
    fn kinds(&self) -> Vec<ErrorKind> {
        self.result.errors.iter().map(|e| e.kind.clone()).collect()
    }

    fn result_type(&self) -> String {
        self.result.typeck.result_display()
    }
}

fn run_with(b: Builder, root: NodeId, config: &CompileConfig) -> Compiled {
    init();
    let (mut ast, source) = b.finish();
    let result = compile(&mut ast, root, config);
    Compiled {
        ast,
        source,
        result,
    }
}

fn collect(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
    out.push(id);
    for child in ast.expressions(id) {
        collect(ast, child, out);
    }
}

fn run(b: Builder, root: NodeId) -> Compiled {
    run_with(b, root, &CompileConfig::default())
}

/// `(name: ty)`
fn input(b: &mut Builder, name: &str, ty: &str) -> NodeId {
    b.compound_type(|b| vec![b.typed_field(Some(name), |b| b.simple_type(ty))])
}

/// `fn (param: ty) [-> output] body`
fn function(
    b: &mut Builder,
    param: (&str, &str),
    output: Option<&str>,
    body: impl FnOnce(&mut Builder) -> NodeId,
) -> NodeId {
    b.function(
        |b| {
            let input = input(b, param.0, param.1);
            let output = output.map(|o| b.simple_type(o));
            (Some(input), output)
        },
        body,
    )
}

// ── Primitives and operators ───────────────────────────────────────────

#[test]
fn arithmetic_is_number() {
    let mut b = Builder::new();
    let root = b.binary(
        |b| b.number("1"),
        "+",
        |b| b.binary(|b| b.number("2"), "*", |b| b.number("3")),
    );
    let c = run(b, root);

    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn comparison_is_boolean() {
    let mut b = Builder::new();
    let root = b.binary(|b| b.number("1"), "<", |b| b.number("2"));
    let c = run(b, root);

    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "Boolean");
}

#[test]
fn string_messages() {
    let mut b = Builder::new();
    let root = b.send(|b| b.binary(|b| b.string("a"), "+", |b| b.string("b")), "length");
    let c = run(b, root);

    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn missing_handler_falls_back_to_anything() {
    let mut b = Builder::new();
    let root = b.binary(|b| b.boolean(true), "+", |b| b.number("1"));
    let c = run(b, root);

    assert_eq!(c.kinds(), vec![ErrorKind::NoMatchingHandler]);
    assert_eq!(c.result_type(), "Anything");
}

#[test]
fn guard_mismatch_is_no_matching_handler() {
    let mut b = Builder::new();
    let root = b.binary(|b| b.string("a"), "+", |b| b.number("1"));
    let c = run(b, root);

    assert_eq!(c.kinds(), vec![ErrorKind::NoMatchingHandler]);
}

#[test]
fn unresolved_name() {
    let mut b = Builder::new();
    let root = b.reference("foo");
    let c = run(b, root);

    assert_eq!(
        c.kinds(),
        vec![ErrorKind::UnresolvedName {
            name: "foo".to_string()
        }]
    );
    assert_eq!(c.result_type(), "Anything");
}

// ── Composite values ───────────────────────────────────────────────────

#[test]
fn arrays_are_instances_of_the_template() {
    let mut b = Builder::new();
    let root = b.array(|b| vec![b.number("1"), b.number("2")]);
    let c = run(b, root);
    assert_eq!(c.result_type(), "Array(Number)");

    let mut b = Builder::new();
    let root = b.array(|b| vec![b.number("1"), b.string("a")]);
    let c = run(b, root);
    assert_eq!(c.result_type(), "Array(Number | String)");

    let mut b = Builder::new();
    let root = b.send(|b| b.array(|b| vec![b.number("1")]), "first");
    let c = run(b, root);
    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn struct_literals_are_compounds() {
    let mut b = Builder::new();
    let root = b.structure(|b| {
        vec![
            b.field(Some("x"), |b| b.number("1")),
            b.field(Some("y"), |b| b.string("a")),
        ]
    });
    let c = run(b, root);
    assert_eq!(c.result_type(), "(x: Number, y: String)");

    let mut b = Builder::new();
    let root = b.structure(|b| vec![b.field(None, |b| b.number("1")), b.field(None, |b| b.boolean(false))]);
    let c = run(b, root);
    assert_eq!(c.result_type(), "(Number, Boolean)");
}

// ── Control flow ───────────────────────────────────────────────────────

#[test]
fn if_without_else_may_be_nothing() {
    let mut b = Builder::new();
    let root = b.if_then(|b| b.boolean(true), |b| b.number("1"));
    let c = run(b, root);

    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "Number | Nothing");
}

#[test]
fn non_boolean_condition() {
    let mut b = Builder::new();
    let root = b.if_else(|b| b.number("1"), |b| b.number("2"), |b| b.number("3"));
    let c = run(b, root);

    insta::assert_snapshot!(c.result.errors.inspect(), @"[3:4] Condition must be Boolean");
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn logic_operands_must_be_boolean() {
    let mut b = Builder::new();
    let root = b.binary(|b| b.number("1"), "and", |b| b.boolean(true));
    let c = run(b, root);

    insta::assert_snapshot!(c.result.errors.inspect(), @"[0:1] Operand of 'and' must be Boolean");
    assert_eq!(c.result_type(), "Boolean");
}

#[test]
fn while_loop_types_cleanly() {
    // { var i = 0  while i < 10 do { i := i + 1 } }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.var("i", |b| b.number("0")),
            b.while_do(
                |b| b.binary(|b| b.reference("i"), "<", |b| b.number("10")),
                |b| {
                    b.block(|b| {
                        vec![b.assign("i", |b| {
                            b.binary(|b| b.reference("i"), "+", |b| b.number("1"))
                        })]
                    })
                },
            ),
        ]
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "Number | Nothing");
}

#[test]
fn repeat_is_typed_by_its_breaks() {
    let mut b = Builder::new();
    let root = b.repeat(|b| b.break_(|b| b.string("done")));
    let c = run(b, root);
    assert_eq!(c.result_type(), "String");

    let mut b = Builder::new();
    let root = b.repeat(|b| b.number("1"));
    let c = run(b, root);
    assert_eq!(c.result_type(), "Nothing");
}

// ── Locals and assignment ──────────────────────────────────────────────

#[test]
fn assignment_errors() {
    let mut b = Builder::new();
    let root = b.block(|b| vec![b.let_("x", |b| b.number("1")), b.assign("x", |b| b.number("2"))]);
    let c = run(b, root);
    assert_eq!(
        c.kinds(),
        vec![ErrorKind::ImmutableAssignment {
            name: "x".to_string()
        }]
    );

    let mut b = Builder::new();
    let root = b.block(|b| vec![b.var("y", |b| b.number("1")), b.assign("y", |b| b.string("s"))]);
    let c = run(b, root);
    assert_eq!(c.kinds(), vec![ErrorKind::IncompatibleAssignment]);

    let mut b = Builder::new();
    let root = b.block(|b| vec![b.assign("z", |b| b.number("1"))]);
    let c = run(b, root);
    assert_eq!(
        c.kinds(),
        vec![ErrorKind::UnresolvedName {
            name: "z".to_string()
        }]
    );
}

#[test]
fn annotated_local_is_checked() {
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_typed("s", &|b: &mut Builder| b.simple_type("String"), |b| b.number("1")),
            b.reference("s"),
        ]
    });
    let c = run(b, root);

    assert_eq!(c.kinds(), vec![ErrorKind::IncompatibleAssignment]);
    assert_eq!(c.result_type(), "String");
}

#[test]
fn locals_may_be_used_before_their_definition() {
    // { let f = fn (n: Number) -> Number { g(n) }
    //   let g = fn (n: Number) -> Number { n }
    //   f(1) }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_("f", |b| {
                function(b, ("n", "Number"), Some("Number"), |b| {
                    b.block(|b| vec![b.call(|b| b.reference("g"), |b| b.reference("n"))])
                })
            }),
            b.let_("g", |b| {
                function(b, ("n", "Number"), Some("Number"), |b| {
                    b.block(|b| vec![b.reference("n")])
                })
            }),
            b.call(|b| b.reference("f"), |b| b.number("1")),
        ]
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn annotated_recursion_is_accepted() {
    // { let fact: Number -> Number =
    //     fn (n: Number) -> Number { if n < 2 then 1 else n * fact(n - 1) }
    //   fact(5) }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_typed(
                "fact",
                &|b: &mut Builder| {
                    b.function_type(|b| b.simple_type("Number"), |b| b.simple_type("Number"))
                },
                |b| {
                    function(b, ("n", "Number"), Some("Number"), |b| {
                        b.block(|b| {
                            vec![b.if_else(
                                |b| b.binary(|b| b.reference("n"), "<", |b| b.number("2")),
                                |b| b.number("1"),
                                |b| {
                                    b.binary(
                                        |b| b.reference("n"),
                                        "*",
                                        |b| {
                                            b.call(
                                                |b| b.reference("fact"),
                                                |b| {
                                                    b.binary(
                                                        |b| b.reference("n"),
                                                        "-",
                                                        |b| b.number("1"),
                                                    )
                                                },
                                            )
                                        },
                                    )
                                },
                            )]
                        })
                    })
                },
            ),
            b.call(|b| b.reference("fact"), |b| b.number("5")),
        ]
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "Number");
}

#[test]
fn unannotated_recursion_is_reported_once() {
    // { let spin = fn (n: Number) { spin(n) }  spin(1) }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_("spin", |b| {
                function(b, ("n", "Number"), None, |b| {
                    b.block(|b| vec![b.call(|b| b.reference("spin"), |b| b.reference("n"))])
                })
            }),
            b.call(|b| b.reference("spin"), |b| b.number("1")),
        ]
    });
    let c = run(b, root);

    assert_eq!(
        c.kinds(),
        vec![ErrorKind::RecursiveDefinition {
            name: "spin".to_string()
        }]
    );
    assert_eq!(c.result_type(), "Anything");
}

// ── Handlers and objects ───────────────────────────────────────────────

#[test]
fn function_type_and_call() {
    // { let inc = fn (x: Number) -> Number { x + 1 }  inc(41) }
    let mut call = None;
    let mut b = Builder::new();
    let root = b.block(|b| {
        let inc = b.let_("inc", |b| {
            function(b, ("x", "Number"), Some("Number"), |b| {
                b.block(|b| vec![b.binary(|b| b.reference("x"), "+", |b| b.number("1"))])
            })
        });
        let site = b.call(|b| b.reference("inc"), |b| b.number("41"));
        call = Some(site);
        vec![inc, site]
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "Number");
    let call = call.unwrap();
    let guard = c.result.typeck.coercions[&call];
    assert_eq!(c.result.typeck.table.display(guard).to_string(), "(x: Number)");
    assert_eq!(c.result.typeck.display_type(call).as_deref(), Some("Number"));
}

#[test]
fn function_object_displays_as_its_handler() {
    let mut b = Builder::new();
    let root = function(&mut b, ("x", "Number"), Some("Number"), |b| {
        b.block(|b| vec![b.reference("x")])
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty());
    assert_eq!(c.result_type(), "(x: Number) -> Number");
}

#[test]
fn objects_dispatch_on_the_message_type() {
    // { let o = new { on (x: Number) -> Number x  on (s: String) -> String s }
    //   o("a") }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_("o", |b| {
                b.new_object(|b| {
                    b.block(|b| {
                        vec![
                            b.on(
                                |b| (input(b, "x", "Number"), Some(b.simple_type("Number"))),
                                |b| b.reference("x"),
                            ),
                            b.on(
                                |b| (input(b, "s", "String"), Some(b.simple_type("String"))),
                                |b| b.reference("s"),
                            ),
                        ]
                    })
                })
            }),
            b.call(|b| b.reference("o"), |b| b.string("a")),
        ]
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "String");
}

#[test]
fn incompatible_return() {
    let mut b = Builder::new();
    let root = function(&mut b, ("x", "Number"), Some("String"), |b| {
        b.block(|b| vec![b.reference("x")])
    });
    let c = run(b, root);

    assert_eq!(c.kinds(), vec![ErrorKind::IncompatibleReturn]);
}

#[test]
fn early_returns_join_the_result() {
    // fn (x: Number) { if x < 0 then return "neg"  x }
    let mut b = Builder::new();
    let root = function(&mut b, ("x", "Number"), None, |b| {
        b.block(|b| {
            vec![
                b.if_then(
                    |b| b.binary(|b| b.reference("x"), "<", |b| b.number("0")),
                    |b| b.return_(|b| b.string("neg")),
                ),
                b.reference("x"),
            ]
        })
    });
    let c = run(b, root);

    assert!(c.kinds().is_empty(), "{}", c.result.errors.inspect());
    assert_eq!(c.result_type(), "(x: Number) -> String | Number");
}

#[test]
fn unreachable_code_is_reported_once() {
    // fn (x: Number) -> Number { return x  print(x)  x }
    let build = || {
        let mut b = Builder::new();
        let root = function(&mut b, ("x", "Number"), Some("Number"), |b| {
            b.block(|b| {
                vec![
                    b.return_(|b| b.reference("x")),
                    b.call(|b| b.reference("print"), |b| b.reference("x")),
                    b.reference("x"),
                ]
            })
        });
        (b, root)
    };

    let (b, root) = build();
    let c = run(b, root);
    assert_eq!(c.kinds(), vec![ErrorKind::UnreachableCode]);

    let (b, root) = build();
    let config = CompileConfig {
        check: CheckConfig {
            report_unreachable: false,
            ..CheckConfig::default()
        },
        ..CompileConfig::default()
    };
    let c = run_with(b, root, &config);
    assert!(c.kinds().is_empty());
}

#[test]
fn generic_handler_binds_its_wildcard_once() {
    // { let id = fn (x: $T) -> $T { x }  id(1)  id("s") }
    let mut b = Builder::new();
    let root = b.block(|b| {
        vec![
            b.let_("id", |b| {
                b.function(
                    |b| {
                        let input = b.compound_type(|b| {
                            vec![b.typed_field(Some("x"), |b| b.parameter_type("T"))]
                        });
                        (Some(input), Some(b.parameter_type("T")))
                    },
                    |b| b.block(|b| vec![b.reference("x")]),
                )
            }),
            b.call(|b| b.reference("id"), |b| b.number("1")),
            b.call(|b| b.reference("id"), |b| b.string("s")),
        ]
    });
    let c = run(b, root);

    assert_eq!(
        c.kinds(),
        vec![
            ErrorKind::WildcardConflict {
                name: "$T".to_string(),
                bound: "Number".to_string(),
            },
            ErrorKind::NoMatchingHandler,
        ]
    );
}

// ── Pipeline ───────────────────────────────────────────────────────────

#[test]
fn legality_errors_come_before_type_errors() {
    // { break  foo }
    let mut b = Builder::new();
    let root = b.block(|b| vec![b.break_empty(), b.reference("foo")]);
    let c = run(b, root);

    assert_eq!(
        c.kinds(),
        vec![
            ErrorKind::BreakOutsideRepeat,
            ErrorKind::UnresolvedName {
                name: "foo".to_string()
            },
        ]
    );
}

#[test]
fn rendered_errors_point_into_the_source() {
    let mut b = Builder::new();
    let root = b.block(|b| vec![b.let_("x", |b| b.number("1")), b.assign("x", |b| b.number("2"))]);
    let c = run(b, root);

    let rendered = c.result.render_errors(&c.source, "main.tarn");
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("E0013"), "{}", rendered[0]);
    assert!(rendered[0].contains("main.tarn:1:"), "{}", rendered[0]);
}

#[test]
fn every_expression_gets_a_type() {
    let mut b = Builder::new();
    let root = b.block(|b| vec![b.let_("x", |b| b.number("1")), b.reference("x")]);
    let c = run(b, root);

    let mut reachable = Vec::new();
    collect(&c.ast, c.result.root, &mut reachable);
    let untyped: Vec<NodeId> = reachable
        .into_iter()
        .filter(|&id| c.result.typeck.type_of(id).is_none())
        .collect();
    assert!(untyped.is_empty(), "{:?}", untyped);
}
