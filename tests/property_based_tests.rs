//! Property-based tests for the parser and the printer, plus an
//! interpreter/compiler agreement check over generated arithmetic.
use std::cell::RefCell;
use std::rc::Rc;

use mql::{
    Args, BinaryOp, Compiler, Env, Expr, Ident, Interpreter, Node, Number, Signature, TokenArena,
    TokenId, UnaryOp, Value,
};
use proptest::prelude::*;

fn make_node(expr: Expr) -> Rc<Node> {
    Rc::new(Node {
        token_id: TokenId::new(0),
        expr: Rc::new(expr),
    })
}

mod strategies {
    use super::*;

    /// Identifiers the lexer accepts; `math`/`m` excluded so generated
    /// trees stay resolution-agnostic.
    pub fn ident() -> impl Strategy<Value = Ident> {
        "[a-z_][a-z0-9_]{0,8}"
            .prop_filter("keep the builtin root out of generated trees", |name| {
                name != "math" && name != "m"
            })
            .prop_map(|name| Ident::new(&name))
    }

    /// Literals that print and re-parse exactly: non-negative, three
    /// decimal places at most.
    pub fn number() -> impl Strategy<Value = Number> {
        (0u32..100_000).prop_map(|n| Number::new(f64::from(n) / 1000.0))
    }

    pub fn binary_op() -> impl Strategy<Value = BinaryOp> {
        prop_oneof![
            Just(BinaryOp::Add),
            Just(BinaryOp::Sub),
            Just(BinaryOp::Mul),
            Just(BinaryOp::Div),
            Just(BinaryOp::Eq),
            Just(BinaryOp::Ne),
            Just(BinaryOp::Lt),
            Just(BinaryOp::Lte),
            Just(BinaryOp::Gt),
            Just(BinaryOp::Gte),
            Just(BinaryOp::NullCoalesce),
        ]
    }

    fn leaf() -> impl Strategy<Value = Rc<Node>> {
        prop_oneof![
            number().prop_map(|n| make_node(Expr::Number(n))),
            ident().prop_map(|ident| make_node(Expr::Ident(ident))),
        ]
    }

    pub fn expr() -> impl Strategy<Value = Rc<Node>> {
        leaf().prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                (inner.clone(), binary_op(), inner.clone())
                    .prop_map(|(lhs, op, rhs)| make_node(Expr::Binary(op, lhs, rhs))),
                inner
                    .clone()
                    .prop_map(|rhs| make_node(Expr::Unary(UnaryOp::Negate, rhs))),
                (inner.clone(), inner.clone(), inner.clone()).prop_map(|(cond, then, otherwise)| {
                    make_node(Expr::Ternary {
                        cond,
                        then,
                        otherwise,
                    })
                }),
                (ident(), ident()).prop_map(|(root, member)| {
                    let target = make_node(Expr::Ident(root));
                    make_node(Expr::Access(target, member))
                }),
                (
                    ident(),
                    ident(),
                    proptest::collection::vec(inner.clone(), 0..3)
                )
                    .prop_map(|(root, member, args)| {
                        let target = make_node(Expr::Ident(root));
                        let access = make_node(Expr::Access(target, member));
                        make_node(Expr::Call(access, Args::from_vec(args)))
                    }),
            ]
        })
    }

    /// Number-only trees, admissible on both execution paths.
    pub fn arithmetic() -> impl Strategy<Value = Rc<Node>> {
        let op = prop_oneof![
            Just(BinaryOp::Add),
            Just(BinaryOp::Sub),
            Just(BinaryOp::Mul),
            Just(BinaryOp::Div),
            Just(BinaryOp::Eq),
            Just(BinaryOp::Ne),
            Just(BinaryOp::Lt),
            Just(BinaryOp::Lte),
            Just(BinaryOp::Gt),
            Just(BinaryOp::Gte),
        ];
        let leaf = number().prop_map(|n| make_node(Expr::Number(n)));
        leaf.prop_recursive(4, 24, 3, move |inner| {
            prop_oneof![
                (inner.clone(), op.clone(), inner.clone())
                    .prop_map(|(lhs, op, rhs)| make_node(Expr::Binary(op, lhs, rhs))),
                inner
                    .clone()
                    .prop_map(|rhs| make_node(Expr::Unary(UnaryOp::Negate, rhs))),
                (inner.clone(), inner.clone(), inner.clone()).prop_map(|(cond, then, otherwise)| {
                    make_node(Expr::Ternary {
                        cond,
                        then,
                        otherwise,
                    })
                }),
            ]
        })
    }
}

proptest! {
    // Printing an AST and parsing it back yields the same tree, up to
    // spacing and redundant parentheses (checked through the printer).
    #[test]
    fn printed_ast_reparses_to_the_same_shape(node in strategies::expr()) {
        let printed = node.to_string();
        let token_arena = Rc::new(RefCell::new(TokenArena::with_capacity(1024)));
        let reparsed = mql::parse(&printed, token_arena).unwrap();
        prop_assert_eq!(reparsed.to_string(), printed);
    }

    #[test]
    fn tokenizer_and_parser_never_panic(input in "[ -~]{0,48}") {
        let _ = mql::tokenize(&input);
        let token_arena = Rc::new(RefCell::new(TokenArena::with_capacity(1024)));
        let _ = mql::parse(&input, token_arena);
    }

    #[test]
    fn interpreter_matches_compiler_on_arithmetic(node in strategies::arithmetic()) {
        let printed = node.to_string();

        let interpreted = match Interpreter::new().evaluate(&printed, &Env::new()).unwrap() {
            Value::Number(n) => n.value(),
            other => {
                prop_assert!(false, "non-numeric result {}", other);
                unreachable!()
            }
        };
        let compiled = Compiler::new(Signature::new(), Vec::new())
            .unwrap()
            .compile(&printed)
            .unwrap()
            .call(&[])
            .unwrap();

        prop_assert!(
            interpreted == compiled || (interpreted.is_nan() && compiled.is_nan()),
            "`{}`: interpreted {} != compiled {}",
            printed,
            interpreted,
            compiled
        );
    }
}
