pub mod builtin;
pub mod error;

use std::cell::RefCell;
use std::rc::Rc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::arena::TokenArena;
use crate::ast::node::{Args, BinaryOp, Expr, Node, UnaryOp};
use crate::error::{Error, InnerError};
use crate::lexer::token::{Token, TokenKind};
use crate::number::Number;
use crate::range::Range;
use crate::value::{QueryObject, Value};
use error::EvalError;

/// The environment a script is interpreted against: query-root names bound
/// to host objects. The built-in `math`/`m` root is always present.
#[derive(Debug, Clone)]
pub struct Env {
    roots: FxHashMap<CompactString, Rc<QueryObject>>,
}

impl Default for Env {
    fn default() -> Self {
        let math = builtin::math_object();
        let mut roots = FxHashMap::default();
        roots.insert(CompactString::from("math"), Rc::clone(&math));
        roots.insert(CompactString::from("m"), math);
        Self { roots }
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a query root under one or more names (e.g. both `q` and
    /// `query`).
    pub fn define(&mut self, names: &[&str], object: Rc<QueryObject>) {
        for name in names {
            self.roots
                .insert(CompactString::from(*name), Rc::clone(&object));
        }
    }

    fn resolve(&self, name: &str) -> Option<Rc<QueryObject>> {
        self.roots.get(name).cloned()
    }
}

/// The tree-walking fallback path.
///
/// Name resolution happens on every node visit; hosts that evaluate the same
/// script often should compile it instead.
#[derive(Debug, Clone)]
pub struct Interpreter {
    token_arena: Rc<RefCell<TokenArena>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            token_arena: Rc::new(RefCell::new(TokenArena::with_capacity(1024))),
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and evaluates `code` against `env`.
    pub fn evaluate(&self, code: &str, env: &Env) -> Result<Value, Error> {
        let node = crate::parse(code, Rc::clone(&self.token_arena))?;
        self.evaluate_ast(&node, env)
            .map_err(|e| Error::from_error(code, InnerError::Eval(e)))
    }

    /// Evaluates an already parsed expression.
    pub fn evaluate_ast(&self, node: &Rc<Node>, env: &Env) -> Result<Value, EvalError> {
        self.eval_node(node, env)
    }

    fn token(&self, node: &Node) -> Token {
        self.token_arena
            .borrow()
            .get(node.token_id)
            .map(|token| (**token).clone())
            .unwrap_or(Token {
                range: Range::default(),
                kind: TokenKind::Eof,
            })
    }

    fn eval_node(&self, node: &Rc<Node>, env: &Env) -> Result<Value, EvalError> {
        match &*node.expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Ident(ident) => env
                .resolve(&ident.name)
                .map(Value::Object)
                .ok_or_else(|| EvalError::QueryNotFound(self.token(node), ident.name.clone())),
            Expr::Access(target, member) => {
                let object = self.eval_query(target, env)?;
                let value = object.member(&member.name).ok_or_else(|| {
                    EvalError::MemberNotFound(
                        self.token(node),
                        CompactString::from(object.name()),
                        member.name.clone(),
                    )
                })?;

                match value {
                    // `q.name` and `q.name()` are equivalent.
                    Value::Callable(callable) if callable.arity() == 0 => callable.invoke(&[]),
                    value => Ok(value.clone()),
                }
            }
            Expr::Call(access, args) => self.eval_call(access, args, env),
            Expr::Unary(UnaryOp::Negate, rhs) => {
                let value = self.eval_node(rhs, env)?;
                Ok(Value::Number(-self.numeric(rhs, "-", &value)?))
            }
            Expr::Binary(BinaryOp::NullCoalesce, lhs, rhs) => {
                let value = self.eval_node(lhs, env)?;
                if value.is_null() {
                    self.eval_node(rhs, env)
                } else {
                    Ok(value)
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs_value = self.eval_node(lhs, env)?;
                let rhs_value = self.eval_node(rhs, env)?;
                let op_name = op.to_string();
                let a = self.numeric(lhs, &op_name, &lhs_value)?;
                let b = self.numeric(rhs, &op_name, &rhs_value)?;

                Ok(Value::Number(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Eq => bool_to_number(a == b),
                    BinaryOp::Ne => bool_to_number(a != b),
                    BinaryOp::Lt => bool_to_number(a < b),
                    BinaryOp::Lte => bool_to_number(a <= b),
                    BinaryOp::Gt => bool_to_number(a > b),
                    BinaryOp::Gte => bool_to_number(a >= b),
                    BinaryOp::NullCoalesce => unreachable!(),
                }))
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                // All three operands run; `?:` does not short-circuit.
                let cond_value = self.eval_node(cond, env)?;
                let then_value = self.eval_node(then, env)?;
                let otherwise_value = self.eval_node(otherwise, env)?;

                if self.numeric(cond, "?:", &cond_value)?.value() != 0.0 {
                    Ok(then_value)
                } else {
                    Ok(otherwise_value)
                }
            }
        }
    }

    fn eval_call(&self, access: &Rc<Node>, args: &Args, env: &Env) -> Result<Value, EvalError> {
        let Expr::Access(target, member) = &*access.expr else {
            // The parser only builds calls on member accesses.
            unreachable!("call target is always a member access");
        };

        let object = self.eval_query(target, env)?;
        let value = object.member(&member.name).ok_or_else(|| {
            EvalError::MemberNotFound(
                self.token(access),
                CompactString::from(object.name()),
                member.name.clone(),
            )
        })?;
        let Value::Callable(callable) = value else {
            return Err(EvalError::NotCallable(
                self.token(access),
                member.name.clone(),
            ));
        };
        if callable.arity() as usize != args.len() {
            return Err(EvalError::InvalidNumberOfArguments(
                self.token(access),
                member.name.clone(),
                callable.arity(),
                args.len() as u8,
            ));
        }

        let callable = callable.clone();
        let mut argv = SmallVec::<[Value; 4]>::new();
        for arg in args {
            argv.push(self.eval_node(arg, env)?);
        }

        callable.invoke(&argv)
    }

    fn eval_query(&self, node: &Rc<Node>, env: &Env) -> Result<Rc<QueryObject>, EvalError> {
        match self.eval_node(node, env)? {
            Value::Object(object) => Ok(object),
            value => Err(EvalError::InvalidTypes {
                token: self.token(node),
                name: CompactString::from("."),
                got: value.name().to_string(),
            }),
        }
    }

    fn numeric(&self, node: &Rc<Node>, context: &str, value: &Value) -> Result<Number, EvalError> {
        value
            .as_number()
            .map(Number::new)
            .ok_or_else(|| EvalError::InvalidTypes {
                token: self.token(node),
                name: CompactString::from(context),
                got: value.name().to_string(),
            })
    }
}

fn bool_to_number(value: bool) -> Number {
    Number::new(if value { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn number(value: f64) -> Value {
        Value::Number(Number::new(value))
    }

    fn eval_str(code: &str) -> Result<Value, Error> {
        Interpreter::new().evaluate(code, &Env::new())
    }

    fn entity_env(health: f64) -> Env {
        let mut env = Env::new();
        env.define(
            &["q", "query"],
            Rc::new(
                QueryObject::new("entity")
                    .callable("health", 0, move |_| Ok(number(health)))
                    .number("level", 3.0)
                    .null("target"),
            ),
        );
        env
    }

    #[rstest]
    #[case("math.sqrt(16)", 4.0)]
    #[case("1 + 2 * 3", 7.0)]
    #[case("(1 + 2) * 3", 9.0)]
    #[case("1 == 1 ? 10 : 20", 10.0)]
    #[case("math.lerp(0, 10, 0.25)", 2.5)]
    #[case("-math.abs(-3)", -3.0)]
    #[case("math.max(1, math.min(5, 3))", 3.0)]
    #[case("m.sqrt(16)", 4.0)]
    #[case("math.pi", std::f64::consts::PI)]
    #[case("1 != 1 ? 10 : 20", 20.0)]
    #[case("2 < 3", 1.0)]
    #[case("3 <= 2", 0.0)]
    #[case("1 ?? 2", 1.0)]
    #[case("0 ?? 2", 0.0)]
    #[case("1 / 0", f64::INFINITY)]
    #[case("-1 / 0", f64::NEG_INFINITY)]
    #[case("0 / 0", f64::NAN)]
    #[case("0 / 0 == 0 / 0", 0.0)]
    #[case("0 / 0 != 0 / 0", 1.0)]
    #[case("0 / 0 < 1", 0.0)]
    #[case("0 / 0 >= 0 / 0", 0.0)]
    fn test_evaluate(#[case] code: &str, #[case] expected: f64) {
        match eval_str(code) {
            Ok(Value::Number(n)) if n.is_nan() => assert!(expected.is_nan()),
            other => assert_eq!(other, Ok(number(expected))),
        }
    }

    #[rstest]
    #[case("q.health + 1", 6.0)]
    #[case("q.health() + 1", 6.0)]
    #[case("query.health + 1", 6.0)]
    #[case("q.level * 2", 6.0)]
    #[case("q.target ?? 5", 5.0)]
    #[case("q.health ?? 5", 5.0)]
    #[case("q.target + 1", 1.0)]
    fn test_evaluate_with_query_root(#[case] code: &str, #[case] expected: f64) {
        let result = Interpreter::new().evaluate(code, &entity_env(5.0));
        assert_eq!(result, Ok(number(expected)));
    }

    #[test]
    fn test_unknown_query_root() {
        let err = eval_str("foo.bar()").unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::QueryNotFound(_, name)) if name == "foo"
        ));
    }

    #[test]
    fn test_unknown_member() {
        let err = Interpreter::new()
            .evaluate("q.mana", &entity_env(5.0))
            .unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::MemberNotFound(_, _, member)) if member == "mana"
        ));
    }

    #[test]
    fn test_calling_a_non_callable() {
        let err = Interpreter::new()
            .evaluate("q.level(1)", &entity_env(5.0))
            .unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::NotCallable(_, member)) if member == "level"
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = Interpreter::new()
            .evaluate("q.health(1)", &entity_env(5.0))
            .unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::InvalidNumberOfArguments(_, _, 0, 1))
        ));
    }

    #[test]
    fn test_arithmetic_on_query_object() {
        let err = Interpreter::new()
            .evaluate("q + 1", &entity_env(5.0))
            .unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::InvalidTypes { .. })
        ));
    }

    fn probe_env(log: Rc<RefCell<Vec<&'static str>>>) -> Env {
        let mut env = Env::new();
        let g_log = Rc::clone(&log);
        let h_log = Rc::clone(&log);
        let sum_log = Rc::clone(&log);
        env.define(
            &["q"],
            Rc::new(
                QueryObject::new("probe")
                    .callable("g", 0, move |_| {
                        g_log.borrow_mut().push("g");
                        Ok(number(1.0))
                    })
                    .callable("h", 0, move |_| {
                        h_log.borrow_mut().push("h");
                        Ok(number(2.0))
                    })
                    .callable("sum", 2, move |args| {
                        sum_log.borrow_mut().push("sum");
                        let total: f64 = args.iter().filter_map(|a| a.as_number()).sum();
                        Ok(number(total))
                    }),
            ),
        );
        env
    }

    #[test]
    fn test_arguments_evaluate_left_to_right() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let result = Interpreter::new().evaluate("q.sum(q.g(), q.h())", &probe_env(Rc::clone(&log)));
        assert_eq!(result, Ok(number(3.0)));
        assert_eq!(*log.borrow(), vec!["g", "h", "sum"]);
    }

    #[rstest]
    #[case("1 == 1 ? q.g() : q.h()", 1.0)]
    #[case("1 == 2 ? q.g() : q.h()", 2.0)]
    fn test_ternary_evaluates_both_branches(#[case] code: &str, #[case] expected: f64) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let result = Interpreter::new().evaluate(code, &probe_env(Rc::clone(&log)));
        assert_eq!(result, Ok(number(expected)));
        assert_eq!(*log.borrow(), vec!["g", "h"]);
    }

    #[test]
    fn test_host_failure_propagates() {
        let mut env = Env::new();
        env.define(
            &["q"],
            Rc::new(QueryObject::new("probe").callable("fail", 0, |_| {
                Err(EvalError::HostFailure("boom".to_string()))
            })),
        );
        let err = Interpreter::new().evaluate("q.fail()", &env).unwrap_err();
        assert!(matches!(
            err.cause,
            InnerError::Eval(EvalError::HostFailure(message)) if message == "boom"
        ));
    }
}
