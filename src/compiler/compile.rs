use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use compact_str::{CompactString, format_compact};
use rustc_hash::{FxHashSet, FxHasher};
use smallvec::SmallVec;

use crate::arena::TokenArena;
use crate::ast::node::{BinaryOp, Expr, Ident, Node, UnaryOp};
use crate::error::{Error, InnerError};
use crate::eval::builtin;
use crate::lexer::token::{Token, TokenKind};
use crate::range::Range;

use super::compiled::{CompiledExpr, CompiledScript};
use super::error::CompileError;
use super::signature::{ClassInfo, ParamBinding, ParamInfo, ParamKind, Signature};

/// Compiles scripts against a script signature registered once at
/// construction.
///
/// Reuse one instance where possible; resolution state lives for its whole
/// lifetime. A compiler is not safe under concurrent `compile` calls and
/// must be synchronized externally. The callables it produces carry no such
/// restriction.
#[derive(Debug)]
pub struct Compiler {
    params: Vec<ParamInfo>,
    token_arena: Rc<RefCell<TokenArena>>,
    counter: u32,
}

impl Compiler {
    /// Validates the signature and fills generically declared slots with
    /// the provided concrete types, in declaration order.
    pub fn new(signature: Signature, generics: Vec<Rc<ClassInfo>>) -> Result<Self, CompileError> {
        let declared = signature
            .params
            .iter()
            .filter(|spec| matches!(spec.binding, ParamBinding::Generic))
            .count();
        if declared != generics.len() {
            return Err(CompileError::GenericCountMismatch {
                expected: declared,
                got: generics.len(),
            });
        }

        // `math` and `m` always resolve to the built-in root.
        let mut seen = FxHashSet::default();
        seen.insert(CompactString::from("math"));
        seen.insert(CompactString::from("m"));

        let mut generics = generics.into_iter();
        let mut params = Vec::with_capacity(signature.params.len());
        for (slot, spec) in signature.params.into_iter().enumerate() {
            if spec.names.is_empty() {
                return Err(CompileError::EmptyParamNames(slot));
            }
            for name in &spec.names {
                if !seen.insert(name.clone()) {
                    return Err(CompileError::DuplicateQueryName(name.clone()));
                }
            }

            let info = match spec.binding {
                ParamBinding::Concrete(info) => info,
                ParamBinding::Generic => match generics.next() {
                    Some(info) => info,
                    None => unreachable!("generic count was validated above"),
                },
            };
            params.push(ParamInfo {
                names: spec.names,
                info,
            });
        }

        Ok(Self {
            params,
            token_arena: Rc::new(RefCell::new(TokenArena::with_capacity(1024))),
            counter: 0,
        })
    }

    /// Parses and compiles `code` into a specialized callable.
    pub fn compile(&mut self, code: &str) -> Result<CompiledScript, Error> {
        let node = crate::parse(code, Rc::clone(&self.token_arena))?;
        let body = self
            .compile_node(&node)
            .map_err(|e| Error::from_error(code, InnerError::Compile(e)))?;

        let name = self.mint_name(code);
        let params = self
            .params
            .iter()
            .map(|param| (param.info.type_id(), param.info.type_name()))
            .collect();
        Ok(CompiledScript::new(name, params, body))
    }

    // Unique per script: source hash plus a counter that only ever moves
    // forward within this compiler instance.
    fn mint_name(&mut self, code: &str) -> CompactString {
        let mut hasher = FxHasher::default();
        code.hash(&mut hasher);
        let name = format_compact!("mql${:x}${}", hasher.finish(), self.counter);
        self.counter += 1;
        name
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

    fn compile_node(&self, node: &Rc<Node>) -> Result<CompiledExpr, CompileError> {
        match &*node.expr {
            Expr::Number(n) => {
                let value = n.value();
                Ok(Box::new(move |_| Ok(value)))
            }
            Expr::Ident(_) => Err(CompileError::UnsupportedFeature(
                self.token(node),
                "a bare query reference has no numeric value".to_string(),
            )),
            // A plain member access is a zero-argument call.
            Expr::Access(target, member) => self.compile_call(node, target, member, &[]),
            Expr::Call(access, args) => {
                let Expr::Access(target, member) = &*access.expr else {
                    unreachable!("call target is always a member access");
                };
                self.compile_call(access, target, member, args)
            }
            Expr::Unary(UnaryOp::Negate, rhs) => {
                let rhs = self.compile_node(rhs)?;
                Ok(Box::new(move |roots| Ok(-rhs(roots)?)))
            }
            Expr::Binary(BinaryOp::NullCoalesce, _, _) => Err(CompileError::UnsupportedFeature(
                self.token(node),
                "null coalescing is not supported in compiled scripts".to_string(),
            )),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.compile_node(lhs)?;
                let rhs = self.compile_node(rhs)?;
                Ok(match op {
                    BinaryOp::Add => arith(lhs, rhs, |a, b| a + b),
                    BinaryOp::Sub => arith(lhs, rhs, |a, b| a - b),
                    BinaryOp::Mul => arith(lhs, rhs, |a, b| a * b),
                    BinaryOp::Div => arith(lhs, rhs, |a, b| a / b),
                    BinaryOp::Eq => compare(lhs, rhs, |a, b| a == b),
                    BinaryOp::Ne => compare(lhs, rhs, |a, b| a != b),
                    BinaryOp::Lt => compare(lhs, rhs, |a, b| a < b),
                    BinaryOp::Lte => compare(lhs, rhs, |a, b| a <= b),
                    BinaryOp::Gt => compare(lhs, rhs, |a, b| a > b),
                    BinaryOp::Gte => compare(lhs, rhs, |a, b| a >= b),
                    BinaryOp::NullCoalesce => unreachable!(),
                })
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.compile_node(cond)?;
                let then = self.compile_node(then)?;
                let otherwise = self.compile_node(otherwise)?;
                // All three operands run before the select; `?:` does not
                // short-circuit.
                Ok(Box::new(move |roots| {
                    let cond = cond(roots)?;
                    let then = then(roots)?;
                    let otherwise = otherwise(roots)?;
                    Ok(if cond == 0.0 { otherwise } else { then })
                }))
            }
        }
    }

    fn compile_call(
        &self,
        node: &Rc<Node>,
        target: &Rc<Node>,
        member: &Ident,
        args: &[Rc<Node>],
    ) -> Result<CompiledExpr, CompileError> {
        let Expr::Ident(root) = &*target.expr else {
            return Err(CompileError::NestedQuery(self.token(target)));
        };

        // The built-in root shadows the signature and dispatches statically.
        if root.name == "math" || root.name == "m" {
            let function = builtin::find_math(&member.name, args.len()).ok_or_else(|| {
                CompileError::MethodNotFound {
                    token: self.token(node),
                    root: root.name.clone(),
                    member: member.name.clone(),
                    arity: args.len(),
                }
            })?;
            let compiled_args = self.compile_args(args)?;
            let func = function.func;

            return Ok(Box::new(move |roots| {
                let mut argv = SmallVec::<[f64; 4]>::new();
                for arg in &compiled_args {
                    argv.push(arg(roots)?);
                }
                Ok(func(&argv))
            }));
        }

        let (slot, param) = self
            .params
            .iter()
            .enumerate()
            .find(|(_, param)| param.names.iter().any(|name| name == &root.name))
            .ok_or_else(|| CompileError::QueryNotFound(self.token(target), root.name.clone()))?;
        let method = param.info.find_method(&member.name, args.len()).ok_or_else(|| {
            CompileError::MethodNotFound {
                token: self.token(node),
                root: root.name.clone(),
                member: member.name.clone(),
                arity: args.len(),
            }
        })?;

        let compiled_args: Vec<(CompiledExpr, ParamKind)> = self
            .compile_args(args)?
            .into_iter()
            .zip(method.params.iter().copied())
            .collect();
        let invoker = Rc::clone(&method.invoker);

        Ok(Box::new(move |roots| {
            let mut argv = SmallVec::<[f64; 4]>::new();
            for (arg, kind) in &compiled_args {
                let value = arg(roots)?;
                argv.push(match kind {
                    ParamKind::Number => value,
                    // Booleans cross the ABI as exactly 0.0 or 1.0.
                    ParamKind::Bool => {
                        if value != 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                });
            }
            invoker(roots[slot], &argv)
        }))
    }

    fn compile_args(&self, args: &[Rc<Node>]) -> Result<Vec<CompiledExpr>, CompileError> {
        args.iter().map(|arg| self.compile_node(arg)).collect()
    }
}

fn arith(lhs: CompiledExpr, rhs: CompiledExpr, op: fn(f64, f64) -> f64) -> CompiledExpr {
    Box::new(move |roots| Ok(op(lhs(roots)?, rhs(roots)?)))
}

fn compare(lhs: CompiledExpr, rhs: CompiledExpr, op: fn(f64, f64) -> bool) -> CompiledExpr {
    Box::new(move |roots| Ok(if op(lhs(roots)?, rhs(roots)?) { 1.0 } else { 0.0 }))
}
