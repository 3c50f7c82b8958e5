//! `mql` is an embeddable expression language, a small subset of the MoLang
//! dialect used by Minecraft content. Scripts are numeric expressions
//! evaluated against named query roots the host provides, e.g.
//! `math.sqrt(q.health + 1) > 0 ? 1 : 0`.
//!
//! Two execution paths share one parser:
//!
//! - [`Interpreter`] walks the tree against a live [`Env`] of
//!   [`QueryObject`]s. Flexible, resolves names on every visit.
//! - [`Compiler`] specializes a script to a declared [`Signature`] ahead of
//!   any call: identifiers resolve to host methods once, and the resulting
//!   [`CompiledScript`] dispatches with no per-call name lookup.
//!
//! ## Interpreting
//!
//! ```
//! use mql::{Env, Interpreter, Value};
//!
//! let interpreter = Interpreter::new();
//! let value = interpreter.evaluate("math.sqrt(16)", &Env::new()).unwrap();
//! assert_eq!(value, Value::Number(4.0.into()));
//! ```
//!
//! ## Compiling
//!
//! ```
//! use mql::{ClassInfo, Compiler, Signature};
//!
//! struct Entity {
//!     health: f64,
//! }
//!
//! let info = ClassInfo::builder::<Entity>("Entity")
//!     .query("health", &[], |entity: &Entity, _args: &[f64]| entity.health)
//!     .build();
//! let signature = Signature::new().param(&["q", "query"], info);
//! let mut compiler = Compiler::new(signature, Vec::new()).unwrap();
//!
//! let script = compiler.compile("math.sqrt(q.health + 1) > 0 ? 1 : 0").unwrap();
//! assert_eq!(script.call(&[&Entity { health: 8.0 }]), Ok(1.0));
//! ```

mod arena;
mod ast;
mod compiler;
mod error;
mod eval;
mod lexer;
mod number;
mod range;
mod value;

use std::cell::RefCell;
use std::rc::Rc;

pub use arena::{TokenArena, TokenId};
pub use ast::error::ParseError;
pub use ast::node::{Args, BinaryOp, Expr, Ident, Node, UnaryOp};
pub use ast::parser::Parser;
pub use compiler::{
    ClassInfo, ClassInfoBuilder, CompileError, CompiledScript, Compiler, ParamKind, QueryMethod,
    RuntimeError, Signature,
};
pub use error::{Error, InnerError};
pub use eval::builtin::seed_random;
pub use eval::error::EvalError;
pub use eval::{Env, Interpreter};
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use number::Number;
pub use range::{Position, Range};
pub use value::{Callable, QueryObject, Value};

/// Scans `code` into tokens, ending in [`TokenKind::Eof`].
pub fn tokenize(code: &str) -> Result<Vec<Token>, Error> {
    lexer::tokenize(code).map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

/// Parses `code` into a single expression tree whose tokens live in
/// `token_arena`.
pub fn parse(code: &str, token_arena: Rc<RefCell<TokenArena>>) -> Result<Rc<Node>, Error> {
    let tokens = lexer::tokenize(code)
        .map_err(|e| Error::from_error(code, InnerError::Lexer(e)))?
        .into_iter()
        .map(Rc::new)
        .collect::<Vec<_>>();

    ast::parser::Parser::new(tokens.iter(), token_arena)
        .parse()
        .map_err(|e| Error::from_error(code, InnerError::Parse(e)))
}
