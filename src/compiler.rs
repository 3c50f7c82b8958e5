//! Ahead-of-call code generation.
//!
//! A [`Compiler`] is built once from a script signature (the named query
//! roots a script consumes, plus the implicit `math`/`m` root) and then
//! turns sources into [`CompiledScript`]s: every identifier is resolved to a
//! host method at compile time, arguments are coerced to the declared
//! parameter kinds, and invocation dispatches straight through captured
//! invokers with no name lookup.
//!
//! The backend compiles each expression node to a closure over the root
//! slice, so the "bytecode" is the closure tree itself.

mod compile;
mod compiled;
pub mod error;
mod signature;

pub use compile::Compiler;
pub use compiled::CompiledScript;
pub use error::{CompileError, RuntimeError};
pub use signature::{ClassInfo, ClassInfoBuilder, ParamKind, QueryMethod, Signature};
