use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};

use compact_str::CompactString;

use super::error::RuntimeError;

pub(crate) type CompiledExpr = Box<dyn Fn(&[&dyn Any]) -> Result<f64, RuntimeError>>;

/// A compiled script specialized to its signature.
///
/// All identifier-to-method resolution happened at compile time. Invocation
/// checks the root count and each slot's concrete type (the bridge cast for
/// generically declared slots), then runs the specialized body; no name
/// lookup happens per call.
///
/// A `CompiledScript` may be invoked freely once built, provided the host
/// roots it is handed tolerate concurrent method calls.
pub struct CompiledScript {
    name: CompactString,
    params: Vec<(TypeId, &'static str)>,
    body: CompiledExpr,
}

impl CompiledScript {
    pub(crate) fn new(
        name: CompactString,
        params: Vec<(TypeId, &'static str)>,
        body: CompiledExpr,
    ) -> Self {
        Self { name, params, body }
    }

    /// Invokes the script with positional host query roots, one per
    /// signature slot.
    pub fn call(&self, roots: &[&dyn Any]) -> Result<f64, RuntimeError> {
        if roots.len() != self.params.len() {
            return Err(RuntimeError::InvalidNumberOfRoots {
                expected: self.params.len(),
                got: roots.len(),
            });
        }
        for (slot, (type_id, type_name)) in self.params.iter().enumerate() {
            let root: &dyn Any = roots[slot];
            if root.type_id() != *type_id {
                return Err(RuntimeError::RootTypeMismatch {
                    slot,
                    expected: type_name,
                });
            }
        }

        (self.body)(roots)
    }

    /// The unique name minted for this script by its compiler.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl Debug for CompiledScript {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("CompiledScript")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish()
    }
}
