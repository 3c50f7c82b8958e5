use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::error::RuntimeError;

/// Declared kind of a host query-method parameter.
///
/// Scripts traffic only in doubles; a `Bool` parameter receives exactly
/// `1.0` or `0.0` after coercion (nonzero is true). Nothing else is
/// declarable, which is the registration-time parameter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Number,
    Bool,
}

pub(crate) type QueryInvoker = dyn Fn(&dyn Any, &[f64]) -> Result<f64, RuntimeError>;

/// A registered host method: its declared parameter kinds plus the adapter
/// bridging a raw `&[f64]` call onto the host receiver.
#[derive(Clone)]
pub struct QueryMethod {
    pub(crate) name: CompactString,
    pub(crate) params: SmallVec<[ParamKind; 4]>,
    pub(crate) invoker: Rc<QueryInvoker>,
}

impl QueryMethod {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl Debug for QueryMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}/{}", self.name, self.arity())
    }
}

/// The query-method table for one host type.
///
/// Hand registration replaces runtime reflection: the host enumerates the
/// methods scripts may call, and the compiler resolves against this table
/// once per compile. Immutable after [`ClassInfoBuilder::build`].
#[derive(Debug, Clone)]
pub struct ClassInfo {
    type_name: &'static str,
    type_id: TypeId,
    methods: FxHashMap<CompactString, Vec<QueryMethod>>,
}

impl ClassInfo {
    pub fn builder<T: 'static>(type_name: &'static str) -> ClassInfoBuilder<T> {
        ClassInfoBuilder {
            info: ClassInfo {
                type_name,
                type_id: TypeId::of::<T>(),
                methods: FxHashMap::default(),
            },
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Overloads are resolved by arity only.
    pub(crate) fn find_method(&self, name: &str, arity: usize) -> Option<&QueryMethod> {
        self.methods
            .get(name)?
            .iter()
            .find(|method| method.arity() == arity)
    }
}

pub struct ClassInfoBuilder<T> {
    info: ClassInfo,
    _marker: PhantomData<T>,
}

impl<T: 'static> ClassInfoBuilder<T> {
    /// Registers a query method. The function receives arguments already
    /// coerced to the declared kinds, in declaration order.
    pub fn query(
        mut self,
        name: &str,
        params: &[ParamKind],
        func: impl Fn(&T, &[f64]) -> f64 + 'static,
    ) -> Self {
        let type_name = self.info.type_name;
        let invoker = Rc::new(move |receiver: &dyn Any, args: &[f64]| {
            let receiver = receiver
                .downcast_ref::<T>()
                .ok_or(RuntimeError::ReceiverTypeMismatch {
                    expected: type_name,
                })?;
            Ok(func(receiver, args))
        });

        self.info
            .methods
            .entry(CompactString::from(name))
            .or_default()
            .push(QueryMethod {
                name: CompactString::from(name),
                params: SmallVec::from_slice(params),
                invoker,
            });
        self
    }

    pub fn build(self) -> Rc<ClassInfo> {
        Rc::new(self.info)
    }
}

/// The declared shape of a compiled script: its ordered, named query roots.
///
/// The specialized callable's numeric return and single entry point are
/// fixed by its Rust type; the descriptor only carries the parameter slots.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub(crate) params: Vec<ParamSpec>,
}

#[derive(Debug, Clone)]
pub(crate) struct ParamSpec {
    pub(crate) names: Vec<CompactString>,
    pub(crate) binding: ParamBinding,
}

#[derive(Debug, Clone)]
pub(crate) enum ParamBinding {
    Concrete(Rc<ClassInfo>),
    Generic,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot with a concrete host type.
    pub fn param(mut self, names: &[&str], info: Rc<ClassInfo>) -> Self {
        self.params.push(ParamSpec {
            names: names.iter().map(|name| CompactString::from(*name)).collect(),
            binding: ParamBinding::Concrete(info),
        });
        self
    }

    /// Appends a slot whose concrete type is supplied to [`Compiler::new`]
    /// instead of being declared here.
    ///
    /// [`Compiler::new`]: super::Compiler::new
    pub fn generic_param(mut self, names: &[&str]) -> Self {
        self.params.push(ParamSpec {
            names: names.iter().map(|name| CompactString::from(*name)).collect(),
            binding: ParamBinding::Generic,
        });
        self
    }
}

/// A resolved signature slot: bound names plus its class table. Generic
/// slots are indistinguishable from concrete ones once substituted; the
/// entry bridge checks every slot's type.
#[derive(Debug, Clone)]
pub(crate) struct ParamInfo {
    pub(crate) names: Vec<CompactString>,
    pub(crate) info: Rc<ClassInfo>,
}
