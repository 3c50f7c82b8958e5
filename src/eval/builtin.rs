use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::eval::error::EvalError;
use crate::number::Number;
use crate::value::{QueryObject, Value};

/// A built-in math function: fixed arity, doubles in, double out.
///
/// The same registry backs both execution paths. The interpreter wraps each
/// entry in a callable on the `math` query object; the compiler dispatches
/// straight through the `func` pointer.
#[derive(Clone, Copy, Debug)]
pub struct MathFunction {
    pub name: &'static str,
    pub arity: u8,
    pub func: fn(&[f64]) -> f64,
}

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

/// Reseeds `math.random` and `math.random_int` for the current thread.
/// Fresh OS entropy is used until a host calls this.
pub fn seed_random(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = SmallRng::seed_from_u64(seed));
}

macro_rules! define_math {
    ($name:ident, $arity:expr, $func:expr) => {
        static $name: LazyLock<MathFunction> = LazyLock::new(|| MathFunction {
            name: stringify!($name).to_lowercase().leak(),
            arity: $arity,
            func: $func,
        });
    };
}

define_math!(ABS, 1, |args| args[0].abs());
define_math!(SIGN, 1, |args| {
    if args[0] == 0.0 || args[0].is_nan() {
        args[0]
    } else {
        args[0].signum()
    }
});
define_math!(FLOOR, 1, |args| args[0].floor());
define_math!(CEIL, 1, |args| args[0].ceil());
define_math!(ROUND, 1, |args| args[0].round());
define_math!(TRUNC, 1, |args| args[0].trunc());
define_math!(SQRT, 1, |args| args[0].sqrt());
define_math!(EXP, 1, |args| args[0].exp());
define_math!(LN, 1, |args| args[0].ln());
define_math!(POW, 2, |args| args[0].powf(args[1]));

// Trigonometry is degree-based, inverse trigonometry returns degrees.
define_math!(SIN, 1, |args| args[0].to_radians().sin());
define_math!(COS, 1, |args| args[0].to_radians().cos());
define_math!(TAN, 1, |args| args[0].to_radians().tan());
define_math!(ASIN, 1, |args| args[0].asin().to_degrees());
define_math!(ACOS, 1, |args| args[0].acos().to_degrees());
define_math!(ATAN, 1, |args| args[0].atan().to_degrees());
define_math!(ATAN2, 2, |args| args[0].atan2(args[1]).to_degrees());

define_math!(MIN, 2, |args| args[0].min(args[1]));
define_math!(MAX, 2, |args| args[0].max(args[1]));
define_math!(MOD, 2, |args| args[0] % args[1]);
define_math!(CLAMP, 3, |args| args[0].max(args[1]).min(args[2]));
define_math!(LERP, 3, |args| args[0] + (args[1] - args[0]) * args[2]);
define_math!(LERP_ROTATE, 3, |args| {
    let mut diff = (args[1] - args[0]).rem_euclid(360.0);
    if diff > 180.0 {
        diff -= 360.0;
    }
    args[0] + diff * args[2]
});
define_math!(HERMITE_BLEND, 1, |args| {
    let t = args[0];
    3.0 * t * t - 2.0 * t * t * t
});
define_math!(RANDOM, 0, |_| RNG
    .with(|rng| rng.borrow_mut().random::<f64>()));
define_math!(RANDOM_INT, 2, |args| {
    let lo = args[0].floor() as i64;
    let hi = args[1].floor() as i64;
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    RNG.with(|rng| rng.borrow_mut().random_range(lo..=hi)) as f64
});
define_math!(PI, 0, |_| std::f64::consts::PI);

pub(crate) static MATH_FUNCTIONS: LazyLock<FxHashMap<&'static str, MathFunction>> =
    LazyLock::new(|| {
        [
            *ABS,
            *SIGN,
            *FLOOR,
            *CEIL,
            *ROUND,
            *TRUNC,
            *SQRT,
            *EXP,
            *LN,
            *POW,
            *SIN,
            *COS,
            *TAN,
            *ASIN,
            *ACOS,
            *ATAN,
            *ATAN2,
            *MIN,
            *MAX,
            *MOD,
            *CLAMP,
            *LERP,
            *LERP_ROTATE,
            *HERMITE_BLEND,
            *RANDOM,
            *RANDOM_INT,
            *PI,
        ]
        .into_iter()
        .map(|function| (function.name, function))
        .collect()
    });

/// Looks up a math function by name, then checks the declared arity.
pub(crate) fn find_math(name: &str, arity: usize) -> Option<MathFunction> {
    MATH_FUNCTIONS
        .get(name)
        .copied()
        .filter(|function| function.arity as usize == arity)
}

/// The `math`/`m` root handed to every interpreter environment.
pub(crate) fn math_object() -> Rc<QueryObject> {
    let mut object = QueryObject::new("math");
    for function in MATH_FUNCTIONS.values() {
        let function = *function;
        object = object.callable(function.name, function.arity, move |args| {
            let mut argv = SmallVec::<[f64; 4]>::new();
            for arg in args {
                argv.push(arg.as_number().ok_or_else(|| {
                    EvalError::HostFailure(format!(
                        "math.{} expects a number, got {}",
                        function.name,
                        arg.name()
                    ))
                })?);
            }
            Ok(Value::Number(Number::new((function.func)(&argv))))
        });
    }
    Rc::new(object)
}
