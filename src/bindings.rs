//! Registers the vector and matrix API on a rhai [`Engine`].
//!
//! Guest values cross into the strongly typed core through [`to_operand`]
//! and come back through [`to_dynamic`]. Operators are registered with one
//! concrete side and one `Dynamic` side, so every combination lands in the
//! [`dispatch`] layer, which reports mismatches with both type names.
//! Component access (`v.x`, `v.zyx`, `v[1]`) goes through the string and
//! integer indexers; rhai falls back to the string indexer for unknown
//! properties.
//!
//! Functions that leave their receiver alone take it by value. rhai only
//! feeds a `&mut` receiver back through the setter, so `v.xz.length()`
//! never writes into `v`.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, NativeCallContext, Position, INT};
use smallvec::SmallVec;

use crate::dispatch::{self, Operand, VectorArg};
use crate::error::{VectorError, VectorResult};
use crate::matrix::{AnyMatrix, Mat2, Mat3, Mat4, Matrix};
use crate::pool::{PoolSet, Pooled};
use crate::vector::{AnyVector, Vec2, Vec3, Vec4, Vec5, Vec6, Vector, MAX_DIMENSION};

pub type SharedPools = Rc<RefCell<PoolSet>>;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;
type BinaryOp = fn(&Operand, &Operand, &mut PoolSet) -> VectorResult<Operand>;

const ARITHMETIC: [(&str, BinaryOp); 5] = [
    ("+", dispatch::add),
    ("-", dispatch::subtract),
    ("*", dispatch::multiply),
    ("/", dispatch::divide),
    ("%", dispatch::modulo),
];

pub fn shared_pools(pools: PoolSet) -> SharedPools {
    Rc::new(RefCell::new(pools))
}

pub fn script_error(err: VectorError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(err.to_string().into(), Position::NONE))
}

fn read<T: Clone + 'static>(value: &Dynamic) -> Option<T> {
    value.read_lock::<T>().map(|guard| (*guard).clone())
}

/// Classifies a guest value. Integers and floats are both scalars.
pub fn to_operand(value: &Dynamic) -> Operand {
    if let Some(v) = read::<Vec2>(value) {
        return Operand::Vector(v.into());
    }
    if let Some(v) = read::<Vec3>(value) {
        return Operand::Vector(v.into());
    }
    if let Some(v) = read::<Vec4>(value) {
        return Operand::Vector(v.into());
    }
    if let Some(v) = read::<Vec5>(value) {
        return Operand::Vector(v.into());
    }
    if let Some(v) = read::<Vec6>(value) {
        return Operand::Vector(v.into());
    }
    if let Some(m) = read::<Mat2>(value) {
        return Operand::Matrix(m.into());
    }
    if let Some(m) = read::<Mat3>(value) {
        return Operand::Matrix(m.into());
    }
    if let Some(m) = read::<Mat4>(value) {
        return Operand::Matrix(m.into());
    }
    if let Ok(float) = value.as_float() {
        return Operand::Scalar(float);
    }
    if let Ok(int) = value.as_int() {
        return Operand::Scalar(int as f64);
    }
    Operand::Other(value.type_name().to_string())
}

pub fn to_dynamic(operand: Operand) -> Dynamic {
    match operand {
        Operand::Vector(AnyVector::V2(v)) => Dynamic::from(v),
        Operand::Vector(AnyVector::V3(v)) => Dynamic::from(v),
        Operand::Vector(AnyVector::V4(v)) => Dynamic::from(v),
        Operand::Vector(AnyVector::V5(v)) => Dynamic::from(v),
        Operand::Vector(AnyVector::V6(v)) => Dynamic::from(v),
        Operand::Matrix(AnyMatrix::M2(m)) => Dynamic::from(m),
        Operand::Matrix(AnyMatrix::M3(m)) => Dynamic::from(m),
        Operand::Matrix(AnyMatrix::M4(m)) => Dynamic::from(m),
        Operand::Scalar(s) => Dynamic::from_float(s),
        Operand::Other(_) => Dynamic::UNIT,
    }
}

/// A multi-component swizzle read is a temporary. Marking it read-only makes
/// rhai reject in-place methods on it instead of writing the result back
/// through the indexer into the source vector. `let` and function
/// parameters clear the mark.
fn swizzled(operand: Operand) -> Dynamic {
    let is_vector = matches!(operand, Operand::Vector(_));
    let value = to_dynamic(operand);
    if is_vector {
        value.into_read_only()
    } else {
        value
    }
}

fn number(operation: &'static str, value: &Dynamic) -> ScriptResult<f64> {
    match to_operand(value) {
        Operand::Scalar(s) => Ok(s),
        other => Err(script_error(VectorError::type_mismatch(operation, other.type_name()))),
    }
}

fn optional_number(operation: &'static str, value: &Dynamic) -> ScriptResult<Option<f64>> {
    if value.is_unit() {
        Ok(None)
    } else {
        number(operation, value).map(Some)
    }
}

fn expect_vector<const N: usize>(operation: &'static str, value: &Dynamic) -> ScriptResult<Vector<N>> {
    read::<Vector<N>>(value)
        .ok_or_else(|| script_error(VectorError::type_mismatch(operation, to_operand(value).type_name())))
}

fn expect_matrix<const N: usize>(operation: &'static str, value: &Dynamic) -> ScriptResult<Matrix<N>> {
    read::<Matrix<N>>(value)
        .ok_or_else(|| script_error(VectorError::type_mismatch(operation, to_operand(value).type_name())))
}

/// Registers `name` as `(T, Dynamic)` and `(Dynamic, T)`.
fn register_binary<T, F>(engine: &mut Engine, name: &str, wrap: fn(T) -> Operand, op: F)
where
    T: Clone + 'static,
    F: Fn(&Operand, &Operand) -> ScriptResult<Dynamic> + Clone + 'static,
{
    let forward = op.clone();
    engine.register_fn(name, move |lhs: T, rhs: Dynamic| forward(&wrap(lhs), &to_operand(&rhs)));
    engine.register_fn(name, move |lhs: Dynamic, rhs: T| op(&to_operand(&lhs), &wrap(rhs)));
}

fn register_operators<T: Clone + 'static>(engine: &mut Engine, pools: &SharedPools, wrap: fn(T) -> Operand) {
    for (name, op) in ARITHMETIC {
        let pools = pools.clone();
        register_binary(engine, name, wrap, move |lhs, rhs| {
            let result = op(lhs, rhs, &mut pools.borrow_mut()).map_err(script_error)?;
            Ok(to_dynamic(result))
        });
    }
    register_binary(engine, "==", wrap, |lhs, rhs| Ok(Dynamic::from_bool(dispatch::equals(lhs, rhs))));
    register_binary(engine, "!=", wrap, |lhs, rhs| Ok(Dynamic::from_bool(!dispatch::equals(lhs, rhs))));
    register_binary(engine, "<", wrap, |lhs, rhs| {
        dispatch::less_than(lhs, rhs).map(Dynamic::from_bool).map_err(script_error)
    });
    register_binary(engine, "<=", wrap, |lhs, rhs| {
        dispatch::less_equal(lhs, rhs).map(Dynamic::from_bool).map_err(script_error)
    });
    register_binary(engine, ">", wrap, |lhs, rhs| {
        dispatch::less_than(rhs, lhs).map(Dynamic::from_bool).map_err(script_error)
    });
    register_binary(engine, ">=", wrap, |lhs, rhs| {
        dispatch::less_equal(rhs, lhs).map(Dynamic::from_bool).map_err(script_error)
    });

    let pools = pools.clone();
    engine.register_fn("-", move |value: T| -> ScriptResult<Dynamic> {
        let result = dispatch::negate(&wrap(value), &mut pools.borrow_mut()).map_err(script_error)?;
        Ok(to_dynamic(result))
    });
    engine.register_fn("len", move |value: T| -> ScriptResult<INT> {
        let length = dispatch::length(&wrap(value)).map_err(script_error)?;
        Ok(length as INT)
    });
    engine.register_fn("to_string", move |value: T| dispatch::stringify(&wrap(value)));
    engine.register_fn("to_debug", move |value: T| dispatch::stringify(&wrap(value)));
    engine.register_fn("+", move |lhs: ImmutableString, rhs: T| format!("{lhs}{}", dispatch::stringify(&wrap(rhs))));
    engine.register_fn("+", move |lhs: T, rhs: ImmutableString| format!("{}{rhs}", dispatch::stringify(&wrap(lhs))));
}

/// In-place operations that take either a vector or spelled-out components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Reduce,
}

impl ComponentOp {
    const ALL: [ComponentOp; 6] =
        [ComponentOp::Set, ComponentOp::Add, ComponentOp::Sub, ComponentOp::Mul, ComponentOp::Div, ComponentOp::Reduce];

    fn name(self) -> &'static str {
        match self {
            ComponentOp::Set => "set",
            ComponentOp::Add => "add",
            ComponentOp::Sub => "sub",
            ComponentOp::Mul => "mul",
            ComponentOp::Div => "div",
            ComponentOp::Reduce => "reduce",
        }
    }

    fn apply<const N: usize>(self, target: &mut Vector<N>, args: &[Dynamic]) -> ScriptResult<Vector<N>> {
        let operands: SmallVec<[Operand; MAX_DIMENSION]> = args.iter().map(to_operand).collect();
        let arg = VectorArg::<N>::resolve(self.name(), &operands).map_err(script_error)?.into_vector();
        match self {
            ComponentOp::Set => target.set_from(&arg),
            ComponentOp::Add => target.add(&arg),
            ComponentOp::Sub => target.subtract(&arg),
            ComponentOp::Mul => target.multiply(&arg),
            ComponentOp::Div => target.divide(&arg),
            ComponentOp::Reduce => target.reduce(&arg),
        };
        Ok(target.clone())
    }
}

macro_rules! register_component_forms {
    ($engine:expr, $n:literal, $($arg:ident),+) => {
        for op in ComponentOp::ALL {
            $engine.register_fn(op.name(), move |v: &mut Vector<$n>, $($arg: Dynamic),+| op.apply(v, &[$($arg),+]));
        }
    };
}

macro_rules! register_constructor {
    ($engine:expr, $pools:expr, $($arg:ident),+) => {{
        let pools = $pools.clone();
        $engine.register_fn("vec", move |$($arg: Dynamic),+| -> ScriptResult<Dynamic> {
            let components = [$(number("vec", &$arg)?),+];
            let vector = AnyVector::from_slice(&components, &mut pools.borrow_mut())
                .ok_or_else(|| script_error(VectorError::type_mismatch("vec", "number")))?;
            Ok(to_dynamic(Operand::Vector(vector)))
        });
    }};
}

fn register_vector<const N: usize>(engine: &mut Engine, pools: &SharedPools)
where
    Vector<N>: Pooled + Into<AnyVector>,
{
    engine.register_type_with_name::<Vector<N>>(<Vector<N> as Pooled>::POOL_NAME);
    register_operators::<Vector<N>>(engine, pools, |v| Operand::Vector(v.into()));

    let p = pools.clone();
    engine.register_indexer_get(move |v: &mut Vector<N>, key: ImmutableString| -> Dynamic {
        dispatch::index_read(v, &key, &mut p.borrow_mut()).map_or(Dynamic::UNIT, swizzled)
    });
    let p = pools.clone();
    engine.register_indexer_get(move |v: &mut Vector<N>, index: INT| -> Dynamic {
        dispatch::index_read(v, &index.to_string(), &mut p.borrow_mut()).map_or(Dynamic::UNIT, swizzled)
    });
    engine.register_indexer_set(|v: &mut Vector<N>, key: ImmutableString, value: Dynamic| -> ScriptResult<()> {
        dispatch::index_write(v, &key, &to_operand(&value)).map_err(script_error)
    });
    engine.register_indexer_set(|v: &mut Vector<N>, index: INT, value: Dynamic| -> ScriptResult<()> {
        dispatch::index_write(v, &index.to_string(), &to_operand(&value)).map_err(script_error)
    });

    for op in ComponentOp::ALL {
        engine.register_fn(op.name(), move |v: &mut Vector<N>, arg: Dynamic| op.apply(v, &[arg]));
    }
    engine.register_fn("scale", |v: &mut Vector<N>, factor: Dynamic| -> ScriptResult<Vector<N>> {
        let factor = number("scale", &factor)?;
        Ok(v.scale(factor).clone())
    });
    engine.register_fn("reset", |v: &mut Vector<N>| {
        *v = Vector::zero();
        v.clone()
    });
    engine.register_fn("normalize", |v: &mut Vector<N>| v.normalize().clone());
    engine.register_fn("clamp_length", |v: &mut Vector<N>, min: Dynamic, max: Dynamic| -> ScriptResult<Vector<N>> {
        let min = optional_number("clamp_length", &min)?;
        let max = optional_number("clamp_length", &max)?;
        Ok(v.clamp_length(min, max).clone())
    });
    engine.register_fn("dot", |v: Vector<N>, other: Dynamic| -> ScriptResult<f64> {
        Ok(v.dot(&expect_vector::<N>("dot", &other)?))
    });
    engine.register_fn("length_squared", |v: Vector<N>| v.length_squared());
    engine.register_fn("length", |v: Vector<N>| v.length());
    for name in ["to_array", "unpack"] {
        engine.register_fn(name, |v: Vector<N>| -> Array {
            v.components().iter().map(|c| Dynamic::from_float(*c)).collect()
        });
    }
    engine.register_fn(
        "apply_func",
        |ctx: NativeCallContext, v: &mut Vector<N>, func: FnPtr| -> ScriptResult<Vector<N>> {
            v.apply_func(|component| {
                let result: Dynamic = func.call_within_context(&ctx, (component,))?;
                number("apply_func", &result)
            })?;
            Ok(v.clone())
        },
    );

    let p = pools.clone();
    engine.register_fn("free", move |v: &mut Vector<N>| p.borrow_mut().release(std::mem::take(v)));
    let p = pools.clone();
    engine.register_fn("copy", move |v: Vector<N>| v.copy(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("normalized", move |v: Vector<N>| v.normalized(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("clamped", move |v: Vector<N>, min: Dynamic, max: Dynamic| -> ScriptResult<Vector<N>> {
        let min = optional_number("clamped", &min)?;
        let max = optional_number("clamped", &max)?;
        Ok(v.clamped(min, max, &mut p.borrow_mut()))
    });
    let p = pools.clone();
    engine.register_fn("to_rad", move |v: Vector<N>| v.to_rad(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("to_deg", move |v: Vector<N>| v.to_deg(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("floor", move |v: Vector<N>| v.floor(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("ceil", move |v: Vector<N>| v.ceil(&mut p.borrow_mut()));
}

fn register_transform<const N: usize>(engine: &mut Engine) {
    engine.register_fn("transform", |v: &mut Vector<N>, matrix: Dynamic| -> ScriptResult<Vector<N>> {
        let matrix = expect_matrix::<N>("transform", &matrix)?;
        Ok(v.transform(&matrix).clone())
    });
}

fn register_augmented(engine: &mut Engine, pools: &SharedPools) {
    let p = pools.clone();
    engine.register_fn("augmented", move |v: Vec2| v.augmented(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("augmented", move |v: Vec3| v.augmented(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("augmented", move |v: Vec4| v.augmented(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("augmented", move |v: Vec5| v.augmented(&mut p.borrow_mut()));
}

fn register_cross(engine: &mut Engine, pools: &SharedPools) {
    engine.register_fn("cross", |v: &mut Vec3, other: Dynamic| -> ScriptResult<Vec3> {
        let other = expect_vector::<3>("cross", &other)?;
        Ok(v.cross(&other).clone())
    });
    let p = pools.clone();
    engine.register_fn("crossed", move |v: Vec3, other: Dynamic| -> ScriptResult<Vec3> {
        let other = expect_vector::<3>("crossed", &other)?;
        Ok(v.crossed(&other, &mut p.borrow_mut()))
    });
}

fn register_matrix<const N: usize>(engine: &mut Engine, pools: &SharedPools)
where
    Matrix<N>: Pooled + Into<AnyMatrix>,
    Vector<N>: Pooled,
{
    engine.register_type_with_name::<Matrix<N>>(<Matrix<N> as Pooled>::POOL_NAME);
    register_operators::<Matrix<N>>(engine, pools, |m| Operand::Matrix(m.into()));

    engine.register_fn("transpose", |m: &mut Matrix<N>| m.transpose().clone());
    engine.register_fn("reset", |m: &mut Matrix<N>| {
        *m = Matrix::identity();
        m.clone()
    });
    let p = pools.clone();
    engine.register_fn("transposed", move |m: Matrix<N>| m.transposed(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("copy", move |m: Matrix<N>| m.copy(&mut p.borrow_mut()));
    let p = pools.clone();
    engine.register_fn("free", move |m: &mut Matrix<N>| p.borrow_mut().release(std::mem::take(m)));
    let p = pools.clone();
    engine.register_fn("row", move |m: Matrix<N>, index: INT| -> Dynamic {
        one_based(index)
            .and_then(|index| m.row_vector(index, &mut p.borrow_mut()))
            .map_or(Dynamic::UNIT, Dynamic::from)
    });
    let p = pools.clone();
    engine.register_fn("column", move |m: Matrix<N>, index: INT| -> Dynamic {
        one_based(index)
            .and_then(|index| m.column_vector(index, &mut p.borrow_mut()))
            .map_or(Dynamic::UNIT, Dynamic::from)
    });
}

fn one_based(index: INT) -> Option<usize> {
    usize::try_from(index).ok()?.checked_sub(1)
}

macro_rules! register_matrix_constructor {
    ($engine:expr, $pools:expr, $name:literal, $n:literal, $($row:ident),+) => {{
        let pools = $pools.clone();
        $engine.register_fn($name, move || -> Matrix<$n> { pools.borrow_mut().fresh() });
        let pools = $pools.clone();
        $engine.register_fn($name, move |$($row: Dynamic),+| -> ScriptResult<Matrix<$n>> {
            let rows = [$(*expect_vector::<$n>($name, &$row)?.components()),+];
            Ok(Matrix::of(&mut pools.borrow_mut(), rows))
        });
    }};
}

/// Registers every vector and matrix type, operator and constructor.
pub fn register_vector_api(engine: &mut Engine, pools: &SharedPools) {
    register_vector::<2>(engine, pools);
    register_vector::<3>(engine, pools);
    register_vector::<4>(engine, pools);
    register_vector::<5>(engine, pools);
    register_vector::<6>(engine, pools);

    register_component_forms!(engine, 2, a, b);
    register_component_forms!(engine, 3, a, b, c);
    register_component_forms!(engine, 4, a, b, c, d);
    register_component_forms!(engine, 5, a, b, c, d, e);
    register_component_forms!(engine, 6, a, b, c, d, e, f);

    register_constructor!(engine, pools, a, b);
    register_constructor!(engine, pools, a, b, c);
    register_constructor!(engine, pools, a, b, c, d);
    register_constructor!(engine, pools, a, b, c, d, e);
    register_constructor!(engine, pools, a, b, c, d, e, f);

    register_cross(engine, pools);
    register_augmented(engine, pools);
    register_transform::<2>(engine);
    register_transform::<3>(engine);
    register_transform::<4>(engine);

    register_matrix::<2>(engine, pools);
    register_matrix::<3>(engine, pools);
    register_matrix::<4>(engine, pools);
    register_matrix_constructor!(engine, pools, "mat2", 2, r0, r1);
    register_matrix_constructor!(engine, pools, "mat3", 3, r0, r1, r2);
    register_matrix_constructor!(engine, pools, "mat4", 4, r0, r1, r2, r3);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_classify_guest_values() {
        assert!(matches!(to_operand(&Dynamic::from(Vec3::new([1.0, 2.0, 3.0]))), Operand::Vector(AnyVector::V3(_))));
        assert!(matches!(to_operand(&Dynamic::from(Mat2::identity())), Operand::Matrix(AnyMatrix::M2(_))));
        assert!(matches!(to_operand(&Dynamic::from_int(4)), Operand::Scalar(s) if s == 4.0));
        assert!(matches!(to_operand(&Dynamic::from_float(0.5)), Operand::Scalar(s) if s == 0.5));
        assert_eq!(to_operand(&Dynamic::from("text")).type_name(), "string");
        assert!(to_dynamic(Operand::Other("string".into())).is_unit());
    }

    #[test]
    fn one_based_indices() {
        assert_eq!(one_based(1), Some(0));
        assert_eq!(one_based(0), None);
        assert_eq!(one_based(-2), None);
    }

    #[test]
    fn errors_become_runtime_errors() {
        let err = script_error(VectorError::DivisionByZero);
        assert!(matches!(*err, EvalAltResult::ErrorRuntime(..)));
        assert!(err.to_string().contains("attempt to divide vector by 0"));
    }
}
