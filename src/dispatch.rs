//! Runtime operator resolution for dynamically typed guest operands.
//!
//! The guest language has no static types, so either side of a binary
//! operator may be a vector, a number, a matrix or something unrelated.
//! Each operator inspects both operands, picks the native operation, and
//! reports unmatched pairs as a [`VectorError::TypeMismatch`] naming both
//! types. Results are always fresh pooled values; operands are never mutated.

use std::fmt;

use crate::error::{VectorError, VectorResult};
use crate::matrix::AnyMatrix;
use crate::pool::PoolSet;
use crate::swizzle::{self, Swizzled};
use crate::vector::{AnyVector, Vector};

#[derive(Debug, Clone)]
pub enum Operand {
    Vector(AnyVector),
    Scalar(f64),
    Matrix(AnyMatrix),
    /// Anything else, by its guest-visible type name.
    Other(String),
}

impl Operand {
    pub fn type_name(&self) -> &str {
        match self {
            Operand::Vector(v) => v.type_name(),
            Operand::Scalar(_) => "number",
            Operand::Matrix(m) => m.type_name(),
            Operand::Other(name) => name,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Vector(v) => fmt::Display::fmt(v, f),
            Operand::Scalar(s) => write!(f, "{s}"),
            Operand::Matrix(m) => fmt::Display::fmt(m, f),
            Operand::Other(name) => write!(f, "<{name}>"),
        }
    }
}

impl From<AnyVector> for Operand {
    fn from(value: AnyVector) -> Self {
        Operand::Vector(value)
    }
}

impl From<AnyMatrix> for Operand {
    fn from(value: AnyMatrix) -> Self {
        Operand::Matrix(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Scalar(value)
    }
}

/// Runs `$body` over two vectors of the same dimension, `None` otherwise.
macro_rules! same_dimension {
    ($lhs:expr, $rhs:expr, |$a:ident, $b:ident| $body:expr) => {
        match ($lhs, $rhs) {
            (AnyVector::V2($a), AnyVector::V2($b)) => Some($body),
            (AnyVector::V3($a), AnyVector::V3($b)) => Some($body),
            (AnyVector::V4($a), AnyVector::V4($b)) => Some($body),
            (AnyVector::V5($a), AnyVector::V5($b)) => Some($body),
            (AnyVector::V6($a), AnyVector::V6($b)) => Some($body),
            _ => None,
        }
    };
}

macro_rules! each_vector {
    ($value:expr, |$v:ident| $body:expr) => {
        match $value {
            AnyVector::V2($v) => $body,
            AnyVector::V3($v) => $body,
            AnyVector::V4($v) => $body,
            AnyVector::V5($v) => $body,
            AnyVector::V6($v) => $body,
        }
    };
}

macro_rules! each_matrix {
    ($value:expr, |$m:ident| $body:expr) => {
        match $value {
            AnyMatrix::M2($m) => $body,
            AnyMatrix::M3($m) => $body,
            AnyMatrix::M4($m) => $body,
        }
    };
}

fn mismatch(operation: &'static str, lhs: &Operand, rhs: &Operand) -> VectorError {
    VectorError::operand_mismatch(operation, lhs.type_name(), rhs.type_name())
}

fn scaled_vector(vector: &AnyVector, factor: f64, pools: &mut PoolSet) -> AnyVector {
    each_vector!(vector, |v| AnyVector::from(v.scaled(factor, pools)))
}

fn transformed(vector: &AnyVector, matrix: &AnyMatrix, pools: &mut PoolSet) -> Option<AnyVector> {
    match (vector, matrix) {
        (AnyVector::V2(v), AnyMatrix::M2(m)) => Some(v.transformed(m, pools).into()),
        (AnyVector::V3(v), AnyMatrix::M3(m)) => Some(v.transformed(m, pools).into()),
        (AnyVector::V4(v), AnyMatrix::M4(m)) => Some(v.transformed(m, pools).into()),
        _ => None,
    }
}

pub fn add(lhs: &Operand, rhs: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    let result = match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => same_dimension!(a, b, |x, y| AnyVector::from(x.plus(y, pools))),
        _ => None,
    };
    result.map(Operand::Vector).ok_or_else(|| mismatch("add", lhs, rhs))
}

pub fn subtract(lhs: &Operand, rhs: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    let result = match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => same_dimension!(a, b, |x, y| AnyVector::from(x.minus(y, pools))),
        _ => None,
    };
    result.map(Operand::Vector).ok_or_else(|| mismatch("subtract", lhs, rhs))
}

/// Element-wise, scalar scaling, or matrix transform depending on operands.
/// A vector times a matrix (either order) is `matrix * vector`, row-major.
pub fn multiply(lhs: &Operand, rhs: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    let result = match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => {
            same_dimension!(a, b, |x, y| AnyVector::from(x.times(y, pools))).map(Operand::Vector)
        }
        (Operand::Vector(v), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Vector(v)) => {
            Some(Operand::Vector(scaled_vector(v, *s, pools)))
        }
        (Operand::Vector(v), Operand::Matrix(m)) | (Operand::Matrix(m), Operand::Vector(v)) => {
            transformed(v, m, pools).map(Operand::Vector)
        }
        (Operand::Matrix(a), Operand::Matrix(b)) => match (a, b) {
            (AnyMatrix::M2(x), AnyMatrix::M2(y)) => Some(AnyMatrix::from(x.times(y, pools))),
            (AnyMatrix::M3(x), AnyMatrix::M3(y)) => Some(AnyMatrix::from(x.times(y, pools))),
            (AnyMatrix::M4(x), AnyMatrix::M4(y)) => Some(AnyMatrix::from(x.times(y, pools))),
            _ => None,
        }
        .map(Operand::Matrix),
        (Operand::Matrix(m), Operand::Scalar(s)) | (Operand::Scalar(s), Operand::Matrix(m)) => {
            Some(Operand::Matrix(each_matrix!(m, |x| AnyMatrix::from(x.scaled(*s, pools)))))
        }
        _ => None,
    };
    result.ok_or_else(|| mismatch("multiply", lhs, rhs))
}

/// Vector by vector is unchecked element-wise division; vector by scalar
/// refuses a zero divisor.
pub fn divide(lhs: &Operand, rhs: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    let result = match (lhs, rhs) {
        (Operand::Vector(_), Operand::Scalar(s)) if *s == 0.0 => return Err(VectorError::DivisionByZero),
        (Operand::Vector(v), Operand::Scalar(s)) => Some(scaled_vector(v, 1.0 / *s, pools)),
        (Operand::Vector(a), Operand::Vector(b)) => {
            same_dimension!(a, b, |x, y| AnyVector::from(x.divided_by(y, pools)))
        }
        _ => None,
    };
    result.map(Operand::Vector).ok_or_else(|| mismatch("divide", lhs, rhs))
}

/// Floored modulo; a scalar modulus of zero is refused.
pub fn modulo(lhs: &Operand, rhs: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    let result = match (lhs, rhs) {
        (Operand::Vector(_), Operand::Scalar(s)) if *s == 0.0 => return Err(VectorError::ModuloByZero),
        (Operand::Vector(v), Operand::Scalar(s)) => {
            Some(each_vector!(v, |x| AnyVector::from(x.modulo(&Vector::splat(*s), pools))))
        }
        (Operand::Vector(a), Operand::Vector(b)) => same_dimension!(a, b, |x, y| AnyVector::from(x.modulo(y, pools))),
        _ => None,
    };
    result.map(Operand::Vector).ok_or_else(|| mismatch("modulo", lhs, rhs))
}

pub fn negate(operand: &Operand, pools: &mut PoolSet) -> VectorResult<Operand> {
    match operand {
        Operand::Vector(v) => Ok(Operand::Vector(scaled_vector(v, -1.0, pools))),
        other => Err(VectorError::type_mismatch("negate", other.type_name())),
    }
}

/// Exact equality. Operands of different kinds or dimensions are unequal.
pub fn equals(lhs: &Operand, rhs: &Operand) -> bool {
    match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => a == b,
        (Operand::Matrix(a), Operand::Matrix(b)) => a == b,
        (Operand::Scalar(a), Operand::Scalar(b)) => a == b,
        _ => false,
    }
}

/// True when every component of `lhs` is strictly below the matching one.
pub fn less_than(lhs: &Operand, rhs: &Operand) -> VectorResult<bool> {
    let result = match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => same_dimension!(a, b, |x, y| x.all_less_than(y)),
        _ => None,
    };
    result.ok_or_else(|| mismatch("less_than", lhs, rhs))
}

pub fn less_equal(lhs: &Operand, rhs: &Operand) -> VectorResult<bool> {
    let result = match (lhs, rhs) {
        (Operand::Vector(a), Operand::Vector(b)) => same_dimension!(a, b, |x, y| x.all_less_equal(y)),
        _ => None,
    };
    result.ok_or_else(|| mismatch("less_equal", lhs, rhs))
}

/// The length operator: a vector's (or matrix's) dimension.
pub fn length(operand: &Operand) -> VectorResult<usize> {
    match operand {
        Operand::Vector(v) => Ok(v.dimension()),
        Operand::Matrix(m) => Ok(m.dimension()),
        other => Err(VectorError::type_mismatch("length", other.type_name())),
    }
}

pub fn stringify(operand: &Operand) -> String {
    operand.to_string()
}

/// Swizzle read. Invalid keys produce `None`, the guest's "no value".
pub fn index_read<const N: usize>(vector: &Vector<N>, key: &str, pools: &mut PoolSet) -> Option<Operand> {
    swizzle::read(vector, key, pools).map(|swizzled| match swizzled {
        Swizzled::Scalar(value) => Operand::Scalar(value),
        Swizzled::Vector(value) => Operand::Vector(value),
    })
}

/// Swizzle write. Single keys take a number, longer keys a vector of the
/// key's length. Nothing is written unless the whole assignment is valid.
pub fn index_write<const N: usize>(vector: &mut Vector<N>, key: &str, value: &Operand) -> VectorResult<()> {
    match value {
        Operand::Scalar(scalar) => swizzle::write(vector, key, std::slice::from_ref(scalar)),
        Operand::Vector(source) => swizzle::write(vector, key, source.as_slice()),
        other => Err(VectorError::operand_mismatch("index_write", format!("Vector{N}"), other.type_name())),
    }
}

/// An argument that is either a whole vector or its components spelled out,
/// as accepted by `set`, `add`, `sub`, `mul`, `div` and `reduce`.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorArg<const N: usize> {
    Vector(Vector<N>),
    Components([f64; N]),
}

impl<const N: usize> VectorArg<N> {
    /// Resolves a guest argument list. A leading vector must match the
    /// receiver's dimension; otherwise every argument must be a number and
    /// missing trailing components are zero.
    pub fn resolve(operation: &'static str, args: &[Operand]) -> VectorResult<Self> {
        match args.first() {
            Some(Operand::Vector(vector)) => {
                let components: [f64; N] = vector
                    .as_slice()
                    .try_into()
                    .map_err(|_| VectorError::type_mismatch(operation, vector.type_name()))?;
                Ok(VectorArg::Vector(Vector::new(components)))
            }
            _ => {
                let mut components = [0.0; N];
                for (slot, arg) in components.iter_mut().zip(args) {
                    match arg {
                        Operand::Scalar(value) => *slot = *value,
                        other => return Err(VectorError::type_mismatch(operation, other.type_name())),
                    }
                }
                Ok(VectorArg::Components(components))
            }
        }
    }

    pub fn into_vector(self) -> Vector<N> {
        match self {
            VectorArg::Vector(vector) => vector,
            VectorArg::Components(components) => Vector::new(components),
        }
    }
}
