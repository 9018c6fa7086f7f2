//! Swizzle keys: attribute names such as `"x"`, `"zyx"` or `"xy_1"` that read
//! or write several components of a vector at once.
//!
//! Each character names one component through one of its aliases (positional
//! digit, axis letter or colour channel) or is `_`, a zero-fill lane that is
//! only meaningful when reading. Keys are 1 to 6 characters long, so a read
//! can produce any vector dimension from 2 to 6 regardless of the source.

use smallvec::SmallVec;

use crate::error::{SwizzleFault, VectorError, VectorResult};
use crate::pool::PoolSet;
use crate::vector::{AnyVector, Vector, MAX_DIMENSION};

pub const MAX_KEY_LEN: usize = MAX_DIMENSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Component(usize),
    Zero,
}

pub type Lanes = SmallVec<[Lane; MAX_KEY_LEN]>;

const UNMAPPED: u8 = u8::MAX;
const ZERO_FILL: u8 = u8::MAX - 1;

/// Aliases per component index.
const ALIASES: [&[u8]; MAX_DIMENSION] = [b"1xr", b"2yg", b"3zb", b"4wa", b"5t", b"6h"];

static LANE_TABLE: [u8; 128] = build_lane_table();

const fn build_lane_table() -> [u8; 128] {
    let mut table = [UNMAPPED; 128];
    table[b'_' as usize] = ZERO_FILL;
    let mut component = 0;
    while component < ALIASES.len() {
        let aliases = ALIASES[component];
        let mut i = 0;
        while i < aliases.len() {
            table[aliases[i] as usize] = component as u8;
            i += 1;
        }
        component += 1;
    }
    table
}

/// Resolves one key character against a vector of `dimension` components.
pub fn lane(ch: char, dimension: usize) -> Option<Lane> {
    match *LANE_TABLE.get(ch as usize)? {
        UNMAPPED => None,
        ZERO_FILL => Some(Lane::Zero),
        component if usize::from(component) < dimension => Some(Lane::Component(usize::from(component))),
        _ => None,
    }
}

/// Decodes a whole key. The first bad character rejects the key.
pub fn decode(key: &str, dimension: usize) -> Result<Lanes, SwizzleFault> {
    let len = key.chars().count();
    if len == 0 || len > MAX_KEY_LEN {
        return Err(SwizzleFault::Length(len));
    }
    key.chars().map(|ch| lane(ch, dimension).ok_or(SwizzleFault::Character(ch))).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Swizzled {
    Scalar(f64),
    Vector(AnyVector),
}

/// Reads `key` from `vector`. Single-character keys yield a scalar, longer
/// keys a pooled vector of the key's length. Invalid keys yield `None`.
pub fn read<const N: usize>(vector: &Vector<N>, key: &str, pools: &mut PoolSet) -> Option<Swizzled> {
    let lanes = decode(key, N).ok()?;
    let source = vector.components();
    if let [single] = lanes.as_slice() {
        return match single {
            Lane::Component(index) => Some(Swizzled::Scalar(source[*index])),
            Lane::Zero => None,
        };
    }
    let values: SmallVec<[f64; MAX_KEY_LEN]> = lanes
        .iter()
        .map(|lane| match lane {
            Lane::Component(index) => source[*index],
            Lane::Zero => 0.0,
        })
        .collect();
    AnyVector::from_slice(&values, pools).map(Swizzled::Vector)
}

/// Writes `values` into the components named by `key`, in key order.
///
/// The key is fully validated, and its length checked against `values`,
/// before anything is written.
pub fn write<const N: usize>(vector: &mut Vector<N>, key: &str, values: &[f64]) -> VectorResult<()> {
    let lanes = decode(key, N).map_err(|fault| VectorError::InvalidSwizzleKey { key: key.to_string(), fault })?;
    if lanes.contains(&Lane::Zero) {
        return Err(VectorError::InvalidSwizzleKey { key: key.to_string(), fault: SwizzleFault::Character('_') });
    }
    if lanes.len() != values.len() {
        return Err(VectorError::SwizzleLengthMismatch {
            key: key.to_string(),
            expected: lanes.len(),
            found: values.len(),
        });
    }
    for (lane, value) in lanes.iter().zip(values) {
        if let Lane::Component(index) = lane {
            vector.set_component(*index, *value);
        }
    }
    Ok(())
}
