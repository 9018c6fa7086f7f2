//! Fixed-size `f64` vectors exposed to guest scripts.
//!
//! Every arithmetic method mutates `self` in place and returns it for
//! chaining. The non-mutating twins (`plus`, `scaled`, `crossed`, ...) draw
//! their result from the sandbox's [`PoolSet`] and leave the receiver alone.

use std::f64::consts::PI;
use std::fmt;

use crate::matrix::Matrix;
use crate::pool::{PoolSet, Poolable, Pooled, ValuePool};

/// Largest vector the swizzle codec can produce.
pub const MAX_DIMENSION: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Vector<const N: usize> {
    components: [f64; N],
}

pub type Vec2 = Vector<2>;
pub type Vec3 = Vector<3>;
pub type Vec4 = Vector<4>;
pub type Vec5 = Vector<5>;
pub type Vec6 = Vector<6>;

impl<const N: usize> Default for Vector<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> Poolable for Vector<N> {
    fn reset(&mut self) {
        self.components = [0.0; N];
    }
}

impl<const N: usize> Vector<N> {
    pub const DIMENSION: usize = N;

    pub fn zero() -> Self {
        Self { components: [0.0; N] }
    }

    pub fn new(components: [f64; N]) -> Self {
        Self { components }
    }

    pub fn splat(value: f64) -> Self {
        Self { components: [value; N] }
    }

    #[inline]
    pub fn components(&self) -> &[f64; N] {
        &self.components
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.components.get(index).copied()
    }

    pub fn set(&mut self, components: [f64; N]) -> &mut Self {
        self.components = components;
        self
    }

    pub fn set_from(&mut self, other: &Self) -> &mut Self {
        self.components = other.components;
        self
    }

    pub(crate) fn set_component(&mut self, index: usize, value: f64) {
        self.components[index] = value;
    }

    fn zip_with(&mut self, other: &Self, op: impl Fn(f64, f64) -> f64) -> &mut Self {
        for (lhs, rhs) in self.components.iter_mut().zip(other.components.iter()) {
            *lhs = op(*lhs, *rhs);
        }
        self
    }

    pub fn add(&mut self, other: &Self) -> &mut Self {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn subtract(&mut self, other: &Self) -> &mut Self {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn multiply(&mut self, other: &Self) -> &mut Self {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise division. Zero components are not checked and follow
    /// IEEE semantics (infinity or NaN).
    pub fn divide(&mut self, other: &Self) -> &mut Self {
        self.zip_with(other, |a, b| a / b)
    }

    /// Floored modulo per component: the result takes the sign of the modulus.
    pub fn reduce(&mut self, modulus: &Self) -> &mut Self {
        self.zip_with(modulus, floored_mod)
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        for component in &mut self.components {
            *component *= factor;
        }
        self
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.components.iter().zip(other.components.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn length_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Divides by the length. A zero vector becomes all NaN.
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        for component in &mut self.components {
            *component /= length;
        }
        self
    }

    /// Rescales so the length lies within `[min, max]`. An absent `min` is
    /// zero and an absent `max` is unbounded. Zero vectors are left alone.
    pub fn clamp_length(&mut self, min: Option<f64>, max: Option<f64>) -> &mut Self {
        let length = self.length();
        if length == 0.0 {
            return self;
        }
        let min = min.unwrap_or(0.0);
        if length < min {
            return self.scale(min / length);
        }
        match max {
            Some(max) if length > max => self.scale(max / length),
            _ => self,
        }
    }

    /// `self = matrix * self`, row-major.
    pub fn transform(&mut self, matrix: &Matrix<N>) -> &mut Self {
        self.components = matrix.apply(&self.components);
        self
    }

    /// Feeds each component through `func`, lowest index first. If any call
    /// fails the vector is left untouched.
    pub fn apply_func<E>(&mut self, mut func: impl FnMut(f64) -> Result<f64, E>) -> Result<&mut Self, E> {
        let mut next = self.components;
        for component in &mut next {
            *component = func(*component)?;
        }
        self.components = next;
        Ok(self)
    }

    pub fn all_less_than(&self, other: &Self) -> bool {
        self.components.iter().zip(other.components.iter()).all(|(a, b)| a < b)
    }

    pub fn all_less_equal(&self, other: &Self) -> bool {
        self.components.iter().zip(other.components.iter()).all(|(a, b)| a <= b)
    }
}

impl<const N: usize> Vector<N>
where
    Self: Pooled,
{
    /// A pooled vector holding `components`.
    pub fn of(pools: &mut PoolSet, components: [f64; N]) -> Self {
        let mut vector: Self = pools.fresh();
        vector.components = components;
        vector
    }

    pub fn copy(&self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.components)
    }

    pub fn plus(&self, other: &Self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.add(other);
        out
    }

    pub fn minus(&self, other: &Self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.subtract(other);
        out
    }

    pub fn times(&self, other: &Self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.multiply(other);
        out
    }

    pub fn divided_by(&self, other: &Self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.divide(other);
        out
    }

    pub fn modulo(&self, modulus: &Self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.reduce(modulus);
        out
    }

    pub fn scaled(&self, factor: f64, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.scale(factor);
        out
    }

    pub fn normalized(&self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.normalize();
        out
    }

    pub fn clamped(&self, min: Option<f64>, max: Option<f64>, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.clamp_length(min, max);
        out
    }

    pub fn transformed(&self, matrix: &Matrix<N>, pools: &mut PoolSet) -> Self {
        Self::of(pools, matrix.apply(&self.components))
    }

    pub fn to_rad(&self, pools: &mut PoolSet) -> Self {
        self.scaled(PI / 180.0, pools)
    }

    pub fn to_deg(&self, pools: &mut PoolSet) -> Self {
        self.scaled(180.0 / PI, pools)
    }

    pub fn floor(&self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.components.map(f64::floor))
    }

    pub fn ceil(&self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.components.map(f64::ceil))
    }
}

macro_rules! impl_planar_accessors {
    ($($n:literal),*) => {
        $(
            impl Vector<$n> {
                #[inline]
                pub fn x(&self) -> f64 {
                    self.components[0]
                }

                #[inline]
                pub fn y(&self) -> f64 {
                    self.components[1]
                }
            }
        )*
    };
}

impl_planar_accessors!(2, 3, 4, 5, 6);

impl Vector<3> {
    #[inline]
    pub fn z(&self) -> f64 {
        self.components[2]
    }

    fn cross_components(&self, other: &Self) -> [f64; 3] {
        let [ax, ay, az] = self.components;
        let [bx, by, bz] = other.components;
        [ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx]
    }

    /// Right-handed cross product, in place.
    pub fn cross(&mut self, other: &Self) -> &mut Self {
        self.components = self.cross_components(other);
        self
    }

    pub fn crossed(&self, other: &Self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.cross_components(other))
    }
}

macro_rules! impl_augmented {
    ($($n:literal => $next:literal),* $(,)?) => {
        $(
            impl Vector<$n> {
                /// Appends a trailing `1` for homogeneous coordinates.
                pub fn augmented(&self, pools: &mut PoolSet) -> Vector<$next> {
                    let mut out: Vector<$next> = pools.fresh();
                    out.components[..$n].copy_from_slice(&self.components);
                    out.components[$n] = 1.0;
                    out
                }
            }
        )*
    };
}

impl_augmented!(2 => 3, 3 => 4, 4 => 5, 5 => 6);

macro_rules! impl_pooled_vector {
    ($($n:literal => $field:ident, $name:literal);* $(;)?) => {
        $(
            impl Pooled for Vector<$n> {
                const POOL_NAME: &'static str = $name;

                fn pool(set: &mut PoolSet) -> &mut ValuePool<Self> {
                    &mut set.$field
                }
            }
        )*
    };
}

impl_pooled_vector!(
    2 => vec2, "Vector2";
    3 => vec3, "Vector3";
    4 => vec4, "Vector4";
    5 => vec5, "Vector5";
    6 => vec6, "Vector6";
);

impl<const N: usize> fmt::Display for Vector<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, &self.components)
    }
}

pub(crate) fn write_components(f: &mut fmt::Formatter<'_>, components: &[f64]) -> fmt::Result {
    f.write_str("{")?;
    for (idx, component) in components.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{component}")?;
    }
    f.write_str("}")
}

#[inline]
pub fn floored_mod(value: f64, modulus: f64) -> f64 {
    ((value % modulus) + modulus) % modulus
}

/// A vector of any supported dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyVector {
    V2(Vec2),
    V3(Vec3),
    V4(Vec4),
    V5(Vec5),
    V6(Vec6),
}

impl AnyVector {
    /// Builds a pooled vector whose dimension is `components.len()`.
    /// Returns `None` outside 2..=6.
    pub fn from_slice(components: &[f64], pools: &mut PoolSet) -> Option<Self> {
        fn pooled<const N: usize>(components: &[f64], pools: &mut PoolSet) -> Option<Vector<N>>
        where
            Vector<N>: Pooled,
        {
            let array: [f64; N] = components.try_into().ok()?;
            Some(Vector::of(pools, array))
        }

        Some(match components.len() {
            2 => AnyVector::V2(pooled(components, pools)?),
            3 => AnyVector::V3(pooled(components, pools)?),
            4 => AnyVector::V4(pooled(components, pools)?),
            5 => AnyVector::V5(pooled(components, pools)?),
            6 => AnyVector::V6(pooled(components, pools)?),
            _ => return None,
        })
    }

    pub fn dimension(&self) -> usize {
        self.as_slice().len()
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            AnyVector::V2(v) => v.as_slice(),
            AnyVector::V3(v) => v.as_slice(),
            AnyVector::V4(v) => v.as_slice(),
            AnyVector::V5(v) => v.as_slice(),
            AnyVector::V6(v) => v.as_slice(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnyVector::V2(_) => Vec2::POOL_NAME,
            AnyVector::V3(_) => Vec3::POOL_NAME,
            AnyVector::V4(_) => Vec4::POOL_NAME,
            AnyVector::V5(_) => Vec5::POOL_NAME,
            AnyVector::V6(_) => Vec6::POOL_NAME,
        }
    }
}

impl fmt::Display for AnyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, self.as_slice())
    }
}

macro_rules! impl_any_vector_from {
    ($($n:literal => $variant:ident),*) => {
        $(
            impl From<Vector<$n>> for AnyVector {
                fn from(value: Vector<$n>) -> Self {
                    AnyVector::$variant(value)
                }
            }
        )*
    };
}

impl_any_vector_from!(2 => V2, 3 => V3, 4 => V4, 5 => V5, 6 => V6);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_copies_are_independent<const N: usize>(rng: &mut StdRng, pools: &mut PoolSet)
    where
        Vector<N>: Pooled,
    {
        for _ in 0..200 {
            let original = Vector::<N>::of(pools, std::array::from_fn(|_| rng.gen_range(-1e3..1e3)));
            let snapshot = *original.components();
            let mut copy = original.copy(pools);
            assert_eq!(copy, original);
            copy.add(&Vector::splat(rng.gen_range(1.0..10.0)));
            assert_eq!(original.components(), &snapshot);
            assert_ne!(copy, original);
            pools.release(copy);
        }
    }

    #[test]
    fn copy_is_equal_and_independent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut pools = PoolSet::default();
        assert_copies_are_independent::<2>(&mut rng, &mut pools);
        assert_copies_are_independent::<3>(&mut rng, &mut pools);
        assert_copies_are_independent::<4>(&mut rng, &mut pools);
        assert_copies_are_independent::<5>(&mut rng, &mut pools);
        assert_copies_are_independent::<6>(&mut rng, &mut pools);
    }

    #[test]
    fn planar_accessors_on_every_dimension() {
        assert_eq!((Vec2::new([1.0, 2.0]).x(), Vec2::new([1.0, 2.0]).y()), (1.0, 2.0));
        let v = Vec6::new([6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!((v.x(), v.y()), (6.0, 5.0));
    }

    #[test]
    fn reduce_stays_in_modulus_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let m: f64 = rng.gen_range(0.001..100.0);
            let mut v = Vec3::new([rng.gen_range(-1e6..1e6), rng.gen_range(-1e3..1e3), rng.gen_range(-1.0..1.0)]);
            v.reduce(&Vec3::splat(m));
            for c in v.components() {
                assert!((0.0..m).contains(c), "{c} outside [0, {m})");
            }
        }
    }

    #[test]
    fn reduce_matches_floored_modulo() {
        let mut v = Vec2::new([-1.0, 7.5]);
        v.reduce(&Vec2::new([3.0, 2.0]));
        assert_eq!(v.components(), &[2.0, 1.5]);
    }

    #[test]
    fn cross_is_anti_commutative() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pools = PoolSet::default();
        for _ in 0..500 {
            let a = Vec3::new([rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)]);
            let b = Vec3::new([rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0)]);
            let ab = a.crossed(&b, &mut pools);
            let ba = b.crossed(&a, &mut pools);
            for (l, r) in ab.components().iter().zip(ba.components()) {
                assert!((l + r).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn cross_of_axes_is_right_handed() {
        let mut x = Vec3::new([1.0, 0.0, 0.0]);
        x.cross(&Vec3::new([0.0, 1.0, 0.0]));
        assert_eq!(x.components(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn normalize_zero_vector_is_nan() {
        let mut v = Vec3::zero();
        v.normalize();
        assert!(v.components().iter().all(|c| c.is_nan()));
    }

    #[test]
    fn element_wise_divide_is_unchecked() {
        let mut v = Vec3::new([1.0, 2.0, 3.0]);
        v.divide(&Vec3::new([0.0, 1.0, 1.0]));
        assert_eq!(v.x(), f64::INFINITY);
        assert_eq!(v.y(), 2.0);
        assert_eq!(v.z(), 3.0);
    }

    #[test]
    fn clamp_length_bounds() {
        let mut v = Vec2::new([3.0, 4.0]);
        v.clamp_length(None, Some(1.0));
        assert!((v.length() - 1.0).abs() < 1e-12);

        let mut v = Vec2::new([0.3, 0.4]);
        v.clamp_length(Some(2.0), None);
        assert!((v.length() - 2.0).abs() < 1e-12);

        let mut v = Vec2::new([0.6, 0.8]);
        v.clamp_length(Some(0.5), Some(2.0));
        assert_eq!(v.components(), &[0.6, 0.8]);

        let mut v = Vec2::zero();
        v.clamp_length(Some(1.0), Some(2.0));
        assert_eq!(v, Vec2::zero());
    }

    #[test]
    fn floor_and_ceil_leave_receiver() {
        let mut pools = PoolSet::default();
        let v = Vec2::new([1.5, -1.5]);
        assert_eq!(v.floor(&mut pools).components(), &[1.0, -2.0]);
        assert_eq!(v.ceil(&mut pools).components(), &[2.0, -1.0]);
        assert_eq!(v.components(), &[1.5, -1.5]);
    }

    #[test]
    fn augmented_appends_one() {
        let mut pools = PoolSet::default();
        let v = Vec3::new([1.0, 2.0, 3.0]).augmented(&mut pools);
        assert_eq!(v.components(), &[1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn apply_func_runs_in_order_and_is_atomic() {
        let mut seen = Vec::new();
        let mut v = Vec3::new([1.0, 2.0, 3.0]);
        v.apply_func::<()>(|c| {
            seen.push(c);
            Ok(c * 10.0)
        })
        .unwrap();
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);
        assert_eq!(v.components(), &[10.0, 20.0, 30.0]);

        let result = v.apply_func(|c| if c > 15.0 { Err("too big") } else { Ok(0.0) });
        assert!(result.is_err());
        assert_eq!(v.components(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn display_lists_components() {
        assert_eq!(Vec3::new([5.0, 7.0, 9.0]).to_string(), "{5, 7, 9}");
        assert_eq!(Vec2::new([0.5, -1.0]).to_string(), "{0.5, -1}");
    }

    #[test]
    fn any_vector_from_slice_picks_dimension() {
        let mut pools = PoolSet::default();
        let v = AnyVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0], &mut pools).unwrap();
        assert_eq!(v.type_name(), "Vector5");
        assert!(AnyVector::from_slice(&[1.0], &mut pools).is_none());
        assert!(AnyVector::from_slice(&[0.0; 7], &mut pools).is_none());
    }
}
