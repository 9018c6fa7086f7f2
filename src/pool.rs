//! Capacity-bounded recycling stores for vector and matrix values.
//!
//! Guest scripts create and drop short-lived vectors every tick. Instead of
//! constructing a new value for each one, released values are reset and kept
//! in a per-type free list, up to a fixed capacity. Acquiring never fails: an
//! empty store falls back to the factory.
//!
//! # Thread Safety
//!
//! Nothing here is synchronized. Each script sandbox owns its own [`PoolSet`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::limits::{Limit, SandboxLimits};
use crate::matrix::{Mat2, Mat3, Mat4};
use crate::vector::{AnyVector, Vec2, Vec3, Vec4, Vec5, Vec6};

pub const DEFAULT_VECTOR_CAPACITY: usize = 300;
pub const DEFAULT_MATRIX_CAPACITY: usize = 100;

/// A value that can be put back into a defined default state.
pub trait Poolable {
    fn reset(&mut self);
}

/// Counters describing how a pool has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Values built by the factory because the store was empty.
    pub constructed: u64,
    /// Values handed out from the store.
    pub recycled: u64,
    /// Values dropped on release because the store was full.
    pub discarded: u64,
    /// Values currently waiting in the store.
    pub retained: usize,
}

pub struct ValuePool<T> {
    store: Vec<T>,
    factory: fn() -> T,
    capacity: usize,
    stats: PoolStats,
}

impl<T: Poolable> ValuePool<T> {
    /// `capacity` bounds how many released values are kept. The store itself
    /// grows on demand.
    pub fn new(capacity: usize, factory: fn() -> T) -> Self {
        Self { store: Vec::new(), factory, capacity, stats: PoolStats::default() }
    }

    /// Returns a value in its default state, recycled when possible.
    pub fn acquire(&mut self) -> T {
        match self.store.pop() {
            Some(mut value) => {
                value.reset();
                self.stats.recycled += 1;
                value
            }
            None => {
                self.stats.constructed += 1;
                (self.factory)()
            }
        }
    }

    /// Hands a value back. Beyond capacity the value is simply dropped.
    ///
    /// The pool does not track checked-out values; releasing the same logical
    /// value twice is the caller's bug.
    pub fn release(&mut self, mut value: T) {
        if self.store.len() < self.capacity {
            value.reset();
            self.store.push(value);
        } else {
            self.stats.discarded += 1;
            tracing::trace!(capacity = self.capacity, "pool full, discarding released value");
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, dropping retained values that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.store.truncate(capacity);
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats { retained: self.store.len(), ..self.stats }
    }
}

/// Types that live in one of the pools of a [`PoolSet`].
pub trait Pooled: Poolable + Sized {
    const POOL_NAME: &'static str;

    fn pool(set: &mut PoolSet) -> &mut ValuePool<Self>;
}

/// One pool per concrete vector and matrix type, owned by a single sandbox.
pub struct PoolSet {
    pub(crate) vec2: ValuePool<Vec2>,
    pub(crate) vec3: ValuePool<Vec3>,
    pub(crate) vec4: ValuePool<Vec4>,
    pub(crate) vec5: ValuePool<Vec5>,
    pub(crate) vec6: ValuePool<Vec6>,
    pub(crate) mat2: ValuePool<Mat2>,
    pub(crate) mat3: ValuePool<Mat3>,
    pub(crate) mat4: ValuePool<Mat4>,
}

impl Default for PoolSet {
    fn default() -> Self {
        Self::new(DEFAULT_VECTOR_CAPACITY, DEFAULT_MATRIX_CAPACITY)
    }
}

impl PoolSet {
    pub fn new(vector_capacity: usize, matrix_capacity: usize) -> Self {
        Self {
            vec2: ValuePool::new(vector_capacity, Vec2::zero),
            vec3: ValuePool::new(vector_capacity, Vec3::zero),
            vec4: ValuePool::new(vector_capacity, Vec4::zero),
            vec5: ValuePool::new(vector_capacity, Vec5::zero),
            vec6: ValuePool::new(vector_capacity, Vec6::zero),
            mat2: ValuePool::new(matrix_capacity, Mat2::identity),
            mat3: ValuePool::new(matrix_capacity, Mat3::identity),
            mat4: ValuePool::new(matrix_capacity, Mat4::identity),
        }
    }

    /// Sizes the pools from the sandbox's limits, falling back to defaults.
    pub fn from_limits(limits: &dyn SandboxLimits) -> Self {
        let capacity = |key: Limit, fallback: usize| {
            let value =
                limits.limit(key).map(|value| usize::try_from(value).unwrap_or(usize::MAX)).unwrap_or(fallback);
            tracing::debug!(limit = key.label(), value, "pool capacity");
            value
        };
        Self::new(
            capacity(Limit::VectorPoolCapacity, DEFAULT_VECTOR_CAPACITY),
            capacity(Limit::MatrixPoolCapacity, DEFAULT_MATRIX_CAPACITY),
        )
    }

    pub fn fresh<T: Pooled>(&mut self) -> T {
        T::pool(self).acquire()
    }

    pub fn release<T: Pooled>(&mut self, value: T) {
        T::pool(self).release(value);
    }

    pub fn release_any(&mut self, value: AnyVector) {
        match value {
            AnyVector::V2(v) => self.release(v),
            AnyVector::V3(v) => self.release(v),
            AnyVector::V4(v) => self.release(v),
            AnyVector::V5(v) => self.release(v),
            AnyVector::V6(v) => self.release(v),
        }
    }

    pub fn retained<T: Pooled>(&mut self) -> usize {
        T::pool(self).len()
    }

    pub fn clear(&mut self) {
        self.vec2.clear();
        self.vec3.clear();
        self.vec4.clear();
        self.vec5.clear();
        self.vec6.clear();
        self.mat2.clear();
        self.mat3.clear();
        self.mat4.clear();
    }

    pub fn stats(&self) -> PoolSetStats {
        let mut pools = BTreeMap::new();
        pools.insert(Vec2::POOL_NAME, self.vec2.stats());
        pools.insert(Vec3::POOL_NAME, self.vec3.stats());
        pools.insert(Vec4::POOL_NAME, self.vec4.stats());
        pools.insert(Vec5::POOL_NAME, self.vec5.stats());
        pools.insert(Vec6::POOL_NAME, self.vec6.stats());
        pools.insert(Mat2::POOL_NAME, self.mat2.stats());
        pools.insert(Mat3::POOL_NAME, self.mat3.stats());
        pools.insert(Mat4::POOL_NAME, self.mat4.stats());
        PoolSetStats { pools }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolSetStats {
    pub pools: BTreeMap<&'static str, PoolStats>,
}

impl PoolSetStats {
    pub fn get(&self, name: &str) -> Option<&PoolStats> {
        self.pools.get(name)
    }
}
