//! Pooled vector and matrix values for sandboxed rhai scripts.
//!
//! [`vector`] and [`matrix`] hold the strongly typed core, [`pool`] the
//! per-sandbox recycling, [`swizzle`] the multi-component key codec and
//! [`dispatch`] the dynamically typed operator rules. [`bindings`] exposes
//! all of it to rhai and [`scripts::ScriptHost`] drives one script.

pub mod bindings;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod limits;
pub mod matrix;
pub mod pool;
pub mod scripts;
pub mod swizzle;
pub mod vector;

pub use error::{VectorError, VectorResult};
pub use matrix::{AnyMatrix, Mat2, Mat3, Mat4, Matrix};
pub use pool::{PoolSet, PoolSetStats, PoolStats};
pub use scripts::ScriptHost;
pub use vector::{AnyVector, Vec2, Vec3, Vec4, Vec5, Vec6, Vector};
