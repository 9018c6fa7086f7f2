//! Conversions between host-side `glam` types and pooled guest values.
//!
//! Host positions are `f64` (`DVec3`); render-side vectors are `f32`
//! (`glam::Vec3`); block coordinates are integers (`IVec3`). glam matrices
//! are column-major while [`Matrix`] stores rows, so matrix conversions
//! transpose on the way through.

use glam::{DMat3, DMat4, DVec2, DVec3, DVec4, IVec3};

use crate::matrix::{Mat3, Mat4, Matrix};
use crate::pool::PoolSet;
use crate::vector::{Vec2, Vec3, Vec4, Vector};

pub fn vec3_from_position(pools: &mut PoolSet, position: DVec3) -> Vec3 {
    Vector::of(pools, position.to_array())
}

pub fn vec3_to_position(vector: &Vec3) -> DVec3 {
    DVec3::from_array(*vector.components())
}

pub fn vec3_from_vec3f(pools: &mut PoolSet, value: glam::Vec3) -> Vec3 {
    Vector::of(pools, value.as_dvec3().to_array())
}

pub fn vec3_to_vec3f(vector: &Vec3) -> glam::Vec3 {
    vec3_to_position(vector).as_vec3()
}

pub fn vec3_from_block_pos(pools: &mut PoolSet, block: IVec3) -> Vec3 {
    Vector::of(pools, block.as_dvec3().to_array())
}

/// Floors each component, so `-0.5` lands in block `-1`.
pub fn vec3_to_block_pos(vector: &Vec3) -> IVec3 {
    vec3_to_position(vector).floor().as_ivec3()
}

pub fn vec2_from_dvec2(pools: &mut PoolSet, value: DVec2) -> Vec2 {
    Vector::of(pools, value.to_array())
}

pub fn vec2_to_dvec2(vector: &Vec2) -> DVec2 {
    DVec2::from_array(*vector.components())
}

pub fn vec4_from_dvec4(pools: &mut PoolSet, value: DVec4) -> Vec4 {
    Vector::of(pools, value.to_array())
}

pub fn vec4_to_dvec4(vector: &Vec4) -> DVec4 {
    DVec4::from_array(*vector.components())
}

fn transposed<const N: usize>(grid: [[f64; N]; N]) -> [[f64; N]; N] {
    std::array::from_fn(|i| std::array::from_fn(|j| grid[j][i]))
}

pub fn mat3_from_dmat3(pools: &mut PoolSet, value: DMat3) -> Mat3 {
    Matrix::of(pools, transposed(value.to_cols_array_2d()))
}

pub fn mat3_to_dmat3(matrix: &Mat3) -> DMat3 {
    DMat3::from_cols_array_2d(&transposed(*matrix.rows()))
}

pub fn mat4_from_dmat4(pools: &mut PoolSet, value: DMat4) -> Mat4 {
    Matrix::of(pools, transposed(value.to_cols_array_2d()))
}

pub fn mat4_to_dmat4(matrix: &Mat4) -> DMat4 {
    DMat4::from_cols_array_2d(&transposed(*matrix.rows()))
}
