//! Square matrices consumed by vector `transform`.

use std::fmt;

use crate::pool::{PoolSet, Poolable, Pooled, ValuePool};
use crate::vector::{write_components, Vector};

/// Row-major square matrix: `rows[i][j]` is row `i`, column `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<const N: usize> {
    rows: [[f64; N]; N],
}

pub type Mat2 = Matrix<2>;
pub type Mat3 = Matrix<3>;
pub type Mat4 = Matrix<4>;

impl<const N: usize> Default for Matrix<N> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const N: usize> Poolable for Matrix<N> {
    fn reset(&mut self) {
        *self = Self::identity();
    }
}

impl<const N: usize> Matrix<N> {
    pub fn identity() -> Self {
        let mut rows = [[0.0; N]; N];
        for (idx, row) in rows.iter_mut().enumerate() {
            row[idx] = 1.0;
        }
        Self { rows }
    }

    pub fn from_rows(rows: [[f64; N]; N]) -> Self {
        Self { rows }
    }

    #[inline]
    pub fn rows(&self) -> &[[f64; N]; N] {
        &self.rows
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.rows[row][column]
    }

    pub fn row(&self, index: usize) -> Option<[f64; N]> {
        self.rows.get(index).copied()
    }

    pub fn column(&self, index: usize) -> Option<[f64; N]> {
        if index >= N {
            return None;
        }
        Some(std::array::from_fn(|row| self.rows[row][index]))
    }

    /// `result[i] = sum_j self[i][j] * vector[j]`
    pub fn apply(&self, vector: &[f64; N]) -> [f64; N] {
        std::array::from_fn(|i| self.rows[i].iter().zip(vector.iter()).map(|(m, v)| m * v).sum())
    }

    fn product(&self, other: &Self) -> [[f64; N]; N] {
        std::array::from_fn(|i| std::array::from_fn(|j| (0..N).map(|k| self.rows[i][k] * other.rows[k][j]).sum()))
    }

    /// `self = self * other`
    pub fn multiply(&mut self, other: &Self) -> &mut Self {
        self.rows = self.product(other);
        self
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        for value in self.rows.iter_mut().flatten() {
            *value *= factor;
        }
        self
    }

    pub fn transpose(&mut self) -> &mut Self {
        for i in 0..N {
            for j in (i + 1)..N {
                let upper = self.rows[i][j];
                self.rows[i][j] = self.rows[j][i];
                self.rows[j][i] = upper;
            }
        }
        self
    }
}

impl<const N: usize> Matrix<N>
where
    Self: Pooled,
{
    pub fn of(pools: &mut PoolSet, rows: [[f64; N]; N]) -> Self {
        let mut matrix: Self = pools.fresh();
        matrix.rows = rows;
        matrix
    }

    pub fn copy(&self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.rows)
    }

    pub fn times(&self, other: &Self, pools: &mut PoolSet) -> Self {
        Self::of(pools, self.product(other))
    }

    pub fn scaled(&self, factor: f64, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.scale(factor);
        out
    }

    pub fn transposed(&self, pools: &mut PoolSet) -> Self {
        let mut out = self.copy(pools);
        out.transpose();
        out
    }

    pub fn row_vector(&self, index: usize, pools: &mut PoolSet) -> Option<Vector<N>>
    where
        Vector<N>: Pooled,
    {
        self.row(index).map(|row| Vector::of(pools, row))
    }

    pub fn column_vector(&self, index: usize, pools: &mut PoolSet) -> Option<Vector<N>>
    where
        Vector<N>: Pooled,
    {
        self.column(index).map(|column| Vector::of(pools, column))
    }
}

macro_rules! impl_pooled_matrix {
    ($($n:literal => $field:ident, $name:literal);* $(;)?) => {
        $(
            impl Pooled for Matrix<$n> {
                const POOL_NAME: &'static str = $name;

                fn pool(set: &mut PoolSet) -> &mut ValuePool<Self> {
                    &mut set.$field
                }
            }
        )*
    };
}

impl_pooled_matrix!(
    2 => mat2, "Matrix2";
    3 => mat3, "Matrix3";
    4 => mat4, "Matrix4";
);

impl<const N: usize> fmt::Display for Matrix<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, row) in self.rows.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write_components(f, row)?;
        }
        f.write_str("]")
    }
}

/// A matrix of any supported dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMatrix {
    M2(Mat2),
    M3(Mat3),
    M4(Mat4),
}

impl AnyMatrix {
    pub fn dimension(&self) -> usize {
        match self {
            AnyMatrix::M2(_) => 2,
            AnyMatrix::M3(_) => 3,
            AnyMatrix::M4(_) => 4,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AnyMatrix::M2(_) => Mat2::POOL_NAME,
            AnyMatrix::M3(_) => Mat3::POOL_NAME,
            AnyMatrix::M4(_) => Mat4::POOL_NAME,
        }
    }
}

impl fmt::Display for AnyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyMatrix::M2(m) => fmt::Display::fmt(m, f),
            AnyMatrix::M3(m) => fmt::Display::fmt(m, f),
            AnyMatrix::M4(m) => fmt::Display::fmt(m, f),
        }
    }
}

impl From<Mat2> for AnyMatrix {
    fn from(value: Mat2) -> Self {
        AnyMatrix::M2(value)
    }
}

impl From<Mat3> for AnyMatrix {
    fn from(value: Mat3) -> Self {
        AnyMatrix::M3(value)
    }
}

impl From<Mat4> for AnyMatrix {
    fn from(value: Mat4) -> Self {
        AnyMatrix::M4(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vec3;

    #[test]
    fn apply_is_row_major() {
        let m = Mat3::from_rows([[1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]]);
        assert_eq!(m.apply(&[1.0, 1.0, 1.0]), [6.0, 1.0, 2.0]);

        let mut v = Vec3::new([1.0, 1.0, 1.0]);
        v.transform(&m);
        assert_eq!(v.components(), &[6.0, 1.0, 2.0]);
    }

    #[test]
    fn identity_is_neutral() {
        let mut pools = PoolSet::default();
        let m = Mat2::from_rows([[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(m.times(&Mat2::identity(), &mut pools), m);
        assert_eq!(Mat2::identity().times(&m, &mut pools), m);
    }

    #[test]
    fn multiply_then_apply_composes() {
        let a = Mat2::from_rows([[0.0, -1.0], [1.0, 0.0]]);
        let b = Mat2::from_rows([[2.0, 0.0], [0.0, 3.0]]);
        let mut ab = a.clone();
        ab.multiply(&b);
        assert_eq!(ab.apply(&[1.0, 1.0]), a.apply(&b.apply(&[1.0, 1.0])));
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let mut m = Mat3::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let column = m.column(0).unwrap();
        m.transpose();
        assert_eq!(m.row(0).unwrap(), column);
        assert_eq!(m.get(2, 0), 3.0);
    }

    #[test]
    fn released_matrix_resets_to_identity() {
        let mut pools = PoolSet::new(1, 1);
        pools.release(Mat2::from_rows([[5.0, 5.0], [5.0, 5.0]]));
        let m: Mat2 = pools.fresh();
        assert_eq!(m, Mat2::identity());
    }

    #[test]
    fn display_nests_rows() {
        assert_eq!(Mat2::identity().to_string(), "[{1, 0}, {0, 1}]");
    }
}
