//! Square matrices of order 2, 3 and 4
//!
//! Storage is row-major (`rows[row][col]`) and the engine uses the
//! column-vector convention, so `M * v` transforms `v` and a translation lives
//! in the last column. [`Matrix4::to_cols_array`] produces the column-major
//! layout graphics APIs expect for uniform upload.
//!
//! Determinants and inverses are closed-form cofactor expansions. A matrix
//! whose determinant is exactly zero is never divided by: [`Matrix4::invert`]
//! leaves it unchanged.

use std::fmt;
use std::ops::{Add, Index, Mul};

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::vector::{Vector2, Vector3, Vector4};
use super::clean;

macro_rules! impl_matrix {
    ($name:ident, $vector:ident, $n:literal) => {
        impl $name {
            /// Order of the matrix
            pub const ORDER: usize = $n;

            /// Matrix with every entry zero
            pub const ZERO: Self = Self { rows: [[0.0; $n]; $n] };

            /// Identity matrix
            pub const IDENTITY: Self = Self { rows: Self::identity_rows() };

            const fn identity_rows() -> [[f32; $n]; $n] {
                let mut rows = [[0.0; $n]; $n];
                let mut i = 0;
                while i < $n {
                    rows[i][i] = 1.0;
                    i += 1;
                }
                rows
            }

            /// Build a matrix from its rows
            pub fn from_rows(rows: [[f32; $n]; $n]) -> Self {
                Self { rows: rows.map(|row| row.map(clean)) }
            }

            /// Rows of the matrix
            pub const fn rows(&self) -> [[f32; $n]; $n] {
                self.rows
            }

            /// Entry at `row`, `col`
            pub const fn get(&self, row: usize, col: usize) -> f32 {
                self.rows[row][col]
            }

            /// Overwrite the entry at `row`, `col`
            pub fn set_entry(&mut self, row: usize, col: usize, value: f32) -> &mut Self {
                self.rows[row][col] = clean(value);
                self
            }

            /// Copy every entry from `other`
            pub fn set(&mut self, other: &Self) -> &mut Self {
                self.rows = other.rows;
                self
            }

            /// Overwrite every entry from rows
            pub fn set_rows(&mut self, rows: [[f32; $n]; $n]) -> &mut Self {
                self.rows = rows.map(|row| row.map(clean));
                self
            }

            /// Reset to the identity matrix
            pub fn identity(&mut self) -> &mut Self {
                self.rows = Self::identity_rows();
                self
            }

            /// Row `index` as a vector
            pub fn row(&self, index: usize) -> $vector {
                $vector::from_array(self.rows[index])
            }

            /// Column `index` as a vector
            pub fn column(&self, index: usize) -> $vector {
                $vector::from_array(std::array::from_fn(|row| self.rows[row][index]))
            }

            /// Transpose in place
            pub fn transpose(&mut self) -> &mut Self {
                let rows = self.rows;
                self.rows = std::array::from_fn(|r| std::array::from_fn(|c| rows[c][r]));
                self
            }

            /// Transposed copy
            #[must_use]
            pub fn transposed(&self) -> Self {
                let mut copy = *self;
                copy.transpose();
                copy
            }

            /// Add `other` entry-wise
            pub fn sum(&mut self, other: &Self) -> &mut Self {
                for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
                    for (entry, value) in row.iter_mut().zip(other_row) {
                        *entry = clean(*entry + value);
                    }
                }
                self
            }

            /// Post-multiply in place: `self = self * other`
            pub fn mult(&mut self, other: &Self) -> &mut Self {
                let lhs = self.rows;
                self.rows = std::array::from_fn(|r| {
                    std::array::from_fn(|c| clean((0..$n).map(|k| lhs[r][k] * other.rows[k][c]).sum()))
                });
                self
            }

            /// Multiply every entry by `scalar`
            pub fn mult_scalar(&mut self, scalar: f32) -> &mut Self {
                for row in &mut self.rows {
                    for entry in row.iter_mut() {
                        *entry = clean(*entry * scalar);
                    }
                }
                self
            }

            /// Invert in place
            ///
            /// When the determinant is exactly zero the matrix is left
            /// unchanged.
            pub fn invert(&mut self) -> &mut Self {
                if let Some(inverse) = self.try_inverse() {
                    self.rows = inverse.rows;
                }
                self
            }

            /// Inverted copy, or an unchanged copy when singular
            #[must_use]
            pub fn inverse(&self) -> Self {
                self.try_inverse().unwrap_or(*self)
            }

            /// Row-major entries flattened into a single array
            pub fn to_rows_flat(&self) -> [f32; $n * $n] {
                bytemuck::cast(self.rows)
            }

            /// Column-major entries flattened into a single array
            pub fn to_cols_array(&self) -> [f32; $n * $n] {
                bytemuck::cast(self.transposed().rows)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::IDENTITY
            }
        }

        impl From<[[f32; $n]; $n]> for $name {
            fn from(rows: [[f32; $n]; $n]) -> Self {
                Self::from_rows(rows)
            }
        }

        impl From<$name> for [[f32; $n]; $n] {
            fn from(matrix: $name) -> Self {
                matrix.rows
            }
        }

        impl From<$name> for nalgebra::SMatrix<f32, $n, $n> {
            fn from(matrix: $name) -> Self {
                Self::from_row_slice(&matrix.to_rows_flat())
            }
        }

        impl From<nalgebra::SMatrix<f32, $n, $n>> for $name {
            fn from(matrix: nalgebra::SMatrix<f32, $n, $n>) -> Self {
                Self::from_rows(std::array::from_fn(|r| std::array::from_fn(|c| matrix[(r, c)])))
            }
        }

        impl Index<(usize, usize)> for $name {
            type Output = f32;

            fn index(&self, (row, col): (usize, usize)) -> &f32 {
                &self.rows[row][col]
            }
        }

        impl Mul for $name {
            type Output = Self;

            fn mul(self, rhs: Self) -> Self {
                let mut out = self;
                out.mult(&rhs);
                out
            }
        }

        impl Mul<f32> for $name {
            type Output = Self;

            fn mul(self, rhs: f32) -> Self {
                let mut out = self;
                out.mult_scalar(rhs);
                out
            }
        }

        impl Mul<$vector> for $name {
            type Output = $vector;

            fn mul(self, rhs: $vector) -> $vector {
                let v = rhs.to_array();
                $vector::from_array(std::array::from_fn(|r| {
                    (0..$n).map(|c| self.rows[r][c] * v[c]).sum()
                }))
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                let mut out = self;
                out.sum(&rhs);
                out
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for row in &self.rows {
                    let line: Vec<String> = row.iter().map(|entry| format!("{entry:>10.5}")).collect();
                    writeln!(f, "[{}]", line.join(", "))?;
                }
                Ok(())
            }
        }

        impl AbsDiffEq for $name {
            type Epsilon = f32;

            fn default_epsilon() -> f32 {
                f32::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
                self.rows
                    .iter()
                    .flatten()
                    .zip(other.rows.iter().flatten())
                    .all(|(a, b)| a.abs_diff_eq(b, epsilon))
            }
        }

        impl RelativeEq for $name {
            fn default_max_relative() -> f32 {
                f32::default_max_relative()
            }

            fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
                self.rows
                    .iter()
                    .flatten()
                    .zip(other.rows.iter().flatten())
                    .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
            }
        }
    };
}

/// 2x2 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 2]; 2]", into = "[[f32; 2]; 2]")]
pub struct Matrix2 {
    rows: [[f32; 2]; 2],
}

/// 3x3 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 3]; 3]", into = "[[f32; 3]; 3]")]
pub struct Matrix3 {
    rows: [[f32; 3]; 3],
}

/// 4x4 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 4]; 4]", into = "[[f32; 4]; 4]")]
pub struct Matrix4 {
    rows: [[f32; 4]; 4],
}

impl_matrix!(Matrix2, Vector2, 2);
impl_matrix!(Matrix3, Vector3, 3);
impl_matrix!(Matrix4, Vector4, 4);

impl Matrix2 {
    /// Create a matrix from entries given row by row
    pub fn new(m11: f32, m12: f32, m21: f32, m22: f32) -> Self {
        Self::from_rows([[m11, m12], [m21, m22]])
    }

    /// Determinant
    pub fn determinant(&self) -> f32 {
        clean(self.raw_determinant())
    }

    fn raw_determinant(&self) -> f32 {
        let [[a, b], [c, d]] = self.rows;
        a * d - b * c
    }

    /// Inverse, or `None` when the determinant is exactly zero
    pub fn try_inverse(&self) -> Option<Self> {
        let det = self.raw_determinant();
        if det == 0.0 {
            return None;
        }

        let [[a, b], [c, d]] = self.rows;
        Some(Self::from_rows([[d / det, -b / det], [-c / det, a / det]]))
    }
}

impl Matrix3 {
    /// Create a matrix from entries given row by row
    #[rustfmt::skip]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        m11: f32, m12: f32, m13: f32,
        m21: f32, m22: f32, m23: f32,
        m31: f32, m32: f32, m33: f32,
    ) -> Self {
        Self::from_rows([[m11, m12, m13], [m21, m22, m23], [m31, m32, m33]])
    }

    /// Determinant by cofactor expansion along the first row
    pub fn determinant(&self) -> f32 {
        clean(self.raw_determinant())
    }

    fn raw_determinant(&self) -> f32 {
        let [[a, b, c], [d, e, f], [g, h, i]] = self.rows;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Inverse, or `None` when the determinant is exactly zero
    ///
    /// The unrounded determinant is used so small-scale matrices still invert.
    pub fn try_inverse(&self) -> Option<Self> {
        let det = self.raw_determinant();
        if det == 0.0 {
            return None;
        }

        let [[a, b, c], [d, e, f], [g, h, i]] = self.rows;
        let inv = 1.0 / det;
        Some(Self::from_rows([
            [(e * i - f * h) * inv, -(b * i - c * h) * inv, (b * f - c * e) * inv],
            [-(d * i - f * g) * inv, (a * i - c * g) * inv, -(a * f - c * d) * inv],
            [(d * h - e * g) * inv, -(a * h - b * g) * inv, (a * e - b * d) * inv],
        ]))
    }
}

impl From<Matrix2> for Matrix3 {
    /// Embed into the upper-left corner of an identity matrix
    fn from(matrix: Matrix2) -> Self {
        let [[a, b], [c, d]] = matrix.rows;
        Self { rows: [[a, b, 0.0], [c, d, 0.0], [0.0, 0.0, 1.0]] }
    }
}

impl From<Matrix4> for Matrix3 {
    /// Upper-left 3x3 block
    fn from(matrix: Matrix4) -> Self {
        Self { rows: std::array::from_fn(|r| std::array::from_fn(|c| matrix.rows[r][c])) }
    }
}

impl From<Matrix3> for Matrix4 {
    /// Embed into the upper-left corner of an identity matrix
    fn from(matrix: Matrix3) -> Self {
        let mut rows = Self::IDENTITY.rows;
        for (r, row) in matrix.rows.iter().enumerate() {
            rows[r][..3].copy_from_slice(row);
        }
        Self { rows }
    }
}

impl Matrix4 {
    /// Create a matrix from entries given row by row
    #[rustfmt::skip]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        m11: f32, m12: f32, m13: f32, m14: f32,
        m21: f32, m22: f32, m23: f32, m24: f32,
        m31: f32, m32: f32, m33: f32, m34: f32,
        m41: f32, m42: f32, m43: f32, m44: f32,
    ) -> Self {
        Self::from_rows([
            [m11, m12, m13, m14],
            [m21, m22, m23, m24],
            [m31, m32, m33, m34],
            [m41, m42, m43, m44],
        ])
    }

    /// Pure translation matrix
    #[rustfmt::skip]
    pub fn from_translation(translation: Vector3) -> Self {
        Self::new(
            1.0, 0.0, 0.0, translation.x(),
            0.0, 1.0, 0.0, translation.y(),
            0.0, 0.0, 1.0, translation.z(),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Translation column as a vector (including the homogeneous entry)
    pub fn translation(&self) -> Vector4 {
        self.column(3)
    }

    /// Transform a point (`w = 1`), dropping the homogeneous component
    pub fn transform_point(&self, point: Vector3) -> Vector3 {
        (*self * point.extend(1.0)).truncate()
    }

    /// Determinant from the 2x2 sub-determinants of the top and bottom row pairs
    pub fn determinant(&self) -> f32 {
        clean(self.raw_determinant())
    }

    fn raw_determinant(&self) -> f32 {
        let (s, c) = self.sub_determinants();
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    /// Inverse, or `None` when the determinant is exactly zero
    pub fn try_inverse(&self) -> Option<Self> {
        let det = self.raw_determinant();
        if det == 0.0 {
            return None;
        }

        let [
            [a00, a01, a02, a03],
            [a10, a11, a12, a13],
            [a20, a21, a22, a23],
            [a30, a31, a32, a33],
        ] = self.rows;
        let (s, c) = self.sub_determinants();
        let inv = 1.0 / det;

        Some(Self::from_rows([
            [
                (a11 * c[5] - a12 * c[4] + a13 * c[3]) * inv,
                (-a01 * c[5] + a02 * c[4] - a03 * c[3]) * inv,
                (a31 * s[5] - a32 * s[4] + a33 * s[3]) * inv,
                (-a21 * s[5] + a22 * s[4] - a23 * s[3]) * inv,
            ],
            [
                (-a10 * c[5] + a12 * c[2] - a13 * c[1]) * inv,
                (a00 * c[5] - a02 * c[2] + a03 * c[1]) * inv,
                (-a30 * s[5] + a32 * s[2] - a33 * s[1]) * inv,
                (a20 * s[5] - a22 * s[2] + a23 * s[1]) * inv,
            ],
            [
                (a10 * c[4] - a11 * c[2] + a13 * c[0]) * inv,
                (-a00 * c[4] + a01 * c[2] - a03 * c[0]) * inv,
                (a30 * s[4] - a31 * s[2] + a33 * s[0]) * inv,
                (-a20 * s[4] + a21 * s[2] - a23 * s[0]) * inv,
            ],
            [
                (-a10 * c[3] + a11 * c[1] - a12 * c[0]) * inv,
                (a00 * c[3] - a01 * c[1] + a02 * c[0]) * inv,
                (-a30 * s[3] + a31 * s[1] - a32 * s[0]) * inv,
                (a20 * s[3] - a21 * s[1] + a22 * s[0]) * inv,
            ],
        ]))
    }

    /// 2x2 sub-determinants of rows 0/1 (`s`) and rows 2/3 (`c`)
    fn sub_determinants(&self) -> ([f32; 6], [f32; 6]) {
        let [
            [a00, a01, a02, a03],
            [a10, a11, a12, a13],
            [a20, a21, a22, a23],
            [a30, a31, a32, a33],
        ] = self.rows;

        let s = [
            a00 * a11 - a10 * a01,
            a00 * a12 - a10 * a02,
            a00 * a13 - a10 * a03,
            a01 * a12 - a11 * a02,
            a01 * a13 - a11 * a03,
            a02 * a13 - a12 * a03,
        ];
        let c = [
            a20 * a31 - a30 * a21,
            a20 * a32 - a30 * a22,
            a20 * a33 - a30 * a23,
            a21 * a32 - a31 * a22,
            a21 * a33 - a31 * a23,
            a22 * a33 - a32 * a23,
        ];
        (s, c)
    }
}
