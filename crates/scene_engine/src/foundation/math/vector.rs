//! Fixed-size vectors
//!
//! `Vector2`, `Vector3` and `Vector4` share one implementation generated by
//! `impl_vector!`. Components are private so that every write goes through
//! [`clean`]; the component count is part of the type, so shape mismatches
//! cannot be expressed.
//!
//! Mutating operations take `&mut self` and return `&mut Self` for chaining,
//! e.g. `position.sum(delta).scale(0.5)`. Operator overloads return new values.

use std::fmt;
use std::ops::{Add, Index, Mul, Neg, Sub};

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};

use super::clean;

macro_rules! impl_vector {
    ($name:ident, $n:literal, [$($field:ident, $setter:ident : $idx:literal),+]) => {
        impl $name {
            /// Number of components
            pub const LEN: usize = $n;

            /// Vector with every component set to zero
            pub const ZERO: Self = Self { data: [0.0; $n] };

            /// Vector with every component set to one
            pub const ONE: Self = Self { data: [1.0; $n] };

            /// Create a vector from explicit components
            pub fn new($($field: f32),+) -> Self {
                Self::from_array([$($field),+])
            }

            /// Create a vector from an array of components
            pub fn from_array(data: [f32; $n]) -> Self {
                Self { data: data.map(clean) }
            }

            /// Create a vector with every component set to `value`
            pub fn splat(value: f32) -> Self {
                Self::from_array([value; $n])
            }

            /// Components as an array
            pub const fn to_array(self) -> [f32; $n] {
                self.data
            }

            /// Components as a slice
            pub fn as_slice(&self) -> &[f32] {
                &self.data
            }

            $(
                #[doc = concat!("The `", stringify!($field), "` component")]
                pub const fn $field(&self) -> f32 {
                    self.data[$idx]
                }

                #[doc = concat!("Overwrite the `", stringify!($field), "` component")]
                pub fn $setter(&mut self, value: f32) -> &mut Self {
                    self.data[$idx] = clean(value);
                    self
                }
            )+

            /// Copy every component from `other`
            pub fn set(&mut self, other: Self) -> &mut Self {
                self.data = other.data;
                self
            }

            /// Overwrite every component from an array
            pub fn set_array(&mut self, data: [f32; $n]) -> &mut Self {
                self.data = data.map(clean);
                self
            }

            /// Add `other` component-wise
            pub fn sum(&mut self, other: Self) -> &mut Self {
                for (component, value) in self.data.iter_mut().zip(other.data) {
                    *component = clean(*component + value);
                }
                self
            }

            /// Subtract `other` component-wise
            pub fn diff(&mut self, other: Self) -> &mut Self {
                for (component, value) in self.data.iter_mut().zip(other.data) {
                    *component = clean(*component - value);
                }
                self
            }

            /// Multiply by `other` component-wise
            pub fn mult(&mut self, other: Self) -> &mut Self {
                for (component, value) in self.data.iter_mut().zip(other.data) {
                    *component = clean(*component * value);
                }
                self
            }

            /// Multiply every component by `scalar`
            pub fn scale(&mut self, scalar: f32) -> &mut Self {
                for component in &mut self.data {
                    *component = clean(*component * scalar);
                }
                self
            }

            /// Flip the sign of every component
            pub fn negate(&mut self) -> &mut Self {
                self.scale(-1.0)
            }

            /// Scale to unit length
            ///
            /// A zero-length vector is left unchanged.
            pub fn normalize(&mut self) -> &mut Self {
                let length = self.length();
                if length != 0.0 {
                    self.scale(1.0 / length);
                }
                self
            }

            /// Unit-length copy of this vector (zero stays zero)
            #[must_use]
            pub fn normalized(self) -> Self {
                let mut copy = self;
                copy.normalize();
                copy
            }

            /// Dot product
            pub fn dot(self, other: Self) -> f32 {
                clean(self.data.iter().zip(other.data).map(|(a, b)| a * b).sum())
            }

            /// Squared length
            pub fn length_squared(self) -> f32 {
                clean(self.data.iter().map(|c| c * c).sum())
            }

            /// Euclidean length
            pub fn length(self) -> f32 {
                clean(self.data.iter().map(|c| c * c).sum::<f32>().sqrt())
            }

            /// Distance to another point
            pub fn distance(self, other: Self) -> f32 {
                (other - self).length()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl From<[f32; $n]> for $name {
            fn from(data: [f32; $n]) -> Self {
                Self::from_array(data)
            }
        }

        impl From<$name> for [f32; $n] {
            fn from(vector: $name) -> Self {
                vector.data
            }
        }

        impl From<$name> for nalgebra::SVector<f32, $n> {
            fn from(vector: $name) -> Self {
                Self::from(vector.data)
            }
        }

        impl From<nalgebra::SVector<f32, $n>> for $name {
            fn from(vector: nalgebra::SVector<f32, $n>) -> Self {
                Self::from_array(std::array::from_fn(|i| vector[i]))
            }
        }

        impl Index<usize> for $name {
            type Output = f32;

            fn index(&self, index: usize) -> &f32 {
                &self.data[index]
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                let mut out = self;
                out.sum(rhs);
                out
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                let mut out = self;
                out.diff(rhs);
                out
            }
        }

        impl Mul<f32> for $name {
            type Output = Self;

            fn mul(self, rhs: f32) -> Self {
                let mut out = self;
                out.scale(rhs);
                out
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                self * -1.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "(")?;
                for (i, component) in self.data.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{component}")?;
                }
                write!(f, ")")
            }
        }

        impl AbsDiffEq for $name {
            type Epsilon = f32;

            fn default_epsilon() -> f32 {
                f32::default_epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
                self.data
                    .iter()
                    .zip(other.data.iter())
                    .all(|(a, b)| a.abs_diff_eq(b, epsilon))
            }
        }

        impl RelativeEq for $name {
            fn default_max_relative() -> f32 {
                f32::default_max_relative()
            }

            fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
                self.data
                    .iter()
                    .zip(other.data.iter())
                    .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
            }
        }
    };
}

/// Two component vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Vector2 {
    data: [f32; 2],
}

/// Three component vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vector3 {
    data: [f32; 3],
}

/// Four component vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Vector4 {
    data: [f32; 4],
}

impl_vector!(Vector2, 2, [x, set_x: 0, y, set_y: 1]);
impl_vector!(Vector3, 3, [x, set_x: 0, y, set_y: 1, z, set_z: 2]);
impl_vector!(Vector4, 4, [x, set_x: 0, y, set_y: 1, z, set_z: 2, w, set_w: 3]);

impl Vector3 {
    /// Unit X axis
    pub const UNIT_X: Self = Self { data: [1.0, 0.0, 0.0] };

    /// Unit Y axis
    pub const UNIT_Y: Self = Self { data: [0.0, 1.0, 0.0] };

    /// Unit Z axis
    pub const UNIT_Z: Self = Self { data: [0.0, 0.0, 1.0] };

    /// Cross product `self × other`
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        let [ax, ay, az] = self.data;
        let [bx, by, bz] = other.data;
        Self::new(ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx)
    }

    /// Extend with a fourth component
    pub fn extend(self, w: f32) -> Vector4 {
        let [x, y, z] = self.data;
        Vector4::new(x, y, z, w)
    }
}

impl Vector4 {
    /// Drop the fourth component
    pub fn truncate(self) -> Vector3 {
        let [x, y, z, _] = self.data;
        Vector3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_components_are_cleaned_on_write() {
        let mut v = Vector3::new(0.123_456_7, 1.0, -4.0e-9);
        assert_eq!(v.x(), 0.123_46);
        assert_eq!(v.z(), 0.0);

        v.set_y(2.000_001);
        assert_eq!(v.y(), 2.0);
    }

    #[test]
    fn test_chained_in_place_operations() {
        let mut v = Vector3::new(1.0, 2.0, 3.0);
        v.sum(Vector3::ONE).scale(2.0).diff(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(v, Vector3::new(3.0, 5.0, 7.0));
    }

    #[test]
    fn test_unit_of_zero_vector_is_unchanged() {
        let mut v = Vector3::ZERO;
        v.normalize();
        assert_eq!(v, Vector3::ZERO);
    }

    #[test]
    fn test_unit_length() {
        let v = Vector3::new(3.0, 0.0, 4.0).normalized();
        assert_eq!(v, Vector3::new(0.6, 0.0, 0.8));
        assert_relative_eq!(v.length(), 1.0);
    }

    #[test]
    fn test_cross_product_follows_right_hand_rule() {
        assert_eq!(Vector3::UNIT_X.cross(Vector3::UNIT_Y), Vector3::UNIT_Z);
        assert_eq!(Vector3::UNIT_Y.cross(Vector3::UNIT_X), -Vector3::UNIT_Z);
    }

    #[test]
    fn test_dot_and_distance() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(4.0, 6.0);
        assert_eq!(a.dot(b), 16.0);
        assert_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn test_serde_round_trip_normalises_precision() {
        let v: Vector4 = ron::from_str("(1.0, 2.0000001, 3.0, 4.0)").unwrap();
        assert_eq!(v, Vector4::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(v.truncate().extend(9.0).w(), 9.0);
    }

    #[test]
    fn test_nalgebra_conversion() {
        let v = Vector3::new(1.0, -2.0, 0.5);
        let na: nalgebra::Vector3<f32> = v.into();
        assert_eq!(na, nalgebra::Vector3::new(1.0, -2.0, 0.5));
        assert_eq!(Vector3::from(na), v);
    }
}
