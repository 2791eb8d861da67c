//! Math utilities and types
//!
//! Thin aliases over nalgebra plus the few conversions batch storage needs
//! to turn math types into plain GPU-facing arrays.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Squared distance between two points
#[inline]
pub fn distance_squared(a: &Vec3, b: &Vec3) -> f32 {
    (a - b).magnitude_squared()
}

/// Convert a vector into a plain `[x, y, z]` array
#[inline]
pub fn vec3_to_array(v: &Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Convert a matrix into column-major `[[f32; 4]; 4]` storage
#[inline]
pub fn mat4_to_cols(m: &Mat4) -> [[f32; 4]; 4] {
    (*m).into()
}

/// Rebuild a matrix from column-major storage
#[inline]
pub fn mat4_from_cols(cols: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from(*cols)
}
