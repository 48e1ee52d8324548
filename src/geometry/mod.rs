//! Geometry utilities: segment frames, rotations, ellipse projection.

pub mod ellipse;
pub mod rotation;

pub use ellipse::closest_point_on_ellipse;
pub use rotation::{
    bone_rotation, is_finite_rotation, is_finite_vector, lerp, look_rotation_right, mean,
    midpoint, nan_rotation, nan_vector, rotation_between, rotation_distance, scale_rotation,
    slerp_or_nlerp, twist_angle, upright_rotation,
};
