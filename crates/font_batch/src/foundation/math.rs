//! Math utilities and types
//!
//! Vector aliases used by the text renderer's public API.

pub use nalgebra::{Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (RGBA colors use this)
pub type Vec4 = Vector4<f32>;

/// Smallest power of two that is greater than or equal to `value`
///
/// Zero maps to one. Returns `None` when the result does not fit in a `u32`.
pub fn next_power_of_two(value: u32) -> Option<u32> {
    value.max(1).checked_next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_power_of_two_exact_powers() {
        assert_eq!(next_power_of_two(1), Some(1));
        assert_eq!(next_power_of_two(16), Some(16));
        assert_eq!(next_power_of_two(1024), Some(1024));
    }

    #[test]
    fn test_next_power_of_two_rounds_up() {
        assert_eq!(next_power_of_two(3), Some(4));
        assert_eq!(next_power_of_two(17), Some(32));
        assert_eq!(next_power_of_two(100), Some(128));
    }

    #[test]
    fn test_next_power_of_two_edges() {
        assert_eq!(next_power_of_two(0), Some(1));
        assert_eq!(next_power_of_two(u32::MAX), None);
    }
}
