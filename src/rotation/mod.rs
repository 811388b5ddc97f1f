//! Rotation engine.
//!
//! A fitted texture maps its footprint onto the unit square, so the footprint
//! center always lands on (0.5, 0.5) in texture space. Rotating about that
//! point after the fit is the same as rotating about the footprint's own UV
//! center, which is why the whole transform is one matrix:
//!
//! `Rotate(0.5, 0.5, angle) * Translate(offset) * Scale(repeat)`
//!
//! Angles are absolute. Applying 90 degrees twice yields 90 degrees, not 180.

use crate::scene::Texture;
use glam::{Mat3, Vec2, Vec3};

const PIVOT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RotationError {
    #[error("rotation angle must be finite, got {0}")]
    NonFinite(f32),
}

pub fn validate_degrees(degrees: f32) -> Result<f32, RotationError> {
    if degrees.is_finite() {
        Ok(degrees)
    } else {
        Err(RotationError::NonFinite(degrees))
    }
}

/// Angle folded into `[0, 360)`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    let folded = degrees.rem_euclid(360.0);
    if folded >= 360.0 {
        0.0
    } else {
        folded
    }
}

/// `round(degrees / 90) mod 4`.
pub fn quarter_turn_index(degrees: f32) -> u8 {
    ((degrees / 90.0).round() as i64).rem_euclid(4) as u8
}

/// Sine and cosine with exact values on quarter turns, so repeated
/// composition never leaves a residual offset.
fn exact_sin_cos(degrees: f32) -> (f32, f32) {
    let folded = normalize_degrees(degrees);
    let quarters = folded / 90.0;
    if quarters.fract() == 0.0 {
        return match quarters as u8 {
            0 => (0.0, 1.0),
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        };
    }
    folded.to_radians().sin_cos()
}

pub fn rotation_about_pivot(degrees: f32) -> Mat3 {
    let (s, c) = exact_sin_cos(degrees);
    let tx = -PIVOT * c + PIVOT * s + PIVOT;
    let ty = -PIVOT * s - PIVOT * c + PIVOT;
    Mat3::from_cols(
        Vec3::new(c, s, 0.0),
        Vec3::new(-s, c, 0.0),
        Vec3::new(tx, ty, 1.0),
    )
}

pub fn compose_texture_matrix(offset: Vec2, repeat: Vec2, degrees: f32) -> Mat3 {
    rotation_about_pivot(degrees) * Mat3::from_translation(offset) * Mat3::from_scale(repeat)
}

/// Writes the composed matrix into a fitted texture and switches off
/// automatic recomputation. Returns `false` (and changes nothing) when the
/// texture carries no fit metadata.
pub fn apply_rotation(texture: &mut Texture, degrees: f32) -> Result<bool, RotationError> {
    let degrees = validate_degrees(degrees)?;
    if texture.fit.is_none() {
        return Ok(false);
    }
    texture.matrix = compose_texture_matrix(texture.offset, texture.repeat, degrees);
    texture.matrix_auto_update = false;
    Ok(true)
}

/// Rotation actually encoded in a texture's UV matrix, in `[0, 360)`.
pub fn read_rotation_degrees(texture: &Texture) -> f32 {
    let x_axis = texture.uv_matrix().x_axis;
    normalize_degrees(x_axis.y.atan2(x_axis.x).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::RawTexture;
    use crate::fit::{fit_texture, FitOptions, UvRect};

    fn fitted() -> Texture {
        let mut texture = Texture::new(RawTexture::solid("logo", 2, 2, [255; 4]));
        fit_texture(
            &mut texture,
            UvRect {
                min_u: 0.55,
                min_v: 0.10,
                max_u: 0.95,
                max_v: 0.30,
            },
            FitOptions::default(),
        );
        texture
    }

    #[test]
    fn quarter_turn_matrices_are_exact() {
        let m = rotation_about_pivot(90.0);
        assert_eq!(m.x_axis, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(m.y_axis, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(m.z_axis, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(rotation_about_pivot(360.0), Mat3::IDENTITY);
        assert_eq!(rotation_about_pivot(-90.0), rotation_about_pivot(270.0));
    }

    #[test]
    fn pivot_is_a_fixed_point() {
        for degrees in [0.0, 33.0, 90.0, 180.0, 271.5] {
            let p = rotation_about_pivot(degrees).transform_point2(Vec2::splat(0.5));
            assert!((p - Vec2::splat(0.5)).length() < 1e-6, "{degrees}");
        }
    }

    #[test]
    fn four_quarter_turns_return_to_the_fit() {
        let mut texture = fitted();
        let original = compose_texture_matrix(texture.offset, texture.repeat, 0.0);
        let mut degrees = 0.0;
        for _ in 0..4 {
            degrees += 90.0;
            assert!(apply_rotation(&mut texture, degrees).unwrap());
        }
        assert!(texture.matrix.abs_diff_eq(original, 1e-6));
        let auto = Mat3::from_translation(texture.offset) * Mat3::from_scale(texture.repeat);
        assert!(texture.uv_matrix().abs_diff_eq(auto, 1e-6));
    }

    #[test]
    fn readback_quantizes_to_the_requested_quarter() {
        let mut texture = fitted();
        for q in 0..4u8 {
            apply_rotation(&mut texture, q as f32 * 90.0).unwrap();
            assert_eq!(quarter_turn_index(read_rotation_degrees(&texture)), q);
        }
    }

    #[test]
    fn arbitrary_angles_keep_the_footprint_center() {
        let mut texture = fitted();
        apply_rotation(&mut texture, 37.0).unwrap();
        let center = texture.fit.unwrap().center();
        let mapped = texture.uv_matrix().transform_point2(center);
        assert!((mapped - Vec2::splat(0.5)).length() < 1e-5);
        assert!((read_rotation_degrees(&texture) - 37.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_is_absolute_not_cumulative() {
        let mut texture = fitted();
        apply_rotation(&mut texture, 90.0).unwrap();
        let once = texture.matrix;
        apply_rotation(&mut texture, 90.0).unwrap();
        assert_eq!(texture.matrix, once);
    }

    #[test]
    fn unfitted_texture_is_a_no_op() {
        let mut texture = Texture::new(RawTexture::solid("logo", 2, 2, [255; 4]));
        assert!(!apply_rotation(&mut texture, 90.0).unwrap());
        assert!(texture.matrix_auto_update);
        assert_eq!(texture.matrix, Mat3::IDENTITY);
    }

    #[test]
    fn non_finite_angles_are_rejected_without_mutation() {
        let mut texture = fitted();
        apply_rotation(&mut texture, 90.0).unwrap();
        let before = texture.matrix;
        assert!(matches!(
            apply_rotation(&mut texture, f32::NAN),
            Err(RotationError::NonFinite(_))
        ));
        assert!(apply_rotation(&mut texture, f32::INFINITY).is_err());
        assert_eq!(texture.matrix, before);
    }

    #[test]
    fn quarter_turn_index_wraps_negative_angles() {
        assert_eq!(quarter_turn_index(-90.0), 3);
        assert_eq!(quarter_turn_index(450.0), 1);
        assert_eq!(quarter_turn_index(44.0), 0);
        assert_eq!(normalize_degrees(-0.0), 0.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
    }
}
