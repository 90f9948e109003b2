//! Relative/absolute coordinate mapping.
//!
//! Spatial overlays store their geometry in relative media space, where
//! `[0, 1] x [0, 1]` covers the canonical media. The [`CoordinateSystem`]
//! maps that space onto the pixel rectangle the media is currently rendered
//! into.

use annoscene_core::Rect;

/// Affine transform `absolute = relative * scale + offset`, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Transform {
    /// Create an identity transform (scale=1, no offset).
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Whether the transform can be inverted.
    pub fn is_invertible(&self) -> bool {
        self.scale_x != 0.0
            && self.scale_y != 0.0
            && self.scale_x.is_finite()
            && self.scale_y.is_finite()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform between relative media space and absolute pixel space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateSystem {
    transform: Transform,
}

impl CoordinateSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Map a relative rectangle to pixels.
    pub fn relative_to_absolute(&self, rect: &Rect) -> Rect {
        let t = &self.transform;
        Rect::new(
            rect.x * t.scale_x + t.offset_x,
            rect.y * t.scale_y + t.offset_y,
            rect.width * t.scale_x,
            rect.height * t.scale_y,
        )
    }

    /// Map a pixel rectangle to relative space.
    ///
    /// With a zero scale there is no inverse; a zero rectangle is returned.
    pub fn absolute_to_relative(&self, rect: &Rect) -> Rect {
        let t = &self.transform;
        if !t.is_invertible() {
            return Rect::zero();
        }
        Rect::new(
            (rect.x - t.offset_x) / t.scale_x,
            (rect.y - t.offset_y) / t.scale_y,
            rect.width / t.scale_x,
            rect.height / t.scale_y,
        )
    }

    /// Make relative `[0, 1]` space cover `media_bounds` exactly.
    pub fn update_transform(&mut self, media_bounds: &Rect) {
        self.transform = Transform {
            scale_x: media_bounds.width,
            scale_y: media_bounds.height,
            offset_x: media_bounds.x,
            offset_y: media_bounds.y,
        };
        log::trace!("Coordinate transform updated: {:?}", self.transform);
    }

    /// Restore the identity transform.
    pub fn reset(&mut self) {
        self.transform = Transform::identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn test_identity_by_default() {
        let coords = CoordinateSystem::new();
        let rect = Rect::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(coords.relative_to_absolute(&rect), rect);
        assert_eq!(coords.absolute_to_relative(&rect), rect);
    }

    #[test]
    fn test_media_bounds_mapping() {
        let mut coords = CoordinateSystem::new();
        coords.update_transform(&Rect::new(0.0, 0.0, 200.0, 100.0));

        let absolute = coords.relative_to_absolute(&Rect::new(0.1, 0.1, 0.2, 0.2));
        assert!(absolute.approx_eq(&Rect::new(20.0, 10.0, 40.0, 20.0), EPSILON));

        let full = coords.relative_to_absolute(&Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(full, Rect::new(0.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn test_round_trip_with_offset() {
        let mut coords = CoordinateSystem::new();
        coords.update_transform(&Rect::new(37.5, 12.25, 640.0, 480.0));

        let samples = [
            Rect::new(0.0, 0.0, 1.0, 1.0),
            Rect::new(0.25, 0.5, 0.125, 0.3),
            Rect::new(-0.1, 1.2, 0.01, 0.0),
        ];
        for rect in samples {
            let back = coords.absolute_to_relative(&coords.relative_to_absolute(&rect));
            assert!(back.approx_eq(&rect, EPSILON), "{:?} != {:?}", back, rect);
        }
    }

    #[test]
    fn test_zero_scale_is_degenerate() {
        let mut coords = CoordinateSystem::new();
        coords.update_transform(&Rect::new(10.0, 10.0, 0.0, 100.0));
        assert_eq!(
            coords.absolute_to_relative(&Rect::new(10.0, 10.0, 5.0, 5.0)),
            Rect::zero()
        );
    }

    #[test]
    fn test_reset() {
        let mut coords = CoordinateSystem::new();
        coords.update_transform(&Rect::new(5.0, 5.0, 50.0, 50.0));
        coords.reset();
        assert_eq!(coords.transform(), Transform::identity());
    }
}
