//! Bounding box overlays and resize handle math.

use annoscene_core::{Point, Rect};

use crate::backend::{Color, DrawStyle, DrawingBackend};
use crate::constants::{HANDLE_SIZE, HOVER_FILL_ALPHA, SELECTED_STROKE_WIDTH, STROKE_WIDTH};
use crate::coordinates::CoordinateSystem;
use crate::error::RenderError;

use super::{OverlayId, RenderStyle};

/// Relative bounds plus the pixel bounds derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialGeometry {
    pub relative: Rect,
    pub absolute: Rect,
}

/// A rectangle annotation.
///
/// `relative` is authoritative. `absolute` is derived from it, except while
/// an interaction edits `absolute` directly; `needs_coordinate_update` then
/// marks that `relative` is stale until the next frame resolves it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBoxOverlay {
    relative: Rect,
    absolute: Rect,
    needs_coordinate_update: bool,
}

impl BoundingBoxOverlay {
    pub fn new(relative: Rect) -> Self {
        Self {
            relative,
            absolute: relative,
            needs_coordinate_update: false,
        }
    }

    pub fn relative_bounds(&self) -> Rect {
        self.relative
    }

    pub fn absolute_bounds(&self) -> Rect {
        self.absolute
    }

    pub fn geometry(&self) -> SpatialGeometry {
        SpatialGeometry {
            relative: self.relative,
            absolute: self.absolute,
        }
    }

    /// Restore both halves of a saved geometry.
    pub fn set_geometry(&mut self, geometry: SpatialGeometry) {
        self.relative = geometry.relative;
        self.absolute = geometry.absolute;
        self.needs_coordinate_update = false;
    }

    pub fn set_relative_bounds(&mut self, relative: Rect, coordinates: &CoordinateSystem) {
        self.relative = relative;
        self.update_absolute(coordinates);
    }

    /// Move the pixel bounds; relative bounds follow on the next frame.
    pub fn set_absolute_bounds(&mut self, absolute: Rect) {
        self.absolute = absolute;
        self.needs_coordinate_update = true;
    }

    pub fn update_absolute(&mut self, coordinates: &CoordinateSystem) {
        self.absolute = coordinates.relative_to_absolute(&self.relative);
        self.needs_coordinate_update = false;
    }

    /// Recompute relative bounds from the current pixel bounds.
    pub fn resolve_relative(&mut self, coordinates: &CoordinateSystem) -> Rect {
        self.relative = coordinates.absolute_to_relative(&self.absolute);
        self.needs_coordinate_update = false;
        self.relative
    }

    pub fn needs_coordinate_update(&self) -> bool {
        self.needs_coordinate_update
    }

    pub fn mark_for_coordinate_update(&mut self) {
        self.needs_coordinate_update = true;
    }

    pub fn mark_coordinate_update_complete(&mut self) {
        self.needs_coordinate_update = false;
    }

    #[expect(clippy::too_many_arguments)]
    pub(super) fn render(
        &self,
        id: &OverlayId,
        text: &str,
        color: Color,
        selected: bool,
        editable: bool,
        backend: &mut dyn DrawingBackend,
        style: &RenderStyle,
    ) -> Result<(), RenderError> {
        backend.clear(id);

        // Strokes and handles keep a constant on-screen size.
        let scale = if style.scale > 0.0 { style.scale } else { 1.0 };
        let width = if selected { SELECTED_STROKE_WIDTH } else { STROKE_WIDTH };
        let mut rect_style = DrawStyle::stroke(color, width / scale).with_alpha(style.alpha);
        if style.hovered || selected {
            rect_style = rect_style.with_fill([color[0], color[1], color[2], HOVER_FILL_ALPHA]);
        }
        backend.draw_rect(id, self.absolute, &rect_style)?;

        if !text.is_empty() {
            let text_style = DrawStyle::fill(color)
                .with_alpha(style.alpha)
                .with_font_size(style.font_size / scale);
            let anchor = Point::new(self.absolute.x, self.absolute.y - style.font_size / scale);
            backend.draw_text(id, anchor, text, &text_style)?;
        }

        if selected && editable {
            let handle_size = HANDLE_SIZE / scale;
            let handle_style = DrawStyle::fill([1.0, 1.0, 1.0, 1.0])
                .with_alpha(style.alpha)
                .with_dashes(false);
            for handle in ResizeHandle::corners() {
                let center = handle.anchor(&self.absolute);
                let handle_rect = Rect::new(
                    center.x - handle_size / 2.0,
                    center.y - handle_size / 2.0,
                    handle_size,
                    handle_size,
                );
                backend.draw_rect(id, handle_rect, &handle_style)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Resize handles
// ============================================================================

/// Edge or corner of a box being dragged during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeHandle {
    pub fn corners() -> [ResizeHandle; 4] {
        [
            ResizeHandle::NorthWest,
            ResizeHandle::NorthEast,
            ResizeHandle::SouthEast,
            ResizeHandle::SouthWest,
        ]
    }

    /// The handle nearest to `point`, if it lies within `tolerance` of an
    /// edge of `bounds`. Corners win over edges.
    pub fn at_point(bounds: &Rect, point: Point, tolerance: f32) -> Option<ResizeHandle> {
        if !bounds.expand(tolerance).contains(point) {
            return None;
        }
        let west = (point.x - bounds.left()).abs() <= tolerance;
        let east = !west && (point.x - bounds.right()).abs() <= tolerance;
        let north = (point.y - bounds.top()).abs() <= tolerance;
        let south = !north && (point.y - bounds.bottom()).abs() <= tolerance;

        match (north, south, east, west) {
            (true, _, _, true) => Some(ResizeHandle::NorthWest),
            (true, _, true, _) => Some(ResizeHandle::NorthEast),
            (_, true, _, true) => Some(ResizeHandle::SouthWest),
            (_, true, true, _) => Some(ResizeHandle::SouthEast),
            (true, _, _, _) => Some(ResizeHandle::North),
            (_, true, _, _) => Some(ResizeHandle::South),
            (_, _, true, _) => Some(ResizeHandle::East),
            (_, _, _, true) => Some(ResizeHandle::West),
            _ => None,
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            ResizeHandle::NorthEast
                | ResizeHandle::NorthWest
                | ResizeHandle::SouthEast
                | ResizeHandle::SouthWest
        )
    }

    fn moves_left(&self) -> bool {
        matches!(self, ResizeHandle::West | ResizeHandle::NorthWest | ResizeHandle::SouthWest)
    }

    fn moves_right(&self) -> bool {
        matches!(self, ResizeHandle::East | ResizeHandle::NorthEast | ResizeHandle::SouthEast)
    }

    fn moves_top(&self) -> bool {
        matches!(self, ResizeHandle::North | ResizeHandle::NorthEast | ResizeHandle::NorthWest)
    }

    fn moves_bottom(&self) -> bool {
        matches!(self, ResizeHandle::South | ResizeHandle::SouthEast | ResizeHandle::SouthWest)
    }

    /// Where this handle sits on `bounds`.
    pub fn anchor(&self, bounds: &Rect) -> Point {
        let x = if self.moves_left() {
            bounds.left()
        } else if self.moves_right() {
            bounds.right()
        } else {
            bounds.center().x
        };
        let y = if self.moves_top() {
            bounds.top()
        } else if self.moves_bottom() {
            bounds.bottom()
        } else {
            bounds.center().y
        };
        Point::new(x, y)
    }

    /// Apply a pointer delta to `original`.
    ///
    /// With `aspect_locked`, corner drags keep the original width/height
    /// ratio and pin the opposite corner. Returns `None` when a side would be
    /// smaller than `min_size`.
    pub fn apply(
        &self,
        original: &Rect,
        dx: f32,
        dy: f32,
        aspect_locked: bool,
        min_size: f32,
    ) -> Option<Rect> {
        let mut left = original.left();
        let mut top = original.top();
        let mut right = original.right();
        let mut bottom = original.bottom();

        if self.moves_left() {
            left += dx;
        }
        if self.moves_right() {
            right += dx;
        }
        if self.moves_top() {
            top += dy;
        }
        if self.moves_bottom() {
            bottom += dy;
        }

        if aspect_locked && self.is_corner() && original.width > 0.0 && original.height > 0.0 {
            let ratio = original.width / original.height;
            let width_factor = (right - left) / original.width;
            let height_factor = (bottom - top) / original.height;
            let (width, height) = if width_factor.abs() >= height_factor.abs() {
                (right - left, (right - left) / ratio)
            } else {
                ((bottom - top) * ratio, bottom - top)
            };
            if self.moves_left() {
                left = right - width;
            } else {
                right = left + width;
            }
            if self.moves_top() {
                top = bottom - height;
            } else {
                bottom = top + height;
            }
        }

        if right - left < min_size || bottom - top < min_size {
            return None;
        }
        Some(Rect::from_edges(left, top, right, bottom))
    }
}
