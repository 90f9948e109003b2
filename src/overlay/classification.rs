//! Classification label overlays.
//!
//! Classifications have no geometry of their own. The scene stacks them at
//! the media's top-left corner and their bounds are whatever the text took
//! up when it was last drawn.

use annoscene_core::{Point, Rect, Size};

use crate::backend::{Color, DrawStyle, DrawingBackend};
use crate::constants::{HOVER_FILL_ALPHA, SELECTED_STROKE_WIDTH};
use crate::error::RenderError;

use super::{OverlayId, RenderStyle};

/// Approximate glyph advance relative to the font size.
const CHAR_WIDTH_FACTOR: f32 = 0.6;
const LINE_HEIGHT_FACTOR: f32 = 1.25;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassificationOverlay {
    position: Point,
    /// Extent of the last painted text
    text_bounds: Option<Rect>,
}

impl ClassificationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Move the label. Returns true if it actually moved.
    pub fn set_position(&mut self, position: Point) -> bool {
        if self.position == position {
            return false;
        }
        self.position = position;
        true
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.text_bounds
    }

    /// Size the text will occupy before it has been painted.
    pub fn estimate_size(text: &str, font_size: f32) -> Size {
        Size::new(
            text.chars().count() as f32 * font_size * CHAR_WIDTH_FACTOR,
            font_size * LINE_HEIGHT_FACTOR,
        )
    }

    /// Height used when stacking labels.
    pub fn line_height(&self, font_size: f32) -> f32 {
        self.text_bounds
            .map(|bounds| bounds.height)
            .unwrap_or(font_size * LINE_HEIGHT_FACTOR)
    }

    pub(super) fn render(
        &mut self,
        id: &OverlayId,
        text: &str,
        color: Color,
        selected: bool,
        backend: &mut dyn DrawingBackend,
        style: &RenderStyle,
    ) -> Result<(), RenderError> {
        backend.clear(id);

        let estimate = Self::estimate_size(text, style.font_size);
        let background = Rect::new(self.position.x, self.position.y, estimate.width, estimate.height);
        let mut background_style = DrawStyle::fill([color[0], color[1], color[2], HOVER_FILL_ALPHA])
            .with_alpha(style.alpha);
        if selected || style.hovered {
            background_style.stroke = Some(color);
            background_style.stroke_width = SELECTED_STROKE_WIDTH;
        }
        backend.draw_rect(id, background, &background_style)?;

        let text_style = DrawStyle::fill(color)
            .with_alpha(style.alpha)
            .with_font_size(style.font_size);
        backend.draw_text(id, self.position, text, &text_style)?;

        self.text_bounds = Some(backend.get_bounds(id).unwrap_or(background));
        Ok(())
    }
}
