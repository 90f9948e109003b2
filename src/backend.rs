//! Drawing backend contract.
//!
//! The engine never rasterizes anything itself. Overlays issue primitive draw
//! calls against a [`DrawingBackend`], keyed by overlay id so a retained-mode
//! backend can replace, show, hide or dispose everything an overlay drew.

use std::cell::RefCell;
use std::rc::Rc;

use annoscene_core::{Point, Rect, Size};

use crate::error::RenderError;
use crate::overlay::OverlayId;
use crate::resources::ImageResource;

/// RGBA color, components in `0.0..=1.0`.
pub type Color = [f32; 4];

/// Callback invoked by the backend once per animation frame.
pub type TickHandler = Box<dyn FnMut()>;

/// Backend shared between a scene and its host (or several scenes).
pub type SharedBackend = Rc<RefCell<dyn DrawingBackend>>;

/// Style for a single draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub stroke_width: f32,
    pub dashed: bool,
    pub font_size: f32,
    /// Global opacity multiplier
    pub alpha: f32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            stroke: None,
            fill: None,
            stroke_width: 1.0,
            dashed: false,
            font_size: crate::constants::DEFAULT_LABEL_FONT_SIZE,
            alpha: 1.0,
        }
    }
}

impl DrawStyle {
    pub fn stroke(color: Color, width: f32) -> Self {
        Self {
            stroke: Some(color),
            stroke_width: width,
            ..Self::default()
        }
    }

    pub fn fill(color: Color) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_dashes(mut self, dashed: bool) -> Self {
        self.dashed = dashed;
        self
    }
}

/// Primitive drawing operations consumed by overlays and the scene.
///
/// Draw calls for an id accumulate until [`DrawingBackend::clear`] or
/// [`DrawingBackend::dispose`] is called for it; overlays clear their own
/// primitives before repainting.
pub trait DrawingBackend {
    fn draw_rect(&mut self, id: &OverlayId, bounds: Rect, style: &DrawStyle)
    -> Result<(), RenderError>;

    fn draw_text(
        &mut self,
        id: &OverlayId,
        position: Point,
        text: &str,
        style: &DrawStyle,
    ) -> Result<(), RenderError>;

    fn draw_line(
        &mut self,
        id: &OverlayId,
        from: Point,
        to: Point,
        style: &DrawStyle,
    ) -> Result<(), RenderError>;

    fn draw_image(
        &mut self,
        id: &OverlayId,
        bounds: Rect,
        image: &ImageResource,
        style: &DrawStyle,
    ) -> Result<(), RenderError>;

    /// Drop every primitive drawn for `id` but keep it registered.
    fn clear(&mut self, id: &OverlayId);

    /// Release everything held for `id`.
    fn dispose(&mut self, id: &OverlayId);

    fn show(&mut self, id: &OverlayId);

    fn hide(&mut self, id: &OverlayId);

    /// Hit test against what was actually painted, optionally for a single id.
    fn hit_test(&self, point: Point, id: Option<&OverlayId>) -> bool;

    /// Painted extent of an id, if anything was drawn for it.
    fn get_bounds(&self, id: &OverlayId) -> Option<Rect>;

    /// Convert a screen-space point to the pixel space overlays live in.
    fn screen_to_world(&self, point: Point) -> Point;

    /// Current zoom factor of the world relative to the screen.
    fn get_scale(&self) -> f32;

    fn get_container_dimensions(&self) -> Size;

    /// Register a callback to run once per animation frame.
    fn add_tick_handler(&mut self, handler: TickHandler);
}
