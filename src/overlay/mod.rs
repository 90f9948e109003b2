//! Overlay model.
//!
//! An [`Overlay`] is one drawable, possibly interactive entity of a scene:
//! the background media, a bounding box, or a classification label. The
//! variants form a closed set ([`OverlayKind`]); call sites ask capability
//! questions (`is_spatial`, `is_selectable`, ...) instead of matching on the
//! variant everywhere.

mod bounding_box;
mod classification;
mod media;

pub use bounding_box::{BoundingBoxOverlay, ResizeHandle, SpatialGeometry};
pub use classification::ClassificationOverlay;
pub use media::MediaOverlay;

use std::fmt;

use annoscene_core::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::backend::{Color, DrawingBackend};
use crate::constants::{BOUNDING_BOX_SELECTION_PRIORITY, CLASSIFICATION_SELECTION_PRIORITY};
use crate::coordinates::CoordinateSystem;
use crate::error::{LoadError, RenderError};
use crate::resources::{ImageResource, LoadFuture, LoadOptions, ResourceLoader};

/// Opaque annotation payload attached to an overlay.
pub type Label = serde_json::Value;

/// Default stroke color for annotation overlays.
pub const DEFAULT_OVERLAY_COLOR: Color = [0.2, 0.8, 0.4, 1.0];

// ============================================================================
// Identity and status
// ============================================================================

/// Unique, stable identifier of an overlay within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(String);

impl OverlayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OverlayId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OverlayId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paint lifecycle of an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayStatus {
    /// Never painted
    #[default]
    Pending,
    /// Resource decoded, not painted yet
    Decoded,
    /// Paint in progress (possibly waiting on a resource)
    Painting,
    Painted,
    Error,
}

/// Where a point falls relative to an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContainmentLevel {
    None,
    Content,
    /// Within the border band, where resizes start
    Border,
}

// ============================================================================
// Rendering
// ============================================================================

/// Per-frame style inputs supplied by the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    /// Global overlay opacity from the scene options
    pub alpha: f32,
    /// Whether this overlay is the hovered one
    pub hovered: bool,
    /// World-to-screen zoom, used to keep strokes a constant screen width
    pub scale: f32,
    pub font_size: f32,
    pub load_options: LoadOptions,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            hovered: false,
            scale: 1.0,
            font_size: crate::constants::DEFAULT_LABEL_FONT_SIZE,
            load_options: LoadOptions::default(),
        }
    }
}

/// Outcome of a render call.
pub enum RenderStep {
    /// Everything was drawn
    Painted,
    /// Drawing waits on a resource; poll the future on later frames and hand
    /// the result to [`Overlay::finish_render`].
    Pending(LoadFuture),
}

impl fmt::Debug for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStep::Painted => f.write_str("Painted"),
            RenderStep::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

// ============================================================================
// Overlay
// ============================================================================

/// Variant-specific state.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayKind {
    Media(MediaOverlay),
    BoundingBox(BoundingBoxOverlay),
    Classification(ClassificationOverlay),
}

/// A drawable entity owned by a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    id: OverlayId,
    sample_id: String,
    field: Option<String>,
    label: Label,
    status: OverlayStatus,
    dirty: bool,
    selected: bool,
    /// Whether the user may move/resize it
    editable: bool,
    color: Color,
    kind: OverlayKind,
}

impl Overlay {
    fn with_kind(id: impl Into<OverlayId>, sample_id: impl Into<String>, kind: OverlayKind) -> Self {
        Self {
            id: id.into(),
            sample_id: sample_id.into(),
            field: None,
            label: Label::Null,
            status: OverlayStatus::Pending,
            dirty: true,
            selected: false,
            editable: true,
            color: DEFAULT_OVERLAY_COLOR,
            kind,
        }
    }

    /// Background media image.
    pub fn media(id: impl Into<OverlayId>, sample_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_kind(id, sample_id, OverlayKind::Media(MediaOverlay::new(url)))
    }

    /// Bounding box with relative (`[0, 1]` media space) bounds.
    pub fn bounding_box(
        id: impl Into<OverlayId>,
        sample_id: impl Into<String>,
        relative: Rect,
    ) -> Self {
        Self::with_kind(
            id,
            sample_id,
            OverlayKind::BoundingBox(BoundingBoxOverlay::new(relative)),
        )
    }

    /// Classification label; the text is taken from the label payload.
    pub fn classification(
        id: impl Into<OverlayId>,
        sample_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut overlay = Self::with_kind(
            id,
            sample_id,
            OverlayKind::Classification(ClassificationOverlay::new()),
        );
        overlay.label = serde_json::json!({ "label": text.into() });
        overlay
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    // === Accessors ===

    pub fn id(&self) -> &OverlayId {
        &self.id
    }

    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Replace the label. Returns the previous one.
    pub fn set_label(&mut self, label: Label) -> Label {
        self.dirty = true;
        std::mem::replace(&mut self.label, label)
    }

    /// Human-readable text of the label: its `"label"` member, or the payload
    /// itself when it is a plain string.
    pub fn display_text(&self) -> String {
        match &self.label {
            Label::String(text) => text.clone(),
            Label::Object(map) => map
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    pub fn status(&self) -> OverlayStatus {
        self.status
    }

    pub fn set_status(&mut self, status: OverlayStatus) {
        self.status = status;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn kind(&self) -> &OverlayKind {
        &self.kind
    }

    pub fn as_media(&self) -> Option<&MediaOverlay> {
        match &self.kind {
            OverlayKind::Media(media) => Some(media),
            _ => None,
        }
    }

    pub fn as_media_mut(&mut self) -> Option<&mut MediaOverlay> {
        match &mut self.kind {
            OverlayKind::Media(media) => Some(media),
            _ => None,
        }
    }

    pub fn as_bounding_box(&self) -> Option<&BoundingBoxOverlay> {
        match &self.kind {
            OverlayKind::BoundingBox(bbox) => Some(bbox),
            _ => None,
        }
    }

    pub fn as_bounding_box_mut(&mut self) -> Option<&mut BoundingBoxOverlay> {
        match &mut self.kind {
            OverlayKind::BoundingBox(bbox) => Some(bbox),
            _ => None,
        }
    }

    pub fn as_classification(&self) -> Option<&ClassificationOverlay> {
        match &self.kind {
            OverlayKind::Classification(classification) => Some(classification),
            _ => None,
        }
    }

    pub fn as_classification_mut(&mut self) -> Option<&mut ClassificationOverlay> {
        match &mut self.kind {
            OverlayKind::Classification(classification) => Some(classification),
            _ => None,
        }
    }

    // === Capabilities ===

    pub fn is_media(&self) -> bool {
        matches!(self.kind, OverlayKind::Media(_))
    }

    pub fn is_classification(&self) -> bool {
        matches!(self.kind, OverlayKind::Classification(_))
    }

    /// Has relative/absolute geometry tied to the canonical media.
    pub fn is_spatial(&self) -> bool {
        matches!(self.kind, OverlayKind::BoundingBox(_))
    }

    pub fn is_selectable(&self) -> bool {
        !self.is_media()
    }

    pub fn is_hoverable(&self) -> bool {
        !self.is_media()
    }

    pub fn is_draggable(&self) -> bool {
        self.editable && self.is_spatial()
    }

    pub fn is_resizable(&self) -> bool {
        self.editable && self.is_spatial()
    }

    /// Hit-test tie-break priority; higher wins. `None` for non-selectable.
    pub fn selection_priority(&self) -> Option<i32> {
        match self.kind {
            OverlayKind::Media(_) => None,
            OverlayKind::BoundingBox(_) => Some(BOUNDING_BOX_SELECTION_PRIORITY),
            OverlayKind::Classification(_) => Some(CLASSIFICATION_SELECTION_PRIORITY),
        }
    }

    // === Selection ===

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns true if the flag changed.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        if !self.is_selectable() || self.selected == selected {
            return false;
        }
        self.selected = selected;
        self.dirty = true;
        true
    }

    pub fn toggle_selected(&mut self) -> bool {
        self.set_selected(!self.selected)
    }

    // === Dirty tracking ===

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Absolute bounds changed and relative bounds must be recomputed.
    pub fn needs_coordinate_update(&self) -> bool {
        self.as_bounding_box()
            .is_some_and(|bbox| bbox.needs_coordinate_update())
    }

    pub fn mark_for_coordinate_update(&mut self) {
        if let Some(bbox) = self.as_bounding_box_mut() {
            bbox.mark_for_coordinate_update();
        }
    }

    pub fn mark_coordinate_update_complete(&mut self) {
        if let Some(bbox) = self.as_bounding_box_mut() {
            bbox.mark_coordinate_update_complete();
        }
    }

    // === Geometry and hit testing ===

    /// Pixel bounds of what was last painted (or would be painted).
    pub fn bounds(&self) -> Option<Rect> {
        match &self.kind {
            OverlayKind::Media(media) => media.rendered_bounds(),
            OverlayKind::BoundingBox(bbox) => Some(bbox.absolute_bounds()),
            OverlayKind::Classification(classification) => classification.bounds(),
        }
    }

    /// Recompute derived pixel geometry from the coordinate system.
    pub fn update_absolute(&mut self, coordinates: &CoordinateSystem) {
        if let Some(bbox) = self.as_bounding_box_mut() {
            bbox.update_absolute(coordinates);
            self.dirty = true;
        }
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds().is_some_and(|bounds| bounds.contains(point))
    }

    /// Content vs. border containment. `tolerance` is the border band width
    /// in pixels.
    pub fn containment_level(&self, point: Point, tolerance: f32) -> ContainmentLevel {
        let Some(bounds) = self.bounds() else {
            return ContainmentLevel::None;
        };
        if !bounds.contains(point) {
            return ContainmentLevel::None;
        }
        if self.is_spatial() && bounds.distance_to_edge(point) <= tolerance {
            ContainmentLevel::Border
        } else {
            ContainmentLevel::Content
        }
    }

    /// Distance from the point to the overlay outline; zero inside.
    pub fn mouse_distance(&self, point: Point) -> f32 {
        match self.bounds() {
            Some(bounds) if bounds.contains(point) => 0.0,
            Some(bounds) => bounds.distance_to_edge(point),
            None => f32::INFINITY,
        }
    }

    // === Rendering ===

    /// Draw the overlay. Render faults are returned, never panicked on.
    pub fn render(
        &mut self,
        backend: &mut dyn DrawingBackend,
        loader: &dyn ResourceLoader,
        style: &RenderStyle,
    ) -> Result<RenderStep, RenderError> {
        let id = self.id.clone();
        let color = self.color;
        let text = self.display_text();
        match &mut self.kind {
            OverlayKind::Media(media) => media.render(&id, backend, loader, style),
            OverlayKind::BoundingBox(bbox) => {
                bbox.render(&id, &text, color, self.selected, self.editable, backend, style)?;
                Ok(RenderStep::Painted)
            }
            OverlayKind::Classification(classification) => {
                classification.render(&id, &text, color, self.selected, backend, style)?;
                Ok(RenderStep::Painted)
            }
        }
    }

    /// Complete a render that returned [`RenderStep::Pending`].
    pub fn finish_render(
        &mut self,
        loaded: Result<ImageResource, LoadError>,
        backend: &mut dyn DrawingBackend,
        style: &RenderStyle,
    ) -> Result<(), RenderError> {
        let resource = loaded?;
        let id = self.id.clone();
        match &mut self.kind {
            OverlayKind::Media(media) => {
                self.status = OverlayStatus::Decoded;
                media.set_resource(resource, backend.get_container_dimensions());
                media.draw(&id, backend, style)
            }
            _ => Ok(()),
        }
    }
}
