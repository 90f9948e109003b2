//! Drawing brand-new bounding boxes.

use annoscene_core::{Point, Rect};

/// State of the box being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawingState {
    /// Not currently drawing anything.
    #[default]
    Idle,
    /// Pointer is down; stores the starting corner and the live corner.
    Drawing { start: Point, current: Point },
    /// Pointer released on a large enough box, waiting for a label.
    Established(Rect),
}

impl DrawingState {
    pub fn is_drawing(&self) -> bool {
        matches!(self, DrawingState::Drawing { .. })
    }
}

/// Intercepts all pointer input while interactive mode is on.
///
/// Press starts a zero-size rectangle, moves stretch it (clamped to the
/// media), release either discards it or establishes it for labelling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractiveDetectionHandler {
    field: Option<String>,
    state: DrawingState,
    /// Pixel bounds of the media; drawing is confined to them
    limit: Option<Rect>,
}

impl InteractiveDetectionHandler {
    pub fn new(field: Option<String>) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }

    /// Field new boxes are created in.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn state(&self) -> DrawingState {
        self.state
    }

    fn clamp(&self, point: Point) -> Point {
        match self.limit {
            Some(limit) => Point::new(
                point.x.clamp(limit.left(), limit.right()),
                point.y.clamp(limit.top(), limit.bottom()),
            ),
            None => point,
        }
    }

    /// Start a box at `point`. Any previously established box is dropped.
    pub fn begin(&mut self, point: Point, limit: Option<Rect>) -> Rect {
        self.limit = limit;
        let start = self.clamp(point);
        self.state = DrawingState::Drawing {
            start,
            current: start,
        };
        Rect::new(start.x, start.y, 0.0, 0.0)
    }

    /// Stretch the box to `point`.
    pub fn update(&mut self, point: Point) -> Option<Rect> {
        let clamped = self.clamp(point);
        match &mut self.state {
            DrawingState::Drawing { start, current } => {
                *current = clamped;
                Some(Rect::from_corners(*start, *current))
            }
            _ => None,
        }
    }

    /// Release. Boxes with a side below `min_size` are discarded.
    pub fn finish(&mut self, min_size: f32) -> Option<Rect> {
        let DrawingState::Drawing { start, current } = self.state else {
            return None;
        };
        let rect = Rect::from_corners(start, current);
        if rect.width < min_size || rect.height < min_size {
            log::debug!(
                "Discarding drawn box {:.1}x{:.1} (minimum {})",
                rect.width,
                rect.height,
                min_size
            );
            self.state = DrawingState::Idle;
            return None;
        }
        self.state = DrawingState::Established(rect);
        Some(rect)
    }

    /// Pixel bounds of the box waiting for a label.
    pub fn established(&self) -> Option<Rect> {
        match self.state {
            DrawingState::Established(rect) => Some(rect),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DrawingState::Idle;
    }
}
