//! Global constants for the annoscene engine

/// Maximum number of commands kept in the undo history.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Pointer travel (screen pixels) under which a press/release pair is a click.
pub const DEFAULT_CLICK_DISTANCE: f32 = 4.0;

/// Press duration (milliseconds) under which a press/release pair is a click.
pub const DEFAULT_CLICK_TIME_MS: u64 = 300;

/// Maximum distance between two clicks forming a double click (screen pixels).
pub const DEFAULT_DOUBLE_CLICK_DISTANCE: f32 = 8.0;

/// Maximum delay between two clicks forming a double click (milliseconds).
pub const DEFAULT_DOUBLE_CLICK_TIME_MS: u64 = 400;

/// Width of the band along a box outline that counts as its border (screen pixels).
pub const DEFAULT_BORDER_TOLERANCE: f32 = 5.0;

/// Boxes drawn in interactive mode smaller than this (pixels) are discarded.
pub const DEFAULT_MIN_ESTABLISH_SIZE: f32 = 4.0;

/// Resizes that would make a box side smaller than this (pixels) are ignored.
pub const DEFAULT_MIN_BOX_SIZE: f32 = 2.0;

/// Retry budget handed to the resource loader.
pub const DEFAULT_RESOURCE_RETRIES: u32 = 3;

/// Font size for classification labels.
pub const DEFAULT_LABEL_FONT_SIZE: f32 = 14.0;

/// Inset of the classification stack from the media corner.
pub const DEFAULT_LABEL_PADDING: f32 = 8.0;

/// Vertical gap between stacked classification labels.
pub const DEFAULT_LABEL_SPACING: f32 = 4.0;

/// Frames taking longer than this are logged.
pub const DEFAULT_SLOW_FRAME_MS: u64 = 16;

/// Outline width for unselected boxes.
pub const STROKE_WIDTH: f32 = 2.0;

/// Outline width for selected boxes.
pub const SELECTED_STROKE_WIDTH: f32 = 3.0;

/// Side length of the square resize handles drawn on selected boxes.
pub const HANDLE_SIZE: f32 = 8.0;

/// Fill opacity applied to a hovered box.
pub const HOVER_FILL_ALPHA: f32 = 0.2;

/// Hit-test tie-break priority for bounding boxes.
pub const BOUNDING_BOX_SELECTION_PRIORITY: i32 = 10;

/// Hit-test tie-break priority for classification labels.
/// Labels are small, so they win over the boxes they overlap.
pub const CLASSIFICATION_SELECTION_PRIORITY: i32 = 20;

/// Id of the temporary overlay shown while a new box is being drawn.
pub const ESTABLISHING_OVERLAY_ID: &str = "__establishing__";
