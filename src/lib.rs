//! annoscene - interactive 2D annotation scene engine
//!
//! A [`Scene`] layers annotation overlays (bounding boxes and classification
//! labels) over one background media image. It owns the overlays, keeps their
//! pixel geometry in sync with the rendered media, routes pointer and keyboard
//! input to them in paint order, records edits as undoable commands and
//! repaints dirty overlays through a host-supplied [`DrawingBackend`].
//!
//! Rasterization, asset fetching and windowing are the host's business; see
//! [`backend`] and [`resources`].

pub mod backend;
pub mod config;
pub mod constants;
pub mod coordinates;
pub mod error;
pub mod events;
pub mod interaction;
pub mod keybindings;
pub mod overlay;
pub mod render_context;
pub mod resources;
pub mod scene;
pub mod selection;
pub mod undo;

#[cfg(test)]
mod testing;

pub use annoscene_core::{Event, Key, KeyEvent, Modifiers, MouseButton, Point, PointerEvent, Rect, Size};

pub use backend::{Color, DrawStyle, DrawingBackend, SharedBackend, TickHandler};
pub use config::{ConfigError, InteractionConfig, RenderConfig, SceneConfig, UndoConfig};
pub use coordinates::{CoordinateSystem, Transform};
pub use error::{ContextError, LoadError, RenderError, SceneError};
pub use events::{ChannelId, SceneEvent, SubscriptionId};
pub use interaction::{CursorStyle, InteractionManager, InteractionState, InteractiveDetectionHandler};
pub use keybindings::{KeyAction, KeyBindings, KeyChord};
pub use overlay::{Label, Overlay, OverlayId, OverlayKind, OverlayStatus};
pub use resources::{FileImageLoader, ImageResource, LoadFuture, LoadOptions, ResourceLoader, SharedLoader};
pub use scene::{FrameStats, Scene, SceneOptions, attach_render_loop};
pub use selection::SelectionManager;
pub use undo::{Command, CommandKind, UndoStack};
