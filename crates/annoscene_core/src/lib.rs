//! annoscene_core - geometry and input primitives for the annoscene engine
//!
//! Hosts translate their windowing/toolkit events into [`Event`] values and
//! hand them to a scene. Everything here is plain data.

mod event;
mod geometry;

pub use event::{Event, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use geometry::{Point, Rect, Size};
