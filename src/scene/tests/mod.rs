//! Scene-level scenarios driven through the public API and host events.

mod interaction;
mod rendering;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use annoscene_core::{Event, Point, PointerEvent, Rect};

use super::Scene;
use crate::backend::SharedBackend;
use crate::config::SceneConfig;
use crate::events::SceneEvent;
use crate::overlay::{Overlay, OverlayId};
use crate::testing::{ManualLoader, RecordingBackend, init_logging};

pub(super) const MEDIA_URL: &str = "sample.png";

pub(super) struct Harness {
    pub scene: Scene,
    pub backend: Rc<RefCell<RecordingBackend>>,
    pub loader: ManualLoader,
    pub events: Rc<RefCell<Vec<SceneEvent>>>,
}

impl Harness {
    /// Empty scene on a 200x100 recording backend.
    pub fn new() -> Self {
        init_logging();
        let backend = RecordingBackend::shared();
        let loader = ManualLoader::new();
        let shared: SharedBackend = backend.clone();
        let scene = Scene::new(shared, Rc::new(loader.clone()), SceneConfig::default());

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        scene.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Self {
            scene,
            backend,
            loader,
            events,
        }
    }

    /// Scene with a media overlay laid out at `{0, 0, 200, 100}`.
    pub fn with_media() -> Self {
        let mut harness = Self::new();
        harness.loader.resolve(MEDIA_URL, 200, 100);
        assert!(harness.scene.add_overlay(Overlay::media("media", "sample-1", MEDIA_URL), false));
        harness
            .scene
            .set_media_bounds(Rect::new(0.0, 0.0, 200.0, 100.0))
            .unwrap();
        harness
    }

    pub fn add_box(&mut self, id: &str, relative: Rect) -> OverlayId {
        assert!(self
            .scene
            .add_overlay(Overlay::bounding_box(id, "sample-1", relative), false));
        OverlayId::from(id)
    }

    pub fn absolute(&self, id: &OverlayId) -> Rect {
        self.scene
            .overlay(id)
            .and_then(|o| o.as_bounding_box())
            .map(|bbox| bbox.absolute_bounds())
            .unwrap()
    }

    pub fn take_events(&self) -> Vec<SceneEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn pointer(&mut self, event: fn(PointerEvent) -> Event, x: f32, y: f32, ms: u64) -> bool {
        self.scene.handle_event(event(PointerEvent::new(
            Point::new(x, y),
            Duration::from_millis(ms),
        )))
    }

    /// Press and release at the same spot.
    pub fn click(&mut self, x: f32, y: f32, ms: u64) {
        self.pointer(Event::PointerDown, x, y, ms);
        self.pointer(Event::PointerUp, x, y, ms + 10);
    }

    /// Press, move in one step, release.
    pub fn drag(&mut self, from: Point, to: Point, ms: u64) {
        self.pointer(Event::PointerDown, from.x, from.y, ms);
        self.pointer(Event::PointerMove, to.x, to.y, ms + 10);
        self.pointer(Event::PointerUp, to.x, to.y, ms + 20);
    }
}

pub(super) fn ids(names: &[&str]) -> Vec<OverlayId> {
    names.iter().map(|name| OverlayId::from(*name)).collect()
}

pub(super) fn assert_rect_eq(actual: Rect, expected: Rect) {
    assert!(
        actual.approx_eq(&expected, 1e-3),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}
