//! Test doubles for the drawing backend and the resource loader.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use annoscene_core::{Point, Rect, Size};
use futures::channel::oneshot;
use futures_lite::{FutureExt, future};

use crate::backend::{DrawStyle, DrawingBackend, TickHandler};
use crate::error::{LoadError, RenderError};
use crate::overlay::OverlayId;
use crate::resources::{ImageResource, LoadFuture, LoadOptions, ResourceLoader};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Recording backend
// ============================================================================

/// One call made against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Rect { id: OverlayId, bounds: Rect },
    Text { id: OverlayId, position: Point, text: String },
    Line { id: OverlayId, from: Point, to: Point },
    Image { id: OverlayId, bounds: Rect, url: String },
    Clear(OverlayId),
    Dispose(OverlayId),
}

impl DrawCall {
    pub fn id(&self) -> &OverlayId {
        match self {
            DrawCall::Rect { id, .. }
            | DrawCall::Text { id, .. }
            | DrawCall::Line { id, .. }
            | DrawCall::Image { id, .. }
            | DrawCall::Clear(id)
            | DrawCall::Dispose(id) => id,
        }
    }

    pub fn is_draw(&self) -> bool {
        !matches!(self, DrawCall::Clear(_) | DrawCall::Dispose(_))
    }
}

/// Backend that records every call and tracks painted extents.
pub struct RecordingBackend {
    pub calls: Vec<DrawCall>,
    bounds: HashMap<OverlayId, Rect>,
    pub hidden: HashSet<OverlayId>,
    pub container: Size,
    pub scale: f32,
    /// Added to screen points by `screen_to_world`
    pub world_offset: Point,
    /// Ids whose draw calls fail
    pub failing: HashSet<OverlayId>,
    tick_handlers: Vec<TickHandler>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            bounds: HashMap::new(),
            hidden: HashSet::new(),
            container: Size::new(200.0, 100.0),
            scale: 1.0,
            world_offset: Point::zero(),
            failing: HashSet::new(),
            tick_handlers: Vec::new(),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<RecordingBackend>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Ids in the order they were last drawn.
    pub fn draw_order(&self) -> Vec<OverlayId> {
        let mut order: Vec<OverlayId> = Vec::new();
        for call in self.calls.iter().filter(|c| c.is_draw()) {
            order.retain(|id| id != call.id());
            order.push(call.id().clone());
        }
        order
    }

    pub fn draws_for(&self, id: &OverlayId) -> usize {
        self.calls
            .iter()
            .filter(|c| c.is_draw() && c.id() == id)
            .count()
    }

    pub fn tick_handler_count(&self) -> usize {
        self.tick_handlers.len()
    }

    /// Run the tick handlers of a shared backend, as an animation frame
    /// would. The backend is not borrowed while they run.
    pub fn tick(backend: &Rc<RefCell<RecordingBackend>>) {
        let mut handlers = std::mem::take(&mut backend.borrow_mut().tick_handlers);
        for handler in handlers.iter_mut() {
            handler();
        }
        let mut backend = backend.borrow_mut();
        let added = std::mem::replace(&mut backend.tick_handlers, handlers);
        backend.tick_handlers.extend(added);
    }

    fn record(&mut self, call: DrawCall, extent: Option<Rect>) -> Result<(), RenderError> {
        if self.failing.contains(call.id()) {
            return Err(RenderError::backend(format!("draw rejected for {}", call.id())));
        }
        if let Some(extent) = extent {
            let id = call.id().clone();
            let merged = match self.bounds.get(&id) {
                Some(existing) => Rect::from_edges(
                    existing.left().min(extent.left()),
                    existing.top().min(extent.top()),
                    existing.right().max(extent.right()),
                    existing.bottom().max(extent.bottom()),
                ),
                None => extent,
            };
            self.bounds.insert(id, merged);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl DrawingBackend for RecordingBackend {
    fn draw_rect(&mut self, id: &OverlayId, bounds: Rect, _style: &DrawStyle) -> Result<(), RenderError> {
        self.record(DrawCall::Rect { id: id.clone(), bounds }, Some(bounds))
    }

    fn draw_text(
        &mut self,
        id: &OverlayId,
        position: Point,
        text: &str,
        _style: &DrawStyle,
    ) -> Result<(), RenderError> {
        self.record(
            DrawCall::Text {
                id: id.clone(),
                position,
                text: text.to_string(),
            },
            None,
        )
    }

    fn draw_line(&mut self, id: &OverlayId, from: Point, to: Point, _style: &DrawStyle) -> Result<(), RenderError> {
        self.record(
            DrawCall::Line {
                id: id.clone(),
                from,
                to,
            },
            Some(Rect::from_corners(from, to)),
        )
    }

    fn draw_image(
        &mut self,
        id: &OverlayId,
        bounds: Rect,
        image: &ImageResource,
        _style: &DrawStyle,
    ) -> Result<(), RenderError> {
        self.record(
            DrawCall::Image {
                id: id.clone(),
                bounds,
                url: image.url.clone(),
            },
            Some(bounds),
        )
    }

    fn clear(&mut self, id: &OverlayId) {
        self.bounds.remove(id);
        self.calls.push(DrawCall::Clear(id.clone()));
    }

    fn dispose(&mut self, id: &OverlayId) {
        self.bounds.remove(id);
        self.hidden.remove(id);
        self.calls.push(DrawCall::Dispose(id.clone()));
    }

    fn show(&mut self, id: &OverlayId) {
        self.hidden.remove(id);
    }

    fn hide(&mut self, id: &OverlayId) {
        self.hidden.insert(id.clone());
    }

    fn hit_test(&self, point: Point, id: Option<&OverlayId>) -> bool {
        match id {
            Some(id) => self.bounds.get(id).is_some_and(|b| b.contains(point)),
            None => self
                .bounds
                .iter()
                .any(|(id, b)| !self.hidden.contains(id) && b.contains(point)),
        }
    }

    fn get_bounds(&self, id: &OverlayId) -> Option<Rect> {
        self.bounds.get(id).copied()
    }

    fn screen_to_world(&self, point: Point) -> Point {
        Point::new(point.x + self.world_offset.x, point.y + self.world_offset.y)
    }

    fn get_scale(&self) -> f32 {
        self.scale
    }

    fn get_container_dimensions(&self) -> Size {
        self.container
    }

    fn add_tick_handler(&mut self, handler: TickHandler) {
        self.tick_handlers.push(handler);
    }
}

// ============================================================================
// Manual loader
// ============================================================================

type LoadResult = Result<ImageResource, LoadError>;

#[derive(Default)]
struct ManualState {
    results: HashMap<String, LoadResult>,
    /// Loads still waiting for the test to settle them
    waiting: HashMap<String, Vec<oneshot::Sender<LoadResult>>>,
    loads: HashMap<String, usize>,
    background: HashMap<String, usize>,
}

/// Loader whose loads stay pending until the test settles them.
#[derive(Clone, Default)]
pub struct ManualLoader {
    state: Rc<RefCell<ManualState>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle `url` with a decoded image of the given size.
    pub fn resolve(&self, url: &str, width: u32, height: u32) {
        self.settle(url, Ok(ImageResource::new(url, width, height)));
    }

    /// Settle `url` with an error.
    pub fn fail(&self, url: &str, error: LoadError) {
        self.settle(url, Err(error));
    }

    fn settle(&self, url: &str, result: LoadResult) {
        let mut state = self.state.borrow_mut();
        for sender in state.waiting.remove(url).unwrap_or_default() {
            // The receiving render may have been dropped with its overlay.
            let _ = sender.send(result.clone());
        }
        state.results.insert(url.to_string(), result);
    }

    /// How many times `load` was called for `url`.
    pub fn load_count(&self, url: &str) -> usize {
        self.state.borrow().loads.get(url).copied().unwrap_or(0)
    }

    /// How many times `load_background` was called for `url`.
    pub fn background_count(&self, url: &str) -> usize {
        self.state.borrow().background.get(url).copied().unwrap_or(0)
    }
}

impl ResourceLoader for ManualLoader {
    fn load(&self, url: &str, _options: LoadOptions) -> LoadFuture {
        let mut state = self.state.borrow_mut();
        *state.loads.entry(url.to_string()).or_default() += 1;
        if let Some(result) = state.results.get(url) {
            return future::ready(result.clone()).boxed_local();
        }

        let (sender, receiver) = oneshot::channel();
        state
            .waiting
            .entry(url.to_string())
            .or_default()
            .push(sender);
        let url = url.to_string();
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(LoadError::NotFound { url }))
        }
        .boxed_local()
    }

    fn load_background(&self, url: &str, _options: LoadOptions) {
        *self
            .state
            .borrow_mut()
            .background
            .entry(url.to_string())
            .or_default() += 1;
    }

    fn get(&self, url: &str) -> Option<ImageResource> {
        self.state
            .borrow()
            .results
            .get(url)
            .and_then(|result| result.as_ref().ok().cloned())
    }

    fn unload(&self, url: &str) {
        self.state.borrow_mut().results.remove(url);
    }
}
