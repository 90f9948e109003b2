//! Frame rendering.
//!
//! A frame resolves pending geometry, polls in-flight resource loads, lays
//! out the classification stack and repaints whatever is dirty, in paint
//! order. Loads are polled once per frame, never awaited.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use annoscene_core::Point;
use futures_lite::future;
use web_time::Instant;

use crate::backend::DrawingBackend;
use crate::events::SceneEvent;
use crate::overlay::{Overlay, OverlayId, OverlayStatus, RenderStep, RenderStyle};
use crate::resources::{LoadFuture, LoadHint, LoadOptions, ResourceLoader};

use super::Scene;
use super::order::bin_by_field;

/// Callback run before or after every frame, with the frame number.
pub type FrameCallback = Box<dyn FnMut(u64)>;

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Overlays painted to completion this frame
    pub painted: usize,
    /// Overlays still waiting on a resource after this frame
    pub pending: usize,
    /// Overlays that failed to paint this frame
    pub failed: usize,
    /// Resource loads that completed this frame
    pub resolved: usize,
    pub duration: Duration,
}

enum PaintOutcome {
    Painted,
    Waiting(LoadFuture),
    Skipped,
    Failed(String),
}

impl Scene {
    /// Run one frame.
    pub fn render_frame(&mut self) -> FrameStats {
        let started = Instant::now();
        self.frame += 1;
        let frame = self.frame;
        let mut stats = FrameStats {
            frame,
            ..FrameStats::default()
        };
        if self.destroyed {
            return stats;
        }

        for callback in self.before_render.iter_mut() {
            callback(frame);
        }

        self.resolve_coordinate_updates();

        let mut errors = Vec::new();
        self.poll_pending(&mut stats, &mut errors);

        if let Some(media) = self.canonical_media.clone() {
            self.paint_one(&media, &mut stats, &mut errors);
        }
        self.sync_media_bounds();
        self.layout_classifications();

        let order: Vec<OverlayId> = self
            .overlay_order
            .iter()
            .filter(|id| Some(*id) != self.canonical_media.as_ref())
            .cloned()
            .collect();
        for id in &order {
            self.paint_one(id, &mut stats, &mut errors);
        }
        self.paint_establishing();

        for (id, message) in errors {
            self.emit(SceneEvent::OverlayError { id, message });
        }

        stats.pending = self.pending_renders.len();
        stats.duration = started.elapsed();
        if stats.duration > Duration::from_millis(self.config.render.slow_frame_ms) {
            log::debug!(
                "Slow frame {}: {:?} ({} painted, {} pending)",
                frame,
                stats.duration,
                stats.painted,
                stats.pending
            );
        }

        for callback in self.after_render.iter_mut() {
            callback(frame);
        }
        stats
    }

    /// Number of frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn on_before_render<F>(&mut self, callback: F)
    where
        F: FnMut(u64) + 'static,
    {
        self.before_render.push(Box::new(callback));
    }

    pub fn on_after_render<F>(&mut self, callback: F)
    where
        F: FnMut(u64) + 'static,
    {
        self.after_render.push(Box::new(callback));
    }

    /// Whether any overlay is still waiting on a resource.
    pub fn has_pending_renders(&self) -> bool {
        !self.pending_renders.is_empty()
    }

    fn render_style(&self, id: &OverlayId, scale: f32) -> RenderStyle {
        let is_media = self.canonical_media.as_ref() == Some(id);
        RenderStyle {
            alpha: if is_media { 1.0 } else { self.options.alpha },
            hovered: self.interaction.hovered() == Some(id),
            scale,
            font_size: self.config.render.label_font_size,
            load_options: LoadOptions {
                retries: self.config.render.resource_retries,
                hint: LoadHint::Media,
            },
        }
    }

    /// Poll every in-flight load once and finish the renders that completed.
    fn poll_pending(&mut self, stats: &mut FrameStats, errors: &mut Vec<(OverlayId, String)>) {
        if self.pending_renders.is_empty() {
            return;
        }
        let scale = self.backend.borrow().get_scale();
        let ids: Vec<OverlayId> = self.pending_renders.keys().cloned().collect();

        for id in ids {
            let Some(load) = self.pending_renders.get_mut(&id) else {
                continue;
            };
            let Some(loaded) = future::block_on(future::poll_once(load)) else {
                continue;
            };
            self.pending_renders.remove(&id);
            stats.resolved += 1;

            let style = self.render_style(&id, scale);
            let Some(overlay) = self.overlays.get_mut(&id) else {
                continue;
            };
            let result = {
                let mut backend = self.backend.borrow_mut();
                overlay.finish_render(loaded, &mut *backend, &style)
            };
            match result {
                Ok(()) => {
                    overlay.set_status(OverlayStatus::Painted);
                    stats.painted += 1;
                }
                Err(e) => {
                    log::warn!("Overlay '{}' failed to load: {}", id, e);
                    overlay.set_status(OverlayStatus::Error);
                    stats.failed += 1;
                    errors.push((id, e.to_string()));
                }
            }
        }
    }

    fn paint_one(&mut self, id: &OverlayId, stats: &mut FrameStats, errors: &mut Vec<(OverlayId, String)>) {
        if self.hidden.contains(id) {
            return;
        }
        let scale = self.backend.borrow().get_scale();
        let style = self.render_style(id, scale);
        let Some(overlay) = self.overlays.get_mut(id) else {
            return;
        };
        let outcome = {
            let mut backend = self.backend.borrow_mut();
            paint(overlay, &mut *backend, &*self.loader, &style)
        };
        match outcome {
            PaintOutcome::Painted => stats.painted += 1,
            PaintOutcome::Skipped => {}
            PaintOutcome::Waiting(load) => {
                self.pending_renders.insert(id.clone(), load);
            }
            PaintOutcome::Failed(message) => {
                stats.failed += 1;
                errors.push((id.clone(), message));
            }
        }
    }

    fn paint_establishing(&mut self) {
        let scale = self.backend.borrow().get_scale();
        let style = RenderStyle {
            scale,
            font_size: self.config.render.label_font_size,
            ..RenderStyle::default()
        };
        let Some(overlay) = self.establishing.as_mut() else {
            return;
        };
        let mut backend = self.backend.borrow_mut();
        if let PaintOutcome::Failed(message) = paint(overlay, &mut *backend, &*self.loader, &style) {
            log::debug!("Could not draw box being established: {}", message);
        }
    }

    /// Stack classification labels down from the media's top-left corner.
    fn layout_classifications(&mut self) {
        let padding = self.config.render.label_padding;
        let spacing = self.config.render.label_spacing;
        let font_size = self.config.render.label_font_size;
        let origin = self
            .media_bounds
            .map(|bounds| bounds.position())
            .unwrap_or_else(Point::zero);

        // Bin order without the pointer lift.
        let stack: Vec<OverlayId> = bin_by_field(&self.base_order, &self.overlays, &self.options.active_paths)
            .into_iter()
            .filter(|id| !self.hidden.contains(*id))
            .cloned()
            .collect();

        let mut y = origin.y + padding;
        for id in &stack {
            let Some(overlay) = self.overlays.get_mut(id) else {
                continue;
            };
            let Some(classification) = overlay.as_classification_mut() else {
                continue;
            };
            let moved = classification.set_position(Point::new(origin.x + padding, y));
            y += classification.line_height(font_size) + spacing;
            if moved {
                overlay.mark_dirty();
            }
        }
    }
}

/// Paint an overlay if it needs it.
fn paint(
    overlay: &mut Overlay,
    backend: &mut dyn DrawingBackend,
    loader: &dyn ResourceLoader,
    style: &RenderStyle,
) -> PaintOutcome {
    let needs_paint = matches!(overlay.status(), OverlayStatus::Pending | OverlayStatus::Decoded)
        || (overlay.is_dirty() && overlay.status() != OverlayStatus::Painting);
    if !needs_paint {
        return PaintOutcome::Skipped;
    }

    overlay.set_status(OverlayStatus::Painting);
    overlay.mark_clean();
    match overlay.render(backend, loader, style) {
        Ok(RenderStep::Painted) => {
            overlay.set_status(OverlayStatus::Painted);
            PaintOutcome::Painted
        }
        Ok(RenderStep::Pending(load)) => PaintOutcome::Waiting(load),
        Err(e) => {
            log::warn!("Overlay '{}' failed to render: {}", overlay.id(), e);
            overlay.set_status(OverlayStatus::Error);
            PaintOutcome::Failed(e.to_string())
        }
    }
}

/// Drive `scene` from its backend's animation frames.
///
/// The backend only holds a weak reference; once the scene is dropped the
/// handler does nothing.
pub fn attach_render_loop(scene: &Rc<RefCell<Scene>>) {
    let weak = Rc::downgrade(scene);
    let backend = scene.borrow().backend.clone();
    backend.borrow_mut().add_tick_handler(Box::new(move || {
        let Some(scene) = weak.upgrade() else {
            return;
        };
        let Ok(mut scene) = scene.try_borrow_mut() else {
            log::trace!("Scene busy, skipping frame");
            return;
        };
        if !scene.is_destroyed() {
            scene.render_frame();
        }
    }));
}
