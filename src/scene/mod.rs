//! The scene: overlay registry and orchestration.
//!
//! A [`Scene`] exclusively owns its overlays (by id) and wires them to the
//! coordinate system, selection, interaction, undo history, render loop and
//! event channel. Managers refer to overlays by id only.

mod commands;
mod input;
mod order;
mod render;

#[cfg(test)]
mod tests;

pub use order::{PaintOrder, compute_paint_order};
pub use render::{FrameCallback, FrameStats, attach_render_loop};

use std::collections::{HashMap, HashSet};

use annoscene_core::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::backend::SharedBackend;
use crate::config::SceneConfig;
use crate::coordinates::CoordinateSystem;
use crate::error::SceneError;
use crate::events::{self, ChannelId, SceneEvent, SubscriptionId};
use crate::interaction::{InteractionManager, InteractiveDetectionHandler, OverlayMap};
use crate::overlay::{Label, Overlay, OverlayId, OverlayStatus};
use crate::render_context;
use crate::resources::{LoadFuture, LoadHint, LoadOptions, SharedLoader};
use crate::selection::{SelectionChange, SelectionManager};
use crate::undo::{Command, CommandKind, UndoStack};

/// Per-frame display options supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneOptions {
    /// Fields to show, in bin order
    pub active_paths: Vec<String>,
    pub show_overlays: bool,
    /// Opacity applied to every non-media overlay
    pub alpha: f32,
    /// Show only the front-most overlay under the pointer
    pub only_show_hovered: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            active_paths: Vec::new(),
            show_overlays: true,
            alpha: 1.0,
            only_show_hovered: false,
        }
    }
}

/// A retained 2D annotation scene.
pub struct Scene {
    channel: ChannelId,
    config: SceneConfig,
    backend: SharedBackend,
    loader: SharedLoader,

    overlays: OverlayMap,
    /// Non-media overlays in base order (insertion order unless set)
    base_order: Vec<OverlayId>,
    /// Paint order, bottom first; always a permutation of `overlays`' keys
    overlay_order: Vec<OverlayId>,
    /// Overlays under the pointer, as arranged in `overlay_order`
    contained: Vec<OverlayId>,
    hidden: HashSet<OverlayId>,
    canonical_media: Option<OverlayId>,
    /// Media bounds the coordinate system was last updated from
    media_bounds: Option<Rect>,

    coordinates: CoordinateSystem,
    selection: SelectionManager,
    interaction: InteractionManager,
    undo_stack: UndoStack,

    /// In-flight renders waiting on a resource
    pending_renders: HashMap<OverlayId, LoadFuture>,
    rotation: usize,
    rotation_candidates: Vec<OverlayId>,
    pointer: Option<Point>,
    options: SceneOptions,

    drawing_session_active: bool,
    /// Temporary box shown while drawing; not part of the registry
    establishing: Option<Overlay>,

    before_render: Vec<FrameCallback>,
    after_render: Vec<FrameCallback>,
    frame: u64,

    uses_shared_context: bool,
    destroyed: bool,
}

impl Scene {
    pub fn new(backend: SharedBackend, loader: SharedLoader, config: SceneConfig) -> Self {
        let channel = events::open_channel();
        log::info!("Scene created on channel {:?}", channel);
        Self {
            channel,
            interaction: InteractionManager::new(config.interaction.clone(), config.keybindings.clone()),
            undo_stack: UndoStack::with_config(config.undo.clone()),
            config,
            backend,
            loader,
            overlays: OverlayMap::new(),
            base_order: Vec::new(),
            overlay_order: Vec::new(),
            contained: Vec::new(),
            hidden: HashSet::new(),
            canonical_media: None,
            media_bounds: None,
            coordinates: CoordinateSystem::new(),
            selection: SelectionManager::new(),
            pending_renders: HashMap::new(),
            rotation: 0,
            rotation_candidates: Vec::new(),
            pointer: None,
            options: SceneOptions::default(),
            drawing_session_active: false,
            establishing: None,
            before_render: Vec::new(),
            after_render: Vec::new(),
            frame: 0,
            uses_shared_context: false,
            destroyed: false,
        }
    }

    /// Create a scene on the shared render context.
    pub fn with_shared_context(loader: SharedLoader, config: SceneConfig) -> Result<Self, SceneError> {
        let backend = render_context::acquire()?;
        let mut scene = Self::new(backend, loader, config);
        scene.uses_shared_context = true;
        Ok(scene)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn overlay(&self, id: &OverlayId) -> Option<&Overlay> {
        self.overlays.get(id)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn canonical_media(&self) -> Option<&OverlayId> {
        self.canonical_media.as_ref()
    }

    pub fn coordinates(&self) -> &CoordinateSystem {
        &self.coordinates
    }

    pub fn interaction(&self) -> &InteractionManager {
        &self.interaction
    }

    pub fn options(&self) -> &SceneOptions {
        &self.options
    }

    /// Last known pointer position in world space.
    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Subscribe to this scene's events.
    pub fn subscribe<F>(&self, listener: F) -> Option<SubscriptionId>
    where
        F: FnMut(&SceneEvent) + 'static,
    {
        events::subscribe(self.channel, listener)
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        events::unsubscribe(self.channel, subscription);
    }

    fn emit(&self, event: SceneEvent) {
        events::emit(self.channel, event);
    }

    fn overlay_mut(&mut self, id: &OverlayId) -> Result<&mut Overlay, SceneError> {
        self.overlays
            .get_mut(id)
            .ok_or_else(|| SceneError::not_found(id))
    }

    // ========================================================================
    // Overlay lifecycle
    // ========================================================================

    /// Register an overlay. Returns false (and changes nothing) if the id is
    /// taken or a second media overlay is added.
    pub fn add_overlay(&mut self, overlay: Overlay, with_undo: bool) -> bool {
        if self.destroyed {
            return false;
        }
        if self.overlays.contains_key(overlay.id()) {
            log::debug!("Overlay '{}' already in scene, ignoring add", overlay.id());
            return false;
        }
        if overlay.is_media() && self.canonical_media.is_some() {
            log::warn!("Scene already has a media overlay, rejecting '{}'", overlay.id());
            return false;
        }

        if with_undo {
            self.execute_command(Command::new(CommandKind::AddOverlay {
                overlay: Box::new(overlay),
            }));
        } else {
            self.insert_overlay(overlay, None);
        }
        true
    }

    /// Register an overlay without history. `position` is an index into the
    /// base order.
    fn insert_overlay(&mut self, mut overlay: Overlay, position: Option<usize>) {
        let id = overlay.id().clone();
        overlay.set_status(OverlayStatus::Pending);
        overlay.set_selected(false);
        overlay.mark_dirty();
        if overlay.is_spatial() {
            overlay.update_absolute(&self.coordinates);
        }
        if overlay.is_selectable() {
            self.selection.register(id.clone());
        }

        let is_media = overlay.is_media();
        let host_bounds = overlay.as_media().and_then(|m| m.rendered_bounds());
        if let Some(media) = overlay.as_media().filter(|m| m.resource().is_none()) {
            self.loader.load_background(
                media.url(),
                LoadOptions {
                    retries: self.config.render.resource_retries,
                    hint: LoadHint::Prefetch,
                },
            );
        }
        if !is_media {
            let index = position.unwrap_or(self.base_order.len()).min(self.base_order.len());
            self.base_order.insert(index, id.clone());
        }
        if overlay.is_classification() {
            self.mark_classifications_dirty();
        }
        self.overlays.insert(id.clone(), overlay);
        log::debug!("Added overlay '{}'", id);

        if is_media {
            self.canonical_media = Some(id.clone());
            log::debug!("Canonical media is now '{}'", id);
            self.emit(SceneEvent::CanonicalMediaChanged {
                id: Some(id.clone()),
            });
            if let Some(bounds) = host_bounds {
                self.apply_media_bounds(bounds);
            }
        }
        self.recompute_order();
        self.emit(SceneEvent::OverlayAdded { id });
    }

    /// Remove an overlay.
    pub fn remove_overlay(&mut self, id: &OverlayId, with_undo: bool) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed);
        }
        if with_undo {
            let kind = self.removal_command(id)?;
            self.execute_command(Command::new(kind));
        } else {
            self.detach_overlay(id)?;
        }
        Ok(())
    }

    /// Command that removes `id` and can put it back where it was.
    fn removal_command(&self, id: &OverlayId) -> Result<CommandKind, SceneError> {
        let overlay = self.overlays.get(id).ok_or_else(|| SceneError::not_found(id))?;
        let index = self
            .base_order
            .iter()
            .position(|other| other == id)
            .unwrap_or(0);
        Ok(CommandKind::RemoveOverlay {
            overlay: Box::new(overlay.clone()),
            index,
            was_canonical: self.canonical_media.as_ref() == Some(id),
        })
    }

    /// Unregister an overlay without history and release its resources.
    fn detach_overlay(&mut self, id: &OverlayId) -> Result<Overlay, SceneError> {
        let overlay = self.overlays.remove(id).ok_or_else(|| SceneError::not_found(id))?;

        if let Some(effect) = self.interaction.forget(id) {
            self.apply_effect(effect);
        }
        let was_selected = self.selection.unregister(id);
        self.pending_renders.remove(id);
        self.base_order.retain(|other| other != id);
        self.hidden.remove(id);
        self.backend.borrow_mut().dispose(id);
        log::debug!("Removed overlay '{}'", id);

        if self.canonical_media.as_ref() == Some(id) {
            self.canonical_media = None;
            self.media_bounds = None;
            self.coordinates.reset();
            self.emit(SceneEvent::CanonicalMediaChanged { id: None });
        }
        // Keep the stacked label list gap-free.
        if overlay.is_classification() {
            self.mark_classifications_dirty();
        }

        self.recompute_order();
        self.emit(SceneEvent::OverlayRemoved { id: id.clone() });
        if was_selected {
            self.emit_selection();
        }
        Ok(overlay)
    }

    fn mark_classifications_dirty(&mut self) {
        for overlay in self.overlays.values_mut() {
            if overlay.is_classification() {
                overlay.mark_dirty();
            }
        }
    }

    // ========================================================================
    // Canonical media
    // ========================================================================

    /// Designate the background media.
    pub fn set_canonical_media(&mut self, id: &OverlayId) -> Result<(), SceneError> {
        let overlay = self.overlays.get(id).ok_or_else(|| SceneError::not_found(id))?;
        if !overlay.is_media() {
            return Err(SceneError::NotMedia { id: id.clone() });
        }
        let bounds = overlay.as_media().and_then(|m| m.rendered_bounds());
        if self.canonical_media.as_ref() != Some(id) {
            self.canonical_media = Some(id.clone());
            log::debug!("Canonical media is now '{}'", id);
            self.emit(SceneEvent::CanonicalMediaChanged {
                id: Some(id.clone()),
            });
        }
        if let Some(bounds) = bounds {
            self.apply_media_bounds(bounds);
        }
        self.recompute_order();
        Ok(())
    }

    /// Pixel bounds of the canonical media, once known.
    pub fn media_bounds(&self) -> Option<Rect> {
        self.media_bounds
    }

    /// Lay the canonical media out at `bounds` (host-managed layout).
    pub fn set_media_bounds(&mut self, bounds: Rect) -> Result<(), SceneError> {
        let id = self.canonical_media.clone().ok_or(SceneError::NoCanonicalMedia)?;
        let overlay = self.overlay_mut(&id)?;
        if let Some(media) = overlay.as_media_mut() {
            media.set_rendered_bounds(bounds);
        }
        overlay.mark_dirty();
        self.apply_media_bounds(bounds);
        Ok(())
    }

    /// Pick up bounds changes the media made while rendering itself.
    fn sync_media_bounds(&mut self) {
        let bounds = self
            .canonical_media
            .as_ref()
            .and_then(|id| self.overlays.get(id))
            .and_then(|o| o.as_media())
            .and_then(|m| m.rendered_bounds());
        if let Some(bounds) = bounds {
            if self.media_bounds != Some(bounds) {
                self.apply_media_bounds(bounds);
            }
        }
    }

    /// Cascade a media bounds change to every overlay positioned against it.
    fn apply_media_bounds(&mut self, bounds: Rect) {
        // Pending pixel edits are resolved against the old transform first.
        self.resolve_coordinate_updates();

        self.media_bounds = Some(bounds);
        self.coordinates.update_transform(&bounds);
        log::debug!("Media bounds now {:?}", bounds);

        let mut changed = Vec::new();
        for overlay in self.overlays.values_mut() {
            if overlay.is_spatial() {
                overlay.update_absolute(&self.coordinates);
                if let Some(bbox) = overlay.as_bounding_box() {
                    changed.push((overlay.id().clone(), bbox.geometry()));
                }
            } else if overlay.is_classification() {
                overlay.mark_dirty();
            }
        }
        if let Some(establishing) = self.establishing.as_mut() {
            establishing.mark_dirty();
        }
        for (id, geometry) in changed {
            self.emit(SceneEvent::OverlayBoundsChanged {
                id,
                relative: Some(geometry.relative),
                absolute: geometry.absolute,
            });
        }
        self.recompute_order();
    }

    /// Recompute relative bounds of overlays whose pixel bounds were edited.
    /// Returns how many were resolved.
    fn resolve_coordinate_updates(&mut self) -> usize {
        let mut resolved = Vec::new();
        for overlay in self.overlays.values_mut() {
            if !overlay.needs_coordinate_update() {
                continue;
            }
            let id = overlay.id().clone();
            if let Some(bbox) = overlay.as_bounding_box_mut() {
                let relative = bbox.resolve_relative(&self.coordinates);
                resolved.push((id, relative, bbox.absolute_bounds()));
            }
        }
        let count = resolved.len();
        for (id, relative, absolute) in resolved {
            self.emit(SceneEvent::OverlayBoundsChanged {
                id,
                relative: Some(relative),
                absolute,
            });
        }
        count
    }

    // ========================================================================
    // Options
    // ========================================================================

    pub fn set_scene_options(&mut self, options: SceneOptions) {
        if options == self.options {
            return;
        }
        if options.alpha != self.options.alpha {
            for overlay in self.overlays.values_mut() {
                overlay.mark_dirty();
            }
        }
        self.options = options;
        self.recompute_order();
        self.emit(SceneEvent::SceneOptionsChanged {
            options: self.options.clone(),
        });
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn selected_ids(&self) -> &[OverlayId] {
        self.selection.selected_ids()
    }

    /// Select an overlay. Returns false if nothing changed.
    pub fn select(&mut self, id: &OverlayId, additive: bool) -> Result<bool, SceneError> {
        let overlay = self.overlays.get(id).ok_or_else(|| SceneError::not_found(id))?;
        if !overlay.is_selectable() {
            return Ok(false);
        }
        let change = self.selection.select(id, additive);
        Ok(self.apply_selection(change))
    }

    pub fn deselect(&mut self, id: &OverlayId) -> Result<bool, SceneError> {
        if !self.overlays.contains_key(id) {
            return Err(SceneError::not_found(id));
        }
        let change = self.selection.deselect(id);
        Ok(self.apply_selection(change))
    }

    pub fn toggle_selection(&mut self, id: &OverlayId) -> Result<bool, SceneError> {
        if !self.overlays.contains_key(id) {
            return Err(SceneError::not_found(id));
        }
        let change = self.selection.toggle(id);
        Ok(self.apply_selection(change))
    }

    pub fn clear_selection(&mut self) -> bool {
        let change = self.selection.clear();
        self.apply_selection(change)
    }

    /// Mirror a selection change onto the overlays and announce it.
    fn apply_selection(&mut self, change: SelectionChange) -> bool {
        if change.is_empty() {
            return false;
        }
        for id in &change.deselected {
            if let Some(overlay) = self.overlays.get_mut(id) {
                overlay.set_selected(false);
            }
        }
        for id in &change.selected {
            if let Some(overlay) = self.overlays.get_mut(id) {
                overlay.set_selected(true);
            }
        }
        self.emit_selection();
        true
    }

    fn emit_selection(&self) {
        if self.selection.has_selection() {
            self.emit(SceneEvent::SelectionChanged {
                selected: self.selection.selected_ids().to_vec(),
            });
        } else {
            self.emit(SceneEvent::SelectionCleared);
        }
    }

    /// Remove every selected overlay as one undoable step.
    pub fn delete_selection(&mut self) -> usize {
        let ids = self.selection.selected_ids().to_vec();
        match ids.as_slice() {
            [] => 0,
            [id] => match self.remove_overlay(id, true) {
                Ok(()) => 1,
                Err(e) => {
                    log::warn!("Failed to delete '{}': {}", id, e);
                    0
                }
            },
            _ => {
                let mut removed = Vec::with_capacity(ids.len());
                for id in &ids {
                    // Capture each index after the previous removals so undo
                    // (in reverse) restores the original positions.
                    if let Ok(kind) = self.removal_command(id) {
                        self.apply_forward(&kind);
                        removed.push(kind);
                    }
                }
                let count = removed.len();
                self.record_executed(Command::new(CommandKind::Batch {
                    description: format!("Delete {} overlays", count),
                    commands: removed,
                }));
                count
            }
        }
    }

    // ========================================================================
    // Interactive mode
    // ========================================================================

    pub fn is_interactive(&self) -> bool {
        self.interaction.is_interactive()
    }

    pub fn is_drawing_session_active(&self) -> bool {
        self.drawing_session_active
    }

    /// Start drawing new boxes in `field`. Returns false if already drawing.
    pub fn enter_interactive_mode(&mut self, field: Option<String>, with_undo: bool) -> bool {
        if self.destroyed || self.is_interactive() {
            return false;
        }
        if with_undo {
            self.execute_command(Command::new(CommandKind::EnterDrawingMode { field }));
        } else {
            self.start_drawing_session(field);
        }
        true
    }

    /// Stop drawing, dropping any box waiting for a label.
    pub fn exit_interactive_mode(&mut self) -> bool {
        if !self.is_interactive() {
            return false;
        }
        self.end_drawing_session();
        true
    }

    fn start_drawing_session(&mut self, field: Option<String>) {
        if self.is_interactive() {
            return;
        }
        if let Some(effect) = self.interaction.clear_hover() {
            self.apply_effect(effect);
        }
        self.interaction
            .install_detection(InteractiveDetectionHandler::new(field));
        self.drawing_session_active = true;
        log::debug!("Drawing session started");
        self.emit(SceneEvent::DrawingSessionStarted);
    }

    fn end_drawing_session(&mut self) {
        if self.interaction.remove_detection().is_none() && !self.drawing_session_active {
            return;
        }
        self.discard_establishing();
        self.drawing_session_active = false;
        log::debug!("Drawing session ended");
        self.emit(SceneEvent::DrawingSessionEnded);
    }

    /// Bounds of the box waiting for a label, in pixels.
    pub fn established_bounds(&self) -> Option<Rect> {
        self.interaction.detection().and_then(|d| d.established())
    }

    /// Turn the drawn box into a real, undoable bounding box overlay and end
    /// interactive mode.
    pub fn commit_established(
        &mut self,
        id: impl Into<OverlayId>,
        label: Label,
    ) -> Result<OverlayId, SceneError> {
        let detection = self
            .interaction
            .detection()
            .ok_or(SceneError::NoInteractiveHandler)?;
        let absolute = detection.established().ok_or(SceneError::NothingEstablished)?;
        let field = detection.field().map(str::to_string);

        let id = id.into();
        let sample_id = self
            .canonical_media
            .as_ref()
            .and_then(|media| self.overlays.get(media))
            .map(|media| media.sample_id().to_string())
            .unwrap_or_default();
        let relative = self.coordinates.absolute_to_relative(&absolute);
        let mut overlay = Overlay::bounding_box(id.clone(), sample_id, relative).with_label(label);
        if let Some(field) = &field {
            overlay = overlay.with_field(field.clone());
        }

        if self.overlays.contains_key(&id) {
            return Err(SceneError::DuplicateOverlay { id });
        }
        // The committed box replaces the temporary one; nothing was cancelled.
        if let Some(temporary) = self.establishing.take() {
            self.backend.borrow_mut().dispose(temporary.id());
        }

        // Adding the box and leaving drawing mode undo and redo together.
        let steps = vec![
            CommandKind::AddOverlay {
                overlay: Box::new(overlay),
            },
            CommandKind::ExitDrawingMode { field },
        ];
        for step in &steps {
            self.apply_forward(step);
        }
        self.record_executed(Command::new(CommandKind::Batch {
            description: format!("Add box '{}'", id),
            commands: steps,
        }));
        Ok(id)
    }

    /// Drop the box being drawn (or waiting for a label). Interactive mode
    /// stays on.
    pub fn cancel_established(&mut self) -> bool {
        let Some(detection) = self.interaction.detection_mut() else {
            return false;
        };
        let had_box = detection.established().is_some() || detection.state().is_drawing();
        detection.cancel();
        if had_box {
            self.discard_establishing();
        }
        had_box
    }

    fn discard_establishing(&mut self) {
        if let Some(overlay) = self.establishing.take() {
            self.backend.borrow_mut().dispose(overlay.id());
            self.emit(SceneEvent::EstablishCancelled);
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear the scene down: drop all listeners, history and overlays and
    /// release the backend. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        events::close_channel(self.channel);
        self.undo_stack.clear();
        self.pending_renders.clear();
        self.before_render.clear();
        self.after_render.clear();
        self.interaction = InteractionManager::default();
        self.selection = SelectionManager::new();

        let mut ids: Vec<OverlayId> = self.overlays.keys().cloned().collect();
        ids.extend(self.establishing.take().map(|o| o.id().clone()));
        match self.backend.try_borrow_mut() {
            Ok(mut backend) => {
                for id in &ids {
                    backend.dispose(id);
                }
            }
            Err(_) => log::warn!("Backend busy during scene teardown, skipping dispose"),
        }
        self.overlays.clear();
        self.base_order.clear();
        self.overlay_order.clear();
        self.contained.clear();
        self.hidden.clear();
        self.canonical_media = None;
        self.coordinates.reset();

        if self.uses_shared_context {
            render_context::release();
            self.uses_shared_context = false;
        }
        log::info!("Scene on channel {:?} destroyed", self.channel);
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.destroy();
    }
}
