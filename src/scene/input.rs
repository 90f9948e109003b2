//! Input dispatch and application of interaction effects.

use annoscene_core::{Event, Point, PointerEvent, Rect};

use crate::backend::SharedBackend;
use crate::constants::ESTABLISHING_OVERLAY_ID;
use crate::events::SceneEvent;
use crate::interaction::{
    CursorStyle, GeometryChange, InteractionContext, InteractionEffect, InteractionState, OverlayMap,
};
use crate::keybindings::KeyAction;
use crate::overlay::{Overlay, OverlayId};
use crate::undo::{Command, CommandKind};

use super::Scene;

impl Scene {
    /// Feed one host input event to the scene.
    ///
    /// Pointer positions are in screen space and are mapped to world space
    /// through the backend. Returns true if the event was consumed.
    pub fn handle_event(&mut self, event: Event) -> bool {
        if self.destroyed {
            return false;
        }

        let effects = match event {
            Event::PointerDown(pointer) => {
                let pointer = self.to_world(pointer);
                self.pointer = Some(pointer.position);
                let ctx = interaction_context(&self.overlays, &self.backend, self.media_bounds);
                self.interaction.pointer_down(&ctx, &pointer)
            }
            Event::PointerMove(pointer) => {
                let pointer = self.to_world(pointer);
                self.pointer = Some(pointer.position);
                // Overlays under the pointer change the order handlers see.
                if self.interaction.state() == &InteractionState::Idle {
                    self.recompute_order();
                }
                let ctx = interaction_context(&self.overlays, &self.backend, self.media_bounds);
                self.interaction.pointer_move(&ctx, &pointer)
            }
            Event::PointerUp(pointer) => {
                let pointer = self.to_world(pointer);
                self.pointer = Some(pointer.position);
                let ctx = interaction_context(&self.overlays, &self.backend, self.media_bounds);
                self.interaction.pointer_up(&ctx, &pointer)
            }
            Event::PointerLeave => {
                self.pointer = None;
                let effects = self.interaction.pointer_leave();
                self.recompute_order();
                effects
            }
            Event::KeyDown(key) => self.interaction.key_down(&key),
            Event::KeyUp(key) => self.interaction.key_up(&key),
        };

        let handled = !effects.is_empty() || self.interaction.state() != &InteractionState::Idle;
        for effect in effects {
            self.apply_effect(effect);
        }
        handled
    }

    fn to_world(&self, mut event: PointerEvent) -> PointerEvent {
        event.position = self.backend.borrow().screen_to_world(event.position);
        event
    }

    /// Cursor the host should show at a world-space point.
    pub fn cursor_at(&self, point: Point) -> CursorStyle {
        let ctx = interaction_context(&self.overlays, &self.backend, self.media_bounds);
        self.interaction.cursor_at(&ctx, point)
    }

    /// Currently hovered overlay.
    pub fn hovered(&self) -> Option<&OverlayId> {
        self.interaction.hovered()
    }

    /// The visible interactive overlay whose outline is closest to `point`.
    pub fn overlay_nearest_to(&self, point: Point) -> Option<&OverlayId> {
        self.interaction
            .handlers()
            .iter()
            .rev()
            .filter_map(|id| self.overlays.get(id).map(|o| (id, o.mouse_distance(point))))
            .filter(|(_, distance)| distance.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub(crate) fn apply_effect(&mut self, effect: InteractionEffect) {
        match effect {
            InteractionEffect::Notify(event) => self.emit(event),
            InteractionEffect::HoverChanged {
                left,
                entered,
                point,
            } => {
                if let Some(id) = left {
                    if let Some(overlay) = self.overlays.get_mut(&id) {
                        overlay.mark_dirty();
                    }
                    self.emit(SceneEvent::HoverLeave { id });
                }
                if let Some(id) = entered {
                    if let Some(overlay) = self.overlays.get_mut(&id) {
                        overlay.mark_dirty();
                    }
                    self.emit(SceneEvent::HoverEnter { id, point });
                }
            }
            InteractionEffect::SetAbsoluteBounds { id, bounds } => {
                if let Some(overlay) = self.overlays.get_mut(&id) {
                    if let Some(bbox) = overlay.as_bounding_box_mut() {
                        bbox.set_absolute_bounds(bounds);
                    }
                    overlay.mark_dirty();
                }
            }
            InteractionEffect::RestoreGeometry { id, geometry } => {
                if let Some(overlay) = self.overlays.get_mut(&id) {
                    if let Some(bbox) = overlay.as_bounding_box_mut() {
                        bbox.set_geometry(geometry);
                    }
                    overlay.mark_dirty();
                    self.emit(SceneEvent::OverlayBoundsChanged {
                        id,
                        relative: Some(geometry.relative),
                        absolute: geometry.absolute,
                    });
                }
            }
            InteractionEffect::CommitGeometry { id, before, change } => {
                self.commit_geometry(id, before.relative, change);
            }
            InteractionEffect::Click {
                target,
                point,
                additive,
            } => {
                match &target {
                    Some(id) if additive => {
                        let change = self.selection.toggle(id);
                        self.apply_selection(change);
                    }
                    Some(id) => {
                        let change = self.selection.select(id, false);
                        self.apply_selection(change);
                    }
                    None if !additive => {
                        self.clear_selection();
                    }
                    None => {}
                }
                self.emit(SceneEvent::Click { id: target, point });
            }
            InteractionEffect::DoubleClick { target, point } => {
                self.emit(SceneEvent::DoubleClick { id: target, point });
            }
            InteractionEffect::EstablishUpdate { bounds } => self.update_establishing(bounds),
            InteractionEffect::EstablishDiscard => self.discard_establishing(),
            InteractionEffect::EstablishComplete { bounds } => {
                let relative = self.coordinates.absolute_to_relative(&bounds);
                log::debug!("Box established at {:?}", bounds);
                self.emit(SceneEvent::EstablishEnd {
                    relative,
                    absolute: bounds,
                });
            }
            InteractionEffect::Action(action) => self.run_action(action),
        }
    }

    /// Turn a finished drag or resize into a history entry.
    fn commit_geometry(&mut self, id: OverlayId, before: Rect, change: GeometryChange) {
        let Some(bbox) = self.overlays.get(&id).and_then(|o| o.as_bounding_box()) else {
            return;
        };
        let after = self.coordinates.absolute_to_relative(&bbox.absolute_bounds());
        if after.approx_eq(&before, 1e-6) {
            // Nothing moved; just settle the pixel bounds again.
            if let Some(overlay) = self.overlays.get_mut(&id) {
                overlay.update_absolute(&self.coordinates);
            }
            return;
        }
        let kind = match change {
            GeometryChange::Move => CommandKind::Move {
                overlay_id: id,
                before,
                after,
            },
            GeometryChange::Transform => CommandKind::Transform {
                overlay_id: id,
                before,
                after,
            },
        };
        self.execute_command(Command::new(kind));
    }

    fn update_establishing(&mut self, bounds: Rect) {
        let overlay = self.establishing.get_or_insert_with(|| {
            Overlay::bounding_box(ESTABLISHING_OVERLAY_ID, "", Rect::zero()).with_editable(false)
        });
        if let Some(bbox) = overlay.as_bounding_box_mut() {
            bbox.set_absolute_bounds(bounds);
        }
        overlay.mark_dirty();
    }

    fn run_action(&mut self, action: KeyAction) {
        log::debug!("Key action: {}", action.name());
        match action {
            KeyAction::Undo => {
                self.undo();
            }
            KeyAction::Redo => {
                self.redo();
            }
            KeyAction::DeleteSelection => {
                self.delete_selection();
            }
            KeyAction::RotateNext => {
                self.rotate_next();
            }
            KeyAction::RotatePrevious => {
                self.rotate_previous();
            }
            KeyAction::Cancel => {
                if !self.cancel_established() && !self.exit_interactive_mode() {
                    self.clear_selection();
                }
            }
        }
    }
}

/// Borrows only the fields it needs so the interaction manager stays free.
fn interaction_context<'a>(
    overlays: &'a OverlayMap,
    backend: &SharedBackend,
    media_bounds: Option<Rect>,
) -> InteractionContext<'a> {
    InteractionContext {
        overlays,
        scale: backend.borrow().get_scale(),
        media_bounds,
    }
}
