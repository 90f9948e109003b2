//! Pointer and keyboard interaction.
//!
//! The [`InteractionManager`] turns raw input into [`InteractionEffect`]s the
//! scene applies. It holds overlay ids only; geometry is read from the
//! scene's overlay map passed in through [`InteractionContext`].
//!
//! Per press the state machine runs
//! `Idle -> Pressed -> {Dragging | Resizing | Passive} -> Idle`, or
//! `Idle -> Establishing -> Idle` while interactive mode is on. Hover is
//! tracked separately and holds at most one overlay.

mod detection;

pub use detection::{DrawingState, InteractiveDetectionHandler};

use std::collections::HashMap;
use std::time::Duration;

use annoscene_core::{Key, KeyEvent, MouseButton, Point, PointerEvent, Rect};

use crate::config::InteractionConfig;
use crate::events::SceneEvent;
use crate::keybindings::{KeyAction, KeyBindings};
use crate::overlay::{ContainmentLevel, Overlay, OverlayId, ResizeHandle, SpatialGeometry};

/// Overlays by id, as owned by the scene.
pub type OverlayMap = HashMap<OverlayId, Overlay>;

/// Read-only view of the scene for one input event.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub overlays: &'a OverlayMap,
    /// World-to-screen zoom; screen-space thresholds are divided by it
    pub scale: f32,
    /// Pixel bounds of the canonical media
    pub media_bounds: Option<Rect>,
}

impl InteractionContext<'_> {
    fn to_world(&self, screen_px: f32) -> f32 {
        if self.scale > 0.0 {
            screen_px / self.scale
        } else {
            screen_px
        }
    }
}

/// Which kind of geometry edit finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryChange {
    Move,
    Transform,
}

/// Pointer shape hint for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    Pointer,
    Move,
    Grabbing,
    ResizeNorthSouth,
    ResizeEastWest,
    ResizeNorthWestSouthEast,
    ResizeNorthEastSouthWest,
    Crosshair,
}

impl CursorStyle {
    fn for_handle(handle: ResizeHandle) -> Self {
        match handle {
            ResizeHandle::North | ResizeHandle::South => CursorStyle::ResizeNorthSouth,
            ResizeHandle::East | ResizeHandle::West => CursorStyle::ResizeEastWest,
            ResizeHandle::NorthWest | ResizeHandle::SouthEast => {
                CursorStyle::ResizeNorthWestSouthEast
            }
            ResizeHandle::NorthEast | ResizeHandle::SouthWest => {
                CursorStyle::ResizeNorthEastSouthWest
            }
        }
    }
}

/// Something the scene must do in response to input.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    /// Publish an event as is
    Notify(SceneEvent),
    /// Hovered overlay changed
    HoverChanged {
        left: Option<OverlayId>,
        entered: Option<OverlayId>,
        point: Option<Point>,
    },
    /// Live geometry update during a drag or resize
    SetAbsoluteBounds { id: OverlayId, bounds: Rect },
    /// Put a cancelled drag or resize back
    RestoreGeometry { id: OverlayId, geometry: SpatialGeometry },
    /// Record a finished drag or resize as an undoable command
    CommitGeometry {
        id: OverlayId,
        before: SpatialGeometry,
        change: GeometryChange,
    },
    Click {
        target: Option<OverlayId>,
        point: Point,
        additive: bool,
    },
    DoubleClick { target: Option<OverlayId>, point: Point },
    /// Live bounds of the box being drawn
    EstablishUpdate { bounds: Rect },
    /// The box being drawn was thrown away
    EstablishDiscard,
    /// A box was drawn and waits for a label
    EstablishComplete { bounds: Rect },
    /// A key binding fired
    Action(KeyAction),
}

/// Pointer state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Button down, not yet moved past the click distance
    Pressed {
        target: Option<OverlayId>,
        start: Point,
        pressed_at: Duration,
        handle: Option<ResizeHandle>,
    },
    Dragging {
        id: OverlayId,
        start: Point,
        original: SpatialGeometry,
    },
    Resizing {
        id: OverlayId,
        handle: ResizeHandle,
        start: Point,
        original: SpatialGeometry,
    },
    /// Drawing a new box
    Establishing,
    /// Moved after pressing on nothing draggable; ignored until release
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Unhovered,
    Hovered(OverlayId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickRecord {
    point: Point,
    at: Duration,
}

/// Routes input to overlays in paint order.
#[derive(Debug, Clone, Default)]
pub struct InteractionManager {
    /// Interactive overlays, bottom first, mirroring the paint order
    handlers: Vec<OverlayId>,
    state: InteractionState,
    hover: HoverState,
    last_click: Option<ClickRecord>,
    aspect_locked: bool,
    detection: Option<InteractiveDetectionHandler>,
    config: InteractionConfig,
    keybindings: KeyBindings,
}

impl InteractionManager {
    pub fn new(config: InteractionConfig, keybindings: KeyBindings) -> Self {
        Self {
            config,
            keybindings,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn hovered(&self) -> Option<&OverlayId> {
        match &self.hover {
            HoverState::Hovered(id) => Some(id),
            HoverState::Unhovered => None,
        }
    }

    pub fn is_aspect_locked(&self) -> bool {
        self.aspect_locked
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    /// Replace the handler list with the interactive overlays of `order`.
    pub fn sync_handlers<'a>(
        &mut self,
        order: impl IntoIterator<Item = &'a OverlayId>,
        overlays: &OverlayMap,
    ) {
        self.handlers = order
            .into_iter()
            .filter(|id| overlays.get(*id).is_some_and(|o| o.is_hoverable()))
            .cloned()
            .collect();
    }

    pub fn handlers(&self) -> &[OverlayId] {
        &self.handlers
    }

    /// Drop every reference to an overlay being removed. Returns the hover
    /// change if it was hovered.
    pub fn forget(&mut self, id: &OverlayId) -> Option<InteractionEffect> {
        self.handlers.retain(|handler| handler != id);
        let unhover = if self.hovered() == Some(id) {
            self.clear_hover()
        } else {
            None
        };
        let targets_id = match &self.state {
            InteractionState::Pressed { target, .. } => target.as_ref() == Some(id),
            InteractionState::Dragging { id: active, .. }
            | InteractionState::Resizing { id: active, .. } => active == id,
            _ => false,
        };
        if targets_id {
            self.state = InteractionState::Idle;
        }
        unhover
    }

    /// Install the drawing handler; it intercepts all pointer input.
    pub fn install_detection(&mut self, handler: InteractiveDetectionHandler) {
        self.state = InteractionState::Idle;
        self.detection = Some(handler);
    }

    pub fn remove_detection(&mut self) -> Option<InteractiveDetectionHandler> {
        if self.state == InteractionState::Establishing {
            self.state = InteractionState::Idle;
        }
        self.detection.take()
    }

    pub fn detection(&self) -> Option<&InteractiveDetectionHandler> {
        self.detection.as_ref()
    }

    pub fn detection_mut(&mut self) -> Option<&mut InteractiveDetectionHandler> {
        self.detection.as_mut()
    }

    pub fn is_interactive(&self) -> bool {
        self.detection.is_some()
    }

    // ========================================================================
    // Hit testing
    // ========================================================================

    /// Handlers containing `point`, front-most first.
    pub fn candidates_at(&self, overlays: &OverlayMap, point: Point) -> Vec<OverlayId> {
        self.handlers
            .iter()
            .rev()
            .filter(|id| overlays.get(*id).is_some_and(|o| o.contains_point(point)))
            .cloned()
            .collect()
    }

    /// The handler that should receive input at `point`.
    ///
    /// One candidate wins outright. Otherwise a selected candidate wins, then
    /// the highest selection priority, then the front-most.
    pub fn find_handler_at_point(&self, overlays: &OverlayMap, point: Point) -> Option<OverlayId> {
        let candidates = self.candidates_at(overlays, point);
        if candidates.len() <= 1 {
            return candidates.into_iter().next();
        }

        if let Some(selected) = candidates
            .iter()
            .find(|id| overlays.get(*id).is_some_and(|o| o.is_selected()))
        {
            return Some(selected.clone());
        }

        let mut best: Option<(&OverlayId, i32)> = None;
        for id in &candidates {
            let Some(priority) = overlays.get(id).and_then(|o| o.selection_priority()) else {
                continue;
            };
            // Strictly greater keeps the front-most on ties.
            if best.is_none_or(|(_, best_priority)| priority > best_priority) {
                best = Some((id, priority));
            }
        }
        best.map(|(id, _)| id.clone())
            .or_else(|| candidates.into_iter().next())
    }

    /// Resize handle under `point` on the given overlay, if it is resizable.
    fn handle_at(&self, ctx: &InteractionContext<'_>, id: &OverlayId, point: Point) -> Option<ResizeHandle> {
        let overlay = ctx.overlays.get(id)?;
        if !overlay.is_resizable() {
            return None;
        }
        let tolerance = ctx.to_world(self.config.border_tolerance);
        if overlay.containment_level(point, tolerance) != ContainmentLevel::Border {
            return None;
        }
        ResizeHandle::at_point(&overlay.bounds()?, point, tolerance)
    }

    pub fn cursor_at(&self, ctx: &InteractionContext<'_>, point: Point) -> CursorStyle {
        match &self.state {
            InteractionState::Establishing => return CursorStyle::Crosshair,
            InteractionState::Dragging { .. } => return CursorStyle::Grabbing,
            InteractionState::Resizing { handle, .. } => return CursorStyle::for_handle(*handle),
            _ => {}
        }
        if self.detection.is_some() {
            return CursorStyle::Crosshair;
        }
        let Some(id) = self.find_handler_at_point(ctx.overlays, point) else {
            return CursorStyle::Default;
        };
        if let Some(handle) = self.handle_at(ctx, &id, point) {
            return CursorStyle::for_handle(handle);
        }
        match ctx.overlays.get(&id) {
            Some(overlay) if overlay.is_draggable() => CursorStyle::Move,
            Some(overlay) if overlay.is_selectable() => CursorStyle::Pointer,
            _ => CursorStyle::Default,
        }
    }

    // ========================================================================
    // Hover
    // ========================================================================

    /// Make `entered` the hovered overlay.
    pub fn set_hovered(&mut self, entered: Option<OverlayId>, point: Option<Point>) -> Option<InteractionEffect> {
        let left = self.hovered().cloned();
        if left == entered {
            return None;
        }
        self.hover = match &entered {
            Some(id) => HoverState::Hovered(id.clone()),
            None => HoverState::Unhovered,
        };
        Some(InteractionEffect::HoverChanged {
            left,
            entered,
            point,
        })
    }

    /// Re-evaluate which overlay is hovered at `point`.
    pub fn refresh_hover(&mut self, ctx: &InteractionContext<'_>, point: Point) -> Option<InteractionEffect> {
        let entered = self.find_handler_at_point(ctx.overlays, point);
        self.set_hovered(entered, Some(point))
    }

    /// Unhover whatever is hovered.
    pub fn clear_hover(&mut self) -> Option<InteractionEffect> {
        self.set_hovered(None, None)
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    pub fn pointer_down(&mut self, ctx: &InteractionContext<'_>, event: &PointerEvent) -> Vec<InteractionEffect> {
        if event.button != MouseButton::Left {
            return Vec::new();
        }
        let point = event.position;

        if let Some(detection) = self.detection.as_mut() {
            let bounds = detection.begin(point, ctx.media_bounds);
            self.state = InteractionState::Establishing;
            log::debug!("Establishing new box at ({:.1}, {:.1})", point.x, point.y);
            return vec![
                InteractionEffect::Notify(SceneEvent::EstablishStart { point }),
                InteractionEffect::EstablishUpdate { bounds },
            ];
        }

        let target = self.find_handler_at_point(ctx.overlays, point);
        let handle = target.as_ref().and_then(|id| self.handle_at(ctx, id, point));
        log::trace!("Pointer down at ({:.1}, {:.1}) on {:?}", point.x, point.y, target);
        self.state = InteractionState::Pressed {
            target,
            start: point,
            pressed_at: event.timestamp,
            handle,
        };
        Vec::new()
    }

    pub fn pointer_move(&mut self, ctx: &InteractionContext<'_>, event: &PointerEvent) -> Vec<InteractionEffect> {
        let point = event.position;
        let mut effects = Vec::new();

        match self.state.clone() {
            InteractionState::Idle => {
                effects.extend(self.refresh_hover(ctx, point));
            }
            InteractionState::Establishing => {
                if let Some(bounds) = self.detection.as_mut().and_then(|d| d.update(point)) {
                    effects.push(InteractionEffect::EstablishUpdate { bounds });
                    effects.push(InteractionEffect::Notify(SceneEvent::EstablishMove { bounds }));
                }
            }
            InteractionState::Pressed {
                target,
                start,
                handle,
                ..
            } => {
                if point.distance_to(start) < ctx.to_world(self.config.click_distance) {
                    return effects;
                }
                let geometry = target.as_ref().and_then(|id| {
                    let overlay = ctx.overlays.get(id)?;
                    if !overlay.is_draggable() {
                        return None;
                    }
                    overlay.as_bounding_box().map(|bbox| (id.clone(), bbox.geometry()))
                });
                let Some((id, original)) = geometry else {
                    self.state = InteractionState::Passive;
                    return effects;
                };

                effects.extend(self.clear_hover());
                match handle {
                    Some(handle) => {
                        log::debug!("Resize start on {} ({:?})", id, handle);
                        effects.push(InteractionEffect::Notify(SceneEvent::ResizeStart {
                            id: id.clone(),
                            point: start,
                        }));
                        self.state = InteractionState::Resizing {
                            id,
                            handle,
                            start,
                            original,
                        };
                    }
                    None => {
                        log::debug!("Drag start on {}", id);
                        effects.push(InteractionEffect::Notify(SceneEvent::DragStart {
                            id: id.clone(),
                            point: start,
                        }));
                        self.state = InteractionState::Dragging { id, start, original };
                    }
                }
                effects.extend(self.continue_edit(event));
            }
            InteractionState::Dragging { .. } | InteractionState::Resizing { .. } => {
                effects.extend(self.continue_edit(event));
            }
            InteractionState::Passive => {}
        }
        effects
    }

    /// Live update of an in-progress drag or resize.
    fn continue_edit(&self, event: &PointerEvent) -> Vec<InteractionEffect> {
        let point = event.position;
        match &self.state {
            InteractionState::Dragging { id, start, original } => {
                let (dx, dy) = point.delta_from(*start);
                let bounds = original.absolute.translate(dx, dy);
                vec![
                    InteractionEffect::SetAbsoluteBounds {
                        id: id.clone(),
                        bounds,
                    },
                    InteractionEffect::Notify(SceneEvent::DragMove {
                        id: id.clone(),
                        bounds,
                    }),
                ]
            }
            InteractionState::Resizing {
                id,
                handle,
                start,
                original,
            } => {
                let (dx, dy) = point.delta_from(*start);
                let locked = self.aspect_locked || event.modifiers.shift;
                // Too small: ignore this move, keep the last valid bounds.
                let Some(bounds) =
                    handle.apply(&original.absolute, dx, dy, locked, self.config.min_box_size)
                else {
                    return Vec::new();
                };
                vec![
                    InteractionEffect::SetAbsoluteBounds {
                        id: id.clone(),
                        bounds,
                    },
                    InteractionEffect::Notify(SceneEvent::ResizeMove {
                        id: id.clone(),
                        bounds,
                    }),
                ]
            }
            _ => Vec::new(),
        }
    }

    pub fn pointer_up(&mut self, ctx: &InteractionContext<'_>, event: &PointerEvent) -> Vec<InteractionEffect> {
        if event.button != MouseButton::Left {
            return Vec::new();
        }
        let point = event.position;
        let mut effects = Vec::new();

        match std::mem::take(&mut self.state) {
            InteractionState::Idle => return effects,
            InteractionState::Establishing => {
                let min_size = self.config.min_establish_size;
                match self.detection.as_mut().and_then(|d| d.finish(min_size)) {
                    Some(bounds) => effects.push(InteractionEffect::EstablishComplete { bounds }),
                    None => effects.push(InteractionEffect::EstablishDiscard),
                }
                return effects;
            }
            InteractionState::Pressed {
                target, pressed_at, ..
            } => {
                let held = event.timestamp.saturating_sub(pressed_at);
                if held <= Duration::from_millis(self.config.click_time_ms) {
                    effects.push(self.register_click(ctx, target, point, event));
                } else {
                    log::trace!("Long press ({:?}), not a click", held);
                }
            }
            InteractionState::Dragging { id, original, .. } => {
                let bounds = current_bounds(ctx, &id).unwrap_or(original.absolute);
                log::debug!("Drag end on {}", id);
                effects.push(InteractionEffect::Notify(SceneEvent::DragEnd {
                    id: id.clone(),
                    bounds,
                }));
                effects.push(InteractionEffect::CommitGeometry {
                    id,
                    before: original,
                    change: GeometryChange::Move,
                });
            }
            InteractionState::Resizing { id, original, .. } => {
                let bounds = current_bounds(ctx, &id).unwrap_or(original.absolute);
                log::debug!("Resize end on {}", id);
                effects.push(InteractionEffect::Notify(SceneEvent::ResizeEnd {
                    id: id.clone(),
                    bounds,
                }));
                effects.push(InteractionEffect::CommitGeometry {
                    id,
                    before: original,
                    change: GeometryChange::Transform,
                });
            }
            InteractionState::Passive => {}
        }

        effects.extend(self.refresh_hover(ctx, point));
        effects
    }

    fn register_click(
        &mut self,
        ctx: &InteractionContext<'_>,
        target: Option<OverlayId>,
        point: Point,
        event: &PointerEvent,
    ) -> InteractionEffect {
        let double_distance = ctx.to_world(self.config.double_click_distance);
        let double_window = Duration::from_millis(self.config.double_click_time_ms);
        let is_double = self.last_click.is_some_and(|last| {
            point.distance_to(last.point) <= double_distance
                && event.timestamp.saturating_sub(last.at) <= double_window
        });

        if is_double {
            self.last_click = None;
            InteractionEffect::DoubleClick { target, point }
        } else {
            self.last_click = Some(ClickRecord {
                point,
                at: event.timestamp,
            });
            InteractionEffect::Click {
                target,
                point,
                additive: event.modifiers.shift || event.modifiers.command(),
            }
        }
    }

    pub fn pointer_leave(&mut self) -> Vec<InteractionEffect> {
        self.clear_hover().into_iter().collect()
    }

    // ========================================================================
    // Keyboard input
    // ========================================================================

    pub fn key_down(&mut self, event: &KeyEvent) -> Vec<InteractionEffect> {
        if event.key == Key::Shift {
            self.aspect_locked = true;
            return Vec::new();
        }
        match self.keybindings.action_for(event) {
            Some(KeyAction::Cancel) => self.cancel(),
            Some(action) => vec![InteractionEffect::Action(action)],
            None => Vec::new(),
        }
    }

    pub fn key_up(&mut self, event: &KeyEvent) -> Vec<InteractionEffect> {
        if event.key == Key::Shift {
            self.aspect_locked = false;
        }
        Vec::new()
    }

    /// Abort whatever is in progress; with nothing in progress the cancel
    /// is passed on to the scene.
    fn cancel(&mut self) -> Vec<InteractionEffect> {
        match std::mem::take(&mut self.state) {
            InteractionState::Establishing => {
                if let Some(detection) = self.detection.as_mut() {
                    detection.cancel();
                }
                vec![InteractionEffect::EstablishDiscard]
            }
            InteractionState::Dragging { id, original, .. }
            | InteractionState::Resizing { id, original, .. } => {
                log::debug!("Edit of {} cancelled", id);
                vec![InteractionEffect::RestoreGeometry {
                    id,
                    geometry: original,
                }]
            }
            _ => vec![InteractionEffect::Action(KeyAction::Cancel)],
        }
    }
}

fn current_bounds(ctx: &InteractionContext<'_>, id: &OverlayId) -> Option<Rect> {
    ctx.overlays.get(id).and_then(|o| o.bounds())
}
