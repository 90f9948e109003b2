//! Undoable scene mutations.
//!
//! Commands are plain snapshots; this is where they are applied to the
//! scene, forward for execute/redo and backward for undo.

use annoscene_core::Rect;

use crate::error::SceneError;
use crate::events::SceneEvent;
use crate::overlay::{Label, OverlayId};
use crate::undo::{Command, CommandKind};

use super::Scene;

impl Scene {
    /// Apply a command and record it in the history.
    pub(super) fn execute_command(&mut self, command: Command) {
        self.apply_forward(command.kind());
        self.record_executed(command);
    }

    /// Record a command whose effects were already applied.
    pub(super) fn record_executed(&mut self, command: Command) {
        log::debug!("Executed: '{}'", command.description());
        self.emit(SceneEvent::CommandExecuted {
            command_id: command.id(),
            description: command.description(),
        });
        self.undo_stack.push(command);
    }

    /// Undo the most recent command. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(command) = self.undo_stack.pop_undo() else {
            return false;
        };
        self.apply_backward(command.kind());
        self.emit(SceneEvent::CommandUndone {
            command_id: command.id(),
            description: command.description(),
        });
        true
    }

    /// Redo the most recently undone command.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.undo_stack.pop_redo() else {
            return false;
        };
        self.apply_forward(command.kind());
        self.emit(SceneEvent::CommandRedone {
            command_id: command.id(),
            description: command.description(),
        });
        true
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.undo_stack.redo_description()
    }

    /// Drop the whole history. Returns how many commands were dropped.
    pub fn clear_history(&mut self) -> usize {
        self.undo_stack.clear()
    }

    pub(super) fn apply_forward(&mut self, kind: &CommandKind) {
        match kind {
            CommandKind::AddOverlay { overlay } => {
                if self.overlays.contains_key(overlay.id()) {
                    log::warn!("Overlay '{}' already present, skipping add", overlay.id());
                    return;
                }
                self.insert_overlay(overlay.as_ref().clone(), None);
            }
            CommandKind::RemoveOverlay { overlay, .. } => {
                if let Err(e) = self.detach_overlay(overlay.id()) {
                    log::warn!("Remove failed: {}", e);
                }
            }
            CommandKind::Move {
                overlay_id, after, ..
            }
            | CommandKind::Transform {
                overlay_id, after, ..
            } => self.place_relative(overlay_id, *after),
            CommandKind::UpdateLabel {
                overlay_id, after, ..
            } => self.replace_label(overlay_id, after.clone()),
            CommandKind::EnterDrawingMode { field } => self.start_drawing_session(field.clone()),
            CommandKind::ExitDrawingMode { .. } => self.end_drawing_session(),
            CommandKind::Batch { commands, .. } => {
                for command in commands {
                    self.apply_forward(command);
                }
            }
        }
    }

    pub(super) fn apply_backward(&mut self, kind: &CommandKind) {
        match kind {
            CommandKind::AddOverlay { overlay } => {
                if let Err(e) = self.detach_overlay(overlay.id()) {
                    log::warn!("Undo of add failed: {}", e);
                }
            }
            CommandKind::RemoveOverlay {
                overlay,
                index,
                was_canonical,
            } => {
                if self.overlays.contains_key(overlay.id()) {
                    log::warn!("Overlay '{}' already present, skipping restore", overlay.id());
                    return;
                }
                let id = overlay.id().clone();
                self.insert_overlay(overlay.as_ref().clone(), Some(*index));
                if *was_canonical && self.canonical_media.as_ref() != Some(&id) {
                    if let Err(e) = self.set_canonical_media(&id) {
                        log::warn!("Could not restore canonical media: {}", e);
                    }
                }
            }
            CommandKind::Move {
                overlay_id, before, ..
            }
            | CommandKind::Transform {
                overlay_id, before, ..
            } => self.place_relative(overlay_id, *before),
            CommandKind::UpdateLabel {
                overlay_id, before, ..
            } => self.replace_label(overlay_id, before.clone()),
            CommandKind::EnterDrawingMode { .. } => self.end_drawing_session(),
            CommandKind::ExitDrawingMode { field } => self.start_drawing_session(field.clone()),
            CommandKind::Batch { commands, .. } => {
                for command in commands.iter().rev() {
                    self.apply_backward(command);
                }
            }
        }
    }

    fn place_relative(&mut self, id: &OverlayId, relative: Rect) {
        let Some(overlay) = self.overlays.get_mut(id) else {
            log::warn!("Overlay '{}' missing, cannot reposition", id);
            return;
        };
        let Some(bbox) = overlay.as_bounding_box_mut() else {
            return;
        };
        bbox.set_relative_bounds(relative, &self.coordinates);
        let absolute = bbox.absolute_bounds();
        overlay.mark_dirty();
        self.emit(SceneEvent::OverlayBoundsChanged {
            id: id.clone(),
            relative: Some(relative),
            absolute,
        });
        self.recompute_order();
    }

    fn replace_label(&mut self, id: &OverlayId, label: Label) {
        let Some(overlay) = self.overlays.get_mut(id) else {
            log::warn!("Overlay '{}' missing, cannot relabel", id);
            return;
        };
        overlay.set_label(label.clone());
        // Label width changes the stacked layout of every classification.
        if overlay.is_classification() {
            self.mark_classifications_dirty();
        }
        self.emit(SceneEvent::LabelChanged {
            id: id.clone(),
            label,
        });
    }

    // ========================================================================
    // Geometry and label edits
    // ========================================================================

    /// Translate a bounding box by a pixel offset.
    pub fn move_overlay(&mut self, id: &OverlayId, dx: f32, dy: f32, with_undo: bool) -> Result<(), SceneError> {
        let bbox = self
            .overlays
            .get(id)
            .ok_or_else(|| SceneError::not_found(id))?
            .as_bounding_box()
            .ok_or_else(|| SceneError::NotSpatial { id: id.clone() })?;
        let before = bbox.relative_bounds();
        let after = self
            .coordinates
            .absolute_to_relative(&bbox.absolute_bounds().translate(dx, dy));
        self.edit_geometry(
            CommandKind::Move {
                overlay_id: id.clone(),
                before,
                after,
            },
            with_undo,
        );
        Ok(())
    }

    /// Give a bounding box new relative bounds.
    pub fn transform_overlay(&mut self, id: &OverlayId, relative: Rect, with_undo: bool) -> Result<(), SceneError> {
        let before = self
            .overlays
            .get(id)
            .ok_or_else(|| SceneError::not_found(id))?
            .as_bounding_box()
            .ok_or_else(|| SceneError::NotSpatial { id: id.clone() })?
            .relative_bounds();
        self.edit_geometry(
            CommandKind::Transform {
                overlay_id: id.clone(),
                before,
                after: relative,
            },
            with_undo,
        );
        Ok(())
    }

    fn edit_geometry(&mut self, kind: CommandKind, with_undo: bool) {
        if with_undo {
            self.execute_command(Command::new(kind));
        } else {
            self.apply_forward(&kind);
        }
    }

    /// Replace an overlay's label payload.
    pub fn update_label(&mut self, id: &OverlayId, label: Label, with_undo: bool) -> Result<(), SceneError> {
        let before = self
            .overlays
            .get(id)
            .ok_or_else(|| SceneError::not_found(id))?
            .label()
            .clone();
        if before == label {
            return Ok(());
        }
        let kind = CommandKind::UpdateLabel {
            overlay_id: id.clone(),
            before,
            after: label,
        };
        if with_undo {
            self.execute_command(Command::new(kind));
        } else {
            self.apply_forward(&kind);
        }
        Ok(())
    }
}
