//! Undo/Redo system for scene operations.
//!
//! Every undoable mutation is a [`Command`] carrying enough prior and next
//! state to reverse itself exactly. The [`UndoStack`] only stores commands;
//! the scene applies them (see `scene::commands`).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use annoscene_core::Rect;

use crate::config::UndoConfig;
use crate::overlay::{Label, Overlay, OverlayId};

// ============================================================================
// Command Types
// ============================================================================

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id of a command.
pub type CommandId = u64;

/// The reversible operation itself.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Add an overlay
    AddOverlay {
        /// Snapshot of the overlay as added
        overlay: Box<Overlay>,
    },
    /// Remove an overlay
    RemoveOverlay {
        /// Snapshot of the overlay as removed
        overlay: Box<Overlay>,
        /// Its position in the paint order
        index: usize,
        /// Whether it was the canonical media
        was_canonical: bool,
    },
    /// Translate a spatial overlay
    Move {
        overlay_id: OverlayId,
        /// Relative bounds before the move
        before: Rect,
        /// Relative bounds after the move
        after: Rect,
    },
    /// Resize (or otherwise reshape) a spatial overlay
    Transform {
        overlay_id: OverlayId,
        before: Rect,
        after: Rect,
    },
    /// Replace an overlay's label payload
    UpdateLabel {
        overlay_id: OverlayId,
        before: Label,
        after: Label,
    },
    /// Start a drawing session for new boxes
    EnterDrawingMode {
        /// Field new boxes are created in
        field: Option<String>,
    },
    /// End a drawing session
    ExitDrawingMode {
        /// Field the session was drawing in
        field: Option<String>,
    },
    /// Several commands undone and redone as one step
    Batch {
        description: String,
        commands: Vec<CommandKind>,
    },
}

impl CommandKind {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            CommandKind::AddOverlay { overlay } => format!("Add overlay '{}'", overlay.id()),
            CommandKind::RemoveOverlay { overlay, .. } => {
                format!("Remove overlay '{}'", overlay.id())
            }
            CommandKind::Move { overlay_id, .. } => format!("Move '{}'", overlay_id),
            CommandKind::Transform { overlay_id, .. } => format!("Resize '{}'", overlay_id),
            CommandKind::UpdateLabel { overlay_id, .. } => format!("Relabel '{}'", overlay_id),
            CommandKind::EnterDrawingMode { .. } => "Draw new box".to_string(),
            CommandKind::ExitDrawingMode { .. } => "Stop drawing".to_string(),
            CommandKind::Batch { description, .. } => description.clone(),
        }
    }
}

/// A command with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    id: CommandId,
    kind: CommandKind,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            id: NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn description(&self) -> String {
        self.kind.description()
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// The undo/redo history stack.
///
/// Maintains two stacks:
/// - `undo_stack`: Commands that can be undone (most recent at the back)
/// - `redo_stack`: Commands that can be redone (most recent at the end)
///
/// Pushing a new command clears the redo stack. Both stacks are bounded by
/// `max_history`; the oldest undo entry is evicted first.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    config: UndoConfig,
}

impl UndoStack {
    /// Create a new empty undo stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a command that has already been executed.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, command: Command) {
        log::debug!("Undo: pushed '{}' (#{})", command.description(), command.id());
        self.undo_stack.push_back(command);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.config.max_history {
            if let Some(evicted) = self.undo_stack.pop_front() {
                log::trace!("Undo: evicted '{}'", evicted.description());
            }
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop a command for undoing. The command is moved to the redo stack.
    pub fn pop_undo(&mut self) -> Option<Command> {
        let cmd = self.undo_stack.pop_back()?;
        log::debug!("Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        if self.redo_stack.len() > self.config.max_history {
            self.redo_stack.remove(0);
        }
        Some(cmd)
    }

    /// Pop a command for redoing. The command is moved back to the undo stack.
    pub fn pop_redo(&mut self) -> Option<Command> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("Redo: '{}'", cmd.description());
        self.undo_stack.push_back(cmd.clone());
        Some(cmd)
    }

    /// Get the description of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Get the description of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.description())
    }

    /// Clear all history, releasing the overlay snapshots commands hold.
    /// Returns the number of commands dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.undo_stack.len() + self.redo_stack.len();
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("Undo history cleared ({} commands)", dropped);
        dropped
    }

    /// Get the number of commands in undo history
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of commands in redo history
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
