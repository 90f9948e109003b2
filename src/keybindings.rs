//! Customizable keybindings for scene editing.
//!
//! Maps key chords to [`KeyAction`]s. Each action may have several chords
//! (redo is both Ctrl+Shift+Z and Ctrl+Y by default). "Ctrl" means Ctrl or
//! Cmd, see [`Modifiers::command`].

use std::fmt;

use annoscene_core::{Key, KeyEvent, Modifiers};
use serde::{Deserialize, Serialize};

/// Editing actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAction {
    Undo,
    Redo,
    DeleteSelection,
    Cancel,
    RotateNext,
    RotatePrevious,
}

impl KeyAction {
    /// Get the display name for this action.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAction::Undo => "Undo",
            KeyAction::Redo => "Redo",
            KeyAction::DeleteSelection => "Delete selection",
            KeyAction::Cancel => "Cancel",
            KeyAction::RotateNext => "Next overlapping overlay",
            KeyAction::RotatePrevious => "Previous overlapping overlay",
        }
    }

    /// Get all actions.
    pub fn all() -> &'static [KeyAction] {
        &[
            KeyAction::Undo,
            KeyAction::Redo,
            KeyAction::DeleteSelection,
            KeyAction::Cancel,
            KeyAction::RotateNext,
            KeyAction::RotatePrevious,
        ]
    }
}

/// A key plus the modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub key: Key,
    /// Ctrl or Cmd
    #[serde(default)]
    pub command: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyChord {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            command: false,
            shift: false,
        }
    }

    pub fn command(key: Key) -> Self {
        Self {
            key,
            command: true,
            shift: false,
        }
    }

    pub fn command_shift(key: Key) -> Self {
        Self {
            key,
            command: true,
            shift: true,
        }
    }

    /// Check whether a key press matches this chord.
    ///
    /// Character keys compare case-insensitively because hosts report
    /// Shift+Z as either 'z' or 'Z'.
    pub fn matches(&self, key: Key, modifiers: &Modifiers) -> bool {
        let same_key = match (self.key, key) {
            (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        };
        same_key && self.command == modifiers.command() && self.shift == modifiers.shift
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.command {
            write!(f, "Ctrl+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Keybinding configuration for a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub undo: Vec<KeyChord>,
    pub redo: Vec<KeyChord>,
    pub delete_selection: Vec<KeyChord>,
    pub cancel: Vec<KeyChord>,
    pub rotate_next: Vec<KeyChord>,
    pub rotate_previous: Vec<KeyChord>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            undo: vec![KeyChord::command(Key::Char('z'))],
            redo: vec![
                KeyChord::command_shift(Key::Char('z')),
                KeyChord::command(Key::Char('y')),
            ],
            delete_selection: vec![KeyChord::plain(Key::Delete), KeyChord::plain(Key::Backspace)],
            cancel: vec![KeyChord::plain(Key::Escape)],
            rotate_next: vec![KeyChord::plain(Key::Char(']'))],
            rotate_previous: vec![KeyChord::plain(Key::Char('['))],
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the chords bound to an action.
    pub fn chords_for(&self, action: KeyAction) -> &[KeyChord] {
        match action {
            KeyAction::Undo => &self.undo,
            KeyAction::Redo => &self.redo,
            KeyAction::DeleteSelection => &self.delete_selection,
            KeyAction::Cancel => &self.cancel,
            KeyAction::RotateNext => &self.rotate_next,
            KeyAction::RotatePrevious => &self.rotate_previous,
        }
    }

    fn chords_for_mut(&mut self, action: KeyAction) -> &mut Vec<KeyChord> {
        match action {
            KeyAction::Undo => &mut self.undo,
            KeyAction::Redo => &mut self.redo,
            KeyAction::DeleteSelection => &mut self.delete_selection,
            KeyAction::Cancel => &mut self.cancel,
            KeyAction::RotateNext => &mut self.rotate_next,
            KeyAction::RotatePrevious => &mut self.rotate_previous,
        }
    }

    /// Get the action a key press triggers, if any.
    ///
    /// Presses while a text field has focus never trigger actions.
    pub fn action_for(&self, event: &KeyEvent) -> Option<KeyAction> {
        if event.text_input_focused {
            return None;
        }
        KeyAction::all().iter().copied().find(|action| {
            self.chords_for(*action)
                .iter()
                .any(|chord| chord.matches(event.key, &event.modifiers))
        })
    }

    /// Replace the chords for an action.
    pub fn set_chords(&mut self, action: KeyAction, chords: Vec<KeyChord>) {
        *self.chords_for_mut(action) = chords;
    }

    /// Check if a chord is already used by another action.
    /// Returns a description of what it's used for, if anything.
    pub fn key_conflict(&self, chord: &KeyChord, exclude: Option<KeyAction>) -> Option<String> {
        KeyAction::all()
            .iter()
            .filter(|action| Some(**action) != exclude)
            .find(|action| self.chords_for(**action).contains(chord))
            .map(|action| format!("{} ({})", action.name(), chord))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::new(key, modifiers)
    }

    #[test]
    fn test_default_undo_redo() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.action_for(&press(Key::Char('z'), Modifiers::ctrl())),
            Some(KeyAction::Undo)
        );
        assert_eq!(
            bindings.action_for(&press(Key::Char('Z'), Modifiers::ctrl().with_shift())),
            Some(KeyAction::Redo)
        );
        assert_eq!(
            bindings.action_for(&press(Key::Char('y'), Modifiers::meta())),
            Some(KeyAction::Redo)
        );
        assert_eq!(bindings.action_for(&press(Key::Char('z'), Modifiers::none())), None);
    }

    #[test]
    fn test_text_field_focus_ignored() {
        let bindings = KeyBindings::default();
        let event = press(Key::Char('z'), Modifiers::ctrl()).in_text_field();
        assert_eq!(bindings.action_for(&event), None);
    }

    #[test]
    fn test_key_conflict() {
        let bindings = KeyBindings::default();
        let chord = KeyChord::plain(Key::Escape);
        assert!(bindings.key_conflict(&chord, None).is_some());
        assert!(bindings.key_conflict(&chord, Some(KeyAction::Cancel)).is_none());
        assert!(bindings.key_conflict(&KeyChord::plain(Key::Tab), None).is_none());
    }

    #[test]
    fn test_rebinding() {
        let mut bindings = KeyBindings::default();
        bindings.set_chords(KeyAction::RotateNext, vec![KeyChord::plain(Key::Tab)]);
        assert_eq!(
            bindings.action_for(&press(Key::Tab, Modifiers::none())),
            Some(KeyAction::RotateNext)
        );
        assert_eq!(bindings.action_for(&press(Key::Char(']'), Modifiers::none())), None);
    }

    #[test]
    fn test_chord_display() {
        assert_eq!(KeyChord::command_shift(Key::Char('z')).to_string(), "Ctrl+Shift+Z");
        assert_eq!(KeyChord::plain(Key::Delete).to_string(), "Delete");
    }
}
