//! Single/multi selection over registered overlays.
//!
//! The manager only knows overlay ids. The scene mirrors every change onto
//! the overlays' own `selected` flags.

use std::collections::HashSet;

use crate::overlay::OverlayId;

/// Ids whose selection state changed in one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionChange {
    pub selected: Vec<OverlayId>,
    pub deselected: Vec<OverlayId>,
}

impl SelectionChange {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deselected.is_empty()
    }
}

/// Tracks which selectable overlays are selected, in selection order.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selectable: HashSet<OverlayId>,
    selected: Vec<OverlayId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: OverlayId) {
        self.selectable.insert(id);
    }

    /// Forget an overlay. Returns true if it was selected.
    pub fn unregister(&mut self, id: &OverlayId) -> bool {
        self.selectable.remove(id);
        let before = self.selected.len();
        self.selected.retain(|selected| selected != id);
        before != self.selected.len()
    }

    pub fn is_registered(&self, id: &OverlayId) -> bool {
        self.selectable.contains(id)
    }

    pub fn is_selected(&self, id: &OverlayId) -> bool {
        self.selected.contains(id)
    }

    /// Selected ids, oldest first.
    pub fn selected_ids(&self) -> &[OverlayId] {
        &self.selected
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Select `id`. Without `additive`, everything else is deselected.
    pub fn select(&mut self, id: &OverlayId, additive: bool) -> SelectionChange {
        let mut change = SelectionChange::default();
        if !self.selectable.contains(id) {
            return change;
        }
        if !additive {
            let (keep, drop): (Vec<_>, Vec<_>) =
                self.selected.drain(..).partition(|selected| selected == id);
            self.selected = keep;
            change.deselected = drop;
        }
        if !self.selected.contains(id) {
            self.selected.push(id.clone());
            change.selected.push(id.clone());
        }
        change
    }

    pub fn deselect(&mut self, id: &OverlayId) -> SelectionChange {
        let mut change = SelectionChange::default();
        if let Some(index) = self.selected.iter().position(|selected| selected == id) {
            change.deselected.push(self.selected.remove(index));
        }
        change
    }

    /// Flip one id, leaving the rest of the selection alone.
    pub fn toggle(&mut self, id: &OverlayId) -> SelectionChange {
        if self.is_selected(id) {
            self.deselect(id)
        } else {
            self.select(id, true)
        }
    }

    pub fn clear(&mut self) -> SelectionChange {
        SelectionChange {
            selected: Vec::new(),
            deselected: std::mem::take(&mut self.selected),
        }
    }
}
