//! Paint order, visibility and rotation through stacked overlays.
//!
//! Index 0 is painted first. The canonical media is always at index 0 and
//! the last index is the front-most overlay, which is also the first to
//! receive input.

use std::collections::HashSet;

use annoscene_core::Point;

use crate::error::SceneError;
use crate::interaction::OverlayMap;
use crate::overlay::OverlayId;

use super::Scene;

/// Result of a paint-order computation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintOrder {
    /// Full order, bottom first
    pub order: Vec<OverlayId>,
    /// The overlays under the pointer as arranged in `order`, bottom first
    pub contained: Vec<OverlayId>,
}

/// Arrange overlays for painting.
///
/// `base` holds every non-media overlay in its base order (insertion order
/// or whatever was last set explicitly). Overlays are binned by field in
/// `active_paths` order, with unbinned overlays after them. Overlays under
/// `pointer` are then lifted to the front, rotated by `rotation` (clamped to
/// the number of such overlays).
pub fn compute_paint_order(
    base: &[OverlayId],
    canonical: Option<&OverlayId>,
    overlays: &OverlayMap,
    active_paths: &[String],
    pointer: Option<Point>,
    rotation: usize,
) -> PaintOrder {
    let (mut contained, not_contained): (Vec<OverlayId>, Vec<OverlayId>) =
        bin_by_field(base, overlays, active_paths)
            .into_iter()
            .cloned()
            .partition(|id| {
                pointer.is_some_and(|point| overlays.get(id).is_some_and(|o| o.contains_point(point)))
            });

    if !contained.is_empty() {
        let shift = rotation.min(contained.len() - 1);
        contained.rotate_left(shift);
    }

    let mut order = Vec::with_capacity(base.len() + 1);
    order.extend(canonical.cloned());
    order.extend(not_contained);
    order.extend(contained.iter().cloned());
    PaintOrder { order, contained }
}

/// `base` grouped by field in `active_paths` order, unbinned overlays last.
/// Without active paths this is `base` itself.
pub(super) fn bin_by_field<'a>(
    base: &'a [OverlayId],
    overlays: &OverlayMap,
    active_paths: &[String],
) -> Vec<&'a OverlayId> {
    if active_paths.is_empty() {
        return base.iter().collect();
    }
    let field_of = |id: &OverlayId| overlays.get(id).and_then(|o| o.field());
    let mut binned = Vec::with_capacity(base.len());
    for path in active_paths {
        binned.extend(base.iter().filter(|id| field_of(id) == Some(path.as_str())));
    }
    binned.extend(base.iter().filter(|id| {
        field_of(id).is_none_or(|field| !active_paths.iter().any(|path| path == field))
    }));
    binned
}

impl Scene {
    /// Current paint order, bottom first.
    pub fn overlay_order(&self) -> &[OverlayId] {
        &self.overlay_order
    }

    /// Replace the base order.
    ///
    /// `order` must name every non-media overlay exactly once. The canonical
    /// media may be included anywhere or left out; it stays at index 0.
    pub fn set_overlay_order(&mut self, order: Vec<OverlayId>) -> Result<(), SceneError> {
        let mut seen = HashSet::new();
        let mut base = Vec::with_capacity(order.len());
        for id in order {
            if !self.overlays.contains_key(&id) {
                return Err(SceneError::not_found(&id));
            }
            if !seen.insert(id.clone()) {
                return Err(SceneError::invalid_order(format!("'{}' appears twice", id)));
            }
            if Some(&id) != self.canonical_media.as_ref() {
                base.push(id);
            }
        }
        if base.len() != self.base_order.len() {
            return Err(SceneError::invalid_order(format!(
                "expected {} overlays, got {}",
                self.base_order.len(),
                base.len()
            )));
        }
        self.base_order = base;
        self.recompute_order();
        Ok(())
    }

    /// Recompute paint order, visibility and the interaction handler list.
    pub(crate) fn recompute_order(&mut self) {
        let computed = compute_paint_order(
            &self.base_order,
            self.canonical_media.as_ref(),
            &self.overlays,
            &self.options.active_paths,
            self.pointer,
            self.rotation,
        );

        // A different set of overlays under the pointer starts a new cycle.
        let mut candidates = computed.contained.clone();
        candidates.sort();
        if candidates != self.rotation_candidates {
            self.rotation_candidates = candidates;
            if self.rotation != 0 {
                self.rotation = 0;
                self.recompute_order();
                return;
            }
        }

        if computed.order != self.overlay_order {
            for (index, id) in computed.order.iter().enumerate() {
                if self.overlay_order.get(index) != Some(id) {
                    if let Some(overlay) = self.overlays.get_mut(id) {
                        overlay.mark_dirty();
                    }
                }
            }
            log::trace!("Paint order: {:?}", computed.order);
            self.overlay_order = computed.order;
        }
        self.contained = computed.contained;

        self.update_visibility();
        let visible: Vec<OverlayId> = self
            .overlay_order
            .iter()
            .filter(|id| !self.hidden.contains(*id))
            .cloned()
            .collect();
        self.interaction.sync_handlers(&visible, &self.overlays);
    }

    fn update_visibility(&mut self) {
        let front_most = self.contained.last();
        let hidden: HashSet<OverlayId> = self
            .overlay_order
            .iter()
            .filter(|id| Some(*id) != self.canonical_media.as_ref())
            .filter(|id| {
                !self.options.show_overlays
                    || (self.options.only_show_hovered && Some(*id) != front_most)
            })
            .cloned()
            .collect();
        if hidden == self.hidden {
            return;
        }

        let mut backend = self.backend.borrow_mut();
        for id in hidden.difference(&self.hidden) {
            backend.hide(id);
        }
        for id in self.hidden.difference(&hidden) {
            backend.show(id);
            if let Some(overlay) = self.overlays.get_mut(id) {
                overlay.mark_dirty();
            }
        }
        drop(backend);
        self.hidden = hidden;
    }

    /// Whether an overlay is currently shown.
    pub fn is_visible(&self, id: &OverlayId) -> bool {
        self.overlays.contains_key(id) && !self.hidden.contains(id)
    }

    /// Current rotation through the overlays under the pointer.
    pub fn rotation_index(&self) -> usize {
        self.rotation
    }

    /// Bring the next overlay under the pointer to the front.
    pub fn rotate_next(&mut self) -> bool {
        self.rotate(true)
    }

    /// Bring the previous overlay under the pointer to the front.
    pub fn rotate_previous(&mut self) -> bool {
        self.rotate(false)
    }

    fn rotate(&mut self, forward: bool) -> bool {
        let count = self.rotation_candidates.len();
        if self.pointer.is_none() || count < 2 {
            return false;
        }

        if let Some(effect) = self.interaction.clear_hover() {
            self.apply_effect(effect);
        }

        self.rotation = if forward {
            (self.rotation + 1) % count
        } else {
            (self.rotation + count - 1) % count
        };
        log::debug!("Rotation index {} of {}", self.rotation, count);

        let before = self.contained.clone();
        self.recompute_order();
        if self.contained != before {
            for id in &self.contained {
                if let Some(overlay) = self.overlays.get_mut(id) {
                    overlay.mark_dirty();
                }
            }
            let front_most = self
                .contained
                .iter()
                .rev()
                .find(|id| !self.hidden.contains(*id))
                .cloned();
            if let Some(effect) = self.interaction.set_hovered(front_most, self.pointer) {
                self.apply_effect(effect);
            }
        }
        true
    }
}
