use annoscene_core::{Key, KeyEvent, Modifiers};
use serde_json::json;

use super::*;
use crate::error::SceneError;
use crate::interaction::CursorStyle;
use crate::scene::SceneOptions;

/// Three boxes overlapping at (60, 30) plus one far away.
fn stacked() -> Harness {
    let mut h = Harness::with_media();
    h.add_box("a", Rect::new(0.1, 0.1, 0.3, 0.3));
    h.add_box("b", Rect::new(0.2, 0.2, 0.3, 0.3));
    h.add_box("c", Rect::new(0.25, 0.25, 0.3, 0.3));
    h.add_box("d", Rect::new(0.8, 0.8, 0.1, 0.1));
    h
}

fn press_key(h: &mut Harness, key: Key) {
    h.scene
        .handle_event(Event::KeyDown(KeyEvent::new(key, Modifiers::none())));
}

#[test]
fn test_click_selects_and_background_clears() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.take_events();

    h.click(40.0, 20.0, 0);
    assert_eq!(h.scene.selected_ids(), ids(&["a"]).as_slice());
    assert!(h.scene.overlay(&a).unwrap().is_selected());
    let events = h.take_events();
    assert!(events.contains(&SceneEvent::SelectionChanged {
        selected: ids(&["a"])
    }));
    assert!(events.contains(&SceneEvent::Click {
        id: Some(a.clone()),
        point: Point::new(40.0, 20.0)
    }));

    h.click(150.0, 80.0, 1000);
    assert!(h.scene.selected_ids().is_empty());
    assert!(!h.scene.overlay(&a).unwrap().is_selected());
    assert!(h.take_events().contains(&SceneEvent::SelectionCleared));
}

#[test]
fn test_shift_click_extends_selection() {
    let mut h = Harness::with_media();
    h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.add_box("b", Rect::new(0.6, 0.6, 0.2, 0.2));

    h.click(40.0, 20.0, 0);
    let shifted = |x: f32, y: f32, ms: u64| {
        PointerEvent::new(Point::new(x, y), Duration::from_millis(ms)).with_modifiers(Modifiers::shift())
    };
    h.scene.handle_event(Event::PointerDown(shifted(140.0, 70.0, 1000)));
    h.scene.handle_event(Event::PointerUp(shifted(140.0, 70.0, 1010)));
    assert_eq!(h.scene.selected_ids(), ids(&["a", "b"]).as_slice());

    // Shift-clicking a selected box drops just that one.
    h.scene.handle_event(Event::PointerDown(shifted(40.0, 20.0, 2000)));
    h.scene.handle_event(Event::PointerUp(shifted(40.0, 20.0, 2010)));
    assert_eq!(h.scene.selected_ids(), ids(&["b"]).as_slice());
}

#[test]
fn test_double_click() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.click(40.0, 20.0, 0);
    h.take_events();

    h.click(41.0, 20.0, 100);
    assert!(h.take_events().contains(&SceneEvent::DoubleClick {
        id: Some(a),
        point: Point::new(41.0, 20.0)
    }));
}

#[test]
fn test_hover_follows_pointer() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.backend.borrow_mut().world_offset = Point::new(10.0, 0.0);
    h.take_events();

    // Screen (30, 20) is world (40, 20).
    h.pointer(Event::PointerMove, 30.0, 20.0, 0);
    assert_eq!(h.scene.hovered(), Some(&a));
    assert_eq!(h.scene.pointer(), Some(Point::new(40.0, 20.0)));
    assert_eq!(
        h.take_events(),
        vec![SceneEvent::HoverEnter {
            id: a.clone(),
            point: Some(Point::new(40.0, 20.0))
        }]
    );

    h.scene.handle_event(Event::PointerLeave);
    assert_eq!(h.scene.hovered(), None);
    assert_eq!(h.scene.pointer(), None);
    assert_eq!(h.take_events(), vec![SceneEvent::HoverLeave { id: a }]);
}

#[test]
fn test_cursor_hints() {
    let mut h = Harness::with_media();
    h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));

    assert_eq!(h.scene.cursor_at(Point::new(40.0, 20.0)), CursorStyle::Move);
    assert_eq!(
        h.scene.cursor_at(Point::new(20.0, 10.0)),
        CursorStyle::ResizeNorthWestSouthEast
    );
    assert_eq!(h.scene.cursor_at(Point::new(150.0, 80.0)), CursorStyle::Default);
    assert_eq!(
        h.scene.overlay_nearest_to(Point::new(150.0, 80.0)),
        Some(&OverlayId::from("a"))
    );
}

#[test]
fn test_rotation_cycles_through_stack() {
    let mut h = stacked();
    h.pointer(Event::PointerMove, 60.0, 30.0, 0);
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "d", "a", "b", "c"]).as_slice()
    );
    assert_eq!(h.scene.hovered(), Some(&OverlayId::from("c")));
    h.take_events();

    assert!(h.scene.rotate_next());
    assert_eq!(h.scene.rotation_index(), 1);
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "d", "b", "c", "a"]).as_slice()
    );
    assert_eq!(h.scene.hovered(), Some(&OverlayId::from("a")));
    assert_eq!(
        h.take_events(),
        vec![
            SceneEvent::HoverLeave { id: "c".into() },
            SceneEvent::HoverEnter {
                id: "a".into(),
                point: Some(Point::new(60.0, 30.0))
            },
        ]
    );

    press_key(&mut h, Key::Char(']'));
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "d", "c", "a", "b"]).as_slice()
    );

    h.scene.rotate_next();
    assert_eq!(h.scene.rotation_index(), 0);
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "d", "a", "b", "c"]).as_slice()
    );

    // Backwards wraps to the last rotation.
    press_key(&mut h, Key::Char('['));
    assert_eq!(h.scene.rotation_index(), 2);
}

#[test]
fn test_rotation_needs_overlap() {
    let mut h = stacked();
    assert!(!h.scene.rotate_next());

    h.pointer(Event::PointerMove, 170.0, 85.0, 0);
    assert!(!h.scene.rotate_next());
    assert_eq!(h.scene.rotation_index(), 0);
}

#[test]
fn test_rotation_resets_on_new_stack() {
    let mut h = stacked();
    h.pointer(Event::PointerMove, 60.0, 30.0, 0);
    h.scene.rotate_next();
    assert_eq!(h.scene.rotation_index(), 1);

    // Only a and b here.
    h.pointer(Event::PointerMove, 45.0, 22.0, 10);
    assert_eq!(h.scene.rotation_index(), 0);
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "c", "d", "a", "b"]).as_slice()
    );
}

#[test]
fn test_only_show_hovered() {
    let mut h = stacked();
    h.scene.set_scene_options(SceneOptions {
        only_show_hovered: true,
        ..SceneOptions::default()
    });
    // Nothing under the pointer: nothing but the media is shown.
    assert!(!h.scene.is_visible(&OverlayId::from("a")));
    assert!(h.scene.is_visible(&OverlayId::from("media")));

    h.pointer(Event::PointerMove, 60.0, 30.0, 0);
    assert!(h.scene.is_visible(&OverlayId::from("c")));
    for hidden in ["a", "b", "d"] {
        assert!(!h.scene.is_visible(&OverlayId::from(hidden)));
        assert!(h.backend.borrow().hidden.contains(&OverlayId::from(hidden)));
    }
    assert_eq!(h.scene.interaction().handlers(), ids(&["c"]).as_slice());

    h.scene.rotate_next();
    assert!(h.scene.is_visible(&OverlayId::from("a")));
    assert!(!h.scene.is_visible(&OverlayId::from("c")));
}

#[test]
fn test_hide_all_overlays() {
    let mut h = stacked();
    h.take_events();
    h.scene.set_scene_options(SceneOptions {
        show_overlays: false,
        ..SceneOptions::default()
    });
    assert!(h.scene.interaction().handlers().is_empty());
    assert!(!h.scene.is_visible(&OverlayId::from("a")));
    assert!(matches!(
        h.take_events().as_slice(),
        [SceneEvent::SceneOptionsChanged { .. }]
    ));

    h.scene.set_scene_options(SceneOptions::default());
    assert_eq!(h.scene.interaction().handlers().len(), 4);
}

#[test]
fn test_active_paths_bin_order() {
    let mut h = Harness::with_media();
    h.scene.add_overlay(
        Overlay::bounding_box("gt", "s", Rect::new(0.0, 0.0, 0.1, 0.1)).with_field("ground_truth"),
        false,
    );
    h.scene.add_overlay(
        Overlay::bounding_box("pred", "s", Rect::new(0.5, 0.5, 0.1, 0.1)).with_field("predictions"),
        false,
    );
    h.scene.set_scene_options(SceneOptions {
        active_paths: vec!["predictions".to_string(), "ground_truth".to_string()],
        ..SceneOptions::default()
    });
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "pred", "gt"]).as_slice()
    );
}

#[test]
fn test_draw_and_commit_new_box() {
    let mut h = Harness::with_media();
    assert!(h.scene.enter_interactive_mode(Some("ground_truth".to_string()), true));
    assert!(h.scene.is_interactive());
    assert!(!h.scene.enter_interactive_mode(None, true));
    assert_eq!(h.scene.cursor_at(Point::new(5.0, 5.0)), CursorStyle::Crosshair);
    h.take_events();

    h.drag(Point::new(10.0, 10.0), Point::new(60.0, 40.0), 0);
    assert_rect_eq(
        h.scene.established_bounds().unwrap(),
        Rect::new(10.0, 10.0, 50.0, 30.0),
    );
    let events = h.take_events();
    assert!(matches!(events[0], SceneEvent::EstablishStart { .. }));
    assert!(events.iter().any(|e| matches!(
        e,
        SceneEvent::EstablishEnd { relative, .. } if relative.approx_eq(&Rect::new(0.05, 0.1, 0.25, 0.3), 1e-4)
    )));

    let id = h.scene.commit_established("drawn", json!({ "label": "cat" })).unwrap();
    assert!(!h.scene.is_interactive());
    let overlay = h.scene.overlay(&id).unwrap();
    assert_eq!(overlay.field(), Some("ground_truth"));
    assert_eq!(overlay.sample_id(), "sample-1");
    assert_eq!(overlay.display_text(), "cat");
    assert_rect_eq(
        overlay.as_bounding_box().unwrap().relative_bounds(),
        Rect::new(0.05, 0.1, 0.25, 0.3),
    );

    // Undoing the commit brings back the drawing session it ended.
    assert!(h.scene.undo());
    assert!(h.scene.overlay(&id).is_none());
    assert!(h.scene.is_interactive());
    assert!(h.scene.undo());
    assert!(!h.scene.is_interactive());
    assert!(!h.scene.can_undo());
}

#[test]
fn test_commit_survives_undo_redo() {
    let mut h = Harness::with_media();
    h.scene.enter_interactive_mode(None, true);
    h.drag(Point::new(10.0, 10.0), Point::new(60.0, 40.0), 0);
    let id = h.scene.commit_established("drawn", json!("cat")).unwrap();
    assert_eq!(h.scene.undo_description().as_deref(), Some("Add box 'drawn'"));

    h.scene.undo();
    h.scene.undo();
    assert!(h.scene.redo());
    assert!(h.scene.is_interactive());
    assert!(h.scene.overlay(&id).is_none());

    assert!(h.scene.redo());
    assert!(!h.scene.is_interactive());
    assert!(!h.scene.is_drawing_session_active());
    assert!(h.scene.overlay(&id).is_some());
    assert!(!h.scene.can_redo());
}

#[test]
fn test_commit_requires_drawn_box() {
    let mut h = Harness::with_media();
    let outside = h.scene.commit_established("x", json!(null));
    assert!(matches!(outside, Err(SceneError::NoInteractiveHandler)));

    h.scene.enter_interactive_mode(None, false);
    let empty = h.scene.commit_established("x", json!(null));
    assert!(matches!(empty, Err(SceneError::NothingEstablished)));

    // Too small to keep.
    h.take_events();
    h.drag(Point::new(10.0, 10.0), Point::new(12.0, 11.0), 0);
    assert!(h.scene.established_bounds().is_none());
    assert!(h.take_events().contains(&SceneEvent::EstablishCancelled));
}

#[test]
fn test_escape_backs_out_of_drawing() {
    let mut h = Harness::with_media();
    h.scene.enter_interactive_mode(None, false);

    h.pointer(Event::PointerDown, 10.0, 10.0, 0);
    h.pointer(Event::PointerMove, 80.0, 60.0, 10);
    press_key(&mut h, Key::Escape);
    assert!(h.scene.is_interactive());
    assert!(h.scene.established_bounds().is_none());

    press_key(&mut h, Key::Escape);
    assert!(!h.scene.is_interactive());
    assert!(h.take_events().contains(&SceneEvent::DrawingSessionEnded));
}

#[test]
fn test_drawing_is_clamped_to_media() {
    let mut h = Harness::with_media();
    h.scene.enter_interactive_mode(None, false);
    h.drag(Point::new(150.0, 50.0), Point::new(260.0, 140.0), 0);
    assert_rect_eq(
        h.scene.established_bounds().unwrap(),
        Rect::new(150.0, 50.0, 50.0, 50.0),
    );
}

#[test]
fn test_explicit_order_drives_hit_priority() {
    let mut h = Harness::with_media();
    h.add_box("a", Rect::new(0.7, 0.1, 0.1, 0.1));
    h.add_box("b", Rect::new(0.1, 0.1, 0.3, 0.3));
    h.add_box("c", Rect::new(0.2, 0.2, 0.3, 0.3));
    h.scene.set_overlay_order(ids(&["a", "b", "c"])).unwrap();

    // (60, 30) is inside both b and c.
    h.pointer(Event::PointerMove, 60.0, 30.0, 0);
    assert_eq!(h.scene.hovered(), Some(&OverlayId::from("c")));

    h.scene.set_overlay_order(ids(&["a", "c", "b"])).unwrap();
    h.pointer(Event::PointerMove, 61.0, 30.0, 10);
    assert_eq!(h.scene.hovered(), Some(&OverlayId::from("b")));
    assert_eq!(
        h.scene.overlay_order(),
        ids(&["media", "a", "c", "b"]).as_slice()
    );
}
