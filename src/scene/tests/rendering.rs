use super::*;
use crate::error::LoadError;
use crate::overlay::OverlayStatus;
use crate::scene::{SceneOptions, attach_render_loop};

#[test]
fn test_media_loads_across_frames() {
    let mut h = Harness::new();
    h.scene
        .add_overlay(Overlay::media("media", "sample-1", MEDIA_URL), false);
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    let media = OverlayId::from("media");

    // Adding the media warms the loader before the first frame asks for it.
    assert_eq!(h.loader.background_count(MEDIA_URL), 1);
    assert_eq!(h.loader.load_count(MEDIA_URL), 0);

    let first = h.scene.render_frame();
    assert_eq!(first.pending, 1);
    assert_eq!(h.scene.overlay(&media).unwrap().status(), OverlayStatus::Painting);
    assert!(h.scene.has_pending_renders());

    // Still loading: polled again, not reloaded.
    let second = h.scene.render_frame();
    assert_eq!(second.pending, 1);
    assert_eq!(second.resolved, 0);
    assert_eq!(h.loader.load_count(MEDIA_URL), 1);

    h.loader.resolve(MEDIA_URL, 200, 100);
    h.take_events();
    let third = h.scene.render_frame();
    assert_eq!(third.resolved, 1);
    assert_eq!(third.pending, 0);
    assert_eq!(h.scene.overlay(&media).unwrap().status(), OverlayStatus::Painted);
    assert_eq!(h.scene.media_bounds(), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));

    // Boxes follow the media once its size is known.
    assert_rect_eq(h.absolute(&a), Rect::new(20.0, 10.0, 40.0, 20.0));
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SceneEvent::OverlayBoundsChanged { id, .. } if *id == a
    )));
    assert_eq!(h.backend.borrow().draw_order(), ids(&["media", "a"]));
}

#[test]
fn test_load_failure_marks_error() {
    let mut h = Harness::new();
    h.loader.fail(
        MEDIA_URL,
        LoadError::NotFound {
            url: MEDIA_URL.to_string(),
        },
    );
    h.scene
        .add_overlay(Overlay::media("media", "sample-1", MEDIA_URL), false);
    let media = OverlayId::from("media");

    h.scene.render_frame();
    h.take_events();
    let stats = h.scene.render_frame();
    assert_eq!(stats.failed, 1);
    assert_eq!(h.scene.overlay(&media).unwrap().status(), OverlayStatus::Error);
    assert!(matches!(
        h.take_events().as_slice(),
        [SceneEvent::OverlayError { id, .. }] if *id == media
    ));

    // Failed overlays are not retried every frame.
    h.scene.render_frame();
    assert_eq!(h.loader.load_count(MEDIA_URL), 1);
}

#[test]
fn test_backend_failure_isolated_to_overlay() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    let b = h.add_box("b", Rect::new(0.5, 0.5, 0.2, 0.2));
    h.backend.borrow_mut().failing.insert(a.clone());
    h.take_events();

    let stats = h.scene.render_frame();
    assert_eq!(stats.failed, 1);
    assert_eq!(h.scene.overlay(&a).unwrap().status(), OverlayStatus::Error);
    assert_eq!(h.scene.overlay(&b).unwrap().status(), OverlayStatus::Painted);
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SceneEvent::OverlayError { id, .. } if *id == a
    )));
}

#[test]
fn test_only_dirty_overlays_repaint() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.add_box("b", Rect::new(0.5, 0.5, 0.2, 0.2));

    let first = h.scene.render_frame();
    assert_eq!(first.painted, 3);
    assert_eq!(h.backend.borrow().draw_order(), ids(&["media", "a", "b"]));

    h.backend.borrow_mut().calls.clear();
    let second = h.scene.render_frame();
    assert_eq!(second.painted, 0);
    assert!(h.backend.borrow().calls.is_empty());

    h.scene.move_overlay(&a, 4.0, 4.0, false).unwrap();
    h.scene.render_frame();
    let backend = h.backend.borrow();
    assert!(backend.draws_for(&a) > 0);
    assert_eq!(backend.draws_for(&OverlayId::from("media")), 0);
    assert_eq!(backend.draws_for(&OverlayId::from("b")), 0);
}

#[test]
fn test_alpha_change_repaints_everything() {
    let mut h = Harness::with_media();
    h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.scene.render_frame();

    h.scene.set_scene_options(SceneOptions {
        alpha: 0.5,
        ..SceneOptions::default()
    });
    assert_eq!(h.scene.render_frame().painted, 2);
}

#[test]
fn test_hidden_overlays_not_painted() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));
    h.scene.set_scene_options(SceneOptions {
        show_overlays: false,
        ..SceneOptions::default()
    });

    h.scene.render_frame();
    assert_eq!(h.backend.borrow().draws_for(&a), 0);

    h.scene.set_scene_options(SceneOptions::default());
    h.scene.render_frame();
    assert!(h.backend.borrow().draws_for(&a) > 0);
}

#[test]
fn test_frame_resolves_pending_geometry() {
    let mut h = Harness::with_media();
    let a = h.add_box("a", Rect::new(0.1, 0.1, 0.2, 0.2));

    h.pointer(Event::PointerDown, 40.0, 20.0, 0);
    h.pointer(Event::PointerMove, 60.0, 40.0, 10);
    h.take_events();
    h.scene.render_frame();

    let relative = h.scene.overlay(&a).unwrap().as_bounding_box().unwrap().relative_bounds();
    assert_rect_eq(relative, Rect::new(0.2, 0.3, 0.2, 0.2));
    assert!(h.take_events().iter().any(|e| matches!(
        e,
        SceneEvent::OverlayBoundsChanged { id, .. } if *id == a
    )));

    // The release still records the whole drag.
    h.pointer(Event::PointerUp, 60.0, 40.0, 20);
    assert!(h.scene.undo());
    assert_rect_eq(h.absolute(&a), Rect::new(20.0, 10.0, 40.0, 20.0));
}

#[test]
fn test_classification_labels_stack() {
    let mut h = Harness::with_media();
    h.scene
        .add_overlay(Overlay::classification("first", "sample-1", "cat"), false);
    h.scene
        .add_overlay(Overlay::classification("second", "sample-1", "outdoor"), false);
    let first = OverlayId::from("first");
    let second = OverlayId::from("second");
    let position = |h: &Harness, id: &OverlayId| {
        h.scene
            .overlay(id)
            .and_then(|o| o.as_classification())
            .map(|c| c.position())
            .unwrap()
    };

    h.scene.render_frame();
    assert_eq!(position(&h, &first), Point::new(8.0, 8.0));
    assert_eq!(position(&h, &second), Point::new(8.0, 29.5));

    h.scene
        .set_media_bounds(Rect::new(50.0, 20.0, 100.0, 50.0))
        .unwrap();
    h.scene.render_frame();
    assert_eq!(position(&h, &first), Point::new(58.0, 28.0));

    // No gap is left behind.
    h.scene.remove_overlay(&first, false).unwrap();
    h.scene.render_frame();
    assert_eq!(position(&h, &second), Point::new(58.0, 28.0));
}

#[test]
fn test_classification_stack_follows_field_bins() {
    let mut h = Harness::with_media();
    h.scene.add_overlay(
        Overlay::classification("weather", "sample-1", "sunny").with_field("weather"),
        false,
    );
    h.scene.add_overlay(
        Overlay::classification("scene", "sample-1", "street").with_field("scene"),
        false,
    );
    let position = |h: &Harness, id: &str| {
        h.scene
            .overlay(&OverlayId::from(id))
            .and_then(|o| o.as_classification())
            .map(|c| c.position())
            .unwrap()
    };

    h.scene.render_frame();
    assert_eq!(position(&h, "weather"), Point::new(8.0, 8.0));

    h.scene.set_scene_options(SceneOptions {
        active_paths: vec!["scene".to_string(), "weather".to_string()],
        ..SceneOptions::default()
    });
    h.scene.render_frame();
    assert_eq!(position(&h, "scene"), Point::new(8.0, 8.0));
    assert_eq!(position(&h, "weather"), Point::new(8.0, 29.5));
}

#[test]
fn test_frame_callbacks() {
    let mut h = Harness::with_media();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let before = seen.clone();
    let after = seen.clone();
    h.scene
        .on_before_render(move |frame| before.borrow_mut().push(("before", frame)));
    h.scene
        .on_after_render(move |frame| after.borrow_mut().push(("after", frame)));

    h.scene.render_frame();
    h.scene.render_frame();
    assert_eq!(
        *seen.borrow(),
        vec![("before", 1), ("after", 1), ("before", 2), ("after", 2)]
    );
    assert_eq!(h.scene.frame_count(), 2);
}

#[test]
fn test_render_loop_follows_backend_ticks() {
    let Harness { scene, backend, .. } = Harness::with_media();
    let scene = Rc::new(RefCell::new(scene));
    attach_render_loop(&scene);
    assert_eq!(backend.borrow().tick_handler_count(), 1);

    RecordingBackend::tick(&backend);
    assert_eq!(scene.borrow().frame_count(), 1);

    // A scene that is busy when the frame arrives skips it.
    {
        let _busy = scene.borrow_mut();
        RecordingBackend::tick(&backend);
    }
    assert_eq!(scene.borrow().frame_count(), 1);

    drop(scene);
    RecordingBackend::tick(&backend);
}
