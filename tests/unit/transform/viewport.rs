use super::*;
use kurbo::Point;

#[test]
fn affine_scales_then_translates() {
    let vp = Viewport {
        scale: 4.0,
        translate: Vec2::new(10.0, -2.0),
        ..Viewport::default()
    };
    assert_eq!(vp.affine() * Point::new(1.0, 1.0), Point::new(14.0, 2.0));
    assert_eq!(Viewport::default().affine(), Affine::IDENTITY);
}

#[test]
fn translate_only_keeps_scale_and_size() {
    let vp = Viewport::default()
        .apply(&TransUpdate::translate(0.0, 0.0).with_scale(3.0).with_resize(800, 600))
        .unwrap();
    let moved = vp.apply(&TransUpdate::translate(-5.0, 7.0)).unwrap();
    assert_eq!(moved.scale, 3.0);
    assert_eq!((moved.width, moved.height), (800, 600));
    assert_eq!(moved.translate, Vec2::new(-5.0, 7.0));
}

#[test]
fn scale_without_resize_keeps_size() {
    let vp = Viewport::fixed(100, 50)
        .apply(&TransUpdate::translate(1.0, 1.0).with_scale(8.0))
        .unwrap();
    assert_eq!((vp.width, vp.height, vp.scale), (100, 50, 8.0));
}

#[test]
fn resize_always_disables_smoothing() {
    let vp = Viewport {
        smoothing: true,
        ..Viewport::default()
    };
    let next = vp
        .apply(&TransUpdate::translate(0.0, 0.0).with_resize(10, 10))
        .unwrap();
    assert!(!next.smoothing);
}

#[test]
fn non_positive_zoom_is_rejected() {
    let vp = Viewport::default();
    assert!(vp.apply(&TransUpdate::translate(0.0, 0.0).with_scale(0.0)).is_err());
    assert!(vp.apply(&TransUpdate::translate(0.0, 0.0).with_scale(-1.0)).is_err());
}
