use super::*;

#[test]
fn rect_validity_requires_positive_extent_on_both_axes() {
    assert!(Rect::from_size(Vec2i::new(4, 3)).is_valid());
    assert!(!Rect::from_size(Vec2i::new(0, 3)).is_valid());
    assert!(!Rect::from_size(Vec2i::new(4, 0)).is_valid());
    assert!(!Rect::default().is_valid());
    assert!(!Rect::new(Vec2i::new(5, 5), Vec2i::new(5, 9)).is_valid());
}

#[test]
fn rect_size_is_max_minus_min() {
    let r = Rect::new(Vec2i::new(-2, 3), Vec2i::new(6, 7));
    assert_eq!(r.size(), Vec2i::new(8, 4));
}

#[test]
fn inclusive_corners_gain_one_on_max() {
    let r = Rect::from_inclusive(Vec2i::new(10, 20), Vec2i::new(19, 29));
    assert_eq!(r.min, Vec2i::new(10, 20));
    assert_eq!(r.max, Vec2i::new(20, 30));
    assert_eq!(r.size(), Vec2i::new(10, 10));
}

#[test]
fn area_is_zero_for_degenerate_sizes() {
    assert_eq!(Vec2i::new(3, 4).area(), 12);
    assert_eq!(Vec2i::new(-3, 4).area(), 0);
    assert_eq!(Vec2i::ZERO.area(), 0);
}
