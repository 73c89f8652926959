use super::*;
use crate::pool::thread_pool::ThreadPool;

fn ramp(name: &str, w: i32, h: i32) -> Channel {
    let data = (0..w * h).map(|i| i as f32).collect();
    Channel::from_data(name, Vec2i::new(w, h), data).unwrap()
}

#[test]
fn names_split_at_the_last_dot() {
    assert_eq!(Channel::split("a.b.R"), ("a.b", "R"));
    assert_eq!(Channel::split("R"), ("", "R"));
    assert_eq!(Channel::head("diffuse.G"), "diffuse");
    assert_eq!(Channel::tail("diffuse.G"), "G");
    assert!(Channel::is_topmost("Z"));
    assert!(!Channel::is_topmost("depth.Z"));
}

#[test]
fn from_data_rejects_wrong_sample_count() {
    let err = Channel::from_data("R", Vec2i::new(2, 2), vec![0.0; 3]).unwrap_err();
    assert!(matches!(err, IngestError::Decode(_)));
}

#[test]
fn eval_is_zero_outside_the_channel() {
    let c = ramp("R", 3, 2);
    assert_eq!(c.eval(2, 1), 5.0);
    assert_eq!(c.eval(3, 0), 0.0);
    assert_eq!(c.eval(-1, 0), 0.0);
    assert_eq!(c.eval(0, 2), 0.0);
    assert_eq!(c.eval_index(5), 5.0);
    assert_eq!(c.eval_index(6), 0.0);
}

#[test]
fn at_mut_and_set_zero_write_in_place() {
    let mut c = ramp("R", 2, 2);
    *c.at_mut(1, 1) = 42.0;
    assert_eq!(c.at(1, 1), 42.0);

    let snapshot = c.clone();
    c.set_zero();
    assert!(c.data().iter().all(|&v| v == 0.0));
    assert_eq!(snapshot.at(1, 1), 42.0, "clones must not observe later writes");
}

#[test]
#[should_panic(expected = "outside channel")]
fn at_panics_outside_the_channel() {
    let c = ramp("R", 2, 2);
    let _ = c.at(2, 0);
}

#[test]
fn update_tile_overwrites_sub_rectangle() {
    let mut c = Channel::new("R", Vec2i::new(4, 3));
    c.update_tile(1, 1, 2, 2, &[1.0, 2.0, 3.0, 4.0]);
    #[rustfmt::skip]
    let expected = [
        0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 2.0, 0.0,
        0.0, 3.0, 4.0, 0.0,
    ];
    assert_eq!(c.data(), &expected);
}

#[test]
fn update_tile_outside_bounds_is_ignored() {
    let mut c = Channel::new("R", Vec2i::new(2, 2));
    c.update_tile(1, 1, 2, 1, &[9.0, 9.0]);
    c.update_tile(-1, 0, 1, 1, &[9.0]);
    c.update_tile(0, 0, 2, 2, &[9.0]);
    assert!(c.data().iter().all(|&v| v == 0.0));
}

#[test]
fn multiply_with_is_elementwise() {
    let pool = ThreadPool::new(3).unwrap();
    let mut a = ramp("R", 100, 90);
    let b = Channel::from_data("A", a.size(), vec![0.5; 9000]).unwrap();

    pollster::block_on(a.multiply_with(&b, &pool.handle(), Priority(0))).unwrap();
    for (i, &v) in a.data().iter().enumerate() {
        assert_eq!(v, i as f32 * 0.5);
    }
}

#[test]
fn divide_by_zero_saturates_to_zero() {
    let pool = ThreadPool::new(2).unwrap();
    let n = 10_000;
    let mut a = Channel::from_data("R", Vec2i::new(100, 100), vec![3.0; n]).unwrap();
    let b_values: Vec<f32> = (0..n).map(|i| (i % 3) as f32).collect();
    let b = Channel::from_data("A", a.size(), b_values.clone()).unwrap();

    pollster::block_on(a.divide_by(&b, &pool.handle(), Priority(0))).unwrap();
    for (i, &v) in a.data().iter().enumerate() {
        let expected = if b_values[i] == 0.0 { 0.0 } else { 3.0 / b_values[i] };
        assert_eq!(v, expected, "index {i}");
        assert!(v.is_finite());
    }
}

#[test]
fn elementwise_ops_on_empty_channels_complete() {
    let pool = ThreadPool::new(1).unwrap();
    let mut a = Channel::new("R", Vec2i::ZERO);
    let b = Channel::new("A", Vec2i::ZERO);
    pollster::block_on(a.multiply_with(&b, &pool.handle(), Priority(0))).unwrap();
    assert_eq!(a.count(), 0);
}
