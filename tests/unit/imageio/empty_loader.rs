use std::io::Cursor;

use super::*;
use crate::pool::thread_pool::ThreadPool;

fn load(bytes: &[u8]) -> IngestResult<Vec<ImageData>> {
    let pool = ThreadPool::new(1).unwrap();
    let handle = pool.handle();
    let selector = ChannelSelector::all();
    let mut stream = Cursor::new(bytes.to_vec());
    pollster::block_on(EmptyImageLoader.load(&mut stream, Path::new("ipc"), &selector, &handle, Priority(0)))
}

#[test]
fn placeholder_channels_are_zero_filled() {
    let data = load(b"empty 3 2 3 1R8normal.X8normal.Y").unwrap().remove(0);
    let names: Vec<_> = data.channels.iter().map(Channel::name).collect();
    assert_eq!(names, vec!["R", "normal.X", "normal.Y"]);
    assert_eq!(data.layers, vec!["", "normal"]);
    assert_eq!(data.size(), Vec2i::new(3, 2));
    assert!(data.channels.iter().all(|c| c.data() == [0.0; 6]));
    assert!(data.has_premultiplied_alpha);
}

#[test]
fn sniffing_requires_the_full_magic() {
    assert!(EmptyImageLoader.can_load_file(&mut Cursor::new(b"empty 1 1 0".to_vec())));
    assert!(!EmptyImageLoader.can_load_file(&mut Cursor::new(b"empt".to_vec())));
    assert!(!EmptyImageLoader.can_load_file(&mut Cursor::new(b"EMPTY 1 1 0".to_vec())));
}

#[test]
fn malformed_placeholders_fail() {
    assert!(matches!(load(b"empty 0 2 1 1R"), Err(IngestError::Decode(_))));
    assert!(matches!(load(b"empty 2 2 2 1R"), Err(IngestError::Decode(_))));
    assert!(matches!(load(b"empty 2 2 1 9R"), Err(IngestError::Decode(_))));
}

#[test]
fn huge_channel_counts_and_sizes_are_rejected() {
    let err = load(b"empty 1 1 1000000000000000000").unwrap_err();
    assert!(matches!(&err, IngestError::Decode(msg) if msg.contains("too large")), "{err}");
    assert!(matches!(load(b"empty 2000000000 2000000000 1 1R"), Err(IngestError::Decode(_))));
    // A plausible count still fails cleanly when the names run out.
    assert!(matches!(load(b"empty 1 1 1000 1R"), Err(IngestError::Decode(_))));
}

#[test]
fn zero_channels_decode_but_fail_validation() {
    let mut data = load(b"empty 2 2 0").unwrap().remove(0);
    assert!(data.channels.is_empty());

    let pool = ThreadPool::new(1).unwrap();
    let err = pollster::block_on(data.ensure_valid(&ChannelSelector::all(), &pool.handle(), Priority(0)))
        .unwrap_err();
    assert!(matches!(err, IngestError::EmptyImage));
}
