use std::io::Cursor;

use super::*;
use crate::pool::thread_pool::ThreadPool;

/// PFM bytes with rows given top to bottom; stored bottom to top.
fn pfm(magic: &str, width: usize, rows_top_down: &[Vec<f32>], little_endian: bool, scale: f32) -> Vec<u8> {
    let height = rows_top_down.len();
    let signed_scale = if little_endian { -scale } else { scale };
    let mut bytes = format!("{magic}\n{width} {height}\n{signed_scale}\n").into_bytes();
    for row in rows_top_down.iter().rev() {
        for v in row {
            if little_endian {
                bytes.extend_from_slice(&v.to_le_bytes());
            } else {
                bytes.extend_from_slice(&v.to_be_bytes());
            }
        }
    }
    bytes
}

fn load(bytes: Vec<u8>) -> IngestResult<Vec<ImageData>> {
    let pool = ThreadPool::new(2).unwrap();
    let handle = pool.handle();
    let selector = ChannelSelector::all();
    let mut stream = Cursor::new(bytes);
    pollster::block_on(PfmImageLoader.load(&mut stream, Path::new("t.pfm"), &selector, &handle, Priority(0)))
}

#[test]
fn grayscale_rows_are_flipped() {
    let bytes = pfm("Pf", 2, &[vec![1.0, 2.0], vec![3.0, 4.0]], true, 1.0);
    let data = load(bytes).unwrap().remove(0);
    assert_eq!(data.channels.len(), 1);
    assert_eq!(data.channels[0].name(), "L");
    assert_eq!(data.channels[0].data(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(data.data_window, Rect::from_size(Vec2i::new(2, 2)));
    assert_eq!(data.layers, vec![String::new()]);
    assert!(!data.has_premultiplied_alpha);
}

#[test]
fn color_big_endian_with_scale() {
    let rows = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]];
    let data = load(pfm("PF", 2, &rows, false, 2.0)).unwrap().remove(0);
    let names: Vec<_> = data.channels.iter().map(Channel::name).collect();
    assert_eq!(names, vec!["R", "G", "B"]);
    assert_eq!(data.channels[0].data(), &[2.0, 8.0]);
    assert_eq!(data.channels[1].data(), &[4.0, 10.0]);
    assert_eq!(data.channels[2].data(), &[6.0, 12.0]);
}

#[test]
fn four_channel_variant_has_alpha() {
    let rows = vec![vec![0.1, 0.2, 0.3, 0.5]];
    let data = load(pfm("PF4", 1, &rows, true, 1.0)).unwrap().remove(0);
    assert_eq!(data.channels[3].name(), "A");
    assert_eq!(data.channels[3].data(), &[0.5]);
}

#[test]
fn truncated_payload_is_a_decode_error() {
    let mut bytes = pfm("PF", 2, &[vec![0.0; 6], vec![0.0; 6]], true, 1.0);
    bytes.truncate(bytes.len() - 3);
    assert!(matches!(load(bytes), Err(IngestError::Decode(_))));
}

#[test]
fn bad_headers_are_rejected() {
    assert!(matches!(load(b"PX\n1 1\n-1\n\0\0\0\0".to_vec()), Err(IngestError::Decode(_))));
    assert!(matches!(load(b"Pf\n1 1\n0\n\0\0\0\0".to_vec()), Err(IngestError::Decode(_))));
    assert!(matches!(load(b"Pf\n0 1\n-1\n".to_vec()), Err(IngestError::Decode(_))));
    assert!(matches!(load(b"Pf\nx 1\n-1\n".to_vec()), Err(IngestError::Decode(_))));
}

#[test]
fn oversized_dimensions_are_rejected_before_reading_the_payload() {
    let err = load(b"PF\n2000000000 2000000000\n-1.0\n".to_vec()).unwrap_err();
    assert!(matches!(&err, IngestError::Decode(msg) if msg.contains("too large")), "{err}");

    let err = load(b"PF4\n2147483647 2147483647\n1.0\n\0\0\0\0".to_vec()).unwrap_err();
    assert!(matches!(err, IngestError::Decode(_)));
}
