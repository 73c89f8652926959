use std::io::Cursor;

use super::*;
use crate::pool::thread_pool::ThreadPool;

fn png_bytes(image: image::DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
    buf
}

fn load(bytes: Vec<u8>) -> IngestResult<Vec<ImageData>> {
    let pool = ThreadPool::new(2).unwrap();
    let handle = pool.handle();
    let selector = ChannelSelector::all();
    let mut stream = Cursor::new(bytes);
    pollster::block_on(RasterImageLoader.load(&mut stream, Path::new("t.png"), &selector, &handle, Priority(0)))
}

#[test]
fn rgba_png_keeps_straight_alpha() {
    let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 51, 255, 0, 102, 255, 0]).unwrap();
    let data = load(png_bytes(image::DynamicImage::ImageRgba8(img))).unwrap().remove(0);

    let names: Vec<_> = data.channels.iter().map(Channel::name).collect();
    assert_eq!(names, vec!["R", "G", "B", "A"]);
    assert_eq!(data.size(), Vec2i::new(2, 1));
    assert!(!data.has_premultiplied_alpha);

    let r = data.channel("R").unwrap().data();
    assert_eq!(r, &[1.0, 0.0]);
    let b = data.channel("B").unwrap().data();
    assert!((b[0] - 0.2).abs() < 1e-6);
    assert_eq!(b[1], 1.0);
    assert_eq!(data.channel("A").unwrap().data(), &[1.0, 0.0]);
}

#[test]
fn grayscale_png_yields_luminance() {
    let img = image::GrayImage::from_raw(1, 2, vec![0, 255]).unwrap();
    let data = load(png_bytes(image::DynamicImage::ImageLuma8(img))).unwrap().remove(0);
    assert_eq!(data.channels.len(), 1);
    assert_eq!(data.channels[0].name(), "L");
    assert_eq!(data.channels[0].data(), &[0.0, 1.0]);
}

#[test]
fn garbage_is_a_decode_error() {
    let err = load(b"not an image at all".to_vec()).unwrap_err();
    assert!(matches!(err, IngestError::Decode(_)), "{err}");
}

#[test]
fn sniffing_recognizes_png_and_restores_position() {
    let img = image::GrayImage::from_raw(1, 1, vec![7]).unwrap();
    let mut stream = Cursor::new(png_bytes(image::DynamicImage::ImageLuma8(img)));
    assert!(RasterImageLoader.can_load_file(&mut stream));
    assert_eq!(stream.position(), 0);
    assert!(!RasterImageLoader.can_load_file(&mut Cursor::new(b"????".to_vec())));
}
