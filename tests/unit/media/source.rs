use super::*;

fn frames(n: u8) -> Vec<Raster> {
    (0..n).map(|i| Raster::filled(4, 2, [i, i, i, 255])).collect()
}

#[test]
fn yields_frames_in_order_then_ends() {
    let mut src = FrameSequenceSource::new(frames(3), 10.0).unwrap();
    assert_eq!(src.dimensions(), (4, 2));
    assert_eq!(src.frame_count_hint(), Some(3));

    for i in 0..3u8 {
        let f = src.next_frame().unwrap().unwrap();
        assert_eq!(f.pixel(0, 0), [i, i, i, 255]);
    }
    assert!(src.next_frame().unwrap().is_none());
    assert!(src.next_frame().unwrap().is_none());

    src.rewind().unwrap();
    assert_eq!(src.position(), 0);
    assert!(src.next_frame().unwrap().is_some());
}

#[test]
fn seek_maps_seconds_to_frames() {
    let mut src = FrameSequenceSource::new(frames(10), 10.0).unwrap();
    src.seek(0.1).unwrap();
    assert_eq!(src.next_frame().unwrap().unwrap().pixel(0, 0)[0], 1);

    src.seek(-3.0).unwrap();
    assert_eq!(src.position(), 0);

    src.seek(100.0).unwrap();
    assert!(src.next_frame().unwrap().is_none());

    assert!(src.seek(f64::NAN).is_err());
}

#[test]
fn rejects_bad_rate_and_mixed_sizes() {
    assert!(FrameSequenceSource::new(frames(2), 0.0).is_err());
    assert!(FrameSequenceSource::new(frames(2), f64::INFINITY).is_err());

    let mixed = vec![Raster::filled(2, 2, [0; 4]), Raster::filled(3, 2, [0; 4])];
    assert!(FrameSequenceSource::new(mixed, 24.0).is_err());
}

#[test]
fn empty_source_has_no_dimensions() {
    let mut src = FrameSequenceSource::new(Vec::new(), 24.0).unwrap();
    assert!(src.is_empty());
    assert_eq!(src.dimensions(), (0, 0));
    assert!(src.next_frame().unwrap().is_none());
}

#[test]
fn play_and_pause_toggle_state() {
    let mut src = FrameSequenceSource::new(frames(1), 24.0).unwrap();
    assert!(!src.is_playing());
    src.play();
    assert!(src.is_playing());
    src.pause();
    assert!(!src.is_playing());
}
