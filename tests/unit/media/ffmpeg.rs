use super::*;

#[test]
fn ratio_parsing() {
    assert_eq!(parse_ff_ratio("30000/1001"), Some((30000, 1001)));
    assert_eq!(parse_ff_ratio("25/1"), Some((25, 1)));
    assert_eq!(parse_ff_ratio("25/0"), None);
    assert_eq!(parse_ff_ratio("abc"), None);
}

#[test]
fn info_fps_handles_zero_denominator() {
    let info = VideoInfo {
        path: PathBuf::from("x.mp4"),
        width: 2,
        height: 2,
        fps_num: 30,
        fps_den: 0,
        duration_sec: 1.0,
    };
    assert_eq!(info.fps(), 0.0);
}

#[test]
fn opening_a_missing_file_is_a_decode_error() {
    let err = match FfmpegVideoSource::open("/definitely/not/here.mp4") {
        Ok(_) => panic!("expected failure"),
        Err(e) => e,
    };
    assert!(matches!(err, HoloError::Decode(_)), "{err:?}");
}
