use super::*;

#[test]
fn cancel_token_is_shared_and_sticky() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(a.check().is_ok());
    b.cancel();
    assert!(a.is_cancelled());
    assert!(matches!(a.check(), Err(HoloError::Cancelled)));
}

#[test]
fn slot_rejects_a_second_job_while_running() {
    let slot = JobSlot::default();
    assert_eq!(slot.snapshot().state, JobState::Idle);

    let guard = slot.try_begin(ExportFormat::Gif, 12, 3).unwrap();
    assert!(matches!(
        slot.try_begin(ExportFormat::Video, 12, 3),
        Err(HoloError::EncoderBusy)
    ));

    guard.finish(Ok(())).unwrap();
    let job = slot.snapshot();
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.format, Some(ExportFormat::Gif));
    assert!(slot.try_begin(ExportFormat::Video, 12, 3).is_ok());
}

#[test]
fn finish_maps_errors_to_states() {
    let slot = JobSlot::default();
    let g = slot.try_begin(ExportFormat::Gif, 1, 1).unwrap();
    let _ = g.finish::<()>(Err(HoloError::Cancelled));
    assert_eq!(slot.snapshot().state, JobState::Cancelled);

    let g = slot.try_begin(ExportFormat::Gif, 1, 1).unwrap();
    let _ = g.finish::<()>(Err(HoloError::encode("boom")));
    assert_eq!(slot.snapshot().state, JobState::Failed);
}

#[test]
fn dropped_guard_marks_failure_and_frees_slot() {
    let slot = JobSlot::default();
    drop(slot.try_begin(ExportFormat::Video, 1, 1).unwrap());
    assert_eq!(slot.snapshot().state, JobState::Failed);
    assert!(slot.snapshot().state.is_terminal());
    assert!(slot.try_begin(ExportFormat::Video, 1, 1).is_ok());
}

#[test]
fn progress_never_decreases() {
    let slot = JobSlot::default();
    let g = slot.try_begin(ExportFormat::Gif, 1, 4).unwrap();
    g.set_progress(50);
    g.set_progress(25);
    assert_eq!(slot.snapshot().progress_percent, 50);
    g.set_progress(200);
    assert_eq!(slot.snapshot().progress_percent, 100);
}

#[test]
fn container_metadata() {
    assert_eq!(Container::Mp4.mime(), "video/mp4");
    assert_eq!(Container::WebM.extension(), "webm");
    assert_eq!(Container::Gif.mime(), "image/gif");
}

#[test]
fn output_path_follows_the_negotiated_container() {
    use std::path::{Path, PathBuf};

    assert_eq!(
        Container::WebM.output_path(Path::new("out/holo.mp4")),
        PathBuf::from("out/holo.webm")
    );
    assert_eq!(
        Container::Mp4.output_path(Path::new("out/holo.MP4")),
        PathBuf::from("out/holo.MP4")
    );
    assert_eq!(
        Container::Gif.output_path(Path::new("holo")),
        PathBuf::from("holo.gif")
    );
}
