use super::*;
use crate::geometry::layout::PanelLayout;
use crate::policy::resource::{CapabilityClass, StaticProbe};

fn normal() -> ResourceBudget {
    budget_for(CapabilityClass::Normal)
}

fn constrained() -> ResourceBudget {
    budget_for(CapabilityClass::Constrained)
}

fn spec(duration_seconds: f64, fps: u32, direction: Direction) -> AnimationSpec {
    AnimationSpec {
        duration_seconds,
        fps,
        direction,
        loop_playback: true,
    }
}

#[test]
fn forward_plan_spans_zero_to_one() {
    let plan = FadePlan::new(&spec(2.0, 24, Direction::Forward), &normal()).unwrap();
    assert_eq!(plan.fps, 24);
    assert_eq!(plan.len(), 48);
    assert_eq!(plan.alphas[0], 0.0);
    assert_eq!(*plan.alphas.last().unwrap(), 1.0);
    assert!(plan.alphas.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn reverse_plan_is_forward_reversed() {
    let fwd = FadePlan::new(&spec(1.0, 10, Direction::Forward), &normal()).unwrap();
    let rev = FadePlan::new(&spec(1.0, 10, Direction::Reverse), &normal()).unwrap();
    let mut expected = fwd.alphas.clone();
    expected.reverse();
    assert_eq!(rev.alphas, expected);
}

#[test]
fn pingpong_skips_repeated_endpoints() {
    let plan = FadePlan::new(&spec(1.0, 10, Direction::Pingpong), &normal()).unwrap();
    assert_eq!(plan.forward_frames, 10);
    assert_eq!(plan.len(), 18);
    assert_eq!(plan.alphas[0], 0.0);
    assert_eq!(plan.alphas[9], 1.0);
    assert_eq!(plan.alphas[10], plan.alphas[8]);
    assert_eq!(plan.alphas[17], plan.alphas[1]);
}

#[test]
fn minimum_is_two_frames() {
    let plan = FadePlan::new(&spec(0.01, 24, Direction::Forward), &normal()).unwrap();
    assert_eq!(plan.alphas, vec![0.0, 1.0]);

    let plan = FadePlan::new(&spec(0.01, 24, Direction::Pingpong), &normal()).unwrap();
    assert_eq!(plan.alphas, vec![0.0, 1.0]);
}

#[test]
fn constrained_budget_caps_rate_and_count() {
    let plan = FadePlan::new(&spec(2.0, 24, Direction::Forward), &constrained()).unwrap();
    assert_eq!(plan.fps, 16);
    assert_eq!(plan.len(), 32);

    let plan = FadePlan::new(&spec(10.0, 60, Direction::Forward), &constrained()).unwrap();
    assert_eq!(plan.len(), 48);

    let plan = FadePlan::new(&spec(10.0, 60, Direction::Pingpong), &constrained()).unwrap();
    assert!(plan.len() <= 48, "{}", plan.len());
    assert_eq!(plan.forward_frames, 25);
}

#[test]
fn invalid_specs_are_rejected() {
    assert!(FadePlan::new(&spec(0.0, 24, Direction::Forward), &normal()).is_err());
    assert!(FadePlan::new(&spec(f64::NAN, 24, Direction::Forward), &normal()).is_err());
    assert!(FadePlan::new(&spec(1.0, 0, Direction::Forward), &normal()).is_err());
}

#[test]
fn direction_parses_case_insensitively() {
    assert_eq!("Forward".parse::<Direction>().unwrap(), Direction::Forward);
    assert_eq!("REVERSE".parse::<Direction>().unwrap(), Direction::Reverse);
    assert_eq!("ping-pong".parse::<Direction>().unwrap(), Direction::Pingpong);
    assert!("sideways".parse::<Direction>().is_err());
}

#[test]
fn animation_spec_json_defaults() {
    let spec: AnimationSpec = serde_json::from_str(r#"{"fps": 12, "loop": false}"#).unwrap();
    assert_eq!(spec.fps, 12);
    assert!(!spec.loop_playback);
    assert_eq!(spec.duration_seconds, 2.0);
    assert_eq!(spec.direction, Direction::Pingpong);
}

#[test]
fn generated_frames_are_hologram_canvases() {
    let a = Raster::filled(8, 6, [255, 0, 0, 255]);
    let b = Raster::filled(8, 6, [0, 0, 255, 255]);
    let seq = FadeSequencer::new(normal());
    let frames = seq
        .generate(&a, &b, &spec(0.5, 8, Direction::Forward))
        .unwrap();
    assert_eq!(frames.len(), 4);

    let layout = PanelLayout::for_source(8, 6).unwrap();
    let size = layout.canvas_size();
    let top = layout.panel_center(crate::geometry::layout::PanelSide::Top);
    for f in &frames {
        assert_eq!((f.width, f.height), (size, size));
    }
    assert_eq!(frames[0].pixel(top.x as u32, top.y as u32), [255, 0, 0, 255]);
    assert_eq!(
        frames[3].pixel(top.x as u32, top.y as u32),
        [0, 0, 255, 255]
    );
}

#[test]
fn pingpong_frames_form_a_palindrome_around_the_turn() {
    let a = Raster::filled(6, 6, [200, 10, 10, 255]);
    let b = Raster::filled(6, 6, [10, 10, 200, 255]);
    let seq = FadeSequencer::new(normal());
    let frames = seq
        .generate(&a, &b, &spec(0.5, 8, Direction::Pingpong))
        .unwrap();
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[1], frames[5]);
    assert_eq!(frames[2], frames[4]);
}

#[test]
fn sources_are_prescaled_to_the_budget() {
    let a = Raster::filled(1500, 10, [255, 255, 255, 255]);
    let b = Raster::filled(10, 10, [0, 0, 0, 255]);
    let seq = FadeSequencer::from_probe(&StaticProbe::constrained());
    assert_eq!(seq.budget(), constrained());

    let mut seen = 0;
    seq.for_each_frame(&a, &b, &spec(0.01, 24, Direction::Forward), |_, frame| {
        let layout = PanelLayout::for_source(1024, 10).unwrap();
        assert_eq!(frame.width, layout.canvas_size());
        seen += 1;
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, 2);
}

#[test]
fn undecodable_bytes_produce_no_frames() {
    let seq = FadeSequencer::new(normal());
    let png = crate::media::decode::encode_png(&Raster::filled(4, 4, [1, 2, 3, 255])).unwrap();
    let err = seq
        .generate_from_bytes(&png, b"garbage", &AnimationSpec::default())
        .unwrap_err();
    assert!(matches!(err, HoloError::Decode(_)), "{err:?}");
}
