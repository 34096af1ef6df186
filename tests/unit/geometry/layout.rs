use super::*;

#[test]
fn draw_size_respects_the_gap_bound_for_all_face_sizes() {
    for face in 2u32..=4096 {
        let l = compute_layout(face, CENTER_GAP_RATIO, OVERLAP_MARGIN);
        assert!(l.draw_size <= l.face_size, "face {face}");
        assert!(
            f64::from(l.gap) * SQRT_2 * OVERLAP_MARGIN >= f64::from(l.draw_size),
            "face {face}"
        );
        assert_eq!(l.gap, (f64::from(face) * 0.25).round() as u32);
    }
}

#[test]
fn layout_for_known_face_size() {
    let l = PanelLayout::for_source(400, 300).unwrap();
    assert_eq!(l.face_size, 400);
    assert_eq!(l.gap, 100);
    // floor(100 * 1.41421356 * 1.05) = 148
    assert_eq!(l.draw_size, 148);
    assert_eq!(l.canvas_size(), 600);
    assert_eq!(l.canvas_center(), Point::new(300.0, 300.0));
    assert_eq!(l.narrow_edge_ratio, NARROW_EDGE_RATIO);
}

#[test]
fn for_source_rejects_empty() {
    assert!(PanelLayout::for_source(0, 10).is_err());
    assert!(PanelLayout::for_source(1, 1).is_ok());
}

#[test]
fn panel_centers_form_a_cross() {
    let c = Point::new(50.0, 50.0);
    assert_eq!(panel_center(PanelSide::Top, c, 10), Point::new(50.0, 40.0));
    assert_eq!(panel_center(PanelSide::Right, c, 10), Point::new(60.0, 50.0));
    assert_eq!(panel_center(PanelSide::Bottom, c, 10), Point::new(50.0, 60.0));
    assert_eq!(panel_center(PanelSide::Left, c, 10), Point::new(40.0, 50.0));
}

#[test]
fn narrow_edge_faces_the_center_for_every_side() {
    let l = PanelLayout::for_source(200, 200).unwrap();
    let center = l.canvas_center();
    for side in PanelSide::ALL {
        let clip = l.clip(side).trapezoid;
        let wide_mid = clip.points[0].midpoint(clip.points[1]);
        let narrow_mid = clip.points[2].midpoint(clip.points[3]);
        assert!(
            (narrow_mid - center).hypot() < (wide_mid - center).hypot(),
            "{side:?}"
        );
        let wide = clip.edge_len(0);
        let narrow = clip.edge_len(2);
        assert!((narrow / wide - NARROW_EDGE_RATIO).abs() < 1e-9, "{side:?}");
    }
}

#[test]
fn trapezoid_contains_its_interior_only() {
    let t = trapezoid_path(PanelSide::Top, 10.0, 0.5);
    assert!(t.contains(Point::new(0.0, 0.0)));
    assert!(t.contains(Point::new(-9.0, -9.0)));
    // Near the narrow edge the outer corners are clipped away.
    assert!(!t.contains(Point::new(-9.0, 9.0)));
    assert!(!t.contains(Point::new(0.0, 11.0)));

    let moved = t.transformed(Affine::translate((100.0, 100.0)));
    assert!(moved.contains(Point::new(100.0, 100.0)));
    assert_eq!(moved.bounding_box(), Rect::new(90.0, 90.0, 110.0, 110.0));
    assert_eq!(moved.to_bez_path().elements().len(), 5);
}

#[test]
fn every_pixel_center_belongs_to_at_most_one_panel() {
    for face in [10u32, 64, 101, 640, 1024] {
        let l = compute_layout(face, CENTER_GAP_RATIO, OVERLAP_MARGIN);
        let clips = PanelSide::ALL.map(|side| l.clip(side));
        let size = l.canvas_size();
        let mut shared = 0usize;
        for y in 0..size {
            for x in 0..size {
                let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if clips.iter().filter(|c| c.contains(p)).count() > 1 {
                    shared += 1;
                }
            }
        }
        assert_eq!(shared, 0, "face {face}");
    }
}

#[test]
fn panel_clip_keeps_its_center_and_drops_the_neighbours_quadrant() {
    let l = PanelLayout::for_source(640, 640).unwrap();
    let c = l.canvas_center();
    for side in PanelSide::ALL {
        let clip = l.clip(side);
        assert!(clip.contains(l.panel_center(side)), "{side:?}");
        assert_eq!(clip.bounding_box(), clip.trapezoid.bounding_box());
    }
    // Just right of the upper-right diagonal, inside TOP's trapezoid but owned by RIGHT.
    let top = l.clip(PanelSide::Top);
    let p = c + Vec2::new(52.0, -50.0);
    assert!(top.trapezoid.contains(p));
    assert!(!top.contains(p));
}

#[test]
fn quadrants_partition_the_plane() {
    assert_eq!(PanelSide::owning(Vec2::new(0.0, -5.0)), PanelSide::Top);
    assert_eq!(PanelSide::owning(Vec2::new(5.0, 0.0)), PanelSide::Right);
    assert_eq!(PanelSide::owning(Vec2::new(0.0, 5.0)), PanelSide::Bottom);
    assert_eq!(PanelSide::owning(Vec2::new(-5.0, 0.0)), PanelSide::Left);
    assert_eq!(PanelSide::owning(Vec2::new(-0.0, 5.0)), PanelSide::Bottom);
    for side in PanelSide::ALL {
        assert_eq!(PanelSide::owning(side.outward() * 3.0), side);
    }
}
