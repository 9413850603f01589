#![allow(clippy::float_cmp)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::persist::PersistedBlock;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn block(id: u64, word: &str, rect: Rect) -> PersistedBlock {
    PersistedBlock { question_id: RegionId(id), word: word.to_owned(), block_coordinates: rect }
}

fn test_with(blocks: Vec<PersistedBlock>, arrows: Vec<PersistedArrow>) -> PersistedTest {
    PersistedTest {
        image_url: "https://cdn.example/zoo.png".into(),
        blocks,
        has_arrow: !arrows.is_empty(),
        arrow: arrows.first().cloned(),
        arrows,
    }
}

fn zoo_test() -> PersistedTest {
    test_with(
        vec![
            block(1, "Dog", Rect::new(100.0, 100.0, 200.0, 100.0)),
            block(2, "Cat", Rect::new(600.0, 350.0, 200.0, 100.0)),
        ],
        Vec::new(),
    )
}

/// Image 1000x500 in a 500x500 container: scale 0.5, image at (0, 125).
/// Dog region displays at (50,175 100x50), Cat at (300,300 100x50).
fn zoo_runtime(config: MatchConfig) -> PlacementRuntime {
    let mut rt = PlacementRuntime::new(&zoo_test(), config);
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));
    rt
}

const DOG: LabelId = LabelId(1);
const CAT: LabelId = LabelId(2);
const DOG_REGION: RegionId = RegionId(1);
const CAT_REGION: RegionId = RegionId(2);

fn view(rt: &PlacementRuntime, id: LabelId) -> LabelView {
    rt.label_views().into_iter().find(|v| v.id == id).unwrap()
}

/// Grab a label at its top-left corner and release it at `at`.
fn drag_label(rt: &mut PlacementRuntime, id: LabelId, at: Point) -> Option<DropOutcome> {
    let origin = view(rt, id).rect.top_left();
    assert!(rt.begin_drag(id, origin));
    rt.drag_to(pt((origin.x + at.x) / 2.0, (origin.y + at.y) / 2.0));
    rt.end_drag(at)
}

// =============================================================
// Rehydration
// =============================================================

#[test]
fn new_builds_one_region_and_one_label_per_block() {
    let rt = PlacementRuntime::new(&zoo_test(), MatchConfig::default());
    assert_eq!(rt.regions().len(), 2);
    assert_eq!(rt.regions()[0].rect(), Rect::new(100.0, 100.0, 200.0, 100.0));
    let words: Vec<&str> = rt.labels().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(words, ["Dog", "Cat"]);
    assert!(rt.labels().iter().all(|l| l.region_id.is_none()));
    assert!(rt.placements().is_empty());
    assert_eq!(rt.image().load, ImageLoad::Pending);
}

#[test]
fn duplicate_question_ids_keep_the_first_block() {
    let test = test_with(
        vec![
            block(1, "Dog", Rect::new(100.0, 100.0, 200.0, 100.0)),
            block(1, "Wolf", Rect::new(600.0, 350.0, 200.0, 100.0)),
            block(2, "Cat", Rect::new(600.0, 100.0, 200.0, 100.0)),
        ],
        Vec::new(),
    );
    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());

    let regions: Vec<RegionId> = rt.regions().iter().map(|r| r.id).collect();
    assert_eq!(regions, vec![DOG_REGION, CAT_REGION]);
    let words: Vec<&str> = rt.labels().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(words, vec!["Dog", "Cat"]);

    rt.place(DOG, DOG_REGION);
    rt.place(CAT, CAT_REGION);
    let report = rt.score();
    assert_eq!((report.score, report.max_score), (2, 2));
}

#[test]
fn nothing_is_laid_out_before_the_container_is_known() {
    let mut rt = PlacementRuntime::new(&zoo_test(), MatchConfig::default());
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));
    assert!(rt.transform().is_none());
    assert!(rt.region_rects().is_empty());
    assert!(rt.label_views().is_empty());
    assert_eq!(rt.drop_label(DOG, Rect::new(0.0, 0.0, 60.0, 34.0)), DropOutcome::Unplaced);
}

#[test]
fn region_rects_follow_the_transform() {
    let rt = zoo_runtime(MatchConfig::default());
    let rects = rt.region_rects();
    assert_eq!(rects[0], (DOG_REGION, Rect::new(50.0, 175.0, 100.0, 50.0)));
    assert_eq!(rects[1], (CAT_REGION, Rect::new(300.0, 300.0, 100.0, 50.0)));
}

// =============================================================
// Image fallback
// =============================================================

#[test]
fn failed_image_falls_back_to_recorded_arrow_size() {
    let arrow = PersistedArrow {
        start_x: 0.0,
        start_y: 0.0,
        end_x: 0.0,
        end_y: 0.0,
        rel_start_x: None,
        rel_start_y: None,
        rel_end_x: None,
        rel_end_y: None,
        image_width: Some(1000.0),
        image_height: Some(500.0),
        style: ConnectorStyle::default(),
    };
    let mut test = zoo_test();
    test.has_arrow = true;
    test.arrow = Some(arrow);

    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Failed("404".into()));

    assert!(matches!(rt.image().load, ImageLoad::Failed(_)));
    let t = rt.transform().unwrap();
    assert_eq!(t.scale, 0.5);
    assert_eq!(t.display_y, 125.0);
}

#[test]
fn failed_image_without_arrows_fits_region_extent() {
    let mut rt = PlacementRuntime::new(&zoo_test(), MatchConfig::default());
    rt.set_container(Size::new(400.0, 400.0));
    rt.set_image(ImageLoad::Failed("decode error".into()));

    // Extent is 800x450, so the fit scale is 0.5.
    let t = rt.transform().unwrap();
    assert_eq!(t.original_size(), Size::new(800.0, 450.0));
    assert_eq!(t.scale, 0.5);
    assert_eq!(t.display_y, 87.5);
    assert_eq!(rt.label_views().len(), 2);
}

// =============================================================
// Unplaced flow
// =============================================================

#[test]
fn unplaced_labels_flow_below_the_image() {
    let rt = zoo_runtime(MatchConfig::default());
    let flow = rt.unplaced_layout();
    assert_eq!(flow, vec![
        (DOG, Rect::new(12.0, 387.0, 60.0, 34.0)),
        (CAT, Rect::new(84.0, 387.0, 60.0, 34.0)),
    ]);
}

#[test]
fn long_labels_wrap_to_the_next_row() {
    let word = "a".repeat(30); // 30 * 8 + 20 = 260 wide
    let test = test_with(
        vec![
            block(1, &word, Rect::new(0.0, 0.0, 50.0, 50.0)),
            block(2, &word, Rect::new(100.0, 0.0, 50.0, 50.0)),
        ],
        Vec::new(),
    );
    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));

    let flow = rt.unplaced_layout();
    assert_eq!(flow[0].1, Rect::new(12.0, 387.0, 260.0, 34.0));
    assert_eq!(flow[1].1, Rect::new(12.0, 425.0, 260.0, 34.0));
}

#[test]
fn oversized_first_label_stays_on_its_row() {
    let word = "b".repeat(70);
    let test = test_with(vec![block(1, &word, Rect::new(0.0, 0.0, 50.0, 50.0))], Vec::new());
    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));
    assert_eq!(rt.unplaced_layout()[0].1.top_left(), pt(12.0, 387.0));
}

// =============================================================
// Drag and drop
// =============================================================

#[test]
fn dropping_on_a_region_places_and_centers_the_label() {
    let mut rt = zoo_runtime(MatchConfig::default());
    let outcome = drag_label(&mut rt, DOG, pt(92.0, 197.0));
    assert_eq!(outcome, Some(DropOutcome::Placed { region: DOG_REGION, evicted: None }));
    assert_eq!(rt.placements().get(&DOG_REGION), Some(&DOG));

    let dog = view(&rt, DOG);
    assert!(dog.is_placed());
    assert!(!dog.dragging);
    assert_eq!(dog.rect, Rect::new(70.0, 183.0, 60.0, 34.0));

    // Cat closes the gap in the flow.
    assert_eq!(rt.unplaced_layout(), vec![(CAT, Rect::new(12.0, 387.0, 60.0, 34.0))]);
}

#[test]
fn dragging_label_follows_the_pointer_with_its_grab_offset() {
    let mut rt = zoo_runtime(MatchConfig::default());
    assert!(rt.begin_drag(DOG, pt(20.0, 390.0)));
    rt.drag_to(pt(200.0, 100.0));
    let dog = view(&rt, DOG);
    assert!(dog.dragging);
    assert_eq!(dog.rect.top_left(), pt(192.0, 97.0));

    rt.cancel_drag();
    assert_eq!(view(&rt, DOG).rect.top_left(), pt(12.0, 387.0));
    assert!(rt.placements().is_empty());
}

#[test]
fn begin_drag_on_unknown_label_is_refused() {
    let mut rt = zoo_runtime(MatchConfig::default());
    assert!(!rt.begin_drag(LabelId(99), pt(0.0, 0.0)));
    assert_eq!(rt.end_drag(pt(0.0, 0.0)), None);
}

#[test]
fn dropping_outside_every_region_unplaces() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    let outcome = drag_label(&mut rt, DOG, pt(200.0, 440.0));
    assert_eq!(outcome, Some(DropOutcome::Unplaced));
    assert!(rt.placements().is_empty());
    assert!(!view(&rt, DOG).is_placed());
}

#[test]
fn rebinding_moves_the_label_between_regions() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    let outcome = drag_label(&mut rt, DOG, pt(320.0, 310.0));
    assert_eq!(outcome, Some(DropOutcome::Placed { region: CAT_REGION, evicted: None }));
    assert_eq!(rt.placements().len(), 1);
    assert_eq!(rt.placements().get(&CAT_REGION), Some(&DOG));
}

#[test]
fn redropping_on_the_same_region_is_a_no_op() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    let outcome = drag_label(&mut rt, DOG, pt(80.0, 180.0));
    assert_eq!(outcome, Some(DropOutcome::Placed { region: DOG_REGION, evicted: None }));
    assert_eq!(rt.placements().len(), 1);
}

#[test]
fn occupied_region_evicts_by_default() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    let outcome = drag_label(&mut rt, CAT, pt(92.0, 197.0));
    assert_eq!(outcome, Some(DropOutcome::Placed { region: DOG_REGION, evicted: Some(DOG) }));
    assert_eq!(rt.placements().get(&DOG_REGION), Some(&CAT));
    assert!(!rt.is_placed(DOG));
    assert_eq!(rt.unplaced_layout()[0].0, DOG);
}

#[test]
fn occupied_region_rejects_under_reject_policy() {
    let config = MatchConfig { occupied_policy: OccupiedPolicy::Reject, ..MatchConfig::default() };
    let mut rt = zoo_runtime(config);
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    let outcome = drag_label(&mut rt, CAT, pt(92.0, 197.0));
    assert_eq!(outcome, Some(DropOutcome::Rejected { region: DOG_REGION }));
    assert_eq!(rt.placements().get(&DOG_REGION), Some(&DOG));
    assert!(!rt.is_placed(CAT));
}

#[test]
fn rejected_drop_keeps_the_labels_previous_region() {
    let config = MatchConfig { occupied_policy: OccupiedPolicy::Reject, ..MatchConfig::default() };
    let mut rt = zoo_runtime(config);
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    drag_label(&mut rt, CAT, pt(320.0, 310.0));
    let outcome = drag_label(&mut rt, CAT, pt(92.0, 197.0));
    assert_eq!(outcome, Some(DropOutcome::Rejected { region: DOG_REGION }));
    assert_eq!(rt.placements().get(&CAT_REGION), Some(&CAT));
}

#[test]
fn overlapping_two_regions_binds_the_first_persisted() {
    let blocks = vec![
        block(1, "Left", Rect::new(0.0, 0.0, 100.0, 100.0)),
        block(2, "Right", Rect::new(100.0, 0.0, 100.0, 100.0)),
    ];
    // 200x100 image at scale 1 in a 200x200 container sits at y = 50.
    let straddle = Rect::new(80.0, 60.0, 60.0, 34.0);

    let mut rt = PlacementRuntime::new(&test_with(blocks.clone(), Vec::new()), MatchConfig::default());
    rt.set_container(Size::new(200.0, 200.0));
    rt.set_image(ImageLoad::Ready(Size::new(200.0, 100.0)));
    assert_eq!(rt.drop_label(LabelId(2), straddle), DropOutcome::Placed { region: RegionId(1), evicted: None });

    let reversed: Vec<_> = blocks.into_iter().rev().collect();
    let mut rt = PlacementRuntime::new(&test_with(reversed, Vec::new()), MatchConfig::default());
    rt.set_container(Size::new(200.0, 200.0));
    rt.set_image(ImageLoad::Ready(Size::new(200.0, 100.0)));
    assert_eq!(rt.drop_label(LabelId(2), straddle), DropOutcome::Placed { region: RegionId(2), evicted: None });
}

#[test]
fn touching_edges_do_not_count_as_overlap() {
    let mut rt = zoo_runtime(MatchConfig::default());
    // Dog region spans x 50..150; a box ending exactly at 50 does not overlap.
    assert_eq!(rt.drop_label(DOG, Rect::new(-10.0, 180.0, 60.0, 34.0)), DropOutcome::Unplaced);
}

#[test]
fn unknown_label_drop_is_ignored() {
    let mut rt = zoo_runtime(MatchConfig::default());
    assert_eq!(rt.drop_label(LabelId(42), Rect::new(60.0, 180.0, 60.0, 34.0)), DropOutcome::Unplaced);
    assert!(rt.placements().is_empty());
}

// =============================================================
// Viewport changes
// =============================================================

#[test]
fn resize_recenters_placed_labels() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));

    rt.set_container(Size::new(1000.0, 1000.0));
    // Scale 1, image at (0, 250): Dog region displays at (100,350 200x100).
    assert_eq!(view(&rt, DOG).rect, Rect::new(170.0, 383.0, 60.0, 34.0));
    assert_eq!(rt.placements().get(&DOG_REGION), Some(&DOG));
}

#[test]
fn connectors_redraw_from_percentages() {
    let arrow = PersistedArrow {
        start_x: 0.0,
        start_y: 0.0,
        end_x: 0.0,
        end_y: 0.0,
        rel_start_x: Some(20.0),
        rel_start_y: Some(30.0),
        rel_end_x: Some(50.0),
        rel_end_y: Some(50.0),
        image_width: Some(1000.0),
        image_height: Some(500.0),
        style: ConnectorStyle::default(),
    };
    let mut test = zoo_test();
    test.arrows = vec![arrow.clone()];
    test.arrow = Some(arrow);
    test.has_arrow = true;

    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));

    let segments = rt.connector_segments();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].start, pt(100.0, 200.0));
    assert_eq!(segments[0].end, pt(250.0, 250.0));

    rt.set_container(Size::new(1000.0, 1000.0));
    assert_eq!(rt.connector_segments()[0].start, pt(200.0, 400.0));
}

// =============================================================
// Progress, reset, scoring
// =============================================================

#[test]
fn progress_gates_submission() {
    let mut rt = zoo_runtime(MatchConfig::default());
    assert_eq!(rt.progress(), 0.0);
    assert!(!rt.can_submit());

    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    assert_eq!(rt.progress(), 50.0);
    assert!(!rt.can_submit());

    drag_label(&mut rt, CAT, pt(320.0, 310.0));
    assert_eq!(rt.progress(), 100.0);
    assert!(rt.can_submit());
}

#[test]
fn empty_test_never_submits() {
    let rt = PlacementRuntime::new(&test_with(Vec::new(), Vec::new()), MatchConfig::default());
    assert_eq!(rt.progress(), 0.0);
    assert!(!rt.can_submit());
}

#[test]
fn reset_returns_every_label_to_the_flow() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    rt.begin_drag(CAT, pt(90.0, 390.0));
    rt.reset();
    assert!(rt.placements().is_empty());
    assert!(rt.label_views().iter().all(|v| !v.is_placed() && !v.dragging));
}

#[test]
fn swapped_labels_score_zero() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, CAT, pt(92.0, 197.0));
    drag_label(&mut rt, DOG, pt(320.0, 310.0));
    let report = rt.score();
    assert_eq!(report.score, 0);
    assert_eq!(report.max_score, 2);
    assert!(!report.passed);
}

#[test]
fn correct_placements_pass() {
    let mut rt = zoo_runtime(MatchConfig::default());
    drag_label(&mut rt, DOG, pt(92.0, 197.0));
    drag_label(&mut rt, CAT, pt(320.0, 310.0));
    let report = rt.score();
    assert_eq!(report.score, 2);
    assert_eq!(report.percentage, 100);
    assert!(report.passed);
}

#[test]
fn shuffle_is_a_seeded_permutation() {
    let blocks: Vec<_> = (1..=8)
        .map(|i| block(i, &format!("w{i}"), Rect::new(0.0, 0.0, 10.0, 10.0)))
        .collect();
    let test = test_with(blocks, Vec::new());

    let order = |seed: u64| {
        let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
        rt.shuffle_labels(&mut StdRng::seed_from_u64(seed));
        rt.labels().iter().map(|l| l.id).collect::<Vec<_>>()
    };

    let first = order(7);
    assert_eq!(first, order(7));
    let mut sorted = first.clone();
    sorted.sort();
    assert_eq!(sorted, (1..=8).map(LabelId).collect::<Vec<_>>());
}

#[test]
fn place_binds_without_geometry() {
    let mut rt = PlacementRuntime::new(&zoo_test(), MatchConfig::default());
    assert_eq!(rt.place(CAT, CAT_REGION), DropOutcome::Placed { region: CAT_REGION, evicted: None });
    assert_eq!(rt.place(DOG, CAT_REGION), DropOutcome::Placed { region: CAT_REGION, evicted: Some(CAT) });
    assert_eq!(rt.place(DOG, RegionId(9)), DropOutcome::Unplaced);
    assert_eq!(rt.place(LabelId(9), DOG_REGION), DropOutcome::Unplaced);
    assert_eq!(rt.placements().len(), 1);
}
