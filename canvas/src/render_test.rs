#![allow(clippy::float_cmp)]

use super::*;
use crate::authoring::{Action, AuthoringCore};
use crate::config::MatchConfig;
use crate::doc::{LabelId, RegionId};
use crate::input::Tool;
use crate::persist::{PersistedBlock, PersistedTest};

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn record_authoring(core: &AuthoringCore) -> Vec<DrawOp> {
    let mut r = RecordingRenderer::new();
    let Ok(()) = draw_authoring(&mut r, &core.state);
    r.ops
}

fn authoring_core() -> AuthoringCore {
    let mut core = AuthoringCore::new(MatchConfig::default());
    core.dispatch(Action::SetContainer(Size::new(500.0, 500.0)));
    core.dispatch(Action::UploadImage { url: "https://cdn.example/zoo.png".into() });
    core.dispatch(Action::ImageDecoded(ImageLoad::Ready(Size::new(1000.0, 500.0))));
    core
}

fn count(ops: &[DrawOp], pred: impl Fn(&DrawOp) -> bool) -> usize {
    ops.iter().filter(|op| pred(op)).count()
}

// =============================================================
// Authoring
// =============================================================

#[test]
fn empty_canvas_draws_image_only() {
    let ops = record_authoring(&authoring_core());
    assert_eq!(ops, vec![
        DrawOp::Clear { size: Size::new(500.0, 500.0) },
        DrawOp::Image { url: "https://cdn.example/zoo.png".into(), rect: Rect::new(0.0, 125.0, 500.0, 250.0) },
    ]);
}

#[test]
fn pending_image_is_not_drawn() {
    let mut core = AuthoringCore::new(MatchConfig::default());
    core.dispatch(Action::SetContainer(Size::new(500.0, 500.0)));
    core.dispatch(Action::UploadImage { url: "https://cdn.example/slow.png".into() });
    let ops = record_authoring(&core);
    assert_eq!(count(&ops, |op| matches!(op, DrawOp::Image { .. })), 0);
}

#[test]
fn regions_draw_with_their_words() {
    let mut core = authoring_core();
    core.dispatch(Action::PointerDown(pt(50.0, 175.0)));
    core.dispatch(Action::PointerUp(pt(150.0, 225.0)));
    core.dispatch(Action::Select(None));

    let ops = record_authoring(&core);
    assert!(ops.contains(&DrawOp::Rect { rect: Rect::new(50.0, 175.0, 100.0, 50.0), style: REGION_STYLE }));
    assert!(ops.contains(&DrawOp::Text { text: "Word 1".into(), rect: Rect::new(50.0, 175.0, 100.0, 50.0) }));
    assert_eq!(count(&ops, |op| matches!(op, DrawOp::Rect { style, .. } if *style == HANDLE_STYLE)), 0);
}

#[test]
fn selected_region_gets_highlight_and_handle() {
    let mut core = authoring_core();
    core.dispatch(Action::PointerDown(pt(50.0, 175.0)));
    core.dispatch(Action::PointerUp(pt(150.0, 225.0)));
    let id = core.doc().regions().next().unwrap().id;
    core.dispatch(Action::Select(Some(id)));

    let ops = record_authoring(&core);
    assert!(ops.contains(&DrawOp::Rect { rect: Rect::new(50.0, 175.0, 100.0, 50.0), style: SELECTED_REGION_STYLE }));
    let handle = Rect::new(146.0, 221.0, HANDLE_RADIUS_PX, HANDLE_RADIUS_PX);
    assert!(ops.contains(&DrawOp::Rect { rect: handle, style: HANDLE_STYLE }));
}

#[test]
fn draft_is_drawn_last() {
    let mut core = authoring_core();
    core.dispatch(Action::PointerDown(pt(10.0, 150.0)));
    core.dispatch(Action::PointerMove(pt(60.0, 200.0)));

    let ops = record_authoring(&core);
    assert_eq!(ops.last(), Some(&DrawOp::Rect { rect: Rect::new(10.0, 150.0, 50.0, 50.0), style: DRAFT_STYLE }));
}

#[test]
fn arrow_draft_uses_current_arrow_style() {
    let mut core = authoring_core();
    core.dispatch(Action::SetTool(Tool::Arrow));
    core.dispatch(Action::PointerDown(pt(10.0, 150.0)));
    core.dispatch(Action::PointerMove(pt(80.0, 160.0)));

    let ops = record_authoring(&core);
    assert_eq!(ops.last(), Some(&DrawOp::Arrow {
        start: pt(10.0, 150.0),
        end: pt(80.0, 160.0),
        style: ConnectorStyle::default(),
    }));
}

#[test]
fn redraw_replaces_previous_frame() {
    let core = authoring_core();
    let mut r = RecordingRenderer::new();
    let Ok(()) = draw_authoring(&mut r, &core.state);
    let Ok(()) = draw_authoring(&mut r, &core.state);
    assert_eq!(count(&r.ops, |op| matches!(op, DrawOp::Clear { .. })), 1);
}

// =============================================================
// Placement
// =============================================================

fn runtime() -> PlacementRuntime {
    let test = PersistedTest {
        image_url: "https://cdn.example/zoo.png".into(),
        blocks: vec![
            PersistedBlock { question_id: RegionId(1), word: "Dog".into(), block_coordinates: Rect::new(100.0, 100.0, 200.0, 100.0) },
            PersistedBlock { question_id: RegionId(2), word: "Cat".into(), block_coordinates: Rect::new(600.0, 350.0, 200.0, 100.0) },
        ],
        has_arrow: false,
        arrow: None,
        arrows: Vec::new(),
    };
    let mut rt = PlacementRuntime::new(&test, MatchConfig::default());
    rt.set_container(Size::new(500.0, 500.0));
    rt.set_image(ImageLoad::Ready(Size::new(1000.0, 500.0)));
    rt
}

fn record_placement(rt: &PlacementRuntime) -> Vec<DrawOp> {
    let mut r = RecordingRenderer::new();
    let Ok(()) = draw_placement(&mut r, rt, Size::new(500.0, 500.0));
    r.ops
}

#[test]
fn placement_draws_regions_then_labels() {
    let ops = record_placement(&runtime());
    assert!(matches!(ops[0], DrawOp::Clear { .. }));
    assert!(matches!(ops[1], DrawOp::Image { .. }));
    assert_eq!(ops[2], DrawOp::Rect { rect: Rect::new(50.0, 175.0, 100.0, 50.0), style: REGION_STYLE });
    assert_eq!(ops[3], DrawOp::Rect { rect: Rect::new(300.0, 300.0, 100.0, 50.0), style: REGION_STYLE });
    assert_eq!(ops[4], DrawOp::Rect { rect: Rect::new(12.0, 387.0, 60.0, 34.0), style: LABEL_STYLE });
    assert_eq!(ops[5], DrawOp::Text { text: "Dog".into(), rect: Rect::new(12.0, 387.0, 60.0, 34.0) });
}

#[test]
fn placed_and_dragged_labels_are_styled() {
    let mut rt = runtime();
    rt.drop_label(LabelId(1), Rect::new(60.0, 180.0, 60.0, 34.0));
    assert!(rt.begin_drag(LabelId(2), pt(12.0, 387.0)));
    rt.drag_to(pt(200.0, 50.0));

    let ops = record_placement(&rt);
    assert!(ops.contains(&DrawOp::Rect { rect: Rect::new(70.0, 183.0, 60.0, 34.0), style: PLACED_LABEL_STYLE }));
    let n = ops.len();
    assert_eq!(ops[n - 2], DrawOp::Rect { rect: Rect::new(200.0, 50.0, 60.0, 34.0), style: DRAGGING_LABEL_STYLE });
    assert_eq!(ops[n - 1], DrawOp::Text { text: "Cat".into(), rect: Rect::new(200.0, 50.0, 60.0, 34.0) });
}

#[test]
fn ops_serialize_with_tag() {
    let json = serde_json::to_value(DrawOp::Clear { size: Size::new(1.0, 2.0) }).unwrap();
    assert_eq!(json["op"], "clear");
    assert_eq!(json["size"]["width"], 1.0);
}
