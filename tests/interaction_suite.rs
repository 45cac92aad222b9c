use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use mindsvg::attachment::Payload;
use mindsvg::drag::{HOVER_TIMEOUT, drag_state};
use mindsvg::event::{EventType, PRIMARY_BUTTON, handler};
use mindsvg::layout::{Point, TextSize};
use mindsvg::{
    Component, Direction, DomEvent, DomEventKind, FixedContainer, HookResult, MindEvent,
    MindEventKind, MindMap, Stamp, Theme, TopicData, TopicId, parse_mindmap, render_svg,
};
use serde_json::Value;

fn fixed(text: &str, size: f32) -> TextSize {
    TextSize {
        width: text.chars().count() as f32 * 8.0,
        height: size,
    }
}

fn project() -> TopicData {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project.json");
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    parse_mindmap(&input).expect("fixture parse failed")
}

fn surface() -> (MindMap, Rc<FixedContainer>) {
    let container = Rc::new(FixedContainer::new(1000.0, 700.0));
    let mut map = MindMap::new(container.clone());
    map.set_measure(Box::new(fixed));
    (map, container)
}

fn by_title(map: &MindMap, title: &str) -> TopicId {
    map.topics()
        .find(|id| map.tree().get(*id).is_some_and(|node| node.item.title == title))
        .unwrap_or_else(|| panic!("no topic titled {title}"))
}

fn record(map: &mut MindMap, kind: MindEventKind) -> Rc<RefCell<Vec<MindEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    map.on(kind, move |event, _| {
        sink.borrow_mut().push(event.clone());
        HookResult::Allow
    });
    log
}

fn on_title(kind: DomEventKind, topic: TopicId, at: Point, buttons: u16) -> DomEvent {
    DomEvent::new(kind)
        .on(topic, Some(Stamp::TopicTitle))
        .at(at, at)
        .with_buttons(buttons)
}

#[test]
fn title_click_focuses_and_background_click_clears() {
    let (mut map, _) = surface();
    map.show(&project());
    let changes = record(&mut map, MindEventKind::FocusChange);
    let design = by_title(&map, "Design");

    let outcome = map.handle_event(on_title(DomEventKind::Click, design, Point::default(), 0));
    assert!(outcome.default_prevented);
    assert_eq!(map.focus_topic(), Some(design));

    map.handle_event(DomEvent::new(DomEventKind::Click));
    assert_eq!(map.focus_topic(), None);
    assert_eq!(
        *changes.borrow(),
        vec![
            MindEvent::FocusChange { topic: Some(design) },
            MindEvent::FocusChange { topic: None },
        ]
    );
}

#[test]
fn pointer_click_hits_the_title_under_the_cursor() {
    let (mut map, _) = surface();
    map.show(&project());
    let build = by_title(&map, "Build");
    let zone = map.title_zone(build).unwrap();
    let offset = map.offset();
    let centre = zone.center();
    map.pointer_event(DomEventKind::Click, centre.x - offset.x, centre.y - offset.y, 0);
    assert!(map.is_in_focus(build));
}

#[test]
fn link_click_raises_invoke_link_then_focuses() {
    let (mut map, _) = surface();
    map.show(&project());
    let links = record(&mut map, MindEventKind::InvokeLink);
    let build = by_title(&map, "Build");
    map.handle_event(DomEvent::new(DomEventKind::Click).on(build, Some(Stamp::Link)));
    assert_eq!(
        *links.borrow(),
        vec![MindEvent::InvokeLink {
            topic: build,
            data: Some("https://example.com/board".to_string()),
        }]
    );
    assert!(map.is_in_focus(build));
}

#[test]
fn prepended_extension_handler_can_short_circuit_the_chain() {
    let (mut map, _) = surface();
    map.show(&project());
    let links = record(&mut map, MindEventKind::InvokeLink);
    let key = (EventType::Dom(DomEventKind::Click), Some(Stamp::Link));
    let previous = map
        .extensions_mut()
        .extend_handler("Topic", [(key, handler(|_, _| Some(Value::from("mine"))))], false)
        .unwrap();
    assert_eq!(previous[0].1.len(), 1);
    let build = by_title(&map, "Build");
    let outcome = map.handle_event(DomEvent::new(DomEventKind::Click).on(build, Some(Stamp::Link)));
    assert!(links.borrow().is_empty());
    assert!(!map.is_in_focus(build));
    assert_eq!(outcome.value, Some(Value::from("mine")));
    assert_eq!(map.extensions().table(Component::Topic).chain(key.0, key.1).map(<[_]>::len), Some(2));
}

#[test]
fn fold_icon_click_toggles_children() {
    let (mut map, _) = surface();
    map.show(&project());
    let design = by_title(&map, "Design");
    let wireframes = by_title(&map, "Wireframes");
    let click = DomEvent::new(DomEventKind::Click).on(design, Some(Stamp::FoldIcon));
    map.handle_event(click.clone());
    assert!(map.is_folded(design));
    assert!(map.is_in_focus(design));
    assert!(map.layout().get(wireframes).is_none());
    map.handle_event(click);
    assert!(!map.is_folded(design));
    assert!(map.layout().get(wireframes).is_some());
}

fn start_drag(map: &mut MindMap, topic: TopicId) {
    let at = map.title_zone(topic).unwrap().center();
    map.handle_event(on_title(DomEventKind::MouseDown, topic, at, PRIMARY_BUTTON));
    let moved = at.offset(12.0, 0.0);
    map.handle_event(on_title(DomEventKind::MouseMove, topic, moved, PRIMARY_BUTTON));
}

fn hover(map: &mut MindMap, target: TopicId) {
    let at = map.title_zone(target).unwrap().center();
    map.handle_event(on_title(DomEventKind::MouseOver, target, at, PRIMARY_BUTTON));
    map.tick(HOVER_TIMEOUT);
}

fn release(map: &mut MindMap, at: Point) {
    map.handle_event(DomEvent::new(DomEventKind::MouseUp).at(at, at));
}

#[test]
fn confirmed_drag_moves_the_topic_under_the_hovered_one() {
    let (mut map, _) = surface();
    map.set_config("draggable", true);
    map.show(&project());
    let ends = record(&mut map, MindEventKind::EndDrag);
    let confirms = record(&mut map, MindEventKind::ConfirmDrag);
    let design = by_title(&map, "Design");
    let visual = by_title(&map, "Visual pass");
    let api = by_title(&map, "API");
    let root = map.root().unwrap();

    start_drag(&mut map, api);
    assert_eq!(drag_state(&map).and_then(|state| state.dragging()), Some(api));
    assert!(!map.is_visible(api));
    hover(&mut map, design);
    assert_eq!(drag_state(&map).and_then(|state| state.hover()), Some(design));

    let below = map.item_zone(visual).unwrap();
    release(&mut map, Point::new(below.x, below.bottom() + 5.0));

    assert_eq!(map.parent(api), Some(design));
    assert_eq!(map.previous_sibling(api), Some(visual));
    assert_eq!(map.level(api), Some(2));
    assert!(map.is_visible(api));
    assert!(map.is_in_focus(api));
    assert!(map.layout().get(api).is_some());
    assert_eq!(ends.borrow().len(), 1);
    let build = by_title(&map, "Build");
    assert_eq!(
        confirms.borrow()[0],
        MindEvent::ConfirmDrag {
            topic: api,
            origin_parent: Some(build),
            new_parent: Some(design),
        }
    );
    assert!(map.children(root).contains(&design));
    assert_eq!(drag_state(&map).and_then(|state| state.dragging()), None);
}

#[test]
fn vetoed_drag_leaves_the_tree_untouched() {
    let (mut map, _) = surface();
    map.set_config("draggable", true);
    map.show(&project());
    map.on(MindEventKind::ConfirmDrag, |_, _| HookResult::Deny);
    let before = map.data();
    let api = by_title(&map, "API");
    let design = by_title(&map, "Design");

    start_drag(&mut map, api);
    hover(&mut map, design);
    let at = map.item_zone(design).unwrap().center();
    release(&mut map, at);

    assert_eq!(map.data(), before);
    assert!(map.is_visible(api));
    assert!(map.is_in_focus(api));
}

#[test]
fn dropping_left_of_the_root_switches_side() {
    let (mut map, _) = surface();
    map.set_config("draggable", true);
    map.show(&project());
    let root = map.root().unwrap();
    let build = by_title(&map, "Build");
    start_drag(&mut map, build);
    assert_eq!(drag_state(&map).and_then(|state| state.hover()), Some(root));

    let root_zone = map.item_zone(root).unwrap();
    release(&mut map, Point::new(root_zone.x - 40.0, root_zone.y - 500.0));

    assert_eq!(map.direction(build), Direction::Left);
    assert_eq!(map.children(root)[0], build);
    assert!(map.layout().get(build).unwrap().left);
}

#[test]
fn short_press_and_release_is_not_a_drag() {
    let (mut map, _) = surface();
    map.set_config("draggable", true);
    map.show(&project());
    let ends = record(&mut map, MindEventKind::EndDrag);
    let api = by_title(&map, "API");
    let at = map.title_zone(api).unwrap().center();
    map.handle_event(on_title(DomEventKind::MouseDown, api, at, PRIMARY_BUTTON));
    map.handle_event(on_title(DomEventKind::MouseMove, api, at.offset(2.0, 2.0), PRIMARY_BUTTON));
    map.handle_event(on_title(DomEventKind::MouseUp, api, at, 0));
    assert!(ends.borrow().is_empty());
    assert!(map.is_visible(api));
    assert_eq!(drag_state(&map).and_then(|state| state.armed()), None);
}

#[test]
fn drag_preview_is_rendered_while_dragging() {
    let (mut map, _) = surface();
    map.set_config("draggable", true);
    map.show(&project());
    let api = by_title(&map, "API");
    start_drag(&mut map, api);
    let svg = render_svg(&map, &Theme::classic());
    assert!(svg.contains("class=\"mind-topic-drag-box\""));
    assert!(svg.contains("class=\"mind-topic-drag-line\""));
    assert!(!svg.contains(&format!("data-mind-id=\"{}\"", map.topic_id(api).unwrap())));
}

#[test]
fn attachments_resolve_images_before_hooks() {
    let (mut map, _) = surface();
    map.attachments_mut().set(
        Some("banner"),
        Payload::Binary {
            mime: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        },
    );
    map.show(&project());
    let marketing = by_title(&map, "Marketing");
    let href = map.tree().get(marketing).unwrap().item.image_href.clone().unwrap();
    assert!(href.starts_with("data:image/png;base64,"));
    assert!(map.item_zone(marketing).unwrap().y < map.title_zone(marketing).unwrap().y);
    let svg = render_svg(&map, &Theme::classic());
    assert!(svg.contains(&format!("href=\"{href}\"")));

    map.on(MindEventKind::QueryAttachment, |_, _| {
        HookResult::Override(Value::from("https://cdn.example.com/banner.png"))
    });
    map.show(&project());
    let marketing = by_title(&map, "Marketing");
    assert_eq!(
        map.tree().get(marketing).unwrap().item.image_href.as_deref(),
        Some("https://cdn.example.com/banner.png")
    );

    assert!(map.attachments_mut().remove("banner"));
    assert!(map.attachments().item("banner").is_none());
}

#[test]
fn unresolved_image_keeps_its_source_but_takes_no_space() {
    let (mut map, _) = surface();
    map.show(&project());
    let marketing = by_title(&map, "Marketing");
    let item = map.item_zone(marketing).unwrap();
    let title = map.title_zone(marketing).unwrap();
    assert_eq!(item.y, title.y);
    assert_eq!(item.height, title.height);
    assert!(map.tree().get(marketing).unwrap().item.image_href.is_none());
    let data = map.topic_data(marketing).unwrap();
    assert_eq!(data.image.map(|image| image.src), Some("xap:banner".to_string()));
}

#[test]
fn resize_is_reported_by_the_poll_until_release() {
    let (mut map, container) = surface();
    map.show(&project());
    let resizes = record(&mut map, MindEventKind::Resize);
    container.set_size(640.0, 480.0);
    map.tick(Duration::from_millis(100));
    assert_eq!(
        *resizes.borrow(),
        vec![MindEvent::Resize {
            width: 640.0,
            height: 480.0,
        }]
    );
    map.release();
    container.set_size(320.0, 240.0);
    map.tick(Duration::from_millis(500));
    assert_eq!(resizes.borrow().len(), 1);
    assert_eq!(map.container_size().width, 640.0);
}

#[test]
fn removing_the_focused_topic_drops_focus_silently() {
    let (mut map, _) = surface();
    map.show(&project());
    let design = by_title(&map, "Design");
    map.focus(design, true).unwrap();
    let changes = record(&mut map, MindEventKind::FocusChange);
    map.remove(design, true).unwrap();
    assert_eq!(map.focus_topic(), None);
    assert!(changes.borrow().is_empty());
    assert_eq!(map.topics().count(), 5);
}
