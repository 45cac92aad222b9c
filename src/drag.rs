//! Drag-and-drop reparenting.
//!
//! Everything here is contributed through the extension registry: title
//! handlers on the topic component arm and start a drag, surface handlers
//! track the pointer and perform the drop. The host can refuse a drag via
//! query-draggable and veto a drop via confirm-drag.

use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;

use crate::config::ConfigValue;
use crate::error::MindResult;
use crate::event::{
    DomEventKind, EventCtx, EventType, HandlerValue, MindEvent, MindEventKind, Stamp, handler,
};
use crate::extend::{Component, Extensions};
use crate::ir::Direction;
use crate::layout::{Point, Rect};
use crate::surface::MindMap;
use crate::timer::{Task, TimerId};
use crate::tree::TopicId;

pub const CLASS_DRAG_BOX: &str = "mind-topic-drag-box";
pub const CLASS_DRAG_LINE: &str = "mind-topic-drag-line";

/// Time the pointer must rest on a title before it becomes the drop target.
pub const HOVER_TIMEOUT: Duration = Duration::from_millis(900);

/// Pointer travel, in client pixels, that turns an armed press into a drag.
pub const DRAG_THRESHOLD: f32 = 3.0;

/// Horizontal gap between the pointer and the floating box.
const BOX_GAP: f32 = 3.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragState {
    armed: Option<(TopicId, Point)>,
    dragging: Option<TopicId>,
    pointer: Point,
    hover: Option<TopicId>,
    hover_timer: Option<TimerId>,
}

impl DragState {
    pub fn armed(&self) -> Option<TopicId> {
        self.armed.map(|(topic, _)| topic)
    }

    pub fn dragging(&self) -> Option<TopicId> {
        self.dragging
    }

    /// Candidate parent of the drop.
    pub fn hover(&self) -> Option<TopicId> {
        self.hover
    }

    /// Last pointer position, in content coordinates.
    pub fn pointer(&self) -> Point {
        self.pointer
    }
}

/// Floating box and connector shown while dragging.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    pub title: String,
    pub rect: Rect,
    /// From the candidate parent's title centre to the box centre.
    pub line: Option<(Point, Point)>,
}

pub fn drag_state(map: &MindMap) -> Option<&DragState> {
    map.ext_state::<DragState>()
}

pub fn drag_preview(map: &MindMap) -> Option<DragPreview> {
    let state = map.ext_state::<DragState>()?;
    let topic = state.dragging?;
    let title = map.tree().get(topic)?.item.title.clone();
    let size = map
        .layout()
        .get(topic)
        .map(|placed| placed.layout.item.title_box)
        .unwrap_or_default();
    let rect = Rect::new(
        state.pointer.x + BOX_GAP,
        state.pointer.y - size.height / 2.0,
        size.width,
        size.height,
    );
    let line = state
        .hover
        .and_then(|hover| map.title_zone(hover))
        .map(|zone| (zone.center(), rect.center()));
    Some(DragPreview { title, rect, line })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn cancel_hover(map: &mut MindMap) {
    if let Some(timer) = map.ext_state_mut::<DragState>().hover_timer.take() {
        map.timers_mut().cancel(timer);
    }
}

fn on_title_down(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    let topic = ctx.owner()?;
    let event = ctx.dom_event()?;
    let client = event.client;
    if event.primary() && map.level(topic).is_some_and(|level| level > 0) {
        let allowed = map
            .fire(MindEvent::QueryDraggable { topic }, Some(Value::Bool(true)))
            .is_some_and(|value| truthy(&value));
        map.ext_state_mut::<DragState>().armed = allowed.then_some((topic, client));
        tracing::debug!(topic = topic.index(), allowed, "drag armed");
        ctx.mark_handled();
    }
    None
}

fn on_title_move(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    ctx.continue_sibling();
    let topic = ctx.owner()?;
    let event = ctx.dom_event()?;
    let (client, point) = (event.client, event.point);
    let armed_at = match map.ext_state_mut::<DragState>().armed {
        Some((armed, at)) if armed == topic && event.primary() => at,
        _ => return None,
    };
    let travel = (client.x - armed_at.x).hypot(client.y - armed_at.y);
    if travel > DRAG_THRESHOLD {
        map.ext_state_mut::<DragState>().armed = None;
        cancel_hover(map);
        map.fire(
            MindEvent::DragStart {
                topic,
                x: point.x,
                y: point.y,
            },
            None,
        );
    }
    None
}

fn on_title_over(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    ctx.continue_sibling();
    let topic = ctx.owner()?;
    if !ctx.dom_event()?.primary() {
        return None;
    }
    cancel_hover(map);
    let task: Task = Rc::new(move |map: &mut MindMap| {
        map.ext_state_mut::<DragState>().hover_timer = None;
        map.fire(MindEvent::DragPotentialHover { topic }, None);
    });
    let timer = map.timers_mut().set_timeout(HOVER_TIMEOUT, task);
    map.ext_state_mut::<DragState>().hover_timer = Some(timer);
    None
}

fn on_title_leave(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    ctx.continue_sibling();
    map.ext_state_mut::<DragState>().armed = None;
    cancel_hover(map);
    None
}

fn on_query_draggable(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    ctx.set_result(map.config_flag("draggable"));
    None
}

fn on_drag_start(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    let Some(MindEvent::DragStart { topic, x, y }) = ctx.mind_event().cloned() else {
        return None;
    };
    let parent = map.parent(topic);
    let state = map.ext_state_mut::<DragState>();
    state.dragging = Some(topic);
    state.pointer = Point::new(x, y);
    state.hover = parent;
    if let Err(err) = map.hide_in_place(topic, false) {
        tracing::warn!(error = %err, "cannot hide dragged topic");
    }
    ctx.mark_handled();
    None
}

fn on_potential_hover(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    if let Some(MindEvent::DragPotentialHover { topic }) = ctx.mind_event() {
        let state = map.ext_state_mut::<DragState>();
        if state.dragging.is_some() {
            state.hover = Some(*topic);
        }
    }
    ctx.mark_handled();
    None
}

fn on_drag_move(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    let event = ctx.dom_event()?;
    let point = event.point;
    let state = map.ext_state_mut::<DragState>();
    if event.primary() && state.dragging.is_some() {
        state.pointer = point;
        ctx.mark_handled();
    }
    None
}

fn on_drop(map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    let state = map.ext_state::<DragState>()?;
    let dragged = state.dragging?;
    let hover = state.hover;
    let point = ctx.dom_event().map(|event| event.point).unwrap_or_default();
    let origin_parent = map.parent(dragged);
    let allowed = map
        .fire(
            MindEvent::ConfirmDrag {
                topic: dragged,
                origin_parent,
                new_parent: hover,
            },
            Some(Value::Bool(true)),
        )
        .is_some_and(|value| truthy(&value));
    if let (Some(target), true) = (hover, allowed) {
        if let Err(err) = drop_onto(map, dragged, target, point) {
            tracing::warn!(error = %err, "drop rejected");
        }
    }
    cancel_hover(map);
    *map.ext_state_mut::<DragState>() = DragState::default();
    if let Err(err) = map.set_visible(dragged, true) {
        tracing::warn!(error = %err, "cannot restore dragged topic");
    }
    if let Err(err) = map.focus(dragged, true) {
        tracing::warn!(error = %err, "cannot focus dragged topic");
    }
    ctx.mark_handled();
    map.fire(MindEvent::EndDrag, None);
    None
}

/// Inserts `dragged` under `target` after the last child lying above the
/// pointer. Onto the root, the side follows the pointer and only children of
/// that side count; deeper targets make the topic inherit its side.
fn drop_onto(map: &mut MindMap, dragged: TopicId, target: TopicId, point: Point) -> MindResult<()> {
    let direction = if map.level(target) == Some(0) {
        let left = map.item_zone(target).is_some_and(|zone| point.x < zone.x);
        Some(if left { Direction::Left } else { Direction::Right })
    } else {
        None
    };
    let left = direction.is_some_and(Direction::is_left);
    let mut previous = None;
    for sibling in map.children(target).to_vec() {
        if sibling == dragged || (left && !map.direction(sibling).is_left()) {
            continue;
        }
        let Some(zone) = map.item_zone(sibling) else {
            continue;
        };
        if point.y < zone.y {
            break;
        }
        previous = Some(sibling);
    }
    match previous {
        Some(previous) => map.insert_after_sibling(dragged, previous, false)?,
        None => map.reparent_to(dragged, target, true, false)?,
    }
    map.set_direction(dragged, direction)?;
    tracing::debug!(topic = dragged.index(), parent = target.index(), "topic dropped");
    Ok(())
}

pub(crate) fn install(ext: &mut Extensions) {
    ext.extend_defaults([("draggable", ConfigValue::Bool(false))]);
    let title = Some(Stamp::TopicTitle);
    let dom = EventType::Dom;
    ext.extend_component(
        Component::Topic,
        [
            ((dom(DomEventKind::MouseDown), title), handler(on_title_down)),
            ((dom(DomEventKind::MouseMove), title), handler(on_title_move)),
            ((dom(DomEventKind::MouseOver), title), handler(on_title_over)),
            ((dom(DomEventKind::MouseOut), title), handler(on_title_leave)),
            ((dom(DomEventKind::MouseUp), title), handler(on_title_leave)),
        ],
        false,
    );
    ext.extend_component(
        Component::Surface,
        [
            (
                (EventType::Mind(MindEventKind::QueryDraggable), None),
                handler(on_query_draggable),
            ),
            ((EventType::Mind(MindEventKind::DragStart), None), handler(on_drag_start)),
            (
                (EventType::Mind(MindEventKind::DragPotentialHover), None),
                handler(on_potential_hover),
            ),
            ((dom(DomEventKind::MouseMove), None), handler(on_drag_move)),
            ((dom(DomEventKind::MouseUp), None), handler(on_drop)),
        ],
        false,
    );
}
