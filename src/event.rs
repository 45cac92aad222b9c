//! Stamp-keyed event routing.
//!
//! A native pointer event targets one sub-element of a topic. The element's
//! [`Stamp`] selects a handler chain from the owning component's
//! [`HandlerTable`]; the unstamped chain for the same event type acts as the
//! component's default handler.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::ir::ImageData;
use crate::layout::Point;
use crate::surface::MindMap;
use crate::tree::TopicId;

/// Attribute carrying the stamp on rendered elements.
pub const ATTR_EVENT_STAMP: &str = "mind-event-stamp";

pub const PRIMARY_BUTTON: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stamp {
    TopicTitle,
    FoldIcon,
    Image,
    LabelsMore,
    Labels,
    Notes,
    Link,
    Markers,
}

impl Stamp {
    pub const ALL: [Stamp; 8] = [
        Stamp::TopicTitle,
        Stamp::FoldIcon,
        Stamp::Image,
        Stamp::LabelsMore,
        Stamp::Labels,
        Stamp::Notes,
        Stamp::Link,
        Stamp::Markers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stamp::TopicTitle => "topic-item-title",
            Stamp::FoldIcon => "topic-item-fold-icon",
            Stamp::Image => "topic-item-image",
            Stamp::LabelsMore => "topic-labels-more",
            Stamp::Labels => "topic-labels",
            Stamp::Notes => "topic-notes",
            Stamp::Link => "topic-link",
            Stamp::Markers => "topic-markers",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stamp| stamp.as_str() == value)
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    MouseDown,
    MouseMove,
    MouseOver,
    MouseOut,
    MouseUp,
}

impl DomEventKind {
    pub fn name(self) -> &'static str {
        match self {
            DomEventKind::Click => "click",
            DomEventKind::MouseDown => "mousedown",
            DomEventKind::MouseMove => "mousemove",
            DomEventKind::MouseOver => "mouseover",
            DomEventKind::MouseOut => "mouseout",
            DomEventKind::MouseUp => "mouseup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MindEventKind {
    RequireLayout,
    FocusChange,
    QueryAttachment,
    InvokeLink,
    InvokeNotes,
    InvokeLabels,
    InvokeImage,
    InvokeMarkers,
    QueryDraggable,
    DragStart,
    DragPotentialHover,
    ConfirmDrag,
    EndDrag,
    Resize,
}

impl MindEventKind {
    pub fn name(self) -> &'static str {
        match self {
            MindEventKind::RequireLayout => "mindevent.require.layout",
            MindEventKind::FocusChange => "mindevent.focus.change",
            MindEventKind::QueryAttachment => "mindevent.focus.query.attachment",
            MindEventKind::InvokeLink => "mindevent.invoke.link",
            MindEventKind::InvokeNotes => "mindevent.invoke.notes",
            MindEventKind::InvokeLabels => "mindevent.invoke.labels",
            MindEventKind::InvokeImage => "mindevent.invoke.image",
            MindEventKind::InvokeMarkers => "mindevent.invoke.markers",
            MindEventKind::QueryDraggable => "mindevent.query.draggable",
            MindEventKind::DragStart => "mindevent.drag.start",
            MindEventKind::DragPotentialHover => "mindevent.drag.potential.hover",
            MindEventKind::ConfirmDrag => "mindevent.confirm.drag",
            MindEventKind::EndDrag => "mindevent.end.drag",
            MindEventKind::Resize => "resize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Dom(DomEventKind),
    Mind(MindEventKind),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Dom(kind) => f.write_str(kind.name()),
            EventType::Mind(kind) => f.write_str(kind.name()),
        }
    }
}

/// A native pointer event after hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub target: Option<TopicId>,
    pub stamp: Option<Stamp>,
    /// Pointer position relative to the page.
    pub client: Point,
    /// Pointer position in content coordinates.
    pub point: Point,
    /// Pressed buttons, one bit per button as in `MouseEvent.buttons`.
    pub buttons: u16,
}

impl DomEvent {
    pub fn new(kind: DomEventKind) -> Self {
        Self {
            kind,
            target: None,
            stamp: None,
            client: Point::default(),
            point: Point::default(),
            buttons: 0,
        }
    }

    pub fn on(mut self, target: TopicId, stamp: Option<Stamp>) -> Self {
        self.target = Some(target);
        self.stamp = stamp;
        self
    }

    pub fn with_buttons(mut self, buttons: u16) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn at(mut self, client: Point, point: Point) -> Self {
        self.client = client;
        self.point = point;
        self
    }

    pub fn primary(&self) -> bool {
        self.buttons & PRIMARY_BUTTON != 0
    }
}

/// Application events raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MindEvent {
    RequireLayout,
    FocusChange {
        topic: Option<TopicId>,
    },
    QueryAttachment {
        name: String,
    },
    InvokeLink {
        topic: TopicId,
        data: Option<String>,
    },
    InvokeNotes {
        topic: TopicId,
        data: Option<String>,
    },
    InvokeLabels {
        topic: TopicId,
        data: Vec<String>,
        more: bool,
    },
    InvokeImage {
        topic: TopicId,
        data: Option<ImageData>,
    },
    InvokeMarkers {
        topic: TopicId,
        data: Option<IndexMap<String, Value>>,
    },
    QueryDraggable {
        topic: TopicId,
    },
    DragStart {
        topic: TopicId,
        x: f32,
        y: f32,
    },
    DragPotentialHover {
        topic: TopicId,
    },
    ConfirmDrag {
        topic: TopicId,
        origin_parent: Option<TopicId>,
        new_parent: Option<TopicId>,
    },
    EndDrag,
    Resize {
        width: f32,
        height: f32,
    },
}

impl MindEvent {
    pub fn kind(&self) -> MindEventKind {
        match self {
            MindEvent::RequireLayout => MindEventKind::RequireLayout,
            MindEvent::FocusChange { .. } => MindEventKind::FocusChange,
            MindEvent::QueryAttachment { .. } => MindEventKind::QueryAttachment,
            MindEvent::InvokeLink { .. } => MindEventKind::InvokeLink,
            MindEvent::InvokeNotes { .. } => MindEventKind::InvokeNotes,
            MindEvent::InvokeLabels { .. } => MindEventKind::InvokeLabels,
            MindEvent::InvokeImage { .. } => MindEventKind::InvokeImage,
            MindEvent::InvokeMarkers { .. } => MindEventKind::InvokeMarkers,
            MindEvent::QueryDraggable { .. } => MindEventKind::QueryDraggable,
            MindEvent::DragStart { .. } => MindEventKind::DragStart,
            MindEvent::DragPotentialHover { .. } => MindEventKind::DragPotentialHover,
            MindEvent::ConfirmDrag { .. } => MindEventKind::ConfirmDrag,
            MindEvent::EndDrag => MindEventKind::EndDrag,
            MindEvent::Resize { .. } => MindEventKind::Resize,
        }
    }

    /// Topic the event is raised on, if any; it sees the event before the
    /// surface does.
    pub fn origin(&self) -> Option<TopicId> {
        match self {
            MindEvent::InvokeLink { topic, .. }
            | MindEvent::InvokeNotes { topic, .. }
            | MindEvent::InvokeLabels { topic, .. }
            | MindEvent::InvokeImage { topic, .. }
            | MindEvent::InvokeMarkers { topic, .. }
            | MindEvent::QueryDraggable { topic }
            | MindEvent::DragStart { topic, .. }
            | MindEvent::DragPotentialHover { topic }
            | MindEvent::ConfirmDrag { topic, .. } => Some(*topic),
            MindEvent::FocusChange { topic } => *topic,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Dom(DomEvent),
    Mind(MindEvent),
}

/// Per-dispatch state handed to every handler.
#[derive(Debug, Clone)]
pub struct EventCtx {
    trigger: Trigger,
    owner: Option<TopicId>,
    block_sibling: bool,
    default_prevented: bool,
    propagation_stopped: bool,
    previous: HandlerValue,
    result: Option<Value>,
}

impl EventCtx {
    pub fn dom(event: DomEvent) -> Self {
        Self::new(Trigger::Dom(event), None)
    }

    pub fn mind(event: MindEvent, seed: Option<Value>) -> Self {
        Self::new(Trigger::Mind(event), seed)
    }

    fn new(trigger: Trigger, result: Option<Value>) -> Self {
        Self {
            trigger,
            owner: None,
            block_sibling: false,
            default_prevented: false,
            propagation_stopped: false,
            previous: None,
            result,
        }
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn dom_event(&self) -> Option<&DomEvent> {
        match &self.trigger {
            Trigger::Dom(event) => Some(event),
            Trigger::Mind(_) => None,
        }
    }

    pub fn mind_event(&self) -> Option<&MindEvent> {
        match &self.trigger {
            Trigger::Mind(event) => Some(event),
            Trigger::Dom(_) => None,
        }
    }

    pub fn event_type(&self) -> EventType {
        match &self.trigger {
            Trigger::Dom(event) => EventType::Dom(event.kind),
            Trigger::Mind(event) => EventType::Mind(event.kind()),
        }
    }

    pub fn stamp(&self) -> Option<Stamp> {
        self.dom_event().and_then(|event| event.stamp)
    }

    /// Topic whose table is being dispatched; `None` on the surface.
    pub fn owner(&self) -> Option<TopicId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<TopicId>) {
        self.owner = owner;
    }

    /// Lets the next handler of the chain, and then the default handler,
    /// run after this one.
    pub fn continue_sibling(&mut self) {
        self.block_sibling = false;
    }

    pub fn block_sibling(&mut self) {
        self.block_sibling = true;
    }

    pub fn sibling_blocked(&self) -> bool {
        self.block_sibling
    }

    pub fn mark_handled(&mut self) {
        self.default_prevented = true;
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Return value of the handler that ran before this one.
    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, value: impl Into<Value>) {
        self.result = Some(value.into());
    }

    pub(crate) fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }
}

pub type HandlerValue = Option<Value>;
pub type Handler = Rc<dyn Fn(&mut MindMap, &mut EventCtx) -> HandlerValue>;
pub type HandlerKey = (EventType, Option<Stamp>);

pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut MindMap, &mut EventCtx) -> HandlerValue + 'static,
{
    Rc::new(f)
}

/// Handler chains of one component type, keyed by event type and stamp.
#[derive(Clone, Default)]
pub struct HandlerTable {
    entries: IndexMap<HandlerKey, Vec<Handler>>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|((ty, stamp), chain)| {
                (format!("{ty}{}", stamp.map(|s| format!("#{s}")).unwrap_or_default()), chain.len())
            }))
            .finish()
    }
}

impl HandlerTable {
    /// Appends `handler` to the chain for `(ty, stamp)`.
    pub fn on(&mut self, ty: EventType, stamp: Option<Stamp>, handler: Handler) -> &mut Self {
        self.entries.entry((ty, stamp)).or_default().push(handler);
        self
    }

    pub fn chain(&self, ty: EventType, stamp: Option<Stamp>) -> Option<&[Handler]> {
        self.entries
            .get(&(ty, stamp))
            .map(Vec::as_slice)
            .filter(|chain| !chain.is_empty())
    }

    pub fn entry(&self, key: &HandlerKey) -> Option<&Vec<Handler>> {
        self.entries.get(key)
    }

    pub fn replace(&mut self, key: HandlerKey, chain: Vec<Handler>) -> Option<Vec<Handler>> {
        if chain.is_empty() {
            return self.entries.shift_remove(&key);
        }
        self.entries.insert(key, chain)
    }

    pub fn keys(&self) -> impl Iterator<Item = &HandlerKey> {
        self.entries.keys()
    }

    /// Event types the table reacts to, in registration order.
    pub fn event_types(&self) -> Vec<EventType> {
        let mut types: Vec<EventType> = Vec::new();
        for (ty, _) in self.entries.keys() {
            if !types.contains(ty) {
                types.push(*ty);
            }
        }
        types
    }

    pub fn handles(&self, ty: EventType) -> bool {
        self.entries.keys().any(|(key, _)| *key == ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs the stamped chain, then the default chain unless the stamped
/// handlers kept siblings blocked.
pub(crate) fn dispatch(table: &HandlerTable, map: &mut MindMap, ctx: &mut EventCtx) -> HandlerValue {
    let ty = ctx.event_type();
    let mut value = None;
    ctx.block_sibling = false;
    if let Some(stamp) = ctx.stamp() {
        if let Some(chain) = table.chain(ty, Some(stamp)) {
            tracing::debug!(event = %ty, stamp = %stamp, handlers = chain.len(), "stamped dispatch");
            value = run_chain(chain, map, ctx, value);
        }
    }
    if !ctx.block_sibling {
        if let Some(chain) = table.chain(ty, None) {
            tracing::debug!(event = %ty, handlers = chain.len(), "default dispatch");
            value = run_chain(chain, map, ctx, value);
        }
    }
    value
}

fn run_chain(
    chain: &[Handler],
    map: &mut MindMap,
    ctx: &mut EventCtx,
    mut value: HandlerValue,
) -> HandlerValue {
    for handler in chain {
        ctx.block_sibling = true;
        ctx.previous = value.take();
        value = handler(map, ctx);
        if ctx.block_sibling {
            break;
        }
    }
    value
}

/// What a native event did once routed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchOutcome {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub value: HandlerValue,
}

/// Answer of a host hook to an application event.
#[derive(Debug, Clone, PartialEq)]
pub enum HookResult {
    /// Leave the result as it is.
    Allow,
    /// Veto: the result becomes `false`.
    Deny,
    Override(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub(crate) u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_round_trip_through_their_attribute_text() {
        for stamp in Stamp::ALL {
            assert_eq!(Stamp::parse(stamp.as_str()), Some(stamp));
        }
        assert_eq!(Stamp::parse("nope"), None);
    }

    #[test]
    fn table_lists_event_types_once() {
        let mut table = HandlerTable::default();
        let noop = handler(|_, _| None);
        let click = EventType::Dom(DomEventKind::Click);
        table
            .on(click, Some(Stamp::Link), noop.clone())
            .on(click, None, noop.clone())
            .on(EventType::Mind(MindEventKind::RequireLayout), None, noop);
        assert_eq!(table.event_types().len(), 2);
        assert!(table.handles(click));
        assert_eq!(table.chain(click, Some(Stamp::Notes)).map(|c| c.len()), None);
    }

    #[test]
    fn mark_handled_is_independent_of_sibling_blocking() {
        let mut ctx = EventCtx::dom(DomEvent::new(DomEventKind::Click));
        ctx.block_sibling();
        ctx.continue_sibling();
        ctx.mark_handled();
        assert!(!ctx.sibling_blocked());
        assert!(ctx.default_prevented() && ctx.propagation_stopped());
    }
}
