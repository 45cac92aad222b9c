//! The mind-map surface: owner of the topic tree, the viewport and the
//! event entry points.

use indexmap::IndexMap;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::attachment::AttachmentCollection;
use crate::config::{ConfigValue, Configs, LayoutParams};
use crate::defs::{Defs, Translators};
use crate::event::{
    DispatchOutcome, DomEvent, DomEventKind, EventCtx, EventType, HookId, HookResult, MindEvent,
    MindEventKind, Stamp, dispatch, handler,
};
use crate::extend::{Component, Extensions};
use crate::ir::TopicData;
use crate::layout::{
    ApproxMetrics, LayoutEnv, MapLayout, Point, Rect, Size, TextMeasure, compute_layout, fmt_num,
    item_parts,
};
use crate::timer::{Task, TimerId, TimerQueue};
use crate::tree::{TopicId, TopicTree};

/// Period of the container size poll.
pub const TIMER_CHECKER_INTERVAL: Duration = Duration::from_millis(100);

pub const CLASS_MAIN_BASIC: &str = "mind-main-basic";

/// Host element the surface is shown in.
pub trait Container {
    fn client_size(&self) -> Size;

    /// Page position of the container's top-left corner.
    fn client_origin(&self) -> Point {
        Point::default()
    }
}

/// A container whose size the host sets explicitly.
#[derive(Debug, Default)]
pub struct FixedContainer {
    size: Cell<Size>,
    origin: Cell<Point>,
}

impl FixedContainer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Cell::new(Size::new(width, height)),
            origin: Cell::new(Point::default()),
        }
    }

    pub fn set_size(&self, width: f32, height: f32) {
        self.size.set(Size::new(width, height));
    }

    pub fn set_origin(&self, x: f32, y: f32) {
        self.origin.set(Point::new(x, y));
    }
}

impl Container for FixedContainer {
    fn client_size(&self) -> Size {
        self.size.get()
    }

    fn client_origin(&self) -> Point {
        self.origin.get()
    }
}

pub type Hook = Box<dyn FnMut(&MindEvent, Option<&Value>) -> HookResult>;

struct HookEntry {
    id: HookId,
    kind: MindEventKind,
    hook: Hook,
}

pub struct MindMap {
    pub(crate) tree: TopicTree,
    configs: Configs,
    extensions: Rc<Extensions>,
    defs: Defs,
    attachments: AttachmentCollection,
    measure: Box<dyn TextMeasure>,
    pub(crate) layout: MapLayout,
    pub(crate) fold_level: i32,
    pub(crate) focus: Option<TopicId>,
    offset: Point,
    scale_rate: f32,
    container: Rc<dyn Container>,
    container_size: Size,
    timers: TimerQueue,
    poll_timer: Option<TimerId>,
    hooks: Vec<HookEntry>,
    next_hook: u64,
    theme_class: Option<String>,
    ext_state: HashMap<TypeId, Box<dyn Any>>,
    hovered: Option<(TopicId, Option<Stamp>)>,
}

impl fmt::Debug for MindMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMap")
            .field("topics", &self.layout.topics.len())
            .field("focus", &self.focus)
            .field("fold_level", &self.fold_level)
            .field("offset", &self.offset)
            .field("scale_rate", &self.scale_rate)
            .field("container_size", &self.container_size)
            .field("timers", &self.timers)
            .finish()
    }
}

impl MindMap {
    pub fn new(container: Rc<dyn Container>) -> Self {
        Self::with_extensions(container, Extensions::standard())
    }

    pub fn with_extensions(container: Rc<dyn Container>, extensions: Extensions) -> Self {
        let container_size = container.client_size();
        let mut map = Self {
            tree: TopicTree::default(),
            configs: Configs::new(extensions.defaults().clone()),
            extensions: Rc::new(extensions),
            defs: Defs::standard(),
            attachments: AttachmentCollection::default(),
            measure: Box::new(ApproxMetrics::default()),
            layout: MapLayout::default(),
            fold_level: 0,
            focus: None,
            offset: Point::default(),
            scale_rate: 1.0,
            container,
            container_size,
            timers: TimerQueue::default(),
            poll_timer: None,
            hooks: Vec::new(),
            next_hook: 0,
            theme_class: None,
            ext_state: HashMap::new(),
            hovered: None,
        };
        let poll: Task = Rc::new(|map: &mut MindMap| map.check_state());
        map.poll_timer = Some(map.timers.set_interval(TIMER_CHECKER_INTERVAL, poll));
        map
    }

    pub fn set_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    pub fn tree(&self) -> &TopicTree {
        &self.tree
    }

    pub fn layout(&self) -> &MapLayout {
        &self.layout
    }

    pub fn root(&self) -> Option<TopicId> {
        self.tree.root()
    }

    pub fn defs(&self) -> &Defs {
        &self.defs
    }

    pub fn defs_mut(&mut self) -> &mut Defs {
        &mut self.defs
    }

    pub fn attachments(&self) -> &AttachmentCollection {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentCollection {
        &mut self.attachments
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Handlers and defaults added here apply to later dispatches; config
    /// values already seeded are left alone.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        Rc::make_mut(&mut self.extensions)
    }

    pub fn translators(&self) -> &Translators {
        self.extensions.translators()
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerQueue {
        &mut self.timers
    }

    pub fn container_size(&self) -> Size {
        self.container_size
    }

    /// Replaces the map with `data`, lays it out unfolded and centres it.
    pub fn show(&mut self, data: &TopicData) -> TopicId {
        self.clear();
        let root = self.tree.load(data, self.extensions.translators());
        self.fold_level = 0;
        let ids = self.tree.preorder();
        self.resolve_images(&ids);
        self.relayout();
        self.to_center(None);
        tracing::debug!(topics = ids.len(), "mind map shown");
        root
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.layout = MapLayout::default();
        self.focus = None;
        self.hovered = None;
        self.fold_level = 0;
    }

    /// Stops the resize poll. The surface stays usable but no longer
    /// notices container size changes.
    pub fn release(&mut self) {
        if let Some(id) = self.poll_timer.take() {
            self.timers.cancel(id);
        }
    }

    pub fn is_released(&self) -> bool {
        self.poll_timer.is_none()
    }

    /// Recursive data of the whole map; `None` before `show`.
    pub fn data(&self) -> Option<TopicData> {
        let root = self.tree.root()?;
        self.tree.data(root, self.extensions.translators())
    }

    /// Every topic in document order.
    pub fn topics(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.tree.preorder().into_iter()
    }

    pub fn set_theme(&mut self, theme: Option<&str>) {
        self.theme_class = theme
            .map(str::trim)
            .filter(|theme| !theme.is_empty())
            .map(str::to_string);
    }

    pub fn theme_class(&self) -> Option<&str> {
        self.theme_class.as_deref()
    }

    /// Class attribute of the content group.
    pub fn content_class(&self) -> String {
        match &self.theme_class {
            Some(theme) => format!("{CLASS_MAIN_BASIC} {theme}"),
            None => CLASS_MAIN_BASIC.to_string(),
        }
    }

    pub fn total_size(&self) -> Size {
        let bounds = self.layout.bounds();
        Size::new(bounds.width, bounds.height)
    }

    // Configuration.

    pub fn config(&self, key: &str) -> Option<ConfigValue> {
        self.configs.get(key)
    }

    pub fn configs(&self) -> IndexMap<String, ConfigValue> {
        self.configs.snapshot()
    }

    pub fn set_config(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.configs.set(key, value);
    }

    pub fn reset_config(&mut self, key: &str) {
        self.configs.reset(key);
    }

    /// Bulk update; `None` resets the key to its default.
    pub fn set_configs<'a, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (&'a str, Option<ConfigValue>)>,
    {
        self.configs.set_many(items);
    }

    pub(crate) fn config_flag(&self, key: &str) -> bool {
        self.configs.flag(key)
    }

    /// Typed snapshot of the numeric keys layout consumes.
    pub fn layout_params(&self) -> LayoutParams {
        self.configs.layout_params()
    }

    // Layout and fold.

    pub(crate) fn relayout(&mut self) {
        let env = LayoutEnv {
            params: self.layout_params(),
            measure: self.measure.as_ref(),
            defs: &self.defs,
            fold_level: self.fold_level,
        };
        self.layout = compute_layout(&self.tree, &env);
    }

    /// Forces every topic at depth `level` or deeper to fold; `level <= 0`
    /// lifts the forced level and restores each topic's own fold flag.
    pub fn fold(&mut self, level: i32) {
        if self.tree.is_empty() {
            return;
        }
        if level > 0 {
            self.clear_focus();
        }
        self.fold_level = level.max(0);
        self.relayout();
    }

    pub fn fold_level(&self) -> i32 {
        self.fold_level
    }

    // Focus.

    pub fn focus_topic(&self) -> Option<TopicId> {
        self.focus
    }

    pub fn clear_focus(&mut self) {
        if let Some(topic) = self.focus.take() {
            tracing::debug!(topic = topic.index(), "focus cleared");
            self.fire(MindEvent::FocusChange { topic: None }, None);
        }
    }

    // Viewport.

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn scale_rate(&self) -> f32 {
        self.scale_rate
    }

    fn view_size(&self) -> Size {
        Size::new(
            self.container_size.width / self.scale_rate,
            self.container_size.height / self.scale_rate,
        )
    }

    /// Visible part of the content, in content coordinates.
    pub fn zone(&self) -> Rect {
        let view = self.view_size();
        Rect::new(self.offset.x, self.offset.y, view.width, view.height)
    }

    pub fn view_box(&self) -> String {
        let zone = self.zone();
        format!(
            "{} {} {} {}",
            fmt_num(zone.x),
            fmt_num(zone.y),
            fmt_num(zone.width),
            fmt_num(zone.height)
        )
    }

    /// Centres one topic's title box, or the whole map, in the view.
    pub fn to_center(&mut self, topic: Option<TopicId>) {
        if self.tree.is_empty() {
            return;
        }
        let view = self.view_size();
        if let Some(topic) = topic {
            let Some(title) = self.layout.get(topic).map(|placed| placed.title_zone()) else {
                return;
            };
            self.offset = Point::new(
                (title.x - (view.width - title.width) / 2.0).trunc(),
                (title.y - (view.height - title.height) / 2.0).trunc(),
            );
            return;
        }
        let total = self.layout.bounds();
        let root = self
            .tree
            .root()
            .and_then(|root| self.layout.get(root))
            .map(|placed| placed.item_zone())
            .unwrap_or_default();
        self.offset = Point::new(
            center_axis(total.x, total.width, view.width, root.width),
            center_axis(total.y, total.height, view.height, root.height),
        );
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.offset = Point::new(x, y);
    }

    /// Pans by whole units; NaN deltas are ignored per axis.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        if !dx.is_nan() {
            self.offset.x += dx.trunc();
        }
        if !dy.is_nan() {
            self.offset.y += dy.trunc();
        }
    }

    /// Sets the zoom rate. Rates outside `minScale`/`maxScale` are rejected
    /// rather than clamped; returns whether the rate was applied.
    pub fn scale(&mut self, rate: f32) -> bool {
        if rate.is_nan() || rate <= 0.0 {
            return false;
        }
        let too_big = self.configs.number("maxScale").is_some_and(|max| rate > max);
        let too_small = self.configs.number("minScale").is_some_and(|min| rate < min);
        if too_big || too_small {
            tracing::debug!(rate, "scale rejected");
            return false;
        }
        self.scale_rate = rate;
        true
    }

    pub fn scale_by(&mut self, factor: f32) -> bool {
        if factor.is_nan() {
            return false;
        }
        self.scale(self.scale_rate * factor)
    }

    pub fn client_to_content(&self, client: Point) -> Point {
        let origin = self.container.client_origin();
        Point::new(
            self.offset.x + (client.x - origin.x) / self.scale_rate,
            self.offset.y + (client.y - origin.y) / self.scale_rate,
        )
    }

    // Timers.

    /// Advances the virtual clock by `elapsed`, running due timers in order.
    pub fn tick(&mut self, elapsed: Duration) {
        let deadline = self.timers.now() + elapsed;
        while let Some((id, task)) = self.timers.pop_due(deadline) {
            tracing::trace!(timer = ?id, "timer fired");
            task(self);
        }
        self.timers.settle(deadline);
    }

    fn check_state(&mut self) {
        let current = self.container.client_size();
        if current != self.container_size {
            self.container_size = current;
            tracing::debug!(width = current.width, height = current.height, "container resized");
            self.fire(
                MindEvent::Resize {
                    width: current.width,
                    height: current.height,
                },
                None,
            );
        }
    }

    // Hit testing and native events.

    /// Whether `id` and all of its ancestors are visible.
    pub fn is_displayed(&self, id: TopicId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.tree.get(current) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Top-most displayed topic piece under a content-space point.
    pub fn hit_test(&self, point: Point) -> Option<(TopicId, Stamp)> {
        for id in self.tree.preorder().into_iter().rev() {
            let Some(placed) = self.layout.get(id) else {
                continue;
            };
            if !self.is_displayed(id) {
                continue;
            }
            let local = Point::new(point.x - placed.origin.x, point.y - placed.origin.y);
            let hit = item_parts(&placed.layout.item, &self.defs)
                .into_iter()
                .find(|(_, rect)| rect.contains(local));
            if let Some((stamp, _)) = hit {
                return Some((id, stamp));
            }
        }
        None
    }

    /// Native event types the topic and surface tables react to. Hosts bind
    /// their listeners to exactly these; other kinds are ignored.
    pub fn listened_events(&self) -> Vec<DomEventKind> {
        let mut kinds = Vec::new();
        for component in [Component::Topic, Component::Surface] {
            for ty in self.extensions.table(component).event_types() {
                if let EventType::Dom(kind) = ty {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
            }
        }
        kinds
    }

    /// Routes a native event to its topic, then to the surface.
    pub fn handle_event(&mut self, event: DomEvent) -> DispatchOutcome {
        let extensions = Rc::clone(&self.extensions);
        let ty = EventType::Dom(event.kind);
        let topics = extensions.table(Component::Topic);
        let surface = extensions.table(Component::Surface);
        if !topics.handles(ty) && !surface.handles(ty) {
            tracing::trace!(event = %ty, "not listened to");
            return DispatchOutcome::default();
        }
        let target = event.target.filter(|id| self.tree.contains(*id));
        let mut ctx = EventCtx::dom(event);
        let mut value = None;
        if let Some(topic) = target.filter(|_| topics.handles(ty)) {
            ctx.set_owner(Some(topic));
            value = dispatch(topics, self, &mut ctx);
        }
        if !ctx.propagation_stopped() && surface.handles(ty) {
            ctx.set_owner(None);
            value = dispatch(surface, self, &mut ctx).or(value);
        }
        DispatchOutcome {
            default_prevented: ctx.default_prevented(),
            propagation_stopped: ctx.propagation_stopped(),
            value,
        }
    }

    /// Converts a pointer position, hit-tests it and dispatches `kind`.
    /// A change of the piece under the pointer first raises mouseout on the
    /// old piece and mouseover on the new one.
    pub fn pointer_event(
        &mut self,
        kind: DomEventKind,
        client_x: f32,
        client_y: f32,
        buttons: u16,
    ) -> DispatchOutcome {
        let client = Point::new(client_x, client_y);
        let point = self.client_to_content(client);
        let hit = self.hit_test(point).map(|(id, stamp)| (id, Some(stamp)));
        let crossing = !matches!(kind, DomEventKind::MouseOver | DomEventKind::MouseOut);
        if crossing && hit != self.hovered {
            if let Some((id, stamp)) = self.hovered.take() {
                let out = DomEvent::new(DomEventKind::MouseOut)
                    .on(id, stamp)
                    .at(client, point)
                    .with_buttons(buttons);
                self.handle_event(out);
            }
            self.hovered = hit;
            if let Some((id, stamp)) = hit {
                let over = DomEvent::new(DomEventKind::MouseOver)
                    .on(id, stamp)
                    .at(client, point)
                    .with_buttons(buttons);
                self.handle_event(over);
            }
        }
        let mut event = DomEvent::new(kind).at(client, point).with_buttons(buttons);
        if let Some((id, stamp)) = hit {
            event = event.on(id, stamp);
        }
        self.handle_event(event)
    }

    // Application events.

    /// Raises an application event: the origin topic's handlers, then the
    /// surface's, then host hooks. Returns the final result.
    pub fn fire(&mut self, event: MindEvent, seed: Option<Value>) -> Option<Value> {
        let extensions = Rc::clone(&self.extensions);
        let origin = event.origin().filter(|id| self.tree.contains(*id));
        tracing::debug!(event = event.kind().name(), "fire");
        let mut ctx = EventCtx::mind(event, seed);
        if let Some(topic) = origin {
            ctx.set_owner(Some(topic));
            dispatch(extensions.table(Component::Topic), self, &mut ctx);
        }
        if !ctx.propagation_stopped() {
            ctx.set_owner(None);
            dispatch(extensions.table(Component::Surface), self, &mut ctx);
            // Hooks sit beside the surface's own handlers, so marking the
            // event handled there does not hide it from them.
            self.run_hooks(&mut ctx);
        }
        ctx.take_result()
    }

    fn run_hooks(&mut self, ctx: &mut EventCtx) {
        let Some(event) = ctx.mind_event().cloned() else {
            return;
        };
        let kind = event.kind();
        for entry in self.hooks.iter_mut().filter(|entry| entry.kind == kind) {
            match (entry.hook)(&event, ctx.result()) {
                HookResult::Allow => {}
                HookResult::Deny => ctx.set_result(false),
                HookResult::Override(value) => ctx.set_result(value),
            }
        }
    }

    /// Registers a host hook for one application event kind.
    pub fn on<F>(&mut self, kind: MindEventKind, hook: F) -> HookId
    where
        F: FnMut(&MindEvent, Option<&Value>) -> HookResult + 'static,
    {
        self.next_hook += 1;
        let id = HookId(self.next_hook);
        self.hooks.push(HookEntry {
            id,
            kind,
            hook: Box::new(hook),
        });
        id
    }

    pub fn off(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|entry| entry.id != id);
        self.hooks.len() != before
    }

    /// Invokes a member contributed through
    /// [`Extensions::extend_prototype`].
    pub fn call(
        &mut self,
        component: Component,
        name: &str,
        topic: Option<TopicId>,
        args: &Value,
    ) -> Option<Value> {
        let method = self.extensions.method(component, name)?.clone();
        method(self, topic, args)
    }

    // Extension state.

    pub fn ext_state<T: 'static>(&self) -> Option<&T> {
        self.ext_state
            .get(&TypeId::of::<T>())
            .and_then(|state| state.downcast_ref::<T>())
    }

    /// State of an extension, created on first use. Entries are keyed by
    /// `TypeId::of::<T>()`, so the downcast always matches.
    pub fn ext_state_mut<T: Default + 'static>(&mut self) -> &mut T {
        self.ext_state
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()) as Box<dyn Any>)
            .downcast_mut::<T>()
            .expect("extension state is keyed by its own type")
    }

    // Attachments.

    /// Resolves `xap:` image references of `ids` through query-attachment.
    pub(crate) fn resolve_images(&mut self, ids: &[TopicId]) {
        for id in ids {
            let Some(name) = self
                .tree
                .get(*id)
                .and_then(|node| node.item.attachment_name())
                .map(str::to_string)
            else {
                continue;
            };
            let href = self
                .fire(MindEvent::QueryAttachment { name: name.clone() }, None)
                .and_then(|value| value.as_str().map(str::to_string));
            if href.is_none() {
                tracing::warn!(attachment = %name, "unresolved image attachment");
            }
            if let Some(node) = self.tree.get_mut(*id) {
                node.item.image_href = href;
            }
        }
    }
}

fn center_axis(start: f32, extent: f32, view: f32, root_extent: f32) -> f32 {
    if extent < view {
        return start - (view - extent) / 2.0;
    }
    let offset = (-(view - root_extent) / 2.0).trunc();
    if start > offset {
        start
    } else if view + offset > extent + start {
        extent + start - view
    } else {
        offset
    }
}

pub(crate) fn install(ext: &mut Extensions) {
    ext.table_mut(Component::Surface)
        .on(
            EventType::Mind(MindEventKind::RequireLayout),
            None,
            handler(|map, _| {
                map.relayout();
                None
            }),
        )
        .on(
            EventType::Dom(DomEventKind::Click),
            None,
            handler(|map, ctx| {
                map.clear_focus();
                ctx.mark_handled();
                None
            }),
        )
        .on(
            EventType::Mind(MindEventKind::QueryAttachment),
            None,
            handler(|map, ctx| {
                let Some(MindEvent::QueryAttachment { name }) = ctx.mind_event() else {
                    return None;
                };
                let url = map
                    .attachments
                    .item(name)
                    .and_then(|item| item.url())
                    .map(str::to_string);
                if let Some(url) = url {
                    ctx.set_result(url);
                }
                None
            }),
        );
}
