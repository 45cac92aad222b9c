//! Topic operations: tree mutation, focus, fold, properties and geometry
//! queries, plus the base handlers of the topic component.
//!
//! Mutations take a `redraw` flag; when it is set the surface is asked to
//! relayout through a require-layout event. Callers batching several
//! changes pass `false` to all but the last one.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{MindError, MindResult};
use crate::event::{DomEventKind, EventType, MindEvent, Stamp, handler};
use crate::extend::{Component, Extensions};
use crate::ir::{Direction, ImageData, TopicData};
use crate::layout::{PlacedTopic, Rect, effective_fold};
use crate::surface::MindMap;
use crate::tree::{DEFAULT_TITLE, TopicId, TopicItem};

/// Data keys a topic exposes as properties.
pub const PROPERTY_NAMES: [&str; 7] = [
    "customData",
    "title",
    "image",
    "labels",
    "href",
    "notes",
    "markers",
];

impl MindMap {
    fn require_layout(&mut self, redraw: bool) {
        if redraw {
            self.fire(MindEvent::RequireLayout, None);
        }
    }

    // Navigation.

    pub fn parent(&self, id: TopicId) -> Option<TopicId> {
        self.tree.parent(id)
    }

    pub fn children(&self, id: TopicId) -> &[TopicId] {
        self.tree.children(id)
    }

    pub fn has_child(&self, id: TopicId) -> bool {
        !self.tree.children(id).is_empty()
    }

    pub fn first_descendant(&self, id: TopicId) -> Option<TopicId> {
        self.tree.children(id).first().copied()
    }

    pub fn next_sibling(&self, id: TopicId) -> Option<TopicId> {
        self.tree.next_sibling(id)
    }

    pub fn previous_sibling(&self, id: TopicId) -> Option<TopicId> {
        self.tree.previous_sibling(id)
    }

    pub fn is_same(&self, a: TopicId, b: TopicId) -> bool {
        a == b && self.tree.contains(a)
    }

    /// Stable `MID-` id of a topic.
    pub fn topic_id(&self, id: TopicId) -> Option<&str> {
        self.tree.get(id).map(|node| node.id.as_str())
    }

    pub fn find_topic(&self, mind_id: &str) -> Option<TopicId> {
        self.tree.find_by_id(mind_id)
    }

    pub fn level(&self, id: TopicId) -> Option<usize> {
        self.tree.get(id).map(|node| node.level)
    }

    pub fn direction(&self, id: TopicId) -> Direction {
        self.tree
            .get(id)
            .and_then(|node| node.direction)
            .unwrap_or_default()
    }

    /// Stores a branch side; `None` makes the topic inherit its side.
    pub fn set_direction(&mut self, id: TopicId, direction: Option<Direction>) -> MindResult<()> {
        self.tree.node_mut(id)?.direction = direction;
        Ok(())
    }

    // Geometry, in content coordinates.

    fn placed(&self, id: TopicId) -> Option<&PlacedTopic> {
        self.layout.get(id)
    }

    pub fn title_zone(&self, id: TopicId) -> Option<Rect> {
        self.placed(id).map(PlacedTopic::title_zone)
    }

    pub fn item_zone(&self, id: TopicId) -> Option<Rect> {
        self.placed(id).map(PlacedTopic::item_zone)
    }

    pub fn total_zone(&self, id: TopicId) -> Option<Rect> {
        self.placed(id).map(PlacedTopic::total_zone)
    }

    // Mutation.

    /// Appends a new child built from `data`; an absent or empty title
    /// becomes the default title.
    pub fn add_child(
        &mut self,
        parent: TopicId,
        data: Option<&TopicData>,
        redraw: bool,
    ) -> MindResult<TopicId> {
        let mut value = data.cloned().unwrap_or_default();
        if value.title.is_empty() {
            value.title = DEFAULT_TITLE.to_string();
        }
        let translators = self.translators().clone();
        let id = self.tree.insert_data(parent, None, &value, &translators)?;
        let added = self.tree.subtree(id);
        self.resolve_images(&added);
        self.require_layout(redraw);
        Ok(id)
    }

    /// Deletes a topic and its subtree. Removing the root empties the map.
    pub fn remove(&mut self, id: TopicId, redraw: bool) -> MindResult<()> {
        let removed = self.tree.remove(id)?;
        if self.focus.is_some_and(|focus| removed.contains(&focus)) {
            self.focus = None;
        }
        if self.tree.is_empty() {
            self.layout = Default::default();
        } else {
            for gone in &removed {
                self.layout.topics.remove(gone);
            }
        }
        tracing::debug!(topics = removed.len(), "topics removed");
        self.require_layout(redraw && !self.tree.is_empty());
        Ok(())
    }

    pub fn clear_children(&mut self, id: TopicId, redraw: bool) -> MindResult<()> {
        let children = self.tree.node(id)?.children.clone();
        for child in children {
            self.remove(child, false)?;
        }
        self.require_layout(redraw);
        Ok(())
    }

    /// Moves `id` under `parent`, first or last among its children. The
    /// stored direction is left as it is.
    pub fn reparent_to(
        &mut self,
        id: TopicId,
        parent: TopicId,
        to_head: bool,
        redraw: bool,
    ) -> MindResult<()> {
        self.tree.move_to(id, parent, to_head.then_some(0))?;
        self.require_layout(redraw);
        Ok(())
    }

    /// Moves `id` right after `sibling`, under the same parent.
    pub fn insert_after_sibling(&mut self, id: TopicId, sibling: TopicId, redraw: bool) -> MindResult<()> {
        self.place_beside(id, sibling, false)?;
        self.require_layout(redraw);
        Ok(())
    }

    /// Moves `id` before or after `brother`, under the same parent.
    pub fn insert_as_brother_of(
        &mut self,
        id: TopicId,
        brother: TopicId,
        before: bool,
        redraw: bool,
    ) -> MindResult<()> {
        self.place_beside(id, brother, before)?;
        self.require_layout(redraw);
        Ok(())
    }

    fn place_beside(&mut self, id: TopicId, anchor: TopicId, before: bool) -> MindResult<()> {
        if Some(id) == self.tree.root() {
            return Err(MindError::illegal_instance("root topic", "non-root topic"));
        }
        self.tree.node(id)?;
        let parent = self
            .tree
            .parent(anchor)
            .ok_or_else(|| MindError::invalid_param("sibling"))?;
        if id == anchor || self.tree.is_ancestor_or_self(id, parent) {
            return Err(MindError::invalid_param("sibling"));
        }
        self.tree.detach(id)?;
        let at = self.tree.position(anchor).unwrap_or(0) + usize::from(!before);
        self.tree.attach(id, parent, at)
    }

    // Visibility, focus, fold.

    pub fn is_visible(&self, id: TopicId) -> bool {
        self.tree.get(id).is_some_and(|node| node.visible)
    }

    /// Hiding drops focus from the topic; showing it again relayouts.
    pub fn set_visible(&mut self, id: TopicId, visible: bool) -> MindResult<()> {
        if self.hide_in_place(id, visible)? && visible {
            self.fire(MindEvent::RequireLayout, None);
        }
        Ok(())
    }

    /// Flips the visible flag without asking for a relayout, so the rest of
    /// the map keeps its geometry. Returns whether the flag changed.
    pub(crate) fn hide_in_place(&mut self, id: TopicId, visible: bool) -> MindResult<bool> {
        let node = self.tree.node_mut(id)?;
        if node.visible == visible {
            return Ok(false);
        }
        node.visible = visible;
        if !visible && self.focus == Some(id) {
            self.focus(id, false)?;
        }
        Ok(true)
    }

    pub fn is_in_focus(&self, id: TopicId) -> bool {
        self.focus == Some(id)
    }

    /// Gives focus to `id`, taking it from whichever topic held it, or
    /// drops it. Hidden topics never take focus.
    pub fn focus(&mut self, id: TopicId, on: bool) -> MindResult<()> {
        let visible = self.tree.node(id)?.visible;
        if on {
            if !visible {
                return Ok(());
            }
            self.focus = Some(id);
            self.fire(MindEvent::FocusChange { topic: Some(id) }, None);
        } else if self.focus == Some(id) {
            self.focus = None;
            self.fire(MindEvent::FocusChange { topic: None }, None);
        }
        Ok(())
    }

    /// Whether the topic's children are collapsed as currently displayed.
    pub fn is_folded(&self, id: TopicId) -> bool {
        self.tree
            .get(id)
            .is_some_and(|node| effective_fold(self.fold_level, node))
    }

    /// Folds or unfolds one topic. The topic takes focus first; an active
    /// forced fold level is first written into every topic's own flag.
    pub fn set_folded(&mut self, id: TopicId, folded: bool) -> MindResult<()> {
        self.tree.node(id)?;
        self.focus(id, true)?;
        if self.fold_level > 0 {
            let level = self.fold_level;
            for topic in self.tree.preorder() {
                if let Some(node) = self.tree.get_mut(topic) {
                    node.folded = effective_fold(level, node);
                }
            }
            self.fold_level = 0;
        }
        self.tree.node_mut(id)?.folded = folded;
        self.fire(MindEvent::RequireLayout, None);
        Ok(())
    }

    // Data.

    /// Own fields of a topic; depth-one topics also report their side.
    pub fn topic_data(&self, id: TopicId) -> Option<TopicData> {
        let node = self.tree.get(id)?;
        let mut data = node.item.to_data(self.translators());
        if node.level == 1 {
            data.direction = Some(node.direction.unwrap_or_default());
        }
        Some(data)
    }

    /// Recursive data of a topic, with ids and children.
    pub fn subtree_data(&self, id: TopicId) -> Option<TopicData> {
        self.tree.data(id, self.translators())
    }

    pub fn property(&self, id: TopicId, name: &str) -> Option<Value> {
        let data = self.topic_data(id)?;
        let value = match name {
            "customData" => data.custom_data?,
            "title" => Value::from(data.title),
            "image" => serde_json::to_value(data.image?).ok()?,
            "labels" => Value::from(data.labels?),
            "href" => Value::from(data.href?),
            "notes" => Value::from(data.notes?),
            "markers" => Value::Object(data.markers?.into_iter().collect()),
            _ => return None,
        };
        Some(value)
    }

    /// Sets one property and relayouts. Unknown names are ignored and
    /// reported as `false`; a value of the wrong shape is an error.
    pub fn set_property(&mut self, id: TopicId, name: &str, value: Value) -> MindResult<bool> {
        let changed = self.apply_property(id, name, value)?;
        if changed {
            self.fire(MindEvent::RequireLayout, None);
        }
        Ok(changed)
    }

    /// Sets several properties with a single relayout; returns how many
    /// names were recognised.
    pub fn set_properties(&mut self, id: TopicId, values: &Map<String, Value>) -> MindResult<usize> {
        let mut count = 0;
        for (name, value) in values {
            if self.apply_property(id, name, value.clone())? {
                count += 1;
            }
        }
        if count != 0 {
            self.fire(MindEvent::RequireLayout, None);
        }
        Ok(count)
    }

    fn apply_property(&mut self, id: TopicId, name: &str, value: Value) -> MindResult<bool> {
        if !PROPERTY_NAMES.contains(&name) {
            return Ok(false);
        }
        let translators = self.translators().clone();
        let item = &mut self.tree.node_mut(id)?.item;
        match name {
            "customData" => item.custom_data = (!value.is_null()).then_some(value),
            "title" => item.title = optional::<String>(name, value)?.unwrap_or_default(),
            "image" => item.set_image(optional::<ImageData>(name, value)?),
            "labels" => item.set_labels(optional(name, value)?),
            "href" => item.set_href(optional(name, value)?),
            "notes" => item.set_notes(optional(name, value)?),
            "markers" => {
                let markers: IndexMap<String, Value> = optional(name, value)?.unwrap_or_default();
                item.set_markers(markers.iter(), &translators);
            }
            _ => return Ok(false),
        }
        if name == "image" {
            self.resolve_images(&[id]);
        }
        Ok(true)
    }
}

fn optional<T: DeserializeOwned>(name: &str, value: Value) -> MindResult<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|_| MindError::invalid_param(name))
}

fn invoke_event(stamp: Stamp, topic: TopicId, item: &TopicItem, map: &MindMap) -> Option<MindEvent> {
    let event = match stamp {
        Stamp::Link => MindEvent::InvokeLink {
            topic,
            data: item.href.clone(),
        },
        Stamp::Notes => MindEvent::InvokeNotes {
            topic,
            data: item.notes.clone(),
        },
        Stamp::Image => MindEvent::InvokeImage {
            topic,
            data: item.image.clone(),
        },
        Stamp::Labels | Stamp::LabelsMore => MindEvent::InvokeLabels {
            topic,
            data: item.labels.clone(),
            more: stamp == Stamp::LabelsMore,
        },
        Stamp::Markers => MindEvent::InvokeMarkers {
            topic,
            data: item.decoded_markers(map.translators()),
        },
        Stamp::TopicTitle | Stamp::FoldIcon => return None,
    };
    Some(event)
}

pub(crate) fn install(ext: &mut Extensions) {
    let click = EventType::Dom(DomEventKind::Click);
    let table = ext.table_mut(Component::Topic);
    table.on(
        click,
        Some(Stamp::FoldIcon),
        handler(|map, ctx| {
            let topic = ctx.owner()?;
            let folded = map.is_folded(topic);
            if let Err(err) = map.set_folded(topic, !folded) {
                tracing::warn!(error = %err, "fold toggle failed");
            }
            ctx.mark_handled();
            None
        }),
    );
    for stamp in [
        Stamp::Link,
        Stamp::Notes,
        Stamp::Image,
        Stamp::Labels,
        Stamp::LabelsMore,
        Stamp::Markers,
    ] {
        table.on(
            click,
            Some(stamp),
            handler(move |map, ctx| {
                let topic = ctx.owner()?;
                let event = map
                    .tree()
                    .get(topic)
                    .and_then(|node| invoke_event(stamp, topic, &node.item, map));
                if let Some(event) = event {
                    map.fire(event, None);
                }
                ctx.continue_sibling();
                None
            }),
        );
    }
    table.on(
        click,
        None,
        handler(|map, ctx| {
            let topic = ctx.owner()?;
            if let Err(err) = map.focus(topic, true) {
                tracing::warn!(error = %err, "focus failed");
            }
            ctx.mark_handled();
            None
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DomEvent, HookResult, MindEventKind};
    use crate::surface::FixedContainer;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn shown() -> (MindMap, TopicId) {
        let mut map = MindMap::new(Rc::new(FixedContainer::new(800.0, 600.0)));
        let data = TopicData::titled("root").with_children(vec![
            TopicData::titled("a").with_children(vec![TopicData::titled("a1"), TopicData::titled("a2")]),
            TopicData::titled("b"),
        ]);
        let root = map.show(&data);
        (map, root)
    }

    fn focus_log(map: &mut MindMap) -> Rc<RefCell<Vec<Option<TopicId>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        map.on(MindEventKind::FocusChange, move |event, _| {
            if let MindEvent::FocusChange { topic } = event {
                sink.borrow_mut().push(*topic);
            }
            HookResult::Allow
        });
        log
    }

    #[test]
    fn focus_moves_and_hiding_clears_it() {
        let (mut map, root) = shown();
        let log = focus_log(&mut map);
        let a = map.children(root)[0];
        let b = map.children(root)[1];
        map.focus(a, true).unwrap();
        map.focus(b, true).unwrap();
        assert!(!map.is_in_focus(a));
        assert!(map.is_in_focus(b));
        map.set_visible(b, false).unwrap();
        assert_eq!(map.focus_topic(), None);
        assert_eq!(*log.borrow(), vec![Some(a), Some(b), None]);
        map.focus(b, true).unwrap();
        assert_eq!(map.focus_topic(), None);
    }

    #[test]
    fn add_child_uses_default_title_and_relayouts() {
        let (mut map, root) = shown();
        let b = map.children(root)[1];
        let child = map.add_child(b, None, true).unwrap();
        assert_eq!(map.property(child, "title"), Some(Value::from(DEFAULT_TITLE)));
        assert_eq!(map.level(child), Some(2));
        assert!(map.title_zone(child).is_some());
    }

    #[test]
    fn sibling_insertion_keeps_order() {
        let (mut map, root) = shown();
        let a = map.children(root)[0];
        let a1 = map.children(a)[0];
        let a2 = map.children(a)[1];
        let b = map.children(root)[1];
        map.insert_as_brother_of(b, a1, true, false).unwrap();
        assert_eq!(map.children(a), &[b, a1, a2]);
        map.insert_after_sibling(b, a2, true).unwrap();
        assert_eq!(map.children(a), &[a1, a2, b]);
        assert_eq!(map.level(b), Some(2));
        assert!(map.insert_after_sibling(a, a1, true).is_err());
        assert!(map.insert_after_sibling(root, a1, true).is_err());
    }

    #[test]
    fn remove_drops_geometry_and_focus() {
        let (mut map, root) = shown();
        let a = map.children(root)[0];
        let a1 = map.children(a)[0];
        map.focus(a1, true).unwrap();
        map.remove(a, true).unwrap();
        assert_eq!(map.focus_topic(), None);
        assert!(map.title_zone(a1).is_none());
        assert_eq!(map.children(root).len(), 1);
        map.clear_children(root, true).unwrap();
        assert!(!map.has_child(root));
    }

    #[test]
    fn properties_round_trip_through_markers_translation() {
        let (mut map, root) = shown();
        let b = map.children(root)[1];
        let mut values = Map::new();
        values.insert("markers".into(), serde_json::json!({"priority": 12, "task": "half"}));
        values.insert("href".into(), Value::from("  https://example.com "));
        values.insert("bogus".into(), Value::from(1));
        assert_eq!(map.set_properties(b, &values).unwrap(), 2);
        assert_eq!(map.tree().get(b).unwrap().item.markers, vec!["priority-9", "task-4"]);
        assert_eq!(
            map.property(b, "markers"),
            Some(serde_json::json!({"priority": 9, "task": "half"}))
        );
        assert_eq!(map.property(b, "href"), Some(Value::from("https://example.com")));
        assert!(map.set_property(b, "labels", Value::from(3)).is_err());
        assert_eq!(map.set_property(b, "href", Value::Null).unwrap(), true);
        assert_eq!(map.property(b, "href"), None);
    }

    #[test]
    fn fold_icon_click_toggles_and_focuses() {
        let (mut map, root) = shown();
        let a = map.children(root)[0];
        let a1 = map.children(a)[0];
        let outcome = map.handle_event(DomEvent::new(DomEventKind::Click).on(a, Some(Stamp::FoldIcon)));
        assert!(outcome.propagation_stopped);
        assert!(map.is_folded(a));
        assert!(map.is_in_focus(a));
        assert!(map.layout().get(a1).is_none());
    }

    #[test]
    fn link_click_invokes_then_focuses() {
        let (mut map, root) = shown();
        let b = map.children(root)[1];
        map.set_property(b, "href", Value::from("https://example.com")).unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        map.on(MindEventKind::InvokeLink, move |event, _| {
            if let MindEvent::InvokeLink { data, .. } = event {
                *sink.borrow_mut() = data.clone();
            }
            HookResult::Allow
        });
        map.handle_event(DomEvent::new(DomEventKind::Click).on(b, Some(Stamp::Link)));
        assert_eq!(seen.borrow().as_deref(), Some("https://example.com"));
        assert!(map.is_in_focus(b));
    }

    #[test]
    fn blank_click_clears_focus() {
        let (mut map, root) = shown();
        map.focus(root, true).unwrap();
        let outcome = map.handle_event(DomEvent::new(DomEventKind::Click));
        assert!(outcome.default_prevented);
        assert_eq!(map.focus_topic(), None);
    }
}
