//! Arena of topics owned by a surface.
//!
//! Topics are addressed by [`TopicId`] handles. A handle stays valid until
//! its topic is removed; slots are not reused while the tree is edited, so a
//! stale handle fails the lookup instead of pointing at a different topic.
//! `clear` and `load` drop every slot and start over from index 0, which
//! invalidates all earlier handles.

use serde::Serialize;
use serde_json::Value;

use crate::attachment::ATTACHMENT_LINK_PREFIX;
use crate::defs::Translators;
use crate::error::{MindError, MindResult};
use crate::ir::{Direction, ImageData, TopicData};

pub const PREFIX_ID: &str = "MID-";
pub const DEFAULT_TITLE: &str = "Topic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TopicId(pub(crate) usize);

impl TopicId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Normalises an input id to carry the `MID-` prefix, generating one when
/// absent.
pub fn mind_id(id: Option<&str>) -> String {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) if id.starts_with(PREFIX_ID) => id.to_string(),
        Some(id) => format!("{PREFIX_ID}{id}"),
        None => format!("{PREFIX_ID}{}", uuid::Uuid::new_v4().simple()),
    }
}

/// Decorations of one topic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicItem {
    pub title: String,
    pub image: Option<ImageData>,
    /// Displayable href of `image`; `None` until an attachment reference
    /// has been resolved.
    pub image_href: Option<String>,
    pub labels: Vec<String>,
    pub href: Option<String>,
    pub notes: Option<String>,
    /// Icon keys such as `priority-3`, in insertion order.
    pub markers: Vec<String>,
    pub custom_data: Option<Value>,
}

impl TopicItem {
    pub fn from_data(data: &TopicData, translators: &Translators) -> Self {
        let mut item = Self {
            title: data.title.clone(),
            custom_data: data.custom_data.clone(),
            ..Default::default()
        };
        item.set_image(data.image.clone());
        item.set_labels(data.labels.clone());
        item.set_href(data.href.clone());
        item.set_notes(data.notes.clone());
        if let Some(markers) = &data.markers {
            item.set_markers(markers.iter(), translators);
        }
        item
    }

    pub fn set_image(&mut self, image: Option<ImageData>) {
        self.image = image.filter(|image| !image.src.trim().is_empty());
        self.image_href = self
            .image
            .as_ref()
            .map(|image| image.src.trim())
            .filter(|src| !src.starts_with(ATTACHMENT_LINK_PREFIX))
            .map(str::to_string);
    }

    /// Attachment name the image refers to, when its src is a `xap:` link.
    pub fn attachment_name(&self) -> Option<&str> {
        self.image
            .as_ref()
            .and_then(|image| image.src.trim().strip_prefix(ATTACHMENT_LINK_PREFIX))
    }

    pub fn set_labels(&mut self, labels: Option<Vec<String>>) {
        self.labels = labels.unwrap_or_default();
    }

    pub fn set_href(&mut self, href: Option<String>) {
        self.href = href
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty());
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|notes| !notes.is_empty());
    }

    pub fn set_markers<'a, I>(&mut self, markers: I, translators: &Translators)
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        self.markers = markers
            .into_iter()
            .map(|(kind, value)| translators.encode(kind, value))
            .collect();
    }

    pub fn decoded_markers(&self, translators: &Translators) -> Option<indexmap::IndexMap<String, Value>> {
        if self.markers.is_empty() {
            return None;
        }
        let mut out = indexmap::IndexMap::new();
        for key in &self.markers {
            match translators.decode(key) {
                Some((kind, value)) => {
                    out.insert(kind, value);
                }
                None => tracing::warn!(marker = %key, "marker key without a type prefix"),
            }
        }
        Some(out)
    }

    /// Own fields as data, without id, direction or children.
    pub fn to_data(&self, translators: &Translators) -> TopicData {
        TopicData {
            custom_data: self.custom_data.clone(),
            title: self.title.clone(),
            image: self.image.clone(),
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            href: self.href.clone(),
            notes: self.notes.clone(),
            markers: self.decoded_markers(translators),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicNode {
    pub id: String,
    pub parent: Option<TopicId>,
    pub children: Vec<TopicId>,
    pub level: usize,
    pub direction: Option<Direction>,
    pub visible: bool,
    /// Own fold flag; a forced fold level on the surface overrides it.
    pub folded: bool,
    pub item: TopicItem,
}

/// Topic arena. Edits only append slots; `clear` and `load` reclaim them.
#[derive(Debug, Clone, Default)]
pub struct TopicTree {
    nodes: Vec<Option<TopicNode>>,
    root: Option<TopicId>,
}

impl TopicTree {
    pub fn root(&self) -> Option<TopicId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn get(&self, id: TopicId) -> Option<&TopicNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: TopicId) -> Option<&mut TopicNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn node(&self, id: TopicId) -> MindResult<&TopicNode> {
        self.get(id).ok_or_else(|| MindError::invalid_param("topic"))
    }

    pub fn node_mut(&mut self, id: TopicId) -> MindResult<&mut TopicNode> {
        self.get_mut(id).ok_or_else(|| MindError::invalid_param("topic"))
    }

    pub fn contains(&self, id: TopicId) -> bool {
        self.get(id).is_some()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Replaces the whole tree with `data`. The root keeps an empty title
    /// as is; children get the default title.
    pub fn load(&mut self, data: &TopicData, translators: &Translators) -> TopicId {
        self.clear();
        let root = self.build(data, None, 0, translators, false);
        self.root = Some(root);
        root
    }

    /// Builds `data` and appends it under `parent` (at `index` when given).
    pub fn insert_data(
        &mut self,
        parent: TopicId,
        index: Option<usize>,
        data: &TopicData,
        translators: &Translators,
    ) -> MindResult<TopicId> {
        let level = self.node(parent)?.level + 1;
        let id = self.build(data, Some(parent), level, translators, true);
        let siblings = &mut self.node_mut(parent)?.children;
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, id);
        Ok(id)
    }

    fn build(
        &mut self,
        data: &TopicData,
        parent: Option<TopicId>,
        level: usize,
        translators: &Translators,
        default_title: bool,
    ) -> TopicId {
        let mut item = TopicItem::from_data(data, translators);
        if default_title && item.title.is_empty() {
            item.title = DEFAULT_TITLE.to_string();
        }
        let id = TopicId(self.nodes.len());
        self.nodes.push(Some(TopicNode {
            id: mind_id(data.id.as_deref()),
            parent,
            children: Vec::with_capacity(data.children.len()),
            level,
            direction: data.direction,
            visible: true,
            folded: false,
            item,
        }));
        let children: Vec<TopicId> = data
            .children
            .iter()
            .map(|child| self.build(child, Some(id), level + 1, translators, true))
            .collect();
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
        id
    }

    pub fn parent(&self, id: TopicId) -> Option<TopicId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: TopicId) -> &[TopicId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// Position of `id` among its parent's children.
    pub fn position(&self, id: TopicId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: TopicId) -> Option<TopicId> {
        let parent = self.parent(id)?;
        let at = self.position(id)?;
        self.children(parent).get(at + 1).copied()
    }

    pub fn previous_sibling(&self, id: TopicId) -> Option<TopicId> {
        let parent = self.parent(id)?;
        let at = self.position(id)?;
        at.checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// True when `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: TopicId, id: TopicId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Unlinks `id` from its parent, leaving the subtree in the arena.
    pub(crate) fn detach(&mut self, id: TopicId) -> MindResult<()> {
        if let Some(parent) = self.node(id)?.parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        Ok(())
    }

    /// Links a detached `id` under `parent` at `index` and re-levels the
    /// subtree.
    pub(crate) fn attach(&mut self, id: TopicId, parent: TopicId, index: usize) -> MindResult<()> {
        let level = self.node(parent)?.level + 1;
        let siblings = &mut self.node_mut(parent)?.children;
        let at = index.min(siblings.len());
        siblings.insert(at, id);
        self.node_mut(id)?.parent = Some(parent);
        self.relevel(id, level);
        Ok(())
    }

    /// Moves `id` under `parent`. Moving a topic into its own subtree or
    /// moving the root is rejected.
    pub fn move_to(&mut self, id: TopicId, parent: TopicId, index: Option<usize>) -> MindResult<()> {
        if Some(id) == self.root {
            return Err(MindError::illegal_instance("root topic", "non-root topic"));
        }
        self.node(parent)?;
        if self.is_ancestor_or_self(id, parent) {
            return Err(MindError::invalid_param("parent"));
        }
        self.detach(id)?;
        let len = self.children(parent).len();
        self.attach(id, parent, index.unwrap_or(len))
    }

    fn relevel(&mut self, id: TopicId, level: usize) {
        let mut stack = vec![(id, level)];
        while let Some((current, level)) = stack.pop() {
            if let Some(node) = self.get_mut(current) {
                node.level = level;
                stack.extend(node.children.iter().map(|child| (*child, level + 1)));
            }
        }
    }

    /// Drops `id` and its subtree; removing the root empties the tree.
    pub(crate) fn remove(&mut self, id: TopicId) -> MindResult<Vec<TopicId>> {
        self.detach(id)?;
        let removed = self.subtree(id);
        for gone in &removed {
            if let Some(slot) = self.nodes.get_mut(gone.0) {
                *slot = None;
            }
        }
        if Some(id) == self.root {
            self.root = None;
        }
        Ok(removed)
    }

    /// `id` and its descendants in document order.
    pub fn subtree(&self, id: TopicId) -> Vec<TopicId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every topic in document order.
    pub fn preorder(&self) -> Vec<TopicId> {
        self.root.map(|root| self.subtree(root)).unwrap_or_default()
    }

    pub fn find_by_id(&self, mind_id: &str) -> Option<TopicId> {
        self.preorder()
            .into_iter()
            .find(|id| self.get(*id).map(|node| node.id == mind_id).unwrap_or(false))
    }

    /// Recursive data projection of `id`.
    pub fn data(&self, id: TopicId, translators: &Translators) -> Option<TopicData> {
        let node = self.get(id)?;
        let mut data = node.item.to_data(translators);
        if node.level == 1 {
            data.direction = Some(node.direction.unwrap_or_default());
        }
        data.id = Some(node.id.clone());
        data.children = node
            .children
            .iter()
            .filter_map(|child| self.data(*child, translators))
            .collect();
        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (TopicTree, TopicId) {
        let data = TopicData::titled("root").with_children(vec![
            TopicData::titled("a").with_children(vec![TopicData::titled("a1")]),
            TopicData::titled(""),
        ]);
        let mut tree = TopicTree::default();
        let root = tree.load(&data, &Translators::default());
        (tree, root)
    }

    #[test]
    fn ids_are_prefixed_or_generated() {
        assert_eq!(mind_id(Some("42")), "MID-42");
        assert_eq!(mind_id(Some("MID-7")), "MID-7");
        let generated = mind_id(None);
        assert!(generated.starts_with(PREFIX_ID));
        assert_eq!(generated.len(), PREFIX_ID.len() + 32);
    }

    #[test]
    fn children_get_default_titles_and_levels() {
        let (tree, root) = sample();
        let kids = tree.children(root).to_vec();
        assert_eq!(tree.get(kids[1]).unwrap().item.title, DEFAULT_TITLE);
        let a1 = tree.children(kids[0])[0];
        assert_eq!(tree.get(a1).unwrap().level, 2);
    }

    #[test]
    fn moving_relevels_descendants() {
        let (mut tree, root) = sample();
        let kids = tree.children(root).to_vec();
        tree.move_to(kids[0], kids[1], None).unwrap();
        let a1 = tree.children(kids[0])[0];
        assert_eq!(tree.get(kids[0]).unwrap().level, 2);
        assert_eq!(tree.get(a1).unwrap().level, 3);
        assert_eq!(tree.children(root), &[kids[1]]);
    }

    #[test]
    fn moving_into_own_subtree_is_rejected() {
        let (mut tree, root) = sample();
        let a = tree.children(root)[0];
        let a1 = tree.children(a)[0];
        assert!(tree.move_to(a, a1, None).is_err());
        assert!(tree.move_to(root, a, None).is_err());
        assert_eq!(tree.parent(a1), Some(a));
    }

    #[test]
    fn attachment_images_wait_for_resolution() {
        let mut item = TopicItem::default();
        item.set_image(Some(ImageData {
            src: "xap:pic-1".into(),
            width: None,
            height: None,
        }));
        assert_eq!(item.attachment_name(), Some("pic-1"));
        assert!(item.image_href.is_none());
        item.set_image(Some(ImageData {
            src: " a.png ".into(),
            width: None,
            height: None,
        }));
        assert_eq!(item.image_href.as_deref(), Some("a.png"));
        assert_eq!(item.attachment_name(), None);
    }

    #[test]
    fn removed_handles_go_stale() {
        let (mut tree, root) = sample();
        let a = tree.children(root)[0];
        let a1 = tree.children(a)[0];
        let removed = tree.remove(a).unwrap();
        assert_eq!(removed, vec![a, a1]);
        assert!(tree.get(a1).is_none());
        assert!(tree.node(a).is_err());
        assert_eq!(tree.preorder().len(), 2);
    }

    #[test]
    fn reloading_reclaims_removed_slots() {
        let (mut tree, root) = sample();
        let a = tree.children(root)[0];
        tree.remove(a).unwrap();
        let added = tree
            .insert_data(root, None, &TopicData::titled("b"), &Translators::default())
            .unwrap();
        assert!(added.index() > a.index());
        let reloaded = tree.load(&TopicData::titled("fresh"), &Translators::default());
        assert_eq!(reloaded.index(), 0);
        assert_eq!(tree.preorder(), vec![reloaded]);
    }
}
