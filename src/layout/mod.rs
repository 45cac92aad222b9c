mod item;
pub mod text;
pub(crate) mod types;

pub(crate) use item::item_parts;
pub use text::{ApproxMetrics, FontMetrics, TextMeasure};
pub use types::*;

use crate::config::LayoutParams;
use crate::defs::Defs;
use crate::ir::Direction;
use crate::tree::{TopicId, TopicNode, TopicTree};
use item::layout_item;
use std::collections::BTreeMap;

/// Inputs shared by every topic of one layout pass.
pub struct LayoutEnv<'a> {
    pub params: LayoutParams,
    pub measure: &'a dyn TextMeasure,
    pub defs: &'a Defs,
    /// Forced fold depth; `0` leaves every topic on its own fold flag.
    pub fold_level: i32,
}

/// Whether a topic's children are collapsed under `fold_level`.
pub fn effective_fold(fold_level: i32, node: &TopicNode) -> bool {
    if fold_level > 0 {
        fold_level as usize <= node.level
    } else {
        node.folded
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacedTopic {
    pub layout: TopicLayout,
    /// Origin of the topic group in content coordinates.
    pub origin: Point,
    pub left: bool,
}

impl PlacedTopic {
    pub fn title_zone(&self) -> Rect {
        let size = self.layout.item.title_box;
        Rect::new(self.origin.x, self.origin.y, size.width, size.height)
    }

    pub fn item_zone(&self) -> Rect {
        self.layout.item.bbox.translate(self.origin.x, self.origin.y)
    }

    pub fn total_zone(&self) -> Rect {
        self.layout.bbox.translate(self.origin.x, self.origin.y)
    }
}

/// Geometry of every displayed topic. Topics under a folded ancestor or
/// hidden ones are absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapLayout {
    pub root: Option<TopicId>,
    pub topics: BTreeMap<TopicId, PlacedTopic>,
}

impl MapLayout {
    pub fn get(&self, id: TopicId) -> Option<&PlacedTopic> {
        self.topics.get(&id)
    }

    /// Bounding box of the whole map, in content coordinates.
    pub fn bounds(&self) -> Rect {
        self.root
            .and_then(|root| self.get(root))
            .map(PlacedTopic::total_zone)
            .unwrap_or_default()
    }
}

pub fn compute_layout(tree: &TopicTree, env: &LayoutEnv<'_>) -> MapLayout {
    let Some(root) = tree.root() else {
        return MapLayout::default();
    };
    let mut local = BTreeMap::new();
    let mut sides = BTreeMap::new();
    let root_layout = layout_topic(tree, root, None, env, &mut local, &mut sides);
    local.insert(root, root_layout);

    let mut topics = BTreeMap::new();
    let mut stack = vec![(root, Point::default())];
    while let Some((id, origin)) = stack.pop() {
        let Some(layout) = local.remove(&id) else {
            continue;
        };
        if layout.children_shown {
            let base = origin.offset(layout.children_offset.x, layout.children_offset.y);
            for child in tree.children(id) {
                if let Some(child_layout) = local.get(child) {
                    let at = base.offset(child_layout.translate.x, child_layout.translate.y);
                    stack.push((*child, at));
                }
            }
        }
        tracing::trace!(topic = id.index(), x = origin.x, y = origin.y, "placed topic");
        topics.insert(
            id,
            PlacedTopic {
                layout,
                origin,
                left: sides.get(&id).copied().unwrap_or(false),
            },
        );
    }
    tracing::debug!(topics = topics.len(), fold_level = env.fold_level, "layout pass");
    MapLayout {
        root: Some(root),
        topics,
    }
}

struct ChildSlot {
    id: TopicId,
    layout: TopicLayout,
    x: f32,
    y: f32,
    line_y: f32,
    left: bool,
}

fn layout_topic(
    tree: &TopicTree,
    id: TopicId,
    direction: Option<Direction>,
    env: &LayoutEnv<'_>,
    out: &mut BTreeMap<TopicId, TopicLayout>,
    sides: &mut BTreeMap<TopicId, bool>,
) -> TopicLayout {
    let Some(node) = tree.get(id) else {
        return TopicLayout::default();
    };
    let params = &env.params;
    let folded = effective_fold(env.fold_level, node);
    let glyph = (!node.children.is_empty() && node.level > 0).then_some(if folded {
        FoldGlyph::Plus
    } else {
        FoldGlyph::Minus
    });
    let left = direction.map(Direction::is_left).unwrap_or(false);
    sides.insert(id, left);
    let item = layout_item(&node.item, node.item.image_href.as_deref(), glyph, left, env);

    let mut bounds = Bounds::default();
    bounds.add(item.bbox);
    let mut layout = TopicLayout {
        item,
        ..Default::default()
    };
    if folded {
        layout.bbox = bounds.or_empty();
        return layout;
    }
    layout.children_shown = true;

    let connect = layout.item.connect_point(false);
    let margin_right = params.topic_margin_x;
    let margin_left = -connect.x - margin_right;
    let margin_y = params.topic_margin_y;
    let mut offset_right = 0.0_f32;
    let mut offset_left = 0.0_f32;
    let mut slots: Vec<ChildSlot> = Vec::new();

    for child in &node.children {
        let Some(child_node) = tree.get(*child) else {
            continue;
        };
        if !child_node.visible {
            continue;
        }
        let child_dir = direction.unwrap_or_else(|| child_node.direction.unwrap_or_default());
        let child_layout = layout_topic(tree, *child, Some(child_dir), env, out, sides);
        let corner = child_layout.origin_corner();
        let title = child_layout.item.title_box;
        let height = child_layout.size().height;
        let offset = if child_dir.is_left() {
            &mut offset_left
        } else {
            &mut offset_right
        };
        let y = if corner.y < 0.0 { *offset - corner.y } else { *offset };
        *offset += height + margin_y;
        let x = if child_dir.is_left() {
            margin_left - title.width
        } else {
            margin_right
        };
        slots.push(ChildSlot {
            id: *child,
            layout: child_layout,
            x,
            y,
            line_y: y + title.height / 2.0,
            left: child_dir.is_left(),
        });
    }

    // The shorter branch is shifted down by half the difference.
    let (shift_left, shift_right) = if offset_right > offset_left {
        ((offset_right - offset_left) / 2.0, 0.0)
    } else {
        (0.0, (offset_left - offset_right) / 2.0)
    };

    let mut children = Bounds::default();
    for slot in &slots {
        let shift = if slot.left { shift_left } else { shift_right };
        children.add(slot.layout.bbox.translate(slot.x, slot.y + shift));
    }
    let start_y = children
        .get()
        .map(|rect| (rect.y + rect.height / 2.0).floor())
        .unwrap_or(0.0);

    let ctrl = params.line_bezier_ctrl_size;
    for mut slot in slots {
        let shift = if slot.left { shift_left } else { shift_right };
        let end_y = slot.line_y + shift;
        let d = if slot.left {
            children.add_point(Point::new(-connect.x, start_y));
            children.add_point(Point::new(margin_left, end_y));
            format!(
                "M{} {}C{} {} {} {} {} {}",
                fmt_num(-connect.x),
                fmt_num(start_y),
                fmt_num(-connect.x - ctrl),
                fmt_num(start_y),
                fmt_num(margin_left + ctrl),
                fmt_num(end_y),
                fmt_num(margin_left),
                fmt_num(end_y),
            )
        } else {
            children.add_point(Point::new(0.0, start_y));
            children.add_point(Point::new(margin_right, end_y));
            format!(
                "M0 {}C{} {} {} {} {} {}",
                fmt_num(start_y),
                fmt_num(ctrl),
                fmt_num(start_y),
                fmt_num(margin_right - ctrl),
                fmt_num(end_y),
                fmt_num(margin_right),
                fmt_num(end_y),
            )
        };
        layout.paths.push(ConnectorPath {
            child: slot.id,
            d,
            left: slot.left,
        });
        slot.layout.translate = Point::new(slot.x, slot.y + shift);
        out.insert(slot.id, slot.layout);
    }

    layout.children_offset = Point::new(connect.x, connect.y - start_y);
    if let Some(rect) = children.get() {
        bounds.add(rect.translate(layout.children_offset.x, layout.children_offset.y));
    }
    layout.bbox = bounds.or_empty();
    layout
}

/// Compact number text for SVG attributes: two decimals at most, no
/// trailing zeros, no negative zero.
pub fn fmt_num(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 || !rounded.is_finite() {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}
