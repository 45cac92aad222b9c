use crate::layout::{Point, Rect};
use crate::surface::MindMap;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub view_box: String,
    pub fold_level: i32,
    pub focus: Option<String>,
    pub topics: Vec<TopicDump>,
}

#[derive(Debug, Serialize)]
pub struct TopicDump {
    pub id: String,
    pub title: String,
    pub level: usize,
    pub left: bool,
    pub visible: bool,
    pub folded: bool,
    pub origin: Point,
    pub title_zone: Rect,
    pub item_zone: Rect,
    pub total_zone: Rect,
    pub paths: Vec<PathDump>,
}

#[derive(Debug, Serialize)]
pub struct PathDump {
    pub to: String,
    /// Group translation the path data is relative to.
    pub translate: Point,
    pub d: String,
}

impl LayoutDump {
    /// Absolute geometry of every laid-out topic, in document order.
    pub fn from_map(map: &MindMap) -> Self {
        let tree = map.tree();
        let topics = map
            .topics()
            .filter_map(|id| {
                let node = tree.get(id)?;
                let placed = map.layout().get(id)?;
                let translate = placed.origin.offset(
                    placed.layout.children_offset.x,
                    placed.layout.children_offset.y,
                );
                let paths = placed
                    .layout
                    .paths
                    .iter()
                    .filter_map(|path| {
                        Some(PathDump {
                            to: tree.get(path.child)?.id.clone(),
                            translate,
                            d: path.d.clone(),
                        })
                    })
                    .collect();
                Some(TopicDump {
                    id: node.id.clone(),
                    title: node.item.title.clone(),
                    level: node.level,
                    left: placed.left,
                    visible: map.is_displayed(id),
                    folded: map.is_folded(id),
                    origin: placed.origin,
                    title_zone: placed.title_zone(),
                    item_zone: placed.item_zone(),
                    total_zone: placed.total_zone(),
                    paths,
                })
            })
            .collect();
        let size = map.total_size();
        LayoutDump {
            width: size.width,
            height: size.height,
            view_box: map.view_box(),
            fold_level: map.fold_level(),
            focus: map
                .focus_topic()
                .and_then(|id| map.topic_id(id))
                .map(str::to_string),
            topics,
        }
    }
}

pub fn write_layout_dump(path: &Path, map: &MindMap) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_map(map);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TopicData;
    use crate::surface::FixedContainer;
    use std::rc::Rc;

    #[test]
    fn dump_lists_topics_with_connectors() {
        let mut map = MindMap::new(Rc::new(FixedContainer::new(800.0, 600.0)));
        map.show(&TopicData::titled("root").with_children(vec![TopicData::titled("a")]));
        let dump = LayoutDump::from_map(&map);
        assert_eq!(dump.topics.len(), 2);
        assert_eq!(dump.topics[0].level, 0);
        assert_eq!(dump.topics[0].paths.len(), 1);
        assert_eq!(dump.topics[0].paths[0].to, dump.topics[1].id);
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["topics"][1]["title"], "a");
        assert!(json["topics"][1]["title_zone"]["width"].as_f64().unwrap() > 0.0);
    }
}
