//! Structured topic data: the input schema accepted by
//! [`MindMap::show`](crate::MindMap::show) and the projection returned by
//! [`MindMap::data`](crate::MindMap::data).

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::MindResult;

/// Side of the root a first-level branch renders on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Direction {
    #[default]
    Right,
    Left,
}

impl Direction {
    pub fn code(self) -> u8 {
        match self {
            Direction::Right => 0,
            Direction::Left => 1,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Direction::Right),
            1 => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn is_left(self) -> bool {
        self == Direction::Left
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u64::deserialize(deserializer)?;
        Direction::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("direction must be 0 or 1, got {code}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

/// One topic and, recursively, its children.
///
/// Field order matches the output projection: own decorations first, then
/// `direction` (first-level topics only), `id` and `children`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<TopicData>,
}

impl TopicData {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<TopicData>) -> Self {
        self.children = children;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Parses a JSON topic tree.
pub fn parse_mindmap(input: &str) -> MindResult<TopicData> {
    Ok(serde_json::from_str(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tree_with_directions() {
        let data = parse_mindmap(
            r#"{"title":"root","children":[{"title":"a","direction":1},{"title":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(data.children.len(), 2);
        assert_eq!(data.children[0].direction, Some(Direction::Left));
        assert_eq!(data.children[1].direction, None);
    }

    #[test]
    fn rejects_unknown_direction_codes() {
        assert!(parse_mindmap(r#"{"title":"x","direction":7}"#).is_err());
    }

    #[test]
    fn output_omits_absent_fields_but_keeps_children() {
        let json = serde_json::to_string(&TopicData::titled("solo")).unwrap();
        assert_eq!(json, r#"{"title":"solo","children":[]}"#);
    }

    #[test]
    fn missing_title_degrades_to_empty_text() {
        let data = parse_mindmap(r#"{"children":[]}"#).unwrap();
        assert_eq!(data.title, "");
    }
}
