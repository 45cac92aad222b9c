//! Built-in icon templates and marker value translators.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::rc::Rc;

use crate::layout::Size;

pub const ICON_PLUS: &str = "mind-icon-plus";
pub const ICON_MINUS: &str = "mind-icon-minus";
pub const ICON_MORE: &str = "mind-icon-more";
pub const ICON_NOTES: &str = "mind-icon-notes";
pub const ICON_LINK: &str = "mind-icon-link";

pub const LINK_SIZE: Size = Size::new(20.0, 20.0);
pub const NOTES_SIZE: Size = Size::new(15.0, 19.0);
pub const MORE_SIZE: Size = Size::new(9.0, 9.0);
pub const MARKER_SIZE: Size = Size::new(20.0, 20.0);
/// Fold glyphs are drawn centred on their anchor.
pub const FOLD_GLYPH_RADIUS: f32 = 5.0;

const TASK_STATES: [&str; 10] = [
    "start", "oct", "quarter", "3oct", "half", "5oct", "3quar", "7oct", "done", "unknown",
];

static ICON_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)-(.+)$").expect("valid icon key pattern"));

/// Converts a marker value between its data form and the suffix of the icon
/// key it renders with (`priority-3`, `task-4`).
pub trait MarkerTranslator {
    fn encode(&self, value: &Value) -> String;
    fn decode(&self, key: &str) -> Value;
}

/// Priorities are integers clamped to 1..=9 in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityTranslator;

impl PriorityTranslator {
    fn clamp(value: Option<i64>) -> i64 {
        match value {
            Some(v) if v >= 1 => v.min(9),
            _ => 1,
        }
    }
}

impl MarkerTranslator for PriorityTranslator {
    fn encode(&self, value: &Value) -> String {
        Self::clamp(leading_int(value)).to_string()
    }

    fn decode(&self, key: &str) -> Value {
        Value::from(Self::clamp(parse_leading_int(key)))
    }
}

/// Task progress is stored by state name and rendered by state index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskTranslator;

impl MarkerTranslator for TaskTranslator {
    fn encode(&self, value: &Value) -> String {
        let index = value
            .as_str()
            .and_then(|name| TASK_STATES.iter().position(|state| *state == name))
            .unwrap_or(9);
        index.to_string()
    }

    fn decode(&self, key: &str) -> Value {
        let name = parse_leading_int(key)
            .filter(|index| (0..=9).contains(index))
            .map(|index| TASK_STATES[index as usize])
            .unwrap_or(TASK_STATES[9]);
        Value::from(name)
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(i, ch)| !(ch.is_ascii_digit() || (*i == 0 && (*ch == '-' || *ch == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

fn leading_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Marker translators keyed by marker type.
#[derive(Clone)]
pub struct Translators {
    entries: IndexMap<String, Rc<dyn MarkerTranslator>>,
}

impl std::fmt::Debug for Translators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl Default for Translators {
    fn default() -> Self {
        let mut entries: IndexMap<String, Rc<dyn MarkerTranslator>> = IndexMap::new();
        entries.insert("priority".to_string(), Rc::new(PriorityTranslator));
        entries.insert("task".to_string(), Rc::new(TaskTranslator));
        Self { entries }
    }
}

impl Translators {
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Rc<dyn MarkerTranslator>> {
        self.entries.get(kind)
    }

    /// Installs `translator` for `kind`, returning the one it replaces.
    pub fn insert(
        &mut self,
        kind: impl Into<String>,
        translator: Rc<dyn MarkerTranslator>,
    ) -> Option<Rc<dyn MarkerTranslator>> {
        self.entries.insert(kind.into(), translator)
    }

    pub fn remove(&mut self, kind: &str) -> Option<Rc<dyn MarkerTranslator>> {
        self.entries.shift_remove(kind)
    }

    /// Icon key for a marker value, e.g. `priority-3`.
    pub fn encode(&self, kind: &str, value: &Value) -> String {
        let suffix = match self.get(kind) {
            Some(translator) => translator.encode(value),
            None => match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };
        format!("{kind}-{suffix}")
    }

    /// Splits an icon key back into `(kind, decoded value)`.
    pub fn decode(&self, icon_key: &str) -> Option<(String, Value)> {
        let caps = ICON_KEY.captures(icon_key)?;
        let kind = caps.get(1)?.as_str();
        let suffix = caps.get(2)?.as_str();
        let value = match self.get(kind) {
            Some(translator) => translator.decode(suffix),
            None => Value::from(suffix),
        };
        Some((kind.to_string(), value))
    }
}

/// One predefined vector template.
#[derive(Debug, Clone, PartialEq)]
pub struct IconDef {
    pub id: String,
    pub size: Size,
    /// SVG markup of the template element, already carrying `id`.
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefEntry {
    pub kind: String,
    pub value: Value,
    pub icon: IconDef,
}

/// Icon library emitted into `<defs>`.
#[derive(Debug, Clone)]
pub struct Defs {
    icons: IndexMap<String, IconDef>,
}

impl Default for Defs {
    fn default() -> Self {
        Self::standard()
    }
}

impl Defs {
    pub fn standard() -> Self {
        let mut icons = IndexMap::new();
        let mut put = |id: String, size: Size, markup: String| {
            icons.insert(id.clone(), IconDef { id, size, markup });
        };

        const CIRCLE: &str = "M1 10A9 9 0 1 1 20 10A9 9 0 1 1 1 10";
        const FOLD_RING: &str = "M1 4A3 3 0 1 0 8 4A3 3 0 1 0 1 4M2.5 4L6.5 4";
        let fold_size = Size::new(FOLD_GLYPH_RADIUS * 2.0, FOLD_GLYPH_RADIUS * 2.0);
        put(
            ICON_PLUS.to_string(),
            fold_size,
            fold_path(ICON_PLUS, &format!("{FOLD_RING}M4.5 2L4.5 6")),
        );
        put(ICON_MINUS.to_string(), fold_size, fold_path(ICON_MINUS, FOLD_RING));
        put(
            ICON_MORE.to_string(),
            MORE_SIZE,
            format!(
                r##"<path id="{ICON_MORE}" fill="#fff" fill-opacity="0.8" stroke="#000" stroke-width="1" stroke-opacity="0.6" d="M4 1H7Q10 1 10 4V7Q10 10 7 10H4Q1 10 1 7V4 Q1 1 4 1M4 3L7 5.5L4 8"/>"##
            ),
        );
        put(
            ICON_NOTES.to_string(),
            NOTES_SIZE,
            format!(
                r##"<path id="{ICON_NOTES}" fill="#ffd" fill-opacity="0.8" stroke="#000" stroke-width="1" stroke-opacity="0.6" d="M3 1H13L18 6V20H3V1M13 1V6H18M6 4H10M6 7H10M6 10H15M6 13H15M6 16H13"/>"##
            ),
        );
        put(
            ICON_LINK.to_string(),
            LINK_SIZE,
            format!(
                r##"<g id="{ICON_LINK}"><rect width="20" height="20" rx="3" ry="3" fill="#eee" fill-opacity="0.3" stroke-width="0"/><path fill="none" stroke="#000" stroke-width="1.5" stroke-opacity="0.6" d="M9 7L11 5A2 2 0 0 1 15 9L13 11M7 9L5 11A2 2 0 0 0 9 15L11 13M7 13L13 7"/></g>"##
            ),
        );

        const PRIORITY: [(&str, &str); 9] = [
            ("#f00", "M8 7L10.5 6V16"),
            ("#f00", "M7 8C10.5 1 20 8 7 14M6 14H16"),
            ("#f0f", "M7 7C10.5 1 20 8 10 10C21 10 10.5 21 6 12"),
            ("#f0f", "M12 4Q10 10 6 13M5 13H15M13 8L11 16"),
            ("#06f", "M9 4Q9 7 8 9M7 9C18 5 16 20 6 14M9 5H14"),
            ("#06f", "M7 9C13 7 16 13 10 15C4 15 4 9 13 4"),
            ("#093", "M7 8V6Q11 7 13 6.5Q10 12 9 16"),
            ("#093", "M10 9C6 8 7 3 12 4C15 5 15 10 10 9C16 10 16 16.5 10 16C4 15 4 9 10 9"),
            ("#993", "M15 10C6 16 5 3.5 12 4.5C18 6 16 17 7 16"),
        ];
        for (index, (fill, glyph)) in PRIORITY.iter().enumerate() {
            let id = format!("priority-{}", index + 1);
            let markup = format!(
                r##"<path id="{id}" fill="{fill}" fill-opacity="0.8" stroke="#fff" stroke-width="2" stroke-opacity="0.8" d="{CIRCLE}{glyph}"/>"##
            );
            put(id, MARKER_SIZE, markup);
        }

        // Pie sweeps for the partial task states, from 1/8 to 7/8.
        const SWEEPS: [(&str, &str); 7] = [
            ("1", "16.5 4.5"),
            ("1", "19 10.5"),
            ("1", "16.5 16.5"),
            ("0", "10.5 19"),
            ("0", "4.5 16.5"),
            ("0", "2 10.5"),
            ("0", "4.5 4.5"),
        ];
        put(
            "task-0".to_string(),
            MARKER_SIZE,
            format!(
                r##"<path id="task-0" fill="#fff" fill-opacity="0.8" stroke="#093" stroke-width="1" stroke-opacity="0.8" d="{CIRCLE}M8 14V5L15 10L8 15V6"/>"##
            ),
        );
        for (index, (large_arc, end)) in SWEEPS.iter().enumerate() {
            let id = format!("task-{}", index + 1);
            let markup = format!(
                r##"<g id="{id}"><circle cx="10.5" cy="10.5" r="10" stroke="none" fill="#093" fill-opacity="0.8"/><path stroke="none" fill="#fff" fill-opacity="0.8" d="M10.5 10.5V2A8.5 8.5 180 {large_arc} 0 {end}L10.5 10.5"/></g>"##
            );
            put(id, MARKER_SIZE, markup);
        }
        put(
            "task-8".to_string(),
            MARKER_SIZE,
            format!(
                r##"<path id="task-8" fill="#093" fill-opacity="0.8" stroke="#fff" stroke-width="2" stroke-opacity="0.8" d="{CIRCLE}M15 6L10 13L6 9"/>"##
            ),
        );
        put(
            "task-9".to_string(),
            MARKER_SIZE,
            format!(
                r##"<path id="task-9" fill="#fff" fill-opacity="0.8" stroke="#093" stroke-width="1" stroke-opacity="0.8" d="{CIRCLE}M7 8A3.5 3.5 0 1 1 10.5 10.5V13M10.5 14V16M9.5 15H11.5"/>"##
            ),
        );

        Self { icons }
    }

    pub fn get(&self, id: &str) -> Option<&IconDef> {
        self.icons.get(id)
    }

    /// Rendered size of `id`; unknown marker keys fall back to the marker
    /// cell so that layout still reserves room for them.
    pub fn size_of(&self, id: &str) -> Size {
        self.get(id).map(|icon| icon.size).unwrap_or(MARKER_SIZE)
    }

    pub fn insert(&mut self, icon: IconDef) -> Option<IconDef> {
        self.icons.insert(icon.id.clone(), icon)
    }

    pub fn icons(&self) -> impl Iterator<Item = &IconDef> {
        self.icons.values()
    }

    /// Every template whose id has a `type-value` form, decoded through
    /// `translators`.
    pub fn entries<'a>(
        &'a self,
        translators: &'a Translators,
    ) -> impl Iterator<Item = DefEntry> + 'a {
        self.icons.values().filter_map(move |icon| {
            let (kind, value) = translators.decode(&icon.id)?;
            Some(DefEntry {
                kind,
                value,
                icon: icon.clone(),
            })
        })
    }
}

fn fold_path(id: &str, d: &str) -> String {
    format!(
        r##"<path id="{id}" fill="#fff" fill-opacity="0.8" stroke="#000" stroke-width="1" transform="translate(-6, -4) scale(1.25, 1.25)" d="{d}"/>"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_is_clamped_both_ways() {
        let t = Translators::default();
        assert_eq!(t.encode("priority", &json!(0)), "priority-1");
        assert_eq!(t.encode("priority", &json!(12)), "priority-9");
        assert_eq!(t.encode("priority", &json!("4")), "priority-4");
        assert_eq!(t.encode("priority", &json!("abc")), "priority-1");
        assert_eq!(t.decode("priority-7"), Some(("priority".to_string(), json!(7))));
    }

    #[test]
    fn task_states_map_by_name() {
        let t = Translators::default();
        assert_eq!(t.encode("task", &json!("half")), "task-4");
        assert_eq!(t.encode("task", &json!("bogus")), "task-9");
        assert_eq!(t.decode("task-8"), Some(("task".to_string(), json!("done"))));
        assert_eq!(t.decode("task-42"), Some(("task".to_string(), json!("unknown"))));
    }

    #[test]
    fn untranslated_markers_keep_their_text() {
        let t = Translators::default();
        assert_eq!(t.encode("flag", &json!("red")), "flag-red");
        assert_eq!(t.decode("flag-red"), Some(("flag".to_string(), json!("red"))));
    }

    #[test]
    fn entries_decode_marker_templates_only() {
        let defs = Defs::standard();
        let translators = Translators::default();
        let entries: Vec<_> = defs.entries(&translators).collect();
        assert_eq!(entries.iter().filter(|e| e.kind == "priority").count(), 9);
        assert_eq!(entries.iter().filter(|e| e.kind == "task").count(), 10);
        assert!(entries.iter().any(|e| e.kind == "task" && e.value == json!("start")));
        // `mind-icon-plus` splits as `mind`/`icon-plus` and is reported
        // undecoded, like any other dashed id.
        assert!(entries.iter().any(|e| e.kind == "mind"));
    }
}
