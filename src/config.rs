use crate::theme::Theme;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in defaults for every surface configuration key.
///
/// Extensions may contribute more defaults through
/// [`Extensions::extend_defaults`](crate::extend::Extensions::extend_defaults).
pub const DEFAULT_CONFIGS: [(&str, ConfigValue); 11] = [
    ("paddingX", ConfigValue::Number(10.0)),
    ("paddingY", ConfigValue::Number(10.0)),
    ("topicMarginX", ConfigValue::Number(46.0)),
    ("topicMarginY", ConfigValue::Number(17.0)),
    ("contentMarginX", ConfigValue::Number(6.0)),
    ("contentMarginY", ConfigValue::Number(6.0)),
    ("rectRadius", ConfigValue::Number(6.0)),
    ("lineBezierCtrlSize", ConfigValue::Number(17.0)),
    ("subPaddingX", ConfigValue::Number(6.0)),
    ("subPaddingY", ConfigValue::Number(6.0)),
    ("maxLabelsPreview", ConfigValue::Number(3.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
}

impl ConfigValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ConfigValue::Number(value) if !value.is_nan() => Some(*value as f32),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            ConfigValue::Bool(value) => *value,
            ConfigValue::Number(value) => *value != 0.0 && !value.is_nan(),
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

/// Flat key/value store of surface settings, resettable per key.
#[derive(Debug, Clone, Default)]
pub struct Configs {
    defaults: IndexMap<String, ConfigValue>,
    values: IndexMap<String, ConfigValue>,
}

impl Configs {
    pub fn new(defaults: IndexMap<String, ConfigValue>) -> Self {
        Self {
            values: defaults.clone(),
            defaults,
        }
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).copied()
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(|value| value.as_f32())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|value| value.as_bool()).unwrap_or(false)
    }

    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Restores the default of `key`; keys without a default are removed.
    pub fn reset(&mut self, key: &str) {
        match self.defaults.get(key) {
            Some(default) => {
                self.values.insert(key.to_string(), *default);
            }
            None => {
                self.values.shift_remove(key);
            }
        }
    }

    /// Applies several settings at once; `None` resets the key.
    pub fn set_many<'a, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (&'a str, Option<ConfigValue>)>,
    {
        for (key, value) in items {
            match value {
                Some(value) => self.set(key, value),
                None => self.reset(key),
            }
        }
    }

    pub fn snapshot(&self) -> IndexMap<String, ConfigValue> {
        self.values.clone()
    }

    pub fn layout_params(&self) -> LayoutParams {
        let base = LayoutParams::default();
        let pick = |key: &str, fallback: f32| self.number(key).unwrap_or(fallback);
        LayoutParams {
            padding_x: pick("paddingX", base.padding_x),
            padding_y: pick("paddingY", base.padding_y),
            topic_margin_x: pick("topicMarginX", base.topic_margin_x),
            topic_margin_y: pick("topicMarginY", base.topic_margin_y),
            content_margin_x: pick("contentMarginX", base.content_margin_x),
            content_margin_y: pick("contentMarginY", base.content_margin_y),
            rect_radius: pick("rectRadius", base.rect_radius),
            line_bezier_ctrl_size: pick("lineBezierCtrlSize", base.line_bezier_ctrl_size),
            sub_padding_x: pick("subPaddingX", base.sub_padding_x),
            sub_padding_y: pick("subPaddingY", base.sub_padding_y),
            max_labels_preview: self
                .number("maxLabelsPreview")
                .map(|value| value.max(0.0) as usize)
                .unwrap_or(base.max_labels_preview),
            font_size: pick("fontSize", base.font_size),
            label_font_size: pick("labelFontSize", base.label_font_size),
        }
    }
}

pub fn default_config_map() -> IndexMap<String, ConfigValue> {
    DEFAULT_CONFIGS
        .iter()
        .map(|(key, value)| (key.to_string(), *value))
        .collect()
}

/// Typed snapshot of the numeric keys the layout engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutParams {
    pub padding_x: f32,
    pub padding_y: f32,
    pub topic_margin_x: f32,
    pub topic_margin_y: f32,
    pub content_margin_x: f32,
    pub content_margin_y: f32,
    pub rect_radius: f32,
    pub line_bezier_ctrl_size: f32,
    pub sub_padding_x: f32,
    pub sub_padding_y: f32,
    pub max_labels_preview: usize,
    pub font_size: f32,
    pub label_font_size: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            padding_x: 10.0,
            padding_y: 10.0,
            topic_margin_x: 46.0,
            topic_margin_y: 17.0,
            content_margin_x: 6.0,
            content_margin_y: 6.0,
            rect_radius: 6.0,
            line_bezier_ctrl_size: 17.0,
            sub_padding_x: 6.0,
            sub_padding_y: 6.0,
            max_labels_preview: 3,
            font_size: 16.0,
            label_font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub configs: IndexMap<String, ConfigValue>,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            configs: IndexMap::new(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    root_fill: Option<String>,
    root_text_color: Option<String>,
    topic_fill: Option<String>,
    topic_border: Option<String>,
    text_color: Option<String>,
    line_color: Option<String>,
    focus_color: Option<String>,
    label_fill: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    #[serde(default)]
    configs: IndexMap<String, ConfigValue>,
    width: Option<f32>,
    height: Option<f32>,
}

/// Loads a JSON5 config file; without a path the defaults are returned.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = json5::from_str(&contents)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "dark" => config.theme = Theme::dark(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme, keeping the default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.root_fill {
            config.theme.root_fill = v;
        }
        if let Some(v) = vars.root_text_color {
            config.theme.root_text_color = v;
        }
        if let Some(v) = vars.topic_fill {
            config.theme.topic_fill = v;
        }
        if let Some(v) = vars.topic_border {
            config.theme.topic_border = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.focus_color {
            config.theme.focus_color = v;
        }
        if let Some(v) = vars.label_fill {
            config.theme.label_fill = v;
        }
    }

    config.configs.extend(parsed.configs);
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }
    config.render.background = config.theme.background.clone();
}
