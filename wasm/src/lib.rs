use indexmap::IndexMap;
use mindsvg::config::ConfigValue;
use mindsvg::{RenderOptions, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MindRenderOptions {
    theme: Option<String>,
    theme_class: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    fold_level: Option<i32>,
    #[serde(default)]
    configs: IndexMap<String, ConfigValue>,
}

fn build_render_options(options: MindRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("dark") {
        RenderOptions::dark()
    } else {
        RenderOptions::classic()
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    if let Some(width) = options.width {
        render_options.width = width;
    }
    if let Some(height) = options.height {
        render_options.height = height;
    }
    render_options.fold_level = options.fold_level.unwrap_or(0);
    render_options.theme_class = options.theme_class;
    render_options.configs = options.configs;

    render_options
}

#[wasm_bindgen]
pub fn render_mindmap_svg(data: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<MindRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        MindRenderOptions::default()
    };

    let render_options = build_render_options(options);
    render_with_options(data, render_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
