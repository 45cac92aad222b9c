use crate::config::{ConfigValue, LayoutParams, RenderConfig};
use crate::defs::{ICON_LINK, ICON_MINUS, ICON_MORE, ICON_NOTES, ICON_PLUS};
use crate::drag::{CLASS_DRAG_BOX, CLASS_DRAG_LINE, drag_preview};
use crate::event::{ATTR_EVENT_STAMP, Stamp};
use crate::ir::parse_mindmap;
use crate::layout::{FoldGlyph, ItemLayout, PlacedTopic, fmt_num};
use crate::surface::{FixedContainer, MindMap};
use crate::theme::Theme;
use crate::tree::TopicId;
use anyhow::Result;
use indexmap::IndexMap;
use std::path::Path;
use std::rc::Rc;

pub const CLASS_TOPIC_BOX: &str = "mind-topic-box";
pub const CLASS_TOPIC_FOCUS: &str = "mind-topic-focus";

/// Share of the font size above the baseline.
const ASCENT: f32 = 0.8;

/// Everything needed to turn mind-map JSON into a picture in one call.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub theme: Theme,
    pub configs: IndexMap<String, ConfigValue>,
    pub width: f32,
    pub height: f32,
    pub fold_level: i32,
    pub theme_class: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let render = RenderConfig::default();
        Self {
            theme: Theme::classic(),
            configs: IndexMap::new(),
            width: render.width,
            height: render.height,
            fold_level: 0,
            theme_class: None,
        }
    }
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::default()
    }

    pub fn dark() -> Self {
        Self {
            theme: Theme::dark(),
            ..Self::default()
        }
    }
}

/// Parses `input`, shows it on a fixed-size surface and renders it.
pub fn render_with_options(input: &str, options: RenderOptions) -> Result<String> {
    let data = parse_mindmap(input)?;
    let mut map = MindMap::new(Rc::new(FixedContainer::new(options.width, options.height)));
    map.set_configs(options.configs.iter().map(|(key, value)| (key.as_str(), Some(*value))));
    map.set_theme(options.theme_class.as_deref());
    map.show(&data);
    if options.fold_level > 0 {
        map.fold(options.fold_level);
        map.to_center(None);
    }
    let svg = render_svg(&map, &options.theme);
    map.release();
    Ok(svg)
}

/// Projects the surface to SVG text: the current viewport, the icon
/// library, every displayed topic and the drag preview if one is active.
pub fn render_svg(map: &MindMap, theme: &Theme) -> String {
    let size = map.container_size();
    let zone = map.zone();
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{}\" height=\"{}\" viewBox=\"{}\">",
        fmt_num(size.width),
        fmt_num(size.height),
        map.view_box()
    ));
    svg.push_str(&format!("<style>{}</style>", theme.stylesheet()));
    svg.push_str(&format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
        fmt_num(zone.x),
        fmt_num(zone.y),
        fmt_num(zone.width),
        fmt_num(zone.height),
        theme.background
    ));

    svg.push_str("<defs>");
    for icon in map.defs().icons() {
        svg.push_str(&icon.markup);
    }
    svg.push_str("</defs>");

    svg.push_str(&format!("<g class=\"{}\">", escape_xml(&map.content_class())));
    let topics: Vec<(TopicId, &PlacedTopic)> = map
        .topics()
        .filter(|id| map.is_displayed(*id))
        .filter_map(|id| map.layout().get(id).map(|placed| (id, placed)))
        .collect();

    svg.push_str("<g class=\"mind-lines\">");
    for (id, placed) in &topics {
        if !placed.layout.children_shown {
            continue;
        }
        let x = placed.origin.x + placed.layout.children_offset.x;
        let y = placed.origin.y + placed.layout.children_offset.y;
        for path in &placed.layout.paths {
            if !map.is_displayed(path.child) || map.parent(path.child) != Some(*id) {
                continue;
            }
            svg.push_str(&format!(
                "<path class=\"mind-line\" transform=\"translate({},{})\" d=\"{}\"/>",
                fmt_num(x),
                fmt_num(y),
                path.d
            ));
        }
    }
    svg.push_str("</g>");

    let params = map.layout_params();
    for (id, placed) in &topics {
        let Some(node) = map.tree().get(*id) else {
            continue;
        };
        let mut class = format!("{CLASS_TOPIC_BOX} mind-topic-level{}", node.level);
        if map.is_in_focus(*id) {
            class.push(' ');
            class.push_str(CLASS_TOPIC_FOCUS);
        }
        svg.push_str(&format!(
            "<g class=\"{class}\" data-mind-id=\"{}\" transform=\"translate({},{})\">",
            escape_xml(&node.id),
            fmt_num(placed.origin.x),
            fmt_num(placed.origin.y)
        ));
        svg.push_str(&item_svg(
            &placed.layout.item,
            &node.item.title,
            node.item.image_href.as_deref(),
            &params,
        ));
        svg.push_str("</g>");
    }

    if let Some(preview) = drag_preview(map) {
        if let Some((from, to)) = preview.line {
            svg.push_str(&format!(
                "<path class=\"{CLASS_DRAG_LINE}\" d=\"M{} {}L{} {}\"/>",
                fmt_num(from.x),
                fmt_num(from.y),
                fmt_num(to.x),
                fmt_num(to.y)
            ));
        }
        let rect = preview.rect;
        svg.push_str(&format!(
            "<g transform=\"translate({},{})\"><rect class=\"{CLASS_DRAG_BOX}\" width=\"{}\" height=\"{}\" rx=\"{r}\" ry=\"{r}\"/>",
            fmt_num(rect.x),
            fmt_num(rect.y),
            fmt_num(rect.width),
            fmt_num(rect.height),
            r = fmt_num(params.rect_radius)
        ));
        svg.push_str(&format!(
            "<text class=\"mind-text mind-text-basic\" x=\"{}\" y=\"{}\" font-size=\"{}\" text-anchor=\"middle\">{}</text></g>",
            fmt_num(rect.width / 2.0),
            fmt_num(rect.height / 2.0 + params.font_size * (ASCENT - 0.5)),
            fmt_num(params.font_size),
            escape_xml(&preview.title)
        ));
    }

    svg.push_str("</g></svg>");
    svg
}

fn stamp_attr(stamp: Stamp) -> String {
    format!("{ATTR_EVENT_STAMP}=\"{}\"", stamp.as_str())
}

fn use_icon(id: &str, stamp: Option<Stamp>, x: f32, y: f32) -> String {
    let stamp = stamp.map(|stamp| format!(" {}", stamp_attr(stamp))).unwrap_or_default();
    format!(
        "<use href=\"#{id}\" xlink:href=\"#{id}\"{stamp} x=\"{}\" y=\"{}\"/>",
        fmt_num(x),
        fmt_num(y)
    )
}

fn item_svg(item: &ItemLayout, title: &str, image_href: Option<&str>, params: &LayoutParams) -> String {
    let (radius, font_size, label_font_size) = (params.rect_radius, params.font_size, params.label_font_size);
    let mut svg = String::new();

    if let (Some(rect), Some(href)) = (item.image, image_href) {
        svg.push_str(&format!(
            "<image {} href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"/>",
            stamp_attr(Stamp::Image),
            escape_xml(href),
            fmt_num(rect.x),
            fmt_num(rect.y),
            fmt_num(rect.width),
            fmt_num(rect.height)
        ));
    }

    svg.push_str(&format!(
        "<rect class=\"mind-topic\" {} width=\"{}\" height=\"{}\" rx=\"{r}\" ry=\"{r}\"/>",
        stamp_attr(Stamp::TopicTitle),
        fmt_num(item.title_box.width),
        fmt_num(item.title_box.height),
        r = fmt_num(radius)
    ));
    svg.push_str(&format!(
        "<text class=\"mind-text mind-text-basic\" {} x=\"{}\" y=\"{}\" font-size=\"{}\">{}</text>",
        stamp_attr(Stamp::TopicTitle),
        fmt_num(item.text_pos.x),
        fmt_num(item.text_pos.y + font_size * ASCENT),
        fmt_num(font_size),
        escape_xml(title)
    ));

    if let Some(layout) = &item.labels {
        svg.push_str(&format!(
            "<g class=\"mind-topic-labels\" transform=\"translate({},{})\">",
            fmt_num(layout.origin.x),
            fmt_num(layout.origin.y)
        ));
        svg.push_str(&format!(
            "<rect class=\"mind-topic-label-background\" {} width=\"{}\" height=\"{}\" rx=\"3\" ry=\"3\"/>",
            stamp_attr(Stamp::Labels),
            fmt_num(layout.background.width),
            fmt_num(layout.background.height)
        ));
        for chip in layout.chips.iter().filter(|chip| chip.visible) {
            svg.push_str(&format!(
                "<text class=\"mind-text mind-text-basic\" {} x=\"{}\" y=\"{}\" font-size=\"{}\">{}</text>",
                stamp_attr(Stamp::Labels),
                fmt_num(chip.x),
                fmt_num(layout.chip_y + label_font_size * ASCENT),
                fmt_num(label_font_size),
                escape_xml(&chip.text)
            ));
        }
        if let Some(more_x) = layout.more_x {
            svg.push_str(&use_icon(ICON_MORE, Some(Stamp::LabelsMore), more_x, layout.chip_y));
        }
        svg.push_str("</g>");
    }

    if let Some(origin) = item.link {
        svg.push_str(&use_icon(ICON_LINK, Some(Stamp::Link), origin.x, origin.y));
    }
    if let Some(origin) = item.notes {
        svg.push_str(&use_icon(ICON_NOTES, Some(Stamp::Notes), origin.x, origin.y));
    }
    if let Some(layout) = &item.markers {
        svg.push_str(&format!(
            "<g class=\"mind-topic-markers\" {} transform=\"translate({},{})\">",
            stamp_attr(Stamp::Markers),
            fmt_num(layout.origin.x),
            fmt_num(layout.origin.y)
        ));
        for (key, x) in &layout.icons {
            svg.push_str(&use_icon(key, None, *x, 0.0));
        }
        svg.push_str("</g>");
    }
    if let Some((anchor, glyph)) = item.fold_icon {
        let icon = match glyph {
            FoldGlyph::Minus => ICON_MINUS,
            FoldGlyph::Plus => ICON_PLUS,
        };
        svg.push_str(&use_icon(icon, Some(Stamp::FoldIcon), anchor.x, anchor.y));
    }
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
        .ok_or_else(|| anyhow::anyhow!("invalid output size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::TopicData;

    fn shown(data: &TopicData) -> MindMap {
        let mut map = MindMap::new(Rc::new(FixedContainer::new(800.0, 600.0)));
        map.show(data);
        map
    }

    #[test]
    fn render_svg_basic() {
        let map = shown(&TopicData::titled("Plan <Q3>").with_children(vec![TopicData::titled("Ship")]));
        let svg = render_svg(&map, &Theme::classic());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&format!("viewBox=\"{}\"", map.view_box())));
        assert!(svg.contains("Plan &lt;Q3&gt;"));
        assert!(svg.contains("mind-event-stamp=\"topic-item-title\""));
        assert!(svg.contains("mind-topic-level1"));
        assert_eq!(svg.matches("class=\"mind-line\"").count(), 1);
        assert!(svg.contains("id=\"mind-icon-plus\""));
    }

    #[test]
    fn hidden_topics_and_their_connectors_are_skipped() {
        let mut map = shown(
            &TopicData::titled("root")
                .with_children(vec![TopicData::titled("kept"), TopicData::titled("secret")]),
        );
        let secret = map.children(map.root().unwrap())[1];
        map.hide_in_place(secret, false).unwrap();
        let svg = render_svg(&map, &Theme::classic());
        assert!(svg.contains("kept"));
        assert!(!svg.contains(">secret<"));
        assert_eq!(svg.matches("class=\"mind-line\"").count(), 1);
    }

    #[test]
    fn focus_and_theme_classes_are_emitted() {
        let mut map = shown(&TopicData::titled("root").with_children(vec![TopicData::titled("a")]));
        let a = map.children(map.root().unwrap())[0];
        map.focus(a, true).unwrap();
        map.set_theme(Some("dark-mode"));
        let svg = render_svg(&map, &Theme::dark());
        assert!(svg.contains(CLASS_TOPIC_FOCUS));
        assert!(svg.contains("class=\"mind-main-basic dark-mode\""));
    }

    #[test]
    fn render_with_options_applies_fold_level() {
        let input = r#"{"title":"root","children":[{"title":"a","children":[{"title":"deep"}]}]}"#;
        let svg = render_with_options(input, RenderOptions::default()).unwrap();
        assert!(svg.contains(">deep<"));
        let folded = render_with_options(
            input,
            RenderOptions {
                fold_level: 1,
                ..RenderOptions::default()
            },
        )
        .unwrap();
        assert!(!folded.contains(">deep<"));
        assert!(folded.contains("href=\"#mind-icon-plus\""));
    }
}
