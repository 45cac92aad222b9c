use super::*;
use crate::defs::{self, Defs};
use crate::event::Stamp;
use crate::tree::TopicItem;

/// Lays out one topic's own furniture.
///
/// The order matters: labels and the icon row widen the box first, then the
/// image, and only then are the right-aligned icons placed and the title
/// centred on the final width.
pub(crate) fn layout_item(
    item: &TopicItem,
    image_href: Option<&str>,
    fold: Option<FoldGlyph>,
    left: bool,
    env: &LayoutEnv<'_>,
) -> ItemLayout {
    let params = &env.params;
    let pad_x = params.padding_x;
    let pad_y = params.padding_y;
    let sub_x = params.sub_padding_x;
    let sub_y = params.sub_padding_y;

    let text_size = env.measure.measure(&item.title, params.font_size);
    let mut rect_width = text_size.width + pad_x * 2.0;
    let rect_height = text_size.height + pad_y * 2.0;
    let under_top = rect_height + sub_y;
    let mut under_width = 0.0;
    let mut bbox = Bounds::default();

    let labels = (!item.labels.is_empty()).then(|| {
        let mut offset_x = sub_x;
        let mut chips = Vec::with_capacity(item.labels.len());
        let mut chip_height = 0.0;
        for (index, text) in item.labels.iter().enumerate() {
            let size = env.measure.measure(text, params.label_font_size);
            if index == 0 {
                chip_height = size.height + sub_y * 2.0;
            }
            let visible = index < params.max_labels_preview;
            chips.push(LabelChip {
                text: text.clone(),
                x: offset_x,
                width: size.width,
                visible,
            });
            if visible {
                offset_x += size.width + sub_x;
            }
        }
        let more_x = (item.labels.len() > params.max_labels_preview).then(|| {
            let x = offset_x;
            offset_x += defs::MORE_SIZE.width + sub_x;
            x
        });
        under_width += offset_x;
        LabelsLayout {
            origin: Point::new(0.0, under_top),
            chips,
            chip_y: sub_y,
            background: Size::new(offset_x, chip_height),
            more_x,
        }
    });

    // Right-aligned strip, in placement order.
    let mut strip: Vec<(StripSlot, f32)> = Vec::new();
    if item.href.is_some() {
        under_width += defs::LINK_SIZE.width + sub_x;
        strip.push((StripSlot::Link, defs::LINK_SIZE.width));
    }
    if item.notes.is_some() {
        under_width += defs::NOTES_SIZE.width + sub_x;
        strip.push((StripSlot::Notes, defs::NOTES_SIZE.width));
    }
    let mut marker_icons = Vec::with_capacity(item.markers.len());
    if !item.markers.is_empty() {
        let mut offset_x = 0.0;
        for key in &item.markers {
            if offset_x != 0.0 {
                offset_x += sub_x;
            }
            marker_icons.push((key.clone(), offset_x));
            offset_x += env.defs.size_of(key).width;
        }
        under_width += offset_x + sub_x;
        strip.push((StripSlot::Markers, offset_x));
    }
    if !strip.is_empty() {
        under_width += sub_x;
    }
    if under_width > rect_width {
        rect_width = under_width;
    }

    let image = image_href.and_then(|_| item.image.as_ref()).map(|image| {
        let width = image.width.unwrap_or(0.0).max(0.0);
        let height = image.height.unwrap_or(0.0).max(0.0);
        let mut left = 0.0;
        if width > rect_width {
            rect_width = width;
        } else {
            left = (rect_width - width) / 2.0;
        }
        Rect::new(left, -(height + sub_y), width, height)
    });

    let mut link = None;
    let mut notes = None;
    let mut markers = None;
    let mut offset_x = rect_width - sub_x;
    for (slot, width) in strip {
        offset_x -= width;
        let origin = Point::new(offset_x, under_top);
        match slot {
            StripSlot::Link => {
                link = Some(origin);
                bbox.add(Rect::new(origin.x, origin.y, width, defs::LINK_SIZE.height));
            }
            StripSlot::Notes => {
                notes = Some(origin);
                bbox.add(Rect::new(origin.x, origin.y, width, defs::NOTES_SIZE.height));
            }
            StripSlot::Markers => {
                let height = item
                    .markers
                    .iter()
                    .map(|key| env.defs.size_of(key).height)
                    .fold(0.0, f32::max);
                bbox.add(Rect::new(origin.x, origin.y, width, height));
                markers = Some(MarkersLayout {
                    origin,
                    icons: std::mem::take(&mut marker_icons),
                    width,
                });
            }
        }
        offset_x -= sub_x;
    }

    let title_box = Size::new(rect_width, rect_height);
    bbox.add(Rect::new(0.0, 0.0, rect_width, rect_height));
    if let Some(image) = image {
        bbox.add(image);
    }
    if let Some(labels) = &labels {
        bbox.add(Rect::new(
            labels.origin.x,
            labels.origin.y,
            labels.background.width,
            labels.background.height,
        ));
    }
    let fold_icon = fold.map(|glyph| {
        let anchor = Point::new(if left { 0.0 } else { rect_width }, rect_height / 2.0);
        let r = defs::FOLD_GLYPH_RADIUS;
        bbox.add(Rect::new(anchor.x - r, anchor.y - r, r * 2.0, r * 2.0));
        (anchor, glyph)
    });

    ItemLayout {
        title_box,
        text_pos: Point::new((rect_width - text_size.width) / 2.0, pad_y),
        text_size,
        image,
        labels,
        link,
        notes,
        markers,
        fold_icon,
        bbox: bbox.or_empty(),
    }
}

#[derive(Debug, Clone, Copy)]
enum StripSlot {
    Link,
    Notes,
    Markers,
}

/// Pieces of an item in hit-test priority order, with their local rects.
pub(crate) fn item_parts(item: &ItemLayout, icons: &Defs) -> Vec<(Stamp, Rect)> {
    let mut parts = Vec::new();
    if let Some((anchor, _)) = item.fold_icon {
        let r = defs::FOLD_GLYPH_RADIUS;
        parts.push((Stamp::FoldIcon, Rect::new(anchor.x - r, anchor.y - r, r * 2.0, r * 2.0)));
    }
    if let Some(origin) = item.link {
        let size = defs::LINK_SIZE;
        parts.push((Stamp::Link, Rect::new(origin.x, origin.y, size.width, size.height)));
    }
    if let Some(origin) = item.notes {
        let size = defs::NOTES_SIZE;
        parts.push((Stamp::Notes, Rect::new(origin.x, origin.y, size.width, size.height)));
    }
    if let Some(markers) = &item.markers {
        let height = markers
            .icons
            .iter()
            .map(|(key, _)| icons.size_of(key).height)
            .fold(0.0, f32::max);
        parts.push((
            Stamp::Markers,
            Rect::new(markers.origin.x, markers.origin.y, markers.width, height),
        ));
    }
    if let Some(labels) = &item.labels {
        if let Some(more_x) = labels.more_x {
            let size = defs::MORE_SIZE;
            parts.push((
                Stamp::LabelsMore,
                Rect::new(
                    labels.origin.x + more_x,
                    labels.origin.y + labels.chip_y,
                    size.width,
                    size.height,
                ),
            ));
        }
        parts.push((
            Stamp::Labels,
            Rect::new(
                labels.origin.x,
                labels.origin.y,
                labels.background.width,
                labels.background.height,
            ),
        ));
    }
    if let Some(image) = item.image {
        parts.push((Stamp::Image, image));
    }
    parts.push((
        Stamp::TopicTitle,
        Rect::new(0.0, 0.0, item.title_box.width, item.title_box.height),
    ));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutParams;
    use crate::ir::ImageData;

    fn fixed(text: &str, size: f32) -> TextSize {
        TextSize {
            width: text.chars().count() as f32 * 10.0,
            height: size,
        }
    }

    fn env<'a>(defs: &'a Defs, measure: &'a dyn TextMeasure) -> LayoutEnv<'a> {
        LayoutEnv {
            params: LayoutParams::default(),
            measure,
            defs,
            fold_level: 0,
        }
    }

    #[test]
    fn plain_title_is_padded_and_centred() {
        let defs = Defs::standard();
        let env = env(&defs, &fixed);
        let item = TopicItem {
            title: "abcd".into(),
            ..Default::default()
        };
        let layout = layout_item(&item, None, None, false, &env);
        assert_eq!(layout.title_box, Size::new(60.0, 36.0));
        assert_eq!(layout.text_pos, Point::new(10.0, 10.0));
        assert_eq!(layout.bbox, Rect::new(0.0, 0.0, 60.0, 36.0));
    }

    #[test]
    fn icon_strip_widens_box_and_is_right_aligned() {
        let defs = Defs::standard();
        let env = env(&defs, &fixed);
        let item = TopicItem {
            title: "a".into(),
            href: Some("https://example.com".into()),
            notes: Some("n".into()),
            ..Default::default()
        };
        let layout = layout_item(&item, None, None, false, &env);
        // link 20 + 6, notes 15 + 6, trailing 6
        assert_eq!(layout.title_box.width, 53.0);
        assert_eq!(layout.link, Some(Point::new(27.0, 42.0)));
        assert_eq!(layout.notes, Some(Point::new(6.0, 42.0)));
        // title text centred on the widened box
        assert_eq!(layout.text_pos.x, (53.0 - 10.0) / 2.0);
    }

    #[test]
    fn labels_beyond_preview_collapse_into_more_icon() {
        let defs = Defs::standard();
        let measure = fixed;
        let mut env = env(&defs, &measure);
        env.params.max_labels_preview = 2;
        let item = TopicItem {
            title: "t".into(),
            labels: vec!["aa".into(), "b".into(), "ccc".into()],
            ..Default::default()
        };
        let layout = layout_item(&item, None, None, false, &env);
        let labels = layout.labels.expect("labels laid out");
        let visible: Vec<_> = labels.chips.iter().map(|chip| chip.visible).collect();
        assert_eq!(visible, vec![true, true, false]);
        assert_eq!(labels.chips[1].x, 6.0 + 20.0 + 6.0);
        assert_eq!(labels.more_x, Some(6.0 + 20.0 + 6.0 + 10.0 + 6.0));
        assert_eq!(labels.background.width, 48.0 + 9.0 + 6.0);
        assert_eq!(labels.background.height, 12.0 + 12.0);
    }

    #[test]
    fn wide_image_widens_box_narrow_image_is_centred() {
        let defs = Defs::standard();
        let env = env(&defs, &fixed);
        let mut item = TopicItem {
            title: "abcd".into(),
            image: Some(ImageData {
                src: "a.png".into(),
                width: Some(100.0),
                height: Some(40.0),
            }),
            ..Default::default()
        };
        let wide = layout_item(&item, Some("a.png"), None, false, &env);
        assert_eq!(wide.title_box.width, 100.0);
        assert_eq!(wide.image, Some(Rect::new(0.0, -46.0, 100.0, 40.0)));
        assert_eq!(wide.bbox.y, -46.0);

        item.image.as_mut().unwrap().width = Some(20.0);
        let narrow = layout_item(&item, Some("a.png"), None, false, &env);
        assert_eq!(narrow.image.unwrap().x, 20.0);

        let unresolved = layout_item(&item, None, None, false, &env);
        assert!(unresolved.image.is_none());
    }

    #[test]
    fn fold_icon_sits_on_the_connecting_edge() {
        let defs = Defs::standard();
        let env = env(&defs, &fixed);
        let item = TopicItem {
            title: "ab".into(),
            ..Default::default()
        };
        let right = layout_item(&item, None, Some(FoldGlyph::Minus), false, &env);
        assert_eq!(right.fold_icon, Some((Point::new(40.0, 18.0), FoldGlyph::Minus)));
        let left = layout_item(&item, None, Some(FoldGlyph::Plus), true, &env);
        assert_eq!(left.fold_icon, Some((Point::new(0.0, 18.0), FoldGlyph::Plus)));
        assert_eq!(left.bbox.x, -5.0);
    }
}
