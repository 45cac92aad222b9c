use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub label_font_size: f32,
    pub background: String,
    pub root_fill: String,
    pub root_text_color: String,
    pub topic_fill: String,
    pub topic_border: String,
    pub text_color: String,
    pub line_color: String,
    pub line_width: f32,
    pub focus_color: String,
    pub label_fill: String,
    pub label_text_color: String,
    pub drag_box_fill: String,
    pub drag_line_color: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"Microsoft YaHei\", \"PingFang SC\", arial, sans-serif".to_string(),
            font_size: 16.0,
            label_font_size: 12.0,
            background: "#FFFFFF".to_string(),
            root_fill: "#2F6FDE".to_string(),
            root_text_color: "#FFFFFF".to_string(),
            topic_fill: "#EEF3FC".to_string(),
            topic_border: "#7EA2E8".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7EA2E8".to_string(),
            line_width: 1.5,
            focus_color: "#F5A623".to_string(),
            label_fill: "#FFF4D6".to_string(),
            label_text_color: "#6B5514".to_string(),
            drag_box_fill: "#FFFFFF".to_string(),
            drag_line_color: "#F5A623".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 15.0,
            label_font_size: 12.0,
            background: "#1E2128".to_string(),
            root_fill: "#4C8DFF".to_string(),
            root_text_color: "#0E1116".to_string(),
            topic_fill: "#2A2F3A".to_string(),
            topic_border: "#4C5568".to_string(),
            text_color: "#E6E9EF".to_string(),
            line_color: "#6D7A92".to_string(),
            line_width: 1.5,
            focus_color: "#FFC857".to_string(),
            label_fill: "#3A3424".to_string(),
            label_text_color: "#F2DFA7".to_string(),
            drag_box_fill: "#2A2F3A".to_string(),
            drag_line_color: "#FFC857".to_string(),
        }
    }

    /// Stylesheet for the class names the renderer emits. Font sizes are
    /// written on the text elements, since layout measured with them.
    pub fn stylesheet(&self) -> String {
        format!(
            ".mind-text-basic{{font-family:{font};fill:{text};}}\
             .mind-topic{{fill:{fill};stroke:{border};stroke-width:1;}}\
             .mind-topic-level0 .mind-topic{{fill:{root_fill};stroke:{root_fill};}}\
             .mind-topic-level0 .mind-text{{fill:{root_text};}}\
             .mind-topic-focus .mind-topic{{stroke:{focus};stroke-width:2.5;}}\
             .mind-line{{fill:none;stroke:{line};stroke-width:{line_width};}}\
             .mind-topic-label-background{{fill:{label_fill};}}\
             .mind-topic-labels .mind-text{{fill:{label_text};}}\
             .mind-topic-drag-box{{fill:{drag_fill};stroke:{focus};}}\
             .mind-topic-drag-line{{fill:none;stroke:{drag_line};stroke-dasharray:4 3;}}",
            font = self.font_family,
            text = self.text_color,
            fill = self.topic_fill,
            border = self.topic_border,
            root_fill = self.root_fill,
            root_text = self.root_text_color,
            focus = self.focus_color,
            line = self.line_color,
            line_width = self.line_width,
            label_fill = self.label_fill,
            label_text = self.label_text_color,
            drag_fill = self.drag_box_fill,
            drag_line = self.drag_line_color,
        )
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
