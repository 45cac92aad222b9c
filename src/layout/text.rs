use crate::text_metrics;

use super::TextSize;

/// Measures the single-line extent of a text run.
///
/// Layout never looks at glyphs itself; hosts that render through a real
/// text engine can plug their own measurer in.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> TextSize;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f32) -> TextSize,
{
    fn measure(&self, text: &str, font_size: f32) -> TextSize {
        self(text, font_size)
    }
}

/// Deterministic measurer backed by a per-character width table.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMetrics {
    pub line_height: f32,
}

impl Default for ApproxMetrics {
    fn default() -> Self {
        Self { line_height: 1.2 }
    }
}

impl TextMeasure for ApproxMetrics {
    fn measure(&self, text: &str, font_size: f32) -> TextSize {
        TextSize {
            width: approx_text_width(text, font_size),
            height: font_size * self.line_height,
        }
    }
}

/// Measurer backed by system fonts, falling back to the width table when no
/// face matches the family.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    pub font_family: String,
    pub line_height: f32,
}

impl FontMetrics {
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            line_height: 1.2,
        }
    }
}

impl TextMeasure for FontMetrics {
    fn measure(&self, text: &str, font_size: f32) -> TextSize {
        let width = text_metrics::measure_text_width(text, font_size, &self.font_family)
            .unwrap_or_else(|| approx_text_width(text, font_size));
        TextSize {
            width,
            height: font_size * self.line_height,
        }
    }
}

const UPPER: [f32; 26] = [
    0.652, 0.648, 0.734, 0.723, 0.594, 0.575, 0.742, 0.742, 0.272, 0.557, 0.648, 0.559, 0.903,
    0.763, 0.754, 0.623, 0.755, 0.637, 0.633, 0.599, 0.746, 0.661, 0.958, 0.655, 0.646, 0.621,
];

const LOWER: [f32; 26] = [
    0.550, 0.603, 0.547, 0.609, 0.570, 0.340, 0.600, 0.600, 0.235, 0.227, 0.522, 0.239, 0.867,
    0.585, 0.574, 0.595, 0.585, 0.364, 0.523, 0.305, 0.585, 0.545, 0.811, 0.538, 0.556, 0.550,
];

const DIGITS: [f32; 10] = [
    0.613, 0.396, 0.609, 0.597, 0.614, 0.586, 0.608, 0.559, 0.611, 0.595,
];

pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        'A'..='Z' => UPPER[(ch as u8 - b'A') as usize],
        'a'..='z' => LOWER[(ch as u8 - b'a') as usize],
        '0'..='9' => DIGITS[(ch as u8 - b'0') as usize],
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        '@' | '#' | '%' | '&' => 0.946,
        // CJK and other wide scripts occupy a full em.
        c if (c as u32) >= 0x2E80 => 1.0,
        _ => 0.568,
    }
}

pub(crate) fn approx_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}
