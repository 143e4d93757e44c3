use serde_json::Value;

use super::{LayoutRequest, SINGLE_LAYOUT, Template, TemplateFields, payload};
use crate::engine::options::{ALLOW_REFIT, MAX_WIDTH, RenderOptions};
use crate::engine::theme::ThemeSelector;

struct Palette {
    bg: &'static str,
    text: &'static str,
    footer: &'static str,
}

const DAY: Palette = Palette {
    bg: "#ffffff",
    text: "#000000",
    footer: "#666666",
};

const NIGHT: Palette = Palette {
    bg: "#1a1a1a",
    text: "#e0e0e0",
    footer: "#999999",
};

pub(super) fn default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 600).with(ALLOW_REFIT, true)
}

/// 单布局；夜间模式只影响配色
pub(super) fn build(tpl: &Template, theme: &ThemeSelector, fields: &TemplateFields) -> LayoutRequest {
    let palette = if tpl.use_night(theme, fields) { &NIGHT } else { &DAY };
    LayoutRequest {
        layout: SINGLE_LAYOUT,
        payload: payload([
            ("bg_color", Value::from(palette.bg)),
            ("text_color", Value::from(palette.text)),
            ("footer_color", Value::from(palette.footer)),
            ("title", Value::from(fields.title.as_str())),
            ("content", Value::from(fields.content.as_str())),
            ("footer", Value::from(fields.footer.as_str())),
        ]),
    }
}
