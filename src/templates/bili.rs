use serde_json::Value;

use super::{LayoutRequest, Template, TemplateFields, day_or_night, payload};
use crate::engine::options::{ALLOW_REFIT, DEVICE_HEIGHT, MAX_WIDTH, RenderOptions};
use crate::engine::theme::ThemeSelector;

pub(crate) const LIGHT_BACKGROUND: &str = "bili_light.jpg";
pub(crate) const DARK_BACKGROUND: &str = "bili_dark.jpg";

/// 壁纸比例固定（540x960），不允许按内容自适应
pub(super) fn default_options() -> RenderOptions {
    RenderOptions::new()
        .with(MAX_WIDTH, 540)
        .with(DEVICE_HEIGHT, 960)
        .with(ALLOW_REFIT, false)
}

/// 昼夜同时切换布局与背景图；footer 通常是来源标注
pub(super) fn build(tpl: &Template, theme: &ThemeSelector, fields: &TemplateFields) -> LayoutRequest {
    let night = tpl.use_night(theme, fields);
    let background = if night { DARK_BACKGROUND } else { LIGHT_BACKGROUND };
    LayoutRequest {
        layout: day_or_night(night),
        payload: payload([
            ("bg_image", tpl.resource(background)),
            ("content", Value::from(fields.content.as_str())),
            ("footer", Value::from(fields.footer.as_str())),
        ]),
    }
}
