use serde_json::{Map, Value};

use super::{LayoutRequest, Template, TemplateFields, day_or_night, payload};
use crate::engine::options::{ALLOW_REFIT, MAX_WIDTH, RenderOptions};
use crate::engine::theme::{ColorTheme, ThemeSelector};
use crate::error::CardImgError;

/// header = 标题色，accent = 条目色，background = 条目底色
pub(crate) const PALETTES: [ColorTheme; 12] = [
    palette("orange", "#FFA94C", "#FFF4E6"),
    palette("lavender", "#8076a3", "#C2CEFE"),
    palette("mint", "#3FE6A0", "#E6F7F0"),
    palette("periwinkle", "#D1D4F5", "#F0F4FF"),
    palette("sky", "#66a9c9", "#E6FBFC"),
    palette("jade", "#68b88e", "#E6F7F0"),
    palette("cyan", "#51c4d3", "#E6FBFC"),
    palette("amber", "#f9a633", "#FFF4E6"),
    palette("rose", "#a8456b", "#ffe9f1"),
    palette("green", "#55bb8a", "#E6F7F0"),
    palette("mustard", "#d2b116", "#f0e9c9"),
    palette("violet", "#8076a3", "#F0EEF8"),
];

const fn palette(name: &'static str, color: &'static str, bg: &'static str) -> ColorTheme {
    ColorTheme {
        name,
        header: color,
        accent: color,
        background: bg,
    }
}

pub(super) fn default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 800).with(ALLOW_REFIT, true)
}

/// 条目为空时仍正常渲染（布局中不出现任何条目）
pub(super) fn build(
    tpl: &Template,
    theme: &ThemeSelector,
    fields: &TemplateFields,
) -> Result<LayoutRequest, CardImgError> {
    let night = tpl.use_night(theme, fields);
    let colors = theme.pick_palette(tpl.id(), &PALETTES)?;

    let items: Map<String, Value> = fields
        .items
        .iter()
        .map(|(title, body)| (title.clone(), Value::from(body.as_str())))
        .collect();

    Ok(LayoutRequest {
        layout: day_or_night(night),
        payload: payload([
            ("title", Value::from(fields.title.as_str())),
            ("items", Value::Object(items)),
            ("footer", Value::from(fields.footer.as_str())),
            ("header_color", Value::from(colors.header)),
            ("item_color", Value::from(colors.accent)),
            ("item_bg", Value::from(colors.background)),
        ]),
    })
}
