use serde_json::Value;

use super::{LayoutRequest, SINGLE_LAYOUT, Template, TemplateFields, payload};
use crate::engine::options::{ALLOW_REFIT, MAX_WIDTH, RenderOptions};

const BACKGROUND: &str = "background.png";
const BANNERS: [&str; 4] = [
    "banner_01.png",
    "banner_02.png",
    "banner_03.png",
    "banner_04.png",
];

pub(super) fn default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 800).with(ALLOW_REFIT, true)
}

/// 背景图与四角装饰均为可选资源，缺失时对应占位符为空字符串
pub(super) fn build(tpl: &Template, fields: &TemplateFields) -> LayoutRequest {
    let [b1, b2, b3, b4] = BANNERS.map(|name| tpl.resource(name));
    LayoutRequest {
        layout: SINGLE_LAYOUT,
        payload: payload([
            ("bg_image", tpl.resource(BACKGROUND)),
            ("banner_01", b1),
            ("banner_02", b2),
            ("banner_03", b3),
            ("banner_04", b4),
            ("title", Value::from(fields.title.as_str())),
            ("content", Value::from(fields.content.as_str())),
            ("footer", Value::from(fields.footer.as_str())),
        ]),
    }
}
