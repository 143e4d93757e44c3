//! 网易云音乐风格：朱砂（红底白框）与热评卡片。

use serde_json::Value;

use super::{LayoutRequest, SINGLE_LAYOUT, Template, TemplateFields, payload};
use crate::engine::options::{ALLOW_REFIT, MAX_WIDTH, RenderOptions};

const CARD_BACKGROUND: &str = "background.png";

pub(super) fn zhusha_default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 680).with(ALLOW_REFIT, true)
}

pub(super) fn card_default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 800).with(ALLOW_REFIT, false)
}

pub(super) fn build_zhusha(fields: &TemplateFields) -> LayoutRequest {
    LayoutRequest {
        layout: SINGLE_LAYOUT,
        payload: payload([
            ("title", Value::from(fields.title.as_str())),
            ("content", Value::from(fields.content.as_str())),
            ("footer", Value::from(fields.footer.as_str())),
        ]),
    }
}

/// 热评卡片不显示标题：content 为评论内容，footer 为出处
pub(super) fn build_card(tpl: &Template, fields: &TemplateFields) -> LayoutRequest {
    LayoutRequest {
        layout: SINGLE_LAYOUT,
        payload: payload([
            ("bg_image", tpl.resource(CARD_BACKGROUND)),
            ("content", Value::from(fields.content.as_str())),
            ("footer", Value::from(fields.footer.as_str())),
        ]),
    }
}
