use serde_json::Value;

use super::{LayoutRequest, Template, TemplateFields, day_or_night, payload};
use crate::engine::options::{ALLOW_REFIT, MAX_WIDTH, RenderOptions};
use crate::engine::theme::{ColorTheme, ThemeSelector};
use crate::error::CardImgError;

/// header = 表头文字色，background = 表头底色，accent = 行悬停底色
pub(crate) const PALETTES: [ColorTheme; 4] = [
    ColorTheme {
        name: "mint",
        header: "#3FE6A0",
        accent: "#f0fcf7",
        background: "#E6F7F0",
    },
    ColorTheme {
        name: "sky",
        header: "#66a9c9",
        accent: "#f0f8fb",
        background: "#E6F3F7",
    },
    ColorTheme {
        name: "amber",
        header: "#f9a633",
        accent: "#fff9f0",
        background: "#FFF4E6",
    },
    ColorTheme {
        name: "rose",
        header: "#a8456b",
        accent: "#fbf0f3",
        background: "#F7E6EA",
    },
];

pub(super) fn default_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 1000).with(ALLOW_REFIT, true)
}

/// 表头与数据缺省时归一为空序列，不视为错误
pub(super) fn build(
    tpl: &Template,
    theme: &ThemeSelector,
    fields: &TemplateFields,
) -> Result<LayoutRequest, CardImgError> {
    let night = tpl.use_night(theme, fields);
    let colors = theme.pick_palette(tpl.id(), &PALETTES)?;

    let columns: Vec<Value> = fields
        .columns
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|c| Value::from(c.as_str()))
        .collect();
    let data: Vec<Value> = fields
        .data
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|row| Value::Array(row.iter().map(|c| Value::from(c.as_str())).collect()))
        .collect();

    Ok(LayoutRequest {
        layout: day_or_night(night),
        payload: payload([
            ("title", Value::from(fields.title.as_str())),
            ("tip", Value::from(fields.tip.as_str())),
            ("columns", Value::Array(columns)),
            ("data", Value::Array(data)),
            ("footer", Value::from(fields.footer.as_str())),
            ("header_color", Value::from(colors.header)),
            ("header_bg", Value::from(colors.background)),
            ("hover_bg", Value::from(colors.accent)),
        ]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::theme::{FixedClock, FixedIndex};
    use crate::templates::TemplateKind;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    fn selector(index: usize) -> ThemeSelector {
        ThemeSelector::default()
            .with_clock(Arc::new(FixedClock(9)))
            .with_random(Arc::new(FixedIndex(index)))
    }

    #[test]
    fn absent_columns_and_data_become_empty_arrays() {
        let tpl = Template::new(TemplateKind::Table, Path::new("/unused"));
        let req = build(&tpl, &selector(0), &TemplateFields::new().title("X")).unwrap();
        assert_eq!(req.payload["columns"], json!([]));
        assert_eq!(req.payload["data"], json!([]));
        assert_eq!(req.payload["title"], "X");
        assert_eq!(req.payload["tip"], "");
    }

    #[test]
    fn rows_and_palette_are_mapped() {
        let tpl = Template::new(TemplateKind::Table, Path::new("/unused"));
        let fields = TemplateFields::new()
            .columns(["名称", "数量"])
            .data([vec!["苹果", "3"], vec!["梨", "5"]])
            .tip("单位：个")
            .night_mode(true);
        let req = build(&tpl, &selector(3), &fields).unwrap();

        assert_eq!(req.layout, "night.html");
        assert_eq!(req.payload["columns"], json!(["名称", "数量"]));
        assert_eq!(req.payload["data"], json!([["苹果", "3"], ["梨", "5"]]));
        assert_eq!(req.payload["header_color"], "#a8456b");
        assert_eq!(req.payload["header_bg"], "#F7E6EA");
        assert_eq!(req.payload["hover_bg"], "#fbf0f3");
    }
}
