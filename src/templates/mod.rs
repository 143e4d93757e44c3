//! 卡片模板。
//!
//! 模板集合是封闭的：`TemplateKind` 枚举每一种视觉风格，`Template` 持有该风格的
//! 资源目录与私有缓存，并按种类分派到各自的 payload 构建逻辑。

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::backend::RenderBackend;
use crate::engine::TemplatePayload;
use crate::engine::cache::ResourceCache;
use crate::engine::options::RenderOptions;
use crate::engine::theme::{NightMode, ThemeSelector};
use crate::error::CardImgError;

mod bili;
mod help;
mod minote;
mod ncm;
mod simple;
mod table;

/// 单布局模板使用的布局文件名
pub const SINGLE_LAYOUT: &str = "template.html";
/// 昼夜双布局模板：白天
pub const DAY_LAYOUT: &str = "day.html";
/// 昼夜双布局模板：夜间
pub const NIGHT_LAYOUT: &str = "night.html";

/// 模板种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// 小米便签（背景图 + 边框 + 四角装饰）
    MiNote,
    /// 纯色背景，支持夜间模式
    Simple,
    /// 网易云音乐朱砂样式
    NcmZhuSha,
    /// 网易云热评卡片
    NcmCard,
    /// 哔哩哔哩壁纸，昼夜切换布局与背景图
    Bili,
    /// 帮助文档，随机配色 + 昼夜模式
    Help,
    /// 表格，随机配色 + 昼夜模式
    Table,
}

impl TemplateKind {
    /// 注册顺序
    pub const ALL: [TemplateKind; 7] = [
        TemplateKind::MiNote,
        TemplateKind::Simple,
        TemplateKind::NcmZhuSha,
        TemplateKind::NcmCard,
        TemplateKind::Bili,
        TemplateKind::Help,
        TemplateKind::Table,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            TemplateKind::MiNote => "minote",
            TemplateKind::Simple => "simple",
            TemplateKind::NcmZhuSha => "ncm_zhusha",
            TemplateKind::NcmCard => "ncm_card",
            TemplateKind::Bili => "bili",
            TemplateKind::Help => "help",
            TemplateKind::Table => "table",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TemplateKind::MiNote => "小米便签",
            TemplateKind::Simple => "简约",
            TemplateKind::NcmZhuSha => "网易云朱砂",
            TemplateKind::NcmCard => "网易云热评卡片",
            TemplateKind::Bili => "哔哩哔哩壁纸",
            TemplateKind::Help => "帮助文档",
            TemplateKind::Table => "表格",
        }
    }

    /// 该模板是否参与夜间模式判定
    pub fn supports_night_mode(&self) -> bool {
        matches!(
            self,
            TemplateKind::Simple | TemplateKind::Bili | TemplateKind::Help | TemplateKind::Table
        )
    }

    /// 模板默认渲染参数
    pub fn default_options(&self) -> RenderOptions {
        match self {
            TemplateKind::MiNote => minote::default_options(),
            TemplateKind::Simple => simple::default_options(),
            TemplateKind::NcmZhuSha => ncm::zhusha_default_options(),
            TemplateKind::NcmCard => ncm::card_default_options(),
            TemplateKind::Bili => bili::default_options(),
            TemplateKind::Help => help::default_options(),
            TemplateKind::Table => table::default_options(),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 调用方传入的文本字段与模板特定字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateFields {
    pub title: String,
    pub content: String,
    pub footer: String,
    /// 表格提示文本
    pub tip: String,
    pub night_mode: NightMode,
    /// 帮助条目：标题 → 内容（保持顺序）
    pub items: Vec<(String, String)>,
    /// 表头；缺省按空序列处理
    pub columns: Option<Vec<String>>,
    /// 表格数据（二维）；缺省按空序列处理
    pub data: Option<Vec<Vec<String>>>,
}

impl TemplateFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    pub fn tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = tip.into();
        self
    }

    pub fn night_mode(mut self, night_mode: impl Into<NightMode>) -> Self {
        self.night_mode = night_mode.into();
        self
    }

    pub fn items<K, V>(mut self, items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.items = items.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn data<R, S>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data = Some(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        );
        self
    }
}

/// 模板选定的布局与 payload
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRequest {
    pub layout: &'static str,
    pub payload: TemplatePayload,
}

/// 单次渲染所需的外部协作者
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub backend: &'a dyn RenderBackend,
    pub theme: &'a ThemeSelector,
}

/// 一个已注册的模板实例
#[derive(Debug)]
pub struct Template {
    kind: TemplateKind,
    dir: PathBuf,
    assets: ResourceCache,
    night_mode_enabled: bool,
}

impl Template {
    /// 构造只记录 ID 与目录，不触碰文件系统
    pub fn new(kind: TemplateKind, templates_dir: &Path) -> Self {
        let dir = templates_dir.join(kind.id());
        Self {
            kind,
            assets: ResourceCache::new(dir.clone()),
            dir,
            night_mode_enabled: kind.supports_night_mode(),
        }
    }

    /// 关闭/开启自动夜间判定（显式指定不受影响）
    pub fn with_night_mode_enabled(mut self, enabled: bool) -> Self {
        self.night_mode_enabled = enabled && self.kind.supports_night_mode();
        self
    }

    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn assets(&self) -> &ResourceCache {
        &self.assets
    }

    pub fn night_mode_enabled(&self) -> bool {
        self.night_mode_enabled
    }

    pub fn default_options(&self) -> RenderOptions {
        self.kind.default_options()
    }

    /// 选定布局并组装 payload，不调用后端
    pub fn build_layout(
        &self,
        theme: &ThemeSelector,
        fields: &TemplateFields,
    ) -> Result<LayoutRequest, CardImgError> {
        match self.kind {
            TemplateKind::MiNote => Ok(minote::build(self, fields)),
            TemplateKind::Simple => Ok(simple::build(self, theme, fields)),
            TemplateKind::NcmZhuSha => Ok(ncm::build_zhusha(fields)),
            TemplateKind::NcmCard => Ok(ncm::build_card(self, fields)),
            TemplateKind::Bili => Ok(bili::build(self, theme, fields)),
            TemplateKind::Help => help::build(self, theme, fields),
            TemplateKind::Table => table::build(self, theme, fields),
        }
    }

    /// 渲染为图片；`options` 为已合并的有效选项，后端输出原样返回
    pub async fn render(
        &self,
        ctx: RenderContext<'_>,
        fields: &TemplateFields,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let request = self.build_layout(ctx.theme, fields)?;
        // 这里只校验布局存在，缺失即失败；布局内容由后端自己的加载器读取
        self.assets.get_text(request.layout)?;
        tracing::debug!("模板 {} 使用布局 {}", self.id(), request.layout);
        ctx.backend
            .render_named_layout(&self.dir, request.layout, &request.payload, options)
            .await
    }

    pub(crate) fn use_night(&self, theme: &ThemeSelector, fields: &TemplateFields) -> bool {
        theme.resolve_night_mode(fields.night_mode, self.night_mode_enabled)
    }

    pub(crate) fn resource(&self, name: &str) -> Value {
        Value::String(self.assets.get_resource_path(name))
    }
}

/// 按给定顺序组装 payload
pub(crate) fn payload<const N: usize>(entries: [(&str, Value); N]) -> TemplatePayload {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub(crate) fn day_or_night(use_night: bool) -> &'static str {
    if use_night { NIGHT_LAYOUT } else { DAY_LAYOUT }
}
