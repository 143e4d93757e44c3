use std::sync::Arc;

use crate::backend::RenderBackend;
use crate::engine::options::{self, ALLOW_REFIT, FallbackSource, MAX_WIDTH, RenderOptions};
use crate::engine::registry::TemplateRegistry;
use crate::engine::theme::{NightMode, ThemeSelector};
use crate::error::CardImgError;
use crate::templates::{RenderContext, TemplateFields};

/// 不经过模板的备用内容源（HTML / Markdown / 纯文本）使用的默认选项
pub fn default_render_options() -> RenderOptions {
    RenderOptions::new().with(MAX_WIDTH, 800).with(ALLOW_REFIT, true)
}

/// 单次渲染请求：文本字段、模板特定字段与后端选项覆盖
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    pub fields: TemplateFields,
    pub options_override: Option<RenderOptions>,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.fields = self.fields.title(title);
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.fields = self.fields.content(content);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.fields = self.fields.footer(footer);
        self
    }

    pub fn tip(mut self, tip: impl Into<String>) -> Self {
        self.fields = self.fields.tip(tip);
        self
    }

    pub fn night_mode(mut self, night_mode: impl Into<NightMode>) -> Self {
        self.fields = self.fields.night_mode(night_mode);
        self
    }

    pub fn items<K, V>(mut self, items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.fields = self.fields.items(items);
        self
    }

    pub fn columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.fields = self.fields.columns(columns);
        self
    }

    pub fn data<R, S>(mut self, rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = self.fields.data(rows);
        self
    }

    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options_override = Some(options);
        self
    }
}

/// 渲染入口：按 ID 查找模板、合并选项并分派渲染
#[derive(Clone)]
pub struct RenderService {
    registry: Arc<TemplateRegistry>,
    backend: Arc<dyn RenderBackend>,
    fallback: Arc<dyn FallbackSource>,
    theme: ThemeSelector,
}

impl RenderService {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        backend: Arc<dyn RenderBackend>,
        fallback: Arc<dyn FallbackSource>,
    ) -> Self {
        Self {
            registry,
            backend,
            fallback,
            theme: ThemeSelector::default(),
        }
    }

    /// 替换主题选择器（注入时钟 / 随机源）
    pub fn with_theme(mut self, theme: ThemeSelector) -> Self {
        self.theme = theme;
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn list_template_ids(&self) -> Vec<String> {
        self.registry.list_ids()
    }

    /// 渲染模板为图片，字节原样返回
    pub async fn render(
        &self,
        template_id: &str,
        request: &RenderRequest,
    ) -> Result<Vec<u8>, CardImgError> {
        let template = self.registry.lookup(template_id)?;

        let effective = options::resolve(
            &template.default_options(),
            &self.fallback.fallback(),
            request.options_override.as_ref(),
        );

        let t0 = std::time::Instant::now();
        let ctx = RenderContext {
            backend: self.backend.as_ref(),
            theme: &self.theme,
        };
        let bytes = template.render(ctx, &request.fields, &effective).await?;
        tracing::debug!(
            "模板 {} 渲染完成: {} 字节, 耗时 {:?}",
            template_id,
            bytes.len(),
            t0.elapsed()
        );
        Ok(bytes)
    }

    /// HTML 转图片
    pub async fn render_html(
        &self,
        html: &str,
        options_override: Option<&RenderOptions>,
    ) -> Result<Vec<u8>, CardImgError> {
        let effective = self.passthrough_options(options_override);
        self.backend.render_raw_html(html, &effective).await
    }

    /// Markdown 转图片
    pub async fn render_markdown(
        &self,
        markdown: &str,
        options_override: Option<&RenderOptions>,
    ) -> Result<Vec<u8>, CardImgError> {
        let effective = self.passthrough_options(options_override);
        self.backend.render_markdown(markdown, &effective).await
    }

    /// 纯文本转图片
    pub async fn render_text(
        &self,
        text: &str,
        options_override: Option<&RenderOptions>,
    ) -> Result<Vec<u8>, CardImgError> {
        let effective = self.passthrough_options(options_override);
        self.backend.render_plain_text(text, &effective).await
    }

    fn passthrough_options(&self, options_override: Option<&RenderOptions>) -> RenderOptions {
        options::resolve(
            &default_render_options(),
            &self.fallback.fallback(),
            options_override,
        )
    }
}
