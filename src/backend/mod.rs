//! 外部渲染后端接口。
//!
//! 引擎只依赖这里的四个操作；模板统一走 `render_named_layout`，
//! 其余三个作为备用内容源原样暴露。后端错误原样透传给调用方，引擎不做重试。

use std::path::Path;

use async_trait::async_trait;

use crate::engine::TemplatePayload;
use crate::engine::options::RenderOptions;
use crate::error::CardImgError;

pub mod svg;
mod text_layout;

pub use svg::SvgBackend;

#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// 使用 `directory` 下名为 `layout_name` 的布局与 `payload` 渲染图片
    async fn render_named_layout(
        &self,
        directory: &Path,
        layout_name: &str,
        payload: &TemplatePayload,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError>;

    /// 直接渲染完整标记
    async fn render_raw_html(
        &self,
        html: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError>;

    /// 渲染 Markdown 文本
    async fn render_markdown(
        &self,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError>;

    /// 渲染纯文本
    async fn render_plain_text(
        &self,
        text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError>;
}
