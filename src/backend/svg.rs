//! 基于 minijinja + resvg 的渲染后端。
//!
//! - 命名布局：`{directory}/{layout_name}` 为 minijinja 模板，渲染结果必须是 SVG 标记；
//! - 原始标记：直接按 SVG 栅格化；
//! - Markdown / 纯文本：先排版为 SVG 文本块，再栅格化。
//!
//! 栅格化（解析、绘制、编码）放入 Tokio 的阻塞线程池，避免阻塞异步运行时线程。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::ColorType;
use image::codecs::jpeg::JpegEncoder;
use minijinja::Environment;
use moka::sync::Cache;
use resvg::render;
use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use tiny_skia::{Pixmap, Transform};
use tokio::task::spawn_blocking;

use super::RenderBackend;
use super::text_layout::{self, TextStyle};
use crate::config::{BackendConfig, CardImgConfig};
use crate::engine::TemplatePayload;
use crate::engine::options::{ImageFormat, RenderOptions};
use crate::error::CardImgError;

/// 未指定 max_width 时文本排版使用的画布宽度
const DEFAULT_TEXT_WIDTH: u32 = 800;

/// 栅格化参数（从配置中提取，可跨线程复制）
#[derive(Debug, Clone)]
pub struct RasterSettings {
    pub optimize_speed: bool,
    pub default_font: String,
}

impl From<&BackendConfig> for RasterSettings {
    fn from(cfg: &BackendConfig) -> Self {
        Self {
            optimize_speed: cfg.optimize_speed,
            default_font: cfg.default_font.clone(),
        }
    }
}

impl Default for RasterSettings {
    fn default() -> Self {
        (&BackendConfig::default()).into()
    }
}

pub struct SvgBackend {
    font_db: Arc<fontdb::Database>,
    settings: RasterSettings,
    /// 每个模板目录一个 Environment（内部会缓存已编译的布局）
    layouts: Cache<PathBuf, Arc<Environment<'static>>>,
}

impl std::fmt::Debug for SvgBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgBackend")
            .field("fonts", &self.font_db.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl SvgBackend {
    pub fn new(font_db: Arc<fontdb::Database>, settings: RasterSettings, layout_cache: u64) -> Self {
        Self {
            font_db,
            settings,
            layouts: Cache::builder().max_capacity(layout_cache.max(1)).build(),
        }
    }

    /// 按配置构造：加载系统字体与 `resources.fonts_dir` 中的字体
    pub fn from_config(config: &CardImgConfig) -> Self {
        let font_db = load_font_db(Some(&config.fonts_path()), true);
        Self::new(
            font_db,
            (&config.backend).into(),
            config.backend.layout_cache_entries,
        )
    }

    pub fn settings(&self) -> &RasterSettings {
        &self.settings
    }

    fn layout_env(&self, directory: &Path) -> Arc<Environment<'static>> {
        self.layouts.get_with(directory.to_path_buf(), || {
            let mut env = Environment::new();
            env.set_loader(minijinja::path_loader(directory.to_path_buf()));
            Arc::new(env)
        })
    }

    /// 渲染命名布局为 SVG 字符串
    pub fn render_layout_markup(
        &self,
        directory: &Path,
        layout_name: &str,
        payload: &TemplatePayload,
    ) -> Result<String, CardImgError> {
        let env = self.layout_env(directory);
        let tpl = env.get_template(layout_name).map_err(|e| {
            CardImgError::Backend(format!("加载布局失败（{layout_name}）: {e}"))
        })?;
        tpl.render(payload).map_err(|e| {
            CardImgError::Backend(format!("渲染布局失败（{layout_name}）: {e}"))
        })
    }

    async fn rasterize_async(
        &self,
        svg: String,
        resources_dir: Option<PathBuf>,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let font_db = self.font_db.clone();
        let settings = self.settings.clone();
        let options = options.clone();
        let handle = spawn_blocking(move || {
            rasterize(&svg, &font_db, &settings, resources_dir.as_deref(), &options)
        });

        handle
            .await
            .map_err(|e| CardImgError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
    }

    fn text_width(options: &RenderOptions) -> u32 {
        options.max_width().unwrap_or(DEFAULT_TEXT_WIDTH).max(120)
    }
}

#[async_trait]
impl RenderBackend for SvgBackend {
    async fn render_named_layout(
        &self,
        directory: &Path,
        layout_name: &str,
        payload: &TemplatePayload,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let svg = self.render_layout_markup(directory, layout_name, payload)?;
        self.rasterize_async(svg, Some(directory.to_path_buf()), options)
            .await
    }

    async fn render_raw_html(
        &self,
        html: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let trimmed = html.trim_start();
        if !(trimmed.starts_with("<svg") || trimmed.starts_with("<?xml")) {
            return Err(CardImgError::Backend(
                "SVG 后端仅支持以 <svg 或 <?xml 开头的标记".to_string(),
            ));
        }
        self.rasterize_async(html.to_string(), None, options).await
    }

    async fn render_markdown(
        &self,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let style = TextStyle::new(Self::text_width(options), &self.settings.default_font);
        let svg = text_layout::markdown_to_svg(markdown, &style);
        self.rasterize_async(svg, None, options).await
    }

    async fn render_plain_text(
        &self,
        text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        let style = TextStyle::new(Self::text_width(options), &self.settings.default_font);
        let svg = text_layout::plain_text_to_svg(text, &style);
        self.rasterize_async(svg, None, options).await
    }
}

/// 初始化字体数据库：可选加载系统字体，再加载目录中的 ttf/otf
pub fn load_font_db(fonts_dir: Option<&Path>, system_fonts: bool) -> Arc<fontdb::Database> {
    let mut font_db = fontdb::Database::new();
    if system_fonts {
        font_db.load_system_fonts();
    }

    if let Some(dir) = fonts_dir.filter(|d| d.exists()) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file()
                    && (path.extension() == Some("ttf".as_ref())
                        || path.extension() == Some("otf".as_ref()))
                {
                    if let Err(e) = font_db.load_font_file(&path) {
                        tracing::warn!("加载字体失败 {:?}: {}", path, e);
                    }
                }
            }
        }
    }

    tracing::debug!("字体数据库就绪: {} 个字体", font_db.len());
    Arc::new(font_db)
}

/// 计算输出尺寸：宽度不超过 max_width（仅下采样）；
/// 不允许自适应且给定 device_height 时，高度固定为 device_height。
fn output_geometry(src_w: u32, src_h: u32, options: &RenderOptions) -> (u32, u32, f32) {
    let scale = match options.max_width() {
        Some(max_w) if max_w > 0 && src_w > max_w => max_w as f32 / src_w as f32,
        _ => 1.0,
    };
    let dst_w = ((src_w as f32 * scale).round() as u32).max(1);
    let dst_h = match options.device_height() {
        Some(h) if h > 0 && !options.allow_refit() => h,
        _ => ((src_h as f32 * scale).round() as u32).max(1),
    };
    (dst_w, dst_h, scale)
}

/// SVG → PNG / JPEG
pub fn rasterize(
    svg: &str,
    font_db: &Arc<fontdb::Database>,
    settings: &RasterSettings,
    resources_dir: Option<&Path>,
    options: &RenderOptions,
) -> Result<Vec<u8>, CardImgError> {
    let t0 = std::time::Instant::now();
    let speed = settings.optimize_speed;
    let opts = UsvgOptions {
        resources_dir: resources_dir.map(Path::to_path_buf),
        fontdb: font_db.clone(),
        font_family: settings.default_font.clone(),
        font_size: 16.0,
        languages: vec!["zh-CN".to_string(), "en".to_string()],
        shape_rendering: if speed {
            usvg::ShapeRendering::OptimizeSpeed
        } else {
            usvg::ShapeRendering::GeometricPrecision
        },
        text_rendering: if speed {
            usvg::TextRendering::OptimizeSpeed
        } else {
            usvg::TextRendering::OptimizeLegibility
        },
        image_rendering: if speed {
            usvg::ImageRendering::OptimizeSpeed
        } else {
            usvg::ImageRendering::OptimizeQuality
        },
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| CardImgError::Backend(format!("SVG 解析失败: {e}")))?;
    let t_parse = t0.elapsed();

    let src_size = tree.size().to_int_size();
    let (dst_w, dst_h, scale) = output_geometry(src_size.width(), src_size.height(), options);

    let mut pixmap = Pixmap::new(dst_w, dst_h)
        .ok_or_else(|| CardImgError::Backend("创建画布失败".to_string()))?;
    render(
        &tree,
        Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    let t_raster = t0.elapsed();

    let format = options.image_format();
    let out = match format {
        ImageFormat::Png => encode_png(&pixmap, speed)?,
        ImageFormat::Jpeg => encode_jpeg(&pixmap, options.jpeg_quality())?,
    };

    tracing::debug!(
        "{}渲染分段: 解析={:?}, 栅格化={:?}, 编码={:?}, 尺寸={}x{}",
        format,
        t_parse,
        t_raster - t_parse,
        t0.elapsed() - t_raster,
        dst_w,
        dst_h
    );
    Ok(out)
}

fn encode_png(pixmap: &Pixmap, speed: bool) -> Result<Vec<u8>, CardImgError> {
    let (w, h) = (pixmap.width(), pixmap.height());
    let mut out = Vec::with_capacity((w * h * 4) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| CardImgError::Backend(format!("PNG write_header error: {e}")))?;
        writer
            .write_image_data(pixmap.data())
            .map_err(|e| CardImgError::Backend(format!("PNG write_image_data error: {e}")))?;
        writer
            .finish()
            .map_err(|e| CardImgError::Backend(format!("PNG finish error: {e}")))?;
    }
    Ok(out)
}

/// JPEG 无透明通道：预乘 alpha 的像素直接取 RGB，相当于合成到黑底
fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, CardImgError> {
    let (w, h) = (pixmap.width(), pixmap.height());
    let mut rgb: Vec<u8> = Vec::with_capacity((w as usize) * (h as usize) * 3);
    for px in pixmap.data().chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    let mut out = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    enc.encode(&rgb, w, h, ColorType::Rgb8.into())
        .map_err(|e| CardImgError::Backend(format!("JPEG encode error: {e}")))?;
    Ok(out)
}
