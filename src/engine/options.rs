//! 渲染选项与三级合并。
//!
//! 优先级（低 → 高，逐键覆盖）：模板默认值 → 全局兜底（仅在开关开启时）→ 单次调用覆盖。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MAX_WIDTH: &str = "max_width";
pub const DEVICE_HEIGHT: &str = "device_height";
pub const ALLOW_REFIT: &str = "allow_refit";
pub const IMAGE_FORMAT: &str = "image_format";
pub const JPEG_QUALITY: &str = "jpeg_quality";

/// 输出图片格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG（默认，保真但体积较大）
    #[default]
    Png,
    /// JPEG（有损压缩，体积显著更小）
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(format!("不支持的图片格式: {other}")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后端渲染选项（键开放，未知键原样透传给后端）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderOptions(Map<String, Value>);

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式写入
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// 逐键覆盖：`other` 中的键写入自身，自身已有而 `other` 没有的键保留
    pub fn overlay(&mut self, other: &RenderOptions) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn max_width(&self) -> Option<u32> {
        self.get_u32(MAX_WIDTH)
    }

    pub fn device_height(&self) -> Option<u32> {
        self.get_u32(DEVICE_HEIGHT)
    }

    /// 是否允许按内容自适应高度（缺省 true）
    pub fn allow_refit(&self) -> bool {
        self.0
            .get(ALLOW_REFIT)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// 无法识别的格式按 png 处理
    pub fn image_format(&self) -> ImageFormat {
        self.0
            .get(IMAGE_FORMAT)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// JPEG 质量（缺省 85，钳制到 1-100）
    pub fn jpeg_quality(&self) -> u8 {
        self.0
            .get(JPEG_QUALITY)
            .and_then(Value::as_u64)
            .map(|q| q.clamp(1, 100) as u8)
            .unwrap_or(85)
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}

impl From<Map<String, Value>> for RenderOptions {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RenderOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 全局兜底选项（来自外部配置，每次调用时读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackOptions {
    /// 兜底开关；关闭时第二级不贡献任何键
    pub enabled: bool,
    pub image_format: ImageFormat,
    pub jpeg_quality: u8,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            image_format: ImageFormat::Png,
            jpeg_quality: 85,
        }
    }
}

impl FallbackOptions {
    fn as_options(&self) -> RenderOptions {
        RenderOptions::new()
            .with(IMAGE_FORMAT, self.image_format.as_str())
            .with(JPEG_QUALITY, self.jpeg_quality)
    }
}

/// 兜底配置来源。实现方需保证每次调用返回当前值，以便配置修改在下一次渲染时生效。
pub trait FallbackSource: Send + Sync {
    fn fallback(&self) -> FallbackOptions;
}

impl FallbackSource for FallbackOptions {
    fn fallback(&self) -> FallbackOptions {
        *self
    }
}

/// 合并三级选项，得到本次调用的有效选项
pub fn resolve(
    template_defaults: &RenderOptions,
    fallback: &FallbackOptions,
    per_call: Option<&RenderOptions>,
) -> RenderOptions {
    let mut out = template_defaults.clone();
    if fallback.enabled {
        out.overlay(&fallback.as_options());
    }
    if let Some(overrides) = per_call {
        out.overlay(overrides);
    }
    out
}
