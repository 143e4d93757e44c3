use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::engine::options::{FallbackOptions, FallbackSource, ImageFormat};

/// 配置文件路径的环境变量名
pub const CONFIG_PATH_ENV: &str = "CARDIMG_CONFIG";

/// 渲染兜底配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 是否使用全局配置作为兜底（默认 false）
    #[serde(default)]
    pub use_global_config: bool,
    /// 全局图片格式：png 或 jpeg（默认 png）
    #[serde(default = "RenderConfig::default_image_format")]
    pub image_format: String,
    /// 全局 JPEG 质量：1-100（默认 85）
    #[serde(default = "RenderConfig::default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl RenderConfig {
    fn default_image_format() -> String {
        "png".to_string()
    }
    fn default_jpeg_quality() -> u8 {
        85
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_global_config: false,
            image_format: Self::default_image_format(),
            jpeg_quality: Self::default_jpeg_quality(),
        }
    }
}

/// 资源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// 模板资源根目录（每个模板一个子目录）
    #[serde(default = "ResourcesConfig::default_templates_dir")]
    pub templates_dir: String,
    /// 额外字体目录（.ttf/.otf）
    #[serde(default = "ResourcesConfig::default_fonts_dir")]
    pub fonts_dir: String,
}

impl ResourcesConfig {
    fn default_templates_dir() -> String {
        "./resources/templates".to_string()
    }
    fn default_fonts_dir() -> String {
        "./resources/fonts".to_string()
    }
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            templates_dir: Self::default_templates_dir(),
            fonts_dir: Self::default_fonts_dir(),
        }
    }
}

/// SVG 渲染后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 是否优先速度渲染（OptimizeSpeed），提升栅格化性能，可能略降画质
    #[serde(default)]
    pub optimize_speed: bool,
    /// 默认字体族
    #[serde(default = "BackendConfig::default_font")]
    pub default_font: String,
    /// 缓存的布局环境数量上限（按模板目录计）
    #[serde(default = "BackendConfig::default_layout_cache_entries")]
    pub layout_cache_entries: u64,
}

impl BackendConfig {
    fn default_font() -> String {
        "sans-serif".to_string()
    }
    fn default_layout_cache_entries() -> u64 {
        32
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            optimize_speed: false,
            default_font: Self::default_font(),
            layout_cache_entries: Self::default_layout_cache_entries(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 插件配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardImgConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CardImgConfig {
    /// 从默认路径加载配置（文件可缺省），支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::get_config_path())
    }

    /// 从指定文件加载配置，例如 `CARDIMG_RENDER__IMAGE_FORMAT=jpeg` 覆盖文件中的值
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::info!("正在从 {:?} 加载配置文件", path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("CARDIMG")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.image_format.parse::<ImageFormat>().is_err() {
            return Err(ConfigError::Message(format!(
                "render.image_format 仅支持 png/jpeg，当前: {}",
                self.render.image_format
            )));
        }
        if !(1..=100).contains(&self.render.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "render.jpeg_quality 需在 1-100 之间，当前: {}",
                self.render.jpeg_quality
            )));
        }
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cardimg.toml"))
    }

    /// 获取模板资源根目录
    pub fn templates_path(&self) -> PathBuf {
        PathBuf::from(&self.resources.templates_dir)
    }

    /// 获取字体目录
    pub fn fonts_path(&self) -> PathBuf {
        PathBuf::from(&self.resources.fonts_dir)
    }

    /// 提取渲染兜底选项
    pub fn fallback_options(&self) -> FallbackOptions {
        FallbackOptions {
            enabled: self.render.use_global_config,
            // validate() 已保证可解析；手工构造的非法值回落到 png
            image_format: self.render.image_format.parse().unwrap_or_default(),
            jpeg_quality: self.render.jpeg_quality.clamp(1, 100),
        }
    }
}

impl FallbackSource for CardImgConfig {
    fn fallback(&self) -> FallbackOptions {
        self.fallback_options()
    }
}

/// 可热更新的共享配置：每次渲染调用都会重新读取，修改在下一次调用生效
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<CardImgConfig>>,
    path: Option<PathBuf>,
}

impl SharedConfig {
    pub fn new(config: CardImgConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// 绑定配置文件，`reload()` 时从该文件重新读取
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = CardImgConfig::load_from(&path)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path),
        })
    }

    /// 当前配置快照
    pub fn snapshot(&self) -> CardImgConfig {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 整体替换配置（校验失败时保持原配置）
    pub fn replace(&self, config: CardImgConfig) -> Result<(), ConfigError> {
        config.validate()?;
        match self.inner.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        Ok(())
    }

    /// 从绑定的配置文件重新加载
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = self.path.as_ref() else {
            return Err(ConfigError::Message("未绑定配置文件，无法重新加载".to_string()));
        };
        let config = CardImgConfig::load_from(path)?;
        self.replace(config)?;
        tracing::info!("配置已重新加载: {:?}", path);
        Ok(())
    }
}

impl FallbackSource for SharedConfig {
    fn fallback(&self) -> FallbackOptions {
        match self.inner.read() {
            Ok(guard) => guard.fallback_options(),
            Err(poisoned) => poisoned.into_inner().fallback_options(),
        }
    }
}
