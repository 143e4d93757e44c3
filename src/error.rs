use std::path::PathBuf;

use thiserror::Error;

/// 渲染引擎统一错误类型
#[derive(Error, Debug)]
pub enum CardImgError {
    /// 模板注册表尚未初始化（调用方应先执行初始化，引擎不会自动初始化）
    #[error("模板未初始化，请先调用 TemplateRegistry::initialize()")]
    NotInitialized,

    /// 请求的模板未注册
    #[error("模板 '{id}' 不存在，可用: {}", available.join(", "))]
    UnknownTemplate {
        /// 请求的模板 ID
        id: String,
        /// 当前已注册的全部模板 ID（注册顺序）
        available: Vec<String>,
    },

    /// 布局文件缺失（对本次渲染是致命错误）
    #[error("模板文件不存在: {}", path.display())]
    MissingTemplateFile { path: PathBuf },

    /// 模板声明了空的配色列表（配置/编程错误）
    #[error("模板 '{template}' 未声明任何配色主题")]
    InvalidThemeSet { template: String },

    /// 渲染后端失败（原样透传，不重试）
    #[error("渲染后端错误: {0}")]
    Backend(String),

    /// 读取资源时的 I/O 错误（文件存在但无法读取）
    #[error("I/O 错误: {0}")]
    Io(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl CardImgError {
    /// 稳定的错误码，用于程序化处理。
    pub fn stable_code(&self) -> &'static str {
        match self {
            CardImgError::NotInitialized => "NOT_INITIALIZED",
            CardImgError::UnknownTemplate { .. } => "UNKNOWN_TEMPLATE",
            CardImgError::MissingTemplateFile { .. } => "MISSING_TEMPLATE_FILE",
            CardImgError::InvalidThemeSet { .. } => "INVALID_THEME_SET",
            CardImgError::Backend(_) => "BACKEND_RENDER_FAILED",
            CardImgError::Io(_) => "IO_ERROR",
            CardImgError::Config(_) => "CONFIG_ERROR",
            CardImgError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否属于调用方可自行恢复的错误（重新初始化即可）。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CardImgError::NotInitialized)
    }
}

// =============== Error conversions for common external errors ===============

impl From<config::ConfigError> for CardImgError {
    fn from(err: config::ConfigError) -> Self {
        CardImgError::Config(err.to_string())
    }
}

impl From<minijinja::Error> for CardImgError {
    fn from(err: minijinja::Error) -> Self {
        CardImgError::Backend(err.to_string())
    }
}
