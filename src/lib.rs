/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 启动检查模块
pub mod startup;

/// 渲染引擎：注册表、选项合并、主题选择与资源缓存
pub mod engine;

/// 卡片模板
pub mod templates;

/// 渲染后端（SVG 排版 + 光栅化）
pub mod backend;

// 导出常用类型供外部使用
pub use backend::{RenderBackend, SvgBackend};
pub use config::{CardImgConfig, SharedConfig};
pub use engine::{
    FallbackOptions, FallbackSource, ImageFormat, NightMode, RenderOptions, RenderRequest,
    RenderService, TemplatePayload, TemplateRegistry, ThemeSelector,
};
pub use error::CardImgError;
pub use templates::{Template, TemplateFields, TemplateKind};
