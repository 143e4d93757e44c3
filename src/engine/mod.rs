/// 模板资源缓存
pub mod cache;
/// 渲染选项与合并规则
pub mod options;
/// 模板注册表
pub mod registry;
/// 渲染入口
pub mod service;
/// 昼夜模式与配色
pub mod theme;

use serde_json::{Map, Value};

/// 传给布局的占位符数据（保持插入顺序）
pub type TemplatePayload = Map<String, Value>;

pub use cache::ResourceCache;
pub use options::{FallbackOptions, FallbackSource, ImageFormat, RenderOptions};
pub use registry::TemplateRegistry;
pub use service::{RenderRequest, RenderService};
pub use theme::{ColorTheme, NightMode, ThemeSelector};
