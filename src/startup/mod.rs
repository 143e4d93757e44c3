/// 启动检查工具模块
pub mod checks;

pub use checks::{check_template_dirs, load_templates};
