use crate::engine::TemplateRegistry;

/// 初始化模板注册表
///
/// 1. 构造全部已知模板（幂等）
/// 2. 检查各模板资源目录，缺失时仅告警
///
/// 失败只记录日志并返回 `false`，不会中断调用方。
pub fn load_templates(registry: &TemplateRegistry) -> bool {
    tracing::info!("🔍 开始加载模板库: {:?}", registry.templates_dir());

    match registry.initialize() {
        Ok(()) => {
            let missing = check_template_dirs(registry);
            tracing::info!(
                "✅ 模板库加载完成: {} 个模板, {} 个目录缺失",
                registry.list_ids().len(),
                missing.len()
            );
            true
        }
        Err(e) => {
            tracing::error!("❌ 模板库加载失败: {}", e);
            false
        }
    }
}

/// 检查各模板资源目录是否存在，返回缺失目录的模板 ID
pub fn check_template_dirs(registry: &TemplateRegistry) -> Vec<String> {
    let mut missing = Vec::new();
    for tpl in registry.templates() {
        if tpl.dir().is_dir() {
            tracing::debug!("模板目录已存在: {} -> {:?}", tpl.id(), tpl.dir());
        } else {
            tracing::warn!("⚠️ 未找到模板目录: {} -> {:?}", tpl.id(), tpl.dir());
            tracing::info!("💡 渲染该模板前请放置布局文件");
            missing.push(tpl.id().to_string());
        }
    }
    missing
}
