use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::CardImgError;
use crate::templates::{Template, TemplateKind};

/// 已构造的模板表（注册顺序 + ID 索引）
#[derive(Debug)]
struct TemplateTable {
    ordered: Vec<Arc<Template>>,
    by_id: HashMap<&'static str, Arc<Template>>,
}

/// 模板注册表。
///
/// 由调用方显式构造并持有；`initialize()` 只会生效一次，之后的调用不会重建模板。
/// 初始化应在并发渲染开始前完成。
#[derive(Debug)]
pub struct TemplateRegistry {
    templates_dir: PathBuf,
    table: OnceLock<TemplateTable>,
}

impl TemplateRegistry {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            table: OnceLock::new(),
        }
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    /// 构造全部已知模板（幂等）
    pub fn initialize(&self) -> Result<(), CardImgError> {
        if self.is_initialized() {
            return Ok(());
        }

        let mut ordered = Vec::with_capacity(TemplateKind::ALL.len());
        let mut by_id = HashMap::with_capacity(TemplateKind::ALL.len());
        for kind in TemplateKind::ALL {
            let tpl = Arc::new(Template::new(kind, &self.templates_dir));
            if by_id.insert(kind.id(), tpl.clone()).is_some() {
                return Err(CardImgError::Internal(format!("模板 ID 重复: {}", kind.id())));
            }
            ordered.push(tpl);
        }

        let count = ordered.len();
        if self.table.set(TemplateTable { ordered, by_id }).is_ok() {
            tracing::info!("模板库初始化完成: {} 个模板", count);
        }
        Ok(())
    }

    /// 按 ID 获取模板；同一 ID 在注册表生命周期内总是返回同一实例
    pub fn lookup(&self, id: &str) -> Result<Arc<Template>, CardImgError> {
        let table = self.table.get().ok_or(CardImgError::NotInitialized)?;
        table
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| CardImgError::UnknownTemplate {
                id: id.to_string(),
                available: self.list_ids(),
            })
    }

    /// 已注册模板 ID（注册顺序）；未初始化时为空
    pub fn list_ids(&self) -> Vec<String> {
        self.table
            .get()
            .map(|t| t.ordered.iter().map(|tpl| tpl.id().to_string()).collect())
            .unwrap_or_default()
    }

    /// 已注册模板（注册顺序）
    pub fn templates(&self) -> Vec<Arc<Template>> {
        self.table
            .get()
            .map(|t| t.ordered.clone())
            .unwrap_or_default()
    }
}
