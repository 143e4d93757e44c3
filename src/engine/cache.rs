use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moka::sync::Cache;

use crate::error::CardImgError;

/// 单个模板私有的资源缓存。
///
/// - 布局文件内容：缺失即报错（`MissingTemplateFile`），不回退为空内容；
/// - 装饰性资源路径：缺失返回空字符串并告警，由布局自行降级。
///
/// 条目一经写入不再变化；并发首次访问时可能重复读取同一文件，写入同值是幂等的。
#[derive(Clone)]
pub struct ResourceCache {
    dir: PathBuf,
    texts: Cache<String, Arc<str>>,
    paths: Cache<String, String>,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("dir", &self.dir)
            .field("texts", &self.texts.entry_count())
            .field("paths", &self.paths.entry_count())
            .finish()
    }
}

impl ResourceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            texts: Cache::builder().build(),
            paths: Cache::builder().build(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 读取模板文件内容（带缓存）
    pub fn get_text(&self, filename: &str) -> Result<Arc<str>, CardImgError> {
        if let Some(hit) = self.texts.get(filename) {
            return Ok(hit);
        }

        let path = self.dir.join(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CardImgError::MissingTemplateFile { path });
            }
            Err(e) => {
                return Err(CardImgError::Io(format!("读取模板文件失败 {}: {e}", path.display())));
            }
        };

        let content: Arc<str> = Arc::from(content);
        self.texts.insert(filename.to_string(), content.clone());
        tracing::debug!("模板文件已缓存: {}", path.display());
        Ok(content)
    }

    /// 获取模板资源的绝对路径（带缓存）；资源不存在时返回空字符串
    pub fn get_resource_path(&self, name: &str) -> String {
        if let Some(hit) = self.paths.get(name) {
            return hit;
        }

        let path = self.dir.join(name);
        if !path.exists() {
            tracing::warn!("资源不存在: {}", path.display());
            return String::new();
        }

        let resolved = std::path::absolute(&path)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        self.paths.insert(name.to_string(), resolved.clone());
        resolved
    }

    /// 已缓存的文本条目数
    pub fn cached_text_count(&self) -> u64 {
        self.texts.run_pending_tasks();
        self.texts.entry_count()
    }
}
