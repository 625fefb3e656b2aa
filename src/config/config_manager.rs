// ==========================================
// 促销日历对账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、校验、快照分发
// 存储: JSON 文件 (默认 <config_dir>/promo-reconcile/config.json)
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::override_tables::OverrideTables;
use crate::config::reconcile_config::ReconcileConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// 默认配置目录名
pub const CONFIG_DIR_NAME: &str = "promo-reconcile";

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

// ==========================================
// ConfigSnapshot - 不可变配置快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub reconcile: ReconcileConfig,
    pub overrides: OverrideTables,
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    source: Option<PathBuf>,
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigManager {
    /// 使用内置默认值创建
    pub fn with_defaults() -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(ConfigSnapshot::default())),
        }
    }

    /// 从指定 JSON 文件加载
    ///
    /// # 参数
    /// - path: 配置文件路径
    ///
    /// # 返回
    /// - Err(FileNotFound): 文件不存在
    /// - Err(Parse/Invalid): 格式或阈值非法
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let snapshot = Self::read_snapshot(path)?;

        info!(path = %path.display(), "配置加载完成");
        Ok(Self {
            source: Some(path.to_path_buf()),
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// 从系统配置目录加载; 文件不存在时退回默认值
    pub fn load_default() -> ConfigResult<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在, 使用默认配置");
            return Ok(Self::with_defaults());
        }
        Self::from_path(path)
    }

    /// 默认配置文件路径
    pub fn default_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// 当前配置快照
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 重新读取配置文件; 失败时保留旧快照
    pub fn reload(&self) -> ConfigResult<Arc<ConfigSnapshot>> {
        let Some(path) = &self.source else {
            return Ok(self.snapshot());
        };

        let snapshot = Arc::new(Self::read_snapshot(path)?);
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot.clone(),
            Err(poisoned) => *poisoned.into_inner() = snapshot.clone(),
        }

        info!(path = %path.display(), "配置已重新加载");
        Ok(snapshot)
    }

    fn read_snapshot(path: &Path) -> ConfigResult<ConfigSnapshot> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let snapshot: ConfigSnapshot = serde_json::from_str(&content)?;
        snapshot.reconcile.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_path_overrides_and_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "reconcile": {{"scoring": {{"auto_select_threshold": 90}}}},
                "overrides": {{"brand_overrides": {{"Kiva": "Kiva Confections"}}}}
            }}"#
        )
        .unwrap();

        let manager = ConfigManager::from_path(file.path()).unwrap();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.reconcile.scoring.auto_select_threshold, 90);
        assert_eq!(snapshot.reconcile.scoring.suggest_threshold, 70);
        assert_eq!(
            snapshot.overrides.brand_override("kiva"),
            Some("Kiva Confections")
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"reconcile": {{"scoring": {{"value_gate": 150}}}}}}"#).unwrap();
        let result = ConfigManager::from_path(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigManager::from_path("/nonexistent/promo/config.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_reload_keeps_old_snapshot_on_failure() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let manager = ConfigManager::from_path(file.path()).unwrap();
        let before = manager.snapshot();

        std::fs::write(file.path(), "not json").unwrap();
        assert!(manager.reload().is_err());
        assert_eq!(*manager.snapshot(), *before);
    }
}
