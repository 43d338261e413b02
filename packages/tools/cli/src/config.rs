//! CLI 설정

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tnt_core::EngineConfig;

/// CLI 설정 (`~/.tnt/config.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// 기본 정책 문서 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_path: Option<PathBuf>,
}

impl CliConfig {
    /// 설정 파일 경로
    fn config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?;
        Ok(home.join(".tnt").join("config.json"))
    }

    /// 설정 로드
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: CliConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 설정 저장
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// 설정 삭제
    pub fn clear() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// 정책 문서 경로 결정 (--policy > config.json > TNT_POLICY_PATH)
    pub fn policy_path(
        &self,
        flag: Option<&Path>,
        engine: &EngineConfig,
    ) -> anyhow::Result<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.policy_path.clone())
            .or_else(|| engine.policy_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Policy not configured. Use --policy, 'tnt config set --policy <file>' or set TNT_POLICY_PATH"
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_path_precedence() {
        let engine = EngineConfig::default().with_policy_path("/env/policy.yaml");
        let config = CliConfig {
            policy_path: Some(PathBuf::from("/home/policy.yaml")),
        };

        let flag = PathBuf::from("./policy.yaml");
        assert_eq!(config.policy_path(Some(&flag), &engine).unwrap(), flag);
        assert_eq!(
            config.policy_path(None, &engine).unwrap(),
            PathBuf::from("/home/policy.yaml")
        );
        assert_eq!(
            CliConfig::default().policy_path(None, &engine).unwrap(),
            PathBuf::from("/env/policy.yaml")
        );
        assert!(CliConfig::default()
            .policy_path(None, &EngineConfig::default())
            .is_err());
    }
}
