//! 엔진 설정

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// viewer 없는 요청을 정책 평가 전에 거부 (기본: true)
    #[serde(default = "default_require_viewer")]
    pub require_viewer: bool,

    /// 정책 문서 경로
    #[serde(default)]
    pub policy_path: Option<PathBuf>,
}

fn default_require_viewer() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_viewer: default_require_viewer(),
            policy_path: None,
        }
    }
}

impl EngineConfig {
    /// 환경변수에서 설정 로드
    ///
    /// - `TNT_REQUIRE_VIEWER`: `false`일 때만 비활성화 (그 외의 값은 true)
    /// - `TNT_POLICY_PATH`: 정책 문서 경로
    pub fn from_env() -> Self {
        Self {
            require_viewer: env::var("TNT_REQUIRE_VIEWER")
                .map(|v| !v.trim().eq_ignore_ascii_case("false"))
                .unwrap_or(true),

            policy_path: env::var("TNT_POLICY_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_require_viewer(mut self, require_viewer: bool) -> Self {
        self.require_viewer = require_viewer;
        self
    }

    pub fn with_policy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.policy_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requires_viewer() {
        let config = EngineConfig::default();
        assert!(config.require_viewer);
        assert!(config.policy_path.is_none());

        let config: EngineConfig = serde_yaml::from_str("policy_path: ./policy.yaml").unwrap();
        assert!(config.require_viewer);
        assert_eq!(config.policy_path, Some(PathBuf::from("./policy.yaml")));
    }
}
