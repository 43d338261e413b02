//! Store 에러 타입

use serde_json::Value;
use thiserror::Error;

/// Store 결과 타입
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store 에러
#[derive(Debug, Error)]
pub enum StoreError {
    /// 정책 엔진 에러 (거부, 설정 오류, 취소)
    #[error(transparent)]
    Privacy(#[from] tnt_core::Error),

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("expected exactly one {entity}, found {count}")]
    NotSingular { entity: String, count: usize },

    #[error("edge '{edge}' references missing {entity} {id}")]
    UnknownEdgeTarget {
        edge: String,
        entity: String,
        id: Value,
    },

    /// Edge 이름이 `id`, 필드 또는 다른 edge와 겹침
    #[error("edge '{edge}' conflicts with another column of {entity}")]
    EdgeConflict { entity: String, edge: String },
}

impl StoreError {
    /// 정책에 의한 거부인지 확인
    pub fn is_denied(&self) -> bool {
        matches!(self, StoreError::Privacy(e) if e.is_denied())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// 정책 엔진 에러
    pub fn privacy(&self) -> Option<&tnt_core::Error> {
        match self {
            StoreError::Privacy(e) => Some(e),
            _ => None,
        }
    }
}
