//! 공통 에러 타입
//!
//! Privacy 엔진 전체에서 사용되는 에러 타입을 정의합니다.
//! 정상적인 거부(`Denied`)와 정책 설정 오류(configuration error)는 반드시 구분됩니다.

use thiserror::Error;

use crate::privacy::{DenyReason, OpKind, OpState};

pub type Result<T> = std::result::Result<T, Error>;

/// Tenet 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Decision
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("privacy denied: {kind} on '{entity}': {reason}")]
    Denied {
        entity: String,
        kind: OpKind,
        reason: DenyReason,
    },

    #[error("operation cancelled before authorization")]
    Cancelled,

    #[error("invalid operation state: expected {expected}, got {actual}")]
    InvalidState { expected: OpState, actual: OpState },

    // ─────────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("no privacy policy configured for entity '{entity}'")]
    MissingPolicy { entity: String },

    #[error("invalid policy: {message}")]
    InvalidPolicy { message: String },

    #[error("rule '{rule}' failed: {message}")]
    RuleFailed { rule: String, message: String },

    #[error("CEL expression error: {message}")]
    CelExpression { message: String },

    #[error("policy parse error: {message}")]
    PolicyParse { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // IO/Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 정책에 의한 거부인지 (viewer 누락 포함)
    pub fn is_denied(&self) -> bool {
        matches!(self, Error::Denied { .. })
    }

    /// 정책 설정이 잘못된 경우인지
    ///
    /// 운영자가 "사용자가 거부됨"과 "정책 설정이 깨짐"을 구분할 수 있도록 합니다.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingPolicy { .. }
                | Error::InvalidPolicy { .. }
                | Error::RuleFailed { .. }
                | Error::CelExpression { .. }
                | Error::PolicyParse { .. }
                | Error::Yaml(_)
                | Error::Io(_)
        )
    }

    /// 거부 사유 (Denied인 경우)
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Error::Denied { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// HTTP 상태 코드로 변환
    pub fn status_code(&self) -> u16 {
        match self {
            // 401 Unauthorized
            Error::Denied {
                reason: DenyReason::ViewerMissing,
                ..
            } => 401,

            // 403 Forbidden
            Error::Denied { .. } => 403,

            // 409 Conflict
            Error::InvalidState { .. } => 409,

            // 499 Client Closed Request
            Error::Cancelled => 499,

            // 500 Internal Server Error
            _ => 500,
        }
    }

    /// 에러 코드 (클라이언트용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::Denied {
                reason: DenyReason::ViewerMissing,
                ..
            } => "VIEWER_MISSING",
            Error::Denied { .. } => "PRIVACY_DENIED",
            Error::Cancelled => "CANCELLED",
            Error::InvalidState { .. } => "INVALID_OPERATION_STATE",
            Error::MissingPolicy { .. } => "MISSING_POLICY",
            Error::InvalidPolicy { .. } => "INVALID_POLICY",
            Error::RuleFailed { .. } => "RULE_FAILED",
            Error::CelExpression { .. } => "CEL_EXPRESSION_ERROR",
            Error::PolicyParse { .. } => "POLICY_PARSE_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}
