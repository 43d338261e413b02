//! 평가 결과 타입

use std::fmt;

use serde::{Deserialize, Serialize};

use super::predicate::Predicate;

/// 거부 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DenyReason {
    /// 컨텍스트에 viewer가 없음
    ViewerMissing,

    /// 규칙이 명시적으로 거부
    Rule { rule: String, message: String },

    /// 결정적 규칙이 없어 기본값(deny)이 적용됨
    Default { policy: String },
}

impl DenyReason {
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        DenyReason::Rule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::ViewerMissing => f.write_str("viewer missing from context"),
            DenyReason::Rule { rule, message } => write!(f, "{} ({})", message, rule),
            DenyReason::Default { policy } => {
                write!(f, "no rule allowed the operation (policy {})", policy)
            }
        }
    }
}

/// 결정적 규칙의 판정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
    /// 판단 보류 (다음 규칙으로)
    Skip,
}

impl Verdict {
    /// 규칙 이름과 메시지로 거부 판정 생성
    pub fn deny(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Verdict::Deny(DenyReason::rule(rule, message))
    }

    /// Skip이 아니면 최종 결정으로 변환
    pub fn decisive(self) -> Option<Decision> {
        match self {
            Verdict::Allow => Some(Decision::Allow),
            Verdict::Deny(reason) => Some(Decision::Deny(reason)),
            Verdict::Skip => None,
        }
    }
}

/// 정책 집합의 최종 결정
///
/// 정책 집합 평가는 항상 이 두 값 중 하나로 끝납니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl From<Decision> for Verdict {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Allow => Verdict::Allow,
            Decision::Deny(reason) => Verdict::Deny(reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::Deny(reason) => write!(f, "deny: {}", reason),
        }
    }
}

/// Filter rule의 효과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "predicate", rename_all = "snake_case")]
pub enum Narrowing {
    /// 적용 대상 아님
    Unchanged,
    /// 조건자에 조건 추가
    Restrict(Predicate),
    /// 어떤 row도 보이지 않음
    Nothing,
}

impl Narrowing {
    /// 조건자 형태로 변환 (Unchanged = None)
    pub fn into_predicate(self) -> Option<Predicate> {
        match self {
            Narrowing::Unchanged => None,
            Narrowing::Restrict(predicate) => Some(predicate),
            Narrowing::Nothing => Some(Predicate::Nothing),
        }
    }
}
