//! 정책 규칙
//!
//! 규칙은 두 종류이며 명시적인 variant로 구분됩니다.
//!
//! - `Decision`: Allow / Deny / Skip 판정을 내림
//! - `Filter`: 조건자를 좁히기만 하고 판정은 내리지 않음 (평가 루프에서 Skip으로 취급)
//!
//! 규칙은 `&Operation`만 받으므로 작업을 직접 변경할 수 없습니다.

use std::fmt;
use std::sync::Arc;

use super::operation::Operation;
use super::verdict::{Narrowing, Verdict};
use crate::viewer::Context;

/// 규칙 내부 오류
///
/// 거부가 아니라 정책 설정 오류로 보고됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RuleError {
    pub message: String,
}

impl RuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// 결정적 규칙
pub trait DecisionRule: Send + Sync {
    /// 규칙 이름 (로그/거부 사유용)
    fn name(&self) -> &str;

    fn evaluate(&self, ctx: &Context, op: &Operation) -> RuleResult<Verdict>;
}

/// Filter 규칙
pub trait FilterRule: Send + Sync {
    fn name(&self) -> &str;

    fn narrow(&self, ctx: &Context, op: &Operation) -> RuleResult<Narrowing>;
}

/// 정책 규칙
#[derive(Clone)]
pub enum Rule {
    Decision(Arc<dyn DecisionRule>),
    Filter(Arc<dyn FilterRule>),
}

impl Rule {
    pub fn decision(rule: impl DecisionRule + 'static) -> Self {
        Rule::Decision(Arc::new(rule))
    }

    pub fn filter(rule: impl FilterRule + 'static) -> Self {
        Rule::Filter(Arc::new(rule))
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Decision(rule) => rule.name(),
            Rule::Filter(rule) => rule.name(),
        }
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, Rule::Filter(_))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Decision(rule) => write!(f, "Decision({})", rule.name()),
            Rule::Filter(rule) => write!(f, "Filter({})", rule.name()),
        }
    }
}

/// 클로저 기반 결정 규칙
struct DecisionFn<F> {
    name: String,
    f: F,
}

impl<F> DecisionRule for DecisionFn<F>
where
    F: Fn(&Context, &Operation) -> RuleResult<Verdict> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &Context, op: &Operation) -> RuleResult<Verdict> {
        (self.f)(ctx, op)
    }
}

/// 클로저 기반 filter 규칙
struct FilterFn<F> {
    name: String,
    f: F,
}

impl<F> FilterRule for FilterFn<F>
where
    F: Fn(&Context, &Operation) -> RuleResult<Narrowing> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn narrow(&self, ctx: &Context, op: &Operation) -> RuleResult<Narrowing> {
        (self.f)(ctx, op)
    }
}

/// 클로저로 결정 규칙 생성
pub fn decision<F>(name: impl Into<String>, f: F) -> Rule
where
    F: Fn(&Context, &Operation) -> RuleResult<Verdict> + Send + Sync + 'static,
{
    Rule::decision(DecisionFn {
        name: name.into(),
        f,
    })
}

/// 클로저로 filter 규칙 생성
pub fn filter<F>(name: impl Into<String>, f: F) -> Rule
where
    F: Fn(&Context, &Operation) -> RuleResult<Narrowing> + Send + Sync + 'static,
{
    Rule::filter(FilterFn {
        name: name.into(),
        f,
    })
}
