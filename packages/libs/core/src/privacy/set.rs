//! 정책 집합 (Policy Set)
//!
//! 순서가 있는 규칙 목록과 명시적 기본값입니다.
//! 선언된 순서대로 평가하며, 첫 번째 Allow/Deny가 즉시 반환됩니다 (First Decisive Wins).

use std::panic::{self, AssertUnwindSafe};

use super::operation::Operation;
use super::rule::{Rule, RuleResult};
use super::verdict::{Decision, DenyReason, Narrowing};
use crate::error::{Error, Result};
use crate::viewer::Context;

/// 정책 집합 평가 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// 최종 결정
    pub decision: Decision,

    /// 결정을 내린 규칙 (None = 기본값 적용)
    pub decided_by: Option<String>,

    /// Filter rule이 만든 narrowing (선언 순서)
    pub narrowings: Vec<Narrowing>,
}

impl Evaluation {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

/// 정책 집합
///
/// 초기화 후 읽기 전용이며 스레드 간에 잠금 없이 공유됩니다.
#[derive(Debug, Clone)]
pub struct PolicySet {
    name: String,
    rules: Vec<Rule>,
    default: Decision,
}

/// 정책 집합 빌더
#[derive(Debug)]
pub struct PolicySetBuilder {
    name: String,
    rules: Vec<Rule>,
    default: Option<Decision>,
}

impl PolicySetBuilder {
    /// 규칙 추가 (순서 유지)
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// 다른 집합의 규칙을 뒤에 추가 (mixin)
    pub fn extend(mut self, other: &PolicySet) -> Self {
        self.rules.extend(other.rules.iter().cloned());
        self
    }

    /// 모든 규칙이 Skip일 때의 결정
    pub fn default(mut self, decision: Decision) -> Self {
        self.default = Some(decision);
        self
    }

    /// 기본값 deny
    pub fn deny_by_default(self) -> Self {
        let reason = DenyReason::Default {
            policy: self.name.clone(),
        };
        self.default(Decision::Deny(reason))
    }

    /// 기본값 allow (명시적으로만 가능)
    pub fn allow_by_default(self) -> Self {
        self.default(Decision::Allow)
    }

    /// 집합 생성
    ///
    /// 기본값이 지정되지 않으면 실패합니다.
    pub fn build(self) -> Result<PolicySet> {
        let default = self.default.ok_or_else(|| Error::InvalidPolicy {
            message: format!("policy set '{}' has no explicit default", self.name),
        })?;

        Ok(PolicySet {
            name: self.name,
            rules: self.rules,
            default,
        })
    }
}

impl PolicySet {
    pub fn builder(name: impl Into<String>) -> PolicySetBuilder {
        PolicySetBuilder {
            name: name.into(),
            rules: Vec::new(),
            default: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_decision(&self) -> &Decision {
        &self.default
    }

    /// 정책 집합 평가
    ///
    /// 작업을 변경하지 않습니다. narrowing은 결과에 담겨 반환되며,
    /// 적용 여부는 호출자(엔진)가 결정합니다.
    pub fn evaluate(&self, ctx: &Context, op: &Operation) -> Result<Evaluation> {
        let mut narrowings = Vec::new();

        for rule in &self.rules {
            match rule {
                Rule::Decision(decider) => {
                    let verdict = guard(rule, || decider.evaluate(ctx, op))?;
                    tracing::debug!(
                        "policy {} rule {} on {} {}: {:?}",
                        self.name,
                        rule.name(),
                        op.kind(),
                        op.entity(),
                        verdict
                    );

                    if let Some(decision) = verdict.decisive() {
                        return Ok(Evaluation {
                            decision,
                            decided_by: Some(rule.name().to_string()),
                            narrowings,
                        });
                    }
                }
                Rule::Filter(filter) => {
                    let narrowing = guard(rule, || filter.narrow(ctx, op))?;
                    tracing::debug!(
                        "policy {} filter {} on {} {}: {:?}",
                        self.name,
                        rule.name(),
                        op.kind(),
                        op.entity(),
                        narrowing
                    );

                    if narrowing != Narrowing::Unchanged {
                        narrowings.push(narrowing);
                    }
                }
            }
        }

        Ok(Evaluation {
            decision: self.default.clone(),
            decided_by: None,
            narrowings,
        })
    }
}

/// 규칙 실행 (오류와 panic을 설정 오류로 변환)
fn guard<T>(rule: &Rule, f: impl FnOnce() -> RuleResult<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::RuleFailed {
            rule: rule.name().to_string(),
            message: e.message,
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "rule panicked".to_string());
            Err(Error::RuleFailed {
                rule: rule.name().to_string(),
                message,
            })
        }
    }
}
