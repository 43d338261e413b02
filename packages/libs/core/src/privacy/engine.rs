//! Privacy 엔진
//!
//! 데이터 접근 계층이 모든 query/mutation 실행 직전에 호출하는 단일 진입점입니다.
//! 엔티티 타입별 정책을 모아 작업마다 정확히 한 번 평가합니다.

use std::collections::HashMap;

use super::operation::{OpCategory, OpKind, OpState, Operation};
use super::set::{Evaluation, PolicySet};
use super::verdict::{Decision, DenyReason};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::viewer::Context;

/// 엔티티 타입 하나의 정책
///
/// Query와 Mutation은 별도의 규칙 목록을 가집니다.
/// Mutation은 작업 종류(create/update/delete)별로 재정의할 수 있습니다.
#[derive(Debug, Clone)]
pub struct EntityPolicy {
    query: PolicySet,
    mutation: PolicySet,
    by_kind: HashMap<OpKind, PolicySet>,
}

impl EntityPolicy {
    pub fn new(query: PolicySet, mutation: PolicySet) -> Self {
        Self {
            query,
            mutation,
            by_kind: HashMap::new(),
        }
    }

    /// 특정 mutation 종류의 정책 재정의
    pub fn with_kind(mut self, kind: OpKind, set: PolicySet) -> Result<Self> {
        if kind.category() != OpCategory::Mutation {
            return Err(Error::InvalidPolicy {
                message: format!(
                    "per-kind override '{}' must be a mutation kind (create, update, delete)",
                    kind
                ),
            });
        }
        self.by_kind.insert(kind, set);
        Ok(self)
    }

    /// 작업 종류에 해당하는 정책 집합
    pub fn set_for(&self, kind: OpKind) -> &PolicySet {
        match kind.category() {
            OpCategory::Query => &self.query,
            OpCategory::Mutation => self.by_kind.get(&kind).unwrap_or(&self.mutation),
        }
    }

    pub fn query(&self) -> &PolicySet {
        &self.query
    }

    pub fn mutation(&self) -> &PolicySet {
        &self.mutation
    }

    /// 재정의된 mutation 종류 (정렬됨)
    pub fn overrides(&self) -> Vec<(OpKind, &PolicySet)> {
        let mut kinds: Vec<_> = self.by_kind.iter().map(|(k, s)| (*k, s)).collect();
        kinds.sort_by_key(|(k, _)| k.as_str());
        kinds
    }
}

/// Privacy 엔진
///
/// 초기화 후 읽기 전용입니다. `Arc`로 감싸 요청 간에 잠금 없이 공유합니다.
#[derive(Debug, Clone)]
pub struct PrivacyEngine {
    config: EngineConfig,
    policies: HashMap<String, EntityPolicy>,
}

/// 엔진 빌더
#[derive(Debug, Default)]
pub struct PrivacyEngineBuilder {
    config: EngineConfig,
    policies: HashMap<String, EntityPolicy>,
    duplicates: Vec<String>,
}

impl PrivacyEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 엔티티 정책 등록
    pub fn entity(mut self, entity: impl Into<String>, policy: EntityPolicy) -> Self {
        let entity = entity.into();
        if self.policies.insert(entity.clone(), policy).is_some() {
            self.duplicates.push(entity);
        }
        self
    }

    /// 엔진 생성
    ///
    /// 같은 엔티티가 두 번 등록되면 실패합니다.
    pub fn build(self) -> Result<PrivacyEngine> {
        if let Some(entity) = self.duplicates.first() {
            return Err(Error::InvalidPolicy {
                message: format!("duplicate policy for entity '{}'", entity),
            });
        }

        tracing::info!(
            "privacy engine initialized: {} entities, require_viewer={}",
            self.policies.len(),
            self.config.require_viewer
        );

        Ok(PrivacyEngine {
            config: self.config,
            policies: self.policies,
        })
    }
}

impl PrivacyEngine {
    pub fn builder() -> PrivacyEngineBuilder {
        PrivacyEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 등록된 엔티티 이름 (정렬됨)
    pub fn entities(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.policies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn policy(&self, entity: &str) -> Option<&EntityPolicy> {
        self.policies.get(entity)
    }

    /// 작업 평가 (순수)
    ///
    /// 작업의 상태와 조건자를 변경하지 않으므로 같은 입력에 대해 항상 같은 결과를 냅니다.
    pub fn evaluate(&self, ctx: &Context, op: &Operation) -> Result<Evaluation> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let policy = self.policies.get(op.entity()).ok_or_else(|| {
            tracing::error!("no privacy policy configured for entity '{}'", op.entity());
            Error::MissingPolicy {
                entity: op.entity().to_string(),
            }
        })?;

        if self.config.require_viewer && ctx.viewer().is_none() {
            return Ok(Evaluation {
                decision: Decision::Deny(DenyReason::ViewerMissing),
                decided_by: None,
                narrowings: Vec::new(),
            });
        }

        policy.set_for(op.kind()).evaluate(ctx, op).map_err(|e| {
            tracing::error!("policy evaluation failed for {} {}: {}", op.kind(), op.entity(), e);
            e
        })
    }

    /// 작업 인가 (Authorize)
    ///
    /// 허용되면 filter rule의 narrowing을 선언 순서대로 작업의 조건자에 적용합니다.
    /// 거부되면 상태 외에는 작업을 변경하지 않으며 `Error::Denied`를 반환합니다.
    pub fn authorize(&self, ctx: &Context, op: &mut Operation) -> Result<()> {
        let evaluation = self.decide(ctx, op)?;
        match evaluation.decision {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(Error::Denied {
                entity: op.entity().to_string(),
                kind: op.kind(),
                reason,
            }),
        }
    }

    /// 작업 인가 후 평가 결과 반환
    ///
    /// `authorize`와 같은 상태 전이를 한 번만 수행하지만, 거부도 `Ok`로 돌려줍니다.
    /// 반환된 결과가 곧 작업의 조건자를 좁힌 평가입니다.
    pub fn decide(&self, ctx: &Context, op: &mut Operation) -> Result<Evaluation> {
        op.transition(OpState::Pending, OpState::Evaluating)?;

        let evaluation = match self.evaluate(ctx, op) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                op.transition(OpState::Evaluating, OpState::Denied)?;
                return Err(e);
            }
        };

        match &evaluation.decision {
            Decision::Allow => {
                for narrowing in &evaluation.narrowings {
                    if let Some(predicate) = narrowing.clone().into_predicate() {
                        op.narrow(predicate);
                    }
                }
                op.transition(OpState::Evaluating, OpState::Allowed)?;

                tracing::debug!(
                    "allowed {} on {} by {} (request {}), predicate: {}",
                    op.kind(),
                    op.entity(),
                    evaluation.decided_by.as_deref().unwrap_or("default"),
                    ctx.request_id().unwrap_or("-"),
                    op.predicate()
                );
            }
            Decision::Deny(reason) => {
                op.transition(OpState::Evaluating, OpState::Denied)?;

                tracing::info!(
                    "denied {} on {} (request {}): {}",
                    op.kind(),
                    op.entity(),
                    ctx.request_id().unwrap_or("-"),
                    reason
                );
            }
        }

        Ok(evaluation)
    }
}
