//! 프라이버시 정책 엔진
//!
//! 엔티티 작업(create/read/update/delete) 전에 정책을 평가해
//! 허용, 거부, 또는 조회 범위 축소(narrowing)를 결정합니다.
//!
//! # 평가 순서
//!
//! 1. 엔티티에 해당하는 정책 집합 선택 (query 또는 mutation)
//! 2. 규칙을 선언 순서대로 평가, 첫 번째 Allow/Deny에서 종료
//! 3. 모두 Skip이면 집합의 기본값
//! 4. Allow일 때만 filter narrowing을 작업에 적용

mod cel;
mod document;
mod engine;
mod operation;
mod predicate;
pub mod rule;
pub mod rules;
mod set;
mod verdict;

pub use cel::{CelRule, Effect};
pub use document::{
    DefaultSpec, EntitySpec, MixinSpec, PolicyDocument, RuleList, RuleSpec, SetSpec,
};
pub use engine::{EntityPolicy, PrivacyEngine, PrivacyEngineBuilder};
pub use operation::{EdgeTarget, OpCategory, OpKind, OpState, Operation};
pub use predicate::{Condition, Predicate, PredicateError, PredicateOp};
pub use rule::{DecisionRule, FilterRule, Rule, RuleError, RuleResult};
pub use set::{Evaluation, PolicySet, PolicySetBuilder};
pub use verdict::{Decision, DenyReason, Narrowing, Verdict};
