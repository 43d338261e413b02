//! 평가 대상 작업 (Operation)
//!
//! 데이터 접근 계층이 실행 직전에 만드는 작업 표현입니다.
//! 엔진은 조건자를 좁힐 수 있지만 작업 자체를 해석하지는 않습니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::predicate::Predicate;
use crate::error::{Error, Result};

/// CRUD 작업 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Create,
    Read,
    Update,
    Delete,
}

impl OpKind {
    /// 문자열에서 파싱
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" | "insert" => Some(OpKind::Create),
            "read" | "select" | "query" => Some(OpKind::Read),
            "update" => Some(OpKind::Update),
            "delete" => Some(OpKind::Delete),
            _ => None,
        }
    }

    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Create => "create",
            OpKind::Read => "read",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        }
    }

    pub fn category(&self) -> OpCategory {
        match self {
            OpKind::Read => OpCategory::Query,
            OpKind::Create | OpKind::Update | OpKind::Delete => OpCategory::Mutation,
        }
    }

    /// 조건자로 대상 row를 고르는 작업인지 (Create 제외)
    pub fn is_predicated(&self) -> bool {
        !matches!(self, OpKind::Create)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 작업 범주 (Query / Mutation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCategory {
    Query,
    Mutation,
}

impl OpCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpCategory::Query => "query",
            OpCategory::Mutation => "mutation",
        }
    }
}

impl fmt::Display for OpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 작업 상태
///
/// `Pending -> Evaluating -> {Allowed, Denied}`, `Allowed -> Executed`.
/// `Denied`는 최종 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpState {
    Pending,
    Evaluating,
    Allowed,
    Denied,
    Executed,
}

impl fmt::Display for OpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpState::Pending => "pending",
            OpState::Evaluating => "evaluating",
            OpState::Allowed => "allowed",
            OpState::Denied => "denied",
            OpState::Executed => "executed",
        };
        f.write_str(s)
    }
}

/// Edge 대상 (연결하려는 다른 엔티티)
///
/// 데이터 접근 계층이 평가 전에 대상 row의 속성을 채웁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTarget {
    pub id: Value,
    #[serde(default)]
    pub attrs: Map<String, Value>,
}

impl EdgeTarget {
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}

/// 평가 대상 작업
#[derive(Debug, Clone)]
pub struct Operation {
    entity: String,
    kind: OpKind,
    fields: Map<String, Value>,
    edges: BTreeMap<String, Vec<EdgeTarget>>,
    predicate: Predicate,
    state: OpState,
}

impl Operation {
    pub fn new(entity: impl Into<String>, kind: OpKind) -> Self {
        Self {
            entity: entity.into(),
            kind,
            fields: Map::new(),
            edges: BTreeMap::new(),
            predicate: Predicate::everything(),
            state: OpState::Pending,
        }
    }

    pub fn create(entity: impl Into<String>) -> Self {
        Self::new(entity, OpKind::Create)
    }

    pub fn read(entity: impl Into<String>) -> Self {
        Self::new(entity, OpKind::Read)
    }

    pub fn update(entity: impl Into<String>) -> Self {
        Self::new(entity, OpKind::Update)
    }

    pub fn delete(entity: impl Into<String>) -> Self {
        Self::new(entity, OpKind::Delete)
    }

    /// 설정할 필드 추가
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Edge 대상 추가
    pub fn with_edge(mut self, edge: impl Into<String>, target: EdgeTarget) -> Self {
        self.edges.entry(edge.into()).or_default().push(target);
        self
    }

    /// 호출자가 지정한 초기 조건자
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn category(&self) -> OpCategory {
        self.kind.category()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn edges(&self) -> &BTreeMap<String, Vec<EdgeTarget>> {
        &self.edges
    }

    pub fn edge(&self, name: &str) -> &[EdgeTarget] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    /// 실행 완료 표시
    ///
    /// `Allowed` 상태에서만 가능합니다.
    pub fn mark_executed(&mut self) -> Result<()> {
        self.transition(OpState::Allowed, OpState::Executed)
    }

    pub(crate) fn transition(&mut self, expected: OpState, next: OpState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected,
                actual: self.state,
            });
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn narrow(&mut self, predicate: Predicate) {
        self.predicate.intersect(predicate);
    }
}
