//! 결과 조건자 (Predicate)
//!
//! Query/Update/Delete 대상 row를 결정하는 조건입니다.
//! Filter rule은 이 조건자를 좁히기(narrow)만 할 수 있습니다.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 조건 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOp {
    /// 같음 (기본)
    Eq,
    /// 같지 않음
    Ne,
    /// 보다 큼
    Gt,
    /// 보다 크거나 같음
    Gte,
    /// 보다 작음
    Lt,
    /// 보다 작거나 같음
    Lte,
    /// 포함 (IN)
    In,
    /// 미포함 (NOT IN)
    NotIn,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
}

impl PredicateOp {
    /// 문자열에서 파싱 ($gt, $in 등)
    pub fn from_operator(s: &str) -> Option<Self> {
        match s {
            "$eq" => Some(PredicateOp::Eq),
            "$ne" => Some(PredicateOp::Ne),
            "$gt" => Some(PredicateOp::Gt),
            "$gte" => Some(PredicateOp::Gte),
            "$lt" => Some(PredicateOp::Lt),
            "$lte" => Some(PredicateOp::Lte),
            "$in" => Some(PredicateOp::In),
            "$nin" | "$notIn" => Some(PredicateOp::NotIn),
            "$null" | "$isNull" => Some(PredicateOp::IsNull),
            "$notNull" | "$isNotNull" => Some(PredicateOp::IsNotNull),
            _ => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            PredicateOp::Eq => "=",
            PredicateOp::Ne => "!=",
            PredicateOp::Gt => ">",
            PredicateOp::Gte => ">=",
            PredicateOp::Lt => "<",
            PredicateOp::Lte => "<=",
            PredicateOp::In => "IN",
            PredicateOp::NotIn => "NOT IN",
            PredicateOp::IsNull => "IS NULL",
            PredicateOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// 단일 필드 조건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: PredicateOp,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// row가 조건을 만족하는지
    ///
    /// 필드가 없으면 NULL로 취급합니다.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);

        match self.op {
            PredicateOp::Eq => actual == &self.value,
            PredicateOp::Ne => actual != &self.value,
            PredicateOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            PredicateOp::Gte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            PredicateOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            PredicateOp::Lte => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            PredicateOp::In => self
                .value
                .as_array()
                .is_some_and(|values| values.contains(actual)),
            PredicateOp::NotIn => self
                .value
                .as_array()
                .map_or(true, |values| !values.contains(actual)),
            PredicateOp::IsNull => actual.is_null(),
            PredicateOp::IsNotNull => !actual.is_null(),
        }
    }
}

/// 숫자/문자열 비교 (타입이 다르면 비교 불가)
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// 조건자
///
/// 조건들의 AND 결합입니다. `Nothing`은 어떤 row와도 일치하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    All(Vec<Condition>),
    Nothing,
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All(Vec::new())
    }
}

impl Predicate {
    /// 모든 row와 일치하는 조건자
    pub fn everything() -> Self {
        Self::default()
    }

    /// 빈 조건자인지 (좁혀지지 않음)
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Predicate::All(conds) if conds.is_empty())
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Predicate::Nothing)
    }

    /// 조건 목록
    pub fn conditions(&self) -> &[Condition] {
        match self {
            Predicate::All(conds) => conds,
            Predicate::Nothing => &[],
        }
    }

    /// 조건 추가 (AND)
    pub fn and(mut self, condition: Condition) -> Self {
        self.push(condition);
        self
    }

    /// 단순 equality 조건 추가
    pub fn and_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition {
            field: field.into(),
            op: PredicateOp::Eq,
            value: value.into(),
        })
    }

    fn push(&mut self, condition: Condition) {
        if let Predicate::All(conds) = self {
            conds.push(condition);
        }
    }

    /// 다른 조건자와 결합 (AND)
    ///
    /// 어느 한쪽이라도 `Nothing`이면 결과도 `Nothing`입니다.
    pub fn intersect(&mut self, other: Predicate) {
        match other {
            Predicate::Nothing => *self = Predicate::Nothing,
            Predicate::All(conds) => {
                for cond in conds {
                    self.push(cond);
                }
            }
        }
    }

    /// row가 조건자를 만족하는지
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Predicate::All(conds) => conds.iter().all(|c| c.matches(row)),
            Predicate::Nothing => false,
        }
    }

    /// JSON 객체 형태의 조건 파싱
    ///
    /// ```json
    /// { "status": "active" }             // status = 'active'
    /// { "age": { "$gt": 18 } }           // age > 18
    /// { "id": { "$in": [1, 2] } }        // id IN (1, 2)
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, PredicateError> {
        let Some(map) = value.as_object() else {
            return Err(PredicateError::NotAnObject);
        };

        let mut predicate = Predicate::everything();
        for (field, spec) in map {
            match spec {
                Value::Object(ops) => {
                    for (op, value) in ops {
                        let op = PredicateOp::from_operator(op)
                            .ok_or_else(|| PredicateError::InvalidOperator(op.clone()))?;
                        predicate.push(Condition {
                            field: field.clone(),
                            op,
                            value: value.clone(),
                        });
                    }
                }
                Value::Null => predicate.push(Condition {
                    field: field.clone(),
                    op: PredicateOp::IsNull,
                    value: Value::Null,
                }),
                other => predicate.push(Condition {
                    field: field.clone(),
                    op: PredicateOp::Eq,
                    value: other.clone(),
                }),
            }
        }

        Ok(predicate)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Nothing => f.write_str("FALSE"),
            Predicate::All(conds) if conds.is_empty() => f.write_str("TRUE"),
            Predicate::All(conds) => {
                for (i, cond) in conds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    match cond.op {
                        PredicateOp::IsNull | PredicateOp::IsNotNull => {
                            write!(f, "{} {}", cond.field, cond.op.symbol())?
                        }
                        _ => write!(f, "{} {} {}", cond.field, cond.op.symbol(), cond.value)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// 조건자 파싱 에러
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredicateError {
    #[error("predicate must be a JSON object")]
    NotAnObject,

    #[error("invalid operator: {0}")]
    InvalidOperator(String),
}
