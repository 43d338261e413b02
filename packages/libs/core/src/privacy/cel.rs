//! CEL 조건 규칙
//!
//! CEL(Common Expression Language) 조건식으로 결정 규칙을 정의합니다.
//!
//! # 사용 가능한 변수
//!
//! - `viewer.authenticated`: viewer 존재 여부
//! - `viewer.role`: 역할 (`"admin"`, `"view"`, 없으면 null)
//! - `viewer.tenant`: 테넌트 ID (없으면 null)
//! - `op.entity`, `op.kind`, `op.category`: 작업 정보
//! - `op.fields`: 설정하려는 필드

use std::collections::HashMap;
use std::sync::Arc;

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context as CelContext, Program};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::operation::Operation;
use super::rule::{DecisionRule, RuleError, RuleResult};
use super::verdict::Verdict;
use crate::error::{Error, Result};
use crate::viewer::Context;

/// 조건이 참일 때의 효과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
}

/// CEL 조건 규칙
///
/// 조건이 참이면 `effect`, 거짓이면 Skip입니다.
pub struct CelRule {
    name: String,
    condition: String,
    effect: Effect,
    program: Program,
}

impl CelRule {
    /// 조건식 컴파일
    ///
    /// 잘못된 조건식은 첫 평가가 아니라 정책 구성 시점에 실패합니다.
    pub fn new(condition: impl Into<String>, effect: Effect) -> Result<Self> {
        let condition = condition.into();
        let program = Program::compile(&condition).map_err(|e| Error::CelExpression {
            message: format!("{}: {}", condition, e),
        })?;

        Ok(Self {
            name: format!("cel({})", condition),
            condition,
            effect,
            program,
        })
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    fn variables(ctx: &Context, op: &Operation) -> HashMap<String, Value> {
        let mut vars = HashMap::new();

        let viewer = match ctx.viewer() {
            Some(viewer) => json!({
                "authenticated": true,
                "role": viewer.role().map(|r| r.as_str()),
                "tenant": viewer.tenant().map(|t| t.0),
            }),
            None => json!({
                "authenticated": false,
                "role": null,
                "tenant": null,
            }),
        };
        vars.insert("viewer".to_string(), viewer);

        vars.insert(
            "op".to_string(),
            json!({
                "entity": op.entity(),
                "kind": op.kind().as_str(),
                "category": op.category().as_str(),
                "fields": Value::Object(op.fields().clone()),
            }),
        );

        vars
    }
}

impl DecisionRule for CelRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &Context, op: &Operation) -> RuleResult<Verdict> {
        let mut cel_ctx = CelContext::default();
        for (name, value) in Self::variables(ctx, op) {
            cel_ctx.add_variable_from_value(name, json_to_cel(value));
        }

        let result = self
            .program
            .execute(&cel_ctx)
            .map_err(|e| RuleError::new(e.to_string()))?;

        match (result, self.effect) {
            (CelValue::Bool(false), _) => Ok(Verdict::Skip),
            (CelValue::Bool(true), Effect::Allow) => Ok(Verdict::Allow),
            (CelValue::Bool(true), Effect::Deny) => Ok(Verdict::deny(
                &self.name,
                format!("condition matched: {}", self.condition),
            )),
            _ => Err(RuleError::new("condition did not evaluate to bool")),
        }
    }
}

fn json_to_cel(value: Value) -> CelValue {
    match value {
        Value::Null => CelValue::Null,
        Value::Bool(b) => CelValue::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CelValue::Int(i)
            } else if let Some(u) = n.as_u64() {
                CelValue::UInt(u)
            } else if let Some(f) = n.as_f64() {
                CelValue::Float(f)
            } else {
                CelValue::Null
            }
        }
        Value::String(s) => CelValue::String(s.into()),
        Value::Array(arr) => {
            let values = arr.into_iter().map(json_to_cel).collect::<Vec<_>>();
            CelValue::List(Arc::new(values))
        }
        Value::Object(map) => {
            let mut obj = HashMap::new();
            for (k, v) in map {
                obj.insert(cel_interpreter::objects::Key::from(k), json_to_cel(v));
            }
            CelValue::Map(cel_interpreter::objects::Map { map: Arc::new(obj) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::Viewer;

    #[test]
    fn test_cel_allow_effect() {
        let rule = CelRule::new("viewer.role == 'admin'", Effect::Allow).unwrap();
        let op = Operation::create("tenant");

        let admin = Context::background().with_viewer(Viewer::admin());
        assert_eq!(rule.evaluate(&admin, &op).unwrap(), Verdict::Allow);

        let viewer = Context::background().with_viewer(Viewer::view());
        assert_eq!(rule.evaluate(&viewer, &op).unwrap(), Verdict::Skip);
    }

    #[test]
    fn test_cel_deny_effect_on_fields() {
        let rule = CelRule::new("op.kind == 'update' && op.fields.name == 'root'", Effect::Deny)
            .unwrap();
        let ctx = Context::background().with_viewer(Viewer::admin());

        let op = Operation::update("group").with_field("name", "root");
        assert!(matches!(rule.evaluate(&ctx, &op).unwrap(), Verdict::Deny(_)));

        let op = Operation::update("group").with_field("name", "entgo");
        assert_eq!(rule.evaluate(&ctx, &op).unwrap(), Verdict::Skip);
    }

    #[test]
    fn test_cel_compile_error_fails_construction() {
        let err = CelRule::new("viewer.role ==", Effect::Allow).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_cel_non_bool_is_rule_error() {
        let rule = CelRule::new("op.entity", Effect::Allow).unwrap();
        let ctx = Context::background().with_viewer(Viewer::admin());
        assert!(rule.evaluate(&ctx, &Operation::read("user")).is_err());
    }
}
