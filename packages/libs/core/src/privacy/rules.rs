//! 내장 규칙
//!
//! 멀티 테넌트 애플리케이션에서 자주 쓰이는 규칙 모음입니다.

use serde_json::Value;

use super::operation::{OpCategory, OpKind, Operation};
use super::predicate::Predicate;
use super::rule::{DecisionRule, FilterRule, RuleResult};
use super::verdict::{DenyReason, Narrowing, Verdict};
use crate::viewer::{Context, Role};

/// Viewer가 없으면 거부
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyIfNoViewer;

impl DecisionRule for DenyIfNoViewer {
    fn name(&self) -> &str {
        "deny_if_no_viewer"
    }

    fn evaluate(&self, ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(match ctx.viewer() {
            Some(_) => Verdict::Skip,
            None => Verdict::Deny(DenyReason::ViewerMissing),
        })
    }
}

/// 관리자면 허용
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowIfAdmin;

impl DecisionRule for AllowIfAdmin {
    fn name(&self) -> &str {
        "allow_if_admin"
    }

    fn evaluate(&self, ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(match ctx.viewer() {
            Some(viewer) if viewer.is_admin() => Verdict::Allow,
            _ => Verdict::Skip,
        })
    }
}

/// 특정 역할이면 허용
#[derive(Debug, Clone)]
pub struct AllowIfRole {
    role: Role,
    name: String,
}

impl AllowIfRole {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            name: format!("allow_if_role({})", role),
        }
    }
}

impl DecisionRule for AllowIfRole {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(match ctx.viewer() {
            Some(viewer) if viewer.has_role(self.role) => Verdict::Allow,
            _ => Verdict::Skip,
        })
    }
}

/// 특정 역할이 아니면 거부
#[derive(Debug, Clone)]
pub struct DenyUnlessRole {
    role: Role,
    name: String,
}

impl DenyUnlessRole {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            name: format!("deny_unless_role({})", role),
        }
    }
}

impl DecisionRule for DenyUnlessRole {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(match ctx.viewer() {
            Some(viewer) if viewer.has_role(self.role) => Verdict::Skip,
            Some(_) => Verdict::deny(&self.name, format!("role '{}' required", self.role)),
            None => Verdict::Deny(DenyReason::ViewerMissing),
        })
    }
}

/// 항상 허용
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

impl DecisionRule for AlwaysAllow {
    fn name(&self) -> &str {
        "always_allow"
    }

    fn evaluate(&self, _ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(Verdict::Allow)
    }
}

/// 항상 거부
#[derive(Debug, Clone)]
pub struct AlwaysDeny {
    reason: String,
}

impl AlwaysDeny {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for AlwaysDeny {
    fn default() -> Self {
        Self::new("operation not permitted")
    }
}

impl DecisionRule for AlwaysDeny {
    fn name(&self) -> &str {
        "always_deny"
    }

    fn evaluate(&self, _ctx: &Context, _op: &Operation) -> RuleResult<Verdict> {
        Ok(Verdict::deny(self.name(), &self.reason))
    }
}

/// 테넌트 필터
///
/// Read/Update/Delete 대상을 viewer의 테넌트 소유 row로 제한합니다.
/// 테넌트 정보가 없는 viewer에게는 아무 row도 보이지 않습니다.
#[derive(Debug, Clone)]
pub struct FilterTenant {
    field: String,
}

impl FilterTenant {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Default for FilterTenant {
    fn default() -> Self {
        Self::new("tenant_id")
    }
}

impl FilterRule for FilterTenant {
    fn name(&self) -> &str {
        "filter_tenant"
    }

    fn narrow(&self, ctx: &Context, op: &Operation) -> RuleResult<Narrowing> {
        if !op.kind().is_predicated() {
            return Ok(Narrowing::Unchanged);
        }

        Ok(match ctx.viewer().and_then(|v| v.tenant()) {
            Some(tenant) => {
                Narrowing::Restrict(Predicate::everything().and_eq(self.field.clone(), tenant.0))
            }
            None => Narrowing::Nothing,
        })
    }
}

/// 다른 테넌트로 쓰기 거부
///
/// 테넌트에 바인딩된 viewer가 Create/Update에서 `field`를 다른 테넌트로 설정하면 거부합니다.
/// 같은 viewer의 Create가 `field`를 비워 두어도 거부합니다.
#[derive(Debug, Clone)]
pub struct DenyForeignTenant {
    field: String,
}

impl DenyForeignTenant {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl DecisionRule for DenyForeignTenant {
    fn name(&self) -> &str {
        "deny_foreign_tenant"
    }

    fn evaluate(&self, ctx: &Context, op: &Operation) -> RuleResult<Verdict> {
        if !matches!(op.kind(), OpKind::Create | OpKind::Update) {
            return Ok(Verdict::Skip);
        }

        let Some(tenant) = ctx.viewer().and_then(|v| v.tenant()) else {
            return Ok(Verdict::Skip);
        };
        let Some(value) = op.field(&self.field) else {
            // 생성되는 row는 반드시 테넌트에 속해야 함
            if op.kind() == OpKind::Create {
                return Ok(Verdict::deny(
                    self.name(),
                    format!("missing tenant information in mutation ({})", self.field),
                ));
            }
            return Ok(Verdict::Skip);
        };

        if value == &Value::from(tenant.0) {
            Ok(Verdict::Skip)
        } else {
            Ok(Verdict::deny(
                self.name(),
                format!("viewer of tenant {} cannot write {} = {}", tenant, self.field, value),
            ))
        }
    }
}

/// 연결 대상 테넌트 불일치 거부
///
/// 작업이 `field`를 설정할 때, 지정된 edge의 대상 중 하나라도
/// 다른 `field` 값을 가지면 거부합니다. `field` 없이 edge를 연결해도 거부합니다.
#[derive(Debug, Clone)]
pub struct DenyMismatchedTenants {
    field: String,
    edges: Vec<String>,
}

impl DenyMismatchedTenants {
    pub fn new(
        field: impl Into<String>,
        edges: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            field: field.into(),
            edges: edges.into_iter().map(Into::into).collect(),
        }
    }
}

impl DecisionRule for DenyMismatchedTenants {
    fn name(&self) -> &str {
        "deny_mismatched_tenants"
    }

    fn evaluate(&self, _ctx: &Context, op: &Operation) -> RuleResult<Verdict> {
        if op.category() != OpCategory::Mutation {
            return Ok(Verdict::Skip);
        }
        let Some(expected) = op.field(&self.field) else {
            // 테넌트 없이 다른 row를 연결할 수 없음
            if self.edges.iter().any(|edge| !op.edge(edge).is_empty()) {
                return Ok(Verdict::deny(
                    self.name(),
                    format!("missing tenant information in mutation ({})", self.field),
                ));
            }
            return Ok(Verdict::Skip);
        };

        for edge in &self.edges {
            for target in op.edge(edge) {
                match target.attr(&self.field) {
                    Some(actual) if actual == expected => {}
                    actual => {
                        return Ok(Verdict::deny(
                            self.name(),
                            format!(
                                "{} target {} has {} = {}, expected {}",
                                edge,
                                target.id,
                                self.field,
                                actual.unwrap_or(&Value::Null),
                                expected
                            ),
                        ));
                    }
                }
            }
        }

        Ok(Verdict::Skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::operation::EdgeTarget;
    use crate::viewer::Viewer;

    #[test]
    fn test_deny_if_no_viewer() {
        let op = Operation::create("tenant");
        let rule = DenyIfNoViewer;

        assert_eq!(
            rule.evaluate(&Context::background(), &op).unwrap(),
            Verdict::Deny(DenyReason::ViewerMissing)
        );
        let ctx = Context::background().with_viewer(Viewer::view());
        assert_eq!(rule.evaluate(&ctx, &op).unwrap(), Verdict::Skip);
    }

    #[test]
    fn test_role_rules() {
        let op = Operation::create("tenant");
        let admin = Context::background().with_viewer(Viewer::admin());
        let viewer = Context::background().with_viewer(Viewer::view());

        assert_eq!(AllowIfAdmin.evaluate(&admin, &op).unwrap(), Verdict::Allow);
        assert_eq!(AllowIfAdmin.evaluate(&viewer, &op).unwrap(), Verdict::Skip);

        let rule = AllowIfRole::new(Role::View);
        assert_eq!(rule.evaluate(&viewer, &op).unwrap(), Verdict::Allow);
        assert_eq!(rule.evaluate(&admin, &op).unwrap(), Verdict::Skip);

        let rule = DenyUnlessRole::new(Role::Admin);
        assert_eq!(rule.evaluate(&admin, &op).unwrap(), Verdict::Skip);
        assert!(matches!(
            rule.evaluate(&viewer, &op).unwrap(),
            Verdict::Deny(DenyReason::Rule { .. })
        ));
    }

    #[test]
    fn test_filter_tenant() {
        let rule = FilterTenant::default();
        let ctx = Context::background().with_viewer(Viewer::for_tenant(1));

        assert_eq!(
            rule.narrow(&ctx, &Operation::read("user")).unwrap(),
            Narrowing::Restrict(Predicate::everything().and_eq("tenant_id", 1))
        );
        assert_eq!(
            rule.narrow(&ctx, &Operation::create("user")).unwrap(),
            Narrowing::Unchanged
        );

        // 테넌트 없는 viewer → 아무것도 보이지 않음
        let ctx = Context::background().with_viewer(Viewer::view());
        assert_eq!(
            rule.narrow(&ctx, &Operation::delete("user")).unwrap(),
            Narrowing::Nothing
        );
    }

    #[test]
    fn test_deny_foreign_tenant() {
        let rule = DenyForeignTenant::new("tenant_id");
        let ctx = Context::background().with_viewer(Viewer::for_tenant(1));

        let own = Operation::create("group").with_field("tenant_id", 1);
        assert_eq!(rule.evaluate(&ctx, &own).unwrap(), Verdict::Skip);

        let foreign = Operation::update("group").with_field("tenant_id", 2);
        assert!(matches!(rule.evaluate(&ctx, &foreign).unwrap(), Verdict::Deny(_)));

        // 테넌트 없이 생성 → 거부, 테넌트 필드를 건드리지 않는 수정 → 보류
        let orphan = Operation::create("user").with_field("name", "ghost");
        let verdict = rule.evaluate(&ctx, &orphan).unwrap();
        assert!(matches!(
            verdict,
            Verdict::Deny(DenyReason::Rule { ref message, .. }) if message.starts_with("missing")
        ));
        let rename = Operation::update("user").with_field("name", "ghost");
        assert_eq!(rule.evaluate(&ctx, &rename).unwrap(), Verdict::Skip);

        // 관리자(테넌트 없음)는 판단 보류
        let admin = Context::background().with_viewer(Viewer::admin());
        assert_eq!(rule.evaluate(&admin, &foreign).unwrap(), Verdict::Skip);
        assert_eq!(rule.evaluate(&admin, &orphan).unwrap(), Verdict::Skip);
    }

    #[test]
    fn test_deny_mismatched_tenants() {
        let rule = DenyMismatchedTenants::new("tenant_id", ["users"]);
        let ctx = Context::background().with_viewer(Viewer::admin());

        let matched = Operation::create("group")
            .with_field("tenant_id", 1)
            .with_edge("users", EdgeTarget::new(1).with_attr("tenant_id", 1));
        assert_eq!(rule.evaluate(&ctx, &matched).unwrap(), Verdict::Skip);

        let mixed = matched
            .clone()
            .with_edge("users", EdgeTarget::new(2).with_attr("tenant_id", 2));
        assert!(matches!(rule.evaluate(&ctx, &mixed).unwrap(), Verdict::Deny(_)));

        // tenant 필드를 설정하지 않는 작업은 판단 보류
        let untouched = Operation::update("group").with_field("name", "entgo");
        assert_eq!(rule.evaluate(&ctx, &untouched).unwrap(), Verdict::Skip);

        // tenant 없이 edge만 연결 → 거부
        let tenantless = Operation::create("group")
            .with_field("name", "evil")
            .with_edge("users", EdgeTarget::new(2).with_attr("tenant_id", 2));
        assert!(matches!(rule.evaluate(&ctx, &tenantless).unwrap(), Verdict::Deny(_)));
    }
}
