//! 멀티 테넌트 예제 정책
//!
//! Tenant / User / Group 세 엔티티:
//!
//! - Tenant는 admin만 생성할 수 있고, 테넌트 viewer는 자기 테넌트만 봅니다.
//! - User와 Group은 `tenant_id`로 테넌트에 묶입니다.
//! - Group의 `users` edge는 같은 테넌트의 user만 연결할 수 있습니다.

use std::sync::Arc;

use tnt_core::privacy::{PolicyDocument, PrivacyEngine};
use tnt_core::EngineConfig;

use crate::store::Store;

pub const TENANT: &str = "tenant";
pub const USER: &str = "user";
pub const GROUP: &str = "group";

/// 예제 정책 문서
pub const TENANT_POLICY: &str = r#"
mixins:
  base:
    query: [deny_if_no_viewer, allow_if_admin]
    mutation: [deny_if_no_viewer]

entities:
  tenant:
    query:
      default: deny
      rules:
        - mixin: base
        - filter_tenant: { field: id }
        - always_allow
    mutation:
      default: deny
      rules:
        - mixin: base
        - allow_if_admin

  user:
    query:
      default: deny
      rules:
        - mixin: base
        - filter_tenant: {}
        - always_allow
    mutation:
      default: deny
      rules:
        - mixin: base
        - allow_if_admin
        - deny_foreign_tenant: {}
        - filter_tenant: {}
        - always_allow

  group:
    query:
      default: deny
      rules:
        - mixin: base
        - filter_tenant: {}
        - always_allow
    mutation:
      default: deny
      rules:
        - mixin: base
        - deny_mismatched_tenants: { edges: [users] }
        - allow_if_admin
        - deny_foreign_tenant: {}
        - filter_tenant: {}
        - always_allow
"#;

/// 예제 정책 엔진
pub fn tenant_engine(config: EngineConfig) -> tnt_core::Result<PrivacyEngine> {
    PolicyDocument::from_yaml(TENANT_POLICY)?.compile(config)
}

/// 예제 정책으로 보호되는 빈 Store
pub fn tenant_store(config: EngineConfig) -> tnt_core::Result<Store> {
    Ok(Store::new(Arc::new(tenant_engine(config)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_policy_compiles() {
        let engine = tenant_engine(EngineConfig::default()).unwrap();
        assert_eq!(engine.entities(), vec![GROUP, TENANT, USER]);
        assert!(engine.config().require_viewer);
    }
}
