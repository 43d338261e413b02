//! Viewer 신원 정보

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Viewer 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 관리자 (모든 테넌트 접근)
    Admin,
    /// 조회 전용
    View,
}

impl Role {
    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::View => "view",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "view" => Ok(Role::View),
            other => Err(Error::PolicyParse {
                message: format!("unknown role: {}", other),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 테넌트 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TenantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// 요청 주체
///
/// 생성 후 변경되지 않습니다. 역할 없이 테넌트만 가진 viewer(테넌트 사용자)와
/// 테넌트 없이 역할만 가진 viewer(운영자)가 모두 가능합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(default)]
    role: Option<Role>,

    #[serde(default)]
    tenant: Option<TenantId>,
}

impl Viewer {
    /// 역할/테넌트 없는 viewer
    pub fn new() -> Self {
        Self::default()
    }

    /// 관리자 viewer
    pub fn admin() -> Self {
        Self::new().with_role(Role::Admin)
    }

    /// 조회 전용 viewer
    pub fn view() -> Self {
        Self::new().with_role(Role::View)
    }

    /// 특정 테넌트에 바인딩된 viewer
    pub fn for_tenant(tenant: impl Into<TenantId>) -> Self {
        Self::new().with_tenant(tenant)
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<TenantId>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
