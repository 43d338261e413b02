//! 정책 문서 (YAML)
//!
//! `policy.yaml`의 구조를 정의하고 `PrivacyEngine`으로 컴파일합니다.
//!
//! ```yaml
//! require_viewer: true
//! mixins:
//!   base:
//!     query: [deny_if_no_viewer, allow_if_admin]
//!     mutation: [deny_if_no_viewer, allow_if_admin]
//! entities:
//!   user:
//!     query:
//!       default: deny
//!       rules:
//!         - mixin: base
//!         - filter_tenant: { field: tenant_id }
//!         - always_allow
//!     mutation:
//!       default: deny
//!       rules:
//!         mixin: base
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::cel::{CelRule, Effect};
use super::engine::{EntityPolicy, PrivacyEngine};
use super::operation::{OpCategory, OpKind};
use super::rule::Rule;
use super::rules::{
    AllowIfAdmin, AllowIfRole, AlwaysAllow, AlwaysDeny, DenyForeignTenant, DenyIfNoViewer,
    DenyMismatchedTenants, DenyUnlessRole, FilterTenant,
};
use super::set::PolicySet;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::viewer::Role;

/// 전체 정책 문서
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyDocument {
    /// 설정 시 EngineConfig의 값을 덮어씀
    #[serde(default)]
    pub require_viewer: Option<bool>,

    /// 재사용 가능한 규칙 묶음
    #[serde(default)]
    pub mixins: BTreeMap<String, MixinSpec>,

    /// 엔티티별 정책
    #[serde(default)]
    pub entities: BTreeMap<String, EntitySpec>,
}

/// Mixin 정의 (범주별 규칙 목록)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MixinSpec {
    #[serde(default)]
    pub query: RuleList,

    #[serde(default)]
    pub mutation: RuleList,
}

/// 엔티티 정책 정의
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitySpec {
    pub query: Option<SetSpec>,
    pub mutation: Option<SetSpec>,

    /// Mutation 종류별 재정의
    #[serde(default)]
    pub create: Option<SetSpec>,
    #[serde(default)]
    pub update: Option<SetSpec>,
    #[serde(default)]
    pub delete: Option<SetSpec>,
}

/// 정책 집합 정의
#[derive(Debug, Clone, Deserialize)]
pub struct SetSpec {
    /// 반드시 명시해야 함 (없으면 컴파일 실패)
    #[serde(default)]
    pub default: Option<DefaultSpec>,

    #[serde(default)]
    pub rules: RuleList,
}

/// 기본 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultSpec {
    Allow,
    Deny,
}

/// 규칙 정의
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSpec {
    DenyIfNoViewer,
    AllowIfAdmin,
    AlwaysAllow,
    AlwaysDeny,
    AllowIfRole {
        role: Role,
    },
    DenyUnlessRole {
        role: Role,
    },
    FilterTenant {
        #[serde(default = "default_tenant_field")]
        field: String,
    },
    DenyForeignTenant {
        #[serde(default = "default_tenant_field")]
        field: String,
    },
    DenyMismatchedTenants {
        #[serde(default = "default_tenant_field")]
        field: String,
        edges: Vec<String>,
    },
    Cel {
        condition: String,
        effect: Effect,
    },
    /// Mixin 규칙을 이 위치에 펼침
    Mixin(String),
}

fn default_tenant_field() -> String {
    "tenant_id".to_string()
}

/// 규칙 목록 (ordered array)
///
/// 단일 규칙만 적는 shorthand도 허용합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleList(pub Vec<RuleSpec>);

impl<'de> Deserialize<'de> for RuleList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        let value = serde_yaml::Value::deserialize(deserializer)?;
        let items = match value {
            serde_yaml::Value::Null => Vec::new(),
            serde_yaml::Value::Sequence(seq) => seq,
            // Shorthand: 단일 규칙 → Vec<RuleSpec>
            single => vec![single],
        };

        items
            .into_iter()
            .map(|item| {
                serde_yaml::with::singleton_map::deserialize(item).map_err(D::Error::custom)
            })
            .collect::<std::result::Result<Vec<RuleSpec>, _>>()
            .map(RuleList)
    }
}

impl PolicyDocument {
    /// YAML 문자열 파싱
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let doc: PolicyDocument = serde_yaml::from_str(yaml)?;
        Ok(doc)
    }

    /// 파일에서 로드
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// 설정의 `policy_path`에서 로드 후 컴파일
    pub fn load(config: EngineConfig) -> Result<PrivacyEngine> {
        let path = config.policy_path.clone().ok_or_else(|| Error::InvalidPolicy {
            message: "no policy path configured (set TNT_POLICY_PATH)".to_string(),
        })?;
        tracing::info!("loading privacy policy from {}", path.display());
        Self::from_path(&path)?.compile(config)
    }

    /// 엔진으로 컴파일
    ///
    /// 기본값 누락, 알 수 없는 mixin, 잘못된 CEL 조건은 모두 여기서 실패합니다.
    pub fn compile(&self, config: EngineConfig) -> Result<PrivacyEngine> {
        let config = match self.require_viewer {
            Some(require_viewer) => config.with_require_viewer(require_viewer),
            None => config,
        };

        let mut builder = PrivacyEngine::builder().config(config);

        for (entity, spec) in &self.entities {
            let query = self.compile_set(entity, "query", spec.query.as_ref(), OpCategory::Query)?;
            let mutation = self.compile_set(
                entity,
                "mutation",
                spec.mutation.as_ref(),
                OpCategory::Mutation,
            )?;
            let mut policy = EntityPolicy::new(query, mutation);

            let overrides = [
                (OpKind::Create, &spec.create),
                (OpKind::Update, &spec.update),
                (OpKind::Delete, &spec.delete),
            ];
            for (kind, set) in overrides {
                if let Some(set) = set {
                    let compiled =
                        self.compile_set(entity, kind.as_str(), Some(set), OpCategory::Mutation)?;
                    policy = policy.with_kind(kind, compiled)?;
                }
            }

            builder = builder.entity(entity.clone(), policy);
        }

        builder.build()
    }

    fn compile_set(
        &self,
        entity: &str,
        label: &str,
        spec: Option<&SetSpec>,
        category: OpCategory,
    ) -> Result<PolicySet> {
        let name = format!("{}.{}", entity, label);
        let spec = spec.ok_or_else(|| Error::InvalidPolicy {
            message: format!("entity '{}' has no {} policy", entity, label),
        })?;

        let mut builder = PolicySet::builder(name.clone());
        for rule in &spec.rules.0 {
            match rule {
                RuleSpec::Mixin(mixin) => {
                    for rule in self.expand_mixin(mixin, category)? {
                        builder = builder.rule(rule);
                    }
                }
                other => builder = builder.rule(build_rule(other)?),
            }
        }

        builder = match spec.default {
            Some(DefaultSpec::Deny) => builder.deny_by_default(),
            Some(DefaultSpec::Allow) => builder.allow_by_default(),
            None => builder,
        };
        builder.build()
    }

    fn expand_mixin(&self, name: &str, category: OpCategory) -> Result<Vec<Rule>> {
        let mixin = self.mixins.get(name).ok_or_else(|| Error::InvalidPolicy {
            message: format!("unknown mixin '{}'", name),
        })?;
        let rules = match category {
            OpCategory::Query => &mixin.query,
            OpCategory::Mutation => &mixin.mutation,
        };

        rules
            .0
            .iter()
            .map(|rule| match rule {
                RuleSpec::Mixin(inner) => Err(Error::InvalidPolicy {
                    message: format!("mixin '{}' cannot include mixin '{}'", name, inner),
                }),
                other => build_rule(other),
            })
            .collect()
    }
}

/// 규칙 정의 → 규칙
fn build_rule(spec: &RuleSpec) -> Result<Rule> {
    Ok(match spec {
        RuleSpec::DenyIfNoViewer => Rule::decision(DenyIfNoViewer),
        RuleSpec::AllowIfAdmin => Rule::decision(AllowIfAdmin),
        RuleSpec::AlwaysAllow => Rule::decision(AlwaysAllow),
        RuleSpec::AlwaysDeny => Rule::decision(AlwaysDeny::default()),
        RuleSpec::AllowIfRole { role } => Rule::decision(AllowIfRole::new(*role)),
        RuleSpec::DenyUnlessRole { role } => Rule::decision(DenyUnlessRole::new(*role)),
        RuleSpec::FilterTenant { field } => Rule::filter(FilterTenant::new(field.clone())),
        RuleSpec::DenyForeignTenant { field } => {
            Rule::decision(DenyForeignTenant::new(field.clone()))
        }
        RuleSpec::DenyMismatchedTenants { field, edges } => {
            Rule::decision(DenyMismatchedTenants::new(field.clone(), edges.clone()))
        }
        RuleSpec::Cel { condition, effect } => {
            Rule::decision(CelRule::new(condition.clone(), *effect)?)
        }
        RuleSpec::Mixin(name) => {
            return Err(Error::InvalidPolicy {
                message: format!("mixin '{}' must be expanded by the document", name),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::operation::Operation;
    use crate::privacy::predicate::Predicate;
    use crate::viewer::{Context, Viewer};

    fn sample_yaml() -> &'static str {
        r#"
mixins:
  base:
    query: [deny_if_no_viewer, allow_if_admin]
    mutation: [deny_if_no_viewer, allow_if_admin]
entities:
  tenant:
    query:
      default: deny
      rules:
        - mixin: base
        - always_allow
    mutation:
      default: deny
      rules:
        mixin: base
  user:
    query:
      default: deny
      rules:
        - mixin: base
        - filter_tenant: { field: tenant_id }
        - always_allow
    mutation:
      default: deny
      rules:
        - mixin: base
    delete:
      default: deny
      rules:
        - allow_if_role: { role: admin }
"#
    }

    #[test]
    fn test_parse_document() {
        let doc = PolicyDocument::from_yaml(sample_yaml()).unwrap();
        assert_eq!(doc.mixins["base"].query.0.len(), 2);

        let user = &doc.entities["user"];
        let query = user.query.as_ref().unwrap();
        assert_eq!(query.default, Some(DefaultSpec::Deny));
        assert_eq!(
            query.rules.0,
            vec![
                RuleSpec::Mixin("base".to_string()),
                RuleSpec::FilterTenant {
                    field: "tenant_id".to_string()
                },
                RuleSpec::AlwaysAllow,
            ]
        );

        // Shorthand: 단일 규칙 → 1개 목록
        let tenant_mutation = doc.entities["tenant"].mutation.as_ref().unwrap();
        assert_eq!(tenant_mutation.rules.0, vec![RuleSpec::Mixin("base".to_string())]);
    }

    #[test]
    fn test_compile_expands_mixins_in_place() {
        let engine = PolicyDocument::from_yaml(sample_yaml())
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap();

        assert_eq!(engine.entities(), vec!["tenant", "user"]);
        let user = engine.policy("user").unwrap();
        let names: Vec<_> = user.query().rules().iter().map(Rule::name).collect();
        assert_eq!(
            names,
            vec!["deny_if_no_viewer", "allow_if_admin", "filter_tenant", "always_allow"]
        );
        assert_eq!(user.set_for(OpKind::Delete).name(), "user.delete");

        let ctx = Context::background().with_viewer(Viewer::for_tenant(5));
        let mut op = Operation::read("user");
        engine.authorize(&ctx, &mut op).unwrap();
        assert_eq!(op.predicate(), &Predicate::everything().and_eq("tenant_id", 5));
    }

    #[test]
    fn test_missing_default_fails() {
        let yaml = r#"
entities:
  user:
    query:
      rules: [always_allow]
    mutation:
      default: deny
"#;
        let err = PolicyDocument::from_yaml(yaml)
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPolicy { ref message } if message.contains("user.query")
        ));
    }

    #[test]
    fn test_missing_set_fails() {
        let yaml = r#"
entities:
  user:
    query:
      default: allow
"#;
        let err = PolicyDocument::from_yaml(yaml)
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_and_nested_mixins_fail() {
        let unknown = r#"
entities:
  user:
    query: { default: deny, rules: [{ mixin: nope }] }
    mutation: { default: deny }
"#;
        assert!(PolicyDocument::from_yaml(unknown)
            .unwrap()
            .compile(EngineConfig::default())
            .is_err());

        let nested = r#"
mixins:
  a:
    query: [{ mixin: b }]
  b:
    query: [always_allow]
entities:
  user:
    query: { default: deny, rules: [{ mixin: a }] }
    mutation: { default: deny }
"#;
        let err = PolicyDocument::from_yaml(nested)
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("cannot include mixin"));
    }

    #[test]
    fn test_invalid_cel_fails_at_compile() {
        let yaml = r#"
entities:
  user:
    query:
      default: deny
      rules:
        - cel: { condition: "viewer.role ==", effect: allow }
    mutation: { default: deny }
"#;
        let err = PolicyDocument::from_yaml(yaml)
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::CelExpression { .. }));
    }

    #[test]
    fn test_document_overrides_require_viewer() {
        let yaml = r#"
require_viewer: false
entities:
  post:
    query: { default: allow }
    mutation: { default: deny }
"#;
        let engine = PolicyDocument::from_yaml(yaml)
            .unwrap()
            .compile(EngineConfig::default())
            .unwrap();
        assert!(!engine.config().require_viewer);

        let mut op = Operation::read("post");
        engine.authorize(&Context::background(), &mut op).unwrap();
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, sample_yaml()).unwrap();

        let engine = PolicyDocument::load(EngineConfig::default().with_policy_path(&path)).unwrap();
        assert!(engine.policy("tenant").is_some());

        let missing = PolicyDocument::from_path(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, Error::Io(_)));
        assert!(PolicyDocument::load(EngineConfig::default()).is_err());
    }
}
