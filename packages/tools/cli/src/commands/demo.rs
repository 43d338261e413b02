//! 멀티 테넌트 데모
//!
//! 예제 정책으로 보호되는 Store에서 Tenant / User / Group 시나리오를 실행합니다.

use serde_json::{json, Value};
use tnt_core::privacy::Predicate;
use tnt_core::viewer::{Context, Viewer};
use tnt_core::EngineConfig;
use tnt_store::demo::{tenant_store, GROUP, TENANT, USER};
use tnt_store::{CreateRequest, Row, StoreResult};

pub fn run(engine_config: EngineConfig) -> anyhow::Result<()> {
    let store = tenant_store(engine_config)?;
    let background = Context::background();

    // viewer 없음 → 거부
    expect_denied(
        "create tenant without viewer",
        store.create(&background, TENANT, row(json!({"name": "GitHub"}))),
    )?;

    // admin이 아닌 viewer → 거부
    let view = background.with_viewer(Viewer::view());
    expect_denied(
        "create tenant as view",
        store.create(&view, TENANT, row(json!({"name": "GitHub"}))),
    )?;

    let admin = background.with_viewer(Viewer::admin()).with_request_id("demo-admin");
    let hub = store.create(&admin, TENANT, row(json!({"name": "GitHub"})))?;
    println!("{}", describe("Tenant", &hub));
    let lab = store.create(&admin, TENANT, row(json!({"name": "GitLab"})))?;
    println!("{}", describe("Tenant", &lab));
    let (hub_id, lab_id) = (id_of(&hub)?, id_of(&lab)?);

    let hub_user = store.create(&admin, USER, row(json!({"name": "a8m", "tenant_id": hub_id})))?;
    let lab_user = store.create(&admin, USER, row(json!({"name": "nati", "tenant_id": lab_id})))?;
    let (hub_user_id, lab_user_id) = (id_of(&hub_user)?, id_of(&lab_user)?);

    // 테넌트 viewer는 자기 테넌트의 user만 조회
    let hub_view = background.with_viewer(Viewer::for_tenant(hub_id));
    let out = store.only(&hub_view, USER, Predicate::everything())?;
    println!("{}", describe("User", &out));

    let lab_view = background.with_viewer(Viewer::for_tenant(lab_id));
    let out = store.only(&lab_view, USER, Predicate::everything())?;
    println!("{}", describe("User", &out));

    // group과 user는 같은 테넌트여야 함
    let group = CreateRequest::new(GROUP)
        .field("name", "entgo.io")
        .field("tenant_id", hub_id);
    expect_denied(
        "create group with a foreign user",
        store.insert(&admin, group.clone().edge("users", USER, [lab_user_id])),
    )?;
    expect_denied(
        "create group with mixed users",
        store.insert(&admin, group.clone().edge("users", USER, [lab_user_id, hub_user_id])),
    )?;
    let entgo = store.insert(&admin, group.edge("users", USER, [hub_user_id]))?;
    println!("{}", describe("Group", &entgo));
    let group_id = id_of(&entgo)?;

    // 다른 테넌트의 group은 보이지 않음 → NotFound
    match store.update_one(&lab_view, GROUP, group_id, row(json!({"name": "fail.go"}))) {
        Err(e) if e.is_not_found() => tracing::debug!("update group as other tenant: {}", e),
        Err(e) => return Err(e.into()),
        Ok(row) => anyhow::bail!("expected update to fail, but got {}", describe("Group", &row)),
    }
    let entgo = store.update_one(&hub_view, GROUP, group_id, row(json!({"name": "entgo"})))?;
    println!("{}", describe("Group", &entgo));

    Ok(())
}

fn expect_denied(step: &str, result: StoreResult<Row>) -> anyhow::Result<()> {
    match result {
        Err(e) if e.is_denied() => {
            tracing::debug!("{}: {}", step, e);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("{}: expected denial", step))),
        Ok(row) => anyhow::bail!("{}: expected denial, but got {:?}", step, row),
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn id_of(row: &Row) -> anyhow::Result<u64> {
    row.get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow::anyhow!("row has no id: {:?}", row))
}

/// `Tenant(id=1, name=GitHub)` 형식
fn describe(label: &str, row: &Row) -> String {
    let name = row.get("name").and_then(Value::as_str).unwrap_or("");
    match row.get("id") {
        Some(id) => format!("{}(id={}, name={})", label, id, name),
        None => format!("{}(name={})", label, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_runs() {
        run(EngineConfig::default()).unwrap();
    }

    #[test]
    fn test_describe() {
        let out = describe("Tenant", &row(json!({"id": 1, "name": "GitHub"})));
        assert_eq!(out, "Tenant(id=1, name=GitHub)");
    }
}
