//! 멀티 테넌트 시나리오 (Tenant / User / Group)

use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};
use tnt_core::privacy::{DenyReason, Predicate};
use tnt_core::viewer::{Context, Viewer};
use tnt_core::{EngineConfig, Error};
use tnt_store::demo::{tenant_store, GROUP, TENANT, USER};
use tnt_store::{CreateRequest, Row, Store, StoreError};

fn fields(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn id_of(row: &Row) -> u64 {
    row["id"].as_u64().unwrap()
}

struct Fixture {
    store: Store,
    admin: Context,
    hub_view: Context,
    lab_view: Context,
    hub: u64,
    lab: u64,
    hub_user: u64,
    lab_user: u64,
}

fn seeded() -> Fixture {
    let store = tenant_store(EngineConfig::default()).unwrap();
    let admin = Context::background().with_viewer(Viewer::admin());

    let hub = store.create(&admin, TENANT, fields(json!({"name": "GitHub"}))).unwrap();
    let lab = store.create(&admin, TENANT, fields(json!({"name": "GitLab"}))).unwrap();
    let (hub, lab) = (id_of(&hub), id_of(&lab));

    let hub_user = store
        .create(&admin, USER, fields(json!({"name": "a8m", "tenant_id": hub})))
        .unwrap();
    let lab_user = store
        .create(&admin, USER, fields(json!({"name": "nati", "tenant_id": lab})))
        .unwrap();

    Fixture {
        hub_view: Context::background().with_viewer(Viewer::for_tenant(hub)),
        lab_view: Context::background().with_viewer(Viewer::for_tenant(lab)),
        hub_user: id_of(&hub_user),
        lab_user: id_of(&lab_user),
        store,
        admin,
        hub,
        lab,
    }
}

#[test]
fn test_tenant_create_requires_viewer() {
    let store = tenant_store(EngineConfig::default()).unwrap();

    let err = store
        .create(&Context::background(), TENANT, fields(json!({"name": "GitHub"})))
        .unwrap_err();
    assert!(err.is_denied());
    assert_eq!(
        err.privacy().and_then(Error::deny_reason),
        Some(&DenyReason::ViewerMissing)
    );
}

#[test]
fn test_tenant_create_requires_admin() {
    let store = tenant_store(EngineConfig::default()).unwrap();

    let view = Context::background().with_viewer(Viewer::view());
    let err = store.create(&view, TENANT, fields(json!({"name": "GitHub"}))).unwrap_err();
    assert!(err.is_denied());

    let admin = Context::background().with_viewer(Viewer::admin());
    let hub = store.create(&admin, TENANT, fields(json!({"name": "GitHub"}))).unwrap();
    assert_eq!(hub["id"], 1);
    assert_eq!(hub["name"], "GitHub");

    // 거부된 생성은 저장되지 않음 (id도 소비하지 않음)
    let tenants = store.query(&admin, TENANT, Predicate::everything()).unwrap();
    assert_eq!(tenants.len(), 1);
}

#[test]
fn test_tenant_viewer_reads_only_own_rows() {
    let f = seeded();

    let out = f.store.only(&f.hub_view, USER, Predicate::everything()).unwrap();
    assert_eq!(id_of(&out), f.hub_user);
    assert_eq!(out["name"], "a8m");

    let out = f.store.only(&f.lab_view, USER, Predicate::everything()).unwrap();
    assert_eq!(id_of(&out), f.lab_user);

    let tenants = f.store.query(&f.hub_view, TENANT, Predicate::everything()).unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(id_of(&tenants[0]), f.hub);

    // admin은 전체 조회
    let all = f.store.query(&f.admin, USER, Predicate::everything()).unwrap();
    assert_eq!(all.len(), 2);
    let err = f.store.only(&f.admin, USER, Predicate::everything()).unwrap_err();
    assert!(matches!(err, StoreError::NotSingular { count: 2, .. }));
}

#[test]
fn test_foreign_row_is_not_found_rather_than_denied() {
    let f = seeded();

    let by_id = Predicate::everything().and_eq("id", f.lab_user);
    let err = f.store.only(&f.hub_view, USER, by_id).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_denied());
}

#[test]
fn test_group_users_must_share_tenant() {
    let f = seeded();

    let request = CreateRequest::new(GROUP)
        .field("name", "entgo.io")
        .field("tenant_id", f.hub);

    let err = f
        .store
        .insert(&f.admin, request.clone().edge("users", USER, [f.lab_user]))
        .unwrap_err();
    assert!(err.is_denied());

    let err = f
        .store
        .insert(&f.admin, request.clone().edge("users", USER, [f.lab_user, f.hub_user]))
        .unwrap_err();
    assert!(err.is_denied());

    let group = f
        .store
        .insert(&f.admin, request.edge("users", USER, [f.hub_user]))
        .unwrap();
    assert_eq!(group["id"], 1);
    assert_eq!(group["users"], json!([f.hub_user]));

    let groups = f.store.query(&f.admin, GROUP, Predicate::everything()).unwrap();
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_group_without_tenant_cannot_link_users() {
    let f = seeded();

    let request = CreateRequest::new(GROUP)
        .field("name", "evil")
        .edge("users", USER, [f.lab_user]);
    let err = f.store.insert(&f.hub_view, request.clone()).unwrap_err();
    assert!(err.is_denied());
    assert!(err.to_string().contains("missing tenant information"));

    // admin도 tenant 없이 연결할 수 없음
    let err = f.store.insert(&f.admin, request).unwrap_err();
    assert!(err.is_denied());

    let groups = f.store.query(&f.admin, GROUP, Predicate::everything()).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_tenant_updates_only_its_groups() {
    let f = seeded();
    let group = f
        .store
        .insert(
            &f.admin,
            CreateRequest::new(GROUP)
                .field("name", "entgo.io")
                .field("tenant_id", f.hub)
                .edge("users", USER, [f.hub_user]),
        )
        .unwrap();
    let group_id = id_of(&group);

    let err = f
        .store
        .update_one(&f.lab_view, GROUP, group_id, fields(json!({"name": "fail.go"})))
        .unwrap_err();
    assert!(err.is_not_found());

    let updated = f
        .store
        .update_one(&f.hub_view, GROUP, group_id, fields(json!({"name": "entgo"})))
        .unwrap();
    assert_eq!(updated["name"], "entgo");
    assert_eq!(id_of(&updated), group_id);

    let stored = f.store.only(&f.hub_view, GROUP, Predicate::everything()).unwrap();
    assert_eq!(stored["name"], "entgo");
}

#[test]
fn test_tenant_viewer_cannot_write_foreign_tenant() {
    let f = seeded();

    let err = f
        .store
        .create(&f.hub_view, USER, fields(json!({"name": "mallory", "tenant_id": f.lab})))
        .unwrap_err();
    assert!(err.is_denied());

    let created = f
        .store
        .create(&f.hub_view, USER, fields(json!({"name": "alex", "tenant_id": f.hub})))
        .unwrap();
    assert_eq!(created["tenant_id"], f.hub);

    let lab_users = f.store.query(&f.lab_view, USER, Predicate::everything()).unwrap();
    assert_eq!(lab_users.len(), 1);
}

#[test]
fn test_tenant_viewer_cannot_create_orphan_rows() {
    let f = seeded();

    let err = f
        .store
        .create(&f.hub_view, USER, fields(json!({"name": "ghost"})))
        .unwrap_err();
    assert!(err.is_denied());

    let err = f
        .store
        .insert(&f.hub_view, CreateRequest::new(GROUP).field("name", "ghosts"))
        .unwrap_err();
    assert!(err.is_denied());

    // admin은 테넌트에 바인딩되지 않으므로 허용
    let group = f
        .store
        .insert(&f.admin, CreateRequest::new(GROUP).field("name", "staff"))
        .unwrap();
    assert!(group.get("tenant_id").is_none());

    let users = f.store.query(&f.admin, USER, Predicate::everything()).unwrap();
    assert_eq!(users.len(), 2);
}

#[test]
fn test_delete_is_narrowed_to_tenant() {
    let f = seeded();

    let removed = f.store.delete(&f.hub_view, USER, Predicate::everything()).unwrap();
    assert_eq!(removed, 1);

    let remaining = f.store.query(&f.admin, USER, Predicate::everything()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(id_of(&remaining[0]), f.lab_user);
}

#[test]
fn test_cancelled_context_never_executes() {
    let f = seeded();
    let (ctx, handle) = f.admin.with_cancellation();
    handle.cancel();

    let err = f
        .store
        .create(&ctx, TENANT, fields(json!({"name": "Gitea"})))
        .unwrap_err();
    assert!(matches!(err, StoreError::Privacy(Error::Cancelled)));

    let err = f.store.query(&ctx, USER, Predicate::everything()).unwrap_err();
    assert!(matches!(err, StoreError::Privacy(Error::Cancelled)));

    let tenants = f.store.query(&f.admin, TENANT, Predicate::everything()).unwrap();
    assert_eq!(tenants.len(), 2);
}

#[test]
fn test_concurrent_tenant_reads() {
    let f = seeded();
    let store = Arc::new(f.store);
    let (hub, lab) = (f.hub, f.lab);

    thread::scope(|s| {
        for i in 0..8u64 {
            let store = Arc::clone(&store);
            let tenant = if i % 2 == 0 { hub } else { lab };
            s.spawn(move || {
                let ctx = Context::background().with_viewer(Viewer::for_tenant(tenant));
                for _ in 0..50 {
                    let rows = store.query(&ctx, USER, Predicate::everything()).unwrap();
                    assert_eq!(rows.len(), 1);
                    assert_eq!(rows[0]["tenant_id"], tenant);
                }
            });
        }
    });
}
