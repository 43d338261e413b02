//! 인메모리 Store
//!
//! Row는 JSON 객체이며, 엔티티별로 자동 증가 `id`가 부여됩니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tnt_core::privacy::{EdgeTarget, Operation, Predicate, PrivacyEngine};
use tnt_core::viewer::Context;

use crate::error::{StoreError, StoreResult};

/// 저장된 row
pub type Row = Map<String, Value>;

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Row>,
}

impl Table {
    fn matching<'a>(&'a self, predicate: &'a Predicate) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.values().filter(move |row| predicate.matches(row))
    }
}

/// Edge 대상 row를 `EdgeTarget`으로 조회
fn resolve_edge(
    tables: &HashMap<String, Table>,
    edge: &EdgeRequest,
) -> StoreResult<Vec<EdgeTarget>> {
    let table = tables.get(&edge.entity);

    edge.ids
        .iter()
        .map(|id| {
            let row = table
                .and_then(|t| t.rows.get(id))
                .ok_or_else(|| StoreError::UnknownEdgeTarget {
                    edge: edge.name.clone(),
                    entity: edge.entity.clone(),
                    id: Value::from(*id),
                })?;
            Ok(EdgeTarget {
                id: Value::from(*id),
                attrs: row.clone(),
            })
        })
        .collect()
}

/// Edge 연결 요청
#[derive(Debug, Clone)]
struct EdgeRequest {
    name: String,
    entity: String,
    ids: Vec<u64>,
}

/// Create 요청
///
/// Edge 대상은 평가 전에 저장된 row에서 조회되어 `EdgeTarget` 속성으로 채워집니다.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    entity: String,
    fields: Row,
    edges: Vec<EdgeRequest>,
}

impl CreateRequest {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: Row::new(),
            edges: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn fields(mut self, fields: Row) -> Self {
        self.fields.extend(fields);
        self
    }

    /// `target` 엔티티의 row들을 `name` edge로 연결
    pub fn edge(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        ids: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.edges.push(EdgeRequest {
            name: name.into(),
            entity: target.into(),
            ids: ids.into_iter().collect(),
        });
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Edge 이름은 `id`, 필드, 다른 edge와 겹칠 수 없음
    fn check_edge_names(&self) -> StoreResult<()> {
        for (i, edge) in self.edges.iter().enumerate() {
            let taken = edge.name == "id"
                || self.fields.contains_key(&edge.name)
                || self.edges[..i].iter().any(|e| e.name == edge.name);
            if taken {
                return Err(StoreError::EdgeConflict {
                    entity: self.entity.clone(),
                    edge: edge.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// 정책으로 보호되는 Store
///
/// 엔진은 `Arc`로 공유되며, 테이블은 `RwLock` 하나로 보호됩니다.
/// 생성 시 규칙은 쓰기 잠금 안에서 평가되므로 규칙에서 Store를 다시 호출하면 안 됩니다.
pub struct Store {
    engine: Arc<PrivacyEngine>,
    tables: RwLock<HashMap<String, Table>>,
}

impl Store {
    pub fn new(engine: Arc<PrivacyEngine>) -> Self {
        Self {
            engine,
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &PrivacyEngine {
        &self.engine
    }

    /// Row 생성 (edge 없음)
    pub fn create(&self, ctx: &Context, entity: &str, fields: Row) -> StoreResult<Row> {
        self.insert(ctx, CreateRequest::new(entity).fields(fields))
    }

    /// Row 생성
    ///
    /// `id`는 허용된 뒤에만 할당됩니다. Edge 대상 조회, 인가, 기록은
    /// 하나의 쓰기 잠금 안에서 일어나므로 평가된 대상 속성이 기록 시점의 값입니다.
    pub fn insert(&self, ctx: &Context, request: CreateRequest) -> StoreResult<Row> {
        request.check_edge_names()?;

        let mut tables = self.tables.write();
        let mut op = Operation::create(request.entity.clone()).with_fields(request.fields.clone());
        for edge in &request.edges {
            for target in resolve_edge(&tables, edge)? {
                op = op.with_edge(edge.name.clone(), target);
            }
        }

        self.engine.authorize(ctx, &mut op)?;

        let table = tables.entry(request.entity.clone()).or_default();
        table.next_id += 1;
        let id = table.next_id;

        let mut row = request.fields;
        row.insert("id".to_string(), Value::from(id));
        for edge in request.edges {
            let ids = edge.ids.into_iter().map(Value::from).collect();
            row.insert(edge.name, Value::Array(ids));
        }
        table.rows.insert(id, row.clone());
        op.mark_executed()?;

        tracing::debug!("created {} {}", request.entity, id);
        Ok(row)
    }

    /// Row 조회
    ///
    /// 정책이 좁힌 조건자가 row를 꺼내기 전에 적용됩니다.
    pub fn query(
        &self,
        ctx: &Context,
        entity: &str,
        predicate: Predicate,
    ) -> StoreResult<Vec<Row>> {
        let mut op = Operation::read(entity).with_predicate(predicate);
        self.engine.authorize(ctx, &mut op)?;

        let tables = self.tables.read();
        let rows: Vec<Row> = tables
            .get(entity)
            .map(|t| t.matching(op.predicate()).cloned().collect())
            .unwrap_or_default();
        op.mark_executed()?;

        Ok(rows)
    }

    /// 정확히 하나의 row 조회
    pub fn only(&self, ctx: &Context, entity: &str, predicate: Predicate) -> StoreResult<Row> {
        let mut rows = self.query(ctx, entity, predicate)?;
        match rows.len() {
            0 => Err(StoreError::NotFound {
                entity: entity.to_string(),
            }),
            1 => Ok(rows.remove(0)),
            count => Err(StoreError::NotSingular {
                entity: entity.to_string(),
                count,
            }),
        }
    }

    /// 조건에 맞는 row 수정, 수정된 row 수 반환
    pub fn update(
        &self,
        ctx: &Context,
        entity: &str,
        predicate: Predicate,
        fields: Row,
    ) -> StoreResult<usize> {
        Ok(self.update_rows(ctx, entity, predicate, fields)?.len())
    }

    /// ID로 단일 row 수정
    ///
    /// 정책이 좁힌 범위 밖의 row는 존재하지 않는 것으로 취급됩니다 (NotFound).
    pub fn update_one(
        &self,
        ctx: &Context,
        entity: &str,
        id: u64,
        fields: Row,
    ) -> StoreResult<Row> {
        let predicate = Predicate::everything().and_eq("id", id);
        self.update_rows(ctx, entity, predicate, fields)?
            .pop()
            .ok_or_else(|| StoreError::NotFound {
                entity: entity.to_string(),
            })
    }

    fn update_rows(
        &self,
        ctx: &Context,
        entity: &str,
        predicate: Predicate,
        mut fields: Row,
    ) -> StoreResult<Vec<Row>> {
        // id는 변경 불가
        fields.remove("id");

        let mut op = Operation::update(entity)
            .with_predicate(predicate)
            .with_fields(fields.clone());
        self.engine.authorize(ctx, &mut op)?;

        let mut tables = self.tables.write();
        let mut updated = Vec::new();
        if let Some(table) = tables.get_mut(entity) {
            for row in table.rows.values_mut() {
                if op.predicate().matches(row) {
                    row.extend(fields.clone());
                    updated.push(row.clone());
                }
            }
        }
        op.mark_executed()?;

        tracing::debug!("updated {} {} row(s)", updated.len(), entity);
        Ok(updated)
    }

    /// 조건에 맞는 row 삭제, 삭제된 row 수 반환
    pub fn delete(&self, ctx: &Context, entity: &str, predicate: Predicate) -> StoreResult<usize> {
        let mut op = Operation::delete(entity).with_predicate(predicate);
        self.engine.authorize(ctx, &mut op)?;

        let mut tables = self.tables.write();
        let removed = match tables.get_mut(entity) {
            Some(table) => {
                let before = table.rows.len();
                table.rows.retain(|_, row| !op.predicate().matches(row));
                before - table.rows.len()
            }
            None => 0,
        };
        op.mark_executed()?;

        tracing::debug!("deleted {} {} row(s)", removed, entity);
        Ok(removed)
    }
}
