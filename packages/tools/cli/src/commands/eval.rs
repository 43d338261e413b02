//! 단일 작업 평가

use serde_json::{json, Map, Value};
use tnt_core::privacy::{Evaluation, OpKind, Operation, Predicate, PrivacyEngine};
use tnt_core::viewer::{Context, Role, Viewer};

use crate::OutputFormat;

/// 평가할 작업과 viewer
pub struct EvalArgs {
    pub entity: String,
    pub op: String,
    pub role: Option<String>,
    pub tenant: Option<u64>,
    pub no_viewer: bool,
    pub fields: Option<String>,
    pub filter: Option<String>,
}

pub fn eval(engine: &PrivacyEngine, args: EvalArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (evaluation, op) = decide(engine, &args)?;

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "entity": op.entity(),
                    "op": op.kind(),
                    "decision": evaluation.decision,
                    "decided_by": evaluation.decided_by,
                    "predicate": op.predicate().to_string(),
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{} {}: {}", op.kind(), op.entity(), evaluation.decision);
            println!(
                "  decided by: {}",
                evaluation.decided_by.as_deref().unwrap_or("(default)")
            );
            if evaluation.is_allowed() && op.kind().is_predicated() {
                println!("  predicate:  {}", op.predicate());
            }
        }
    }

    Ok(())
}

/// 작업을 구성해 한 번만 인가
///
/// 출력되는 결정과 좁혀진 조건자는 같은 평가에서 나옵니다.
fn decide(engine: &PrivacyEngine, args: &EvalArgs) -> anyhow::Result<(Evaluation, Operation)> {
    let kind = OpKind::from_name(&args.op).ok_or_else(|| {
        anyhow::anyhow!("Unknown operation '{}'. Use create, read, update or delete", args.op)
    })?;

    let ctx = if args.no_viewer {
        Context::background()
    } else {
        let mut viewer = Viewer::new();
        if let Some(role) = args.role.as_deref() {
            viewer = viewer.with_role(role.parse::<Role>()?);
        }
        if let Some(tenant) = args.tenant {
            viewer = viewer.with_tenant(tenant);
        }
        Context::background().with_viewer(viewer)
    };

    let fields = parse_object(args.fields.as_deref(), "--fields")?;
    let mut op = Operation::new(args.entity.as_str(), kind).with_fields(fields);
    if let Some(filter) = args.filter.as_deref() {
        let value: Value = serde_json::from_str(filter)?;
        op = op.with_predicate(Predicate::from_json(&value)?);
    }

    let evaluation = engine.decide(&ctx, &mut op)?;
    Ok((evaluation, op))
}

fn parse_object(input: Option<&str>, flag: &str) -> anyhow::Result<Map<String, Value>> {
    match input {
        None => Ok(Map::new()),
        Some(raw) => match serde_json::from_str(raw)? {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} must be a JSON object", flag),
        },
    }
}
