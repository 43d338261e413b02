//! 정책 문서 검증

use std::path::Path;

use serde_json::json;
use tnt_core::privacy::{PolicyDocument, PolicySet, Rule};
use tnt_core::EngineConfig;

use crate::OutputFormat;

pub fn check(path: &Path, engine_config: EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let engine = PolicyDocument::from_path(path)
        .and_then(|doc| doc.compile(engine_config))
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;

    let mut entities = Vec::new();
    for name in engine.entities() {
        let Some(policy) = engine.policy(name) else {
            continue;
        };
        let mut sets = vec![policy.query(), policy.mutation()];
        sets.extend(policy.overrides().into_iter().map(|(_, set)| set));
        entities.push((name, sets));
    }

    match format {
        OutputFormat::Json => {
            let body: Vec<_> = entities
                .iter()
                .map(|(name, sets)| {
                    json!({
                        "entity": name,
                        "sets": sets.iter().map(|set| describe(set)).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "policy": path.display().to_string(),
                    "require_viewer": engine.config().require_viewer,
                    "entities": body,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("Policy OK: {}", path.display());
            println!("  require_viewer: {}", engine.config().require_viewer);
            for (name, sets) in &entities {
                println!("- {}", name);
                for set in sets {
                    let rules: Vec<_> = set.rules().iter().map(label).collect();
                    println!(
                        "  - {} (default {}): {}",
                        set.name(),
                        set.default_decision(),
                        if rules.is_empty() { "(no rules)".to_string() } else { rules.join(", ") }
                    );
                }
            }
        }
    }

    Ok(())
}

fn label(rule: &Rule) -> String {
    if rule.is_filter() {
        format!("{} [filter]", rule.name())
    } else {
        rule.name().to_string()
    }
}

fn describe(set: &PolicySet) -> serde_json::Value {
    json!({
        "name": set.name(),
        "default": set.default_decision(),
        "rules": set.rules().iter().map(label).collect::<Vec<_>>(),
    })
}
