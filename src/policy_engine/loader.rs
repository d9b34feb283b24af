//! On-disk YAML policy loader (spec §6 "Policy file format").
//!
//! Out of scope per spec §1 ("the on-disk YAML loader" is listed among
//! external collaborators); this is the concrete, non-load-bearing
//! implementation used by the `reload` CLI/HTTP path so the crate is
//! runnable standalone.

use std::path::Path;

use crate::domain::{DepartmentPolicy, Result, RouterError};

use super::store::PolicyKey;

/// Loads every `<tenant>/<department>.yaml` file under `root` into
/// `(tenant, department) -> DepartmentPolicy` pairs.
pub fn load_directory(root: &Path) -> Result<Vec<(PolicyKey, DepartmentPolicy)>> {
    let mut out = Vec::new();
    if !root.exists() {
        return Ok(out);
    }

    for tenant_entry in std::fs::read_dir(root)? {
        let tenant_entry = tenant_entry?;
        if !tenant_entry.file_type()?.is_dir() {
            continue;
        }
        let tenant_id = tenant_entry.file_name().to_string_lossy().to_string();

        for dept_entry in std::fs::read_dir(tenant_entry.path())? {
            let dept_entry = dept_entry?;
            let path = dept_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let department = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| RouterError::PolicyLoadFailed(format!("bad file name {path:?}")))?;

            let policy = load_file(&path)?;
            out.push(((tenant_id.clone(), department), policy));
        }
    }

    Ok(out)
}

pub fn load_file(path: &Path) -> Result<DepartmentPolicy> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| RouterError::PolicyLoadFailed(format!("{path:?}: {e}")))?;
    parse(&contents)
}

pub fn parse(yaml: &str) -> Result<DepartmentPolicy> {
    let policy: DepartmentPolicy = serde_yaml::from_str(yaml)
        .map_err(|e| RouterError::PolicyLoadFailed(e.to_string()))?;
    validate(&policy)?;
    Ok(policy)
}

fn validate(policy: &DepartmentPolicy) -> Result<()> {
    if policy.budget.downgrade_at_pct > policy.budget.force_cheap_at_pct {
        return Err(RouterError::PolicyLoadFailed(
            "downgrade_at_pct must be <= force_cheap_at_pct".to_string(),
        ));
    }
    for rule in &policy.rules {
        if rule.action.virtual_model.is_none() && rule.action.primary_model.is_none() {
            return Err(RouterError::PolicyLoadFailed(format!(
                "rule {} specifies neither virtual_model nor primary_model",
                rule.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version: "1"
description: "rd department policy"
rules:
  - name: simple_codegen
    match:
      task_type: code_generation
      complexity: simple
    action:
      virtual_model: "rb://fast_cheap_code"
      model_tier: fast_cheap
      rationale: "cheap tier handles simple codegen"
budget:
  downgrade_at_pct: 80
  force_cheap_at_pct: 95
base_fallback:
  primary_model: "local/llama-70b"
  model_tier: local
  rationale: "base fallback"
"#;

    #[test]
    fn parses_and_validates_sample_policy() {
        let policy = parse(SAMPLE).unwrap();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].name, "simple_codegen");
    }

    #[test]
    fn rejects_inverted_budget_thresholds() {
        let bad = SAMPLE.replace("downgrade_at_pct: 80", "downgrade_at_pct: 99");
        assert!(parse(&bad).is_err());
    }
}
