use std::collections::BTreeMap;

use anyhow::{Context, Result};
use unblocker_core::{parse_codeowners, ReviewContext, ReviewerStats};

use crate::config::{expand_path, ContextConfig};

/// Fill the parts of `ctx` the host left empty from the locally configured files.
pub fn fill_context(ctx: &mut ReviewContext, cfg: &ContextConfig) -> Result<()> {
    if ctx.ownership_rules.is_empty() {
        if let Some(raw) = &cfg.codeowners_path {
            let path = expand_path(raw)?;
            let text = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            ctx.ownership_rules = parse_codeowners(&text);
        }
    }
    if ctx.reviewer_stats.is_empty() {
        if let Some(raw) = &cfg.reviewer_stats_path {
            let path = expand_path(raw)?;
            let text = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            let stats: BTreeMap<String, ReviewerStats> =
                serde_json::from_str(&text).with_context(|| format!("parse reviewer stats {}", path.display()))?;
            ctx.reviewer_stats = stats;
        }
    }
    Ok(())
}
