use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use unblocker_core::{LadderOptions, PolicyConstraints, StallRule, MAX_CANDIDATES, SECS_PER_HOUR};
use unblocker_store::DEFAULT_PLAN_TTL_SECS;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub rule: StallRule,
    pub ladder: LadderConfig,
    pub policy: PolicyConstraints,
    pub store: StoreConfig,
    pub context: ContextConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LadderConfig {
    pub max_candidates: usize,
    pub recency_window_hours: f64,
    pub default_reviewers: Vec<String>,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self { max_candidates: MAX_CANDIDATES, recency_window_hours: 30.0 * 24.0, default_reviewers: vec![] }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub plan_ttl_secs: i64,
    /// Rolling window for the per-target attempt limit.
    pub rate_window_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { plan_ttl_secs: DEFAULT_PLAN_TTL_SECS, rate_window_secs: SECS_PER_HOUR }
    }
}

/// Optional local files the CLI reads to build a review context.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub codeowners_path: Option<String>,
    pub reviewer_stats_path: Option<String>,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse unblocker.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".unblocker").join("unblocker.toml")
    }

    /// Load the repo config if present, otherwise defaults; environment overrides apply either way.
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let path = Self::config_path(repo_root);
        let mut cfg = if path.exists() { Self::load_from(&path)? } else { Self::default() };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply `UNBLOCKER_*` overrides using `lookup` as the environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("UNBLOCKER_THRESHOLD_HOURS") {
            self.rule.threshold_hours = v.trim().parse().with_context(|| format!("UNBLOCKER_THRESHOLD_HOURS={v}"))?;
        }
        if let Some(v) = lookup("UNBLOCKER_ACTIVITY_WINDOW_HOURS") {
            self.rule.activity_window_hours =
                v.trim().parse().with_context(|| format!("UNBLOCKER_ACTIVITY_WINDOW_HOURS={v}"))?;
        }
        if let Some(v) = lookup("UNBLOCKER_EXCLUDED_LABELS") {
            self.rule.excluded_labels = split_list(&v);
        }
        if let Some(v) = lookup("UNBLOCKER_DEFAULT_REVIEWERS") {
            self.ladder.default_reviewers = split_list(&v);
        }
        Ok(())
    }

    pub fn ladder_options(&self) -> LadderOptions {
        LadderOptions {
            max_candidates: self.ladder.max_candidates,
            recency_window_hours: self.ladder.recency_window_hours,
            start: self.rule.source,
        }
    }
}

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("expand path {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
