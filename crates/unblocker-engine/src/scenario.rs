use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use serde::Deserialize;
use unblocker_core::{ConfidenceTier, ExecutionOutcome, MatchReason, RankedEntry, StallRule};
use unblocker_host::{FixedRanker, MemoryHost};

use crate::{
    config::Config,
    engine::{AnalyzeRequest, Analysis, Engine},
    util::ManualClock,
};

/// `scenario.yaml`: one analyze/execute round trip against an in-memory host.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub now_unix: i64,
    #[serde(default)]
    pub rule: Option<StallRule>,
    #[serde(default)]
    pub default_reviewers: Vec<String>,
    pub request: AnalyzeRequest,
    /// Reviewers the host already shows before execution.
    #[serde(default)]
    pub host_reviewers: Vec<String>,
    #[serde(default)]
    pub ranking: Option<Vec<RankedEntry>>,
    #[serde(default)]
    pub ranker_fails: bool,
    #[serde(default)]
    pub approve: bool,
    #[serde(default = "default_true")]
    pub execute: bool,
}

fn default_true() -> bool {
    true
}

/// `expected.yaml`. Omitted fields are not checked.
#[derive(Debug, Default, Deserialize)]
pub struct ScenarioExpected {
    pub matched: Option<bool>,
    pub reason: Option<MatchReason>,
    pub confidence: Option<ConfidenceTier>,
    pub auto_execute: Option<bool>,
    pub approval_required: Option<bool>,
    pub reviewers: Option<Vec<String>>,
    pub executed: Option<bool>,
    pub verified: Option<bool>,
    pub issued: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub analysis: Option<Analysis>,
    pub outcome: Option<ExecutionOutcome>,
    /// `EngineError::kind` of the first failure, if any.
    pub error: Option<&'static str>,
}

pub fn load_scenario(dir: &Path) -> Result<Scenario> {
    let p = dir.join("scenario.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read scenario.yaml: {}", p.display()))?;
    serde_yaml::from_str(&s).with_context(|| "parse scenario.yaml")
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read expected.yaml: {}", p.display()))?;
    serde_yaml::from_str(&s).with_context(|| "parse expected.yaml")
}

/// Run a scenario directory: analyze, then execute unless the scenario says not to.
pub fn simulate(dir: &Path) -> Result<ScenarioResult> {
    let sc = load_scenario(dir)?;

    let mut cfg = Config::default();
    if let Some(rule) = sc.rule {
        cfg.rule = rule;
    }
    cfg.ladder.default_reviewers = sc.default_reviewers;

    let target = sc.request.evidence.target.clone();
    let existing: Vec<&str> = sc.host_reviewers.iter().map(String::as_str).collect();
    let host = Arc::new(MemoryHost::new().with_reviewers(&target, &existing));

    let mut engine = Engine::new(cfg, host).with_clock(ManualClock::at(sc.now_unix));
    if sc.ranker_fails {
        engine = engine.with_ranker(Box::new(FixedRanker::failing()));
    } else if let Some(ranking) = sc.ranking {
        engine = engine.with_ranker(Box::new(FixedRanker::new(ranking)));
    }

    let id = sc.request.correlation_id.clone();
    let analysis = match engine.analyze(sc.request) {
        Ok(a) => a,
        Err(e) => return Ok(ScenarioResult { analysis: None, outcome: None, error: Some(e.kind()) }),
    };
    if !sc.execute {
        return Ok(ScenarioResult { analysis: Some(analysis), outcome: None, error: None });
    }
    let (outcome, error) = match engine.execute(&id, sc.approve) {
        Ok(o) => (Some(o), None),
        Err(e) => (None, Some(e.kind())),
    };
    Ok(ScenarioResult { analysis: Some(analysis), outcome, error })
}

/// Compare a result with `expected.yaml`, naming the first field that differs.
pub fn verify(expected: &ScenarioExpected, res: &ScenarioResult) -> Result<()> {
    ensure!(
        expected.error.as_deref() == res.error,
        "error: expected {:?}, got {:?}",
        expected.error,
        res.error
    );
    if let Some(a) = &res.analysis {
        check("matched", expected.matched, a.matched)?;
        check("reason", expected.reason, a.reason)?;
        check("confidence", expected.confidence, a.plan.confidence)?;
        check("auto_execute", expected.auto_execute, a.plan.auto_execute)?;
        check("approval_required", expected.approval_required, a.plan.approval_required)?;
        check("reviewers", expected.reviewers.clone(), a.plan.reviewers())?;
    }
    check("executed", expected.executed, res.outcome.is_some())?;
    if let Some(o) = &res.outcome {
        check("verified", expected.verified, o.verified)?;
        check("issued", expected.issued.clone(), o.issued.clone())?;
    }
    Ok(())
}

fn check<T: PartialEq + std::fmt::Debug>(field: &str, expected: Option<T>, actual: T) -> Result<()> {
    match expected {
        Some(want) if want != actual => Err(anyhow!("{field}: expected {want:?}, got {actual:?}")),
        _ => Ok(()),
    }
}
