use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use unblocker_core::{evaluate, CorrelationId, EvidenceRecord};
use unblocker_engine::{fill_context, now_unix, scenario, AnalyzeRequest, Config, Engine};
use unblocker_host::MemoryHost;

#[derive(Parser)]
#[command(name = "unblocker", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config to .unblocker/unblocker.toml
    Init,

    /// Evaluate the stall rule against one evidence record
    Check {
        #[arg(long)]
        evidence: PathBuf,
    },

    /// Report the most stalled targets among several evidence records
    Scan {
        #[arg(long, num_args = 1.., required = true)]
        evidence: Vec<PathBuf>,
    },

    /// Analyze a request and execute the plan against an in-memory host (dry run)
    Run {
        #[arg(long)]
        request: PathBuf,
        /// Treat the plan as approved by a human
        #[arg(long, default_value_t = false)]
        approve: bool,
    },

    /// Run a fixture scenario directory and compare with its expected.yaml
    Simulate {
        #[arg(long)]
        scenario: PathBuf,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            let path = Config::config_path(&repo_root);
            if path.exists() {
                return Err(anyhow!("{} already exists", path.display()));
            }
            Config::default().save_to(&path)?;
            println!("Wrote {}", path.display());
        }
        Command::Check { evidence } => {
            let cfg = Config::load_or_default(&repo_root)?;
            let record: EvidenceRecord = read_json(&evidence)?;
            record.validate()?;
            let verdict = evaluate(&record, &cfg.rule, now_unix());
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Scan { evidence } => {
            let cfg = Config::load_or_default(&repo_root)?;
            let records = evidence.iter().map(|p| read_json(p)).collect::<Result<Vec<EvidenceRecord>>>()?;
            let engine = Engine::new(cfg, Arc::new(MemoryHost::new()));
            let stalled = engine.scan(&records);
            println!("{}", serde_json::to_string_pretty(&stalled)?);
        }
        Command::Run { request, approve } => {
            let cfg = Config::load_or_default(&repo_root)?;
            let mut req: AnalyzeRequest = read_json(&request)?;
            if req.correlation_id.is_blank() {
                req.correlation_id = CorrelationId::new();
            }
            fill_context(&mut req.context, &cfg.context)?;
            let id = req.correlation_id.clone();

            let engine = Engine::new(cfg, Arc::new(MemoryHost::new()));
            let analysis = engine.analyze(req)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);

            if !analysis.plan.is_executable() {
                println!("Nothing to execute for {}", id);
            } else if analysis.plan.auto_execute || approve {
                let outcome = engine.execute(&id, approve)?;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                info!(correlation_id = %id, "approval required; not executing");
                println!("Approval required for {}; re-run with --approve", id);
            }
        }
        Command::Simulate { scenario: dir } => {
            let res = scenario::simulate(&dir)?;
            if dir.join("expected.yaml").exists() {
                scenario::verify(&scenario::load_expected(&dir)?, &res)?;
                println!("{}: as expected", dir.display());
            }
            if let Some(a) = &res.analysis {
                println!("{}", serde_json::to_string_pretty(a)?);
            }
            if let Some(o) = &res.outcome {
                println!("{}", serde_json::to_string_pretty(o)?);
            }
            if let Some(kind) = res.error {
                println!("error: {kind}");
            }
        }
    }

    Ok(())
}
