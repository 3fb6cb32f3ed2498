use clap::Parser;
use serde::Serialize;

fn is_true(b: &bool) -> bool {
    *b
}

#[derive(Debug, Parser, Serialize)]
pub struct Cli {
    /// Directory holding the guild registries, rank caches and retry queues
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Do not restart retry loops for queues left over from a previous run
    #[arg(long = "no-resume", action = clap::ArgAction::SetFalse)]
    #[serde(skip_serializing_if = "is_true")]
    pub resume_pending_retries: bool,
}
