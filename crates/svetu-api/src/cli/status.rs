//! `svetu status` -- where drafts live and how long they are kept.

use anyhow::Result;
use console::style;
use svetu_types::config::ExpiryMode;

use crate::state::{AppKvStore, AppState};

pub fn status(state: &AppState, json: bool) -> Result<()> {
    let drafts = &state.config.drafts;
    let backend = match state.drafts.kv() {
        AppKvStore::Sqlite(_) => "sqlite",
        AppKvStore::Memory(_) => "memory",
    };
    let mode = match drafts.expiry_mode {
        ExpiryMode::Fixed => "fixed",
        ExpiryMode::Sliding => "sliding",
    };
    let ttl_days = state.drafts.policy().ttl().num_days();

    if json {
        let result = serde_json::json!({
            "data_dir": state.data_dir.display().to_string(),
            "backend": backend,
            "ttl_days": ttl_days,
            "expiry_mode": mode,
            "key_prefix": drafts.key_prefix,
            "optimistic_locking": drafts.optimistic_locking,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("  {}", style("Draft storage").bold());
    println!();
    println!("  {} {}", label("Data directory"), state.data_dir.display());
    println!("  {} {}", label("Backend"), style(backend).cyan());
    println!("  {} {} days ({})", label("Retention"), ttl_days, mode);
    println!("  {} {}", label("Key prefix"), drafts.key_prefix);
    println!(
        "  {} {}",
        label("Conflict check"),
        if drafts.optimistic_locking {
            style("optimistic").green()
        } else {
            style("last write wins").yellow()
        }
    );
    println!();

    Ok(())
}

fn label(text: &str) -> console::StyledObject<String> {
    style(format!("{text:<20}")).dim()
}
