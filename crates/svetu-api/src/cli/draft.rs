//! Draft CLI subcommands.
//!
//! Mirrors what the listing wizard does with drafts: start one, autosave
//! field edits, list and resume, export to a file and import it elsewhere,
//! and sweep expired drafts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use svetu_types::draft::{DraftId, ListingDraft, UserId};

use crate::state::AppState;

/// Draft subcommands.
#[derive(Subcommand)]
pub enum DraftCommand {
    /// Start a new draft and save it.
    New {
        /// Acting user id.
        #[arg(short, long)]
        user: String,

        /// Listing title.
        #[arg(long)]
        title: Option<String>,

        /// Wizard step to start on.
        #[arg(long)]
        step: Option<u32>,
    },

    /// List a user's drafts, most recently saved first.
    #[command(alias = "ls")]
    List {
        #[arg(short, long)]
        user: String,
    },

    /// Show a draft.
    Show {
        /// Draft id.
        id: String,

        #[arg(short, long)]
        user: String,
    },

    /// Edit a draft and save it.
    Set {
        /// Draft id.
        id: String,

        #[arg(short, long)]
        user: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        step: Option<u32>,

        /// Form field as `name=value` (value is JSON, or a plain string). Repeatable.
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,

        /// Attribute as `id=value` (value is JSON, or a plain string). Repeatable.
        #[arg(long = "attr", value_name = "ID=VALUE")]
        attributes: Vec<String>,

        /// Mark the draft complete.
        #[arg(long)]
        complete: bool,
    },

    /// Delete a draft.
    #[command(alias = "rm")]
    Delete {
        id: String,

        #[arg(short, long)]
        user: String,
    },

    /// Export a draft to a JSON document.
    Export {
        id: String,

        #[arg(short, long)]
        user: String,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import a draft from an export file and save it under a new id.
    Import {
        /// Export file to read.
        file: PathBuf,

        #[arg(short, long)]
        user: String,
    },

    /// Delete every expired draft of a user.
    Cleanup {
        #[arg(short, long)]
        user: String,
    },
}

/// Handle a draft subcommand.
pub async fn handle_draft_command(cmd: DraftCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        DraftCommand::New { user, title, step } => new_draft(state, &user.into(), title, step, json).await,
        DraftCommand::List { user } => list_drafts(state, &user.into(), json).await,
        DraftCommand::Show { id, user } => show_draft(state, &id.into(), &user.into(), json).await,
        DraftCommand::Set {
            id,
            user,
            title,
            step,
            fields,
            attributes,
            complete,
        } => {
            let edit = DraftEdit {
                title,
                step,
                fields,
                attributes,
                complete,
            };
            set_draft(state, &id.into(), &user.into(), edit, json).await
        }
        DraftCommand::Delete { id, user } => delete_draft(state, &id.into(), &user.into(), json).await,
        DraftCommand::Export { id, user, out } => {
            export_draft(state, &id.into(), &user.into(), out, json).await
        }
        DraftCommand::Import { file, user } => import_draft(state, &file, &user.into(), json).await,
        DraftCommand::Cleanup { user } => cleanup_drafts(state, &user.into(), json).await,
    }
}

/// Changes requested by `draft set`.
struct DraftEdit {
    title: Option<String>,
    step: Option<u32>,
    fields: Vec<String>,
    attributes: Vec<String>,
    complete: bool,
}

async fn new_draft(
    state: &AppState,
    user: &UserId,
    title: Option<String>,
    step: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut draft = state.drafts.create_draft(user);
    if let Some(title) = title {
        set_title(&mut draft, title);
    }
    if let Some(step) = step {
        draft.metadata.current_step = step;
    }

    state.drafts.save_draft(&mut draft, user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft.metadata)?);
    } else {
        println!();
        println!(
            "  {} Started draft {} for user '{}'",
            style("ok").green(),
            style(&draft.metadata.id).cyan(),
            user,
        );
        println!(
            "  {} expires {}",
            style("i").blue().bold(),
            format_time(&draft.metadata.expires_at),
        );
        println!();
    }

    Ok(())
}

async fn list_drafts(state: &AppState, user: &UserId, json: bool) -> Result<()> {
    let drafts = state.drafts.get_drafts_list(user).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!();
        println!("  {} No drafts for user '{}'", style("i").blue().bold(), user);
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Title").fg(Color::Cyan),
            Cell::new("Step").fg(Color::Cyan),
            Cell::new("Complete").fg(Color::Cyan),
            Cell::new("Updated").fg(Color::Cyan),
            Cell::new("Expires").fg(Color::Cyan),
        ]);

    for meta in &drafts {
        table.add_row(vec![
            Cell::new(&meta.id),
            Cell::new(meta.title.as_deref().unwrap_or("(untitled)")),
            Cell::new(meta.current_step),
            Cell::new(if meta.is_complete { "yes" } else { "no" }),
            Cell::new(format_time(&meta.updated_at)),
            Cell::new(format_time(&meta.expires_at)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} draft(s)", drafts.len());
    println!();

    Ok(())
}

async fn show_draft(state: &AppState, id: &DraftId, user: &UserId, json: bool) -> Result<()> {
    let draft = load(state, id, user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
        return Ok(());
    }

    let meta = &draft.metadata;
    println!();
    println!(
        "  {} {}",
        style(meta.title.as_deref().unwrap_or("(untitled)")).bold(),
        style(&meta.id).dim(),
    );
    println!();
    println!("  Step:      {}", meta.current_step);
    if let Some(category) = &meta.category {
        println!("  Category:  {} ({})", category.name, category.slug);
    }
    println!("  Complete:  {}", if meta.is_complete { "yes" } else { "no" });
    println!("  Created:   {}", format_time(&meta.created_at));
    println!("  Updated:   {}", format_time(&meta.updated_at));
    println!("  Expires:   {}", format_time(&meta.expires_at));
    println!("  Images:    {}", draft.images.len());
    println!();
    println!("  {}", style("Form data").bold());
    println!("{}", indent(&serde_json::to_string_pretty(&draft.form_data)?));
    println!();
    println!("  {}", style("Attributes").bold());
    println!("{}", indent(&serde_json::to_string_pretty(&draft.attributes)?));
    println!();

    Ok(())
}

async fn set_draft(
    state: &AppState,
    id: &DraftId,
    user: &UserId,
    edit: DraftEdit,
    json: bool,
) -> Result<()> {
    let mut draft = load(state, id, user).await?;

    if let Some(title) = edit.title {
        set_title(&mut draft, title);
    }
    if let Some(step) = edit.step {
        draft.metadata.current_step = step;
    }
    for field in &edit.fields {
        let (name, value) = parse_assignment(field)?;
        draft.form_data.insert(name, value);
    }
    for attr in &edit.attributes {
        let (attr_id, value) = parse_assignment(attr)?;
        draft.attributes.insert(attr_id, value);
    }
    if edit.complete {
        draft.metadata.is_complete = true;
    }

    state.drafts.save_draft(&mut draft, user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft.metadata)?);
    } else {
        println!();
        println!(
            "  {} Saved draft {} (version {})",
            style("ok").green(),
            style(&draft.metadata.id).cyan(),
            draft.metadata.version,
        );
        println!();
    }

    Ok(())
}

async fn delete_draft(state: &AppState, id: &DraftId, user: &UserId, json: bool) -> Result<()> {
    state.drafts.delete_draft(id, user).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!();
        println!("  {} Deleted draft {}", style("ok").green(), style(id).cyan());
        println!();
    }

    Ok(())
}

async fn export_draft(
    state: &AppState,
    id: &DraftId,
    user: &UserId,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let draft = load(state, id, user).await?;
    let document = state.drafts.export_draft(&draft)?;

    match out {
        Some(path) => {
            tokio::fs::write(&path, &document)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if json {
                println!("{}", serde_json::json!({ "exported": id, "path": path.display().to_string() }));
            } else {
                println!();
                println!(
                    "  {} Exported draft {} to {}",
                    style("ok").green(),
                    style(id).cyan(),
                    path.display(),
                );
                println!();
            }
        }
        None => println!("{document}"),
    }

    Ok(())
}

async fn import_draft(state: &AppState, file: &Path, user: &UserId, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let Some(mut draft) = state.drafts.import_draft(&content, user) else {
        bail!("{} is not a valid draft export", file.display());
    };
    state.drafts.save_draft(&mut draft, user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft.metadata)?);
    } else {
        println!();
        println!(
            "  {} Imported draft as {} for user '{}'",
            style("ok").green(),
            style(&draft.metadata.id).cyan(),
            user,
        );
        println!();
    }

    Ok(())
}

async fn cleanup_drafts(state: &AppState, user: &UserId, json: bool) -> Result<()> {
    let removed = state.drafts.cleanup_expired_drafts(user).await?;

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!();
        println!(
            "  {} Removed {} expired draft(s) for user '{}'",
            style("ok").green(),
            removed,
            user,
        );
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load(state: &AppState, id: &DraftId, user: &UserId) -> Result<ListingDraft> {
    state
        .drafts
        .get_draft(id, user)
        .await
        .with_context(|| format!("Draft '{id}' not found for user '{user}'"))
}

/// The title is shown in draft lists, so it lives in metadata as well as
/// in the form.
fn set_title(draft: &mut ListingDraft, title: String) {
    draft
        .form_data
        .insert("title".to_string(), serde_json::Value::String(title.clone()));
    draft.metadata.title = Some(title);
}

/// Parse `name=value`. The value is parsed as JSON and falls back to a
/// plain string, so `price=1200` stores a number and `city=Novi Sad` a string.
fn parse_assignment(input: &str) -> Result<(String, serde_json::Value)> {
    let Some((name, raw)) = input.split_once('=') else {
        bail!("expected NAME=VALUE, got '{input}'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("missing name in '{input}'");
    }

    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
