mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use roster_sync::{
    AddOutcome, ControllerOptions, HttpRosterBackend, RemoveOutcome, RosterEndpoints,
    SearchTermValidator, SectionRosterController,
};
use shared::domain::{EnrollmentId, SectionId, UserId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Manage the members of a course section")]
struct Args {
    /// Base URL of the section management tool.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    section_id: Option<i64>,
    /// Config file; defaults to ./roster.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the section's current members.
    Show,
    /// Print the course users that can be added.
    Candidates,
    /// Add course users to the section as one batch.
    Add {
        #[arg(required = true)]
        user_ids: Vec<i64>,
    },
    /// Remove one member, identified by the id shown next to its row.
    Remove {
        member_id: i64,
        #[arg(long)]
        yes: bool,
    },
    /// Check whether a term is a valid email or university ID search.
    CheckId { term: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let command = match args.command {
        Command::CheckId { term } => {
            let term = SearchTermValidator::new()?.parse(&term)?;
            println!("valid {term}");
            return Ok(());
        }
        command => command,
    };

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(id) = args.section_id {
        settings.section_id = Some(SectionId(id));
    }
    let Some(section_id) = settings.section_id else {
        bail!("no section id given; pass --section-id or set ROSTER_SECTION_ID");
    };

    let endpoints = RosterEndpoints::new(&settings.server_url)
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    info!(server_url = %endpoints.base(), section_id = section_id.0, "roster: starting");
    let backend = HttpRosterBackend::new(endpoints, settings.request_timeout())?;
    let controller = SectionRosterController::new(
        Arc::new(backend),
        section_id,
        ControllerOptions {
            settle_delay: settings.settle_delay(),
        },
    )?;

    controller
        .load_members()
        .await
        .context("loading section members")?;

    match command {
        Command::Show | Command::CheckId { .. } => {}
        Command::Candidates => {
            controller.open_panel().await.context("loading candidates")?;
        }
        Command::Add { user_ids } => add(&controller, user_ids).await?,
        Command::Remove { member_id, yes } => {
            remove(&controller, EnrollmentId(member_id), yes).await?;
        }
    }

    print!("{}", controller.render().await);
    Ok(())
}

async fn add(controller: &SectionRosterController, user_ids: Vec<i64>) -> Result<()> {
    controller.open_panel().await.context("loading candidates")?;
    for id in user_ids {
        controller
            .set_candidate_selected(UserId(id), true)
            .await
            .with_context(|| format!("selecting user {id}"))?;
    }

    match controller.add_selected_members().await? {
        AddOutcome::Applied(result) => info!(
            added = result.succeeded_count,
            failed = result.failed_count,
            "roster: add finished"
        ),
        AddOutcome::BatchFailed { reason, .. } => info!(%reason, "roster: add failed"),
    }
    Ok(())
}

async fn remove(
    controller: &SectionRosterController,
    member_id: EnrollmentId,
    skip_prompt: bool,
) -> Result<()> {
    let prompt = controller.request_remove(member_id).await?;
    if !skip_prompt && !confirm(&prompt).await? {
        controller.cancel_remove().await?;
        println!("Cancelled.");
        return Ok(());
    }

    match controller.confirm_remove().await? {
        RemoveOutcome::Removed(member) => {
            info!(name = %member.display_name, "roster: member removed");
        }
        RemoveOutcome::Failed { reason, .. } => info!(%reason, "roster: remove failed"),
    }
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
