//! `redirect-map` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `redirects.toml` and resolve it into a
//!    [`redirects::RedirectConfig`].
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer,
//!    plus an OpenTelemetry OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT`
//!    is set. Every `tracing` span and event in the workspace flows through it.
//! 3. **Construct infrastructure**: a [`sanity::SanityClient`] for the
//!    configured dataset, injected into the engine and the batch generator
//!    through the port traits.
//! 4. **Run the selected command**:
//!    - `generate` writes the redirect list as JSON.
//!    - `publish` runs one publish-with-redirect cycle in the terminal.
//!    - `schema` prints the contributed document types.

mod config;
mod telemetry;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use publish_action::{
    ActionPorts, ConfirmationSurface, EngineError, Outcome, PublishAndCreateRedirect,
    RedirectPlugin,
};
use redirects::{
    generate_redirects, DocumentId, DocumentReference, PublishExecutor, RedirectConfig,
    RedirectKind,
};
use sanity::{SanityClient, SanityPublisher};

use crate::config::FileConfig;
use crate::terminal::{parse_decision, LogNotifier, TerminalSurface};

#[derive(Parser, Debug)]
#[command(name = "redirect-map", version, about = "Redirects for documents whose path changed")]
struct Cli {
    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = "redirects.toml", global = true)]
    config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the redirect list for the frontend as JSON.
    Generate {
        /// Query selecting redirect records; defaults to every record of the
        /// redirect type with its destination dereferenced.
        #[arg(long, value_name = "GROQ")]
        query: Option<String>,
        /// Output file; stdout when omitted.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Publish a document, offering a redirect if its path changed.
    Publish {
        /// Document id (draft or published).
        #[arg(long, value_name = "ID")]
        id: String,
    },
    /// Print the redirect document type as JSON.
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init_tracing(cli.log_json)?;

    let file = FileConfig::load(&cli.config)?;
    let config = file.redirect_config()?;
    if config.debug() {
        info!(config = ?config, "Loaded redirect configuration");
    }

    match cli.command {
        Command::Generate { query, output } => {
            let client = file.client(&config)?;
            generate(&client, &config, query.as_deref(), output).await
        }
        Command::Publish { id } => {
            let client = file.client(&config)?;
            publish(client, &config, &id).await
        }
        Command::Schema => {
            let plugin = RedirectPlugin::new(config);
            println!("{}", serde_json::to_string_pretty(&plugin.schema_types(Vec::new()))?);
            Ok(())
        }
    }
}

async fn generate(
    client: &SanityClient,
    config: &RedirectConfig,
    query: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let entries = generate_redirects(
        client,
        config.resolvers(),
        config.redirect_schema_name(),
        query,
    )
    .await
    .context("generating redirect list")?;
    let json = serde_json::to_string_pretty(&entries)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!(count = entries.len(), path = %path.display(), "Redirect list written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn publish(client: SanityClient, config: &RedirectConfig, id: &str) -> Result<()> {
    let id = DocumentId::new(id).context("document id must not be empty")?;
    let versions = client
        .fetch_versions(&id)
        .await
        .with_context(|| format!("fetching document {id}"))?;
    let Some(doc_type) = versions
        .draft
        .as_ref()
        .or(versions.published.as_ref())
        .map(|doc| doc.doc_type.clone())
    else {
        bail!("document {id} does not exist");
    };

    let publisher = Arc::new(SanityPublisher::new(client.clone(), id.clone()));
    let ports = ActionPorts::new(Arc::new(client), publisher.clone())
        .with_notifier(Arc::new(LogNotifier));
    let plugin = RedirectPlugin::new(config.clone()).with_dialog_box(Arc::new(
        |_: &DocumentReference| -> Arc<dyn ConfirmationSurface> { Arc::new(TerminalSurface) },
    ));
    let document = DocumentReference {
        id: id.published(),
        doc_type,
    };

    let Some(mut action) = plugin.publish_action(document, ports) else {
        info!(document = %id, "Type is not redirect-tracked; publishing");
        let result = publisher.execute().await;
        publisher.complete();
        return result.context("publishing");
    };

    let outcome = action
        .evaluate_publish_request(versions.draft.as_ref(), versions.published.as_ref())
        .await?;
    let outcome = match outcome {
        Outcome::AwaitingConfirmation(decision) => {
            confirm(&mut action, decision.redirect_kind).await?
        }
        other => other,
    };
    report(&outcome);
    Ok(())
}

/// Reads answers from stdin until one completes the cycle. End of input
/// cancels.
async fn confirm(action: &mut PublishAndCreateRedirect, selected: RedirectKind) -> Result<Outcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            return Ok(action.cancel()?);
        };
        let Some(decision) = parse_decision(&line, selected) else {
            eprint!("unrecognised answer '{}'\n> ", line.trim());
            continue;
        };
        match action.resolve(decision).await {
            Ok(outcome) => return Ok(outcome),
            // The prompt is shown again with the error; the decision is kept.
            Err(EngineError::Write(e)) => warn!(error = %e, "Redirect not created"),
            Err(e) => return Err(e.into()),
        }
    }
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Published(reason) => println!("published ({reason:?})"),
        Outcome::PublishedWithRedirect { record_id, record } => println!(
            "published; redirect {} {} -> {} ({record_id})",
            record.redirect_type, record.url, record.destination.id
        ),
        Outcome::PublishedWithoutRedirect => println!("published without redirect"),
        Outcome::Cancelled => println!("cancelled; nothing was published"),
        Outcome::AwaitingConfirmation(_) => {}
    }
}
