//! Terminal client for a streaming `/chat` backend.

mod session;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chat_stream::observability::init_observability;
use chat_stream::prelude::*;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};

use crate::session::{Session, TurnFlags};
use crate::terminal::{TerminalRenderer, TerminalSidebar};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend origin (overrides CHAT_STREAM_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model id (overrides CHAT_STREAM_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Continue an existing conversation, given as id or `/conversation/<id>` route
    #[arg(long, global = true)]
    conversation: Option<String>,

    /// Ask the backend to search the web before answering
    #[arg(long, global = true)]
    web_search: bool,

    /// Ask the backend to enable model reasoning
    #[arg(long, global = true)]
    think: bool,

    /// Print reasoning to stderr as it streams
    #[arg(long, global = true)]
    show_reasoning: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and stream the answer
    Send {
        /// The message to send
        message: Vec<String>,

        /// Attach an image file (repeatable)
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Process images through the backend's upload endpoint first
        #[arg(long)]
        upload: bool,
    },
    /// Interactive chat; `/new` starts over, `/image <path>` queues an attachment, `/exit` quits
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_observability("warn");

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.base_url(base_url);
    }
    if let Some(model) = cli.model {
        config = config.model(model);
    }
    let model = config.model.clone();
    let transport = Arc::new(HttpTransport::new(config)?);

    let conversation = cli
        .conversation
        .as_deref()
        .map(|raw| {
            ConversationId::from_route(raw)
                .with_context(|| format!("`{raw}` is not a conversation id or route"))
        })
        .transpose()?;
    let flags = TurnFlags {
        web_search: cli.web_search,
        think: cli.think,
    };
    let mut session = Session::new(
        ChatClient::new(transport.clone()),
        model,
        flags,
        conversation,
    );
    let mut render = TerminalRenderer::stdio(cli.show_reasoning);
    let mut sidebar = TerminalSidebar::stderr();

    match cli.command {
        Commands::Send {
            message,
            images,
            upload,
        } => {
            let message = message.join(" ");
            let images = load_images(&transport, &images, upload).await?;
            let summary =
                run_turn(&mut session, &message, images, &mut render, &mut sidebar).await?;
            if let TurnOutcome::Failed(err) = summary.outcome {
                tracing::debug!(error = %err, "send failed");
                std::process::exit(1);
            }
        }
        Commands::Repl => repl(&mut session, &transport, &mut render, &mut sidebar).await?,
    }
    Ok(())
}

async fn load_images(
    transport: &HttpTransport,
    paths: &[PathBuf],
    upload: bool,
) -> Result<Vec<ImageAttachment>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    if upload {
        return Ok(transport.upload_images(paths).await?);
    }
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        images.push(ImageAttachment::from_path(path).await?);
    }
    Ok(images)
}

/// Runs one turn to its end; Ctrl-C stops it.
async fn run_turn(
    session: &mut Session,
    message: &str,
    images: Vec<ImageAttachment>,
    render: &mut dyn RenderPort,
    sidebar: &mut dyn SidebarRegistry,
) -> Result<TurnSummary> {
    let turn = session.start(message, images)?;
    let cancel = turn.cancel_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    let summary = turn.consume(render, sidebar).await;
    watcher.abort();
    session.record(message, &summary);
    Ok(summary)
}

async fn repl(
    session: &mut Session,
    transport: &HttpTransport,
    render: &mut dyn RenderPort,
    sidebar: &mut dyn SidebarRegistry,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut queued: Vec<PathBuf> = Vec::new();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/new" => {
                session.reset();
                queued.clear();
                eprintln!("started a new conversation");
                continue;
            }
            _ => {}
        }
        if let Some(path) = line.strip_prefix("/image ") {
            queued.push(PathBuf::from(path.trim()));
            eprintln!("{} image(s) queued", queued.len());
            continue;
        }

        let images = match load_images(transport, &queued, false).await {
            Ok(images) => images,
            Err(err) => {
                eprintln!("{err:#}");
                queued.clear();
                continue;
            }
        };
        queued.clear();
        if let Err(err) = run_turn(session, line, images, render, sidebar).await {
            eprintln!("{err:#}");
        }
    }
    Ok(())
}
