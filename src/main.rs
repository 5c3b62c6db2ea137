mod config;
mod editor;
mod filter;
mod ipc;
mod record;
mod resources;
mod scope;
mod screen;
mod session;
mod source;
mod table;

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = config::Args::parse();

    // stdout carries the IPC stream; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rosterd={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        tracing::error!("configuration error: {e}");
        std::process::exit(2);
    }
    tracing::info!(base_url = %args.base_url, version = env!("CARGO_PKG_VERSION"), "rosterd starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, serve(args))
}

async fn serve(args: config::Args) -> anyhow::Result<()> {
    let state: ipc::SharedState = Rc::new(RefCell::new(ipc::AppState::new(args)));
    let (tx, mut rx) = mpsc::unbounded_channel::<serde_json::Value>();

    let writer = tokio::task::spawn_local(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(resp) = rx.recv().await {
            let mut line =
                serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
            line.push('\n');
            if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                tracing::warn!("stdout closed; dropping remaining responses");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let _ = tx.send(json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        // Each request runs on its own local task so a slow backend call does
        // not hold up the ones behind it.
        let state = Rc::clone(&state);
        let tx = tx.clone();
        tokio::task::spawn_local(async move {
            let resp = ipc::handle_request(&state, req).await;
            let _ = tx.send(resp);
        });
    }

    // Requests still in flight hold senders; the writer drains until they finish.
    drop(tx);
    writer.await?;
    tracing::info!("stdin closed; exiting");
    Ok(())
}
