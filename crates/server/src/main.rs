// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! crawld log server
//!
//! Standalone binary serving the job-log HTTP surface: the SSE stream for
//! live executions registered in this process and the tail fallback over
//! the archive directory. Embedded deployments build the router from
//! [`crawld_server::router`] instead of running this binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use crawld_engine::EngineRegistry;
use crawld_server::{env, router, AppState};
use crawld_storage::FsObjectStore;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("crawld {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("crawld {}", env!("CARGO_PKG_VERSION"));
                println!("Job log server - streams and tails crawl execution logs");
                println!();
                println!("USAGE:");
                println!("    crawld");
                println!();
                println!("ENVIRONMENT:");
                println!("    CRAWLD_HTTP_ADDR    listen address (default 127.0.0.1:8643)");
                println!("    CRAWLD_STATE_DIR    state root holding the archive directory");
                println!("    RUST_LOG            tracing filter (default info)");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: crawld [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let archive_dir = env::archive_dir().ok_or("cannot resolve archive directory (no HOME)")?;
    let addr = env::http_addr();

    let state = AppState::new(
        EngineRegistry::new(),
        Arc::new(FsObjectStore::new(archive_dir.clone())),
    );

    info!(%addr, archive_dir = %archive_dir.display(), "starting crawld log server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
