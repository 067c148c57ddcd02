// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Listen address: `CRAWLD_HTTP_ADDR`, default `127.0.0.1:8643`.
pub fn http_addr() -> SocketAddr {
    std::env::var("CRAWLD_HTTP_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8643)))
}

/// Archive root: `CRAWLD_STATE_DIR` > `XDG_STATE_HOME`/crawld >
/// `~/.local/state/crawld`, with `archive/` appended.
pub fn archive_dir() -> Option<PathBuf> {
    let state_dir = if let Ok(dir) = std::env::var("CRAWLD_STATE_DIR") {
        PathBuf::from(dir)
    } else if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        PathBuf::from(xdg).join("crawld")
    } else {
        let home = std::env::var("HOME").ok()?;
        PathBuf::from(home).join(".local/state/crawld")
    };
    Some(state_dir.join("archive"))
}
