mod calc;
mod college;
mod config;
mod db;
mod ipc;
mod model;
mod ranking;
mod session;
mod view;

use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    // stdout carries IPC responses; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn main() {
    let (config, config_error) = match config::Config::load() {
        Ok(c) => (c, None),
        Err(e) => (config::Config::default(), Some(e)),
    };
    init_logging(&config.log_filter);
    if let Some(e) = config_error {
        warn!("could not load config, using defaults: {e:#}");
    }
    info!(version = env!("CARGO_PKG_VERSION"), "resultd starting");

    let startup_workspace = config.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(ws) = startup_workspace {
        // A bad configured workspace must not stop the sidecar; workspace.select can retry.
        let _ = ipc::open_workspace(&mut state, ws);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id; report and move on.
                warn!(error = %e, "unparseable request line");
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("stdin closed, resultd exiting");
}
