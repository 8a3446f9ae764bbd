//! `tvlink run`: follow the TV until interrupted.
//!
//! Lines read from stdin are dispatched as actions while the session runs,
//! in the same `NAME KEY=VALUE...` form `tvlink send` takes.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use tvlink_core::Session;

use crate::commands::send::parse_params;
use crate::commands::{Resolved, finish};
use crate::error::CliError;
use crate::host::ConsoleHost;

pub async fn handle(resolved: &Resolved) -> Result<(), CliError> {
    let session = resolved.start_session(Arc::new(ConsoleHost::new()))?;
    let mut states = session.states();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!(error = %e, "cannot listen for interrupt");
                }
                break;
            }
            state = states.next() => {
                let Some(state) = state else { break };
                info!(%state, "connection");
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => dispatch_line(&session, &line),
                Ok(None) => {
                    debug!("stdin closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "cannot read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    eprintln!("stopping");
    finish(session).await;
    Ok(())
}

fn dispatch_line(session: &Session, line: &str) {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else { return };
    let raw: Vec<String> = words.map(str::to_owned).collect();
    match parse_params(&raw) {
        Ok(params) => session.dispatch_named(name, &params),
        Err(e) => warn!(error = %e, line, "ignoring input"),
    }
}
