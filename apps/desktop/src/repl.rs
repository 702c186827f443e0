//! Turns input lines into conversation turns.

use std::sync::Arc;

use anyhow::{Context, Result};
use client_core::{ChatController, SubmitError};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};
use tracing::debug;

use crate::render;

pub const QUIT_COMMAND: &str = "/quit";

/// Reads lines until EOF or `/quit`. Each line enters Pending before the next
/// line is read, so a line arriving while a reply is outstanding is refused
/// with a notice on `out` instead of replacing the one in flight.
pub async fn run<R, W>(controller: Arc<ChatController>, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        if line.trim() == QUIT_COMMAND {
            break;
        }
        let turn = match controller.begin(line).await {
            Ok(Some(turn)) => turn,
            Ok(None) => continue,
            Err(SubmitError::Busy) => {
                out.write_all(format!("{}\n", render::busy_notice()).as_bytes())
                    .await
                    .context("failed to write output")?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        debug!(text = turn.text(), "turn started");

        let controller = Arc::clone(&controller);
        in_flight = Some(tokio::spawn(async move {
            match controller.complete(turn).await {
                Ok(outcome) => debug!(?outcome, "submission settled"),
                // Already rendered from the Failed event.
                Err(err) => debug!(error = %err, "submission failed"),
            }
        }));
    }

    if let Some(task) = in_flight {
        task.await.context("submission task panicked")?;
    }
    out.flush().await.context("failed to write output")?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/repl_tests.rs"]
mod tests;
