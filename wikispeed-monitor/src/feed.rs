// Wikispeed Monitor - Feed adapter
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Feed adapter.
//!
//! Reads the recent-change feed line by line from stdin or a file (for
//! example `curl -sN https://stream.wikimedia.org/v2/stream/recentchange |
//! wikispeed-monitor`), decodes each record and forwards it to the driver
//! over a channel. Undecodable lines are logged and skipped; connectivity
//! is someone else's problem.

use std::io::ErrorKind;
use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use wikispeed::{parse_feed_line, EventRecord};

use crate::metrics::increment_feed_errors;

/// Boxed line source.
pub type FeedReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// Counters for one feed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Lines read
    pub lines: u64,
    /// Events forwarded
    pub events: u64,
    /// Lines that failed to decode
    pub errors: u64,
}

/// Open the feed input: a file if given, stdin otherwise.
pub async fn open_input(path: Option<&Path>) -> std::io::Result<FeedReader> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            info!("Reading feed from {}", path.display());
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("Reading feed from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Forward events from `reader` until the input ends, the driver stops
/// listening, or shutdown is signalled.
pub async fn run_feed<R>(
    reader: R,
    events: mpsc::Sender<EventRecord>,
    mut shutdown: watch::Receiver<bool>,
) -> FeedSummary
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = FeedSummary::default();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let line = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Feed ended after {} lines", summary.lines);
                break;
            }
            // The bad line is already consumed; the next read starts after it
            Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::Interrupted) => {
                warn!("Skipping unreadable feed line: {}", e);
                increment_feed_errors();
                summary.lines += 1;
                summary.errors += 1;
                continue;
            }
            Err(e) => {
                warn!("Encountered feed error: {}", e);
                increment_feed_errors();
                summary.errors += 1;
                break;
            }
        };
        summary.lines += 1;
        if summary.lines == 1 {
            info!("Receiving feed lines");
        }

        match parse_feed_line(&line) {
            Ok(Some(event)) => {
                if events.send(event).await.is_err() {
                    debug!("Driver closed the feed channel");
                    break;
                }
                summary.events += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping feed line: {}", e);
                increment_feed_errors();
                summary.errors += 1;
            }
        }
    }

    summary
}
