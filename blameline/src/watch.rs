//! `blameline watch`: live annotations for one file.
//!
//! The file is polled for modification and treated as saved when its mtime
//! changes. Line numbers typed on stdin move the cursor and go through the
//! controller's debounce like any other selection change.

use crate::terminal::{Session, EDITOR};
use anyhow::{Context, Result};
use blameline_core::controller::EditorEvent;
use blameline_core::document::Document;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

pub async fn run(session: Session, document: Document, path: &Path, poll: Duration) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let (tx, rx) = mpsc::unbounded_channel();
    session.controller.spawn_event_loop(rx);
    session.controller.start().await;

    println!(
        "Watching {} (poll every {}ms). Type a line number to move the cursor, Ctrl+C to stop.",
        path.display(),
        poll.as_millis()
    );

    let stdin_tx = tx.clone();
    let host = session.host.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match line.trim().parse::<u32>() {
                Ok(n) if n > 0 => {
                    host.set_cursor(EDITOR, n - 1);
                    if stdin_tx.send(EditorEvent::SelectionChanged(EDITOR)).is_err() {
                        break;
                    }
                }
                _ => eprintln!("Enter a line number (1-based)"),
            }
        }
    });

    let mut last_modified = modified(path);
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(poll).await;

        let current = modified(path);
        if current != last_modified {
            last_modified = current;
            tracing::debug!(path = %path.display(), "File changed on disk");
            if tx.send(EditorEvent::DocumentSaved(document.clone())).is_err() {
                break;
            }
        }
    }

    session.controller.dispose();
    println!("Watch mode stopped.");
    tracing::info!("blameline watch mode stopped");
    Ok(())
}
