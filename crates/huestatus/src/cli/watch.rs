//! `watch` subcommand — apply every status read from stdin until EOF or Ctrl+C.

use std::io::BufRead;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use super::{Context, RUNNING, Result, print_group_reports};

const POLL: Duration = Duration::from_millis(250);

pub(super) fn cmd_watch(ctx: &Context) -> Result<()> {
    let (_, config) = ctx.load()?;
    let monitor = ctx.monitor(config);

    for (bridge, ok) in monitor.init_bridges() {
        if ok {
            println!("[bridge] {bridge}: ready");
        } else {
            println!("[bridge] {bridge}: self-test failed, will retry on next status");
        }
    }

    // Reader thread: a blocking stdin read must not stall the RUNNING check.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("Watching stdin for statuses. Press Ctrl+C to stop.");
    while RUNNING.load(Ordering::SeqCst) {
        let line = match rx.recv_timeout(POLL) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let status = line.trim();
        if status.is_empty() {
            continue;
        }
        let report = monitor.apply_status(status);
        if ctx.json {
            // One report per line.
            let text = serde_json::to_string(&report).map_err(std::io::Error::other)?;
            println!("{text}");
        } else {
            super::apply::print_report(&report);
        }
    }

    let reports = monitor.shutdown();
    if !ctx.json {
        let off = reports.iter().filter(|r| r.is_applied()).count();
        println!("Shutting down: {off}/{} groups turned off", reports.len());
        print_group_reports(&reports);
    }
    Ok(())
}
