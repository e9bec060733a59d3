//! `apply` subcommand — apply one status to every enabled bridge.

use super::{ApplyReport, Context, Result, print_group_reports, print_json};

pub(super) fn print_report(report: &ApplyReport) {
    if report.is_empty() {
        println!("{}: no group handles this status", report.status);
        return;
    }
    println!(
        "{}: {}/{} groups applied",
        report.status,
        report.applied(),
        report.groups.len()
    );
    print_group_reports(&report.groups);
}

pub(super) fn cmd_apply(ctx: &Context, status: &str) -> Result<()> {
    let (_, config) = ctx.load()?;
    let monitor = ctx.monitor(config);
    let report = monitor.apply_status(status.trim());

    if ctx.json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}
