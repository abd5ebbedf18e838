//! # heapscope - Main Entry Point
//!
//! Supports two operational modes:
//! - **Interactive TUI** (`heapscope <DUMP>`): browse the dump with the keyboard
//! - **Headless** (`--search <Q> [--select <N>]...`): print each listing and exit
//!
//! Either way the dump is opened and served by one session worker thread.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, Write};

use heapscope::cli::Args;
use heapscope::graph::SnapshotSummary;
use heapscope::navigation::View;
use heapscope::session::{self, Request, SessionHandle};
use heapscope::tui;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("cannot select row") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let mut session = session::spawn(&args.dump).context("Failed to start session worker")?;
    let summary = session
        .wait_ready()
        .with_context(|| format!("Failed to open heap dump {}", args.dump.display()))?;
    info!(
        "{} objects, {} instances of {} classes",
        summary.objects, summary.instances, summary.classes_with_instances
    );

    let result = if args.is_headless() {
        run_headless(&args, &session, &summary)
    } else {
        tui::run(&session)
    };

    // Finish queued work and unmap before reporting
    session.close();
    result
}

/// Search, then follow each `--select` row, printing every listing
fn run_headless(args: &Args, session: &SessionHandle, summary: &SnapshotSummary) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.quiet && !args.json {
        writeln!(out, "heapscope v{}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "dump: {} ({})", summary.path, summary.version)?;
        writeln!(
            out,
            "objects: {}, instances: {}, classes: {}",
            summary.objects, summary.instances, summary.classes_with_instances
        )?;
        writeln!(out)?;
    }

    let query = args.search.clone().unwrap_or_default();
    let mut view = session.request(Request::Search(query))?;
    print_view(&mut out, &view, args.json)?;

    for &row in &args.select {
        let next = session.request(Request::Select(row))?;
        if next.depth == view.depth {
            anyhow::bail!(
                "Cannot select row {row} of \"{}\": out of range or not an instance",
                view.title
            );
        }
        view = next;
        print_view(&mut out, &view, args.json)?;
    }
    Ok(())
}

fn print_view(out: &mut impl Write, view: &View, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, view).context("Failed to encode view")?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "{}", view.title)?;
    for (index, row) in view.rows.iter().enumerate() {
        writeln!(out, "  [{index}] {row}")?;
    }
    writeln!(out)?;
    Ok(())
}
