//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "heapscope",
    version,
    about = "Explore Java and Android heap dumps (HPROF)",
    after_help = "\
EXAMPLES:
    heapscope app.hprof                                Interactive explorer
    heapscope app.hprof --search Leak                  Print classes matching Leak
    heapscope app.hprof --search Leak --select 0       ...and list the first class's instances
    heapscope app.hprof --search Leak --select 0 --select 2 --json"
)]
pub struct Args {
    /// Heap dump to open
    #[arg(value_name = "DUMP")]
    pub dump: PathBuf,

    /// Run without TUI: search class names for this substring (case-sensitive, may be empty)
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Drill into this row of the previous listing (repeatable)
    #[arg(long, value_name = "ROW", requires = "search")]
    pub select: Vec<usize>,

    /// Print each listing as a JSON object per line
    #[arg(long, requires = "search")]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// True when no interactive terminal is wanted
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.search.is_some()
    }
}
