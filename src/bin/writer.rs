//! Trivial one-shot utility: write a string to a file, logging failures instead of the
//! original's `syslog` calls.
//!
//! Out of scope for the command log engine; kept as a minor standalone collaborator
//! binary, directly ported from `finder-app/writer.c`.

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, error};

/// Writes a string into a file, creating or truncating it.
#[derive(Parser, Debug)]
#[command(name = "ringlog-writer", version, about)]
struct Args {
    /// Path to the file to write.
    writefile: PathBuf,
    /// String to write into that file.
    writestr: String,
}

fn main() {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    debug!(file = %args.writefile.display(), "writing string to file");

    if let Err(err) = std::fs::write(&args.writefile, &args.writestr) {
        error!(file = %args.writefile.display(), error = %err, "failed to write file");
        std::process::exit(1);
    }
}
