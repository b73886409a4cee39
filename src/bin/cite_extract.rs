//! cite-extract
//!
//! Prints the software packages declared by a CWL document and, for packages
//! listed on bio.tools, the DOIs of their primary publications.
//!
//! # Usage
//!
//! ```bash
//! # Report packages and citations
//! cite-extract workflow.cwl
//!
//! # Packages only, no network access
//! cite-extract workflow.cwl --no-lookup
//!
//! # Use a bio.tools mirror and stop at the first failed lookup
//! cite-extract https://example.org/wf.cwl --registry-url http://localhost:8000 --fail-fast
//! ```

use std::error::Error;
use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{debug, warn};

use cwl_utils::citation::{BiotoolsClient, MetadataReporter, DEFAULT_BIOTOOLS_URL};
use cwl_utils::cli::{parse_timeout, print_error, setup_logging};
use cwl_utils::workflow::DocumentLoader;

/// Print the software packages and citations of a CWL document.
#[derive(Parser, Debug)]
#[command(name = "cite-extract", version, about)]
struct Args {
    /// CWL document to scan (path, file:// or http(s):// URI)
    document: String,

    /// Base URL of the bio.tools registry
    #[arg(long, env = "CWL_UTILS_BIOTOOLS_URL", default_value = DEFAULT_BIOTOOLS_URL)]
    registry_url: String,

    /// HTTP timeout in seconds, for documents and registry lookups
    #[arg(long, env = "CWL_UTILS_HTTP_TIMEOUT", default_value = "30", value_parser = parse_timeout)]
    timeout: Duration,

    /// Print packages only, without looking up citations
    #[arg(long)]
    no_lookup: bool,

    /// Abort on the first failed citation lookup
    #[arg(long)]
    fail_fast: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let loader = DocumentLoader::with_timeout(args.timeout);
    let document = loader.load(&args.document)?;

    let mut reporter = MetadataReporter::new(io::stdout().lock()).fail_fast(args.fail_fast);
    if !args.no_lookup {
        let client = BiotoolsClient::new(&args.registry_url, args.timeout)?;
        reporter = reporter.with_registry(client);
    }

    let summary = reporter.report(&loader, &document)?;
    debug!(
        "{} requirement(s), {} package(s), {} citation(s)",
        summary.requirements, summary.packages, summary.citations
    );
    if summary.failed_lookups > 0 {
        warn!("{} citation lookup(s) failed", summary.failed_lookups);
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(e.as_ref());
            ExitCode::FAILURE
        }
    }
}
