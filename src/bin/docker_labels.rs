//! docker-labels
//!
//! Prints the labels and id of every local image matching a name.
//!
//! # Usage
//!
//! ```bash
//! docker-labels samtools:build_1.2-0
//! ```

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use cwl_utils::cli::{print_error, setup_logging};
use cwl_utils::container::{list_images, ContainerEngine};
use cwl_utils::display::PyDict;

/// Print the labels of local container images.
#[derive(Parser, Debug)]
#[command(name = "docker-labels", version, about)]
struct Args {
    /// Image name or reference to look up
    image: String,

    /// Container engine executable
    #[arg(long, env = "CWL_UTILS_CONTAINER_ENGINE", default_value = "docker")]
    engine: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let engine = ContainerEngine::new(args.engine).connect()?;
    let images = list_images(&engine, &args.image)?;

    if images.is_empty() {
        info!("No local image matches '{}'", args.image);
    }

    for image in &images {
        println!("{}", PyDict(&image.labels));
        println!("{}", image.id);
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
