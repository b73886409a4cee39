//! docker-extract
//!
//! Saves every container image referenced from one or more CWL documents,
//! as Docker tarballs or as Singularity images.
//!
//! # Usage
//!
//! ```bash
//! # Save Docker tarballs and print their udocker loading commands
//! docker-extract images/ workflow.cwl
//!
//! # Convert to Singularity images, keeping files already present
//! docker-extract images/ main.cwl extra.cwl --singularity --skip-existing
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use cwl_utils::cli::{print_error, setup_logging};
use cwl_utils::container::{ContainerEngine, ContainerResolver, PullOptions, PullerKind};
use cwl_utils::extract::collect_images;
use cwl_utils::workflow::DocumentLoader;

/// Save all the software container images referenced from one or more CWL
/// workflows or tools.
#[derive(Parser, Debug)]
#[command(name = "docker-extract", version, about)]
struct Args {
    /// Directory in which to save container images
    dir: PathBuf,

    /// CWL documents to search for DockerRequirements
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Use singularity to pull the images
    #[arg(short, long)]
    singularity: bool,

    /// Pull images from the registry even if a local copy exists
    #[arg(long)]
    force_pull: bool,

    /// Don't overwrite existing image files
    #[arg(long)]
    skip_existing: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let loader = DocumentLoader::new();
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    for input in &args.inputs {
        info!("Processing {}.", input);
        let document = loader.load(input)?;
        for image in collect_images(&loader, &document)? {
            if seen.insert(image.clone()) {
                images.push(image);
            }
        }
    }

    if images.is_empty() {
        info!("No container images referenced");
        return Ok(());
    }

    let kind = if args.singularity {
        PullerKind::Singularity
    } else {
        PullerKind::Docker
    };
    let options = PullOptions {
        skip_existing: args.skip_existing,
        force_pull: args.force_pull,
    };

    let engine = ContainerEngine::new(kind.binary());
    let resolver = ContainerResolver::new(&engine, kind, &args.dir)?.with_options(options);

    for pulled in resolver.pull_all(&images)? {
        if pulled.outcome.is_saved() {
            println!("{}", pulled.loading_command);
        }
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
