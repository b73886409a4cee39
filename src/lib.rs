//! cwl-utils - Utilities for CWL Documents
//!
//! Walks Common Workflow Language documents, extracts the software and
//! container requirements of every process and step, looks up citations for
//! software packages on bio.tools and saves the referenced container images.
//!
//! # Architecture
//!
//! - [`workflow`]: Document model, loading and recursive traversal
//! - [`extract`]: Software and container requirement extraction
//! - [`citation`]: bio.tools lookups and the package/citation report
//! - [`container`]: Image pullers and label inspection
//! - [`display`]: Output rendering shared by the binaries
//! - [`cli`]: Logging and error reporting for the binaries
//!
//! # Example
//!
//! ```rust,no_run
//! use cwl_utils::citation::MetadataReporter;
//! use cwl_utils::workflow::DocumentLoader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = DocumentLoader::new();
//!     let document = loader.load("workflow.cwl")?;
//!
//!     let mut reporter = MetadataReporter::new(std::io::stdout());
//!     let summary = reporter.report(&loader, &document)?;
//!     println!("{} packages", summary.packages);
//!     Ok(())
//! }
//! ```

pub mod citation;
pub mod cli;
pub mod container;
pub mod display;
pub mod extract;
pub mod workflow;

// Re-export commonly used types
pub use citation::{BiotoolsClient, MetadataReporter};
pub use extract::{collect_images, extract_docker_reqs, extract_software_reqs};
pub use workflow::{traverse, DocumentLoader, LoadedDocument, Process};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cwl-utils";
