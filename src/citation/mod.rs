//! Citation Metadata Module
//!
//! Looks up software packages in the bio.tools registry and reports their
//! primary citations.
//!
//! - [`biotools`]: Registry client and citation extraction
//! - [`report`]: Package and citation report over a whole document

pub mod biotools;
pub mod report;

pub use biotools::{
    biotools_id, extract_citation, BiotoolsClient, CitationError, ToolMetadata,
    DEFAULT_BIOTOOLS_URL, DEFAULT_LOOKUP_TIMEOUT,
};
pub use report::{MetadataReporter, ReportError, ReportSummary};
