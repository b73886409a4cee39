//! Metadata Reporter
//!
//! Prints the software packages of every process and step in a document
//! and, when a registry is configured, the primary citations of packages
//! whose specs point at bio.tools.
//!
//! # Output Format
//!
//! ```text
//! file:///data/align.cwl
//! Package: bwa, version: ['0.7.17'], specs: ['https://bio.tools/bwa']
//! ['https://doi.org/10.1093/bioinformatics/btp324']
//! ```
//!
//! A failed lookup is logged with the owning process id and package name
//! and the report moves on, unless fail-fast mode is enabled.

use std::io::Write;

use log::error;
use thiserror::Error;

use super::biotools::{is_biotools_spec, BiotoolsClient, CitationError};
use crate::display::{PyList, PyOptList};
use crate::extract::extract_software_reqs;
use crate::workflow::traversal::traverse;
use crate::workflow::{
    CoercionError, DocumentLoader, LoadedDocument, RequirementScope, SoftwareRequirement,
    WalkError,
};

/// Failures that stop a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("lookup for package '{package}' of '{owner}' failed: {source}")]
    Lookup {
        owner: String,
        package: String,
        #[source]
        source: CitationError,
    },
}

/// Counters collected while reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub requirements: usize,
    pub packages: usize,
    pub citations: usize,
    pub failed_lookups: usize,
}

/// Writes the software report for a document to `out`.
pub struct MetadataReporter<W: Write> {
    out: W,
    registry: Option<BiotoolsClient>,
    fail_fast: bool,
    summary: ReportSummary,
}

impl<W: Write> MetadataReporter<W> {
    /// Creates a reporter that prints packages only.
    pub fn new(out: W) -> Self {
        Self {
            out,
            registry: None,
            fail_fast: false,
            summary: ReportSummary::default(),
        }
    }

    /// Enables citation lookups against `client`.
    pub fn with_registry(mut self, client: BiotoolsClient) -> Self {
        self.registry = Some(client);
        self
    }

    /// Makes the first failed lookup abort the report.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn summary(&self) -> ReportSummary {
        self.summary
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Walks `document` and reports every process and step on the way.
    pub fn report(
        &mut self,
        loader: &DocumentLoader,
        document: &LoadedDocument,
    ) -> Result<ReportSummary, WalkError> {
        traverse(loader, document, |scope| {
            self.report_scope(scope).map_err(WalkError::visitor)
        })?;
        self.out.flush().map_err(WalkError::visitor)?;
        Ok(self.summary)
    }

    /// Reports the software requirements of one process or step.
    pub fn report_scope(&mut self, scope: RequirementScope<'_>) -> Result<(), ReportError> {
        for req in extract_software_reqs(scope) {
            let req = req?;
            self.summary.requirements += 1;

            writeln!(self.out, "{}", scope.id)?;
            self.print_packages(&req)?;
            self.print_citations(scope.id, &req)?;
        }
        Ok(())
    }

    fn print_packages(&mut self, req: &SoftwareRequirement) -> Result<(), ReportError> {
        for package in &req.packages {
            self.summary.packages += 1;
            writeln!(
                self.out,
                "Package: {}, version: {}, specs: {}",
                package.package,
                PyOptList(package.version.as_deref()),
                PyOptList(package.specs.as_deref())
            )?;
        }
        Ok(())
    }

    fn print_citations(&mut self, owner: &str, req: &SoftwareRequirement) -> Result<(), ReportError> {
        let Some(registry) = &self.registry else {
            return Ok(());
        };

        for package in &req.packages {
            for spec in package.specs().iter().filter(|spec| is_biotools_spec(spec)) {
                match registry.lookup_citation(spec) {
                    Ok(dois) => {
                        self.summary.citations += dois.len();
                        writeln!(self.out, "{}", PyList(&dois))?;
                    }
                    Err(source) => {
                        self.summary.failed_lookups += 1;
                        if self.fail_fast {
                            return Err(ReportError::Lookup {
                                owner: owner.to_string(),
                                package: package.package.clone(),
                                source,
                            });
                        }
                        error!(
                            "Lookup for package '{}' of '{}' failed: {}",
                            package.package, owner, source
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
