//! bio.tools Registry Client
//!
//! Resolves bio.tools identifiers found in package specs and extracts the
//! DOIs of their primary publications.
//!
//! The lookup endpoint is `{base}/api/tool/{id}/?format=json`, which answers
//! with a JSON object whose `publication` array lists entries with a `type`
//! and a `doi`.

use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

/// Public bio.tools instance.
pub const DEFAULT_BIOTOOLS_URL: &str = "https://bio.tools";

/// Substring marking a spec as a bio.tools reference.
pub const BIOTOOLS_MARKER: &str = "bio.tools";

/// Compact identifier prefix, as in `https://identifiers.org/biotools:bwa`.
pub const BIOTOOLS_PREFIX: &str = "biotools:";

/// Prefix of resolvable DOI links.
pub const DOI_RESOLVER: &str = "https://doi.org/";

/// Timeout for a single registry lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Publication type selecting the citation to report.
const PRIMARY: &str = "Primary";

/// Failures of a single registry lookup.
#[derive(Debug, Error)]
pub enum CitationError {
    #[error("spec '{spec}' does not end in a bio.tools identifier")]
    EmptyIdentifier { spec: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid metadata from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The part of a bio.tools entry this crate reads.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ToolMetadata {
    #[serde(default)]
    pub publication: Vec<Publication>,
}

/// One entry of a tool's `publication` list.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Publication {
    #[serde(rename = "type", default)]
    pub kind: Option<PublicationType>,

    #[serde(default)]
    pub doi: Option<String>,
}

/// bio.tools returns the type as a list; older dumps use a plain string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PublicationType {
    Text(String),
    List(Vec<String>),
}

impl Publication {
    /// True when the publication is marked as the primary reference.
    pub fn is_primary(&self) -> bool {
        match &self.kind {
            Some(PublicationType::Text(kind)) => kind.contains(PRIMARY),
            Some(PublicationType::List(kinds)) => kinds.iter().any(|kind| kind == PRIMARY),
            None => false,
        }
    }
}

/// Returns true if `spec` points at bio.tools, directly or through a
/// `biotools:` compact identifier.
pub fn is_biotools_spec(spec: &str) -> bool {
    spec.contains(BIOTOOLS_MARKER) || last_segment(spec).starts_with(BIOTOOLS_PREFIX)
}

fn last_segment(spec: &str) -> &str {
    spec.rsplit('/').next().unwrap_or(spec)
}

/// Extracts the registry identifier from a spec string.
///
/// The identifier is everything after the last `/`, without an
/// identifiers.org style `biotools:` prefix. A spec ending in `/` has no
/// identifier and is rejected rather than looked up.
pub fn biotools_id(spec: &str) -> Result<&str, CitationError> {
    let last = last_segment(spec);
    let id = last.strip_prefix(BIOTOOLS_PREFIX).unwrap_or(last);

    if id.is_empty() {
        return Err(CitationError::EmptyIdentifier {
            spec: spec.to_string(),
        });
    }
    Ok(id)
}

/// Builds DOI links for every primary publication, in list order.
///
/// Primary entries without a DOI are skipped.
pub fn extract_citation(metadata: &ToolMetadata) -> Vec<String> {
    let mut dois = Vec::new();

    for publication in metadata.publication.iter().filter(|p| p.is_primary()) {
        match publication.doi.as_deref().map(str::trim) {
            Some(doi) if !doi.is_empty() => dois.push(format!("{}{}", DOI_RESOLVER, doi)),
            _ => warn!("Primary publication without DOI, skipping"),
        }
    }

    dois
}

/// Blocking client for the bio.tools lookup API.
#[derive(Debug, Clone)]
pub struct BiotoolsClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl BiotoolsClient {
    /// Creates a client for the registry at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CitationError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CitationError::Client)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lookup URL for a tool identifier.
    pub fn tool_url(&self, id: &str) -> String {
        format!("{}/api/tool/{}/?format=json", self.base_url, id)
    }

    /// Fetches the registry entry of `id`.
    pub fn fetch_metadata(&self, id: &str) -> Result<ToolMetadata, CitationError> {
        let url = self.tool_url(id);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().map_err(|source| CitationError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CitationError::Status { url, status });
        }

        let body = response.text().map_err(|source| CitationError::Request {
            url: url.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| CitationError::Decode { url, source })
    }

    /// Resolves a spec string to the DOI links of the tool's primary
    /// publications.
    pub fn lookup_citation(&self, spec: &str) -> Result<Vec<String>, CitationError> {
        let id = biotools_id(spec)?;
        let metadata = self.fetch_metadata(id)?;
        Ok(extract_citation(&metadata))
    }
}
