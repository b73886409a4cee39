//! Document Loader
//!
//! Reads CWL documents from local paths, `file://` URIs or `http(s)://` URIs
//! and turns them into typed [`Process`] trees.
//!
//! Packed documents (`$graph`) are supported: the entry named `main` is the
//! root unless the reference carries a `#fragment`, and `#id` references
//! resolve inside the same graph.

use std::cell::OnceCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};
use serde_yaml::Value;
use thiserror::Error;
use url::Url;

use super::model::Process;

/// CWL versions this loader understands.
pub const SUPPORTED_CWL_VERSIONS: &[&str] = &["v1.0", "v1.1", "v1.2"];

/// Timeout applied when documents are fetched over HTTP.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures while reading or decoding a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("'{reference}' is not a valid document reference: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("unsupported URI scheme '{scheme}' in {uri}")]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("failed to read {uri}: {source}")]
    Read {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {uri}: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse {uri}: {source}")]
    Parse {
        uri: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{uri} is not a CWL document (expected a mapping at the top level)")]
    NotAMapping { uri: String },

    #[error("{uri} has no cwlVersion")]
    MissingVersion { uri: String },

    #[error("{uri} uses cwlVersion {version}, supported versions are {}", SUPPORTED_CWL_VERSIONS.join(", "))]
    UnsupportedVersion { uri: String, version: String },

    #[error("no process '#{fragment}' in {uri}")]
    MissingEntry { uri: String, fragment: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A parsed document together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    uri: Url,
    version: String,
    process: Process,
    graph: Rc<Vec<Process>>,
    packed: bool,
}

impl LoadedDocument {
    /// Location of the process, including the fragment when one was selected.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn process(&self) -> &Process {
        &self.process
    }
}

/// Loads CWL documents by reference.
///
/// The HTTP client is only built the first time a remote document is
/// requested and lives as long as the loader.
#[derive(Debug)]
pub struct DocumentLoader {
    timeout: Duration,
    http: OnceCell<reqwest::blocking::Client>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            http: OnceCell::new(),
        }
    }

    /// Loads a root document from a path or URI.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cwl_utils::workflow::DocumentLoader;
    ///
    /// fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let document = DocumentLoader::new().load("workflow.cwl")?;
    ///     println!("{} ({})", document.uri(), document.process().class_name());
    ///     Ok(())
    /// }
    /// ```
    pub fn load(&self, reference: &str) -> Result<LoadedDocument, DocumentError> {
        let uri = reference_to_url(reference)?;
        info!("Loading document: {}", uri);
        self.load_url(uri)
    }

    /// Resolves a step's `run` reference relative to the document containing it.
    pub fn resolve(
        &self,
        reference: &str,
        base: &LoadedDocument,
    ) -> Result<LoadedDocument, DocumentError> {
        if let Some(fragment) = reference.strip_prefix('#') {
            let mut uri = base.uri.clone();
            uri.set_fragment(Some(fragment));
            debug!("Resolving {} inside {}", reference, base.uri);
            return select(uri, base.version.clone(), Rc::clone(&base.graph), base.packed);
        }

        let uri = base.uri.join(reference).map_err(|e| DocumentError::InvalidReference {
            reference: reference.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Resolved {} to {}", reference, uri);
        self.load_url(uri)
    }

    fn load_url(&self, uri: Url) -> Result<LoadedDocument, DocumentError> {
        let mut location = uri.clone();
        location.set_fragment(None);

        let text = self.fetch(&location)?;
        debug!("Document content loaded ({} bytes)", text.len());

        let (version, graph, packed) = parse_document(&text, &location)?;
        select(uri, version, Rc::new(graph), packed)
    }

    fn fetch(&self, location: &Url) -> Result<String, DocumentError> {
        match location.scheme() {
            "file" => {
                let path = location.to_file_path().map_err(|_| DocumentError::InvalidReference {
                    reference: location.to_string(),
                    reason: "not a local file path".to_string(),
                })?;
                fs::read_to_string(&path).map_err(|source| DocumentError::Read {
                    uri: location.to_string(),
                    source,
                })
            }
            "http" | "https" => {
                let fetch_error = |source| DocumentError::Fetch {
                    uri: location.to_string(),
                    source,
                };
                self.http_client()?
                    .get(location.clone())
                    .send()
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.text())
                    .map_err(fetch_error)
            }
            scheme => Err(DocumentError::UnsupportedScheme {
                uri: location.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }

    fn http_client(&self) -> Result<&reqwest::blocking::Client, DocumentError> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(DocumentError::Client)?;
        Ok(self.http.get_or_init(|| client))
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a command-line style reference into an absolute URL.
fn reference_to_url(reference: &str) -> Result<Url, DocumentError> {
    if let Ok(url) = Url::parse(reference) {
        if matches!(url.scheme(), "file" | "http" | "https") {
            return Ok(url);
        }
    }

    let path = Path::new(reference);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| DocumentError::Read {
                uri: reference.to_string(),
                source,
            })?
            .join(path)
    };

    Url::from_file_path(&absolute).map_err(|_| DocumentError::InvalidReference {
        reference: reference.to_string(),
        reason: "cannot be expressed as a file URI".to_string(),
    })
}

/// Parses document text into its version, its list of processes and
/// whether it was a packed `$graph` document.
fn parse_document(
    text: &str,
    location: &Url,
) -> Result<(String, Vec<Process>, bool), DocumentError> {
    let uri = || location.to_string();
    let parse_error = |source| DocumentError::Parse { uri: uri(), source };

    let root: Value = serde_yaml::from_str(text).map_err(parse_error)?;
    let Value::Mapping(mut root) = root else {
        return Err(DocumentError::NotAMapping { uri: uri() });
    };

    let version = match root.get("cwlVersion") {
        Some(Value::String(version)) => version.clone(),
        _ => return Err(DocumentError::MissingVersion { uri: uri() }),
    };
    if !SUPPORTED_CWL_VERSIONS.contains(&version.as_str()) {
        return Err(DocumentError::UnsupportedVersion { uri: uri(), version });
    }

    let (processes, packed) = match root.remove("$graph") {
        Some(Value::Sequence(entries)) => {
            let processes = entries
                .into_iter()
                .map(serde_yaml::from_value)
                .collect::<Result<Vec<Process>, _>>()
                .map_err(parse_error)?;
            (processes, true)
        }
        Some(_) => return Err(DocumentError::NotAMapping { uri: uri() }),
        None => (
            vec![serde_yaml::from_value(Value::Mapping(root)).map_err(parse_error)?],
            false,
        ),
    };

    Ok((version, processes, packed))
}

/// Picks the process `uri` points at out of a document's graph.
///
/// Entries of a packed document are always addressed by fragment, so the
/// default `main` entry gets `#main` added to its URI. Inline processes
/// without an id are named after the step that runs them.
fn select(
    mut uri: Url,
    version: String,
    graph: Rc<Vec<Process>>,
    packed: bool,
) -> Result<LoadedDocument, DocumentError> {
    let fragment = uri.fragment().filter(|f| !f.is_empty()).map(str::to_owned);

    let found = match fragment.as_deref() {
        Some(fragment) => graph
            .iter()
            .find(|p| p.id().is_some_and(|id| fragment_of(id) == fragment))
            .or_else(|| (graph.len() == 1 && graph[0].id().is_none()).then(|| &graph[0])),
        None if graph.len() == 1 => graph.first(),
        None => graph
            .iter()
            .find(|p| p.id().is_some_and(|id| fragment_of(id) == "main")),
    };

    let Some(process) = found else {
        return Err(DocumentError::MissingEntry {
            uri: uri.to_string(),
            fragment: fragment.unwrap_or_else(|| "main".to_string()),
        });
    };

    let mut process = process.clone();
    if packed && uri.fragment().is_none() {
        if let Some(id) = process.id() {
            uri.set_fragment(Some(fragment_of(id)));
        }
    }
    if process.id().is_none() {
        process.set_id(uri.as_str());
    }

    let mut location = uri.clone();
    location.set_fragment(None);
    process.name_inline_processes(location.as_str());

    Ok(LoadedDocument {
        uri,
        version,
        process,
        graph,
        packed,
    })
}

/// Last `#` component of an id, e.g. `main` for `file:///wf.cwl#main`.
fn fragment_of(id: &str) -> &str {
    id.rsplit('#').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const TOOL: &str = r#"
cwlVersion: v1.0
class: CommandLineTool
baseCommand: echo
"#;

    #[test]
    fn test_load_relative_path_sets_root_id() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("echo.cwl");
        fs::write(&path, TOOL).unwrap();

        let document = DocumentLoader::new().load(path.to_str().unwrap()).unwrap();

        assert_eq!(document.version(), "v1.0");
        assert_eq!(document.uri().scheme(), "file");
        assert!(document.process().id().unwrap().ends_with("echo.cwl"));
    }

    #[test]
    fn test_load_file_uri() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("echo.cwl");
        fs::write(&path, TOOL).unwrap();
        let uri = Url::from_file_path(&path).unwrap();

        let document = DocumentLoader::new().load(uri.as_str()).unwrap();
        assert_eq!(document.uri(), &uri);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DocumentLoader::new().load("/nonexistent/path/workflow.cwl");
        assert!(matches!(result, Err(DocumentError::Read { .. })));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.cwl");
        fs::write(&path, "this is not valid yaml: [[[").unwrap();

        let result = DocumentLoader::new().load(path.to_str().unwrap());
        assert!(matches!(result, Err(DocumentError::Parse { .. })));
    }

    #[test]
    fn test_load_unsupported_version() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("draft.cwl");
        fs::write(&path, "cwlVersion: draft-3\nclass: CommandLineTool\n").unwrap();

        let err = DocumentLoader::new().load(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion { ref version, .. } if version == "draft-3"));
        assert!(err.to_string().contains("v1.2"));
    }

    #[test]
    fn test_load_missing_version() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("noversion.cwl");
        fs::write(&path, "class: CommandLineTool\n").unwrap();

        let result = DocumentLoader::new().load(path.to_str().unwrap());
        assert!(matches!(result, Err(DocumentError::MissingVersion { .. })));
    }

    #[test]
    fn test_load_rejects_unknown_scheme() {
        let loader = DocumentLoader::new();
        let location = Url::parse("ftp://example.org/wf.cwl").unwrap();
        assert!(matches!(
            loader.fetch(&location),
            Err(DocumentError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_load_over_http() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/tools/echo.cwl")
            .with_status(200)
            .with_body(TOOL)
            .create();

        let loader = DocumentLoader::with_timeout(Duration::from_secs(5));
        let document = loader.load(&format!("{}/tools/echo.cwl", server.url())).unwrap();

        assert_eq!(document.process().class_name(), "CommandLineTool");
        assert_eq!(document.uri().scheme(), "http");
        mock.assert();
    }

    #[test]
    fn test_http_fetch_honors_timeout() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/slow.cwl")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(3));
                w.write_all(TOOL.as_bytes())
            })
            .create();

        let loader = DocumentLoader::with_timeout(Duration::from_secs(1));
        let result = loader.load(&format!("{}/slow.cwl", server.url()));

        assert!(matches!(result, Err(DocumentError::Fetch { .. })));
    }

    #[test]
    fn test_resolve_relative_to_parent() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("tools")).unwrap();
        fs::write(temp_dir.path().join("tools/echo.cwl"), TOOL).unwrap();
        fs::write(
            temp_dir.path().join("wf.cwl"),
            "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  - id: a\n    run: tools/echo.cwl\n",
        )
        .unwrap();

        // Resolution must not depend on the current directory.
        let loader = DocumentLoader::new();
        let root = loader.load(temp_dir.path().join("wf.cwl").to_str().unwrap()).unwrap();
        let child = loader.resolve("tools/echo.cwl", &root).unwrap();

        assert!(child.uri().path().ends_with("/tools/echo.cwl"));
        assert_eq!(child.process().class_name(), "CommandLineTool");
    }

    #[test]
    fn test_packed_graph_selects_main_and_fragments() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("packed.cwl");
        fs::write(
            &path,
            r##"
cwlVersion: v1.2
$graph:
  - class: CommandLineTool
    id: "#echo"
  - class: Workflow
    id: "#main"
    steps:
      - id: "#main/say"
        run: "#echo"
"##,
        )
        .unwrap();

        let loader = DocumentLoader::new();
        let root = loader.load(path.to_str().unwrap()).unwrap();
        assert_eq!(root.process().id(), Some("#main"));
        assert_eq!(root.uri().fragment(), Some("main"));
        assert_eq!(loader.resolve("#main", &root).unwrap().uri(), root.uri());

        let tool = loader.resolve("#echo", &root).unwrap();
        assert_eq!(tool.process().id(), Some("#echo"));
        assert_eq!(tool.uri().fragment(), Some("echo"));
        assert_eq!(tool.version(), "v1.2");
    }

    #[test]
    fn test_packed_graph_missing_entry() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("packed.cwl");
        fs::write(
            &path,
            "cwlVersion: v1.0\n$graph:\n  - {class: CommandLineTool, id: '#a'}\n  - {class: CommandLineTool, id: '#b'}\n",
        )
        .unwrap();

        let result = DocumentLoader::new().load(path.to_str().unwrap());
        assert!(matches!(result, Err(DocumentError::MissingEntry { ref fragment, .. }) if fragment == "main"));
    }

    #[test]
    fn test_fragment_of() {
        assert_eq!(fragment_of("#main"), "main");
        assert_eq!(fragment_of("main"), "main");
        assert_eq!(fragment_of("file:///tmp/wf.cwl#main"), "main");
    }
}
