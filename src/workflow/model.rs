//! Workflow Data Model
//!
//! Typed, read-only view over a loaded CWL document.
//!
//! # Example YAML Format
//!
//! ```yaml
//! cwlVersion: v1.0
//! class: Workflow
//! steps:
//!   - id: align
//!     run: bwa-mem.cwl
//!   - id: index
//!     run:
//!       class: CommandLineTool
//!       baseCommand: [samtools, index]
//!       hints:
//!         SoftwareRequirement:
//!           packages:
//!             samtools:
//!               version: ["1.9"]
//!               specs: ["https://bio.tools/samtools"]
//! ```
//!
//! Requirements, hints, steps and packages are accepted in both the list
//! form and the map form of CWL and normalized to ordered lists.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Class name of a software requirement.
pub const SOFTWARE_REQUIREMENT: &str = "SoftwareRequirement";

/// Class name of a container requirement.
pub const DOCKER_REQUIREMENT: &str = "DockerRequirement";

/// A tool or (sub-)workflow node of a CWL document.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "class")]
pub enum Process {
    Workflow(Workflow),
    CommandLineTool(Tool),
    ExpressionTool(Tool),
    Operation(Tool),
}

/// A multi-step process.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Workflow {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default, deserialize_with = "requirement_list")]
    pub requirements: Vec<Requirement>,

    #[serde(default, deserialize_with = "hint_list")]
    pub hints: Vec<Hint>,

    /// Steps in declared order
    #[serde(default, deserialize_with = "step_list")]
    pub steps: Vec<WorkflowStep>,
}

/// A leaf process: command line tool, expression tool or abstract operation.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Tool {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default, deserialize_with = "requirement_list")]
    pub requirements: Vec<Requirement>,

    #[serde(default, deserialize_with = "hint_list")]
    pub hints: Vec<Hint>,

    #[serde(rename = "baseCommand", default, deserialize_with = "optional_string_list")]
    pub base_command: Option<Vec<String>>,
}

/// A workflow step pointing at the process it runs.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowStep {
    #[serde(default)]
    pub id: String,

    #[serde(default, deserialize_with = "requirement_list")]
    pub requirements: Vec<Requirement>,

    #[serde(default, deserialize_with = "hint_list")]
    pub hints: Vec<Hint>,

    pub run: RunTarget,
}

/// Target of a step's `run` field.
#[derive(Debug, Clone, PartialEq)]
pub enum RunTarget {
    /// Path, URI or `#fragment` of another document
    Reference(String),
    /// Process embedded in the step
    Inline(Box<Process>),
}

/// A typed requirement declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Software(SoftwareRequirement),
    Docker(DockerRequirement),
    /// Any class this crate has no use for
    Other { class: String },
}

/// A list of software packages a process depends on.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SoftwareRequirement {
    #[serde(default, deserialize_with = "package_list")]
    pub packages: Vec<SoftwarePackage>,
}

/// One package entry of a [`SoftwareRequirement`].
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SoftwarePackage {
    pub package: String,

    #[serde(default, deserialize_with = "optional_string_list")]
    pub version: Option<Vec<String>>,

    /// Free-form identifiers, some of them registry URLs
    #[serde(default, deserialize_with = "optional_string_list")]
    pub specs: Option<Vec<String>>,
}

/// Container image declaration.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DockerRequirement {
    #[serde(rename = "dockerPull", default)]
    pub docker_pull: Option<String>,

    #[serde(rename = "dockerLoad", default)]
    pub docker_load: Option<String>,

    #[serde(rename = "dockerFile", default)]
    pub docker_file: Option<String>,

    #[serde(rename = "dockerImport", default)]
    pub docker_import: Option<String>,

    #[serde(rename = "dockerImageId", default)]
    pub docker_image_id: Option<String>,

    #[serde(rename = "dockerOutputDirectory", default)]
    pub docker_output_directory: Option<String>,
}

/// Advisory requirement.
///
/// Documents loaded from disk only produce [`Hint::Raw`]; hints are not
/// validated at load time and must go through [`Hint::coerce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    Requirement(Requirement),
    Raw(Value),
}

/// A raw hint could not be turned into a typed requirement.
#[derive(Debug, Error)]
#[error("invalid {class} hint on '{owner}': {source}")]
pub struct CoercionError {
    pub owner: String,
    pub class: String,
    #[source]
    pub source: serde_yaml::Error,
}

/// Borrowed view of the requirement-bearing part of a process or step.
#[derive(Debug, Clone, Copy)]
pub struct RequirementScope<'a> {
    pub id: &'a str,
    pub requirements: &'a [Requirement],
    pub hints: &'a [Hint],
}

impl Process {
    /// Returns the declared identifier, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Workflow(w) => w.id.as_deref(),
            Self::CommandLineTool(t) | Self::ExpressionTool(t) | Self::Operation(t) => {
                t.id.as_deref()
            }
        }
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        let id = Some(id.into());
        match self {
            Self::Workflow(w) => w.id = id,
            Self::CommandLineTool(t) | Self::ExpressionTool(t) | Self::Operation(t) => t.id = id,
        }
    }

    /// CWL class name of this process.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Workflow(_) => "Workflow",
            Self::CommandLineTool(_) => "CommandLineTool",
            Self::ExpressionTool(_) => "ExpressionTool",
            Self::Operation(_) => "Operation",
        }
    }

    pub fn requirements(&self) -> &[Requirement] {
        match self {
            Self::Workflow(w) => &w.requirements,
            Self::CommandLineTool(t) | Self::ExpressionTool(t) | Self::Operation(t) => {
                &t.requirements
            }
        }
    }

    pub fn hints(&self) -> &[Hint] {
        match self {
            Self::Workflow(w) => &w.hints,
            Self::CommandLineTool(t) | Self::ExpressionTool(t) | Self::Operation(t) => &t.hints,
        }
    }

    /// Steps of a workflow; empty for every other class.
    pub fn steps(&self) -> &[WorkflowStep] {
        match self {
            Self::Workflow(w) => &w.steps,
            _ => &[],
        }
    }

    /// Gives every inline `run` process without an id the id
    /// `{location}#{step}/run`, recursing into inline workflows.
    pub(crate) fn name_inline_processes(&mut self, location: &str) {
        let Self::Workflow(workflow) = self else {
            return;
        };

        for step in &mut workflow.steps {
            let RunTarget::Inline(inner) = &mut step.run else {
                continue;
            };
            if inner.id().is_none() {
                let step_id = if step.id.contains('#') {
                    step.id.clone()
                } else {
                    format!("{}#{}", location, step.id)
                };
                inner.set_id(format!("{}/run", step_id));
            }
            inner.name_inline_processes(location);
        }
    }

    pub fn is_workflow(&self) -> bool {
        matches!(self, Self::Workflow(_))
    }

    pub fn scope(&self) -> RequirementScope<'_> {
        RequirementScope {
            id: self.id().unwrap_or(""),
            requirements: self.requirements(),
            hints: self.hints(),
        }
    }
}

impl WorkflowStep {
    pub fn scope(&self) -> RequirementScope<'_> {
        RequirementScope {
            id: &self.id,
            requirements: &self.requirements,
            hints: &self.hints,
        }
    }
}

impl Requirement {
    /// Builds a typed requirement from a record carrying a `class` field.
    pub fn from_value(value: Value) -> Result<Self, serde_yaml::Error> {
        let class = value
            .get("class")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| <serde_yaml::Error as de::Error>::custom("missing 'class' field"))?;

        match class.as_str() {
            SOFTWARE_REQUIREMENT => Ok(Self::Software(serde_yaml::from_value(value)?)),
            DOCKER_REQUIREMENT => Ok(Self::Docker(serde_yaml::from_value(value)?)),
            _ => Ok(Self::Other { class }),
        }
    }

    pub fn class(&self) -> &str {
        match self {
            Self::Software(_) => SOFTWARE_REQUIREMENT,
            Self::Docker(_) => DOCKER_REQUIREMENT,
            Self::Other { class } => class,
        }
    }
}

impl Hint {
    /// Class name of the hint, if it has one.
    pub fn class(&self) -> Option<&str> {
        match self {
            Self::Requirement(req) => Some(req.class()),
            Self::Raw(value) => value.get("class").and_then(Value::as_str),
        }
    }

    /// Validates the hint into a typed requirement.
    ///
    /// `owner` is the id of the process or step carrying the hint and is
    /// only used for error reporting.
    pub fn coerce(&self, owner: &str) -> Result<Requirement, CoercionError> {
        match self {
            Self::Requirement(req) => Ok(req.clone()),
            Self::Raw(value) => Requirement::from_value(value.clone()).map_err(|source| {
                CoercionError {
                    owner: owner.to_string(),
                    class: self.class().unwrap_or("unknown").to_string(),
                    source,
                }
            }),
        }
    }
}

impl SoftwarePackage {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: None,
            specs: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version.get_or_insert_with(Vec::new).push(version.into());
        self
    }

    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.specs.get_or_insert_with(Vec::new).push(spec.into());
        self
    }

    /// Spec strings, empty when none are declared.
    pub fn specs(&self) -> &[String] {
        self.specs.as_deref().unwrap_or(&[])
    }
}

impl<'de> Deserialize<'de> for RunTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(reference) => Ok(Self::Reference(reference)),
            value @ Value::Mapping(_) => serde_yaml::from_value(value)
                .map(|process| Self::Inline(Box::new(process)))
                .map_err(de::Error::custom),
            _ => Err(de::Error::custom(
                "'run' must be a document reference or an inline process",
            )),
        }
    }
}

/// Turns the map form `{key: {...}}` into a list of records with `key`
/// stored under `key_field`. The list form passes through unchanged.
fn normalize_keyed<E: de::Error>(value: Value, key_field: &str) -> Result<Vec<Value>, E> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => Ok(items),
        Value::Mapping(map) => map
            .into_iter()
            .map(|(key, body)| {
                let mut record = match body {
                    Value::Mapping(record) => record,
                    Value::Null => Mapping::new(),
                    _ => return Err(E::custom(format!("expected a mapping under {:?}", key))),
                };
                record.insert(Value::String(key_field.to_string()), key);
                Ok(Value::Mapping(record))
            })
            .collect(),
        _ => Err(E::custom("expected a list or a mapping")),
    }
}

fn requirement_list<'de, D>(deserializer: D) -> Result<Vec<Requirement>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = normalize_keyed::<D::Error>(Value::deserialize(deserializer)?, "class")?;
    records
        .into_iter()
        .map(|record| Requirement::from_value(record).map_err(de::Error::custom))
        .collect()
}

fn hint_list<'de, D>(deserializer: D) -> Result<Vec<Hint>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = normalize_keyed::<D::Error>(Value::deserialize(deserializer)?, "class")?;
    Ok(records.into_iter().map(Hint::Raw).collect())
}

fn step_list<'de, D>(deserializer: D) -> Result<Vec<WorkflowStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = normalize_keyed::<D::Error>(Value::deserialize(deserializer)?, "id")?;
    records
        .into_iter()
        .map(|record| serde_yaml::from_value(record).map_err(de::Error::custom))
        .collect()
}

fn package_list<'de, D>(deserializer: D) -> Result<Vec<SoftwarePackage>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = normalize_keyed::<D::Error>(Value::deserialize(deserializer)?, "package")?;
    records
        .into_iter()
        .map(|record| serde_yaml::from_value(record).map_err(de::Error::custom))
        .collect()
}

/// Deserializes a scalar or a list of scalars into an optional string list.
///
/// Unquoted YAML versions such as `1.9` arrive as numbers and are kept in
/// their textual form.
fn optional_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    fn scalar<E: de::Error>(value: Value) -> Result<String, E> {
        match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(E::custom("expected a string")),
        }
    }

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Sequence(items) => items.into_iter().map(scalar::<D::Error>).collect::<Result<_, _>>().map(Some),
        other => scalar::<D::Error>(other).map(|s| Some(vec![s])),
    }
}
