//! Workflow Document Module
//!
//! Typed model, loading and traversal of CWL documents.
//!
//! # Structure
//!
//! - [`model`]: Processes, steps, requirements and hints
//! - [`loader`]: Reading documents from paths and URIs
//! - [`traversal`]: Recursive pre-order walk over steps

pub mod loader;
pub mod model;
pub mod traversal;

pub use loader::{DocumentError, DocumentLoader, LoadedDocument, SUPPORTED_CWL_VERSIONS};
pub use model::{
    CoercionError, DockerRequirement, Hint, Process, Requirement, RequirementScope, RunTarget,
    SoftwarePackage, SoftwareRequirement, Tool, Workflow, WorkflowStep,
};
pub use traversal::{traverse, WalkError, Walker};
