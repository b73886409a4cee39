//! Document Traversal
//!
//! Pre-order walk over a process and every process reachable through its
//! steps. For each workflow step the step itself is visited before the
//! process it runs, so requirements declared on the step are seen too.

use std::error::Error as StdError;

use log::debug;
use thiserror::Error;

use super::loader::{DocumentError, DocumentLoader, LoadedDocument};
use super::model::{Process, RequirementScope, RunTarget};

/// Failures that end a traversal.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("cyclic workflow: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("{0}")]
    Visitor(Box<dyn StdError + Send + Sync>),
}

impl WalkError {
    /// Wraps an error raised by a visitor callback.
    pub fn visitor(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Visitor(err.into())
    }
}

/// Walks a document tree, loading referenced documents on demand.
///
/// Documents currently being walked are kept on a stack; a step that refers
/// back to one of them fails with [`WalkError::Cycle`]. The same document
/// used by two sibling steps is walked twice.
pub struct Walker<'a> {
    loader: &'a DocumentLoader,
    stack: Vec<String>,
}

impl<'a> Walker<'a> {
    pub fn new(loader: &'a DocumentLoader) -> Self {
        Self {
            loader,
            stack: Vec::new(),
        }
    }

    /// Visits `document`'s process and then, for workflows, each step in
    /// declared order followed by the process that step runs.
    pub fn traverse<F>(&mut self, document: &LoadedDocument, visit: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(RequirementScope<'_>) -> Result<(), WalkError>,
    {
        let identity = document.uri().to_string();
        if let Some(start) = self.stack.iter().position(|open| *open == identity) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(identity);
            return Err(WalkError::Cycle { chain });
        }

        self.stack.push(identity);
        let result = self.traverse_process(document.process(), document, visit);
        self.stack.pop();
        result
    }

    fn traverse_process<F>(
        &mut self,
        process: &Process,
        document: &LoadedDocument,
        visit: &mut F,
    ) -> Result<(), WalkError>
    where
        F: FnMut(RequirementScope<'_>) -> Result<(), WalkError>,
    {
        visit(process.scope())?;

        for step in process.steps() {
            debug!("Visiting step '{}'", step.id);
            visit(step.scope())?;

            match &step.run {
                RunTarget::Reference(reference) => {
                    let child = self.loader.resolve(reference, document)?;
                    self.traverse(&child, visit)?;
                }
                RunTarget::Inline(inner) => self.traverse_process(inner, document, visit)?,
            }
        }

        Ok(())
    }
}

/// Convenience wrapper around [`Walker::traverse`].
pub fn traverse<F>(
    loader: &DocumentLoader,
    document: &LoadedDocument,
    mut visit: F,
) -> Result<(), WalkError>
where
    F: FnMut(RequirementScope<'_>) -> Result<(), WalkError>,
{
    Walker::new(loader).traverse(document, &mut visit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn visited_ids(root: &Path) -> Result<Vec<String>, WalkError> {
        let loader = DocumentLoader::new();
        let document = loader.load(root.to_str().unwrap())?;
        let mut ids = Vec::new();
        traverse(&loader, &document, |scope| {
            ids.push(scope.id.to_string());
            Ok(())
        })?;
        Ok(ids)
    }

    #[test]
    fn test_preorder_with_nested_workflow() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        write(dir, "leaf.cwl", "cwlVersion: v1.0\nclass: CommandLineTool\nid: leaf\n");
        write(
            dir,
            "sub.cwl",
            "cwlVersion: v1.0\nclass: Workflow\nid: sub\nsteps:\n  - id: sub_step\n    run: leaf.cwl\n",
        );
        write(
            dir,
            "main.cwl",
            r#"
cwlVersion: v1.0
class: Workflow
id: main
steps:
  - id: first
    run: sub.cwl
  - id: second
    run:
      class: CommandLineTool
      id: inline
"#,
        );

        let ids = visited_ids(&dir.join("main.cwl")).unwrap();
        assert_eq!(
            ids,
            vec!["main", "first", "sub", "sub_step", "leaf", "second", "inline"]
        );
    }

    #[test]
    fn test_tool_root_visits_once() {
        let temp_dir = tempdir().unwrap();
        write(temp_dir.path(), "tool.cwl", "cwlVersion: v1.1\nclass: CommandLineTool\nid: t\n");

        let ids = visited_ids(&temp_dir.path().join("tool.cwl")).unwrap();
        assert_eq!(ids, vec!["t"]);
    }

    #[test]
    fn test_shared_tool_is_not_a_cycle() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        write(dir, "tool.cwl", "cwlVersion: v1.0\nclass: CommandLineTool\nid: tool\n");
        write(
            dir,
            "main.cwl",
            "cwlVersion: v1.0\nclass: Workflow\nid: main\nsteps:\n  a:\n    run: tool.cwl\n  b:\n    run: tool.cwl\n",
        );

        let ids = visited_ids(&dir.join("main.cwl")).unwrap();
        assert_eq!(ids, vec!["main", "a", "tool", "b", "tool"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        write(
            dir,
            "loop.cwl",
            "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  - id: again\n    run: loop.cwl\n",
        );

        let err = visited_ids(&dir.join("loop.cwl")).unwrap_err();
        match err {
            WalkError::Cycle { chain } => {
                assert_eq!(chain.len(), 2);
                assert_eq!(chain[0], chain[1]);
                assert!(chain[0].ends_with("loop.cwl"));
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_indirect_cycle() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        write(dir, "a.cwl", "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  - id: to_b\n    run: b.cwl\n");
        write(dir, "b.cwl", "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  - id: to_a\n    run: a.cwl\n");

        let err = visited_ids(&dir.join("a.cwl")).unwrap_err();
        assert!(err.to_string().starts_with("cyclic workflow:"));
        assert!(matches!(err, WalkError::Cycle { ref chain } if chain.len() == 3));
    }

    #[test]
    fn test_missing_step_document_is_fatal() {
        let temp_dir = tempdir().unwrap();
        write(
            temp_dir.path(),
            "main.cwl",
            "cwlVersion: v1.0\nclass: Workflow\nsteps:\n  - id: gone\n    run: missing.cwl\n",
        );

        let err = visited_ids(&temp_dir.path().join("main.cwl")).unwrap_err();
        assert!(matches!(err, WalkError::Document(DocumentError::Read { .. })));
    }

    #[test]
    fn test_visitor_error_stops_walk() {
        let temp_dir = tempdir().unwrap();
        write(
            temp_dir.path(),
            "main.cwl",
            "cwlVersion: v1.0\nclass: Workflow\nid: main\nsteps:\n  - id: a\n    run: {class: CommandLineTool}\n",
        );

        let loader = DocumentLoader::new();
        let document = loader.load(temp_dir.path().join("main.cwl").to_str().unwrap()).unwrap();
        let mut calls = 0;
        let result = traverse(&loader, &document, |_| {
            calls += 1;
            Err(WalkError::visitor("stop"))
        });

        assert!(matches!(result, Err(WalkError::Visitor(_))));
        assert_eq!(calls, 1);
    }
}
