//! Container requirement extraction.

use std::collections::HashSet;

use log::{debug, warn};

use crate::workflow::model::DOCKER_REQUIREMENT;
use crate::workflow::traversal::traverse;
use crate::workflow::{
    CoercionError, DockerRequirement, DocumentLoader, LoadedDocument, Requirement,
    RequirementScope, WalkError,
};

/// Returns a lazy iterator over the container requirements of `scope`,
/// requirements first and hints second.
pub fn extract_docker_reqs(
    scope: RequirementScope<'_>,
) -> impl Iterator<Item = Result<DockerRequirement, CoercionError>> + '_ {
    super::extract(scope, DOCKER_REQUIREMENT, |req| match req {
        Requirement::Docker(docker) => Some(docker.clone()),
        _ => None,
    })
}

/// Walks `document` and returns each distinct `dockerPull` reference in the
/// order it is first seen.
///
/// Container requirements that only use `dockerLoad`, `dockerFile` or
/// `dockerImport` cannot be pulled and are skipped with a warning.
pub fn collect_images(
    loader: &DocumentLoader,
    document: &LoadedDocument,
) -> Result<Vec<String>, WalkError> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    traverse(loader, document, |scope| {
        for req in extract_docker_reqs(scope) {
            let req = req.map_err(WalkError::visitor)?;
            match req.docker_pull {
                Some(image) if seen.insert(image.clone()) => {
                    debug!("Found image {} on '{}'", image, scope.id);
                    images.push(image);
                }
                Some(_) => {}
                None => warn!(
                    "{} on '{}' has no dockerPull, skipping",
                    DOCKER_REQUIREMENT, scope.id
                ),
            }
        }
        Ok(())
    })?;

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Hint;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_extract_docker_from_requirements_and_hints() {
        let requirements = vec![Requirement::Docker(DockerRequirement {
            docker_pull: Some("debian:stretch-slim".to_string()),
            ..Default::default()
        })];
        let hints = vec![Hint::Raw(
            serde_yaml::from_str("{class: DockerRequirement, dockerPull: 'quay.io/biocontainers/bwa:0.7.17'}")
                .unwrap(),
        )];
        let scope = RequirementScope {
            id: "tool",
            requirements: &requirements,
            hints: &hints,
        };

        let pulls: Vec<_> = extract_docker_reqs(scope)
            .map(|r| r.unwrap().docker_pull.unwrap())
            .collect();
        assert_eq!(pulls, vec!["debian:stretch-slim", "quay.io/biocontainers/bwa:0.7.17"]);
    }

    #[test]
    fn test_collect_images_dedups_in_first_seen_order() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::write(
            dir.join("md5sum.cwl"),
            r#"
cwlVersion: v1.0
class: CommandLineTool
requirements:
  DockerRequirement:
    dockerPull: debian:stretch-slim
"#,
        )
        .unwrap();
        fs::write(
            dir.join("main.cwl"),
            r#"
cwlVersion: v1.0
class: Workflow
hints:
  - class: DockerRequirement
    dockerPull: alpine:3.18
steps:
  - id: first
    run: md5sum.cwl
  - id: second
    run: md5sum.cwl
  - id: third
    hints:
      DockerRequirement:
        dockerFile: "FROM scratch"
    run:
      class: CommandLineTool
      hints:
        - class: DockerRequirement
          dockerPull: alpine:3.18
"#,
        )
        .unwrap();

        let loader = DocumentLoader::new();
        let document = loader.load(dir.join("main.cwl").to_str().unwrap()).unwrap();
        let images = collect_images(&loader, &document).unwrap();

        assert_eq!(images, vec!["alpine:3.18", "debian:stretch-slim"]);
    }

    #[test]
    fn test_collect_images_none() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("tool.cwl");
        fs::write(&path, "cwlVersion: v1.2\nclass: CommandLineTool\n").unwrap();

        let loader = DocumentLoader::new();
        let document = loader.load(path.to_str().unwrap()).unwrap();
        assert!(collect_images(&loader, &document).unwrap().is_empty());
    }
}
