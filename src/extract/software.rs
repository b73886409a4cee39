//! Software requirement extraction.

use crate::workflow::model::SOFTWARE_REQUIREMENT;
use crate::workflow::{CoercionError, Requirement, RequirementScope, SoftwareRequirement};

/// Returns a lazy iterator over the software requirements of `scope`.
///
/// Entries of `requirements` come first, then matching `hints`, each list in
/// its original order. A hint that fails validation is yielded as an error.
pub fn extract_software_reqs(
    scope: RequirementScope<'_>,
) -> impl Iterator<Item = Result<SoftwareRequirement, CoercionError>> + '_ {
    super::extract(scope, SOFTWARE_REQUIREMENT, |req| match req {
        Requirement::Software(software) => Some(software.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{DockerRequirement, Hint, Process, SoftwarePackage};

    fn software(name: &str) -> SoftwareRequirement {
        SoftwareRequirement {
            packages: vec![SoftwarePackage::new(name)],
        }
    }

    fn raw(yaml: &str) -> Hint {
        Hint::Raw(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_no_requirements_is_empty() {
        let requirements = vec![Requirement::Docker(DockerRequirement::default())];
        let hints = vec![raw("{class: ResourceRequirement, coresMin: 2}")];
        let scope = RequirementScope {
            id: "tool",
            requirements: &requirements,
            hints: &hints,
        };

        assert_eq!(extract_software_reqs(scope).count(), 0);
    }

    #[test]
    fn test_requirement_before_hint() {
        let requirements = vec![Requirement::Software(software("bwa"))];
        let hints = vec![raw("{class: SoftwareRequirement, packages: [{package: samtools}]}")];
        let scope = RequirementScope {
            id: "tool",
            requirements: &requirements,
            hints: &hints,
        };

        let found: Vec<_> = extract_software_reqs(scope).map(Result::unwrap).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].packages[0].package, "bwa");
        assert_eq!(found[1].packages[0].package, "samtools");
    }

    #[test]
    fn test_typed_hint_is_yielded() {
        let hints = vec![Hint::Requirement(Requirement::Software(software("bwa")))];
        let scope = RequirementScope {
            id: "tool",
            requirements: &[],
            hints: &hints,
        };

        let found: Vec<_> = extract_software_reqs(scope).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_ref().unwrap().packages[0].package, "bwa");
    }

    #[test]
    fn test_malformed_hint_yields_error() {
        let hints = vec![
            raw("{class: SoftwareRequirement, packages: [{version: ['1.0']}]}"),
            raw("{class: SoftwareRequirement, packages: [{package: ok}]}"),
        ];
        let scope = RequirementScope {
            id: "#main/align",
            requirements: &[],
            hints: &hints,
        };

        let found: Vec<_> = extract_software_reqs(scope).collect();
        assert_eq!(found.len(), 2);
        let err = found[0].as_ref().unwrap_err();
        assert_eq!(err.owner, "#main/align");
        assert!(found[1].is_ok());
    }

    #[test]
    fn test_hint_without_class_is_ignored() {
        let hints = vec![raw("{packages: [{package: bwa}]}")];
        let scope = RequirementScope {
            id: "tool",
            requirements: &[],
            hints: &hints,
        };

        assert_eq!(extract_software_reqs(scope).count(), 0);
    }

    #[test]
    fn test_extract_from_parsed_process() {
        let process: Process = serde_yaml::from_str(
            r#"
class: CommandLineTool
id: align
requirements:
  SoftwareRequirement:
    packages:
      - package: bwa
        version: ["0.7.17"]
hints:
  - class: DockerRequirement
    dockerPull: biocontainers/bwa
  - class: SoftwareRequirement
    packages:
      samtools: {}
"#,
        )
        .unwrap();

        let found: Vec<_> = extract_software_reqs(process.scope()).map(Result::unwrap).collect();
        let names: Vec<_> = found.iter().map(|r| r.packages[0].package.as_str()).collect();
        assert_eq!(names, vec!["bwa", "samtools"]);
    }
}
