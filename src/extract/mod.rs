//! Requirement Extraction
//!
//! Scans a process or step for requirements of one class, declared
//! requirements first and hints second.
//!
//! - [`software`]: `SoftwareRequirement` entries
//! - [`container`]: `DockerRequirement` entries and image collection

pub mod container;
pub mod software;

pub use container::{collect_images, extract_docker_reqs};
pub use software::extract_software_reqs;

use crate::workflow::{CoercionError, Requirement, RequirementScope};

/// Yields every requirement of `class` that `pick` accepts.
///
/// Raw hints are coerced only when their class matches, so unrelated or
/// malformed hints of other classes never produce errors.
fn extract<'a, T, F>(
    scope: RequirementScope<'a>,
    class: &'static str,
    pick: F,
) -> impl Iterator<Item = Result<T, CoercionError>> + 'a
where
    T: 'a,
    F: Fn(&Requirement) -> Option<T> + Copy + 'a,
{
    let declared = scope.requirements.iter().filter_map(move |req| pick(req).map(Ok));

    let hinted = scope
        .hints
        .iter()
        .filter(move |hint| hint.class() == Some(class))
        .filter_map(move |hint| match hint.coerce(scope.id) {
            Ok(req) => pick(&req).map(Ok),
            Err(e) => Some(Err(e)),
        });

    declared.chain(hinted)
}
