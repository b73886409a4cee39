//! Container Resolver
//!
//! Drives one kind of [`ImagePuller`] over a list of image references and
//! saves every image into a single directory.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::engine::{CommandRunner, ContainerEngine, ContainerError};
use super::puller::{
    DockerImagePuller, ImagePuller, PullOptions, PullOutcome, PullerKind, SingularityFormat,
    SingularityImagePuller,
};

/// Result of resolving one image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledImage {
    pub reference: String,
    pub outcome: PullOutcome,
    pub loading_command: String,
}

/// Saves images with the puller selected by a [`PullerKind`].
pub struct ContainerResolver<'a, R: CommandRunner> {
    engine: &'a ContainerEngine<R>,
    kind: PullerKind,
    save_directory: PathBuf,
    options: PullOptions,
    singularity_format: Option<SingularityFormat>,
}

impl<'a, R: CommandRunner> ContainerResolver<'a, R> {
    /// Creates the save directory and, for Singularity, detects the
    /// installed version.
    pub fn new(
        engine: &'a ContainerEngine<R>,
        kind: PullerKind,
        save_directory: impl Into<PathBuf>,
    ) -> Result<Self, ContainerError> {
        let save_directory = save_directory.into();
        fs::create_dir_all(&save_directory).map_err(|source| ContainerError::Io {
            path: save_directory.display().to_string(),
            source,
        })?;

        let singularity_format = match kind {
            PullerKind::Singularity => Some(SingularityFormat::detect(engine)?),
            PullerKind::Docker => None,
        };

        Ok(Self {
            engine,
            kind,
            save_directory,
            options: PullOptions::default(),
            singularity_format,
        })
    }

    pub fn with_options(mut self, options: PullOptions) -> Self {
        self.options = options;
        self
    }

    pub fn save_directory(&self) -> &Path {
        &self.save_directory
    }

    fn puller(&self, reference: &str) -> Box<dyn ImagePuller + '_> {
        match (self.kind, self.singularity_format) {
            (PullerKind::Singularity, Some(format)) => Box::new(SingularityImagePuller::with_format(
                self.engine,
                reference,
                &self.save_directory,
                format,
            )),
            _ => Box::new(DockerImagePuller::new(
                self.engine,
                reference,
                &self.save_directory,
            )),
        }
    }

    /// Pulls and saves one image.
    pub fn pull(&self, reference: &str) -> Result<PulledImage, ContainerError> {
        let puller = self.puller(reference);
        let outcome = puller.save_image(self.options)?;

        Ok(PulledImage {
            reference: puller.image_reference().to_string(),
            outcome,
            loading_command: puller.loading_command(),
        })
    }

    /// Pulls every image in order, stopping at the first failure.
    pub fn pull_all(&self, images: &[String]) -> Result<Vec<PulledImage>, ContainerError> {
        info!(
            "Saving {} image(s) to {} with {}",
            images.len(),
            self.save_directory.display(),
            self.kind.binary()
        );

        images.iter().map(|image| self.pull(image)).collect()
    }
}
