//! Image Pullers
//!
//! Fetch a `dockerPull` image and persist it in a save directory, either as
//! a Docker tarball or as a Singularity image file.
//!
//! Both pullers implement [`ImagePuller`]; which one is used is chosen by a
//! [`PullerKind`] value at the call site.

use std::path::{Path, PathBuf};

use log::info;

use super::engine::{args, CommandRunner, ContainerEngine, ContainerError};

/// How existing images are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Leave image files that are already in the save directory alone.
    pub skip_existing: bool,
    /// Pull from the registry even when the engine has a local copy.
    pub force_pull: bool,
}

/// Which engine pulls the images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullerKind {
    #[default]
    Docker,
    Singularity,
}

impl PullerKind {
    /// Executable driving this kind of puller.
    pub fn binary(&self) -> &'static str {
        match self {
            PullerKind::Docker => "docker",
            PullerKind::Singularity => "singularity",
        }
    }
}

/// What [`ImagePuller::save_image`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Saved(PathBuf),
    Skipped(PathBuf),
}

impl PullOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PullOutcome::Saved(path) | PullOutcome::Skipped(path) => path,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, PullOutcome::Saved(_))
    }
}

/// Fetches one image and writes it to disk.
pub trait ImagePuller {
    /// The `dockerPull` reference being fetched.
    fn image_reference(&self) -> &str;

    /// File name of the saved image inside the save directory.
    fn image_name(&self) -> String;

    /// Fetches the image and saves it to the save directory.
    fn save_image(&self, options: PullOptions) -> Result<PullOutcome, ContainerError>;

    /// Command that loads or runs the saved image.
    fn loading_command(&self) -> String;
}

/// Saves images as `docker save` tarballs.
pub struct DockerImagePuller<'a, R: CommandRunner> {
    engine: &'a ContainerEngine<R>,
    reference: String,
    save_directory: PathBuf,
}

impl<'a, R: CommandRunner> DockerImagePuller<'a, R> {
    pub fn new(
        engine: &'a ContainerEngine<R>,
        reference: impl Into<String>,
        save_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            reference: reference.into(),
            save_directory: save_directory.into(),
        }
    }

    fn image_exists(&self) -> Result<bool, ContainerError> {
        let output = self
            .engine
            .run(&args(["inspect", "--type=image", self.reference.as_str()]))?;
        Ok(output.success())
    }

    fn pull(&self) -> Result<(), ContainerError> {
        self.engine.run_checked(&args(["pull", self.reference.as_str()]))?;
        Ok(())
    }
}

impl<R: CommandRunner> ImagePuller for DockerImagePuller<'_, R> {
    fn image_reference(&self) -> &str {
        &self.reference
    }

    fn image_name(&self) -> String {
        format!("{}.tar", self.reference.replace('/', ""))
    }

    fn save_image(&self, options: PullOptions) -> Result<PullOutcome, ContainerError> {
        info!("Pulling {} with Docker...", self.reference);
        let image_path = self.save_directory.join(self.image_name());

        if options.skip_existing && image_path.exists() {
            info!("Local image already exists, skipping: {}", image_path.display());
            return Ok(PullOutcome::Skipped(image_path));
        }

        if !self.image_exists()? || options.force_pull {
            self.pull()?;
        } else {
            info!(
                "Image {} is already downloaded, not pulling again",
                self.reference
            );
        }

        let target = image_path.to_string_lossy();
        self.engine
            .run_checked(&args(["save", "-o", &*target, self.reference.as_str()]))?;

        info!("Image successfully pulled: {}", image_path.display());
        Ok(PullOutcome::Saved(image_path))
    }

    fn loading_command(&self) -> String {
        format!("udocker load -i {}", self.image_name())
    }
}

/// Leading text of `singularity --version` output.
const VERSION_PREFIXES: &[&str] = &["singularity version ", "singularity-ce version "];

/// Image file format produced by the installed Singularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingularityFormat {
    /// Singularity 2.6
    Img,
    /// Singularity 3 and newer, Apptainer
    Sif,
}

impl SingularityFormat {
    /// Runs `singularity --version` and maps the answer to a format.
    pub fn detect<R: CommandRunner>(engine: &ContainerEngine<R>) -> Result<Self, ContainerError> {
        let output = engine.run_checked(&args(["--version"]))?;
        Self::from_version(&output.stdout)
    }

    /// Maps `--version` output to a format.
    pub fn from_version(output: &str) -> Result<Self, ContainerError> {
        let output = output.trim();
        if output.starts_with("apptainer") {
            return Ok(SingularityFormat::Sif);
        }

        let version = VERSION_PREFIXES
            .iter()
            .find_map(|prefix| output.strip_prefix(prefix))
            .unwrap_or(output);
        if version.starts_with("2.6") {
            return Ok(SingularityFormat::Img);
        }

        let major: String = version.chars().take_while(char::is_ascii_digit).collect();
        match major.parse::<u32>() {
            Ok(major) if major >= 3 => Ok(SingularityFormat::Sif),
            _ => Err(ContainerError::UnsupportedSingularity {
                version: version.to_string(),
            }),
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            SingularityFormat::Img => ".img",
            SingularityFormat::Sif => ".sif",
        }
    }
}

/// Converts Docker images into Singularity image files.
pub struct SingularityImagePuller<'a, R: CommandRunner> {
    engine: &'a ContainerEngine<R>,
    reference: String,
    save_directory: PathBuf,
    format: SingularityFormat,
}

impl<'a, R: CommandRunner> SingularityImagePuller<'a, R> {
    /// Creates a puller, asking the engine for its version first.
    pub fn new(
        engine: &'a ContainerEngine<R>,
        reference: impl Into<String>,
        save_directory: impl Into<PathBuf>,
    ) -> Result<Self, ContainerError> {
        let format = SingularityFormat::detect(engine)?;
        Ok(Self::with_format(engine, reference, save_directory, format))
    }

    /// Creates a puller for an already detected format.
    pub fn with_format(
        engine: &'a ContainerEngine<R>,
        reference: impl Into<String>,
        save_directory: impl Into<PathBuf>,
        format: SingularityFormat,
    ) -> Self {
        Self {
            engine,
            reference: reference.into(),
            save_directory: save_directory.into(),
            format,
        }
    }

    pub fn format(&self) -> SingularityFormat {
        self.format
    }
}

impl<R: CommandRunner> ImagePuller for SingularityImagePuller<'_, R> {
    fn image_reference(&self) -> &str {
        &self.reference
    }

    fn image_name(&self) -> String {
        format!("{}{}", self.reference.replace('/', "_"), self.format.suffix())
    }

    fn save_image(&self, options: PullOptions) -> Result<PullOutcome, ContainerError> {
        info!("Pulling {} with Singularity...", self.reference);
        let image_path = self.save_directory.join(self.image_name());

        if options.skip_existing && image_path.exists() {
            info!("Local image already exists, skipping: {}", image_path.display());
            return Ok(PullOutcome::Skipped(image_path));
        }

        let mut pull = args(["pull", "--name"]);
        pull.push(image_path.to_string_lossy().into_owned());
        if options.force_pull || !options.skip_existing {
            pull.push("--force".to_string());
        }
        pull.push(format!("docker://{}", self.reference));
        self.engine.run_checked(&pull)?;

        info!("Image successfully pulled: {}", image_path.display());
        Ok(PullOutcome::Saved(image_path))
    }

    fn loading_command(&self) -> String {
        format!("singularity run {}", self.image_name())
    }
}
