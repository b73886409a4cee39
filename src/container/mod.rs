//! Container Image Module
//!
//! Saves the images referenced by `DockerRequirement`s and inspects local
//! image labels.
//!
//! # Structure
//!
//! - [`engine`]: Handle on a container engine executable
//! - [`puller`]: Docker and Singularity image pullers
//! - [`resolver`]: Pulls a list of references with one puller kind
//! - [`labels`]: Local image listing and label inspection

pub mod engine;
pub mod labels;
pub mod puller;
pub mod resolver;

pub use engine::{CommandOutput, CommandRunner, ContainerEngine, ContainerError, SystemRunner};
pub use labels::{list_images, ImageInfo};
pub use puller::{
    DockerImagePuller, ImagePuller, PullOptions, PullOutcome, PullerKind, SingularityFormat,
    SingularityImagePuller,
};
pub use resolver::{ContainerResolver, PulledImage};
