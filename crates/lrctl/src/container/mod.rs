// Container platform seam: the trait the volume store, resolver and workload
// step talk to, and its Docker CLI implementation.

pub mod docker_command_manager;
pub mod platform;

pub use docker_command_manager::DockerCommandManager;
pub use platform::{ContainerPlatform, ContainerSpec, CopySource, ImageSummary, VolumeMount};
