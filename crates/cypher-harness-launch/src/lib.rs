pub mod container;
pub mod foreground;
pub mod local;
pub mod shutdown;

pub use container::{
    build_image, build_probe_image, run_container, run_probe_container, ContainerRun,
    ProbeContainerRun,
};
pub use foreground::LaunchOutcome;
pub use local::run_local;
pub use shutdown::ShutdownSignal;
