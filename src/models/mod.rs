pub mod download;
pub mod manager;
pub mod progress;
pub mod registry;
pub mod target;

pub use download::{InstallRequest, Installer};
pub use manager::{Library, Outcome, StatusReport};
pub use progress::ProgressTracker;
pub use registry::InstallRegistry;
