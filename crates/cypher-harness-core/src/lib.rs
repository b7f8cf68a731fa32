pub mod config;
pub mod credential;
pub mod env_file;
pub mod error;
pub mod settings;

pub use config::{provision, ConnectionConfig};
pub use env_file::EnvFile;
pub use error::{HarnessError, HarnessResult};
pub use settings::Settings;
