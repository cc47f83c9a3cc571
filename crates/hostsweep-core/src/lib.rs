pub mod config;
pub mod error;
pub mod payload;
pub mod types;

pub use config::InstallerConfig;
pub use error::{ConfigError, ConfigResult};
pub use payload::Payload;
pub use types::*;
