mod types;

pub use types::{ConsoleConfig, DEFAULT_CONFIG_PATH};
