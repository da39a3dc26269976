mod console;
mod error;

pub use console::{ClusterView, Console, ProfileView};
pub use error::ConsoleError;
