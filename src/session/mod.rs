mod state;
mod store;

pub use state::{ActiveProfile, ProfileState, Session, SessionError};
pub use store::ProfileStore;
