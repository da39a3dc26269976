use thiserror::Error;

use crate::client::ClientError;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("object {name} is a {kind}, not a Pipeline")]
    NotAPipeline { name: String, kind: String },
}
