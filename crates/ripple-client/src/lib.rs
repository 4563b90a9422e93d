pub mod composer;
pub mod controller;
pub mod transport;

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// An attachment upload failed before composition; the message must not
    /// be sent referencing it.
    #[error("upload failed: {0}")]
    UpstreamUploadFailure(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
