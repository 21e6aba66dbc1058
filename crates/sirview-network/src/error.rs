use sirview_protocol::ProtocolError;
use thiserror::Error;

/// Failures surfaced by the transport, split the way the viewer reacts to
/// them: a batch run aborts on `Network`/`Protocol`, a live run drops the
/// message on `MessageParse` and terminates on `StreamConnection`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// No response was obtained at all.
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but was unsuccessful or unusable.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A single stream payload could not be decoded.
    #[error("dropped stream message: {0}")]
    MessageParse(ProtocolError),

    /// The stream connection itself failed.
    #[error("stream connection failed: {0}")]
    StreamConnection(String),
}

impl ClientError {
    /// Whether the error ends the run it belongs to.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClientError::MessageParse(_))
    }
}
