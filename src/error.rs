use std::io;

use thiserror::Error;

/// Everything that can go wrong while talking to a router.
///
/// Command-level failures are not errors: a `!trap` reply is returned to
/// the caller as a [`ParsedReply`](crate::ParsedReply) so the trailer can
/// be inspected, and only transport and protocol faults (which also end
/// the connection) surface through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required option is missing or an option value is out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// The socket could not be opened, read or written.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// TLS setup or handshake failure.
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// A word longer than the wire format can express.
    #[error("word of {0} bytes exceeds the wire format limit")]
    Encode(u64),

    /// The router sent bytes that do not decode as API framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The router rejected the login exchange.
    #[error("login denied: {0}")]
    AuthDenied(String),

    /// Every configured connection attempt failed.
    #[error("giving up after {attempts} connection attempts: {source}")]
    ConnectionFailed {
        attempts: u32,
        source: Box<Error>,
    },

    /// The caller broke the request/response contract.
    #[error("contract violation: {0}")]
    Misuse(&'static str),

    /// The connection was closed, by `close` or by an earlier failure.
    #[error("not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, Error>;
