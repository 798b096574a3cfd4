// Copyright (c) 2022-2023 The MobileCoin Foundation

use serde_json::Value;
use tokio::time::error::Elapsed;

use mwa_proto::methods::Method;

/// Mobile Wallet Adapter client error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// WebSocket failure
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Wallet negotiated a sub-protocol we do not support
    #[error("unsupported websocket sub-protocol '{0}'")]
    UnsupportedSubprotocol(String),

    /// Wallet found but the connection did not complete within the budget
    #[error("timeout connecting to wallet")]
    ConnectionTimeout,

    /// No wallet available to handle the association
    #[error("no compatible wallet found")]
    WalletNotFound,

    /// Platform launcher failed
    #[error("failed to launch wallet: {0}")]
    LaunchFailed(String),

    /// Session closed by the peer (or lost) after connection
    #[error("session closed (clean: {clean}, code: {code:?})")]
    SessionClosed { clean: bool, code: Option<u16> },

    /// Session torn down following a fatal error
    #[error("session failed: {0}")]
    SessionFailed(String),

    /// Protocol violation (sequence, handshake, or crypto failure)
    #[error("protocol violation: {0}")]
    Protocol(#[from] mwa_core::Error),

    /// Wire decoding failure
    #[error("encoding error: {0}")]
    Encoding(#[from] mwa_proto::Error),

    /// Empty frame received after connection
    #[error("unexpected empty frame")]
    EmptyFrame,

    /// Response that did not match the request
    #[error("unexpected response")]
    UnexpectedResponse,

    /// Wallet returned a JSON-RPC error
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: Method,
        code: i32,
        message: String,
        data: Option<Value>,
    },

    /// RPC round-trip timed out
    #[error("timeout waiting for {0} response")]
    RequestTimeout(Method),

    /// Wallet supplied a non-https base URI
    #[error("insecure wallet uri base '{0}'")]
    InsecureWalletUri(String),

    /// Wallet declined the session
    #[error("wallet declined the session")]
    SessionDeclined,

    /// Operation cancelled by the caller
    #[error("cancelled")]
    Cancelled,

    /// Association closed before the handshake completed
    #[error("closed before connection")]
    ClosedBeforeConnection,

    /// Local I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed URL
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Caller initiated cancellation, not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::ClosedBeforeConnection)
            || matches!(self, Error::Protocol(mwa_core::Error::ClosedBeforeConnection))
    }

    /// Fatal errors terminate the session, non-fatal errors only fail
    /// the request they were raised for
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Rpc { .. }
                | Error::RequestTimeout(_)
                | Error::InsecureWalletUri(_)
                | Error::UnexpectedResponse
        )
    }

    /// Connection errors that may succeed on a subsequent attempt
    pub fn is_retryable(&self) -> bool {
        use tokio_tungstenite::tungstenite::Error as WsError;

        matches!(
            self,
            Error::Transport(_)
                | Error::Io(_)
                | Error::WebSocket(WsError::Io(_))
                | Error::WebSocket(WsError::ConnectionClosed)
                | Error::WebSocket(WsError::AlreadyClosed)
        )
    }

    /// Fetch the JSON-RPC error code for remote errors
    pub fn rpc_code(&self) -> Option<i32> {
        match self {
            Error::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<crate::LaunchError> for Error {
    fn from(e: crate::LaunchError) -> Self {
        match e {
            crate::LaunchError::NotFound => Error::WalletNotFound,
            crate::LaunchError::Failed(s) => Error::LaunchFailed(s),
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::ConnectionTimeout
    }
}
