use thiserror::Error;

/// Failure taxonomy for the client. None of these are fatal to the process;
/// the app layer converts each into a user notice plus a log line.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level HTTP failure, including unexpected response shapes
    /// (serde decode errors surface through reqwest's json path).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an `{"error": "..."}` payload.
    #[error("server error: {0}")]
    Server(String),

    /// WebSocket transport failure on the live channel.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// Protocol violation on the live channel (bad frame, missing header).
    #[error("stomp protocol error: {0}")]
    Stomp(String),
}

pub type Result<T> = std::result::Result<T, Error>;
