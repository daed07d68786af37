use thiserror::Error;

#[derive(Debug, Error)]
pub enum DroidClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The device bridge returned a failure. Fatal: the run is aborted.
    #[error("Device error: {0}")]
    Device(String),

    /// Transient model failure (empty response, request error). Retried
    /// within the round budget.
    #[error("Model error: {0}")]
    Model(String),

    /// The model response did not match the action grammar. The round is
    /// retried or skipped; a half-parsed action is never applied.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown action '{0}' in model response")]
    UnknownAction(String),

    #[error("Malformed bounds attribute: {0}")]
    MalformedBounds(String),

    #[error("Invalid subarea '{0}'")]
    InvalidSubarea(String),

    /// An action referenced an element or grid cell outside the current
    /// cardinality. The round is abandoned with no device effect.
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("Perception error: {0}")]
    Perception(String),

    /// Grid derivation failed (rows or cols is zero); coordinate math must
    /// not be attempted.
    #[error("Grid overlay unavailable")]
    GridUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type DroidClawResult<T> = Result<T, DroidClawError>;
