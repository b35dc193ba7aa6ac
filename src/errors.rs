pub type AppResult<T> = Result<T, SwitcherError>;

#[derive(Debug, thiserror::Error)]
pub enum SwitcherError {
    #[cfg(windows)]
    #[error("Windows Error: {0}")]
    Windows(#[from] windows_result::Error),
    #[cfg(windows)]
    #[error("Windows Error: {0}")]
    WindowsCore(#[from] windows_core::Error),
    #[cfg(windows)]
    #[error("Wasapi Error: {0}")]
    Wasapi(#[from] wasapi::WasapiError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML Serialization Error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("TOML Deserialization Error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("WebSocket Error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    // My errors
    #[error("Missing launch argument: {0}")]
    MissingLaunchArg(&'static str),
    #[error("Audio device control is not supported on this platform")]
    UnsupportedPlatform,
    #[error("Failed to find a config directory")]
    ConfigDir,
    #[error("Event loop closed")]
    EventLoopClosed,
    #[error("Connection to the Stream Deck application closed")]
    HostClosed,
    #[error("Audio notification thread exited before registering")]
    NotificationThread,
    #[error("Unknown key code for hotkey: {0:?}")]
    UnknownKeyCode(String),
}
