#[derive(Debug)]
pub enum HostError {
    /// Unreadable or malformed host configuration.
    Config(String),
    UnknownGame(String),
    /// A result record or state payload could not be encoded.
    Encode(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(m) => write!(f, "config error: {m}"),
            Self::UnknownGame(name) => write!(f, "unknown game: {name}"),
            Self::Encode(m) => write!(f, "encode error: {m}"),
        }
    }
}

impl std::error::Error for HostError {}
