use std::fmt;

#[derive(Debug)]
pub enum AssetsError {
    Io(std::io::Error),
    Config(toml::de::Error),
    InvalidData(String),
}

impl fmt::Display for AssetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetsError::Io(e) => write!(f, "I/O error: {e}"),
            AssetsError::Config(e) => write!(f, "config error: {e}"),
            AssetsError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for AssetsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetsError::Io(e) => Some(e),
            AssetsError::Config(e) => Some(e),
            AssetsError::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for AssetsError {
    fn from(e: std::io::Error) -> Self {
        AssetsError::Io(e)
    }
}

impl From<toml::de::Error> for AssetsError {
    fn from(e: toml::de::Error) -> Self {
        AssetsError::Config(e)
    }
}

pub type Result<T> = std::result::Result<T, AssetsError>;
