use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Module base {0:#x} is not readable in the target")]
    ModuleBaseUnreadable(u64),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Refusing to access null remote address")]
    InvalidAddress,

    #[error("Refusing zero-length transfer at {0:#x}")]
    EmptyRead(u64),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Implausible string at {address:#x}: {reason}")]
    ImplausibleString { address: u64, reason: &'static str },

    #[error("Remote memory access is not supported on this platform")]
    Unsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A layout or output path that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Whether this error came from the remote transport.
    ///
    /// Transport errors mean "data absent" and are never fatal past startup.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress
                | Error::EmptyRead(_)
                | Error::MemoryReadFailed { .. }
                | Error::MemoryWriteFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_errors_are_not_transport() {
        let missing = Error::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(missing.is_not_found());
        assert!(!missing.is_transport());
        assert!(!Error::ModuleBaseUnreadable(0x1000).is_not_found());
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::InvalidAddress.is_transport());
        assert!(Error::EmptyRead(0x1000).is_transport());
        assert!(
            Error::MemoryReadFailed {
                address: 0x10,
                message: "short".into()
            }
            .is_transport()
        );
        assert!(!Error::ProcessNotFound("1234".into()).is_transport());
        assert!(!Error::InvalidLayout("version".into()).is_transport());
    }
}
