use nix::errno::Errno;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-side precondition did not hold. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The OS refused to allocate, locate or map a segment.
    #[error("{message} (os error {code})")]
    Platform { code: i32, message: String },
}

impl Error {
    pub fn platform(errno: Errno) -> Self {
        Error::Platform {
            code: errno as i32,
            message: errno.desc().to_string(),
        }
    }

    /// Raw OS error code, if this is a platform error.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::Platform { code, .. } => Some(*code),
            Error::InvalidArgument(_) => None,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl From<nix::Error> for Error {
    fn from(value: nix::Error) -> Self {
        Error::platform(value)
    }
}
