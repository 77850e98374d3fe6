use std::io;
use std::fmt;

#[derive(Debug)]
pub enum ServerError {
    IoError(io::Error),
    /// Malformed bracket syntax in a route path. Fatal at table-build time.
    InvalidPattern(String),
    /// A route module could not be loaded or had no usable handler export.
    ModuleLoad(String),
    /// The terminal stage of a middleware chain did not produce a response.
    ContractViolation(String),
    NotFound,
    BadRequest(String),
    InternalError(String),
    PanicError(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::NotFound => 404,
            ServerError::IoError(_)
            | ServerError::InvalidPattern(_)
            | ServerError::ModuleLoad(_)
            | ServerError::ContractViolation(_)
            | ServerError::InternalError(_)
            | ServerError::PanicError(_) => 500,
        }
    }

    /// 500-class errors are logged in full but never leak detail into
    /// the response body.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::IoError(err) => write!(f, "IO error: {}", err),
            ServerError::InvalidPattern(msg) => write!(f, "Invalid route pattern: {}", msg),
            ServerError::ModuleLoad(msg) => write!(f, "Module load failure: {}", msg),
            ServerError::ContractViolation(msg) => {
                write!(f, "Middleware contract violation: {}", msg)
            }
            ServerError::NotFound => write!(f, "Not found"),
            ServerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServerError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ServerError::PanicError(msg) => write!(f, "Panic: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::IoError(err)
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
