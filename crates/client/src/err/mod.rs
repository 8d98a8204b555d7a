mod kind;

pub use kind::{classify, ErrorKind};

use {std::fmt, std::path::PathBuf, thiserror::Error};

/// A failure reported by the server through its numeric status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMakerError {
    pub code: u32,
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl FileMakerError {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            kind: classify(code),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Fails on a non-zero code. "No records found" (401) passes unless
    /// `raise_on_401` is set.
    pub fn check(code: u32, raise_on_401: bool) -> std::result::Result<(), Self> {
        match code {
            0 => Ok(()),
            401 if !raise_on_401 => Ok(()),
            code => Err(Self::new(code)),
        }
    }

    /// Parses the text of an error-code element; blank text means success.
    pub fn parse_code(text: Option<&str>) -> u32 {
        text.and_then(|t| t.trim().parse().ok()).unwrap_or(0)
    }
}

impl fmt::Display for FileMakerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(
                f,
                "{} occurred: {} (FileMaker Error #{})",
                self.kind, message, self.code
            ),
            None => write!(f, "{} occurred: (FileMaker Error #{})", self.kind, self.code),
        }
    }
}

impl std::error::Error for FileMakerError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    FileMaker(#[from] FileMakerError),

    #[error("The account name ({account}) or password provided is not correct (or the account doesn't have the fmxml extended privilege).")]
    Authentication { account: String },

    #[error("Could not talk to FileMaker because the Web Publishing Engine is not responding (server returned 404).")]
    ServiceUnavailable,

    #[error("While trying to reach the Web Publishing Engine, FileMaker Server redirected too many times (limit {limit}).")]
    RedirectLimit { limit: u32 },

    #[error("Unexpected response from server: {status} ({reason}). Unable to communicate with the Web Publishing Engine.")]
    Communication { status: u16, reason: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("could not read certificate bundle {path}: {source}")]
    Certificate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("{field} does not exist as a field in the current FileMaker layout.")]
    FieldNotFound { field: String },

    #[error("bad data in field {field}: {source}")]
    Coercion {
        field: String,
        source: FileMakerError,
    },

    #[error(transparent)]
    Parse(#[from] filemaker_sax::SaxError),
}

impl Error {
    pub fn parameter(message: impl Into<String>) -> Self {
        Error::Parameter(message.into())
    }

    /// Classified kind of a server-reported or data failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::FileMaker(err) => Some(err.kind),
            Error::Coercion { source, .. } => Some(source.kind),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            Error::FileMaker(err) => Some(err.code),
            Error::Coercion { source, .. } => Some(source.code),
            _ => None,
        }
    }

    pub fn is_no_records_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NoRecordsFound)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_render_kind_and_code() {
        let err = Error::from(FileMakerError::new(102));
        assert_eq!(err.to_string(), "FieldMissingError occurred: (FileMaker Error #102)");
        assert_eq!(err.kind(), Some(ErrorKind::FieldMissing));

        let err = FileMakerError::new(500).with_message("bad date \"13/45/2020\"");
        assert_eq!(
            err.to_string(),
            "DateValidationError occurred: bad date \"13/45/2020\" (FileMaker Error #500)"
        );
    }

    #[test]
    fn no_records_found_is_suppressed_by_default() {
        assert!(FileMakerError::check(0, true).is_ok());
        assert!(FileMakerError::check(401, false).is_ok());
        assert_eq!(FileMakerError::check(401, true).unwrap_err().kind, ErrorKind::NoRecordsFound);
        assert_eq!(FileMakerError::check(105, false).unwrap_err().kind, ErrorKind::LayoutMissing);
        assert_eq!(FileMakerError::parse_code(Some(" 802 ")), 802);
        assert_eq!(FileMakerError::parse_code(None), 0);
    }

    #[test]
    fn transport_errors_have_no_kind() {
        assert_eq!(Error::ServiceUnavailable.kind(), None);
        let err = Error::Authentication {
            account: "web".into(),
        };
        assert!(err.to_string().contains("(web)"));
        assert!(!err.is_no_records_found());
        assert!(Error::from(FileMakerError::new(401)).is_no_records_found());
    }
}
