use thiserror::Error;

/// Faults raised while loading templates or mapping an XML event stream.
#[derive(Debug, Error)]
pub enum SaxError {
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("closing tag </{found}> does not match open element <{expected}>")]
    TagMismatch { expected: String, found: String },

    #[error("closing tag </{tag}> with no open element")]
    UnexpectedClose { tag: String },

    #[error("document ended with <{tag}> still open")]
    UnclosedElement { tag: String },

    #[error("no template registered under `{name}`")]
    UnknownTemplate { name: String },

    #[error("template `{name}` is invalid: {message}")]
    InvalidTemplate { name: String, message: String },

    #[error("hook `{hook}` declared on <{tag}> is not handled by the target")]
    UnknownHook { hook: String, tag: String },
}

impl SaxError {
    pub fn xml(position: u64, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            position,
            message: err.to_string(),
        }
    }

    pub fn invalid_template(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidTemplate {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

pub type SaxResult<T> = Result<T, SaxError>;
