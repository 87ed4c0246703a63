use std::error::Error;
use std::fmt::Formatter;

#[derive(Debug)]
pub struct InputError(String);

impl InputError {
    pub fn new(err: &str) -> Self {
        Self(err.to_owned())
    }
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl Error for InputError {}

impl From<String> for InputError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InputError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Failure classes for an editing run. `Config`, `InputAlignment` and
/// `Decode` abort the run, `Numeric` only ever discards a single position.
#[derive(Debug)]
pub enum EditError {
    Config(InputError),
    InputAlignment(InputError),
    Decode(InputError),
    Numeric(String),
}

impl EditError {
    pub fn new_config_error<T: Into<InputError>>(reason: T) -> Self {
        Self::Config(reason.into())
    }

    pub fn new_alignment_error<T: Into<InputError>>(reason: T) -> Self {
        Self::InputAlignment(reason.into())
    }

    pub fn new_decode_error<T: Into<InputError>>(reason: T) -> Self {
        Self::Decode(reason.into())
    }

    pub fn new_numeric_error(reason: &str) -> Self {
        Self::Numeric(reason.to_owned())
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Numeric(_))
    }
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(reason) => write!(f, "configuration error, {reason}"),
            Self::InputAlignment(reason) => {
                write!(f, "input alignment error, {reason}")
            }
            Self::Decode(reason) => write!(f, "decode error, {reason}"),
            Self::Numeric(reason) => write!(f, "numeric error, {reason}"),
        }
    }
}

impl Error for EditError {}
