use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Default, Debug, PartialEq, Clone, Error)]
pub enum ParseError {
    #[error("Expected duration: found `{0}`")]
    InvalidDuration(String),
    #[error("Expected time zone as hours, `+HH:MM` or `UTC`: found `{0}`")]
    InvalidTimeZone(String),
    #[error("Expected interval: found `{0}`")]
    InvalidInterval(String),
    #[error("Expected number: found `{0}`")]
    InvalidNumber(String),
    #[error("{0}")]
    General(String),
    #[default]
    #[error("Parse error")]
    Other,
}
