pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Body too short for {what}: expected {expected} bytes, got {actual}")]
    ShortBody {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl Error {
    pub(crate) fn short_body(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShortBody {
            what,
            expected,
            actual,
        }
    }
}
