/// Configuration errors, reported when the tile source is being built.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("tile source requires a URL cache to resolve tile keys")]
    MissingUrlCache,

    #[error("invalid `{option}`: {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid(option: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option,
            reason: reason.into(),
        }
    }
}
