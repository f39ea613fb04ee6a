//! Error taxonomy for the audit tool.
//!
//! Three families matter to callers: resolution failures ([`Error::NotFound`],
//! raised whenever a name filter produced nothing), validation failures from
//! the result post-processor, and fatal transport/config errors that terminate
//! the run. Aggregation code never swallows an empty result behind an explicit
//! name filter; it raises `NotFound` with a message naming the stage that
//! failed, so a bad project name reads differently from a bad model name.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A project/model/explore/connection lookup resolved to nothing.
    ///
    /// The "occured" spelling is the stable user-facing string this tool has
    /// always printed; scripts grep for it.
    #[error("An error occured while getting {entity}. {detail}")]
    NotFound { entity: &'static str, detail: String },

    #[error("Sort field {0} not found")]
    SortField(String),

    #[error("Unrecognized sort type: {0}")]
    SortDirection(String),

    /// Authentication or unrecoverable HTTP failure. Not retried.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The API answered but not with what the endpoint contract promises.
    #[error("unexpected API response: {0}")]
    Api(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, detail: impl ToString) -> Self {
        Error::NotFound {
            entity,
            detail: detail.to_string(),
        }
    }
}
