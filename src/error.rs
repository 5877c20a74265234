use thiserror::Error;

use crate::core::ItemId;

pub type ChartResult<T> = Result<T, ChartError>;

/// Error returned by a failed loader future.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid pixel extent: {extent}")]
    InvalidPixelExtent { extent: f64 },

    #[error("unknown item `{0}`")]
    UnknownItem(ItemId),

    #[error("duplicate item id `{0}`")]
    DuplicateItem(ItemId),

    #[error("loader for item `{item_id}` failed")]
    Loader {
        item_id: ItemId,
        #[source]
        source: LoaderError,
    },
}
