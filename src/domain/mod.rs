pub mod article;
pub mod error_log;
pub mod failure;

pub use article::ArticleRecord;
pub use error_log::ErrorLogEntry;
pub use failure::{FailureKind, FailureRecord};
