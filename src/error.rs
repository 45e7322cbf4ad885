//! Crate-level error type and the five-way taxonomy callers branch on.

use crate::data::{FetchError, LoaderError, ProcessorError};
use crate::stats::AggregateError;
use thiserror::Error;

/// What went wrong, independent of which component noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport failure while downloading.
    Fetch,
    /// Local filesystem failure while storing the download.
    Write,
    /// The dataset file is absent.
    NotFound,
    /// Malformed rows or missing required columns.
    Parse,
    /// Caller-supplied parameter outside its allowed domain.
    Validation,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Process(#[from] ProcessorError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::Fetch(e) if e.is_write() => ErrorKind::Write,
            DashboardError::Fetch(_) => ErrorKind::Fetch,
            DashboardError::Load(LoaderError::NotFound(_)) => ErrorKind::NotFound,
            DashboardError::Load(_) => ErrorKind::Parse,
            DashboardError::Aggregate(AggregateError::InvalidTopN(_)) => ErrorKind::Validation,
            DashboardError::Aggregate(AggregateError::Schema(_)) => ErrorKind::Parse,
            DashboardError::Process(ProcessorError::InvalidWindow(_)) => ErrorKind::Validation,
            DashboardError::Process(ProcessorError::PolarsError(_)) => ErrorKind::Parse,
        }
    }
}
