//! Error classification for endpoint families
//!
//! Domain errors expose an optional sentinel: a closed, `Copy` enum naming an
//! expected failure condition ("not found", "invalid id"). Each endpoint family
//! owns a [`ClassificationTable`] mapping its sentinels to a public error code and
//! status. [`classify`] is a pure lookup: a sentinel found in the table becomes a
//! client error, everything else is internal.
//!
//! Tables are built once at startup and shared read-only.
//!
//! # Example
//!
//! ```rust
//! use booking_api::classify::{classify, Classify, ClassificationTable};
//! use booking_api::envelope::Outcome;
//! use axum::http::StatusCode;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Sentinel { Missing }
//!
//! #[derive(Debug, thiserror::Error)]
//! enum LookupError {
//!     #[error("missing")]
//!     Missing,
//!     #[error("backend down")]
//!     Backend,
//! }
//!
//! impl Classify for LookupError {
//!     type Sentinel = Sentinel;
//!     fn sentinel(&self) -> Option<Sentinel> {
//!         match self {
//!             Self::Missing => Some(Sentinel::Missing),
//!             Self::Backend => None,
//!         }
//!     }
//! }
//!
//! let table = ClassificationTable::builder()
//!     .client(Sentinel::Missing, "DATA_NOT_FOUND")
//!     .build();
//!
//! assert_eq!(
//!     classify(&LookupError::Missing, &table),
//!     Outcome::client_error("DATA_NOT_FOUND", StatusCode::BAD_REQUEST)
//! );
//! assert_eq!(classify(&LookupError::Backend, &table), Outcome::InternalError);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use axum::http::StatusCode;

use crate::envelope::Outcome;

/// An error that may carry a domain sentinel
pub trait Classify: std::error::Error + Send + Sync + 'static {
    /// The closed set of expected conditions for this domain
    type Sentinel: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The sentinel for this error, or `None` for internal failures
    fn sentinel(&self) -> Option<Self::Sentinel>;
}

/// Public error code and status for one sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Error code written into the envelope
    pub code: &'static str,
    /// HTTP status for the response
    pub status: StatusCode,
}

/// Read-only mapping from sentinel to [`Classification`]
#[derive(Debug, Clone)]
pub struct ClassificationTable<S> {
    entries: HashMap<S, Classification>,
}

impl<S> ClassificationTable<S>
where
    S: Copy + Eq + Hash,
{
    /// Start building a table
    pub fn builder() -> ClassificationTableBuilder<S> {
        ClassificationTableBuilder {
            entries: HashMap::new(),
        }
    }

    /// Look up a sentinel
    pub fn get(&self, sentinel: &S) -> Option<Classification> {
        self.entries.get(sentinel).copied()
    }

    /// Number of mapped sentinels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table maps nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for [`ClassificationTable`]
#[derive(Debug)]
pub struct ClassificationTableBuilder<S> {
    entries: HashMap<S, Classification>,
}

impl<S> ClassificationTableBuilder<S>
where
    S: Copy + Eq + Hash,
{
    /// Map a sentinel to `code` with status 400
    #[must_use]
    pub fn client(self, sentinel: S, code: &'static str) -> Self {
        self.with_status(sentinel, code, StatusCode::BAD_REQUEST)
    }

    /// Map a sentinel to `code` with an explicit status
    #[must_use]
    pub fn with_status(mut self, sentinel: S, code: &'static str, status: StatusCode) -> Self {
        self.entries.insert(sentinel, Classification { code, status });
        self
    }

    /// Freeze the table
    pub fn build(self) -> ClassificationTable<S> {
        ClassificationTable {
            entries: self.entries,
        }
    }
}

/// Classify a domain error against a table
///
/// Unmapped errors, including those without a sentinel, are always
/// [`Outcome::InternalError`]. Logging the original error in that case is the
/// caller's job.
pub fn classify<E>(err: &E, table: &ClassificationTable<E::Sentinel>) -> Outcome
where
    E: Classify,
{
    match err.sentinel().and_then(|s| table.get(&s)) {
        Some(Classification { code, status }) => Outcome::client_error(code, status),
        None => Outcome::InternalError,
    }
}
