//! Bookings: domain types, errors and the read service

mod postgres;
mod service;

pub mod http;

pub use postgres::PgBookingStore;
pub use service::{BookingService, BookingStore};

#[cfg(test)]
pub(crate) use service::fake;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::classify::{Classify, ClassificationTable};
use crate::error::DatabaseError;
use crate::filter::{CompileFilter, Field, FilterValue, Predicate, PredicateBuilder};

/// A user's booking of a product
///
/// `date`, `start_time`, `end_time` and `price` come from the booked product
/// and are `None` when the product row is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub price: Option<i64>,
    pub status: BookingStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: Option<DateTime<Utc>>,
}

/// Lifecycle state of a booking, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Ongoing,
    Scheduled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(Self::Ongoing),
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            _ => Err(BookingError::InvalidStatus),
        }
    }
}

impl From<BookingStatus> for FilterValue {
    fn from(status: BookingStatus) -> Self {
        FilterValue::Text(status.as_str().to_string())
    }
}

/// Filter for listing bookings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub status: Field<BookingStatus>,
}

impl CompileFilter for BookingFilter {
    fn compile(&self) -> Predicate {
        PredicateBuilder::new()
            .equal(&self.status, "b.status = :status", "status")
            .build()
    }
}

/// Expected booking failure conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingSentinel {
    DataNotFound,
    InvalidBookingId,
    InvalidStatus,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("data not found")]
    DataNotFound,

    #[error("invalid booking id")]
    InvalidBookingId,

    #[error("invalid status")]
    InvalidStatus,

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl Classify for BookingError {
    type Sentinel = BookingSentinel;

    fn sentinel(&self) -> Option<BookingSentinel> {
        match self {
            Self::DataNotFound => Some(BookingSentinel::DataNotFound),
            Self::InvalidBookingId => Some(BookingSentinel::InvalidBookingId),
            Self::InvalidStatus => Some(BookingSentinel::InvalidStatus),
            Self::Store(_) => None,
        }
    }
}

pub const DATA_NOT_FOUND: &str = "DATA_NOT_FOUND";
pub const INVALID_BOOKING_ID: &str = "INVALID_BOOKING_ID";
pub const INVALID_STATUS: &str = "INVALID_STATUS";

/// Public codes for the booking endpoints, all 400
pub fn classification_table() -> ClassificationTable<BookingSentinel> {
    ClassificationTable::builder()
        .client(BookingSentinel::DataNotFound, DATA_NOT_FOUND)
        .client(BookingSentinel::InvalidBookingId, INVALID_BOOKING_ID)
        .client(BookingSentinel::InvalidStatus, INVALID_STATUS)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::envelope::Outcome;
    use crate::error::DatabaseOperation;
    use axum::http::StatusCode;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            BookingStatus::Ongoing,
            BookingStatus::Scheduled,
            BookingStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!(matches!(
            "cancelled".parse::<BookingStatus>(),
            Err(BookingError::InvalidStatus)
        ));
        assert!("Ongoing".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_empty_filter_compiles_to_empty_predicate() {
        let predicate = BookingFilter::default().compile();
        assert!(predicate.is_empty());
        assert!(predicate.args().is_empty());
    }

    #[test]
    fn test_status_filter_binds_status_name() {
        let filter = BookingFilter {
            status: Field::Present(BookingStatus::Ongoing),
        };
        let predicate = filter.compile();
        assert_eq!(predicate.fragment(), "b.status = :status");
        assert_eq!(
            predicate.args().get("status"),
            Some(&FilterValue::Text("ongoing".to_string()))
        );
    }

    #[test]
    fn test_classification_table() {
        let table = classification_table();
        assert_eq!(
            classify(&BookingError::DataNotFound, &table),
            Outcome::client_error(DATA_NOT_FOUND, StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            classify(&BookingError::InvalidStatus, &table),
            Outcome::client_error(INVALID_STATUS, StatusCode::BAD_REQUEST)
        );
        let store = BookingError::Store(DatabaseError::timeout(DatabaseOperation::Query, "slow"));
        assert_eq!(classify(&store, &table), Outcome::InternalError);
    }
}
