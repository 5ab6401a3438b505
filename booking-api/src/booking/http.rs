//! Booking HTTP handlers
//!
//! - `GET /api/v1/booking?status=` lists bookings (list deadline)
//! - `GET /api/v1/booking/{id}` returns one booking (read deadline)

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use super::{
    Booking, BookingError, BookingFilter, BookingStatus, INVALID_BOOKING_ID, INVALID_STATUS,
};
use crate::auth::authenticate;
use crate::envelope::{Outcome, INVALID_QUERY};
use crate::executor::{FormatError, Rejection};
use crate::filter::Field;
use crate::state::AppState;
use crate::wire::{first_values, format_date, format_time};

/// Wire representation of a booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingHttp {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub price: i64,
}

/// Query string of the list endpoint
#[derive(Debug, Default)]
pub struct ListBookingQuery {
    pub status: Option<String>,
}

impl ListBookingQuery {
    /// Build from raw pairs; repeated keys keep their first value
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut values = first_values(pairs);
        Self {
            status: values.remove("status"),
        }
    }
}

/// Format a booking for the wire
///
/// Fails when the fields derived from the booked product are missing.
pub fn format_booking(b: Booking) -> Result<BookingHttp, FormatError> {
    Ok(BookingHttp {
        id: b.id,
        user_id: b.user_id,
        product_id: b.product_id,
        date: format_date(b.date.ok_or(FormatError::MissingField("date"))?),
        start_time: format_time(b.start_time.ok_or(FormatError::MissingField("start_time"))?),
        end_time: format_time(b.end_time.ok_or(FormatError::MissingField("end_time"))?),
        status: b.status.to_string(),
        price: b.price.ok_or(FormatError::MissingField("price"))?,
    })
}

fn format_bookings(bookings: Vec<Booking>) -> Result<Vec<BookingHttp>, FormatError> {
    bookings.into_iter().map(format_booking).collect()
}

fn parse_list_filter(query: &ListBookingQuery) -> Result<BookingFilter, Rejection<BookingError>> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Field::Present(
            raw.parse::<BookingStatus>()
                .map_err(|_| Rejection::BadRequest(INVALID_STATUS))?,
        ),
        None => Field::Absent,
    };

    Ok(BookingFilter { status })
}

/// `GET /api/v1/booking/{id}`
pub async fn get_booking(
    State(state): State<AppState>,
    raw_id: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Outcome {
    const ENDPOINT: &str = "get_booking_by_id";

    let id = match raw_id {
        Ok(Path(raw)) => raw.parse::<i64>().map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };
    let id = match id {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(endpoint = ENDPOINT, error = %e, "Failed to parse booking id");
            return Outcome::client_error(INVALID_BOOKING_ID, StatusCode::BAD_REQUEST);
        }
    };

    let bookings = state.bookings().clone();
    let authority = state.authority().clone();

    state
        .executor()
        .execute(
            ENDPOINT,
            state.deadlines().read(),
            &state.tables().booking,
            move |ctx| async move {
                authenticate::<BookingError>(&ctx, authority.as_ref(), &headers, ENDPOINT)
                    .await?;
                bookings
                    .get_booking_by_id(&ctx, id)
                    .await
                    .map_err(Rejection::Domain)
            },
            format_booking,
        )
        .await
}

/// `GET /api/v1/booking`
pub async fn list_bookings(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
) -> Outcome {
    const ENDPOINT: &str = "get_all_booking";

    let query = match query {
        Ok(Query(pairs)) => Some(ListBookingQuery::from_pairs(pairs)),
        Err(e) => {
            tracing::debug!(endpoint = ENDPOINT, error = %e, "Unreadable query string");
            None
        }
    };

    let bookings = state.bookings().clone();
    let authority = state.authority().clone();

    state
        .executor()
        .execute(
            ENDPOINT,
            state.deadlines().list(),
            &state.tables().booking,
            move |ctx| async move {
                authenticate::<BookingError>(&ctx, authority.as_ref(), &headers, ENDPOINT)
                    .await?;
                let query = query.ok_or(Rejection::BadRequest(INVALID_QUERY))?;
                let filter = parse_list_filter(&query)?;
                bookings
                    .get_all_booking(&ctx, &filter)
                    .await
                    .map_err(Rejection::Domain)
            },
            format_bookings,
        )
        .await
}
