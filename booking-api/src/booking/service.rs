use std::sync::Arc;

use async_trait::async_trait;

use super::{Booking, BookingError, BookingFilter};
use crate::executor::RequestContext;

/// Persistence contract for bookings
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Fetch one booking; [`BookingError::DataNotFound`] if it does not exist
    async fn get_booking_by_id(&self, ctx: &RequestContext, id: i64)
        -> Result<Booking, BookingError>;

    /// Fetch every booking matching `filter`
    async fn get_all_booking(
        &self,
        ctx: &RequestContext,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError>;
}

/// Read operations on bookings
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Return the booking with the given ID
    pub async fn get_booking_by_id(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<Booking, BookingError> {
        if id <= 0 {
            return Err(BookingError::InvalidBookingId);
        }

        self.store.get_booking_by_id(ctx, id).await
    }

    /// Return every booking matching `filter`; an empty list is not an error
    pub async fn get_all_booking(
        &self,
        ctx: &RequestContext,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError> {
        self.store.get_all_booking(ctx, filter).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::booking::BookingStatus;
    use crate::filter::Field;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory store with an optional artificial delay
    #[derive(Default)]
    pub(crate) struct MemoryBookingStore {
        pub bookings: Vec<Booking>,
        pub delay: Option<Duration>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    pub(crate) fn booking(id: i64, status: BookingStatus) -> Booking {
        Booking {
            id,
            user_id: 10,
            product_id: 100 + id,
            date: NaiveDate::from_ymd_opt(2024, 3, 15),
            start_time: NaiveTime::from_hms_opt(15, 4, 0),
            end_time: NaiveTime::from_hms_opt(17, 30, 0),
            price: Some(250_000),
            status,
            create_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            update_time: None,
        }
    }

    #[async_trait]
    impl BookingStore for MemoryBookingStore {
        async fn get_booking_by_id(
            &self,
            ctx: &RequestContext,
            id: i64,
        ) -> Result<Booking, BookingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                ctx.run(tokio::time::sleep(delay))
                    .await
                    .map_err(|e| BookingError::Store(e.into()))?;
            }
            if self.fail {
                return Err(BookingError::Store(crate::error::DatabaseError::connection_failed(
                    "connection refused",
                )));
            }
            self.bookings
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or(BookingError::DataNotFound)
        }

        async fn get_all_booking(
            &self,
            _ctx: &RequestContext,
            filter: &BookingFilter,
        ) -> Result<Vec<Booking>, BookingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .bookings
                .iter()
                .filter(|b| match &filter.status {
                    Field::Present(status) => b.status == *status,
                    Field::Absent => true,
                })
                .cloned()
                .collect())
        }
    }
}
