use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{Booking, BookingError, BookingFilter, BookingStatus, BookingStore};
use crate::error::DatabaseError;
use crate::executor::RequestContext;
use crate::filter::{CompileFilter, FilterValue};
use crate::store::PgStore;

const SELECT_BOOKING: &str = "\
SELECT b.id, b.user_id, b.product_id, p.date, p.start_time, p.end_time, p.price, \
b.status, b.create_time, b.update_time \
FROM booking b LEFT JOIN product p ON b.product_id = p.id";

/// Bookings backed by Postgres
#[derive(Debug, Clone)]
pub struct PgBookingStore {
    store: PgStore,
}

impl PgBookingStore {
    pub fn new(store: PgStore) -> Self {
        Self { store }
    }
}

fn list_query(filter: &BookingFilter) -> (String, Vec<FilterValue>) {
    let predicate = filter.compile();
    let (fragment, args) = predicate.to_positional(1);
    let sql = if predicate.is_empty() {
        format!("{} ORDER BY b.id", SELECT_BOOKING)
    } else {
        format!("{} WHERE {} ORDER BY b.id", SELECT_BOOKING, fragment)
    };
    (sql, args)
}

fn booking_from_row(row: &PgRow) -> Result<Booking, DatabaseError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<BookingStatus>().map_err(|_| {
        DatabaseError::type_conversion("status", format!("unknown booking status '{}'", status))
    })?;

    Ok(Booking {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        product_id: row.try_get("product_id")?,
        date: row.try_get("date")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        price: row.try_get("price")?,
        status,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn get_booking_by_id(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<Booking, BookingError> {
        let mut client = self.store.new_client(false).await?;
        let sql = format!("{} WHERE b.id = $1", SELECT_BOOKING);

        let row = client
            .fetch_optional(ctx, &sql, vec![FilterValue::Integer(id)])
            .await?
            .ok_or(BookingError::DataNotFound)?;

        Ok(booking_from_row(&row)?)
    }

    async fn get_all_booking(
        &self,
        ctx: &RequestContext,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, BookingError> {
        let mut client = self.store.new_client(false).await?;
        let (sql, args) = list_query(filter);

        let rows = client.fetch_all(ctx, &sql, args).await?;
        let bookings = rows
            .iter()
            .map(booking_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = bookings.len(), "Fetched bookings");
        Ok(bookings)
    }
}
