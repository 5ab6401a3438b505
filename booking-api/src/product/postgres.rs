use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{Product, ProductError, ProductFilter, ProductStatus, ProductStore};
use crate::error::DatabaseError;
use crate::executor::RequestContext;
use crate::filter::{CompileFilter, FilterValue};
use crate::store::PgStore;

const SELECT_PRODUCT: &str = "\
SELECT p.id, p.name, p.images, p.location, p.date, p.start_time, p.end_time, p.status, \
p.capacity, p.price, p.min_charge, p.daily_rate, p.promo, p.promo_price, p.address, \
p.distance, p.description, p.latitude, p.longitude, p.rating, p.create_time, p.update_time \
FROM product p";

/// Products backed by Postgres
#[derive(Debug, Clone)]
pub struct PgProductStore {
    store: PgStore,
}

impl PgProductStore {
    pub fn new(store: PgStore) -> Self {
        Self { store }
    }
}

fn list_query(filter: &ProductFilter) -> (String, Vec<FilterValue>) {
    let predicate = filter.compile();
    let (fragment, args) = predicate.to_positional(1);
    let sql = if predicate.is_empty() {
        format!("{} ORDER BY p.id", SELECT_PRODUCT)
    } else {
        format!("{} WHERE {} ORDER BY p.id", SELECT_PRODUCT, fragment)
    };
    (sql, args)
}

fn product_from_row(row: &PgRow) -> Result<Product, DatabaseError> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ProductStatus>()
        .map_err(|e| DatabaseError::type_conversion("status", e))?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        images: row.try_get("images")?,
        location: row.try_get("location")?,
        date: row.try_get("date")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        status,
        capacity: row.try_get("capacity")?,
        price: row.try_get("price")?,
        min_charge: row.try_get("min_charge")?,
        daily_rate: row.try_get("daily_rate")?,
        promo: row.try_get("promo")?,
        promo_price: row.try_get("promo_price")?,
        address: row.try_get("address")?,
        distance: row.try_get("distance")?,
        description: row.try_get("description")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        rating: row.try_get("rating")?,
        create_time: row.try_get("create_time")?,
        update_time: row.try_get("update_time")?,
    })
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn get_product_by_id(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<Product, ProductError> {
        let mut client = self.store.new_client(false).await?;
        let sql = format!("{} WHERE p.id = $1", SELECT_PRODUCT);

        let row = client
            .fetch_optional(ctx, &sql, vec![FilterValue::Integer(id)])
            .await?
            .ok_or(ProductError::DataNotFound)?;

        Ok(product_from_row(&row)?)
    }

    async fn get_products(
        &self,
        ctx: &RequestContext,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, ProductError> {
        let mut client = self.store.new_client(false).await?;
        let (sql, args) = list_query(filter);

        let rows = client.fetch_all(ctx, &sql, args).await?;
        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = products.len(), "Fetched products");
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Field;
    use chrono::NaiveDate;

    #[test]
    fn test_list_query_without_filter() {
        let (sql, args) = list_query(&ProductFilter::default());
        assert!(sql.starts_with("SELECT p.id, p.name"));
        assert!(!sql.contains("WHERE"));
        assert!(args.is_empty());
    }

    #[test]
    fn test_list_query_numbers_parameters_in_field_order() {
        let filter = ProductFilter {
            location: Field::Present("kuta".to_string()),
            date: Field::Present(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            ..ProductFilter::default()
        };
        let (sql, args) = list_query(&filter);
        assert!(sql.ends_with(
            "WHERE (p.location LIKE $1 OR p.address LIKE $1) AND p.date = $2 ORDER BY p.id"
        ));
        assert_eq!(
            args,
            vec![
                FilterValue::Text("%kuta%".to_string()),
                FilterValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            ]
        );
    }
}
