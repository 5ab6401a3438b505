use std::sync::Arc;

use async_trait::async_trait;

use super::{Product, ProductError, ProductFilter};
use crate::executor::RequestContext;

/// Persistence contract for products
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product_by_id(&self, ctx: &RequestContext, id: i64)
        -> Result<Product, ProductError>;

    async fn get_products(
        &self,
        ctx: &RequestContext,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, ProductError>;
}

/// Read operations on products
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    /// Return the product with the given ID
    pub async fn get_product_by_id(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<Product, ProductError> {
        if id <= 0 {
            return Err(ProductError::InvalidProductId);
        }

        self.store.get_product_by_id(ctx, id).await
    }

    /// Return every product matching `filter`
    pub async fn get_products(
        &self,
        ctx: &RequestContext,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, ProductError> {
        self.store.get_products(ctx, filter).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::product::ProductStatus;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::sync::Mutex;

    /// In-memory store recording the last filter it was asked for
    #[derive(Default)]
    pub(crate) struct MemoryProductStore {
        pub products: Vec<Product>,
        pub last_filter: Mutex<Option<ProductFilter>>,
    }

    pub(crate) fn product(id: i64, location: &str, capacity: i32, promo: bool) -> Product {
        Product {
            id,
            name: format!("Villa {}", id),
            images: vec![format!("https://img.example/{}.jpg", id)],
            location: location.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            status: ProductStatus::Active,
            capacity,
            price: 500_000,
            min_charge: 100_000,
            daily_rate: 450_000,
            promo,
            promo_price: 400_000,
            address: format!("Jl. Raya {} No. {}", location, id),
            distance: 1.5,
            description: "Quiet place".to_string(),
            latitude: "-8.5069".to_string(),
            longitude: "115.2625".to_string(),
            rating: 4.5,
            create_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            update_time: None,
        }
    }

    fn matches(p: &Product, filter: &ProductFilter) -> bool {
        let location = filter
            .location
            .as_option()
            .is_none_or(|l| p.location.contains(l.as_str()) || p.address.contains(l.as_str()));

        location
            && filter.start_time.as_option().is_none_or(|t| p.start_time >= *t)
            && filter.end_time.as_option().is_none_or(|t| p.end_time <= *t)
            && filter.date.as_option().is_none_or(|d| p.date == *d)
            && filter.capacity.as_option().is_none_or(|c| p.capacity <= *c)
            && filter.promo.as_option().is_none_or(|promo| p.promo == *promo)
    }

    #[async_trait]
    impl ProductStore for MemoryProductStore {
        async fn get_product_by_id(
            &self,
            _ctx: &RequestContext,
            id: i64,
        ) -> Result<Product, ProductError> {
            self.products
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ProductError::DataNotFound)
        }

        async fn get_products(
            &self,
            _ctx: &RequestContext,
            filter: &ProductFilter,
        ) -> Result<Vec<Product>, ProductError> {
            if let Ok(mut last) = self.last_filter.lock() {
                *last = Some(filter.clone());
            }
            Ok(self
                .products
                .iter()
                .filter(|p| matches(p, filter))
                .cloned()
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{product, MemoryProductStore};
    use super::*;
    use crate::filter::Field;
    use std::time::Duration;

    fn ctx() -> RequestContext {
        RequestContext::with_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_invalid_product_id() {
        let service = ProductService::new(Arc::new(MemoryProductStore::default()));
        let err = service.get_product_by_id(&ctx(), 0).await.unwrap_err();
        assert!(matches!(err, ProductError::InvalidProductId));
    }

    #[tokio::test]
    async fn test_get_product_by_id() {
        let store = MemoryProductStore {
            products: vec![product(1, "Ubud", 4, false)],
            ..Default::default()
        };
        let service = ProductService::new(Arc::new(store));
        assert_eq!(service.get_product_by_id(&ctx(), 1).await.unwrap().id, 1);
        assert!(matches!(
            service.get_product_by_id(&ctx(), 2).await,
            Err(ProductError::DataNotFound)
        ));
    }

    #[tokio::test]
    async fn test_get_products_passes_filter_through() {
        let store = Arc::new(MemoryProductStore {
            products: vec![
                product(1, "Ubud", 4, true),
                product(2, "Canggu", 10, true),
                product(3, "Ubud", 12, false),
            ],
            ..Default::default()
        });
        let service = ProductService::new(store.clone());
        let filter = ProductFilter {
            location: Field::Present("Ubud".to_string()),
            capacity: Field::Present(10),
            ..ProductFilter::default()
        };

        let found = service.get_products(&ctx(), &filter).await.unwrap();
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(store.last_filter.lock().unwrap().as_ref(), Some(&filter));
    }
}
