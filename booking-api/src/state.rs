//! Application state shared across handlers

use std::sync::Arc;

use crate::auth::{JwtAuthority, TokenAuthority};
use crate::booking::{self, BookingSentinel, BookingService, PgBookingStore};
use crate::classify::ClassificationTable;
use crate::config::{Config, DeadlineConfig};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::product::{self, PgProductStore, ProductSentinel, ProductService};
use crate::store::{create_pool, PgStore};

/// Classification tables for every endpoint family
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ClassificationTables {
    pub booking: ClassificationTable<BookingSentinel>,
    pub product: ClassificationTable<ProductSentinel>,
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self {
            booking: booking::classification_table(),
            product: product::classification_table(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    bookings: Arc<BookingService>,
    products: Arc<ProductService>,
    authority: Arc<dyn TokenAuthority>,
    tables: Arc<ClassificationTables>,
    executor: Executor,
}

impl AppState {
    /// Start building state from explicit parts
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    /// Connect to Postgres and wire the production services
    pub async fn connect(config: Config) -> Result<Self> {
        let authority = JwtAuthority::new(&config.auth)?;
        let pool = create_pool(&config.database).await?;
        let store = PgStore::new(pool);

        Self::builder()
            .bookings(BookingService::new(Arc::new(PgBookingStore::new(store.clone()))))
            .products(ProductService::new(Arc::new(PgProductStore::new(store))))
            .authority(Arc::new(authority))
            .config(config)
            .build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn deadlines(&self) -> &DeadlineConfig {
        &self.config.deadlines
    }

    pub fn bookings(&self) -> &Arc<BookingService> {
        &self.bookings
    }

    pub fn products(&self) -> &Arc<ProductService> {
        &self.products
    }

    pub fn authority(&self) -> &Arc<dyn TokenAuthority> {
        &self.authority
    }

    pub fn tables(&self) -> &ClassificationTables {
        &self.tables
    }

    /// Executor whose root token is cancelled on shutdown
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

/// Builder for [`AppState`]
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    bookings: Option<BookingService>,
    products: Option<ProductService>,
    authority: Option<Arc<dyn TokenAuthority>>,
    tables: Option<ClassificationTables>,
    executor: Option<Executor>,
}

impl AppStateBuilder {
    /// Set the configuration; defaults to [`Config::default`]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn bookings(mut self, bookings: BookingService) -> Self {
        self.bookings = Some(bookings);
        self
    }

    pub fn products(mut self, products: ProductService) -> Self {
        self.products = Some(products);
        self
    }

    pub fn authority(mut self, authority: Arc<dyn TokenAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Override the classification tables
    pub fn tables(mut self, tables: ClassificationTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the state; services and authority are required
    pub fn build(self) -> Result<AppState> {
        let missing = |what: &str| Error::Internal(format!("AppState is missing {}", what));

        Ok(AppState {
            config: Arc::new(self.config.unwrap_or_default()),
            bookings: Arc::new(self.bookings.ok_or_else(|| missing("booking service"))?),
            products: Arc::new(self.products.ok_or_else(|| missing("product service"))?),
            authority: self.authority.ok_or_else(|| missing("token authority"))?,
            tables: Arc::new(self.tables.unwrap_or_default()),
            executor: self.executor.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_services() {
        let err = AppState::builder().build().err().expect("missing services");
        assert!(err.to_string().contains("booking service"));
    }

    #[test]
    fn test_default_tables_cover_both_families() {
        let tables = ClassificationTables::default();
        assert_eq!(tables.booking.len(), 3);
        assert_eq!(tables.product.len(), 2);
    }
}
