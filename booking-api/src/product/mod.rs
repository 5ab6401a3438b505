//! Products: domain types, errors and the read service

mod postgres;
mod service;

pub mod http;

pub use postgres::PgProductStore;
pub use service::{ProductService, ProductStore};

#[cfg(test)]
pub(crate) use service::fake;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::classify::{Classify, ClassificationTable};
use crate::error::DatabaseError;
use crate::filter::{CompileFilter, Field, Predicate, PredicateBuilder};

/// A bookable product
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub images: Vec<String>,
    pub location: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: ProductStatus,
    pub capacity: i32,
    pub price: i64,
    pub min_charge: i64,
    pub daily_rate: i64,
    pub promo: bool,
    pub promo_price: i64,
    pub address: String,
    pub distance: f32,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
    pub rating: f32,
    pub create_time: DateTime<Utc>,
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown product status '{}'", other)),
        }
    }
}

/// Filter for listing products
///
/// Field order is the clause order of the compiled predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Partial match against location or address
    pub location: Field<String>,
    /// Earliest start time
    pub start_time: Field<NaiveTime>,
    /// Latest end time
    pub end_time: Field<NaiveTime>,
    pub date: Field<NaiveDate>,
    /// Maximum capacity
    pub capacity: Field<i32>,
    pub promo: Field<bool>,
}

impl CompileFilter for ProductFilter {
    fn compile(&self) -> Predicate {
        PredicateBuilder::new()
            .contains(
                &self.location,
                "(p.location LIKE :location OR p.address LIKE :location)",
                "location",
            )
            .equal(&self.start_time, "p.start_time >= :start_time", "start_time")
            .equal(&self.end_time, "p.end_time <= :end_time", "end_time")
            .equal(&self.date, "p.date = :date", "date")
            .equal(&self.capacity, "p.capacity <= :capacity", "capacity")
            .equal(&self.promo, "p.promo = :promo", "promo")
            .build()
    }
}

/// Expected product failure conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSentinel {
    DataNotFound,
    InvalidProductId,
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("data not found")]
    DataNotFound,

    #[error("invalid product id")]
    InvalidProductId,

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl Classify for ProductError {
    type Sentinel = ProductSentinel;

    fn sentinel(&self) -> Option<ProductSentinel> {
        match self {
            Self::DataNotFound => Some(ProductSentinel::DataNotFound),
            Self::InvalidProductId => Some(ProductSentinel::InvalidProductId),
            Self::Store(_) => None,
        }
    }
}

pub const DATA_NOT_FOUND: &str = "DATA_NOT_FOUND";
pub const INVALID_PRODUCT_ID: &str = "INVALID_PRODUCT_ID";

/// Public codes for the product endpoints, all 400
pub fn classification_table() -> ClassificationTable<ProductSentinel> {
    ClassificationTable::builder()
        .client(ProductSentinel::DataNotFound, DATA_NOT_FOUND)
        .client(ProductSentinel::InvalidProductId, INVALID_PRODUCT_ID)
        .build()
}
