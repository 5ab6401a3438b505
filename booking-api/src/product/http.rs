//! Product HTTP handlers
//!
//! - `GET /api/v1/products` lists products (list deadline). Query parameters:
//!   `location`, `date` (`DD/MM/YYYY`), `start_time` and `end_time` (`3:04 PM`),
//!   `capacity`, `is_promo`.
//! - `GET /api/v1/products/{id}` returns one product (read deadline)

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use super::{Product, ProductError, ProductFilter, INVALID_PRODUCT_ID};
use crate::auth::authenticate;
use crate::envelope::{Outcome, INVALID_QUERY};
use crate::executor::{FormatError, Rejection};
use crate::filter::Field;
use crate::state::AppState;
use crate::wire::{first_values, format_date, format_time, parse_date, parse_time};

pub const INVALID_DATE: &str = "INVALID_DATE";
pub const INVALID_START_TIME: &str = "INVALID_START_TIME";
pub const INVALID_END_TIME: &str = "INVALID_END_TIME";
pub const INVALID_CAPACITY: &str = "INVALID_CAPACITY";
pub const INVALID_PROMO: &str = "INVALID_PROMO";

/// Wire representation of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductHttp {
    pub id: i64,
    pub name: String,
    pub images: Vec<String>,
    pub location: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
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
}

/// Query string of the list endpoint
#[derive(Debug, Default)]
pub struct ListProductsQuery {
    pub location: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<String>,
    pub is_promo: Option<String>,
}

impl ListProductsQuery {
    /// Build from raw pairs; repeated keys keep their first value
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut values = first_values(pairs);
        Self {
            location: values.remove("location"),
            date: values.remove("date"),
            start_time: values.remove("start_time"),
            end_time: values.remove("end_time"),
            capacity: values.remove("capacity"),
            is_promo: values.remove("is_promo"),
        }
    }
}

pub fn format_product(p: Product) -> Result<ProductHttp, FormatError> {
    Ok(ProductHttp {
        id: p.id,
        name: p.name,
        images: p.images,
        location: p.location,
        date: format_date(p.date),
        start_time: format_time(p.start_time),
        end_time: format_time(p.end_time),
        status: p.status.to_string(),
        capacity: p.capacity,
        price: p.price,
        min_charge: p.min_charge,
        daily_rate: p.daily_rate,
        promo: p.promo,
        promo_price: p.promo_price,
        address: p.address,
        distance: p.distance,
        description: p.description,
        latitude: p.latitude,
        longitude: p.longitude,
        rating: p.rating,
    })
}

fn format_products(products: Vec<Product>) -> Result<Vec<ProductHttp>, FormatError> {
    products.into_iter().map(format_product).collect()
}

// 1/0, t/f and true/false in their usual casings
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_field<T>(
    value: &Option<String>,
    parse: impl FnOnce(&str) -> Option<T>,
    code: &'static str,
) -> Result<Field<T>, Rejection<ProductError>> {
    match given(value) {
        Some(raw) => parse(raw).map(Field::Present).ok_or(Rejection::BadRequest(code)),
        None => Ok(Field::Absent),
    }
}

fn parse_list_filter(
    query: &ListProductsQuery,
) -> Result<ProductFilter, Rejection<ProductError>> {
    Ok(ProductFilter {
        location: given(&query.location).map(str::to_string).into(),
        start_time: parse_field(&query.start_time, parse_time, INVALID_START_TIME)?,
        end_time: parse_field(&query.end_time, parse_time, INVALID_END_TIME)?,
        date: parse_field(&query.date, parse_date, INVALID_DATE)?,
        // only a positive capacity and a true promo flag constrain the listing
        capacity: parse_field(&query.capacity, |raw| raw.parse::<i32>().ok(), INVALID_CAPACITY)?
            .filter(|capacity| *capacity > 0),
        promo: parse_field(&query.is_promo, parse_bool, INVALID_PROMO)?.filter(|promo| *promo),
    })
}

/// `GET /api/v1/products/{id}`
pub async fn get_product(
    State(state): State<AppState>,
    raw_id: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
) -> Outcome {
    const ENDPOINT: &str = "get_product_by_id";

    let id = match raw_id {
        Ok(Path(raw)) => raw.parse::<i64>().map_err(|e| e.to_string()),
        Err(rejection) => Err(rejection.body_text()),
    };
    let id = match id {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(endpoint = ENDPOINT, error = %e, "Failed to parse product id");
            return Outcome::client_error(INVALID_PRODUCT_ID, StatusCode::BAD_REQUEST);
        }
    };

    let products = state.products().clone();
    let authority = state.authority().clone();

    state
        .executor()
        .execute(
            ENDPOINT,
            state.deadlines().read(),
            &state.tables().product,
            move |ctx| async move {
                authenticate::<ProductError>(&ctx, authority.as_ref(), &headers, ENDPOINT)
                    .await?;
                products
                    .get_product_by_id(&ctx, id)
                    .await
                    .map_err(Rejection::Domain)
            },
            format_product,
        )
        .await
}

/// `GET /api/v1/products`
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
) -> Outcome {
    const ENDPOINT: &str = "get_products";

    let query = match query {
        Ok(Query(pairs)) => Some(ListProductsQuery::from_pairs(pairs)),
        Err(e) => {
            tracing::debug!(endpoint = ENDPOINT, error = %e, "Unreadable query string");
            None
        }
    };

    let products = state.products().clone();
    let authority = state.authority().clone();

    state
        .executor()
        .execute(
            ENDPOINT,
            state.deadlines().list(),
            &state.tables().product,
            move |ctx| async move {
                authenticate::<ProductError>(&ctx, authority.as_ref(), &headers, ENDPOINT)
                    .await?;
                let query = query.ok_or(Rejection::BadRequest(INVALID_QUERY))?;
                let filter = parse_list_filter(&query)?;
                products
                    .get_products(&ctx, &filter)
                    .await
                    .map_err(Rejection::Domain)
            },
            format_products,
        )
        .await
}
