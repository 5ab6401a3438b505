//! # booking-api
//!
//! HTTP API for a booking platform. Every request runs under a deadline: the
//! handler's work is spawned as a worker and raced against the clock, and
//! whichever finishes first decides the single response.
//!
//! ## Request flow
//!
//! - [`executor::Executor`] runs the worker, races it against the deadline
//!   and produces one [`envelope::Outcome`]
//! - [`auth`] validates the bearer token inside the worker
//! - [`classify`] maps domain errors to public codes and statuses, anything
//!   unmapped becomes an opaque 500
//! - [`filter`] compiles optional query parameters into parameterized SQL
//! - [`envelope`] writes `{"data": ...}` or `{"errors": [...]}`
//!
//! ## Example
//!
//! ```rust,no_run
//! use booking_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::connect(config.clone()).await?;
//!     let executor = state.executor().clone();
//!
//!     Server::new(config).serve(router(state), executor).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod booking;
pub mod classify;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod filter;
pub mod health;
pub mod middleware;
pub mod observability;
pub mod product;
pub mod server;
pub mod state;
pub mod store;
pub mod wire;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{authenticate, Identity, JwtAuthority, TokenAuthority};
    pub use crate::classify::{Classify, ClassificationTable};
    pub use crate::config::Config;
    pub use crate::envelope::{Envelope, Outcome};
    pub use crate::error::{DatabaseError, Error, Result};
    pub use crate::executor::{Executor, FormatError, Rejection, RequestContext};
    pub use crate::filter::{CompileFilter, Field, FilterValue, Predicate, PredicateBuilder};
    pub use crate::health::health;
    pub use crate::observability::init_tracing;
    pub use crate::server::{router, Server};
    pub use crate::state::{AppState, AppStateBuilder};
    pub use crate::store::{create_pool, PgClient, PgStore};
}
