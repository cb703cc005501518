//! # lims-rdbc
//!
//! Relational database connectivity for LIMS adapters.
//!
//! This crate provides the query capability that LIMS adapters are written
//! against, so an adapter can run on a live PostgreSQL connection in
//! production and on an in-memory stub in tests.
//!
//! ## Features
//!
//! - **Query capability**: the object-safe [`Connection`](connection::Connection) trait
//! - **Value types**: [`Value`] and [`Row`](types::Row) with by-name column lookup
//! - **Error classification**: [`Error`] with [`ErrorCategory`](error::ErrorCategory)
//! - **PostgreSQL backend**: tokio-postgres with connect and query timeouts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lims_rdbc::prelude::*;
//!
//! let config = ConnectionConfig::postgres("limsdb2", 5432, "lims2", "reader", "secret")?
//!     .with_query_timeout(30_000);
//! let conn = PgConnectionFactory.connect(&config).await?;
//! let rows = conn
//!     .query("SELECT id FROM image_series WHERE id = $1", &[Value::Int64(42)])
//!     .await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `postgres` - PostgreSQL support via tokio-postgres (default)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::{Connection, ConnectionConfig, ConnectionFactory};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::types::{Row, Value};

    #[cfg(feature = "postgres")]
    pub use crate::postgres::{PgConnection, PgConnectionFactory};
}

// Re-export commonly used items at crate root
pub use connection::Connection;
pub use error::{Error, Result};
pub use types::{Row, Value};

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _value = Value::Int64(42);
        let _config = ConnectionConfig::new("postgres://localhost/lims2");
    }

    #[test]
    fn test_error_types() {
        let err = Error::connection("test error");
        assert!(err.is_retriable());
        assert_eq!(err.category(), ErrorCategory::Connection);
    }
}
