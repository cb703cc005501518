//! # lims-snap
//!
//! Assembles the input payload of the polygon-snapping module from LIMS:
//! cortical layer polygons, pia and white matter surfaces, image
//! dimensions and, optionally, the jp2 files to copy for one focal-plane
//! image series.
//!
//! The assembler is written against [`lims_rdbc::Connection`], so the same
//! code runs on a live PostgreSQL connection and on
//! [`testing::StubConnection`].
//!
//! ```rust,ignore
//! use lims_snap::prelude::*;
//!
//! let config = LimsConfig::from_file(Path::new("lims.yml"))?;
//! let conn = PgConnectionFactory.connect(&config.connection_config()?).await?;
//! let payload = assemble_inputs(
//!     conn.as_ref(),
//!     config.focal_plane_image_series_id,
//!     config.prepare_output_root()?,
//! )
//! .await?;
//! println!("{}", payload.to_json(true)?);
//! ```

#![deny(unsafe_code)]

pub mod assembler;
pub mod config;
pub mod error;
pub mod path;
pub mod payload;
pub mod queries;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assembler::{assemble_inputs, LimsInputAssembler};
    pub use crate::config::{ConfigError, LimsConfig};
    pub use crate::error::{AssemblyError, Result};
    pub use crate::path::{PathParseError, Point, PolygonPath};
    pub use crate::payload::{ImageDimensions, ImagePathPair, InputPayload, NamedPath};
    pub use crate::queries::{
        query_cortical_surfaces, query_image_dims, query_images, query_layer_polygons,
    };
}

pub use assembler::{assemble_inputs, LimsInputAssembler};
pub use error::{AssemblyError, Result};
pub use payload::InputPayload;
