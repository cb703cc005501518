//! Input assembly for the polygon-snapping module

use std::path::Path;
use std::sync::Arc;

use lims_rdbc::Connection;
use tracing::info;

use crate::error::Result;
use crate::payload::InputPayload;
use crate::queries::{
    query_cortical_surfaces, query_image_dims, query_images, query_layer_polygons,
};

/// Builds [`InputPayload`]s from a LIMS query capability
///
/// # Example
///
/// ```rust,ignore
/// use lims_snap::LimsInputAssembler;
///
/// let assembler = LimsInputAssembler::new(conn);
/// let payload = assembler.assemble(1_234_567, Some(Path::new("/scratch/images"))).await?;
/// ```
#[derive(Clone)]
pub struct LimsInputAssembler {
    engine: Arc<dyn Connection>,
}

impl LimsInputAssembler {
    /// Create an assembler over a query capability
    pub fn new(engine: Arc<dyn Connection>) -> Self {
        Self { engine }
    }

    /// The underlying query capability
    pub fn engine(&self) -> &dyn Connection {
        self.engine.as_ref()
    }

    /// Assemble the payload for one focal-plane image series
    pub async fn assemble(
        &self,
        series_id: i64,
        output_dir: Option<&Path>,
    ) -> Result<InputPayload> {
        assemble_inputs(self.engine.as_ref(), series_id, output_dir).await
    }
}

impl From<Box<dyn Connection>> for LimsInputAssembler {
    fn from(engine: Box<dyn Connection>) -> Self {
        Self::new(Arc::from(engine))
    }
}

/// Run the four series queries and merge them into one payload.
///
/// The image query runs only when `output_dir` is given; otherwise the
/// payload carries no `images` at all. The first failing query aborts the
/// assembly.
pub async fn assemble_inputs(
    engine: &dyn Connection,
    series_id: i64,
    output_dir: Option<&Path>,
) -> Result<InputPayload> {
    let layer_polygons = query_layer_polygons(engine, series_id).await?;
    let (pia_surface, wm_surface) = query_cortical_surfaces(engine, series_id).await?;
    let image_dimensions = query_image_dims(engine, series_id).await?;

    let images = match output_dir {
        Some(dir) => Some(query_images(engine, series_id, dir).await?),
        None => None,
    };

    info!(
        series_id,
        layers = layer_polygons.len(),
        images = images.as_ref().map(Vec::len),
        width = image_dimensions.width,
        height = image_dimensions.height,
        "assembled snapping inputs"
    );

    Ok(InputPayload {
        layer_polygons,
        pia_surface,
        wm_surface,
        image_dimensions,
        images,
    })
}
