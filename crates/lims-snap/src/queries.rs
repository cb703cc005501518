//! LIMS queries for one focal-plane image series
//!
//! Each query takes the series id as its only bound parameter (`$1`).
//! Row shaping lives next to the SQL that defines the selected columns.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lims_rdbc::{Connection, Row, Value};
use tracing::{debug, warn};

use crate::error::{AssemblyError, Result};
use crate::path::PolygonPath;
use crate::payload::{ImageDimensions, ImagePathPair, NamedPath};

/// Treatment whose annotations are authoritative. Polygons are duplicated
/// on the DAPI images, so filtering to one channel avoids double counting.
pub const ANNOTATION_TREATMENT: &str = "Biocytin";

/// Label of the pia surface drawing
pub const PIA_LABEL: &str = "Pia";

/// Label of the white matter surface drawing
pub const WHITE_MATTER_LABEL: &str = "White Matter";

/// Cortical layer polygons drawn on the Biocytin image
pub const LAYER_POLYGONS_SQL: &str = "\
SELECT st.acronym AS name, polygon.path AS path
FROM specimens sp
JOIN specimens spp ON spp.id = sp.parent_id
JOIN image_series imser ON imser.specimen_id = spp.id
JOIN sub_images si ON si.image_series_id = imser.id
JOIN images im ON im.id = si.image_id
JOIN treatments tm ON tm.id = im.treatment_id
JOIN avg_graphic_objects layer ON layer.sub_image_id = si.id
JOIN avg_group_labels label ON label.id = layer.group_label_id
JOIN avg_graphic_objects polygon ON polygon.parent_id = layer.id
JOIN structures st ON st.id = polygon.cortex_layer_id
WHERE imser.id = $1::bigint
  AND label.name = 'Cortical Layers'
  AND tm.name = 'Biocytin'";

/// Pia and white matter surface drawings
pub const CORTICAL_SURFACES_SQL: &str = "\
SELECT polygon.path AS path, label.name AS name
FROM specimens sp
JOIN specimens spp ON spp.id = sp.parent_id
JOIN image_series imser ON imser.specimen_id = spp.id
JOIN sub_images si ON si.image_series_id = imser.id
JOIN images im ON im.id = si.image_id
JOIN treatments tm ON tm.id = im.treatment_id
JOIN avg_graphic_objects layer ON layer.sub_image_id = si.id
JOIN avg_graphic_objects polygon ON polygon.parent_id = layer.id
JOIN avg_group_labels label ON label.id = layer.group_label_id
WHERE imser.id = $1::bigint
  AND label.name IN ('Pia', 'White Matter')
  AND tm.name = 'Biocytin'";

/// Source jp2 files for every sub-image in the series
pub const IMAGES_SQL: &str = "\
SELECT im.jp2 AS jp2, sl.storage_directory AS storage_directory, tm.name AS name
FROM sub_images si
JOIN images im ON im.id = si.image_id
JOIN slides sl ON sl.id = im.slide_id
JOIN treatments tm ON tm.id = im.treatment_id
WHERE si.image_series_id = $1::bigint
  AND tm.name IN ('Biocytin', 'DAPI')";

/// Dimensions of the series' Biocytin image
pub const IMAGE_DIMS_SQL: &str = "\
SELECT im.height AS height, im.width AS width
FROM specimens sp
JOIN specimens spp ON spp.id = sp.parent_id
JOIN image_series imser ON imser.specimen_id = spp.id
JOIN sub_images si ON si.image_series_id = imser.id
JOIN images im ON im.id = si.image_id
JOIN treatments tm ON tm.id = im.treatment_id
WHERE imser.id = $1::bigint
  AND tm.name = 'Biocytin'";

fn text<'r>(row: &'r Row, column: &'static str) -> Result<&'r str> {
    row.get_by_name(column)
        .and_then(Value::as_str)
        .ok_or(AssemblyError::UnexpectedColumn {
            column,
            expected: "text",
        })
}

fn number(row: &Row, column: &'static str) -> Result<f64> {
    row.get_by_name(column)
        .and_then(Value::as_f64)
        .ok_or(AssemblyError::UnexpectedColumn {
            column,
            expected: "number",
        })
}

fn named_path(row: &Row) -> Result<NamedPath> {
    let name = text(row, "name")?;
    let path = PolygonPath::parse(text(row, "path")?).map_err(|source| {
        AssemblyError::MalformedPath {
            name: name.to_string(),
            source,
        }
    })?;
    Ok(NamedPath::new(name, path))
}

async fn run(engine: &dyn Connection, sql: &str, series_id: i64, what: &str) -> Result<Vec<Row>> {
    let rows = engine.query(sql, &[Value::Int64(series_id)]).await?;
    debug!(series_id, rows = rows.len(), "queried {}", what);
    Ok(rows)
}

/// Cortical layer polygons for the series; no rows yields an empty vector
pub async fn query_layer_polygons(
    engine: &dyn Connection,
    series_id: i64,
) -> Result<Vec<NamedPath>> {
    run(engine, LAYER_POLYGONS_SQL, series_id, "layer polygons")
        .await?
        .iter()
        .map(named_path)
        .collect()
}

/// Pia and white matter surfaces, in that order.
///
/// Each label must appear exactly once.
pub async fn query_cortical_surfaces(
    engine: &dyn Connection,
    series_id: i64,
) -> Result<(NamedPath, NamedPath)> {
    let rows = run(engine, CORTICAL_SURFACES_SQL, series_id, "cortical surfaces").await?;

    let mut by_label: BTreeMap<String, Vec<NamedPath>> = BTreeMap::new();
    for row in &rows {
        let surface = named_path(row)?;
        by_label.entry(surface.name.clone()).or_default().push(surface);
    }

    let mut take = |label: &str| -> Result<NamedPath> {
        let mut found = by_label.remove(label).unwrap_or_default();
        match found.len() {
            0 => Err(AssemblyError::MissingSurface {
                label: label.to_string(),
            }),
            1 => Ok(found.remove(0)),
            count => Err(AssemblyError::DuplicateSurface {
                label: label.to_string(),
                count,
            }),
        }
    };

    let pia = take(PIA_LABEL)?;
    let white_matter = take(WHITE_MATTER_LABEL)?;

    for label in by_label.keys() {
        warn!(series_id, label = %label, "ignoring unexpected surface label");
    }

    Ok((pia, white_matter))
}

/// Input and output locations of the series' jp2 files.
///
/// Output files are named `{treatment}_{jp2}` under `output_dir`; two rows
/// that would share an output path are rejected.
pub async fn query_images(
    engine: &dyn Connection,
    series_id: i64,
    output_dir: &Path,
) -> Result<Vec<ImagePathPair>> {
    let rows = run(engine, IMAGES_SQL, series_id, "images").await?;

    let mut seen = HashSet::with_capacity(rows.len());
    let mut images = Vec::with_capacity(rows.len());
    for row in &rows {
        let jp2 = text(row, "jp2")?;
        let storage_directory = text(row, "storage_directory")?;
        let treatment = text(row, "name")?;

        let pair = ImagePathPair {
            input_path: Path::new(storage_directory).join(jp2),
            output_path: output_dir.join(format!("{}_{}", treatment, jp2)),
        };
        if !seen.insert(pair.output_path.clone()) {
            return Err(AssemblyError::OutputPathCollision {
                path: pair.output_path,
            });
        }
        images.push(pair);
    }
    Ok(images)
}

/// Width and height of the series' Biocytin image.
///
/// The same image can be reached through several sub-images; repeated rows
/// are accepted as long as they agree.
pub async fn query_image_dims(engine: &dyn Connection, series_id: i64) -> Result<ImageDimensions> {
    let rows = run(engine, IMAGE_DIMS_SQL, series_id, "image dimensions").await?;

    let mut dims: Option<(f64, f64)> = None;
    for row in &rows {
        let current = (number(row, "width")?, number(row, "height")?);
        match dims {
            None => dims = Some(current),
            Some(first) if first == current => {}
            Some(_) => return Err(AssemblyError::AmbiguousDimensions { series_id }),
        }
    }

    let (width, height) = dims.ok_or(AssemblyError::MissingSeries { series_id })?;
    ImageDimensions::new(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_query_binds_the_series_id() {
        for sql in [
            LAYER_POLYGONS_SQL,
            CORTICAL_SURFACES_SQL,
            IMAGES_SQL,
            IMAGE_DIMS_SQL,
        ] {
            assert!(sql.contains("$1::bigint"));
        }
    }

    #[test]
    fn test_annotation_queries_filter_treatment() {
        for sql in [LAYER_POLYGONS_SQL, CORTICAL_SURFACES_SQL, IMAGE_DIMS_SQL] {
            assert!(sql.contains(&format!("tm.name = '{}'", ANNOTATION_TREATMENT)));
        }
    }

    #[test]
    fn test_named_path_requires_text_columns() {
        let row = Row::from_pairs([("name", Value::Int32(1)), ("path", Value::from("0,0"))]);
        assert!(matches!(
            named_path(&row),
            Err(AssemblyError::UnexpectedColumn { column: "name", .. })
        ));
    }

    #[test]
    fn test_named_path_reports_malformed_path() {
        let row = Row::from_pairs([("name", "L4"), ("path", "1,2,3")]);
        match named_path(&row) {
            Err(AssemblyError::MalformedPath { name, .. }) => assert_eq!(name, "L4"),
            other => panic!("expected MalformedPath, got {:?}", other),
        }
    }
}
