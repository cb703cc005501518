//! Tests for configuration loading and output root preparation

use lims_snap::config::{ConfigError, LimsConfig};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn yaml_with_root(root: &std::path::Path) -> String {
    format!(
        "host: limsdb2\n\
         database: lims2\n\
         user: limsreader\n\
         password: secret\n\
         focal_plane_image_series_id: 99\n\
         image_output_root: {}\n",
        root.display()
    )
}

#[test]
fn test_from_file() {
    let dir = tempdir().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml_with_root(dir.path()).as_bytes()).unwrap();

    let config = LimsConfig::from_file(file.path()).unwrap();
    assert_eq!(config.focal_plane_image_series_id, 99);
    assert_eq!(config.image_output_root.as_deref(), Some(dir.path()));
}

#[test]
fn test_from_file_missing() {
    let err = LimsConfig::from_file(std::path::Path::new("/nonexistent/lims.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_empty_host_rejected() {
    let err = LimsConfig::from_yaml(
        "host: ''\ndatabase: lims2\nuser: u\nfocal_plane_image_series_id: 1\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_zero_port_rejected() {
    let err = LimsConfig::from_yaml(
        "host: h\nport: 0\ndatabase: lims2\nuser: u\nfocal_plane_image_series_id: 1\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_no_output_root_means_no_images() {
    let config = LimsConfig::from_yaml(
        "host: h\ndatabase: lims2\nuser: u\n\
         focal_plane_image_series_id: 1\nimage_output_root: null\n",
    )
    .unwrap();
    assert!(config.prepare_output_root().unwrap().is_none());
}

#[test]
fn test_output_root_is_created() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("nested").join("images");
    let config = LimsConfig::from_yaml(&yaml_with_root(&root)).unwrap();

    let prepared = config.prepare_output_root().unwrap();
    assert_eq!(prepared, Some(root.as_path()));
    assert!(root.is_dir());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
}

#[test]
fn test_output_root_that_is_a_file_is_rejected() {
    let file = NamedTempFile::new().unwrap();
    let config = LimsConfig::from_yaml(&yaml_with_root(file.path())).unwrap();

    assert!(matches!(
        config.prepare_output_root(),
        Err(ConfigError::OutputRoot { .. })
    ));
}
