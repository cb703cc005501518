//! Point-list parsing
//!
//! LIMS stores polygon boundaries as a flat list of numbers,
//! `x1,y1,x2,y2,...`. Some exports group the pairs with whitespace
//! (`x1,y1 x2,y2`), so commas and whitespace are both treated as
//! separators. A list with no coordinates at all is rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single `(x, y)` vertex
pub type Point = [f64; 2];

/// Failure to parse a serialized point list
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathParseError {
    /// The list holds no coordinates
    #[error("empty point list")]
    EmptyPath,

    /// A token is not a finite number
    #[error("invalid coordinate '{token}' at position {position}")]
    InvalidCoordinate { token: String, position: usize },

    /// The list ends in the middle of a pair
    #[error("odd number of coordinates ({count}); expected x,y pairs")]
    UnpairedCoordinate { count: usize },
}

/// An ordered 2-D polygon boundary
///
/// Serializes as a JSON array of `[x, y]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonPath(Vec<Point>);

impl PolygonPath {
    /// Build a path from already-parsed points
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Parse a serialized point list.
    ///
    /// ```
    /// use lims_snap::path::PolygonPath;
    ///
    /// let path = PolygonPath::parse("10,10 20,10 20,20").unwrap();
    /// assert_eq!(path.points(), &[[10.0, 10.0], [20.0, 10.0], [20.0, 20.0]]);
    ///
    /// assert!(PolygonPath::parse("1,2,3").is_err());
    /// assert!(PolygonPath::parse("").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, PathParseError> {
        let coords = raw
            .split(|c: char| c == ',' || c.is_ascii_whitespace())
            .filter(|token| !token.is_empty())
            .enumerate()
            .map(|(position, token)| match token.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(PathParseError::InvalidCoordinate {
                    token: token.to_string(),
                    position,
                }),
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if coords.is_empty() {
            return Err(PathParseError::EmptyPath);
        }
        if coords.len() % 2 != 0 {
            return Err(PathParseError::UnpairedCoordinate {
                count: coords.len(),
            });
        }

        Ok(Self(
            coords.chunks_exact(2).map(|xy| [xy[0], xy[1]]).collect(),
        ))
    }

    /// The vertices in drawing order
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the path has no vertices
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::str::FromStr for PolygonPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<Point>> for PolygonPath {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}
