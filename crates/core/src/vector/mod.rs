//! Vector features: reference polygons and region outlines

mod rasterize;

pub use rasterize::polygon_cells;

use geo_types::{Geometry, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Integer view of numeric attributes; floats must be integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            AttributeValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Polygons of this feature; multipolygons are split into their parts
    /// and non-areal geometries yield nothing.
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        match &self.geometry {
            Some(Geometry::Polygon(p)) => vec![p.clone()],
            Some(Geometry::MultiPolygon(mp)) => mp.0.clone(),
            Some(Geometry::GeometryCollection(gc)) => gc
                .0
                .iter()
                .flat_map(|g| Feature::new(g.clone()).polygons())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Features whose integer attribute `key` is one of `values`
    pub fn filter_by_codes(&self, key: &str, values: &[i64]) -> FeatureCollection {
        self.features
            .iter()
            .filter(|f| {
                f.get_property(key)
                    .and_then(AttributeValue::as_i64)
                    .map_or(false, |v| values.contains(&v))
            })
            .cloned()
            .collect()
    }

    /// One feature per polygon part, attributes copied
    pub fn explode(&self) -> FeatureCollection {
        self.features
            .iter()
            .flat_map(|f| {
                f.polygons().into_iter().map(move |p| Feature {
                    geometry: Some(Geometry::Polygon(p)),
                    properties: f.properties.clone(),
                    id: f.id.clone(),
                })
            })
            .collect()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
