//! Ordered band schema shared by composites, samples and classifiers

use super::band::BandKey;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Ordered, duplicate-free list of band keys.
///
/// A classifier is trained against one schema and can only be applied to
/// composites with exactly the same schema, order included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<BandKey>", into = "Vec<BandKey>")]
pub struct BandSchema {
    keys: Vec<BandKey>,
}

impl BandSchema {
    pub fn new(keys: Vec<BandKey>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in &keys {
            if !seen.insert(*key) {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: key.to_string(),
                    reason: "band listed twice".into(),
                });
            }
        }
        Ok(Self { keys })
    }

    /// Parse canonical band names
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let keys = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<BandKey>>>()?;
        Self::new(keys)
    }

    pub fn keys(&self) -> &[BandKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn position(&self, key: &BandKey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn contains(&self, key: &BandKey) -> bool {
        self.position(key).is_some()
    }

    /// Positions of `keys` in this schema, failing on the first missing key
    pub fn indices_of(&self, keys: &[BandKey]) -> Result<Vec<usize>> {
        keys.iter()
            .map(|k| {
                self.position(k)
                    .ok_or_else(|| Error::MissingBand(k.to_string()))
            })
            .collect()
    }

    /// Fail unless `other` has the same bands in the same order
    pub fn ensure_matches(&self, other: &BandSchema) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::SchemaMismatch {
                expected: self.to_string(),
                actual: other.to_string(),
            })
        }
    }

    pub(crate) fn push(&mut self, key: BandKey) -> Result<()> {
        if self.contains(&key) {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: key.to_string(),
                reason: "band listed twice".into(),
            });
        }
        self.keys.push(key);
        Ok(())
    }
}

impl fmt::Display for BandSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<BandKey>> for BandSchema {
    type Error = Error;

    fn try_from(keys: Vec<BandKey>) -> Result<Self> {
        BandSchema::new(keys)
    }
}

impl From<BandSchema> for Vec<BandKey> {
    fn from(schema: BandSchema) -> Self {
        schema.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_rejected() {
        assert!(BandSchema::parse(&["NDVI_mean", "slope", "NDVI_mean"]).is_err());
    }

    #[test]
    fn test_order_matters() {
        let a = BandSchema::parse(&["NDVI_mean", "slope"]).unwrap();
        let b = BandSchema::parse(&["slope", "NDVI_mean"]).unwrap();
        assert!(a.ensure_matches(&a.clone()).is_ok());
        let err = a.ensure_matches(&b).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert!(err.to_string().contains("NDVI_mean, slope"));
    }

    #[test]
    fn test_indices_of_missing() {
        let schema = BandSchema::parse(&["NDVI_mean", "WGI_min", "slope"]).unwrap();
        let keys: Vec<BandKey> = vec!["slope".parse().unwrap(), "NDVI_mean".parse().unwrap()];
        assert_eq!(schema.indices_of(&keys).unwrap(), vec![2, 0]);

        let missing: Vec<BandKey> = vec!["TWI".parse().unwrap()];
        assert!(matches!(schema.indices_of(&missing), Err(Error::MissingBand(_))));
    }
}
