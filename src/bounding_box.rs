use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Geographic rectangle used to filter the upstream state vectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Swiss airspace plus border regions
    pub const SWITZERLAND: BoundingBox = BoundingBox {
        lat_min: 45.0,
        lon_min: 5.0,
        lat_max: 48.0,
        lon_max: 11.0,
    };

    /// Create a validated bounding box
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Result<Self> {
        let bbox = Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<()> {
        for lat in [self.lat_min, self.lat_max] {
            if !(-90.0..=90.0).contains(&lat) {
                anyhow::bail!("Latitude {} must be between -90 and 90 degrees", lat);
            }
        }
        for lon in [self.lon_min, self.lon_max] {
            if !(-180.0..=180.0).contains(&lon) {
                anyhow::bail!("Longitude {} must be between -180 and 180 degrees", lon);
            }
        }
        if self.lat_min >= self.lat_max {
            anyhow::bail!(
                "lat_min ({}) must be less than lat_max ({})",
                self.lat_min,
                self.lat_max
            );
        }
        if self.lon_min >= self.lon_max {
            anyhow::bail!(
                "lon_min ({}) must be less than lon_max ({})",
                self.lon_min,
                self.lon_max
            );
        }
        Ok(())
    }

    /// Query parameters understood by the OpenSky `/states/all` endpoint
    pub fn query_params(&self) -> [(&'static str, String); 4] {
        [
            ("lamin", self.lat_min.to_string()),
            ("lomin", self.lon_min.to_string()),
            ("lamax", self.lat_max.to_string()),
            ("lomax", self.lon_max.to_string()),
        ]
    }

    /// Short stable name, used for lock files and log fields
    pub fn slug(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.lat_min, self.lon_min, self.lat_max, self.lon_max
        )
        .replace('-', "m")
        .replace('.', "p")
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::SWITZERLAND
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.lat_min, self.lon_min, self.lat_max, self.lon_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_switzerland() {
        let bbox = BoundingBox::default();
        assert_eq!(bbox.lat_min, 45.0);
        assert_eq!(bbox.lon_min, 5.0);
        assert_eq!(bbox.lat_max, 48.0);
        assert_eq!(bbox.lon_max, 11.0);
        assert!(bbox.validate().is_ok());
    }

    #[test]
    fn test_query_params_order_and_names() {
        let params = BoundingBox::SWITZERLAND.query_params();
        let names: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["lamin", "lomin", "lamax", "lomax"]);
        assert_eq!(params[0].1, "45");
        assert_eq!(params[3].1, "11");
    }

    #[test]
    fn test_rejects_inverted_box() {
        assert!(BoundingBox::new(48.0, 5.0, 45.0, 11.0).is_err());
        assert!(BoundingBox::new(45.0, 11.0, 48.0, 5.0).is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(BoundingBox::new(-91.0, 5.0, 45.0, 11.0).is_err());
        assert!(BoundingBox::new(45.0, 5.0, 48.0, 181.0).is_err());
    }

    #[test]
    fn test_slug_is_filesystem_safe() {
        let bbox = BoundingBox::new(-33.5, 150.25, -32.0, 152.0).unwrap();
        let slug = bbox.slug();
        assert!(!slug.contains('.'));
        assert!(!slug.contains('-'));
        assert_eq!(BoundingBox::SWITZERLAND.slug(), "45_5_48_11");
        assert_eq!(slug, "m33p5_150p25_m32_152");
    }
}
