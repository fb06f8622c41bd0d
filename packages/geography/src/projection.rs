//! Coordinate projection requested during reconciliation.
//!
//! Boundary services are queried with `outSR=4326`, so every record
//! arrives in WGS84 degrees. The reconciler asks a [`Projector`] to move
//! records into the rendering projection; it never does the maths itself.

use geo::{Coord, MapCoords as _, MultiPolygon};

use crate::GeoError;

/// Earth radius used by spherical Web Mercator, in metres.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator is undefined.
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Projects geometry from WGS84 degrees into a target coordinate system.
pub trait Projector {
    /// EPSG code of the target coordinate system.
    fn epsg(&self) -> u32;

    /// Projects one coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Projection`] if the coordinate lies outside the
    /// projection's domain.
    fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeoError>;

    /// Projects every coordinate of a polygon set.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Projection`] if any coordinate fails.
    fn project(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, GeoError> {
        geometry.try_map_coords(|c| self.project_coord(c))
    }
}

/// Supported target projections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    /// EPSG:4326, longitude/latitude in degrees. Identity.
    #[default]
    Wgs84,
    /// EPSG:3857, spherical Web Mercator in metres.
    WebMercator,
}

impl Projection {
    /// Resolves an EPSG code to a supported projection.
    #[must_use]
    pub const fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Wgs84),
            3857 => Some(Self::WebMercator),
            _ => None,
        }
    }
}

impl Projector for Projection {
    fn epsg(&self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeoError> {
        match self {
            Self::Wgs84 => Ok(coord),
            Self::WebMercator => {
                if coord.y.abs() > WEB_MERCATOR_MAX_LAT {
                    return Err(GeoError::Projection {
                        message: format!(
                            "latitude {} is outside the Web Mercator domain",
                            coord.y
                        ),
                    });
                }
                let x = WEB_MERCATOR_RADIUS * coord.x.to_radians();
                let y = WEB_MERCATOR_RADIUS
                    * (std::f64::consts::FRAC_PI_4 + coord.y.to_radians() / 2.0)
                        .tan()
                        .ln();
                Ok(Coord { x, y })
            }
        }
    }
}
