//! Coordinate reference systems used by the pipeline.
//!
//! Station tables and crop points arrive as WGS84 longitude/latitude. Nearest
//! neighbour searches run in a UTM zone so distances are in metres, and the
//! CropScape rasters come in CONUS Albers. Only the forward/inverse maps the
//! pipeline needs are implemented here.

use crate::error::{ProcessingError, Result};
use std::fmt;

/// WGS84 semi-major axis (metres).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// GRS80 semi-major axis, used by NAD83 / CONUS Albers.
const GRS80_A: f64 = 6_378_137.0;
/// GRS80 first eccentricity squared.
const GRS80_E2: f64 = 0.006_694_380_022_90;

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326, EPSG:4269).
    Geographic,
    /// WGS84 / UTM northern hemisphere (EPSG:326xx).
    Utm { zone: u8 },
    /// NAD83 / CONUS Albers (EPSG:5070).
    ConusAlbers,
}

impl Crs {
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 | 4269 => Ok(Crs::Geographic),
            5070 => Ok(Crs::ConusAlbers),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
            }),
            other => Err(ProcessingError::Projection(format!(
                "unsupported EPSG code {}",
                other
            ))),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic => 4326,
            Crs::Utm { zone } => 32600 + *zone as u32,
            Crs::ConusAlbers => 5070,
        }
    }

    /// Project a WGS84 lon/lat pair into this CRS.
    pub fn from_lon_lat(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (lon, lat),
            Crs::Utm { zone } => utm_forward(lon, lat, *zone),
            Crs::ConusAlbers => CONUS_ALBERS.forward(lon, lat),
        }
    }

    /// Convert a coordinate in this CRS back to WGS84 lon/lat.
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (x, y),
            Crs::Utm { zone } => utm_inverse(x, y, *zone),
            Crs::ConusAlbers => CONUS_ALBERS.inverse(x, y),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// UTM zone containing a longitude.
pub fn utm_zone(longitude: f64) -> u8 {
    let zone = ((longitude + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// UTM zone of the median longitude of a point set.
pub fn utm_zone_for_median(longitudes: &[f64]) -> Result<u8> {
    let mut sorted: Vec<f64> = longitudes.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(ProcessingError::Projection(
            "cannot pick a UTM zone without coordinates".to_string(),
        ));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(utm_zone(median))
}

struct KrugerSeries {
    a_rect: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    n: f64,
}

fn kruger() -> KrugerSeries {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;
    KrugerSeries {
        a_rect: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
        n,
    }
}

fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// WGS84 lon/lat to UTM easting/northing (northern hemisphere).
pub fn utm_forward(lon: f64, lat: f64, zone: u8) -> (f64, f64) {
    let k = kruger();
    let phi = lat.to_radians();
    let dlam = (lon - central_meridian(zone)).to_radians();

    let c = 2.0 * k.n.sqrt() / (1.0 + k.n);
    let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
    let xi_p = (t / dlam.cos()).atan();
    let eta_p = (dlam.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        xi += alpha * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += alpha * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    (
        UTM_FALSE_EASTING + UTM_SCALE * k.a_rect * eta,
        UTM_SCALE * k.a_rect * xi,
    )
}

/// UTM easting/northing (northern hemisphere) to WGS84 lon/lat.
pub fn utm_inverse(easting: f64, northing: f64, zone: u8) -> (f64, f64) {
    let k = kruger();
    let xi = northing / (UTM_SCALE * k.a_rect);
    let eta = (easting - UTM_FALSE_EASTING) / (UTM_SCALE * k.a_rect);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in k.beta.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        xi_p -= beta * (m * xi).sin() * (m * eta).cosh();
        eta_p -= beta * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut phi = chi;
    for (j, delta) in k.delta.iter().enumerate() {
        let m = 2.0 * (j as f64 + 1.0);
        phi += delta * (m * chi).sin();
    }
    let dlam = (eta_p.sinh() / xi_p.cos()).atan();

    (central_meridian(zone) + dlam.to_degrees(), phi.to_degrees())
}

/// Albers equal-area conic on the GRS80 ellipsoid.
pub struct AlbersEqualArea {
    lon0: f64,
    n: f64,
    c: f64,
    rho0: f64,
}

/// EPSG:5070 parameters.
const CONUS_ALBERS: AlbersEqualArea = AlbersEqualArea::conus();

fn albers_q(phi: f64) -> f64 {
    let e = GRS80_E2.sqrt();
    let s = phi.sin();
    (1.0 - GRS80_E2)
        * (s / (1.0 - GRS80_E2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

fn albers_m(phi: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - GRS80_E2 * s * s).sqrt()
}

impl AlbersEqualArea {
    /// Standard parallels 29.5/45.5, origin 23N 96W.
    ///
    /// The derived constants are precomputed so this can be a `const`; see
    /// the `test_conus_constants` test for the derivation.
    const fn conus() -> Self {
        Self {
            lon0: -96.0,
            n: 0.602_902_769_065_759,
            c: 1.349_182_031_560_969_3,
            rho0: 9_928_937.004_248_794,
        }
    }

    pub fn new(lat0: f64, lon0: f64, lat1: f64, lat2: f64) -> Self {
        let (p0, p1, p2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());
        let (m1, m2) = (albers_m(p1), albers_m(p2));
        let (q0, q1, q2) = (albers_q(p0), albers_q(p1), albers_q(p2));
        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;
        let rho0 = GRS80_A * (c - n * q0).sqrt() / n;
        Self { lon0, n, c, rho0 }
    }

    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let q = albers_q(lat.to_radians());
        let rho = GRS80_A * (self.c - self.n * q).sqrt() / self.n;
        let theta = self.n * (lon - self.lon0).to_radians();
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dy = self.rho0 - y;
        let rho = (x * x + dy * dy).sqrt();
        let theta = x.atan2(dy);
        let q = (self.c - rho * rho * self.n * self.n / (GRS80_A * GRS80_A)) / self.n;

        let e = GRS80_E2.sqrt();
        let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..15 {
            let s = phi.sin();
            let one_minus = 1.0 - GRS80_E2 * s * s;
            let next = phi
                + one_minus * one_minus / (2.0 * phi.cos())
                    * (q / (1.0 - GRS80_E2) - s / one_minus
                        + (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln());
            if (next - phi).abs() < 1e-12 {
                phi = next;
                break;
            }
            phi = next;
        }

        (self.lon0 + (theta / self.n).to_degrees(), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_zone() {
        assert_eq!(utm_zone(-122.4), 10);
        assert_eq!(utm_zone(-81.0), 17);
        assert_eq!(utm_zone(-180.0), 1);
        assert_eq!(utm_zone(180.0), 60);
    }

    #[test]
    fn test_utm_zone_for_median() {
        let zone = utm_zone_for_median(&[-124.0, -120.5, -117.0]).unwrap();
        assert_eq!(zone, 10);
        assert!(utm_zone_for_median(&[]).is_err());
    }

    #[test]
    fn test_utm_central_meridian_origin() {
        let (e, n) = utm_forward(-123.0, 0.0, 10);
        assert!((e - 500_000.0).abs() < 1e-6);
        assert!(n.abs() < 1e-6);
    }

    #[test]
    fn test_utm_northing_at_45() {
        // Meridian arc to 45N scaled by k0
        let (e, n) = utm_forward(-123.0, 45.0, 10);
        assert!((e - 500_000.0).abs() < 1e-3);
        assert!((n - 4_982_950.4).abs() < 1.0);
    }

    #[test]
    fn test_utm_roundtrip() {
        for &(lon, lat) in &[(-121.49, 38.58), (-118.24, 34.05), (-124.9, 41.9)] {
            let (e, n) = utm_forward(lon, lat, 10);
            let (lon2, lat2) = utm_inverse(e, n, 10);
            assert!((lon - lon2).abs() < 1e-8, "lon {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "lat {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_conus_constants() {
        let derived = AlbersEqualArea::new(23.0, -96.0, 29.5, 45.5);
        assert!((derived.n - CONUS_ALBERS.n).abs() < 1e-9);
        assert!((derived.c - CONUS_ALBERS.c).abs() < 1e-9);
        assert!((derived.rho0 - CONUS_ALBERS.rho0).abs() < 1e-3);
    }

    #[test]
    fn test_albers_origin_and_roundtrip() {
        let albers = AlbersEqualArea::new(23.0, -96.0, 29.5, 45.5);
        let (x, y) = albers.forward(-96.0, 23.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        let (x, y) = albers.forward(-81.38, 28.54);
        let (lon, lat) = albers.inverse(x, y);
        assert!((lon - -81.38).abs() < 1e-8);
        assert!((lat - 28.54).abs() < 1e-8);
    }

    #[test]
    fn test_crs_from_epsg() {
        assert_eq!(Crs::from_epsg(4326).unwrap(), Crs::Geographic);
        assert_eq!(Crs::from_epsg(32610).unwrap(), Crs::Utm { zone: 10 });
        assert_eq!(Crs::from_epsg(5070).unwrap(), Crs::ConusAlbers);
        assert!(Crs::from_epsg(3857).is_err());
        assert_eq!(Crs::Utm { zone: 17 }.to_string(), "EPSG:32617");
    }
}
