use crate::error::{ProcessingError, Result};
use crate::utils::projection::Crs;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const PROJ_COORD_TRANS: u16 = 3075;
const PROJ_STD_PARALLEL1: u16 = 3078;
const PROJ_STD_PARALLEL2: u16 = 3079;
const PROJ_NAT_ORIGIN_LONG: u16 = 3080;
const PROJ_NAT_ORIGIN_LAT: u16 = 3081;
const PROJ_FALSE_ORIGIN_LONG: u16 = 3084;
const PROJ_FALSE_ORIGIN_LAT: u16 = 3085;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;
const CT_ALBERS_EQUAL_AREA: u16 = 11;

/// Points sampled along each raster edge when bounding its WGS84 footprint
const EDGE_SAMPLES: usize = 21;

/// Pixel-to-model affine transform: `x = a*col + b*row + c`,
/// `y = d*col + e*row + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(ProcessingError::UnsupportedRaster(
                "incomplete ModelPixelScale/ModelTiepoint tags".to_string(),
            ));
        }
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Ok(Self {
            a: scale[0],
            b: 0.0,
            c: x - i * scale[0],
            d: 0.0,
            e: -scale[1],
            f: y + j * scale[1],
        })
    }

    pub fn from_matrix(matrix: &[f64]) -> Result<Self> {
        if matrix.len() < 16 {
            return Err(ProcessingError::UnsupportedRaster(
                "ModelTransformation tag must hold 16 values".to_string(),
            ));
        }
        Ok(Self {
            a: matrix[0],
            b: matrix[1],
            c: matrix[3],
            d: matrix[4],
            e: matrix[5],
            f: matrix[7],
        })
    }

    /// Model coordinate of a (fractional) pixel position
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Fractional pixel position of a model coordinate; `None` when the
    /// transform is singular.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let (dx, dy) = (x - self.c, y - self.f);
        Some((
            (self.e * dx - self.b * dy) / det,
            (self.a * dy - self.d * dx) / det,
        ))
    }
}

/// Single-band georeferenced raster held in memory as `f64`.
#[derive(Debug, Clone)]
pub struct GeoRaster {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    /// Pixel-centre offset: 0.5 for area rasters, 0 for point rasters
    pub center_offset: f64,
    pub nodata: Option<f64>,
    data: Vec<f64>,
}

impl GeoRaster {
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: Crs,
        data: Vec<f64>,
    ) -> Result<Self> {
        if data.len() != width * height {
            return Err(ProcessingError::UnsupportedRaster(format!(
                "expected {} pixels, found {} (multi-band rasters are not supported)",
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            transform,
            crs,
            center_offset: 0.5,
            nodata: None,
            data,
        })
    }

    pub fn value(&self, col: usize, row: usize) -> f64 {
        self.data[row * self.width + col]
    }

    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| nd == value)
    }

    /// WGS84 lon/lat of a pixel centre
    pub fn pixel_center_lon_lat(&self, col: usize, row: usize) -> (f64, f64) {
        let (x, y) = self.transform.apply(
            col as f64 + self.center_offset,
            row as f64 + self.center_offset,
        );
        self.crs.to_lon_lat(x, y)
    }

    /// Visit every valid pixel whose value passes `keep`, in row-major order,
    /// with its WGS84 centre.
    pub fn points<F>(&self, keep: F) -> Vec<(f64, f64, f64)>
    where
        F: Fn(f64) -> bool,
    {
        let mut points = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                let value = self.value(col, row);
                if self.is_nodata(value) || !keep(value) {
                    continue;
                }
                let (lon, lat) = self.pixel_center_lon_lat(col, row);
                points.push((lon, lat, value));
            }
        }
        points
    }

    /// WGS84 `(min_lon, min_lat, max_lon, max_lat)` of the raster footprint,
    /// sampled along its four edges.
    pub fn geographic_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let start = self.center_offset - 0.5;
        let (cols, rows) = (self.width as f64, self.height as f64);
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for step in 0..EDGE_SAMPLES {
            let t = step as f64 / (EDGE_SAMPLES - 1) as f64;
            let edges = [
                (start + t * cols, start),
                (start + t * cols, start + rows),
                (start, start + t * rows),
                (start + cols, start + t * rows),
            ];
            for (col, row) in edges {
                let (x, y) = self.transform.apply(col, row);
                let (lon, lat) = self.crs.to_lon_lat(x, y);
                if !lon.is_finite() || !lat.is_finite() {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (lon, lat, lon, lat),
                    Some((x0, y0, x1, y1)) => (x0.min(lon), y0.min(lat), x1.max(lon), y1.max(lat)),
                });
            }
        }
        bounds
    }

    /// Nearest-neighbour resample onto a north-up EPSG:4326 grid of square
    /// cells. The cell size spreads the footprint's geographic diagonal over
    /// the source diagonal in pixels. Cells outside the source hold its
    /// nodata value, or NaN when it has none.
    pub fn to_geographic_grid(&self) -> Result<GeoRaster> {
        let (min_lon, min_lat, max_lon, max_lat) = self.geographic_bounds().ok_or_else(|| {
            ProcessingError::UnsupportedRaster("raster footprint has no WGS84 coordinates".to_string())
        })?;
        let (span_lon, span_lat) = (max_lon - min_lon, max_lat - min_lat);
        let cell = span_lon.hypot(span_lat) / (self.width as f64).hypot(self.height as f64);
        if !(cell.is_finite() && cell > 0.0) {
            return Err(ProcessingError::UnsupportedRaster(format!(
                "cannot derive a WGS84 cell size from a {}x{} raster",
                self.width, self.height
            )));
        }

        let width = ((span_lon / cell + 0.5) as usize).max(1);
        let height = ((span_lat / cell + 0.5) as usize).max(1);
        let transform = GeoTransform {
            a: cell,
            b: 0.0,
            c: min_lon,
            d: 0.0,
            e: -cell,
            f: max_lat,
        };

        let mut data = vec![self.nodata.unwrap_or(f64::NAN); width * height];
        data.par_chunks_mut(width).enumerate().for_each(|(row, cells)| {
            for (col, value) in cells.iter_mut().enumerate() {
                let (lon, lat) = transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                if let Some(source) = self.nearest_value(lon, lat) {
                    *value = source;
                }
            }
        });

        debug!(
            "Resampled {}x{} {} raster onto a {}x{} WGS84 grid of {:.6} degrees",
            self.width, self.height, self.crs, width, height, cell
        );
        let mut grid = GeoRaster::new(width, height, transform, Crs::Geographic, data)?;
        grid.nodata = self.nodata;
        Ok(grid)
    }

    /// Value of the source pixel whose centre is closest to a WGS84 point
    fn nearest_value(&self, lon: f64, lat: f64) -> Option<f64> {
        let (x, y) = self.crs.from_lon_lat(lon, lat);
        let (col, row) = self.transform.invert(x, y)?;
        let col = (col + 0.5 - self.center_offset).floor();
        let row = (row + 0.5 - self.center_offset).floor();
        if !(col >= 0.0 && row >= 0.0 && col < self.width as f64 && row < self.height as f64) {
            return None;
        }
        Some(self.value(col as usize, row as usize))
    }
}

/// Reads single-band GeoTIFFs and their georeferencing.
pub struct RasterReader;

impl RasterReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> Result<GeoRaster> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;
        let (width, height) = decoder.dimensions()?;

        let transform = match decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
            Ok(matrix) => GeoTransform::from_matrix(&matrix)?,
            Err(_) => {
                let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag)?;
                let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag)?;
                GeoTransform::from_scale_and_tiepoint(&scale, &tiepoint)?
            }
        };

        let directory = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag)?;
        let double_params = decoder
            .get_tag_f64_vec(Tag::GeoDoubleParamsTag)
            .unwrap_or_default();
        let keys = GeoKeys::parse(&directory, &double_params)?;
        let crs = keys.crs()?;

        let nodata = decoder
            .get_tag_ascii_string(Tag::GdalNodata)
            .ok()
            .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok());

        let data = decoding_to_f64(decoder.read_image()?)?;

        let mut raster = GeoRaster::new(width as usize, height as usize, transform, crs, data)?;
        raster.nodata = nodata;
        if keys.pixel_is_point() {
            raster.center_offset = 0.0;
        }

        debug!(
            "Read {}x{} raster in {} from {}",
            width,
            height,
            crs,
            path.display()
        );
        Ok(raster)
    }
}

impl Default for RasterReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decoding_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    let data = match result {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(ProcessingError::UnsupportedRaster(
                "unsupported pixel format".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Decoded GeoKey directory. Only short-valued keys stored inline and
/// double-valued keys stored in GeoDoubleParams are kept.
#[derive(Debug, Default)]
pub struct GeoKeys {
    shorts: HashMap<u16, u16>,
    doubles: HashMap<u16, f64>,
}

impl GeoKeys {
    pub fn parse(directory: &[u16], double_params: &[f64]) -> Result<Self> {
        if directory.len() < 4 {
            return Err(ProcessingError::UnsupportedRaster(
                "GeoKey directory is truncated".to_string(),
            ));
        }

        let count = directory[3] as usize;
        let mut keys = Self::default();
        for entry in directory[4..].chunks_exact(4).take(count) {
            let (key, location, offset) = (entry[0], entry[1], entry[3]);
            match location {
                0 => {
                    keys.shorts.insert(key, offset);
                }
                loc if loc == Tag::GeoDoubleParamsTag.to_u16() => {
                    if let Some(value) = double_params.get(offset as usize) {
                        keys.doubles.insert(key, *value);
                    }
                }
                _ => {}
            }
        }
        Ok(keys)
    }

    pub fn pixel_is_point(&self) -> bool {
        self.shorts.get(&GT_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT)
    }

    pub fn crs(&self) -> Result<Crs> {
        let model_type = self.shorts.get(&GT_MODEL_TYPE).copied();
        match model_type {
            Some(MODEL_TYPE_GEOGRAPHIC) => {
                let code = self.shorts.get(&GEOGRAPHIC_TYPE).copied().unwrap_or(4326);
                if code == USER_DEFINED {
                    // User-defined geographic systems are close enough to WGS84 here
                    return Ok(Crs::Geographic);
                }
                Crs::from_epsg(u32::from(code))
            }
            Some(MODEL_TYPE_PROJECTED) => match self.shorts.get(&PROJECTED_CS_TYPE).copied() {
                Some(USER_DEFINED) | None => self.user_defined_projection(),
                Some(code) => Crs::from_epsg(u32::from(code)),
            },
            _ => Err(ProcessingError::UnsupportedRaster(format!(
                "unsupported GeoTIFF model type {:?}",
                model_type
            ))),
        }
    }

    /// CropScape rasters describe CONUS Albers inline instead of by EPSG code
    fn user_defined_projection(&self) -> Result<Crs> {
        if self.shorts.get(&PROJ_COORD_TRANS) != Some(&CT_ALBERS_EQUAL_AREA) {
            return Err(ProcessingError::UnsupportedRaster(
                "user-defined projection is not Albers equal-area".to_string(),
            ));
        }

        let param = |primary: u16, fallback: u16| {
            self.doubles
                .get(&primary)
                .or_else(|| self.doubles.get(&fallback))
                .copied()
        };
        let lat1 = self.doubles.get(&PROJ_STD_PARALLEL1).copied();
        let lat2 = self.doubles.get(&PROJ_STD_PARALLEL2).copied();
        let lon0 = param(PROJ_NAT_ORIGIN_LONG, PROJ_FALSE_ORIGIN_LONG);
        let lat0 = param(PROJ_NAT_ORIGIN_LAT, PROJ_FALSE_ORIGIN_LAT);

        let close = |value: Option<f64>, expected: f64| {
            value.is_some_and(|v| (v - expected).abs() < 1e-6)
        };
        if close(lat1, 29.5) && close(lat2, 45.5) && close(lon0, -96.0) && close(lat0, 23.0) {
            Ok(Crs::ConusAlbers)
        } else {
            Err(ProcessingError::UnsupportedRaster(format!(
                "Albers parameters {:?}/{:?} origin {:?},{:?} are not CONUS Albers",
                lat1, lat2, lat0, lon0
            )))
        }
    }
}
