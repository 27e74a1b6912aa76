//! Measurement rasters of a SAFE product
//!
//! Discovery works on any product; reading the GeoTIFFs needs the `gdal`
//! feature.

use crate::io::safe::{SafeProduct, MEASUREMENT_DIR};
use crate::types::{resolve_polarization, Polarization, SarError, SarResult};

#[cfg(feature = "gdal")]
use crate::types::{AxisLabel, ImageDataset, LabeledRaster};
#[cfg(feature = "gdal")]
use ndarray::Array2;
#[cfg(feature = "gdal")]
use std::path::Path;
#[cfg(feature = "gdal")]
use tempfile::NamedTempFile;

/// GeoTIFF files of the `measurement` folder with the band each one holds
pub fn find_measurement_files(product: &SafeProduct) -> SarResult<Vec<(Polarization, String)>> {
    let names = product.list_dir(MEASUREMENT_DIR)?.ok_or_else(|| {
        SarError::NotFound(format!(
            "'{}' folder not found inside {}",
            MEASUREMENT_DIR,
            product.path().display()
        ))
    })?;

    let tiff_files: Vec<String> = names
        .into_iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            lowered.ends_with(".tiff") || lowered.ends_with(".tif")
        })
        .collect();

    if tiff_files.is_empty() {
        return Err(SarError::NotFound(format!(
            "No GeoTIFF files found in '{}' folder",
            MEASUREMENT_DIR
        )));
    }

    tiff_files
        .into_iter()
        .map(|name| Ok((resolve_polarization(&name)?, name)))
        .collect()
}

/// Load every measurement GeoTIFF of a product as one band per polarization.
///
/// Bands are labelled `(y, x)` as they come out of the raster.
#[cfg(feature = "gdal")]
pub fn load_measurements(product: &SafeProduct) -> SarResult<ImageDataset> {
    let mut image = ImageDataset::new();
    for (pol, name) in find_measurement_files(product)? {
        log::info!("Reading {} band from {}", pol, name);
        image.insert(pol, read_measurement(product, &name)?)?;
    }

    log::info!("Loaded measurement bands {:?}", image.polarizations());
    Ok(image)
}

#[cfg(feature = "gdal")]
fn read_measurement(product: &SafeProduct, name: &str) -> SarResult<LabeledRaster> {
    if let Some(path) = product.local_path(MEASUREMENT_DIR, name) {
        return read_geotiff(&path);
    }

    // GDAL needs a real file; extract the archive member first
    let start_time = std::time::Instant::now();
    let mut temp_file = NamedTempFile::new()?;
    let bytes = product.copy_to(MEASUREMENT_DIR, name, &mut temp_file)?;
    log::debug!("Extracted {} ({} bytes) in {:?}", name, bytes, start_time.elapsed());

    read_geotiff(temp_file.path())
}

#[cfg(feature = "gdal")]
fn read_geotiff(path: &Path) -> SarResult<LabeledRaster> {
    let start_time = std::time::Instant::now();
    let dataset = gdal::Dataset::open(path)?;

    let (width, height) = dataset.raster_size();
    let band_count = dataset.raster_count();
    log::debug!("TIFF dimensions: {} x {}, bands: {}", width, height, band_count);

    if band_count < 1 {
        return Err(SarError::InvalidFormat(format!(
            "No raster band in {}",
            path.display()
        )));
    }

    let band = dataset.rasterband(1)?;
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let data = Array2::from_shape_vec((height, width), buffer.data)
        .map_err(|e| SarError::ShapeMismatch(format!("Shape error: {}", e)))?;

    log::debug!("GDAL read took: {:?}", start_time.elapsed());
    Ok(LabeledRaster::new(data, [AxisLabel::Y, AxisLabel::X]))
}
