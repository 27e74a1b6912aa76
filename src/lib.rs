//! grdcal: thermal noise removal and radiometric calibration for Sentinel-1 GRD
//!
//! The noise and calibration annotation documents of a SAFE product describe
//! correction values on a sparse (line, pixel) anchor grid. This crate parses
//! them into lookup tables, interpolates the tables onto the full image grid
//! and applies
//!
//! - thermal noise removal: `max(DN^2 - noise, 0)`
//! - radiometric calibration: `power / calibration^2`
//!
//! band by band, for VV, VH, HH and HV.
//!
//! ```no_run
//! use grdcal::{
//!     remove_thermal_noise, radiometric_calibration, read_calibration_luts, read_noise_luts,
//!     AxisLabel, ImageDataset, LabeledRaster, Polarization, RepresentationType, SafeProduct,
//! };
//! use ndarray::Array2;
//!
//! # fn main() -> grdcal::SarResult<()> {
//! let product = SafeProduct::open("S1A_IW_GRDH_1SDV_20200103T170816.SAFE")?;
//! let noise = read_noise_luts(&product)?;
//! let sigma0 = read_calibration_luts(&product, RepresentationType::SigmaNought)?;
//!
//! // Rasters come from any GeoTIFF reader (or `io::measurement` with the `gdal` feature)
//! let dn: Array2<f32> = Array2::zeros((16_000, 25_000));
//! let mut image = ImageDataset::new();
//! image.insert(Polarization::VV, LabeledRaster::new(dn, [AxisLabel::Y, AxisLabel::X]))?;
//!
//! let denoised = remove_thermal_noise(&image, &noise)?;
//! let calibrated = radiometric_calibration(&denoised.into_image_dataset()?, &sigma0)?;
//! # let _ = calibrated;
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    resolve_polarization, AxisLabel, ImageDataset, LabeledRaster, Polarization, SarError,
    SarReal, SarRealImage, SarResult,
};

pub use io::{
    find_measurement_files, parse_radiometric_calibration_lut, parse_thermal_noise_removal_lut,
    read_calibration_luts, read_noise_luts, SafeProduct,
};

pub use core::{
    apply_correction, interpolate_to_grid, radiometric_calibration, remove_thermal_noise,
    CalibrationParams, CalibrationPipeline, CorrectedDataset, CorrectionType, GridInterpolator,
    LutDataset, LutKind, RepresentationType, SparseLut,
};

#[cfg(feature = "gdal")]
pub use core::pipeline::process_product;
#[cfg(feature = "gdal")]
pub use io::load_measurements;
