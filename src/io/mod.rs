//! I/O modules for reading SAFE products and their annotation documents

pub mod safe;
pub mod lut_reader;
pub mod measurement;

pub use safe::SafeProduct;
pub use lut_reader::{
    parse_radiometric_calibration_lut, parse_thermal_noise_removal_lut, read_calibration_luts,
    read_noise_luts,
};
pub use measurement::find_measurement_files;
#[cfg(feature = "gdal")]
pub use measurement::load_measurements;
