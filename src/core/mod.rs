//! Core calibration modules

pub mod lut;
pub mod interpolate;
pub mod correction;
pub mod pipeline;

// Re-export main types
pub use lut::{LutDataset, LutKind, LutVector, RepresentationType, SparseLut};
pub use interpolate::{align_axes, interpolate_to_grid, GridInterpolator};
pub use correction::{
    apply_correction, radiometric_calibration, remove_thermal_noise, to_db, CorrectedDataset,
    CorrectionType,
};
pub use pipeline::{CalibrationParams, CalibrationPipeline};
