use crate::core::correction::{radiometric_calibration, remove_thermal_noise, CorrectedDataset};
use crate::core::lut::{LutDataset, LutKind, RepresentationType};
use crate::io::lut_reader::{read_calibration_luts, read_noise_luts};
use crate::io::safe::SafeProduct;
use crate::types::{ImageDataset, LabeledRaster, SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Calibration pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalibrationParams {
    /// Backscatter quantity to calibrate to
    pub representation: RepresentationType,
    /// Subtract the thermal noise floor before calibrating
    pub remove_thermal_noise: bool,
    /// Convert the calibrated power to dB
    pub output_db: bool,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            representation: RepresentationType::SigmaNought,
            remove_thermal_noise: true,
            output_db: false,
        }
    }
}

/// Noise removal, radiometric calibration and optional dB conversion over
/// every band of a product, with LUTs loaded once
#[derive(Debug, Clone)]
pub struct CalibrationPipeline {
    params: CalibrationParams,
    noise_luts: Option<LutDataset>,
    calibration_luts: LutDataset,
}

impl CalibrationPipeline {
    /// Create a pipeline from already-parsed LUTs
    pub fn new(
        params: CalibrationParams,
        noise_luts: Option<LutDataset>,
        calibration_luts: LutDataset,
    ) -> SarResult<Self> {
        let expected = LutKind::Calibration(params.representation);
        if calibration_luts.kind() != expected {
            return Err(SarError::InvalidOption(format!(
                "Pipeline configured for {} but given {} lookup tables",
                expected,
                calibration_luts.kind()
            )));
        }

        let noise_luts = if params.remove_thermal_noise {
            match noise_luts {
                Some(luts) if luts.kind() == LutKind::Noise => Some(luts),
                Some(luts) => {
                    return Err(SarError::InvalidOption(format!(
                        "Thermal noise removal needs noise lookup tables, got {}",
                        luts.kind()
                    )))
                }
                None => {
                    return Err(SarError::InvalidOption(
                        "Thermal noise removal enabled without noise lookup tables".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            params,
            noise_luts,
            calibration_luts,
        })
    }

    /// Load the LUTs the parameters ask for from a product
    pub fn from_product(product: &SafeProduct, params: CalibrationParams) -> SarResult<Self> {
        log::info!("Preparing calibration pipeline: {:?}", params);

        let calibration_luts = read_calibration_luts(product, params.representation)?;
        let noise_luts = if params.remove_thermal_noise {
            Some(read_noise_luts(product)?)
        } else {
            None
        };

        Self::new(params, noise_luts, calibration_luts)
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Calibrate every band of `image` (raw amplitude digital numbers)
    pub fn run(&self, image: &ImageDataset) -> SarResult<CorrectedDataset> {
        let power = match &self.noise_luts {
            Some(noise_luts) => remove_thermal_noise(image, noise_luts)?.into_image_dataset()?,
            None => amplitude_to_power(image)?,
        };

        let calibrated = radiometric_calibration(&power, &self.calibration_luts)?;

        if self.params.output_db {
            Ok(calibrated.into_db())
        } else {
            Ok(calibrated)
        }
    }
}

/// Square amplitudes so calibration sees power, as noise removal would produce
fn amplitude_to_power(image: &ImageDataset) -> SarResult<ImageDataset> {
    let mut power = ImageDataset::new();
    for (&pol, raster) in image.iter() {
        let squared = raster.data().mapv(|dn| dn * dn);
        power.insert(pol, LabeledRaster::new(squared, raster.axes()))?;
    }
    Ok(power)
}

/// Calibrate a product end to end, reading its measurement rasters with GDAL
#[cfg(feature = "gdal")]
pub fn process_product<P: AsRef<std::path::Path>>(
    safe_path: P,
    params: CalibrationParams,
) -> SarResult<CorrectedDataset> {
    let product = SafeProduct::open(safe_path)?;
    let pipeline = CalibrationPipeline::from_product(&product, params)?;
    let image = crate::io::measurement::load_measurements(&product)?;
    pipeline.run(&image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lut::SparseLut;
    use crate::types::{AxisLabel, Polarization, SarRealImage};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn flat(kind: LutKind, value: f32) -> LutDataset {
        let mut luts = LutDataset::new(kind);
        let lut = SparseLut::new(vec![0, 1], vec![0, 1], SarRealImage::from_elem((2, 2), value)).unwrap();
        luts.insert(Polarization::VV, lut).unwrap();
        luts
    }

    fn image() -> ImageDataset {
        let mut image = ImageDataset::new();
        image
            .insert(
                Polarization::VV,
                LabeledRaster::new(array![[2.0, 4.0], [6.0, 8.0]], [AxisLabel::Y, AxisLabel::X]),
            )
            .unwrap();
        image
    }

    #[test]
    fn test_params_defaults() {
        let params = CalibrationParams::default();
        assert_eq!(params.representation, RepresentationType::SigmaNought);
        assert!(params.remove_thermal_noise);
        assert!(!params.output_db);
    }

    #[test]
    fn test_run_with_noise_removal() {
        let pipeline = CalibrationPipeline::new(
            CalibrationParams::default(),
            Some(flat(LutKind::Noise, 1.0)),
            flat(LutKind::Calibration(RepresentationType::SigmaNought), 2.0),
        )
        .unwrap();

        let result = pipeline.run(&image()).unwrap();
        assert_eq!(result.band(Polarization::VV).unwrap(), &array![[0.75, 3.75], [8.75, 15.75]]);
    }

    #[test]
    fn test_run_without_noise_removal_in_db() {
        let params = CalibrationParams {
            representation: RepresentationType::BetaNought,
            remove_thermal_noise: false,
            output_db: true,
        };
        let pipeline = CalibrationPipeline::new(
            params,
            None,
            flat(LutKind::Calibration(RepresentationType::BetaNought), 0.2),
        )
        .unwrap();

        // 2^2 / 0.2^2 = 100 -> 20 dB
        let result = pipeline.run(&image()).unwrap();
        assert!(result.is_db());
        assert_abs_diff_eq!(result.band(Polarization::VV).unwrap()[[0, 0]], 20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_mismatched_luts_are_rejected() {
        let result = CalibrationPipeline::new(
            CalibrationParams::default(),
            Some(flat(LutKind::Noise, 1.0)),
            flat(LutKind::Calibration(RepresentationType::Gamma), 2.0),
        );
        assert!(matches!(result, Err(SarError::InvalidOption(_))));

        let result = CalibrationPipeline::new(
            CalibrationParams::default(),
            None,
            flat(LutKind::Calibration(RepresentationType::SigmaNought), 2.0),
        );
        assert!(matches!(result, Err(SarError::InvalidOption(_))));
    }
}
