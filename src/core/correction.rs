use crate::core::interpolate::{align_axes, interpolate_to_grid};
use crate::core::lut::{LutDataset, LutKind, SparseLut};
use crate::types::{
    AxisLabel, ImageDataset, LabeledRaster, Polarization, SarError, SarReal, SarRealImage,
    SarResult,
};
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Floor used for zero or negative power when converting to dB
pub const DB_FLOOR: SarReal = -50.0;

/// Pixel-wise corrections applied with an interpolated lookup table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    /// `max(intensity^2 - noise, 0)`
    ThermalNoiseRemoval,
    /// `intensity / calibration^2`, on already noise-removed power
    RadiometricCalibration,
}

impl CorrectionType {
    /// Apply the formula to one pixel
    #[inline]
    pub fn apply(&self, intensity: SarReal, correction: SarReal) -> SarReal {
        match self {
            CorrectionType::ThermalNoiseRemoval => thermal_noise_formula(intensity, correction),
            CorrectionType::RadiometricCalibration => calibration_formula(intensity, correction),
        }
    }

    /// Whether lookup tables of `kind` feed this correction
    pub fn accepts(&self, kind: LutKind) -> bool {
        matches!(
            (self, kind),
            (CorrectionType::ThermalNoiseRemoval, LutKind::Noise)
                | (CorrectionType::RadiometricCalibration, LutKind::Calibration(_))
        )
    }
}

impl std::fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrectionType::ThermalNoiseRemoval => write!(f, "thermal noise removal"),
            CorrectionType::RadiometricCalibration => write!(f, "radiometric calibration"),
        }
    }
}

/// Squared intensity minus the noise floor; negative power is clamped to zero
#[inline]
pub fn thermal_noise_formula(intensity: SarReal, noise: SarReal) -> SarReal {
    let power = intensity * intensity - noise;
    if power > 0.0 {
        power
    } else {
        0.0
    }
}

/// Noise-removed power divided by the squared calibration factor
#[inline]
pub fn calibration_formula(power: SarReal, calibration: SarReal) -> SarReal {
    power / (calibration * calibration)
}

/// Corrected bands of one product
#[derive(Debug, Clone)]
pub struct CorrectedDataset {
    correction: CorrectionType,
    bands: HashMap<Polarization, LabeledRaster>,
    decibel: bool,
}

impl CorrectedDataset {
    pub fn correction(&self) -> CorrectionType {
        self.correction
    }

    /// Corrected raster with its axis labels
    pub fn get(&self, pol: Polarization) -> Option<&LabeledRaster> {
        self.bands.get(&pol)
    }

    /// Corrected values of one band
    pub fn band(&self, pol: Polarization) -> Option<&SarRealImage> {
        self.bands.get(&pol).map(|raster| raster.data())
    }

    /// Bands present, in a stable order
    pub fn polarizations(&self) -> Vec<Polarization> {
        let mut pols: Vec<Polarization> = self.bands.keys().copied().collect();
        pols.sort();
        pols
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// True once values have been converted to decibels
    pub fn is_db(&self) -> bool {
        self.decibel
    }

    /// Convert every band from linear power to dB
    pub fn into_db(self) -> Self {
        let bands = self
            .bands
            .into_iter()
            .map(|(pol, raster)| {
                let axes = raster.axes();
                (pol, LabeledRaster::new(to_db(raster.data()), axes))
            })
            .collect();
        Self {
            correction: self.correction,
            bands,
            decibel: true,
        }
    }

    /// Reuse the corrected bands as input to a further correction
    pub fn into_image_dataset(self) -> SarResult<ImageDataset> {
        let mut image = ImageDataset::new();
        for (pol, raster) in self.bands {
            image.insert(pol, raster)?;
        }
        Ok(image)
    }
}

/// Convert linear power to dB
pub fn to_db(linear_data: &SarRealImage) -> SarRealImage {
    log::debug!("Converting to dB scale");

    linear_data.mapv(|x| if x > 0.0 { 10.0 * x.log10() } else { DB_FLOOR })
}

/// Apply `correction` to every band of `image` using the matching table in `luts`.
///
/// Every raster band needs a lookup table; tables for bands the image does not
/// carry are ignored. Any band failure fails the whole call.
pub fn apply_correction(
    correction: CorrectionType,
    image: &ImageDataset,
    luts: &LutDataset,
) -> SarResult<CorrectedDataset> {
    if !correction.accepts(luts.kind()) {
        return Err(SarError::InvalidOption(format!(
            "{} cannot use {} lookup tables",
            correction,
            luts.kind()
        )));
    }

    let mut jobs = Vec::with_capacity(image.len());
    for pol in image.polarizations() {
        let lut = luts.get(pol).ok_or(SarError::MissingBand(pol))?;
        if let Some(raster) = image.get(pol) {
            jobs.push((pol, raster, lut));
        }
    }

    log::info!("Applying {} to {} band(s)", correction, jobs.len());

    #[cfg(feature = "parallel")]
    let corrected: SarResult<Vec<(Polarization, LabeledRaster)>> = {
        use rayon::prelude::*;
        jobs.into_par_iter()
            .map(|(pol, raster, lut)| {
                correct_band(correction, pol, raster, lut).map(|band| (pol, band))
            })
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let corrected: SarResult<Vec<(Polarization, LabeledRaster)>> = jobs
        .into_iter()
        .map(|(pol, raster, lut)| correct_band(correction, pol, raster, lut).map(|band| (pol, band)))
        .collect();

    Ok(CorrectedDataset {
        correction,
        bands: corrected?.into_iter().collect(),
        decibel: false,
    })
}

/// Remove thermal noise from every band
pub fn remove_thermal_noise(image: &ImageDataset, noise_luts: &LutDataset) -> SarResult<CorrectedDataset> {
    let result = apply_correction(CorrectionType::ThermalNoiseRemoval, image, noise_luts)?;
    log::info!("Thermal noise removed for bands {:?}", result.polarizations());
    Ok(result)
}

/// Calibrate noise-removed power of every band
pub fn radiometric_calibration(
    image: &ImageDataset,
    calibration_luts: &LutDataset,
) -> SarResult<CorrectedDataset> {
    let result = apply_correction(CorrectionType::RadiometricCalibration, image, calibration_luts)?;
    log::info!("Radiometric calibration completed for bands {:?}", result.polarizations());
    Ok(result)
}

fn correct_band(
    correction: CorrectionType,
    pol: Polarization,
    raster: &LabeledRaster,
    lut: &SparseLut,
) -> SarResult<LabeledRaster> {
    let aligned = align_axes(raster)?;
    let grid = interpolate_to_grid(lut, aligned.dim());
    log::debug!("{}: {} on {}x{} pixels", pol, correction, grid.nrows(), grid.ncols());

    if correction == CorrectionType::RadiometricCalibration {
        check_calibration_grid(pol, &grid)?;
    }

    #[cfg(feature = "parallel")]
    let corrected = Zip::from(&aligned)
        .and(&grid)
        .par_map_collect(|&intensity, &value| correction.apply(intensity, value));
    #[cfg(not(feature = "parallel"))]
    let corrected = Zip::from(&aligned)
        .and(&grid)
        .map_collect(|&intensity, &value| correction.apply(intensity, value));

    // Hand the band back in the caller's axis order, with LUT axis names
    let [first, second] = raster.axes();
    let data = if first.canonical() == AxisLabel::Line {
        corrected
    } else {
        corrected.reversed_axes().as_standard_layout().into_owned()
    };
    Ok(LabeledRaster::new(data, [first.canonical(), second.canonical()]))
}

/// Reject calibration factors whose square is zero or not finite
fn check_calibration_grid(pol: Polarization, grid: &SarRealImage) -> SarResult<()> {
    let bad = grid.indexed_iter().find(|&(_, &value)| {
        let squared = value * value;
        squared == 0.0 || !squared.is_finite()
    });

    match bad {
        Some(((line, pixel), &value)) => Err(SarError::InvalidCalibration {
            band: pol,
            line,
            pixel,
            value,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lut::RepresentationType;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn flat_lut(kind: LutKind, value: f32) -> LutDataset {
        let lut = SparseLut::new(vec![0, 1], vec![0, 1], SarRealImage::from_elem((2, 2), value))
            .unwrap();
        let mut luts = LutDataset::new(kind);
        luts.insert(Polarization::VV, lut).unwrap();
        luts
    }

    fn vv_image(data: SarRealImage) -> ImageDataset {
        let mut image = ImageDataset::new();
        image
            .insert(Polarization::VV, LabeledRaster::new(data, [AxisLabel::Y, AxisLabel::X]))
            .unwrap();
        image
    }

    #[test]
    fn test_formulas() {
        assert_eq!(CorrectionType::ThermalNoiseRemoval.apply(4.0, 1.0), 15.0);
        assert_eq!(CorrectionType::ThermalNoiseRemoval.apply(1.0, 5.0), 0.0);
        assert_eq!(CorrectionType::RadiometricCalibration.apply(15.0, 2.0), 3.75);
    }

    #[test]
    fn test_noise_then_calibration() {
        let image = vv_image(array![[2.0, 4.0], [6.0, 8.0]]);

        let denoised = remove_thermal_noise(&image, &flat_lut(LutKind::Noise, 1.0)).unwrap();
        let vv = denoised.get(Polarization::VV).unwrap();
        assert_eq!(vv.data(), &array![[3.0, 15.0], [35.0, 63.0]]);
        assert_eq!(vv.axes(), [AxisLabel::Line, AxisLabel::Pixel]);

        let calibration = flat_lut(LutKind::Calibration(RepresentationType::SigmaNought), 2.0);
        let calibrated =
            radiometric_calibration(&denoised.into_image_dataset().unwrap(), &calibration).unwrap();
        assert_eq!(
            calibrated.band(Polarization::VV).unwrap(),
            &array![[0.75, 3.75], [8.75, 15.75]]
        );
        assert_eq!(calibrated.correction(), CorrectionType::RadiometricCalibration);
    }

    #[test]
    fn test_transposed_raster_keeps_its_layout() {
        let mut image = ImageDataset::new();
        image
            .insert(
                Polarization::VV,
                LabeledRaster::new(array![[2.0, 4.0, 6.0]].reversed_axes(), [AxisLabel::X, AxisLabel::Y]),
            )
            .unwrap();
        // Noise grows along pixels: 0, 1, 2
        let lut = SparseLut::new(vec![0], vec![0, 1], array![[0.0, 1.0]]).unwrap();
        let mut luts = LutDataset::new(LutKind::Noise);
        luts.insert(Polarization::VV, lut).unwrap();

        let result = remove_thermal_noise(&image, &luts).unwrap();
        let vv = result.get(Polarization::VV).unwrap();
        assert_eq!(vv.axes(), [AxisLabel::Pixel, AxisLabel::Line]);
        assert_eq!(vv.data(), &array![[4.0], [15.0], [34.0]]);
    }

    #[test]
    fn test_missing_lut_band_fails() {
        let mut image = vv_image(SarRealImage::ones((2, 2)));
        image
            .insert(Polarization::VH, LabeledRaster::line_pixel(SarRealImage::ones((2, 2))))
            .unwrap();

        let result = remove_thermal_noise(&image, &flat_lut(LutKind::Noise, 1.0));
        assert!(matches!(result, Err(SarError::MissingBand(Polarization::VH))));
    }

    #[test]
    fn test_extra_lut_bands_are_ignored() {
        let mut luts = flat_lut(LutKind::Noise, 0.5);
        let hh = SparseLut::new(vec![0], vec![0], array![[1.0]]).unwrap();
        luts.insert(Polarization::HH, hh).unwrap();

        let result = remove_thermal_noise(&vv_image(SarRealImage::ones((3, 3))), &luts).unwrap();
        assert_eq!(result.polarizations(), vec![Polarization::VV]);
    }

    #[test]
    fn test_zero_calibration_is_reported() {
        let calibration = flat_lut(LutKind::Calibration(RepresentationType::Gamma), 0.0);
        let result = radiometric_calibration(&vv_image(SarRealImage::ones((2, 2))), &calibration);
        match result {
            Err(SarError::InvalidCalibration { band, line, pixel, .. }) => {
                assert_eq!((band, line, pixel), (Polarization::VV, 0, 0));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_lut_kind_is_rejected() {
        let result = radiometric_calibration(&vv_image(SarRealImage::ones((2, 2))), &flat_lut(LutKind::Noise, 1.0));
        assert!(matches!(result, Err(SarError::InvalidOption(_))));
    }

    #[test]
    fn test_db_conversion() {
        let db = to_db(&array![[100.0, 0.0], [-1.0, 1.0]]);
        assert_abs_diff_eq!(db[[0, 0]], 20.0, epsilon = 1e-6);
        assert_eq!(db[[0, 1]], DB_FLOOR);
        assert_eq!(db[[1, 0]], DB_FLOOR);
        assert_abs_diff_eq!(db[[1, 1]], 0.0, epsilon = 1e-6);
    }
}
