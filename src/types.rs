use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Real-valued intensity, noise or calibration sample
pub type SarReal = f32;

/// 2D real SAR data array (line x pixel)
pub type SarRealImage = Array2<SarReal>;

/// Polarization modes for Sentinel-1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HH,
    HV,
}

impl Polarization {
    /// Candidates in the order they are tried when resolving a source name.
    /// A name containing several polarization substrings resolves to the first
    /// one listed here.
    pub const PRIORITY: [Polarization; 4] = [
        Polarization::VV,
        Polarization::VH,
        Polarization::HH,
        Polarization::HV,
    ];

    /// Lowercase token searched for in file and document names
    pub fn token(&self) -> &'static str {
        match self {
            Polarization::VV => "vv",
            Polarization::VH => "vh",
            Polarization::HH => "hh",
            Polarization::HV => "hv",
        }
    }

    /// Resolve the polarization of a file or document name.
    ///
    /// Matching is a case-insensitive substring search over [`Self::PRIORITY`];
    /// the first candidate found wins. Returns `None` when no candidate occurs
    /// in the name.
    pub fn from_source_name(name: &str) -> Option<Polarization> {
        let lowered = name.to_lowercase();
        Self::PRIORITY
            .iter()
            .copied()
            .find(|pol| lowered.contains(pol.token()))
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HH => write!(f, "HH"),
            Polarization::HV => write!(f, "HV"),
        }
    }
}

impl std::str::FromStr for Polarization {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HH" => Ok(Polarization::HH),
            "HV" => Ok(Polarization::HV),
            _ => Err(SarError::InvalidOption(format!("Invalid polarization: {}", s))),
        }
    }
}

/// Name of one raster dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisLabel {
    Line,
    Pixel,
    /// Row axis of a georeferenced raster; same direction as `Line`
    Y,
    /// Column axis of a georeferenced raster; same direction as `Pixel`
    X,
}

impl AxisLabel {
    /// Map raster naming onto lookup-table naming
    pub fn canonical(&self) -> AxisLabel {
        match self {
            AxisLabel::Y => AxisLabel::Line,
            AxisLabel::X => AxisLabel::Pixel,
            other => *other,
        }
    }
}

/// A 2D band together with the names of its two axes
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRaster {
    data: SarRealImage,
    axes: [AxisLabel; 2],
}

impl LabeledRaster {
    pub fn new(data: SarRealImage, axes: [AxisLabel; 2]) -> Self {
        Self { data, axes }
    }

    /// Raster already laid out as (line, pixel)
    pub fn line_pixel(data: SarRealImage) -> Self {
        Self::new(data, [AxisLabel::Line, AxisLabel::Pixel])
    }

    /// Convert samples of any numeric type (e.g. u16 digital numbers)
    pub fn from_samples<T>(samples: &Array2<T>, axes: [AxisLabel; 2]) -> SarResult<Self>
    where
        T: num_traits::ToPrimitive + Copy,
    {
        let converted: Array2<Option<SarReal>> = samples.mapv(|sample| sample.to_f32());
        if let Some(((i, j), _)) = converted.indexed_iter().find(|(_, value)| value.is_none()) {
            return Err(SarError::InvalidFormat(format!(
                "Sample at ({}, {}) is not representable as f32",
                i, j
            )));
        }
        Ok(Self::new(converted.mapv(|value| value.unwrap_or_default()), axes))
    }

    pub fn data(&self) -> &SarRealImage {
        &self.data
    }

    pub fn axes(&self) -> [AxisLabel; 2] {
        self.axes
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Intensity bands of one product, keyed by polarization
#[derive(Debug, Clone, Default)]
pub struct ImageDataset {
    bands: HashMap<Polarization, LabeledRaster>,
}

impl ImageDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a band; each polarization may only appear once
    pub fn insert(&mut self, pol: Polarization, raster: LabeledRaster) -> SarResult<()> {
        if self.bands.contains_key(&pol) {
            return Err(SarError::InvalidFormat(format!(
                "More than one raster for band {}",
                pol
            )));
        }
        self.bands.insert(pol, raster);
        Ok(())
    }

    pub fn get(&self, pol: Polarization) -> Option<&LabeledRaster> {
        self.bands.get(&pol)
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

    pub fn iter(&self) -> impl Iterator<Item = (&Polarization, &LabeledRaster)> {
        self.bands.iter()
    }
}

/// Resolve a source name to its polarization, failing when none is present
pub fn resolve_polarization(name: &str) -> SarResult<Polarization> {
    Polarization::from_source_name(name)
        .ok_or_else(|| SarError::UnresolvedBand(name.to_string()))
}

/// Error types for SAR processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Polarization not identified in name: {0}")]
    UnresolvedBand(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("No lookup table for band {0}")]
    MissingBand(Polarization),

    #[error("Invalid calibration value {value} for band {band} at line {line}, pixel {pixel}")]
    InvalidCalibration {
        band: Polarization,
        line: usize,
        pixel: usize,
        value: SarReal,
    },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
