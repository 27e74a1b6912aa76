use crate::types::{Polarization, SarError, SarReal, SarResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Calibration quantity extracted from a calibration vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepresentationType {
    /// Radar cross section per unit ground area
    #[default]
    SigmaNought,
    /// Radar brightness
    BetaNought,
    /// Backscatter normalised by the incidence plane
    Gamma,
}

impl RepresentationType {
    pub const SUPPORTED: [RepresentationType; 3] = [
        RepresentationType::SigmaNought,
        RepresentationType::BetaNought,
        RepresentationType::Gamma,
    ];

    /// Element name carrying this representation inside a `calibrationVector`
    pub fn xml_tag(&self) -> &'static str {
        match self {
            RepresentationType::SigmaNought => "sigmaNought",
            RepresentationType::BetaNought => "betaNought",
            RepresentationType::Gamma => "gamma",
        }
    }
}

impl std::fmt::Display for RepresentationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.xml_tag())
    }
}

impl std::str::FromStr for RepresentationType {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .iter()
            .copied()
            .find(|repr| repr.xml_tag() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::SUPPORTED.iter().map(|r| r.xml_tag()).collect();
                SarError::InvalidOption(format!(
                    "representation_type {} is not supported. Supported types are {:?}",
                    s, supported
                ))
            })
    }
}

/// Which correction a lookup table dataset feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LutKind {
    /// Thermal noise range vectors
    Noise,
    /// Radiometric calibration vectors for one representation
    Calibration(RepresentationType),
}

impl std::fmt::Display for LutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LutKind::Noise => write!(f, "thermal noise"),
            LutKind::Calibration(repr) => write!(f, "calibration ({})", repr),
        }
    }
}

/// One record of a calibration document: a line and its sampled values
#[derive(Debug, Clone, PartialEq)]
pub struct LutVector {
    pub line: i64,
    pub pixels: Vec<i64>,
    pub values: Vec<SarReal>,
}

/// Correction values sampled on an irregular `lines x pixels` anchor grid
#[derive(Debug, Clone, PartialEq)]
pub struct SparseLut {
    lines: Vec<i64>,
    pixels: Vec<i64>,
    values: Array2<SarReal>,
}

impl SparseLut {
    /// Build a LUT from already-gridded anchors.
    ///
    /// `values` must be `lines.len() x pixels.len()` and both coordinate
    /// sequences strictly ascending.
    pub fn new(lines: Vec<i64>, pixels: Vec<i64>, values: Array2<SarReal>) -> SarResult<Self> {
        if lines.is_empty() || pixels.is_empty() {
            return Err(SarError::ShapeMismatch(
                "Lookup table needs at least one line and one pixel".to_string(),
            ));
        }
        if values.dim() != (lines.len(), pixels.len()) {
            return Err(SarError::ShapeMismatch(format!(
                "Value matrix is {}x{} but anchors are {} lines x {} pixels",
                values.nrows(),
                values.ncols(),
                lines.len(),
                pixels.len()
            )));
        }
        check_strictly_ascending("line", &lines)?;
        check_strictly_ascending("pixel", &pixels)?;

        Ok(Self { lines, pixels, values })
    }

    /// Build a LUT from per-line records.
    ///
    /// Records are ordered by line. Every record must carry as many values as
    /// pixels, and all records must share one pixel coordinate set.
    pub fn from_vectors(mut vectors: Vec<LutVector>) -> SarResult<Self> {
        if vectors.is_empty() {
            return Err(SarError::ShapeMismatch(
                "No vectors to build a lookup table from".to_string(),
            ));
        }

        for vector in &vectors {
            if vector.pixels.len() != vector.values.len() {
                return Err(SarError::ShapeMismatch(format!(
                    "Vector at line {} has {} pixels but {} values",
                    vector.line,
                    vector.pixels.len(),
                    vector.values.len()
                )));
            }
        }

        vectors.sort_by_key(|v| v.line);

        let pixels = vectors[0].pixels.clone();
        if let Some(vector) = vectors.iter().find(|v| v.pixels != pixels) {
            return Err(SarError::ShapeMismatch(format!(
                "Vector at line {} uses a different pixel set than line {}",
                vector.line, vectors[0].line
            )));
        }

        let lines: Vec<i64> = vectors.iter().map(|v| v.line).collect();
        let flat: Vec<SarReal> = vectors.into_iter().flat_map(|v| v.values).collect();
        let values = Array2::from_shape_vec((lines.len(), pixels.len()), flat)
            .map_err(|e| SarError::ShapeMismatch(format!("Shape error: {}", e)))?;

        Self::new(lines, pixels, values)
    }

    pub fn lines(&self) -> &[i64] {
        &self.lines
    }

    pub fn pixels(&self) -> &[i64] {
        &self.pixels
    }

    pub fn values(&self) -> &Array2<SarReal> {
        &self.values
    }

    /// (number of lines, number of pixels)
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Stored value at an anchor coordinate, if it is one
    pub fn anchor_value(&self, line: i64, pixel: i64) -> Option<SarReal> {
        let i = self.lines.binary_search(&line).ok()?;
        let j = self.pixels.binary_search(&pixel).ok()?;
        Some(self.values[[i, j]])
    }
}

fn check_strictly_ascending(axis: &str, coords: &[i64]) -> SarResult<()> {
    match coords.windows(2).find(|w| w[0] >= w[1]) {
        Some(w) => Err(SarError::ShapeMismatch(format!(
            "{} coordinates must be strictly ascending ({} followed by {})",
            axis, w[0], w[1]
        ))),
        None => Ok(()),
    }
}

/// Lookup tables of one kind, keyed by polarization
#[derive(Debug, Clone)]
pub struct LutDataset {
    kind: LutKind,
    luts: HashMap<Polarization, SparseLut>,
}

impl LutDataset {
    pub fn new(kind: LutKind) -> Self {
        Self {
            kind,
            luts: HashMap::new(),
        }
    }

    pub fn kind(&self) -> LutKind {
        self.kind
    }

    /// Add the table for a band; a band can only be added once
    pub fn insert(&mut self, pol: Polarization, lut: SparseLut) -> SarResult<()> {
        if self.luts.contains_key(&pol) {
            return Err(SarError::InvalidFormat(format!(
                "More than one {} lookup table for band {}",
                self.kind, pol
            )));
        }
        self.luts.insert(pol, lut);
        Ok(())
    }

    pub fn get(&self, pol: Polarization) -> Option<&SparseLut> {
        self.luts.get(&pol)
    }

    /// Bands present, in a stable order
    pub fn polarizations(&self) -> Vec<Polarization> {
        let mut pols: Vec<Polarization> = self.luts.keys().copied().collect();
        pols.sort();
        pols
    }

    pub fn len(&self) -> usize {
        self.luts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Polarization, &SparseLut)> {
        self.luts.iter()
    }
}
