use crate::core::lut::SparseLut;
use crate::types::{AxisLabel, LabeledRaster, SarError, SarReal, SarRealImage, SarResult};
use ndarray::{Array2, ArrayView2, Zip};

/// Bracketing anchor pair and linear weight for one target coordinate.
///
/// `weight` may fall outside `[0, 1]`; the segment slope is then carried past
/// the first or last anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisWeight {
    lower: usize,
    upper: usize,
    weight: f64,
}

impl AxisWeight {
    fn locate(anchors: &[i64], target: f64) -> Self {
        if anchors.len() < 2 {
            return Self {
                lower: 0,
                upper: 0,
                weight: 0.0,
            };
        }

        // Segment whose lower anchor is the last one <= target, kept inside the
        // anchor list so edges reuse the outermost segment
        let above = anchors.partition_point(|&a| (a as f64) <= target);
        let lower = above.saturating_sub(1).min(anchors.len() - 2);
        let upper = lower + 1;

        let a0 = anchors[lower] as f64;
        let a1 = anchors[upper] as f64;
        Self {
            lower,
            upper,
            weight: (target - a0) / (a1 - a0),
        }
    }

    #[inline]
    fn blend(&self, v0: f64, v1: f64) -> f64 {
        // (1 - w) * v0 + w * v1 reproduces v0 at w == 0 and v1 at w == 1 exactly
        (1.0 - self.weight) * v0 + self.weight * v1
    }
}

/// Resamples a sparse lookup table onto a dense image grid.
///
/// Bilinear inside the anchor extent, linear extrapolation outside it. An axis
/// with a single anchor is constant along that axis.
pub struct GridInterpolator<'a> {
    lut: &'a SparseLut,
}

impl<'a> GridInterpolator<'a> {
    pub fn new(lut: &'a SparseLut) -> Self {
        Self { lut }
    }

    /// Interpolated value at a fractional (line, pixel) coordinate
    pub fn value_at(&self, line: f64, pixel: f64) -> SarReal {
        let values = self.lut.values();
        let lw = AxisWeight::locate(self.lut.lines(), line);
        let pw = AxisWeight::locate(self.lut.pixels(), pixel);

        let row = |i: usize| pw.blend(values[[i, pw.lower]] as f64, values[[i, pw.upper]] as f64);
        lw.blend(row(lw.lower), row(lw.upper)) as SarReal
    }

    /// Value for every (line, pixel) of a `height x width` image
    pub fn to_grid(&self, shape: (usize, usize)) -> SarRealImage {
        let (height, width) = shape;
        log::debug!(
            "Interpolating {}x{} LUT onto {}x{} grid",
            self.lut.dim().0,
            self.lut.dim().1,
            height,
            width
        );

        let line_weights: Vec<AxisWeight> = (0..height)
            .map(|i| AxisWeight::locate(self.lut.lines(), i as f64))
            .collect();
        let pixel_weights: Vec<AxisWeight> = (0..width)
            .map(|j| AxisWeight::locate(self.lut.pixels(), j as f64))
            .collect();

        // Resample every LUT row along pixels once, then blend rows per line
        let values = self.lut.values();
        let rows = Array2::from_shape_fn((values.nrows(), width), |(i, j)| {
            let pw = &pixel_weights[j];
            pw.blend(values[[i, pw.lower]] as f64, values[[i, pw.upper]] as f64)
        });

        let mut grid = SarRealImage::zeros((height, width));
        let fill = |(i, j): (usize, usize), out: &mut SarReal| {
            let lw = &line_weights[i];
            *out = lw.blend(rows[[lw.lower, j]], rows[[lw.upper, j]]) as SarReal;
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(&mut grid).par_for_each(fill);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(&mut grid).for_each(fill);

        grid
    }
}

/// Interpolate `lut` onto a dense `height x width` grid
pub fn interpolate_to_grid(lut: &SparseLut, shape: (usize, usize)) -> SarRealImage {
    GridInterpolator::new(lut).to_grid(shape)
}

/// View a raster in (line, pixel) order.
///
/// `y`/`x` labels are renamed to `line`/`pixel`; a raster stored as
/// (pixel, line) is transposed. Anything else cannot be matched to a LUT.
pub fn align_axes(raster: &LabeledRaster) -> SarResult<ArrayView2<'_, SarReal>> {
    let [first, second] = raster.axes();
    match (first.canonical(), second.canonical()) {
        (AxisLabel::Line, AxisLabel::Pixel) => Ok(raster.data().view()),
        (AxisLabel::Pixel, AxisLabel::Line) => Ok(raster.data().view().reversed_axes()),
        _ => Err(SarError::ShapeMismatch(format!(
            "Raster axes ({:?}, {:?}) cannot be aligned to (line, pixel)",
            first, second
        ))),
    }
}
