//! Bilinear lookup over the precomputed remainder tables.
//!
//! Two row-major grids, keyed by `(M1, H_audio)`, replace substeps 1..N-1:
//! `M_end` (magnetization at the end of the sample) and `sumM_rest` (sum of
//! the intermediate magnetizations). The data is owned elsewhere; a
//! [`LutPair`] only borrows it.

use crate::error::{LutError, LutResult};
use crate::mode::Mode;
use crate::physics::BiasControls;

/// Grid dimensions and axis ranges of one LUT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutGrid {
    m_size: usize,
    h_size: usize,
    m_min: f64,
    m_max: f64,
    h_min: f64,
    h_max: f64,
}

impl LutGrid {
    /// Grid over the default `[-1, 1] x [-1, 1]` domain.
    pub fn new(m_size: usize, h_size: usize) -> LutResult<Self> {
        Self::with_ranges(m_size, h_size, (-1.0, 1.0), (-1.0, 1.0))
    }

    pub fn with_ranges(
        m_size: usize,
        h_size: usize,
        m_range: (f64, f64),
        h_range: (f64, f64),
    ) -> LutResult<Self> {
        if m_size < 2 || h_size < 2 {
            return Err(LutError::GridTooSmall { m_size, h_size });
        }
        for (min, max) in [m_range, h_range] {
            if !(min.is_finite() && max.is_finite() && max > min) {
                return Err(LutError::InvalidAxis { min, max });
            }
        }
        Ok(Self {
            m_size,
            h_size,
            m_min: m_range.0,
            m_max: m_range.1,
            h_min: h_range.0,
            h_max: h_range.1,
        })
    }

    pub fn m_size(&self) -> usize {
        self.m_size
    }

    pub fn h_size(&self) -> usize {
        self.h_size
    }

    /// Number of values each table must hold.
    pub fn cells(&self) -> usize {
        self.m_size * self.h_size
    }

    /// M coordinate of grid row `i`.
    pub fn m_at(&self, i: usize) -> f64 {
        self.m_min + (self.m_max - self.m_min) * i as f64 / (self.m_size - 1) as f64
    }

    /// H coordinate of grid column `j`.
    pub fn h_at(&self, j: usize) -> f64 {
        self.h_min + (self.h_max - self.h_min) * j as f64 / (self.h_size - 1) as f64
    }
}

/// Bilinear interpolation of `table` at `(m, h)`.
///
/// `None` yields 0.0. Coordinates outside the axis ranges saturate at the
/// table edge. `table` must hold `grid.cells()` values; [`LutPair::new`] checks
/// this when binding.
#[inline]
pub(crate) fn bilinear_lookup(table: Option<&[f64]>, grid: &LutGrid, m: f64, h: f64) -> f64 {
    let Some(lut) = table else {
        return 0.0;
    };
    debug_assert_eq!(lut.len(), grid.cells(), "table does not match grid");

    let m_norm = ((m - grid.m_min) / (grid.m_max - grid.m_min)).clamp(0.0, 1.0);
    let h_norm = ((h - grid.h_min) / (grid.h_max - grid.h_min)).clamp(0.0, 1.0);

    let m_scaled = m_norm * (grid.m_size - 1) as f64;
    let h_scaled = h_norm * (grid.h_size - 1) as f64;

    // Keep the (+1, +1) corner in bounds
    let m_idx = (m_scaled.floor() as usize).min(grid.m_size - 2);
    let h_idx = (h_scaled.floor() as usize).min(grid.h_size - 2);

    let m_frac = m_scaled - m_idx as f64;
    let h_frac = h_scaled - h_idx as f64;

    let row0 = m_idx * grid.h_size + h_idx;
    let row1 = row0 + grid.h_size;

    let v00 = lut[row0];
    let v01 = lut[row0 + 1];
    let v10 = lut[row1];
    let v11 = lut[row1 + 1];

    v00 * (1.0 - m_frac) * (1.0 - h_frac)
        + v01 * (1.0 - m_frac) * h_frac
        + v10 * m_frac * (1.0 - h_frac)
        + v11 * m_frac * h_frac
}

/// What a LUT pair was generated for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutProvenance {
    pub mode: Mode,
    pub bias: BiasControls,
}

/// Active configuration that disagrees with a bound table's provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProvenanceMismatch {
    pub table: LutProvenance,
    pub active: LutProvenance,
}

impl ProvenanceMismatch {
    pub fn mode_differs(&self) -> bool {
        self.table.mode != self.active.mode
    }

    pub fn bias_differs(&self) -> bool {
        !self.table.bias.matches(&self.active.bias)
    }
}

/// Borrowed view of an `M_end` / `sumM_rest` table pair.
#[derive(Debug, Clone, Copy)]
pub struct LutPair<'a> {
    m_end: &'a [f64],
    sum_m_rest: &'a [f64],
    grid: LutGrid,
    provenance: Option<LutProvenance>,
}

impl<'a> LutPair<'a> {
    /// Bind two row-major `m_size x h_size` tables over `grid`.
    pub fn new(m_end: &'a [f64], sum_m_rest: &'a [f64], grid: LutGrid) -> LutResult<Self> {
        check_len("M_end", m_end, &grid)?;
        check_len("sumM_rest", sum_m_rest, &grid)?;
        Ok(Self {
            m_end,
            sum_m_rest,
            grid,
            provenance: None,
        })
    }

    /// Skip the size checks for slices already validated against `grid`.
    pub(crate) fn from_validated(m_end: &'a [f64], sum_m_rest: &'a [f64], grid: LutGrid) -> Self {
        debug_assert_eq!(m_end.len(), grid.cells());
        debug_assert_eq!(sum_m_rest.len(), grid.cells());
        Self {
            m_end,
            sum_m_rest,
            grid,
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: LutProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn grid(&self) -> &LutGrid {
        &self.grid
    }

    pub fn provenance(&self) -> Option<&LutProvenance> {
        self.provenance.as_ref()
    }

    /// End-of-sample magnetization after substep 0 ended at `m1`.
    #[inline]
    pub fn m_end(&self, m1: f64, h_audio: f64) -> f64 {
        bilinear_lookup(Some(self.m_end), &self.grid, m1, h_audio)
    }

    /// Sum of the magnetizations of substeps 1..N-1.
    #[inline]
    pub fn sum_m_rest(&self, m1: f64, h_audio: f64) -> f64 {
        bilinear_lookup(Some(self.sum_m_rest), &self.grid, m1, h_audio)
    }
}

fn check_len(table: &'static str, data: &[f64], grid: &LutGrid) -> LutResult<()> {
    if data.len() == grid.cells() {
        Ok(())
    } else {
        Err(LutError::SizeMismatch {
            table,
            m_size: grid.m_size,
            h_size: grid.h_size,
            expected: grid.cells(),
            actual: data.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3 x 5 grid with distinct values: v[i][j] = 10 i + j.
    fn ramp_table() -> (Vec<f64>, LutGrid) {
        let grid = LutGrid::new(3, 5).unwrap();
        let data = (0..3)
            .flat_map(|i| (0..5).map(move |j| (10 * i + j) as f64))
            .collect();
        (data, grid)
    }

    #[test]
    fn test_none_falls_back_to_zero() {
        let grid = LutGrid::new(3, 5).unwrap();
        assert_eq!(bilinear_lookup(None, &grid, 0.3, -0.2), 0.0);
    }

    #[test]
    fn test_exact_at_grid_points() {
        let (data, grid) = ramp_table();
        for i in 0..grid.m_size() {
            for j in 0..grid.h_size() {
                let v = bilinear_lookup(Some(&data[..]), &grid, grid.m_at(i), grid.h_at(j));
                assert_eq!(v, (10 * i + j) as f64, "corner ({i}, {j})");
            }
        }
    }

    #[test]
    fn test_midpoint_of_equal_corners() {
        let grid = LutGrid::new(3, 5).unwrap();
        let mut data = vec![0.0; grid.cells()];
        // Row 1, columns 1 and 2 share a value; midpoint h = -0.25.
        data[grid.h_size() + 1] = 0.75;
        data[grid.h_size() + 2] = 0.75;
        assert_eq!(bilinear_lookup(Some(&data[..]), &grid, 0.0, -0.25), 0.75);
    }

    #[test]
    fn test_interpolates_between_corners() {
        let (data, grid) = ramp_table();
        // Halfway between rows 0 and 1, a quarter into column 0..1.
        let v = bilinear_lookup(Some(&data[..]), &grid, -0.5, -0.875);
        assert!((v - 5.25).abs() < 1e-12, "got {v}");
    }

    #[test]
    fn test_out_of_range_saturates() {
        let (data, grid) = ramp_table();
        let lut = Some(data.as_slice());
        for h in [-1.0, -0.3, 0.0, 0.6, 1.0] {
            assert_eq!(
                bilinear_lookup(lut, &grid, 7.0, h),
                bilinear_lookup(lut, &grid, 1.0, h)
            );
            assert_eq!(
                bilinear_lookup(lut, &grid, -2.5, h),
                bilinear_lookup(lut, &grid, -1.0, h)
            );
        }
        for m in [-1.0, 0.25, 1.0] {
            assert_eq!(
                bilinear_lookup(lut, &grid, m, 3.0),
                bilinear_lookup(lut, &grid, m, 1.0)
            );
            assert_eq!(
                bilinear_lookup(lut, &grid, m, f64::NEG_INFINITY),
                bilinear_lookup(lut, &grid, m, -1.0)
            );
        }
    }

    #[test]
    fn test_custom_ranges() {
        let grid = LutGrid::with_ranges(2, 2, (0.0, 2.0), (-4.0, 4.0)).unwrap();
        let data = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(bilinear_lookup(Some(&data[..]), &grid, 2.0, 4.0), 3.0);
        assert_eq!(bilinear_lookup(Some(&data[..]), &grid, 1.0, 0.0), 1.5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "table does not match grid")]
    fn test_short_table_caught_before_lookup() {
        // The lower corner is in bounds, so only the length check can catch this
        let grid = LutGrid::new(3, 5).unwrap();
        let short = vec![0.0; 14];
        bilinear_lookup(Some(&short[..]), &grid, -1.0, -1.0);
    }

    #[test]
    fn test_pair_rejects_wrong_sizes() {
        let grid = LutGrid::new(3, 5).unwrap();
        let good = vec![0.0; 15];
        let short = vec![0.0; 14];
        assert!(LutPair::new(&good, &good, grid).is_ok());
        assert!(matches!(
            LutPair::new(&short, &good, grid),
            Err(LutError::SizeMismatch { table: "M_end", actual: 14, .. })
        ));
        assert!(matches!(
            LutPair::new(&good, &short, grid),
            Err(LutError::SizeMismatch { table: "sumM_rest", expected: 15, .. })
        ));
    }

    #[test]
    fn test_grid_validation() {
        assert!(matches!(LutGrid::new(1, 5), Err(LutError::GridTooSmall { .. })));
        assert!(matches!(LutGrid::new(65, 0), Err(LutError::GridTooSmall { .. })));
        assert!(matches!(
            LutGrid::with_ranges(2, 2, (1.0, 1.0), (-1.0, 1.0)),
            Err(LutError::InvalidAxis { .. })
        ));
        assert!(matches!(
            LutGrid::with_ranges(2, 2, (-1.0, 1.0), (0.0, f64::NAN)),
            Err(LutError::InvalidAxis { .. })
        ));
    }

    #[test]
    fn test_pair_lookups_use_their_tables() {
        let grid = LutGrid::new(2, 2).unwrap();
        let m_end = [0.5; 4];
        let sum = [-3.0; 4];
        let pair = LutPair::new(&m_end, &sum, grid).unwrap();
        assert_eq!(pair.m_end(0.1, 0.9), 0.5);
        assert_eq!(pair.sum_m_rest(0.1, 0.9), -3.0);
        assert!(pair.provenance().is_none());
    }
}
