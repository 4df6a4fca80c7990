//! Owned LUT storage and on-disk loading.
//!
//! Each tier ships as two raw files of row-major little-endian `f64`:
//! `ja_lut_<mode>_m_end.f64` and `ja_lut_<mode>_sum_m_rest.f64`, with `<mode>`
//! the lowercase tier name (`ja_lut_k121_m_end.f64`). Loading happens off the
//! audio thread; the scheduler only ever sees a borrowed [`LutPair`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LutError, LutResult};
use crate::lut::{LutGrid, LutPair, LutProvenance};
use crate::mode::Mode;
use crate::physics::BiasControls;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// File name of the `M_end` table for `mode`.
pub fn m_end_file_name(mode: Mode) -> String {
    format!("ja_lut_{}_m_end.f64", mode.name().to_ascii_lowercase())
}

/// File name of the `sumM_rest` table for `mode`.
pub fn sum_m_rest_file_name(mode: Mode) -> String {
    format!("ja_lut_{}_sum_m_rest.f64", mode.name().to_ascii_lowercase())
}

/// One tier's pair of tables, owned.
#[derive(Debug, Clone)]
pub struct LutTable {
    m_end: Vec<f64>,
    sum_m_rest: Vec<f64>,
    grid: LutGrid,
    provenance: Option<LutProvenance>,
}

impl LutTable {
    pub fn new(m_end: Vec<f64>, sum_m_rest: Vec<f64>, grid: LutGrid) -> LutResult<Self> {
        // Same size checks as binding, done once up front
        LutPair::new(&m_end, &sum_m_rest, grid)?;
        Ok(Self {
            m_end,
            sum_m_rest,
            grid,
            provenance: None,
        })
    }

    /// Decode two raw little-endian buffers.
    pub fn from_le_bytes(m_end: &[u8], sum_m_rest: &[u8], grid: LutGrid) -> LutResult<Self> {
        Self::new(
            decode_le("M_end", m_end)?,
            decode_le("sumM_rest", sum_m_rest)?,
            grid,
        )
    }

    /// Load `mode`'s tables from `dir` on the tier's default grid.
    pub fn load(dir: &Path, mode: Mode) -> LutResult<Self> {
        let tier = mode.tier();
        let grid = LutGrid::new(tier.lut_m_size, tier.lut_h_size)?;
        let m_end = fs::read(dir.join(m_end_file_name(mode)))?;
        let sum_m_rest = fs::read(dir.join(sum_m_rest_file_name(mode)))?;
        Self::from_le_bytes(&m_end, &sum_m_rest, grid)
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

    /// Borrowed view to hand to a scheduler.
    pub fn binding(&self) -> LutPair<'_> {
        // Lengths were checked in `new`
        let pair = LutPair::from_validated(&self.m_end, &self.sum_m_rest, self.grid);
        match self.provenance {
            Some(p) => pair.with_provenance(p),
            None => pair,
        }
    }
}

fn decode_le(table: &'static str, bytes: &[u8]) -> LutResult<Vec<f64>> {
    if bytes.len() % F64_BYTES != 0 {
        return Err(LutError::TruncatedData {
            table,
            len: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut raw = [0u8; F64_BYTES];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Tables for every tier found in a directory.
#[derive(Debug, Clone, Default)]
pub struct LutBank {
    tables: [Option<LutTable>; Mode::COUNT],
    dir: Option<PathBuf>,
}

impl LutBank {
    /// Load every tier from `dir`, tagging each table with `bias` as its
    /// provenance. Tiers whose files are missing or malformed stay empty.
    pub fn load_dir(dir: &Path, bias: BiasControls) -> Self {
        let mut bank = Self {
            dir: Some(dir.to_path_buf()),
            ..Self::default()
        };
        for mode in Mode::ALL {
            match LutTable::load(dir, mode) {
                Ok(table) => {
                    log::debug!("Loaded {} LUT from {}", mode.name(), dir.display());
                    bank.tables[mode.index()] = Some(table.with_provenance(LutProvenance { mode, bias }));
                }
                Err(e) => {
                    log::warn!("No {} LUT in {}: {e}", mode.name(), dir.display());
                }
            }
        }
        log::info!(
            "LUT bank: {}/{} tiers loaded from {}",
            bank.loaded_count(),
            Mode::COUNT,
            dir.display()
        );
        bank
    }

    pub fn insert(&mut self, mode: Mode, table: LutTable) {
        self.tables[mode.index()] = Some(table);
    }

    pub fn get(&self, mode: Mode) -> Option<&LutTable> {
        self.tables[mode.index()].as_ref()
    }

    pub fn loaded_count(&self) -> usize {
        self.tables.iter().filter(|t| t.is_some()).count()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}
