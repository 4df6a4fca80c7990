//! Bias resolution tiers.
//!
//! Each tier fixes how many bias cycles elapse per audio sample and how many
//! integration substeps cover them. Half-integer cycle counts with an odd
//! substep count flip the bias polarity between adjacent samples.
//!
//! The LUTs are generated offline per tier. A table built for one tier and
//! bound while another is active is not detected here and yields wrong output;
//! see [`crate::lut::LutProvenance`] for the optional check.

use std::f64::consts::TAU;

/// Default LUT grid size along the magnetization axis.
pub const LUT_M_SIZE: usize = 65;
/// Default LUT grid size along the audio field axis.
pub const LUT_H_SIZE: usize = 129;

/// One row of the tier table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionTier {
    pub bias_cycles_per_sample: f64,
    /// Substeps per bias cycle: 18 for the low-res group, 22 above.
    pub substeps_per_cycle: u32,
    pub total_substeps: u32,
    pub lut_m_size: usize,
    pub lut_h_size: usize,
}

impl ResolutionTier {
    const fn new(bias_cycles_per_sample: f64, substeps_per_cycle: u32, total_substeps: u32) -> Self {
        Self {
            bias_cycles_per_sample,
            substeps_per_cycle,
            total_substeps,
            lut_m_size: LUT_M_SIZE,
            lut_h_size: LUT_H_SIZE,
        }
    }

    pub fn inv_total_substeps(&self) -> f64 {
        1.0 / self.total_substeps as f64
    }

    /// Bias phase covered by one audio sample, in radians.
    pub fn phase_span(&self) -> f64 {
        self.bias_cycles_per_sample * TAU
    }

    /// Bias phase covered by one substep, in radians.
    pub fn phase_increment(&self) -> f64 {
        self.phase_span() / self.total_substeps as f64
    }
}

/// Compiled tier table, in [`Mode`] order.
pub const TIERS: [ResolutionTier; Mode::COUNT] = [
    ResolutionTier::new(1.5, 18, 27),
    ResolutionTier::new(2.5, 18, 45),
    ResolutionTier::new(3.5, 18, 63),
    ResolutionTier::new(4.5, 22, 99),
    ResolutionTier::new(5.5, 22, 121),
    ResolutionTier::new(8.5, 22, 187),
    ResolutionTier::new(11.5, 22, 253),
    ResolutionTier::new(22.5, 22, 495),
    ResolutionTier::new(47.5, 22, 1045),
    ResolutionTier::new(95.5, 22, 2101),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// 1.5 cycles, 27 substeps (ultra lofi)
    K28,
    /// 2.5 cycles, 45 substeps (lofi)
    K45,
    /// 3.5 cycles, 63 substeps (vintage)
    K63,
    /// 4.5 cycles, 99 substeps (warm)
    K99,
    /// 5.5 cycles, 121 substeps (standard)
    #[default]
    K121,
    /// 8.5 cycles, 187 substeps (high quality)
    K187,
    /// 11.5 cycles, 253 substeps (detailed)
    K253,
    /// 22.5 cycles, 495 substeps (ultra)
    K495,
    /// 47.5 cycles, 1045 substeps (extreme)
    K1045,
    /// 95.5 cycles, 2101 substeps (beyond)
    K2101,
}

impl Mode {
    pub const COUNT: usize = 10;

    pub const ALL: [Mode; Mode::COUNT] = [
        Mode::K28,
        Mode::K45,
        Mode::K63,
        Mode::K99,
        Mode::K121,
        Mode::K187,
        Mode::K253,
        Mode::K495,
        Mode::K1045,
        Mode::K2101,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn tier(self) -> &'static ResolutionTier {
        &TIERS[self.index()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::K28 => "K28",
            Mode::K45 => "K45",
            Mode::K63 => "K63",
            Mode::K99 => "K99",
            Mode::K121 => "K121",
            Mode::K187 => "K187",
            Mode::K253 => "K253",
            Mode::K495 => "K495",
            Mode::K1045 => "K1045",
            Mode::K2101 => "K2101",
        }
    }

    /// Case-insensitive lookup by tier name ("K121", "k121").
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
    }
}
