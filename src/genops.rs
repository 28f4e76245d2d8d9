//! Per-generation layout strategy.
//!
//! The default method bodies implement the Gen7 behavior; each later
//! generation overrides only the handful of steps that actually differ.

use crate::format::Format;
use crate::platform::{GpuGen, TileMode};

/// The surface classes that resolve to different alignment units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SurfaceClass {
    Depth,
    SeparateStencil,
    Compressed,
    Other,
}

pub(crate) trait GenOps: Sync {
    /// HAlign/VAlign/DAlign in elements for one mip footprint.
    fn alignment_units(&self, class: SurfaceClass, format: Format, samples: u32) -> (u32, u32, u32) {
        match class {
            SurfaceClass::Depth => {
                if format == Format::D16Unorm {
                    match samples {
                        2 | 8 => (16, 4, 1),
                        _ => (8, 8, 1),
                    }
                } else {
                    (8, 4, 1)
                }
            }
            SurfaceClass::SeparateStencil => (16, 8, 1),
            SurfaceClass::Compressed => {
                let info = format.info();
                (info.block_width, info.block_height, info.block_depth)
            }
            // 16x4 keeps non-MSAA surfaces fast-clear eligible.
            SurfaceClass::Other => (16, 4, 1),
        }
    }

    /// Distance between array slices in rows, before tile alignment.
    ///
    /// `heights` holds the VAlign-padded height of every mip level.
    /// The legacy formula reproduces the fixed hardware constant of twelve
    /// VAlign rows of LOD packing slack.
    fn qpitch_rows(&self, heights: &[u64], valign: u32) -> u64 {
        let h0 = heights.first().copied().unwrap_or(0);
        let h1 = heights.get(1).copied().unwrap_or(0);
        h0 + h1 + 12 * valign as u64
    }

    /// Exact packed height of one slice's mip chain in rows: mip 0 on top,
    /// mip 1 below it in column 0, mips 2+ stacked in the right column.
    fn chain_height_rows(&self, heights: &[u64]) -> u64 {
        let h0 = heights.first().copied().unwrap_or(0);
        let h1 = heights.get(1).copied().unwrap_or(0);
        let right: u64 = heights.iter().skip(2).sum();
        h0 + h1.max(right)
    }

    /// Whether small mips of `mode` pack into a mip tail tile.
    fn mip_tail_supported(&self, _mode: TileMode) -> bool {
        false
    }

    /// Whether 3D surfaces space their depth slices by QPitch. The legacy
    /// layout instead stacks the slices of each mip level contiguously.
    fn three_d_uses_qpitch(&self) -> bool {
        false
    }

    /// Whether planar surfaces may carry CCS.
    fn planar_ccs_supported(&self) -> bool {
        false
    }

    /// Placeholder format describing the CCS of a multisampled surface.
    /// The CCS itself is never multisampled.
    fn msaa_ccs_format(&self, samples: u32) -> Format {
        match samples {
            2 | 4 => Format::R8Unorm,
            8 => Format::R32Float,
            _ => Format::R32G32Float,
        }
    }

    /// CCS sizing downscale (width divisor, height divisor) for a
    /// non-MSAA render target in `mode`.
    fn ccs_downscale(&self, mode: TileMode) -> (u32, u32) {
        match mode {
            TileMode::TileX => (64, 16),
            _ => (32, 32),
        }
    }

    /// Fast-clear granularity (bytes, rows) the main surface dimensions are
    /// rounded to before the CCS downscale.
    fn fast_clear_granularity(&self, mode: TileMode) -> (u32, u32) {
        match mode {
            TileMode::TileX => (1024, 64),
            _ => (512, 128),
        }
    }
}

pub(crate) struct Gen7Ops;
impl GenOps for Gen7Ops {}

pub(crate) struct Gen8Ops;
impl GenOps for Gen8Ops {}

pub(crate) struct Gen9Ops;
impl GenOps for Gen9Ops {
    fn qpitch_rows(&self, heights: &[u64], _valign: u32) -> u64 {
        self.chain_height_rows(heights)
    }

    fn mip_tail_supported(&self, mode: TileMode) -> bool {
        matches!(mode, TileMode::TileYf | TileMode::TileYs)
    }

    fn three_d_uses_qpitch(&self) -> bool {
        true
    }
}

pub(crate) struct Gen11Ops;
impl GenOps for Gen11Ops {
    fn qpitch_rows(&self, heights: &[u64], _valign: u32) -> u64 {
        self.chain_height_rows(heights)
    }

    fn mip_tail_supported(&self, mode: TileMode) -> bool {
        matches!(mode, TileMode::TileYf | TileMode::TileYs)
    }

    fn three_d_uses_qpitch(&self) -> bool {
        true
    }

    fn planar_ccs_supported(&self) -> bool {
        true
    }
}

pub(crate) struct Gen12Ops;
impl GenOps for Gen12Ops {
    fn qpitch_rows(&self, heights: &[u64], _valign: u32) -> u64 {
        self.chain_height_rows(heights)
    }

    fn mip_tail_supported(&self, mode: TileMode) -> bool {
        matches!(mode, TileMode::Tile64)
    }

    fn three_d_uses_qpitch(&self) -> bool {
        true
    }

    fn planar_ccs_supported(&self) -> bool {
        true
    }
}

pub(crate) fn ops_for(gen: GpuGen) -> &'static dyn GenOps {
    match gen {
        GpuGen::Gen7 => &Gen7Ops,
        GpuGen::Gen8 => &Gen8Ops,
        GpuGen::Gen9 => &Gen9Ops,
        GpuGen::Gen11 => &Gen11Ops,
        GpuGen::Gen12 => &Gen12Ops,
    }
}
