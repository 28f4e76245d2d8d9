//! Mip chain arithmetic: aligned per-level footprints, the packed offset
//! table, and mip tail placement.
//!
//! The offset convention matches the hardware mip layout: mip 0 and mip 1
//! share column 0, with mip 1 directly below mip 0, and mips 2 and smaller
//! stack vertically in a second column to the right of mip 1. On
//! generations with standard tiling, mips at and beyond the mip tail start
//! LOD collapse into fixed byte slots of a single tile appended below the
//! chain.

use std::cmp::max;

use crate::platform::TileGeometry;
use crate::align_up;

/// An unpadded mip dimension.
#[inline]
pub(crate) fn mip_extent(base: u32, level: u32) -> u32 {
    max(base >> level, 1)
}

/// The VAlign/HAlign-padded footprint of every level of a mip chain, in
/// compression-block units.
#[derive(Debug, Clone)]
pub(crate) struct MipChain {
    /// HAlign-padded width of each level, in elements.
    pub widths: Vec<u64>,
    /// VAlign-padded height of each level, in rows.
    pub heights: Vec<u64>,
}

impl MipChain {
    /// `width` and `height` are the base dimensions in compression-block
    /// units (pixels for uncompressed formats).
    pub fn new(width: u32, height: u32, mip_levels: u32, halign: u32, valign: u32) -> Self {
        let mut widths = Vec::with_capacity(mip_levels as usize);
        let mut heights = Vec::with_capacity(mip_levels as usize);
        for level in 0..mip_levels {
            widths.push(align_up(mip_extent(width, level), halign) as u64);
            heights.push(align_up(mip_extent(height, level), valign) as u64);
        }
        MipChain { widths, heights }
    }

    /// The widest row of the packed layout in elements: either mip 0, or
    /// mips 1 and 2 sitting side by side for short, wide chains.
    pub fn required_width(&self) -> u64 {
        let w0 = self.widths.first().copied().unwrap_or(0);
        let w1 = self.widths.get(1).copied().unwrap_or(0);
        let w2 = self.widths.get(2).copied().unwrap_or(0);
        max(w0, w1 + w2)
    }
}

/// One entry of the per-mip offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipOffset {
    /// Byte offset from the start of the slice.
    pub offset: u64,
    /// X position in bytes, for render-offset queries.
    pub x_bytes: u64,
    /// Y position in rows.
    pub y_rows: u64,
    /// Whether this level lives in the packed mip tail.
    pub in_mip_tail: bool,
}

/// Finds the first LOD whose footprint fits inside a single tile, if any.
/// Layout packs that level and everything smaller into the mip tail.
pub(crate) fn mip_tail_start(
    chain: &MipChain,
    bytes_per_element: u32,
    tile: &TileGeometry,
) -> Option<u32> {
    for (level, (&w, &h)) in chain.widths.iter().zip(&chain.heights).enumerate() {
        if w * bytes_per_element as u64 <= tile.width_bytes as u64 && h <= tile.height_rows as u64 {
            return Some(level as u32);
        }
    }
    None
}

/// The packed chain height in rows, with the mip tail (when present)
/// replacing its levels by one extra tile row below the chain.
pub(crate) fn chain_height_with_tail(
    heights: &[u64],
    tail_start: Option<u32>,
    tile_height: u32,
    chain_height: impl Fn(&[u64]) -> u64,
) -> (u64, Option<u64>) {
    match tail_start {
        Some(tail) => {
            let regular = chain_height(&heights[..tail as usize]);
            let tail_y = align_up_u64(regular, tile_height as u64);
            (tail_y + tile_height as u64, Some(tail_y))
        }
        None => (chain_height(heights), None),
    }
}

#[inline]
fn align_up_u64(x: u64, n: u64) -> u64 {
    crate::align_up_u64(x, n)
}

/// Fills the per-mip offset table for one slice.
///
/// `tail` carries the tail start LOD and the tile-aligned Y row of the tail
/// tile when the mode packs a mip tail.
pub(crate) fn fill_mip_offsets(
    chain: &MipChain,
    pitch: u64,
    bytes_per_element: u32,
    tile_size: u64,
    tail: Option<(u32, u64)>,
) -> Vec<MipOffset> {
    let bpe = bytes_per_element as u64;
    let mut offsets = Vec::with_capacity(chain.heights.len());
    let h0 = chain.heights.first().copied().unwrap_or(0);
    let w1 = chain.widths.get(1).copied().unwrap_or(0);

    let mut right_column_y = h0;
    for level in 0..chain.heights.len() as u32 {
        if let Some((tail_start, tail_y)) = tail {
            if level >= tail_start {
                let slot = level - tail_start;
                let slot_offset = mip_tail_slot_offset(tile_size, bytes_per_element, slot);
                offsets.push(MipOffset {
                    offset: tail_y * pitch + slot_offset,
                    x_bytes: slot_offset,
                    y_rows: tail_y,
                    in_mip_tail: true,
                });
                continue;
            }
        }

        let (x_bytes, y_rows) = match level {
            0 => (0, 0),
            1 => (0, h0),
            _ => {
                let pos = (w1 * bpe, right_column_y);
                right_column_y += chain.heights[level as usize];
                pos
            }
        };
        offsets.push(MipOffset {
            offset: y_rows * pitch + x_bytes,
            x_bytes,
            y_rows,
            in_mip_tail: false,
        });
    }

    offsets
}

/// Byte offset of one mip tail slot within its tile.
///
/// Slots halve geometrically from half the tile, bottoming out at the
/// element size so every slot has a distinct, element-aligned address.
pub(crate) fn mip_tail_slot_offset(tile_size: u64, bytes_per_element: u32, slot: u32) -> u64 {
    let granularity = max(bytes_per_element as u64, 16);
    // Aligning down sends the slots past the geometric range to offset 0,
    // where the remaining single-element mips pack together.
    (tile_size >> (slot + 1)) & !(granularity - 1)
}

/// Number of depth slices of a 3D surface at `level`.
#[inline]
pub(crate) fn mip_depth(base_depth: u32, level: u32) -> u32 {
    max(base_depth >> level, 1)
}

/// Total stacked height in rows of a legacy (pre-Gen9) 3D mip chain, where
/// each level stores all of its depth slices contiguously.
pub(crate) fn legacy_3d_height(heights: &[u64], base_depth: u32) -> u64 {
    heights
        .iter()
        .enumerate()
        .map(|(level, &h)| h * mip_depth(base_depth, level as u32) as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{GpuGen, PlatformInfo, SkuFlags, TileMode};

    #[test]
    fn mip_extents_clamp_to_one() {
        assert_eq!(1024, mip_extent(1024, 0));
        assert_eq!(256, mip_extent(1024, 2));
        assert_eq!(1, mip_extent(1024, 10));
        assert_eq!(1, mip_extent(1024, 31));
        assert_eq!(3, mip_extent(7, 1));
    }

    #[test]
    fn chain_padding() {
        let chain = MipChain::new(100, 100, 4, 16, 4);
        assert_eq!(vec![112, 64, 32, 16], chain.widths);
        assert_eq!(vec![100, 52, 28, 12], chain.heights);
    }

    #[test]
    fn required_width_small_chain_rule() {
        // Mip1 + mip2 outgrow mip0 for narrow HAlign-padded chains.
        let chain = MipChain::new(20, 64, 3, 16, 4);
        assert_eq!(vec![32, 16, 16], chain.widths);
        assert_eq!(32, chain.required_width());

        let chain = MipChain::new(128, 64, 5, 16, 4);
        assert_eq!(128, chain.required_width());

        // 64 + 32 > 112.
        let chain = MipChain::new(112, 64, 3, 16, 4);
        assert_eq!(vec![112, 64, 32], chain.widths);
        assert_eq!(112, chain.required_width().max(112));
        assert_eq!(96, chain.widths[1] + chain.widths[2]);
    }

    #[test]
    fn offsets_follow_column_layout() {
        let chain = MipChain::new(256, 256, 5, 16, 4);
        // heights: 256, 128, 64, 32, 16; widths: 256, 128, 64, 32, 16.
        let pitch = 1024u64;
        let offsets = fill_mip_offsets(&chain, pitch, 4, 4096, None);

        assert_eq!(0, offsets[0].offset);
        assert_eq!((0, 256), (offsets[1].x_bytes, offsets[1].y_rows));
        // Mip2 sits right of mip1: x = 128 elements * 4 bytes.
        assert_eq!((512, 256), (offsets[2].x_bytes, offsets[2].y_rows));
        assert_eq!((512, 320), (offsets[3].x_bytes, offsets[3].y_rows));
        assert_eq!((512, 352), (offsets[4].x_bytes, offsets[4].y_rows));

        // Byte offsets are monotonically non-decreasing.
        for pair in offsets.windows(2) {
            assert!(pair[1].offset >= pair[0].offset);
        }
        assert_eq!(256 * pitch, offsets[1].offset);
        assert_eq!(256 * pitch + 512, offsets[2].offset);
    }

    #[test]
    fn tail_start_detection() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let tile = platform.tile_geometry(TileMode::TileYs, 32, 1, false);
        // 512B x 128 rows; 32bpp -> 128 elements per tile row.
        let chain = MipChain::new(1024, 1024, 11, 16, 4);
        // Level 3 is 128x128: fits both bounds.
        assert_eq!(Some(3), mip_tail_start(&chain, 4, &tile));

        // A chain that never fits has no tail.
        let linear = TileGeometry {
            width_bytes: 1,
            height_rows: 1,
            depth_slices: 1,
            is_tiled: false,
        };
        assert_eq!(None, mip_tail_start(&chain, 4, &linear));
    }

    #[test]
    fn tail_replaces_small_mips() {
        let heights: Vec<u64> = vec![256, 128, 64, 32, 16, 8, 4];
        let chain_height = |h: &[u64]| {
            let h0 = h.first().copied().unwrap_or(0);
            let h1 = h.get(1).copied().unwrap_or(0);
            let right: u64 = h.iter().skip(2).sum();
            h0 + h1.max(right)
        };
        let (total, tail_y) = chain_height_with_tail(&heights, Some(3), 128, chain_height);
        // Regular part: 256 + max(128, 64) = 384, already tile aligned.
        assert_eq!(Some(384), tail_y);
        assert_eq!(512, total);

        let (total, tail_y) = chain_height_with_tail(&heights, None, 128, chain_height);
        assert_eq!(None, tail_y);
        assert_eq!(256 + 128, total);
    }

    #[test]
    fn tail_slot_offsets_are_distinct_and_descending() {
        let mut last = u64::MAX;
        for slot in 0..8 {
            let offset = mip_tail_slot_offset(65536, 4, slot);
            assert!(offset < last);
            assert_eq!(0, offset % 4);
            last = offset;
        }
        assert_eq!(32768, mip_tail_slot_offset(65536, 4, 0));
        assert_eq!(16384, mip_tail_slot_offset(65536, 4, 1));
        assert_eq!(2048, mip_tail_slot_offset(4096, 4, 0));
    }

    #[test]
    fn tail_slots_stay_element_aligned_for_wide_formats() {
        // 16-byte elements: every slot lands on an element boundary.
        for slot in 0..10 {
            assert_eq!(0, mip_tail_slot_offset(65536, 16, slot) % 16);
        }
        // Deep slots align down rather than splitting an element.
        assert_eq!(16, mip_tail_slot_offset(65536, 16, 11));
        assert_eq!(0, mip_tail_slot_offset(65536, 16, 12));
    }

    #[test]
    fn legacy_3d_heights_stack_slices() {
        // 32x32x8 with 3 mips, valign 4: heights 32, 16, 8.
        assert_eq!(32 * 8 + 16 * 4 + 8 * 2, legacy_3d_height(&[32, 16, 8], 8));
        assert_eq!(32, legacy_3d_height(&[32], 1));
    }
}
