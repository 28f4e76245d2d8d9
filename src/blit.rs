//! Byte-exact CPU copies between a described surface and linear system
//! memory.
//!
//! Linear surfaces copy row by row. Tiled surfaces dispatch through a
//! per-tile-mode address function; the X and Y tile classes expose
//! contiguous runs (a whole 512B tile row, or a 16B column sliver) that the
//! inner loop copies with slices, falling back to per-byte addressing only
//! for TileW's bit-interleaved pattern.

use crate::format::PlanarFamily;
use crate::platform::TileMode;
use crate::resource::{OffsetInfo, OffsetKind, OffsetRequest, ResourceInfo};
use crate::{div_round_up, LayoutError};

/// Direction of a [cpu_blt] transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BltDirection {
    /// System memory into the tiled surface.
    Upload,
    /// Tiled surface into system memory.
    Download,
}

/// One CPU blit request. The subresource selectors follow the same rules
/// as [OffsetRequest].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuBltRequest {
    pub mip_level: u32,
    pub array_index: u32,
    pub slice: u32,
    /// Plane index for planar formats: 0 = Y, 1 = U, 2 = V.
    pub plane: u32,
    pub direction: BltDirection,
    /// Row pitch of the linear buffer in bytes. Zero means tightly packed.
    pub sys_pitch: usize,
}

impl Default for CpuBltRequest {
    fn default() -> Self {
        CpuBltRequest {
            mip_level: 0,
            array_index: 0,
            slice: 0,
            plane: 0,
            direction: BltDirection::Download,
            sys_pitch: 0,
        }
    }
}

/// Copies one subresource between `gpu` (the surface allocation, in its
/// tiled layout) and `sys` (a linear buffer).
///
/// Fails with [LayoutError::NotEnoughData] if either buffer is too small
/// for the addressed region.
pub fn cpu_blt(
    info: &ResourceInfo,
    gpu: &mut [u8],
    sys: &mut [u8],
    req: &CpuBltRequest,
) -> Result<(), LayoutError> {
    let (width_bytes, rows, gpu_pitch) = copy_region(info, req.plane, req.mip_level)?;
    let sys_pitch = if req.sys_pitch == 0 {
        width_bytes
    } else {
        req.sys_pitch
    };
    if sys_pitch < width_bytes {
        return Err(LayoutError::NotEnoughData {
            expected_size: width_bytes,
            actual_size: sys_pitch,
        });
    }

    let lock = info.get_offset(OffsetRequest {
        mip_level: req.mip_level,
        array_index: req.array_index,
        slice: req.slice,
        plane: req.plane,
        kind: OffsetKind::Lock,
    })?;
    let offset = match lock {
        OffsetInfo::Lock { offset, .. } => offset,
        _ => unreachable!(),
    };

    let sys_needed = sys_pitch * (rows - 1) + width_bytes;
    if sys.len() < sys_needed {
        return Err(LayoutError::NotEnoughData {
            expected_size: sys_needed,
            actual_size: sys.len(),
        });
    }
    if (gpu.len() as u64) < info.size() {
        return Err(LayoutError::NotEnoughData {
            expected_size: info.size() as usize,
            actual_size: gpu.len(),
        });
    }

    let tile = info.tile_geometry();
    if !tile.is_tiled {
        let base = offset as usize;
        for row in 0..rows {
            let g = base + row * gpu_pitch;
            let s = row * sys_pitch;
            match req.direction {
                BltDirection::Upload => {
                    gpu[g..g + width_bytes].copy_from_slice(&sys[s..s + width_bytes])
                }
                BltDirection::Download => {
                    sys[s..s + width_bytes].copy_from_slice(&gpu[g..g + width_bytes])
                }
            }
        }
        return Ok(());
    }

    let pitch = info.pitch() as usize;
    let tw = tile.width_bytes as usize;
    let th = tile.height_rows as usize;
    let tile_size = tile.size_bytes() as usize;
    let tile_row_bytes = th * pitch;
    let run = contiguous_run(info.tile_mode(), tw);

    for row in 0..rows {
        // Rows advance by the plane's packed pitch, which for tail-packed
        // chroma is narrower than the surface pitch. The packed pitch
        // divides the surface pitch, so a row never straddles one.
        let linear = offset as usize + row * gpu_pitch;
        let x0 = linear % pitch;
        let y = linear / pitch;
        let mut col = 0;
        while col < width_bytes {
            let x = x0 + col;
            // A run never crosses its 16B/512B sliver boundary.
            let len = run.min(width_bytes - col).min(run - x % run);
            let within = tile_address(info.tile_mode(), th, x % tw, y % th);
            let g = (y / th) * tile_row_bytes + (x / tw) * tile_size + within;
            let s = row * sys_pitch + col;
            match req.direction {
                BltDirection::Upload => gpu[g..g + len].copy_from_slice(&sys[s..s + len]),
                BltDirection::Download => sys[s..s + len].copy_from_slice(&gpu[g..g + len]),
            }
            col += len;
        }
    }
    Ok(())
}

/// Unpadded copy extent of one subresource: (row bytes, rows, GPU pitch).
fn copy_region(
    info: &ResourceInfo,
    plane: u32,
    mip_level: u32,
) -> Result<(usize, usize, usize), LayoutError> {
    let out_of_range = || LayoutError::InvalidOffsetRequest {
        mip_level,
        array_index: 0,
        plane,
    };
    let fmt = info.format();
    let finfo = fmt.info();
    let bpe = fmt.bytes_per_element() as usize;
    let pitch = info.pitch() as usize;

    if let Some(family) = fmt.planar_family() {
        let w = info.base_width() as usize;
        let h = info.base_height() as usize;
        let (width_bytes, rows, gpu_pitch) = match (family, plane) {
            (_, 0) => (w * bpe, h, pitch),
            // Interleaved UV carries both components at full row width.
            (PlanarFamily::PackedUv, 1 | 2) => (w * bpe, (h + 1) / 2, pitch),
            (PlanarFamily::ImcStacked { .. }, 1 | 2)
            | (PlanarFamily::ImcSideBySide { .. }, 1 | 2) => {
                (w * bpe / 2, (h + 1) / 2, pitch)
            }
            (PlanarFamily::TailPacked { downscale, .. }, 1 | 2) => {
                let d = downscale as usize;
                // Chroma rows run back to back at the narrow pitch.
                (w * bpe / d, (h + d - 1) / d, pitch / d)
            }
            (PlanarFamily::FullPlanes, 1 | 2) => (w * bpe, h, pitch),
            _ => return Err(out_of_range()),
        };
        return Ok((width_bytes, rows, gpu_pitch));
    }

    if mip_level >= info.mip_levels() {
        return Err(out_of_range());
    }
    let w = (info.base_width() >> mip_level).max(1);
    let h = (info.base_height() >> mip_level).max(1);
    let width_bytes = div_round_up(w, finfo.block_width) as usize * bpe;
    let rows = div_round_up(h, finfo.block_height) as usize;
    Ok((width_bytes, rows, pitch))
}

/// Longest contiguous byte run inside one tile row.
fn contiguous_run(mode: TileMode, tile_width: usize) -> usize {
    match mode {
        TileMode::TileX => tile_width,
        TileMode::TileW => 1,
        _ => 16,
    }
}

/// Byte address of (x, y) within one tile.
///
/// TileX is row-major. The Y class stores 16B-wide columns top to bottom.
/// TileW bit-interleaves 8x8 blocks for stencil access patterns, and Tile4
/// interleaves the Y-class column walk at a coarser grain.
fn tile_address(mode: TileMode, tile_height: usize, x: usize, y: usize) -> usize {
    match mode {
        TileMode::TileX => y * 512 + x,
        TileMode::TileW => {
            let low = (x & 1)
                | (y & 1) << 1
                | (x & 2) << 1
                | (y & 2) << 2
                | (x & 4) << 2
                | (y & 4) << 3;
            let block = (y >> 3) * 8 + (x >> 3);
            block * 64 + low
        }
        TileMode::Tile4 => {
            (x & 0xF)
                | (y & 1) << 4
                | (x & 0x10) << 1
                | (y & 2) << 5
                | (x & 0x20) << 2
                | (y & 0xC) << 6
                | (x & 0x40) << 4
                | (y & 0x10) << 7
        }
        // TileY and the Yf/Ys/Tile64 standard modes walk 16B columns.
        _ => (x / 16) * tile_height * 16 + y * 16 + (x % 16),
    }
}
