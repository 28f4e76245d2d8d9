//! Planar (YUV) surface layout.
//!
//! Planar formats place two or three planes inside one allocation. Each
//! family has its own packing rule; tiled surfaces additionally snap every
//! plane start to the tile grid so each plane can be bound on its own.

use crate::format::{Format, PlanarFamily};
use crate::mipmap::MipOffset;
use crate::platform::{PlatformInfo, TileMode};
use crate::restrictions::Restrictions;
use crate::texture::TextureInfo;
use crate::{align_up_u64, div_round_up, LayoutError};

/// Placement of one plane inside the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset of the plane from the allocation base.
    pub offset: u64,
    /// X position in bytes within the row the plane starts on.
    pub x_bytes: u64,
    /// Row the plane starts on.
    pub y_rows: u64,
    /// Number of full-pitch rows the plane occupies.
    pub rows: u64,
}

pub(crate) struct PlanarRequest<'a> {
    pub platform: &'a PlatformInfo,
    pub restrictions: &'a Restrictions,
    pub tile_mode: TileMode,
    pub format: Format,
    pub width: u32,
    pub height: u32,
}

/// Lays out every plane of `req.format` and returns the combined surface
/// plus the per-plane placements, luma first.
pub(crate) fn layout_planar(
    req: &PlanarRequest<'_>,
) -> Result<(TextureInfo, Vec<PlaneLayout>), LayoutError> {
    let family = match req.format.planar_family() {
        Some(family) => family,
        None => {
            return Err(LayoutError::UnsupportedFormat {
                format: req.format,
                gen: req.platform.gen,
            })
        }
    };

    let tile = req
        .platform
        .tile_geometry(req.tile_mode, req.format.bits_per_element(), 1, false);
    let row_align = if tile.is_tiled {
        tile.height_rows as u64
    } else {
        1
    };

    let pitch = finalize_planar_pitch(req, family, &tile)?;
    let luma_rows = luma_plane_rows(req, family, row_align, pitch, &tile);

    let mut planes = vec![PlaneLayout {
        offset: 0,
        x_bytes: 0,
        y_rows: 0,
        rows: luma_rows,
    }];

    let total_rows = match family {
        PlanarFamily::PackedUv => {
            // Interleaved UV at half height, directly below Y. U and V
            // queries both resolve to the same stored plane.
            let uv_rows = align_up_u64(div_round_up(req.height, 2) as u64, row_align);
            let uv = plane_at(luma_rows * pitch, pitch, uv_rows);
            planes.push(uv);
            planes.push(uv);
            luma_rows + uv_rows
        }
        PlanarFamily::ImcStacked { v_first } => {
            // Two full-pitch chroma planes stacked below Y.
            let chroma_rows = align_up_u64(div_round_up(req.height, 2) as u64, row_align);
            let first = plane_at(luma_rows * pitch, pitch, chroma_rows);
            let second = plane_at((luma_rows + chroma_rows) * pitch, pitch, chroma_rows);
            push_chroma(&mut planes, v_first, first, second);
            luma_rows + 2 * chroma_rows
        }
        PlanarFamily::ImcSideBySide { v_first } => {
            // U and V share rows, split at half pitch. The pitch stage
            // guaranteed the half-pitch boundary is tile aligned.
            let chroma_rows = align_up_u64(div_round_up(req.height, 2) as u64, row_align);
            let left = plane_at(luma_rows * pitch, pitch, chroma_rows);
            let right = plane_at(luma_rows * pitch + pitch / 2, pitch, chroma_rows);
            push_chroma(&mut planes, v_first, left, right);
            luma_rows + chroma_rows
        }
        PlanarFamily::TailPacked { downscale, v_first } => {
            // Chroma planes run at pitch/downscale and pack back to back
            // after Y, so each occupies a fraction of the full-pitch rows.
            let chroma_pitch = pitch / downscale as u64;
            let chroma_height = div_round_up(req.height, downscale) as u64;
            let chroma_bytes = chroma_pitch * chroma_height;
            let first_offset = align_up_u64(luma_rows * pitch, row_align * pitch);
            let second_offset = align_up_u64(first_offset + chroma_bytes, if tile.is_tiled {
                row_align * pitch
            } else {
                1
            });
            let rows = |offset: u64, bytes: u64| div_round_up_u64(offset % pitch + bytes, pitch);
            let first = PlaneLayout {
                offset: first_offset,
                x_bytes: first_offset % pitch,
                y_rows: first_offset / pitch,
                rows: rows(first_offset, chroma_bytes),
            };
            let second = PlaneLayout {
                offset: second_offset,
                x_bytes: second_offset % pitch,
                y_rows: second_offset / pitch,
                rows: rows(second_offset, chroma_bytes),
            };
            let total = div_round_up_u64(second_offset + chroma_bytes, pitch);
            push_chroma(&mut planes, v_first, first, second);
            total
        }
        PlanarFamily::FullPlanes => {
            // Three full-resolution planes, component order already fixed
            // by the format.
            let rows = align_up_u64(req.height as u64, row_align);
            planes.push(plane_at(luma_rows * pitch, pitch, rows));
            planes.push(plane_at((luma_rows + rows) * pitch, pitch, rows));
            luma_rows + 2 * rows
        }
    };

    let padded_rows = align_up_u64(total_rows, row_align);
    let base_alignment = req.restrictions.alignment.max(if tile.is_tiled {
        tile.size_bytes()
    } else {
        1
    });
    let size = align_up_u64(padded_rows * pitch, base_alignment);
    let max = req.platform.max_surface_size(false);
    if size > max {
        tracing::debug!(size, max, "planar surface exceeds the addressable size");
        return Err(LayoutError::SizeTooLarge { size, max });
    }

    let info = TextureInfo {
        tile_mode: req.tile_mode,
        pitch,
        size,
        qpitch_rows: 0,
        total_rows: padded_rows,
        halign: 1,
        valign: 1,
        dalign: 1,
        mip_tail_start: None,
        base_alignment,
        mip_offsets: vec![MipOffset {
            offset: 0,
            x_bytes: 0,
            y_rows: 0,
            in_mip_tail: false,
        }],
    };
    Ok((info, planes))
}

fn plane_at(offset: u64, pitch: u64, rows: u64) -> PlaneLayout {
    PlaneLayout {
        offset,
        x_bytes: offset % pitch,
        y_rows: offset / pitch,
        rows,
    }
}

/// Pushes the two chroma placements in Y, U, V query order given their
/// storage order.
fn push_chroma(planes: &mut Vec<PlaneLayout>, v_first: bool, first: PlaneLayout, second: PlaneLayout) {
    let (u, v) = if v_first { (second, first) } else { (first, second) };
    planes.push(u);
    planes.push(v);
}

fn luma_plane_rows(
    req: &PlanarRequest<'_>,
    family: PlanarFamily,
    row_align: u64,
    pitch: u64,
    tile: &crate::platform::TileGeometry,
) -> u64 {
    let mut rows = align_up_u64(req.height as u64, row_align);
    // Luma rows stretch until the chroma start lands on a 4KB boundary.
    if req.platform.wa.nv12_uv_4k_align && family == PlanarFamily::PackedUv {
        while (rows * pitch) % 4096 != 0 {
            rows += if tile.is_tiled { row_align } else { 1 };
        }
    }
    rows
}

/// Pitch selection with the family constraints folded in.
fn finalize_planar_pitch(
    req: &PlanarRequest<'_>,
    family: PlanarFamily,
    tile: &crate::platform::TileGeometry,
) -> Result<u64, LayoutError> {
    let bpe = req.format.bytes_per_element() as u64;
    let mut pitch = req.width as u64 * bpe;
    pitch = pitch.max(req.restrictions.min_pitch as u64);
    pitch = align_up_u64(pitch, req.restrictions.pitch_alignment as u64);

    if tile.is_tiled {
        pitch = align_up_u64(pitch, tile.width_bytes as u64);
        // Side-by-side chroma binds the half-pitch point as a plane base.
        if matches!(family, PlanarFamily::ImcSideBySide { .. }) {
            pitch = align_up_u64(pitch, 2 * tile.width_bytes as u64);
        }
        if req.platform.wa.tile4_yuv_odd_tile_pad
            && req.tile_mode == TileMode::Tile4
            && (pitch / tile.width_bytes as u64) % 2 == 1
        {
            pitch += tile.width_bytes as u64;
        }
    } else if matches!(family, PlanarFamily::TailPacked { downscale, .. } if downscale > 1) {
        // Chroma pitch must itself meet the lock alignment.
        let downscale = match family {
            PlanarFamily::TailPacked { downscale, .. } => downscale as u64,
            _ => unreachable!(),
        };
        pitch = align_up_u64(
            pitch,
            downscale * req.restrictions.lock_pitch_alignment as u64,
        );
    }

    let max = req.restrictions.max_pitch.min(req.platform.max_pitch());
    if pitch > max {
        tracing::debug!(pitch, max, "planar pitch exceeds the hardware limit");
        return Err(LayoutError::PitchTooLarge { pitch, max });
    }
    Ok(pitch)
}

#[inline]
fn div_round_up_u64(x: u64, d: u64) -> u64 {
    (x + d - 1) / d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{GpuGen, SkuFlags, Workarounds};
    use crate::resource::{ResourceDesc, TilingFlags, UsageFlags};
    use crate::restrictions::resolve_restrictions;

    fn restrictions(platform: &PlatformInfo, format: Format, tiling: TilingFlags) -> Restrictions {
        let desc = ResourceDesc {
            format,
            width: 64,
            height: 64,
            usage: UsageFlags::TEXTURE,
            tiling,
            ..ResourceDesc::default()
        };
        resolve_restrictions(platform, &desc).unwrap()
    }

    fn layout(
        platform: &PlatformInfo,
        tile_mode: TileMode,
        format: Format,
        width: u32,
        height: u32,
    ) -> (TextureInfo, Vec<PlaneLayout>) {
        let tiling = crate::tilemode::flag_for(tile_mode);
        let r = restrictions(platform, format, tiling);
        layout_planar(&PlanarRequest {
            platform,
            restrictions: &r,
            tile_mode,
            format,
            width,
            height,
        })
        .unwrap()
    }

    #[test]
    fn nv12_tile_y() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        let (info, planes) = layout(&platform, TileMode::TileY, Format::Nv12, 0x2048, 0x274);

        assert_eq!(0x2080, info.pitch);
        assert_eq!(3, planes.len());
        assert_eq!(0x280, planes[0].rows);
        // Both chroma views point at the interleaved UV plane.
        assert_eq!(0x280, planes[1].y_rows);
        assert_eq!(planes[1], planes[2]);
        assert_eq!(0x140, planes[1].rows);
        assert_eq!(0x280 * 0x2080, planes[1].offset);
        assert_eq!(0x2080 * (0x280 + 0x140), info.size);
        assert_eq!(0x79E000, info.size);
    }

    #[test]
    fn rgbp_linear_stacks_exact_rows() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let (info, planes) = layout(&platform, TileMode::Linear, Format::Rgbp, 0x101, 0x101);

        assert_eq!(0x140, info.pitch);
        assert_eq!(0x303, info.total_rows);
        assert_eq!([0, 0x101, 0x202], [planes[0].y_rows, planes[1].y_rows, planes[2].y_rows]);
        assert_eq!(0x101 * 0x140, planes[1].offset);
    }

    #[test]
    fn imc4_half_pitch_is_tile_aligned() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let (info, planes) = layout(&platform, TileMode::TileY, Format::Imc4, 0x101, 0x101);

        // Three tile columns would leave the half-pitch point mid-tile, so
        // the pitch pads to four.
        assert_eq!(512, info.pitch);
        // IMC4 stores U on the left, V on the right.
        let (u, v) = (planes[1], planes[2]);
        assert_eq!((0, 288), (u.x_bytes, u.y_rows));
        assert_eq!((256, 288), (v.x_bytes, v.y_rows));
        assert_eq!(160, u.rows);
        assert_eq!(448, info.total_rows);
    }

    #[test]
    fn imc1_stacks_v_before_u() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let (_, planes) = layout(&platform, TileMode::TileY, Format::Imc1, 256, 256);
        // Query order is Y, U, V; IMC1 stores V first, so U sits below V.
        assert_eq!(256 + 128, planes[1].y_rows);
        assert_eq!(256, planes[2].y_rows);
    }

    #[test]
    fn yv12_linear_packs_chroma_tails() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let (info, planes) = layout(&platform, TileMode::Linear, Format::Yv12, 256, 256);

        assert_eq!(256, info.pitch);
        // V directly after Y, U after V, each pitch/2 x height/2.
        assert_eq!(256 * 256, planes[2].offset);
        assert_eq!(256 * 256 + 128 * 128, planes[1].offset);
        assert_eq!(256 + 64 + 64, info.total_rows);
    }

    #[test]
    fn yvu9_quarter_planes() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let (info, planes) = layout(&platform, TileMode::Linear, Format::Yvu9, 256, 256);

        // Chroma runs at pitch/4 and height/4.
        assert_eq!(256 * 256, planes[2].offset);
        assert_eq!(256 * 256 + 64 * 64, planes[1].offset);
        assert_eq!(256 + 16 + 16, info.total_rows);
        assert!(info.size >= info.total_rows * info.pitch);
    }

    #[test]
    fn nv12_uv_4k_workaround() {
        let mut wa = Workarounds::default();
        wa.nv12_uv_4k_align = true;
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default()).with_workarounds(wa);
        let (_, planes) = layout(&platform, TileMode::TileY, Format::Nv12, 100, 100);
        assert_eq!(0, planes[1].offset % 4096);
    }

    #[test]
    fn tile4_odd_column_workaround() {
        let mut wa = Workarounds::default();
        wa.tile4_yuv_odd_tile_pad = true;
        let platform = PlatformInfo::new(GpuGen::Gen12, SkuFlags::default()).with_workarounds(wa);
        let (info, _) = layout(&platform, TileMode::Tile4, Format::Nv12, 300, 200);
        assert_eq!(0, (info.pitch / 128) % 2);
    }

    #[test]
    fn non_planar_format_rejected() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = restrictions(&platform, Format::R8G8B8A8Unorm, TilingFlags::TILE_Y);
        let err = layout_planar(&PlanarRequest {
            platform: &platform,
            restrictions: &r,
            tile_mode: TileMode::TileY,
            format: Format::R8G8B8A8Unorm,
            width: 64,
            height: 64,
        })
        .unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedFormat { .. }));
    }
}
