//! The staged surface layout engine.
//!
//! [layout_texture] turns a validated request into a concrete [TextureInfo]
//! in fixed stages: unit conversion, alignment-unit selection, mip chain
//! padding, pitch finalization, QPitch and slice stacking, then the total
//! size check. Each stage only widens values produced by the previous one.

use crate::format::Format;
use crate::genops::{ops_for, GenOps, SurfaceClass};
use crate::mipmap::{
    chain_height_with_tail, fill_mip_offsets, legacy_3d_height, mip_tail_start, MipChain, MipOffset,
};
use crate::platform::{PlatformInfo, TileMode};
use crate::resource::{ResourceType, UsageFlags};
use crate::restrictions::Restrictions;
use crate::{align_up_u64, div_round_up, LayoutError};

/// The finished layout of one surface: the main surface, one plane of a
/// planar surface, or an auxiliary surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub tile_mode: TileMode,
    /// Distance between rows in bytes.
    pub pitch: u64,
    /// Total allocation size in bytes, padded to the tile grid and the base
    /// alignment.
    pub size: u64,
    /// Distance between array slices (or Gen9+ 3D depth slices) in rows.
    /// Zero when the surface has a single slice.
    pub qpitch_rows: u64,
    /// Padded height of the whole surface in rows.
    pub total_rows: u64,
    pub halign: u32,
    pub valign: u32,
    pub dalign: u32,
    /// First LOD packed into the mip tail, when the tile mode packs one.
    pub mip_tail_start: Option<u32>,
    /// Byte alignment the allocation base must honor.
    pub base_alignment: u64,
    pub(crate) mip_offsets: Vec<MipOffset>,
}

impl TextureInfo {
    pub fn mip_offset(&self, level: u32) -> Option<&MipOffset> {
        self.mip_offsets.get(level as usize)
    }
}

/// One layout request. Callers fold cube faces and non-interleaved MSAA
/// into `array_size` before submitting; `samples` only drives interleaved
/// expansion and standard-tile geometry.
pub(crate) struct LayoutRequest<'a> {
    pub platform: &'a PlatformInfo,
    pub restrictions: &'a Restrictions,
    pub tile_mode: TileMode,
    pub format: Format,
    pub resource_type: ResourceType,
    pub usage: UsageFlags,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub class: SurfaceClass,
}

/// Interleaved-sample expansion applied to depth and stencil surfaces,
/// which store all samples of a pixel inside the pixel's footprint.
const fn interleave_factors(samples: u32) -> (u32, u32) {
    match samples {
        2 => (2, 1),
        4 => (2, 2),
        8 => (4, 2),
        16 => (4, 4),
        _ => (1, 1),
    }
}

pub(crate) fn layout_texture(req: &LayoutRequest<'_>) -> Result<TextureInfo, LayoutError> {
    let ops = ops_for(req.platform.gen);
    let info = req.format.info();
    let is_3d = req.resource_type == ResourceType::Tex3D;

    // Work in compression-block units from here on. bits_per_element is
    // per block for compressed formats, so the byte math is uniform.
    let mut width = div_round_up(req.width, info.block_width);
    let mut height = div_round_up(req.height, info.block_height);
    if req.platform.wa.astc_odd_block_x && info.astc && info.block_width % 2 == 1 {
        width += 1;
    }

    let interleaved = matches!(
        req.class,
        SurfaceClass::Depth | SurfaceClass::SeparateStencil
    ) && req.samples > 1;
    let tile_samples = if interleaved {
        let (wf, hf) = interleave_factors(req.samples);
        width *= wf;
        height *= hf;
        1
    } else {
        req.samples
    };

    let (halign, valign, dalign) = ops.alignment_units(req.class, req.format, req.samples);
    // Alignment units are in pixels; convert to block units.
    let halign = div_round_up(halign, info.block_width).max(1);
    let valign = div_round_up(valign, info.block_height).max(1);

    let chain = MipChain::new(width, height, req.mip_levels, halign, valign);
    let tile = req
        .platform
        .tile_geometry(req.tile_mode, info.bits_per_element, tile_samples, is_3d);

    let bpe = (info.bits_per_element / 8) as u64;
    let tail_start = if ops.mip_tail_supported(req.tile_mode) && req.mip_levels > 1 {
        mip_tail_start(&chain, bpe as u32, &tile)
    } else {
        None
    };

    let pitch = finalize_pitch(req, &chain, bpe, &tile)?;

    let (slice_rows, tail_y) =
        chain_height_with_tail(&chain.heights, tail_start, tile.height_rows, |h| {
            ops.chain_height_rows(h)
        });

    let (qpitch, total_rows) = stack_slices(req, ops, &chain, slice_rows, valign, is_3d);

    let padded_rows = align_up_u64(total_rows, tile.height_rows as u64);
    let base_alignment = req.restrictions.alignment.max(if tile.is_tiled {
        tile.size_bytes()
    } else {
        1
    });
    let size = align_up_u64(padded_rows * pitch, base_alignment);

    let max = req
        .platform
        .max_surface_size(req.usage.contains(UsageFlags::TILED_RESOURCE));
    if size > max {
        tracing::debug!(size, max, "surface exceeds the addressable size");
        return Err(LayoutError::SizeTooLarge { size, max });
    }

    let mip_offsets = fill_mip_offsets(
        &chain,
        pitch,
        bpe as u32,
        tile.size_bytes(),
        tail_start.and_then(|t| tail_y.map(|y| (t, y))),
    );

    Ok(TextureInfo {
        tile_mode: req.tile_mode,
        pitch,
        size,
        qpitch_rows: qpitch,
        total_rows: padded_rows,
        halign,
        valign,
        dalign,
        mip_tail_start: tail_start,
        base_alignment,
        mip_offsets,
    })
}

/// Widens the natural row width to every pitch constraint in effect, then
/// checks the hard cap.
fn finalize_pitch(
    req: &LayoutRequest<'_>,
    chain: &MipChain,
    bpe: u64,
    tile: &crate::platform::TileGeometry,
) -> Result<u64, LayoutError> {
    let mut pitch = chain.required_width() * bpe;
    pitch = pitch.max(req.restrictions.min_pitch as u64);
    pitch = align_up_u64(pitch, req.restrictions.pitch_alignment as u64);
    if tile.is_tiled {
        pitch = align_up_u64(pitch, tile.width_bytes as u64);
        // Compressed surfaces need four tile columns per CCS cacheline.
        // Ys/Tile64 pages already span four Yf-page columns, and flat
        // physical CCS has no in-allocation control surface to feed.
        let compressed = req
            .usage
            .intersects(UsageFlags::RENDER_COMPRESSED | UsageFlags::MEDIA_COMPRESSED);
        let four_page_tile = matches!(req.tile_mode, TileMode::TileYs | TileMode::Tile64);
        if (compressed && !four_page_tile && !req.platform.sku.flat_physical_ccs)
            || (req.platform.wa.lossless_stride_4_tiles
                && req.usage.contains(UsageFlags::RENDER_COMPRESSED))
        {
            pitch = align_up_u64(pitch, 4 * tile.width_bytes as u64);
        }
    } else if req.platform.wa.fbc_linear_stride_512 && req.usage.contains(UsageFlags::FLIP_CHAIN) {
        pitch = align_up_u64(pitch, 512);
    }

    let max = req.restrictions.max_pitch.min(req.platform.max_pitch());
    if pitch > max {
        tracing::debug!(pitch, max, "row pitch exceeds the hardware limit");
        return Err(LayoutError::PitchTooLarge { pitch, max });
    }
    Ok(pitch)
}

/// Computes the QPitch and the stacked height of all slices.
fn stack_slices(
    req: &LayoutRequest<'_>,
    ops: &dyn GenOps,
    chain: &MipChain,
    slice_rows: u64,
    valign: u32,
    is_3d: bool,
) -> (u64, u64) {
    if is_3d && !ops.three_d_uses_qpitch() {
        // Legacy 3D: each mip stores its depth slices contiguously, so
        // QPitch does not apply.
        return (0, legacy_3d_height(&chain.heights, req.depth));
    }

    let slice_count = if is_3d { req.depth } else { req.array_size };
    if slice_count <= 1 {
        return (0, slice_rows);
    }

    let qpitch = if req.platform.gen >= crate::platform::GpuGen::Gen9 {
        align_up_u64(slice_rows, valign as u64)
    } else {
        ops.qpitch_rows(&chain.heights, valign)
    };
    (qpitch, qpitch * (slice_count as u64 - 1) + slice_rows)
}

/// Linear buffers bypass the 2D engine: a single row padded for sampler
/// over-fetch and the base alignment.
pub(crate) fn layout_buffer(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    width_bytes: u64,
    usage: UsageFlags,
) -> Result<TextureInfo, LayoutError> {
    let mut padded = align_up_u64(width_bytes, 64);
    if usage.contains(UsageFlags::TEXTURE) {
        // The sampler prefetches whole pages past the last element, plus
        // one cacheline of address slack.
        let overfetch = if platform.gen >= crate::platform::GpuGen::Gen12 {
            2 * crate::PAGE_SIZE
        } else {
            crate::PAGE_SIZE
        };
        padded += overfetch + 16;
    }
    let size = align_up_u64(padded, restrictions.alignment);
    let max = platform.max_surface_size(false);
    if size > max {
        return Err(LayoutError::SizeTooLarge { size, max });
    }
    Ok(TextureInfo {
        tile_mode: TileMode::Linear,
        pitch: size,
        size,
        qpitch_rows: 0,
        total_rows: 1,
        halign: 1,
        valign: 1,
        dalign: 1,
        mip_tail_start: None,
        base_alignment: restrictions.alignment,
        mip_offsets: vec![MipOffset {
            offset: 0,
            x_bytes: 0,
            y_rows: 0,
            in_mip_tail: false,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{GpuGen, SkuFlags, Workarounds};
    use crate::resource::{ResourceDesc, TilingFlags};
    use crate::restrictions::resolve_restrictions;

    fn request<'a>(
        platform: &'a PlatformInfo,
        restrictions: &'a Restrictions,
        tile_mode: TileMode,
        format: Format,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> LayoutRequest<'a> {
        LayoutRequest {
            platform,
            restrictions,
            tile_mode,
            format,
            resource_type: ResourceType::Tex2D,
            usage: UsageFlags::TEXTURE,
            width,
            height,
            depth: 1,
            array_size: 1,
            mip_levels,
            samples: 1,
            class: SurfaceClass::Other,
        }
    }

    fn generic_restrictions(platform: &PlatformInfo) -> Restrictions {
        let desc = ResourceDesc {
            format: Format::R8G8B8A8Unorm,
            width: 64,
            height: 64,
            usage: UsageFlags::TEXTURE,
            tiling: TilingFlags::TILE_Y,
            ..ResourceDesc::default()
        };
        resolve_restrictions(platform, &desc).unwrap()
    }

    #[test]
    fn single_mip_tile_y() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let info = layout_texture(&request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            256,
            256,
            1,
        ))
        .unwrap();

        assert_eq!(1024, info.pitch);
        assert_eq!(256, info.total_rows);
        assert_eq!(256 * 1024, info.size);
        assert_eq!(0, info.qpitch_rows);
        assert_eq!(0, info.mip_offset(0).unwrap().offset);
    }

    #[test]
    fn odd_width_pads_to_tile_columns() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let info = layout_texture(&request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8Unorm,
            8264,
            628,
            1,
        ))
        .unwrap();

        // 8264 bytes round up to 65 tile columns.
        assert_eq!(0x2080, info.pitch);
        assert_eq!(0x280, info.total_rows);
    }

    #[test]
    fn mip_chain_offsets_tile_y() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let info = layout_texture(&request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            512,
            512,
            4,
        ))
        .unwrap();

        assert_eq!(2048, info.pitch);
        assert_eq!(None, info.mip_tail_start);
        assert_eq!(512 * 2048, info.mip_offset(1).unwrap().offset);
        // Mip2 sits right of mip1: 256 elements * 4 bytes.
        assert_eq!(512 * 2048 + 1024, info.mip_offset(2).unwrap().offset);
        // Chain height 512 + max(256, 128) = 768.
        assert_eq!(768, info.total_rows);
    }

    #[test]
    fn compressed_chain_works_in_block_units() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::TileY,
            Format::Bc1,
            256,
            256,
            1,
        );
        req.class = SurfaceClass::Compressed;
        let info = layout_texture(&req).unwrap();

        // 64 blocks * 8 bytes per block, padded to tile columns.
        assert_eq!(512, info.pitch);
        assert_eq!(64, info.total_rows);
        assert_eq!(info.size, info.pitch * info.total_rows);
    }

    #[test]
    fn array_qpitch_legacy_vs_gen9() {
        let legacy = PlatformInfo::new(GpuGen::Gen7, SkuFlags::default());
        let r = generic_restrictions(&legacy);
        let mut req = request(
            &legacy,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            128,
            128,
            3,
        );
        req.array_size = 4;
        let info = layout_texture(&req).unwrap();
        // h0 + h1 + 12 * VAlign = 128 + 64 + 48.
        assert_eq!(240, info.qpitch_rows);

        let gen9 = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&gen9);
        let mut req = request(
            &gen9,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            128,
            128,
            3,
        );
        req.array_size = 4;
        let info = layout_texture(&req).unwrap();
        // Packed chain: 128 + max(64, 32) = 192.
        assert_eq!(192, info.qpitch_rows);
        assert_eq!(192 * 4, info.total_rows);
    }

    #[test]
    fn legacy_3d_stacks_slices_per_mip() {
        let platform = PlatformInfo::new(GpuGen::Gen7, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            64,
            64,
            2,
        );
        req.resource_type = ResourceType::Tex3D;
        req.depth = 8;
        let info = layout_texture(&req).unwrap();

        assert_eq!(0, info.qpitch_rows);
        // 64 rows * 8 slices + 32 rows * 4 slices.
        assert_eq!(align_up_u64(64 * 8 + 32 * 4, 32), info.total_rows);
    }

    #[test]
    fn gen9_3d_uses_qpitch() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            64,
            64,
            1,
        );
        req.resource_type = ResourceType::Tex3D;
        req.depth = 8;
        let info = layout_texture(&req).unwrap();

        assert_eq!(64, info.qpitch_rows);
        assert_eq!(64 * 8, info.total_rows);
    }

    #[test]
    fn mip_tail_packs_small_levels() {
        let mut sku = SkuFlags::default();
        sku.tile_yf = true;
        let platform = PlatformInfo::new(GpuGen::Gen9, sku);
        let r = generic_restrictions(&platform);
        let info = layout_texture(&request(
            &platform,
            &r,
            TileMode::TileYf,
            Format::R8G8B8A8Unorm,
            256,
            256,
            9,
        ))
        .unwrap();

        // TileYf at 32bpp is 128B x 32 rows: LOD3 (32x32 elements, 128B
        // wide) is the first fit.
        assert_eq!(Some(3), info.mip_tail_start);
        let tail = info.mip_offset(3).unwrap();
        assert!(tail.in_mip_tail);
        assert!(info.mip_offset(4).unwrap().in_mip_tail);
        assert!(info.mip_offset(4).unwrap().offset < tail.offset + 4096);
        // Levels below the tail keep the column layout.
        assert!(!info.mip_offset(2).unwrap().in_mip_tail);
    }

    #[test]
    fn interleaved_depth_expands_footprint() {
        let platform = PlatformInfo::new(GpuGen::Gen7, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::TileY,
            Format::D32Float,
            128,
            128,
            1,
        );
        req.class = SurfaceClass::Depth;
        req.samples = 4;
        let info = layout_texture(&req).unwrap();

        // 4x expands 2x in each axis: 256 elements * 4 bytes.
        assert_eq!(1024, info.pitch);
        assert_eq!(256, info.total_rows);
    }

    #[test]
    fn pitch_cap_enforced() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let mut r = generic_restrictions(&platform);
        r.max_pitch = 4096;
        let err = layout_texture(&request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            4096,
            64,
            1,
        ))
        .unwrap_err();
        assert_eq!(
            LayoutError::PitchTooLarge {
                pitch: 16384,
                max: 4096
            },
            err
        );
    }

    #[test]
    fn compressed_stride_workaround() {
        let mut wa = Workarounds::default();
        wa.lossless_stride_4_tiles = true;
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default()).with_workarounds(wa);
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::TileY,
            Format::R8G8B8A8Unorm,
            64,
            64,
            1,
        );
        req.usage |= UsageFlags::RENDER_COMPRESSED;
        let info = layout_texture(&req).unwrap();
        assert_eq!(0, info.pitch % 512);
    }

    #[test]
    fn buffers_pad_for_overfetch() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let info = layout_buffer(&platform, &r, 1000, UsageFlags::empty()).unwrap();
        assert_eq!(TileMode::Linear, info.tile_mode);
        assert_eq!(4096, info.size);
        assert_eq!(1, info.total_rows);

        // Sampleable buffers gain a page of over-fetch slack, two pages
        // from Gen12 on.
        let sampled = layout_buffer(&platform, &r, 1000, UsageFlags::TEXTURE).unwrap();
        assert_eq!(8192, sampled.size);

        let gen12 = PlatformInfo::new(GpuGen::Gen12, SkuFlags::default());
        let sampled = layout_buffer(&gen12, &r, 1000, UsageFlags::TEXTURE).unwrap();
        assert_eq!(12288, sampled.size);
    }

    #[test]
    fn compressed_pitch_pads_to_four_tiles() {
        let platform = PlatformInfo::new(GpuGen::Gen12, SkuFlags::default());
        let r = generic_restrictions(&platform);
        let mut req = request(
            &platform,
            &r,
            TileMode::Tile4,
            Format::R8G8B8A8Unorm,
            64,
            64,
            1,
        );
        req.usage |= UsageFlags::RENDER_COMPRESSED;
        let info = layout_texture(&req).unwrap();
        // 64 * 4 bytes would fit two tile columns; compression forces four.
        assert_eq!(512, info.pitch);

        let mut sku = SkuFlags::default();
        sku.flat_physical_ccs = true;
        let flat = PlatformInfo::new(GpuGen::Gen12, sku);
        let r = generic_restrictions(&flat);
        let mut req = request(&flat, &r, TileMode::Tile4, Format::R8G8B8A8Unorm, 64, 64, 1);
        req.usage |= UsageFlags::RENDER_COMPRESSED;
        let info = layout_texture(&req).unwrap();
        assert_eq!(256, info.pitch);
    }
}
