//! Auxiliary surface derivation.
//!
//! CCS, MCS and HiZ surfaces reinterpret the main surface's finished
//! geometry under a fixed downscale rule and run the result back through
//! the layout engine. Unified-aux placement then pads the main surface so
//! the whole allocation tiles cleanly.

use crate::format::Format;
use crate::genops::{ops_for, SurfaceClass};
use crate::platform::{PlatformInfo, TileMode};
use crate::resource::{ResourceDesc, ResourceType, UsageFlags};
use crate::restrictions::Restrictions;
use crate::texture::{layout_texture, LayoutRequest, TextureInfo};
use crate::{align_up, align_up_u64, LayoutError};

/// Tile modes whose 4KB/64KB tile grid the compression hardware can track.
fn ccs_capable_tiling(mode: TileMode) -> bool {
    matches!(
        mode,
        TileMode::TileY | TileMode::TileYf | TileMode::TileYs | TileMode::Tile4 | TileMode::Tile64
    )
}

/// Checks every aux compatibility rule before any aux sizing runs.
pub(crate) fn validate_aux(
    platform: &PlatformInfo,
    desc: &ResourceDesc,
    tile_mode: TileMode,
) -> Result<(), LayoutError> {
    let usage = desc.usage;
    let wants_ccs = usage.intersects(
        UsageFlags::CCS | UsageFlags::RENDER_COMPRESSED | UsageFlags::MEDIA_COMPRESSED,
    );

    if usage.contains(UsageFlags::RENDER_COMPRESSED | UsageFlags::MEDIA_COMPRESSED) {
        return Err(LayoutError::IllegalAuxRequest {
            reason: "render and media compression are mutually exclusive",
        });
    }

    if wants_ccs && !platform.sku.flat_physical_ccs {
        let legal = match desc.resource_type {
            ResourceType::Buffer => tile_mode == TileMode::Linear,
            ResourceType::Tex2D | ResourceType::Tex3D | ResourceType::Cube => {
                ccs_capable_tiling(tile_mode)
            }
            _ => false,
        };
        if !legal {
            tracing::debug!(resource_type = ?desc.resource_type, ?tile_mode, "ccs rejected");
            return Err(LayoutError::IllegalAuxRequest {
                reason: "ccs requires a linear buffer or a 4KB/64KB-tiled surface",
            });
        }
        if desc.format.is_planar() && !ops_for(platform.gen).planar_ccs_supported() {
            return Err(LayoutError::IllegalAuxRequest {
                reason: "planar compression is not supported on this generation",
            });
        }
    }

    if wants_ccs && desc.samples > 1 && !usage.contains(UsageFlags::MCS) {
        return Err(LayoutError::IllegalAuxRequest {
            reason: "multisampled ccs requires an mcs",
        });
    }
    if usage.contains(UsageFlags::MCS) && desc.samples <= 1 {
        return Err(LayoutError::IllegalAuxRequest {
            reason: "mcs requires a multisampled surface",
        });
    }
    if usage.contains(UsageFlags::HIZ) && !usage.contains(UsageFlags::DEPTH) {
        return Err(LayoutError::IllegalAuxRequest {
            reason: "hiz requires a depth surface",
        });
    }

    if usage.contains(UsageFlags::UNIFIED_AUX) {
        let ccs_path = wants_ccs
            && desc.samples <= 1
            && usage.intersects(UsageFlags::RENDER_TARGET | UsageFlags::TEXTURE);
        let depth_path =
            usage.intersects(UsageFlags::DEPTH | UsageFlags::STENCIL) || desc.samples > 1;
        if !ccs_path && !depth_path {
            return Err(LayoutError::IllegalAuxRequest {
                reason: "unified aux requires compression, depth/stencil, or msaa",
            });
        }
    }

    Ok(())
}

/// CCS extent in (bytes, rows) for a `width_bytes` x `rows` region of the
/// main surface. The region is first rounded up to the fast-clear
/// granularity, then divided by the fixed sizing downscale.
pub fn ccs_dimensions(
    platform: &PlatformInfo,
    main_mode: TileMode,
    width_bytes: u64,
    rows: u64,
) -> (u64, u64) {
    let ops = ops_for(platform.gen);
    let (clear_bytes, clear_rows) = ops.fast_clear_granularity(main_mode);
    let (down_x, down_y) = ops.ccs_downscale(main_mode);
    let width = align_up_u64(width_bytes, clear_bytes as u64) / down_x as u64;
    let rows = align_up_u64(rows, clear_rows as u64) / down_y as u64;
    (width, rows)
}

/// Lays out the CCS covering a `width_bytes` x `rows` region of the main
/// surface as an 8bpp TileY/Tile4 surface.
pub(crate) fn layout_ccs(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    main_mode: TileMode,
    width_bytes: u64,
    rows: u64,
) -> Result<TextureInfo, LayoutError> {
    let (ccs_bytes, ccs_rows) = ccs_dimensions(platform, main_mode, width_bytes, rows);
    let req = LayoutRequest {
        platform,
        restrictions,
        tile_mode: aux_tile_mode(platform),
        format: Format::R8Unorm,
        resource_type: ResourceType::Tex2D,
        usage: UsageFlags::CCS,
        width: ccs_bytes as u32,
        height: ccs_rows.max(1) as u32,
        depth: 1,
        array_size: 1,
        mip_levels: 1,
        samples: 1,
        class: SurfaceClass::Other,
    };
    layout_texture(&req)
}

/// Lays out the MCS for a multisampled render target. Sample state packs
/// into a single-sampled surface of a samples-dependent placeholder format.
pub(crate) fn layout_mcs(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    desc: &ResourceDesc,
) -> Result<TextureInfo, LayoutError> {
    let req = LayoutRequest {
        platform,
        restrictions,
        tile_mode: aux_tile_mode(platform),
        format: ops_for(platform.gen).msaa_ccs_format(desc.samples),
        resource_type: ResourceType::Tex2D,
        usage: UsageFlags::MCS,
        width: desc.width,
        height: desc.height,
        depth: 1,
        array_size: desc.array_size.max(1),
        mip_levels: 1,
        samples: 1,
        class: SurfaceClass::Other,
    };
    layout_texture(&req)
}

/// HiZ pixels-per-byte packing along each axis.
const HIZ_DOWNSCALE: (u32, u32) = (2, 2);

/// Lays out the HiZ surface for a depth buffer.
pub(crate) fn layout_hiz(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    desc: &ResourceDesc,
) -> Result<TextureInfo, LayoutError> {
    // HiZ works in 16x8 aligned depth blocks packed two pixels per byte.
    let width = align_up(desc.width, 16) / HIZ_DOWNSCALE.0;
    let height = align_up(desc.height, 8) / HIZ_DOWNSCALE.1;
    let req = LayoutRequest {
        platform,
        restrictions,
        tile_mode: aux_tile_mode(platform),
        format: Format::R8Unorm,
        resource_type: ResourceType::Tex2D,
        usage: UsageFlags::HIZ,
        width: width.max(1),
        height: height.max(1),
        depth: 1,
        array_size: desc.array_size.max(1),
        mip_levels: desc.mip_levels.max(1),
        samples: 1,
        class: SurfaceClass::SeparateStencil,
    };
    layout_texture(&req)
}

/// Legacy Y tiling before Gen12, Tile4 after.
fn aux_tile_mode(platform: &PlatformInfo) -> TileMode {
    if platform.gen >= crate::platform::GpuGen::Gen12 {
        TileMode::Tile4
    } else {
        TileMode::TileY
    }
}

/// Placement of a unified-aux allocation: main surface tail padding, aux
/// offsets, and the indirect clear color reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnifiedAuxPlan {
    /// Main surface size after tail padding.
    pub padded_main_size: u64,
    /// Byte offset of each aux surface, in the order given.
    pub aux_offsets: Vec<u64>,
    /// Byte offset of the indirect clear color page, when reserved.
    pub clear_color_offset: Option<u64>,
    /// Total allocation size.
    pub total_size: u64,
}

/// Co-locates aux surfaces after the main surface. The main tail pads so
/// that main plus aux ends on a tile-row-pitch boundary, which fence and
/// GGTT aliasing need.
pub(crate) fn plan_unified_aux(
    platform: &PlatformInfo,
    desc: &ResourceDesc,
    main: &TextureInfo,
    aux_sizes: &[u64],
    reserve_clear_color: bool,
) -> UnifiedAuxPlan {
    let tile = platform.tile_geometry(main.tile_mode, 32, 1, false);
    let row_pitch = main.pitch * tile.height_rows as u64;
    let aux_total: u64 = aux_sizes.iter().sum();

    let padded_main_size = if row_pitch > 0 {
        align_up_u64(main.size + aux_total, row_pitch) - aux_total
    } else {
        main.size
    };

    let mut aux_offsets = Vec::with_capacity(aux_sizes.len());
    let mut cursor = padded_main_size;
    for &size in aux_sizes {
        aux_offsets.push(cursor);
        cursor += size;
    }

    let clear_color_offset = if reserve_clear_color {
        let reservation = if desc.usage.contains(UsageFlags::TILED_RESOURCE) {
            65536
        } else {
            4096
        };
        let offset = cursor;
        cursor += reservation;
        Some(offset)
    } else {
        None
    };

    UnifiedAuxPlan {
        padded_main_size,
        aux_offsets,
        clear_color_offset,
        total_size: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{GpuGen, SkuFlags};
    use crate::resource::TilingFlags;
    use crate::restrictions::resolve_restrictions;

    fn desc(usage: UsageFlags, tiling: TilingFlags, samples: u32) -> ResourceDesc {
        ResourceDesc {
            format: Format::R8G8B8A8Unorm,
            width: 256,
            height: 256,
            samples,
            usage,
            tiling,
            ..ResourceDesc::default()
        }
    }

    #[test]
    fn ccs_downscale_tile_y() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        // NV12 luma plane of scenario-sized surface: 8320B x 640 rows
        // rounds to (8704, 640) then divides by (32, 32).
        assert_eq!(
            (272, 20),
            ccs_dimensions(&platform, TileMode::TileY, 8320, 640)
        );
        // Chroma half: 320 rows round to 384.
        assert_eq!(
            (272, 12),
            ccs_dimensions(&platform, TileMode::TileY, 8320, 320)
        );
    }

    #[test]
    fn ccs_downscale_tile_x() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        assert_eq!(
            (16, 4),
            ccs_dimensions(&platform, TileMode::TileX, 1024, 64)
        );
    }

    #[test]
    fn ccs_layout_rounds_to_aux_tiles() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        let d = desc(UsageFlags::RENDER_TARGET | UsageFlags::CCS, TilingFlags::TILE_Y, 1);
        let r = resolve_restrictions(&platform, &d).unwrap();
        let ccs = layout_ccs(&platform, &r, TileMode::TileY, 8320, 640).unwrap();
        assert_eq!(TileMode::TileY, ccs.tile_mode);
        assert_eq!(384, ccs.pitch);
        assert_eq!(32, ccs.total_rows);
        assert_eq!(0x3000, ccs.size);
    }

    #[test]
    fn mcs_uses_placeholder_format() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = desc(
            UsageFlags::RENDER_TARGET | UsageFlags::MCS,
            TilingFlags::TILE_Y,
            4,
        );
        let r = resolve_restrictions(&platform, &d).unwrap();
        let mcs = layout_mcs(&platform, &r, &d).unwrap();
        // 4x packs one byte per pixel: 256 bytes padded to tile columns.
        assert_eq!(256, mcs.pitch);
        assert_eq!(256, mcs.total_rows);
    }

    #[test]
    fn hiz_halves_the_depth_footprint() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = ResourceDesc {
            format: Format::D32Float,
            width: 512,
            height: 512,
            usage: UsageFlags::DEPTH | UsageFlags::HIZ,
            tiling: TilingFlags::TILE_Y,
            ..ResourceDesc::default()
        };
        let r = resolve_restrictions(&platform, &d).unwrap();
        let hiz = layout_hiz(&platform, &r, &d).unwrap();
        assert_eq!(256, hiz.pitch);
        assert_eq!(256, hiz.total_rows);
    }

    #[test]
    fn unified_plan_pads_main_to_row_pitch() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        let d = desc(
            UsageFlags::RENDER_TARGET | UsageFlags::CCS | UsageFlags::UNIFIED_AUX,
            TilingFlags::TILE_Y,
            1,
        );
        let r = resolve_restrictions(&platform, &d).unwrap();
        let req = LayoutRequest {
            platform: &platform,
            restrictions: &r,
            tile_mode: TileMode::TileY,
            format: Format::R8G8B8A8Unorm,
            resource_type: ResourceType::Tex2D,
            usage: d.usage,
            width: 256,
            height: 256,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            samples: 1,
            class: SurfaceClass::Other,
        };
        let main = layout_texture(&req).unwrap();
        let plan = plan_unified_aux(&platform, &d, &main, &[0x3000, 0x3000], true);

        let row_pitch = main.pitch * 32;
        assert_eq!(0, (plan.padded_main_size + 0x6000) % row_pitch);
        assert_eq!(plan.padded_main_size, plan.aux_offsets[0]);
        assert_eq!(plan.padded_main_size + 0x3000, plan.aux_offsets[1]);
        assert_eq!(Some(plan.padded_main_size + 0x6000), plan.clear_color_offset);
        assert_eq!(plan.clear_color_offset.unwrap() + 4096, plan.total_size);
    }

    #[test]
    fn ccs_rejected_on_legacy_x_tiling() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = desc(UsageFlags::RENDER_TARGET | UsageFlags::CCS, TilingFlags::TILE_X, 1);
        let err = validate_aux(&platform, &d, TileMode::TileX).unwrap_err();
        assert!(matches!(err, LayoutError::IllegalAuxRequest { .. }));
    }

    #[test]
    fn ccs_allowed_with_flat_physical_ccs() {
        let mut sku = SkuFlags::default();
        sku.flat_physical_ccs = true;
        let platform = PlatformInfo::new(GpuGen::Gen12, sku);
        let d = desc(UsageFlags::RENDER_TARGET | UsageFlags::CCS, TilingFlags::TILE_X, 1);
        assert_eq!(Ok(()), validate_aux(&platform, &d, TileMode::TileX));
    }

    #[test]
    fn compression_kinds_are_exclusive() {
        let platform = PlatformInfo::new(GpuGen::Gen12, SkuFlags::default());
        let d = desc(
            UsageFlags::RENDER_TARGET
                | UsageFlags::RENDER_COMPRESSED
                | UsageFlags::MEDIA_COMPRESSED,
            TilingFlags::TILE_4,
            1,
        );
        let err = validate_aux(&platform, &d, TileMode::Tile4).unwrap_err();
        assert_eq!(
            LayoutError::IllegalAuxRequest {
                reason: "render and media compression are mutually exclusive",
            },
            err
        );
    }

    #[test]
    fn msaa_ccs_needs_mcs() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = desc(UsageFlags::RENDER_TARGET | UsageFlags::CCS, TilingFlags::TILE_Y, 4);
        let err = validate_aux(&platform, &d, TileMode::TileY).unwrap_err();
        assert_eq!(
            LayoutError::IllegalAuxRequest {
                reason: "multisampled ccs requires an mcs",
            },
            err
        );
    }

    #[test]
    fn mcs_needs_msaa() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = desc(UsageFlags::RENDER_TARGET | UsageFlags::MCS, TilingFlags::TILE_Y, 1);
        assert!(validate_aux(&platform, &d, TileMode::TileY).is_err());
    }

    #[test]
    fn unified_aux_needs_a_consumer() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = desc(UsageFlags::TEXTURE | UsageFlags::UNIFIED_AUX, TilingFlags::TILE_Y, 1);
        assert!(validate_aux(&platform, &d, TileMode::TileY).is_err());
    }

    #[test]
    fn planar_ccs_gated_by_generation() {
        let gen9 = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let d = ResourceDesc {
            format: Format::Nv12,
            width: 256,
            height: 256,
            usage: UsageFlags::TEXTURE | UsageFlags::MEDIA_COMPRESSED,
            tiling: TilingFlags::TILE_Y,
            ..ResourceDesc::default()
        };
        assert!(validate_aux(&gen9, &d, TileMode::TileY).is_err());

        let gen11 = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        assert_eq!(Ok(()), validate_aux(&gen11, &d, TileMode::TileY));
    }
}
