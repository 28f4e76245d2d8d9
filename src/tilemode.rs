//! The tile mode selector: resolves a tiling preference flag set to exactly
//! one concrete [TileMode] and normalizes the flag set in place.

use crate::format::Format;
use crate::platform::{GpuGen, PlatformInfo, TileMode};
use crate::resource::{ResourceType, TilingFlags};
use crate::LayoutError;

/// Resolves the concrete tile mode for a request.
///
/// Selection precedence, highest first: standard tiling (TileYf or the 64KB
/// class, dispatched through the per-bpp geometry tables) → the explicit
/// 4KB tile flag of the generation → TileX → TileW → Linear.
///
/// Side effect: `tiling` is normalized so exactly one flag remains set,
/// consistent with the returned mode. All later layout stages rely on the
/// normalized set.
pub(crate) fn select_tile_mode(
    platform: &PlatformInfo,
    format: Format,
    resource_type: ResourceType,
    samples: u32,
    tiling: &mut TilingFlags,
) -> Result<TileMode, LayoutError> {
    if tiling.is_empty() {
        tracing::debug!(?resource_type, "rejecting request with no tiling preference");
        return Err(LayoutError::MissingTilingPreference);
    }

    let gen12 = platform.gen >= GpuGen::Gen12;
    let bits = format.bits_per_element();

    let mut wants_64kb = tiling.intersects(TilingFlags::TILE_YS | TilingFlags::TILE_64);
    let mut wants_yf = tiling.contains(TilingFlags::TILE_YF);

    // Standard tile geometry is keyed by element size, and a planar
    // surface carries two: the chroma plane's differs from the luma
    // plane's. Planar formats stay on the size-invariant 4KB modes.
    if format.is_planar() && (wants_64kb || wants_yf) {
        wants_64kb = false;
        wants_yf = false;
        *tiling |= TilingFlags::TILE_Y | TilingFlags::TILE_4;
    }

    let mode = if wants_64kb || wants_yf {
        // The standard modes only exist for power-of-two element sizes;
        // the geometry tables have no entry otherwise.
        if !matches!(bits, 8 | 16 | 32 | 64 | 128) {
            return Err(LayoutError::UnsupportedFormat {
                format,
                gen: platform.gen,
            });
        }
        select_standard(platform, samples, wants_64kb, gen12)
    } else if tiling.intersects(TilingFlags::TILE_Y | TilingFlags::TILE_4) {
        if gen12 {
            TileMode::Tile4
        } else {
            TileMode::TileY
        }
    } else if tiling.contains(TilingFlags::TILE_X) {
        TileMode::TileX
    } else if tiling.contains(TilingFlags::TILE_W) {
        TileMode::TileW
    } else {
        TileMode::Linear
    };

    *tiling = flag_for(mode);
    debug_assert_eq!(1, tiling.bits().count_ones());
    Ok(mode)
}

fn select_standard(platform: &PlatformInfo, samples: u32, wants_64kb: bool, gen12: bool) -> TileMode {
    if platform.gen < GpuGen::Gen9 {
        // No standard tiling before Gen9; fall back to the legacy 4KB mode.
        return TileMode::TileY;
    }
    if wants_64kb {
        if platform.sku.tile_64kb {
            return if gen12 { TileMode::Tile64 } else { TileMode::TileYs };
        }
        // The SKU disallows 64KB tiles; degrade to the 4KB class.
    }
    // TileYf does not store multisampled surfaces; promote to the 64KB
    // class when possible, otherwise the legacy 4KB mode.
    if gen12 {
        if samples > 1 && platform.sku.tile_64kb {
            return TileMode::Tile64;
        }
        return TileMode::Tile4;
    }
    if samples > 1 {
        return if platform.sku.tile_64kb {
            TileMode::TileYs
        } else {
            TileMode::TileY
        };
    }
    if platform.sku.tile_yf {
        TileMode::TileYf
    } else {
        TileMode::TileY
    }
}

pub(crate) fn flag_for(mode: TileMode) -> TilingFlags {
    match mode {
        TileMode::Linear => TilingFlags::LINEAR,
        TileMode::TileX => TilingFlags::TILE_X,
        TileMode::TileW => TilingFlags::TILE_W,
        TileMode::TileY => TilingFlags::TILE_Y,
        TileMode::TileYf => TilingFlags::TILE_YF,
        TileMode::TileYs => TilingFlags::TILE_YS,
        TileMode::Tile4 => TilingFlags::TILE_4,
        TileMode::Tile64 => TilingFlags::TILE_64,
    }
}
