//! The restriction resolver: maps a resource type and usage flag set to the
//! most restrictive applicable alignment and pitch/size bounds.
//!
//! Overlays only ever widen an alignment or restriction value, so they
//! compose regardless of application order. The sequence below is still
//! fixed to keep the resolved record reproducible.

use crate::platform::{GpuGen, PlatformInfo};
use crate::resource::{InfoFlags, ResourceDesc, ResourceType, TilingFlags, UsageFlags};
use crate::LayoutError;

/// The alignment and bound record applicable to one surface layout call.
///
/// Transient: recomputed for every surface (main, aux or per-plane) being
/// laid out, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restrictions {
    /// Base allocation alignment in bytes.
    pub alignment: u64,
    /// Pitch alignment in bytes for the stored surface.
    pub pitch_alignment: u32,
    /// Pitch alignment for CPU lock mappings.
    pub lock_pitch_alignment: u32,
    /// Pitch alignment required when the surface is a render target.
    pub render_pitch_alignment: u32,
    pub min_pitch: u32,
    pub max_pitch: u64,
    pub min_width: u32,
    pub min_height: u32,
    pub min_depth: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub max_depth: u32,
    pub max_array_size: u32,
}

/// Base restriction table entries, selected by resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Generic,
    LinearBuffer,
    Primary,
    Cursor,
    NoRestriction,
}

fn category_for(resource_type: ResourceType) -> Category {
    match resource_type {
        ResourceType::Buffer => Category::LinearBuffer,
        ResourceType::Primary => Category::Primary,
        ResourceType::Cursor => Category::Cursor,
        ResourceType::Shadow | ResourceType::Staging => Category::NoRestriction,
        ResourceType::Tex1D
        | ResourceType::Tex2D
        | ResourceType::Tex3D
        | ResourceType::Cube => Category::Generic,
    }
}

/// Resource types that may be created without any GPU usage flag.
fn usage_exempt(resource_type: ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Primary | ResourceType::Shadow | ResourceType::Staging | ResourceType::Cursor
    )
}

fn base_restrictions(platform: &PlatformInfo, category: Category) -> Restrictions {
    let max_pitch = platform.max_pitch();
    match category {
        Category::Generic => Restrictions {
            alignment: 4096,
            pitch_alignment: 64,
            lock_pitch_alignment: 32,
            render_pitch_alignment: 64,
            min_pitch: 32,
            max_pitch,
            min_width: 1,
            min_height: 1,
            min_depth: 1,
            max_width: 16384,
            max_height: 16384,
            max_depth: 2048,
            max_array_size: 2048,
        },
        Category::LinearBuffer => Restrictions {
            alignment: 4096,
            pitch_alignment: 1,
            lock_pitch_alignment: 1,
            render_pitch_alignment: 1,
            min_pitch: 1,
            max_pitch: u64::MAX,
            min_width: 1,
            min_height: 1,
            min_depth: 1,
            max_width: u32::MAX,
            max_height: 1,
            max_depth: 1,
            max_array_size: 1,
        },
        Category::Primary => Restrictions {
            alignment: 65536,
            pitch_alignment: 64,
            lock_pitch_alignment: 64,
            render_pitch_alignment: 64,
            min_pitch: 64,
            max_pitch,
            min_width: 1,
            min_height: 1,
            min_depth: 1,
            max_width: 16384,
            max_height: 16384,
            max_depth: 1,
            max_array_size: 1,
        },
        Category::Cursor => Restrictions {
            alignment: 4096,
            pitch_alignment: 64,
            lock_pitch_alignment: 64,
            render_pitch_alignment: 64,
            min_pitch: 64,
            max_pitch,
            min_width: 1,
            min_height: 1,
            min_depth: 1,
            max_width: 256,
            max_height: 256,
            max_depth: 1,
            max_array_size: 1,
        },
        Category::NoRestriction => Restrictions {
            alignment: 4096,
            pitch_alignment: 1,
            lock_pitch_alignment: 1,
            render_pitch_alignment: 1,
            min_pitch: 1,
            max_pitch: u64::MAX,
            min_width: 1,
            min_height: 1,
            min_depth: 1,
            max_width: u32::MAX,
            max_height: u32::MAX,
            max_depth: u32::MAX,
            max_array_size: u32::MAX,
        },
    }
}

/// Resolves the restriction record for `desc`.
///
/// Fails with [LayoutError::MissingUsage] if no GPU usage flag is set for a
/// resource type outside the flag-exempt set.
pub fn resolve_restrictions(
    platform: &PlatformInfo,
    desc: &ResourceDesc,
) -> Result<Restrictions, LayoutError> {
    if desc.usage.is_empty() && !usage_exempt(desc.resource_type) {
        tracing::debug!(resource_type = ?desc.resource_type, "rejecting request with no usage flags");
        return Err(LayoutError::MissingUsage {
            resource_type: desc.resource_type,
        });
    }

    let mut r = base_restrictions(platform, category_for(desc.resource_type));

    // Overlays widen only, applied in a fixed sequence.
    if desc.usage.contains(UsageFlags::TILED_RESOURCE) {
        r.alignment = r.alignment.max(65536);
    }
    if desc.usage.contains(UsageFlags::S3D) && desc.tiling.contains(TilingFlags::LINEAR) {
        r.alignment = r.alignment.max(4096);
    }
    if desc
        .usage
        .intersects(UsageFlags::RENDER_COMPRESSED | UsageFlags::MEDIA_COMPRESSED)
    {
        r.alignment = r.alignment.max(16384);
    }
    if desc.info.contains(InfoFlags::YUV_SHADER_FRIENDLY) && desc.format.is_planar() {
        r.pitch_alignment = r.pitch_alignment.max(2048);
    }
    if platform.gen >= GpuGen::Gen9
        && desc.usage.contains(UsageFlags::FLIP_CHAIN)
        && desc.tiling.intersects(TilingFlags::TILE_Y | TilingFlags::TILE_4)
    {
        r.alignment = r.alignment.max(1 << 20);
    }

    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::platform::SkuFlags;

    fn desc(resource_type: ResourceType, usage: UsageFlags, tiling: TilingFlags) -> ResourceDesc {
        ResourceDesc {
            resource_type,
            format: Format::R8G8B8A8Unorm,
            width: 64,
            height: 64,
            usage,
            tiling,
            ..ResourceDesc::default()
        }
    }

    #[test]
    fn missing_usage_rejected_for_textures() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let result = resolve_restrictions(
            &platform,
            &desc(ResourceType::Tex2D, UsageFlags::empty(), TilingFlags::TILE_Y),
        );
        assert_eq!(
            Err(LayoutError::MissingUsage {
                resource_type: ResourceType::Tex2D
            }),
            result
        );
    }

    #[test]
    fn missing_usage_allowed_for_exempt_types() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        for t in [
            ResourceType::Primary,
            ResourceType::Shadow,
            ResourceType::Staging,
            ResourceType::Cursor,
        ] {
            assert!(
                resolve_restrictions(&platform, &desc(t, UsageFlags::empty(), TilingFlags::LINEAR))
                    .is_ok()
            );
        }
    }

    #[test]
    fn tiled_resource_widens_alignment() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::TEXTURE | UsageFlags::TILED_RESOURCE,
                TilingFlags::TILE_YS,
            ),
        )
        .unwrap();
        assert_eq!(65536, r.alignment);
    }

    #[test]
    fn compressed_usage_needs_16k_alignment() {
        let platform = PlatformInfo::new(GpuGen::Gen12, SkuFlags::default());
        let r = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::RENDER_TARGET | UsageFlags::RENDER_COMPRESSED,
                TilingFlags::TILE_4,
            ),
        )
        .unwrap();
        assert_eq!(16384, r.alignment);
    }

    #[test]
    fn skl_tile_y_display_needs_1mb_alignment() {
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let r = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::RENDER_TARGET | UsageFlags::FLIP_CHAIN,
                TilingFlags::TILE_Y,
            ),
        )
        .unwrap();
        assert_eq!(1 << 20, r.alignment);

        // Pre-Gen9 keeps the base alignment.
        let platform = PlatformInfo::new(GpuGen::Gen8, SkuFlags::default());
        let r = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::RENDER_TARGET | UsageFlags::FLIP_CHAIN,
                TilingFlags::TILE_Y,
            ),
        )
        .unwrap();
        assert_eq!(4096, r.alignment);
    }

    #[test]
    fn yuv_shader_friendly_pitch() {
        let platform = PlatformInfo::new(GpuGen::Gen11, SkuFlags::default());
        let mut d = desc(
            ResourceType::Tex2D,
            UsageFlags::TEXTURE,
            TilingFlags::TILE_Y,
        );
        d.format = Format::Nv12;
        d.info = InfoFlags::YUV_SHADER_FRIENDLY;
        let r = resolve_restrictions(&platform, &d).unwrap();
        assert_eq!(2048, r.pitch_alignment);

        // Without the info bit the base pitch alignment applies.
        d.info = InfoFlags::empty();
        let r = resolve_restrictions(&platform, &d).unwrap();
        assert_eq!(64, r.pitch_alignment);
    }

    #[test]
    fn overlays_are_monotonic() {
        // Stacking every overlay can only increase the resolved values.
        let platform = PlatformInfo::new(GpuGen::Gen9, SkuFlags::default());
        let plain = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::RENDER_TARGET,
                TilingFlags::TILE_Y,
            ),
        )
        .unwrap();
        let stacked = resolve_restrictions(
            &platform,
            &desc(
                ResourceType::Tex2D,
                UsageFlags::RENDER_TARGET
                    | UsageFlags::FLIP_CHAIN
                    | UsageFlags::TILED_RESOURCE
                    | UsageFlags::RENDER_COMPRESSED,
                TilingFlags::TILE_Y,
            ),
        )
        .unwrap();
        assert!(stacked.alignment >= plain.alignment);
        assert!(stacked.pitch_alignment >= plain.pitch_alignment);
    }
}
