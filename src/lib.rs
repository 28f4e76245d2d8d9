//! # igfx_layout
//! igfx_layout computes the exact memory layout of GPU surfaces for the
//! Intel Gen7 through Gen12 graphics generations.
//!
//! Given a resource description (dimensions, format, tiling preference and
//! usage flags), the crate produces the hardware-conformant placement of
//! every byte belonging to that resource: pitch, total size, per-mip and
//! per-plane byte offsets, auxiliary surface (CCS/MCS/HiZ) co-allocation,
//! and tiled CPU copies between a described surface and linear memory.
//!
//! # Getting Started
//! The following example lays out a mipmapped render target and queries the
//! lock offset of one of its mip levels.
/*!
```rust
use igfx_layout::{
    Format, GpuGen, LibraryContext, OffsetKind, OffsetRequest, ResourceDesc, ResourceInfo,
    ResourceType, SkuFlags, TilingFlags, UsageFlags,
};
# fn main() -> Result<(), igfx_layout::LayoutError> {
let ctx = LibraryContext::new(GpuGen::Gen9, SkuFlags::default());

let desc = ResourceDesc {
    resource_type: ResourceType::Tex2D,
    format: Format::R8G8B8A8Unorm,
    width: 1024,
    height: 1024,
    mip_levels: 11,
    usage: UsageFlags::RENDER_TARGET | UsageFlags::TEXTURE,
    tiling: TilingFlags::TILE_Y,
    ..ResourceDesc::default()
};

let info = ResourceInfo::create(&ctx, desc)?;
let offset = info.get_offset(OffsetRequest {
    mip_level: 3,
    kind: OffsetKind::Lock,
    ..OffsetRequest::default()
})?;
# Ok(())
# }
```
*/
//! # Scope
//! This is a layout computation library, not an allocator. It never touches
//! GPU memory; the caller supplies the backing allocation and can use
//! [blit::cpu_blt] to move bytes in and out of the tiled layout.
//!
//! All computation is synchronous and deterministic. A [LibraryContext] is
//! immutable after construction and may be shared freely between threads.
mod genops;
mod mipmap;
mod restrictions;
mod tilemode;

pub mod aux_surface;
pub mod blit;
pub mod format;
pub mod planar;
pub mod platform;
pub mod resource;
pub mod texture;

// Avoid making this module public to prevent people importing it accidentally.
#[cfg(feature = "ffi")]
mod ffi;

pub use format::Format;
pub use platform::{GpuGen, LibraryContext, PlatformInfo, SkuFlags, TileMode, Workarounds};
pub use resource::{
    AuxKind, InfoFlags, OffsetInfo, OffsetKind, OffsetRequest, ResourceDesc, ResourceInfo,
    ResourceType, TilingFlags, UsageFlags,
};
pub use restrictions::Restrictions;
pub use texture::TextureInfo;

/// The page granularity all finished surface sizes are rounded to.
pub const PAGE_SIZE: u64 = 4096;

/// Errors that can occur while computing a surface layout or resolving an
/// offset or blit request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The format is outside the table or not supported on the target generation.
    #[error("format {format:?} is not supported on {gen:?}")]
    UnsupportedFormat { format: Format, gen: GpuGen },

    /// No GPU usage flag was set for a resource type that requires one.
    #[error("no GPU usage flag set for resource type {resource_type:?}")]
    MissingUsage { resource_type: ResourceType },

    /// No tiling preference bit was set on the request.
    #[error("no tiling preference set")]
    MissingTilingPreference,

    /// A base dimension is zero or outside the generation's restriction bounds.
    #[error("dimensions {width}x{height}x{depth} are outside the supported range")]
    InvalidDimensions { width: u32, height: u32, depth: u32 },

    /// The array size exceeds the generation limit.
    #[error("array size {array_size} exceeds the limit of {max}")]
    ArraySizeTooLarge { array_size: u32, max: u32 },

    /// The sample count is not one of 1, 2, 4, 8 or 16, or is illegal for
    /// the generation, format or tiling combination.
    #[error("sample count {samples} is not supported for this request")]
    InvalidSampleCount { samples: u32 },

    /// The computed pitch exceeds the per-generation maximum.
    #[error("pitch {pitch} exceeds the maximum of {max}")]
    PitchTooLarge { pitch: u64, max: u64 },

    /// A caller-supplied pitch is smaller than the computed layout needs or
    /// breaks the required pitch alignment.
    #[error("pitch override of {pitch} does not satisfy the required pitch of {required}")]
    InvalidPitchOverride { pitch: u64, required: u64 },

    /// The computed size exceeds the per-generation maximum surface size.
    #[error("surface size {size} exceeds the maximum of {max}")]
    SizeTooLarge { size: u64, max: u64 },

    /// An auxiliary surface (CCS/MCS/HiZ/unified aux) rule was violated.
    #[error("illegal auxiliary surface request: {reason}")]
    IllegalAuxRequest { reason: &'static str },

    /// An offset query referenced a mip, array index or plane the resource
    /// does not have.
    #[error("offset request out of range: mip {mip_level}, array {array_index}, plane {plane}")]
    InvalidOffsetRequest {
        mip_level: u32,
        array_index: u32,
        plane: u32,
    },

    /// A caller-provided buffer does not contain enough bytes.
    #[error("not enough data: expected {expected_size} bytes but found {actual_size} bytes")]
    NotEnoughData {
        expected_size: usize,
        actual_size: usize,
    },

    /// A caller-managed system memory region is too small for the computed layout.
    #[error(
        "existing system memory of {provided} bytes is smaller than the layout of {required} bytes"
    )]
    ExistingSysMemTooSmall { provided: u64, required: u64 },
}

/// Calculates the division of `x` by `d` but rounds up rather than truncating.
///
/// # Examples
/**
```rust
# use igfx_layout::div_round_up;
assert_eq!(2, div_round_up(8, 4));
assert_eq!(3, div_round_up(10, 4));
```
 */
#[inline]
pub const fn div_round_up(x: u32, d: u32) -> u32 {
    (x + d - 1) / d
}

/// Rounds `x` up to the next multiple of `n`.
///
/// # Examples
/**
```rust
# use igfx_layout::align_up;
assert_eq!(128, align_up(100, 128));
assert_eq!(128, align_up(128, 128));
```
 */
#[inline]
pub const fn align_up(x: u32, n: u32) -> u32 {
    ((x + n - 1) / n) * n
}

#[inline]
pub(crate) const fn align_up_u64(x: u64, n: u64) -> u64 {
    ((x + n - 1) / n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_round_up_exact_and_partial() {
        assert_eq!(1, div_round_up(1, 4));
        assert_eq!(1, div_round_up(4, 4));
        assert_eq!(2, div_round_up(5, 4));
        assert_eq!(10, div_round_up(10, 1));
    }

    #[test]
    fn align_up_page() {
        assert_eq!(0, align_up(0, 4096));
        assert_eq!(4096, align_up(1, 4096));
        assert_eq!(4096, align_up(4096, 4096));
        assert_eq!(8192, align_up(4097, 4096));
    }

    #[test]
    fn align_up_u64_row_pitch() {
        assert_eq!(266240, align_up_u64(266240, 266240));
        assert_eq!(532480, align_up_u64(266241, 266240));
    }
}
