//! The resource facade: request validation, layout orchestration and the
//! query surface.
//!
//! [ResourceInfo::create] drives the full pipeline for one resource:
//! restriction resolution, tile mode selection, main surface layout (with
//! per-plane placement for planar formats), auxiliary surface derivation
//! and unified-aux co-allocation. The finished value is immutable and safe
//! to query from any number of threads.

use bitflags::bitflags;

use crate::aux_surface::{
    layout_ccs, layout_hiz, layout_mcs, plan_unified_aux, validate_aux,
};
use crate::format::{Format, PlanarFamily};
use crate::genops::{ops_for, SurfaceClass};
use crate::mipmap::mip_extent;
use crate::planar::{layout_planar, PlanarRequest, PlaneLayout};
use crate::platform::{LibraryContext, PlatformInfo, TileMode};
use crate::restrictions::{resolve_restrictions, Restrictions};
use crate::texture::{layout_buffer, layout_texture, LayoutRequest, TextureInfo};
use crate::tilemode::select_tile_mode;
use crate::{align_up, align_up_u64, div_round_up, LayoutError};

/// Client-visible resource shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Buffer,
    Tex1D,
    Tex2D,
    Tex3D,
    Cube,
    /// A scan-out (display) surface.
    Primary,
    /// A CPU-visible copy of a primary surface.
    Shadow,
    Staging,
    Cursor,
}

bitflags! {
    /// GPU usage classes a resource participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UsageFlags: u32 {
        const RENDER_TARGET = 1 << 0;
        const TEXTURE = 1 << 1;
        const DEPTH = 1 << 2;
        const STENCIL = 1 << 3;
        const HIZ = 1 << 4;
        const CCS = 1 << 5;
        const MCS = 1 << 6;
        /// Co-allocate the aux surfaces directly after the main surface.
        const UNIFIED_AUX = 1 << 7;
        const FLIP_CHAIN = 1 << 8;
        /// Sparse (tiled resource) binding.
        const TILED_RESOURCE = 1 << 9;
        /// Lossless render target compression. Implies a CCS.
        const RENDER_COMPRESSED = 1 << 10;
        /// Media (fixed-function) compression. Implies a CCS.
        const MEDIA_COMPRESSED = 1 << 11;
        /// Stereoscopic 3D: the allocation carries two stacked frames.
        const S3D = 1 << 12;
    }
}

bitflags! {
    /// Informational request bits that do not describe a GPU usage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InfoFlags: u32 {
        /// The caller supplies the backing memory; the layout only has to
        /// fit inside it.
        const EXISTING_SYSMEM = 1 << 0;
        const CACHEABLE = 1 << 1;
        /// Planar layouts gain the wide pitch alignment shader access needs.
        const YUV_SHADER_FRIENDLY = 1 << 2;
        /// Lay out against the context's debug override platform.
        const OVERRIDE_PLATFORM = 1 << 3;
    }
}

bitflags! {
    /// Tiling preference bits. [ResourceInfo::create] normalizes the set so
    /// exactly one bit survives, matching the resolved [TileMode].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TilingFlags: u32 {
        const LINEAR = 1 << 0;
        const TILE_X = 1 << 1;
        const TILE_W = 1 << 2;
        const TILE_Y = 1 << 3;
        const TILE_YF = 1 << 4;
        const TILE_YS = 1 << 5;
        const TILE_4 = 1 << 6;
        const TILE_64 = 1 << 7;
    }
}

/// One resource-create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDesc {
    pub resource_type: ResourceType,
    pub format: Format,
    /// Base width in elements (bytes for [ResourceType::Buffer]).
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub usage: UsageFlags,
    pub info: InfoFlags,
    pub tiling: TilingFlags,
    /// Caller-supplied row pitch. Must satisfy the computed layout.
    pub pitch_override: Option<u64>,
    /// Caller-supplied base alignment, widened into the computed one.
    pub base_alignment_override: Option<u64>,
    /// Size of the caller-managed backing memory, checked when
    /// [InfoFlags::EXISTING_SYSMEM] is set.
    pub existing_sysmem_size: Option<u64>,
}

impl Default for ResourceDesc {
    fn default() -> Self {
        ResourceDesc {
            resource_type: ResourceType::Tex2D,
            format: Format::R8G8B8A8Unorm,
            width: 1,
            height: 1,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            samples: 1,
            usage: UsageFlags::empty(),
            info: InfoFlags::empty(),
            tiling: TilingFlags::empty(),
            pitch_override: None,
            base_alignment_override: None,
            existing_sysmem_size: None,
        }
    }
}

/// Kinds of auxiliary data a resource can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxKind {
    /// Compression control for the main surface (the luma plane on planar
    /// surfaces).
    Ccs,
    /// Compression control for the chroma plane of a planar surface.
    CcsUv,
    Mcs,
    HiZ,
    /// The reserved indirect clear color page of a unified-aux allocation.
    IndirectClearColor,
    /// The media compression state cacheline of a unified-aux allocation.
    CompressionState,
}

/// Addressing conventions [ResourceInfo::get_offset] can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetKind {
    /// CPU linear-mapped byte offset.
    Lock,
    /// Hardware tile-aligned base plus intra-tile X/Y offsets.
    Render,
    /// Tile-granular packed addressing of standard (Yf/Ys/Tile64) tiling.
    StdLayout,
}

/// One offset query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRequest {
    pub mip_level: u32,
    pub array_index: u32,
    /// Depth slice for 3D resources.
    pub slice: u32,
    /// Plane index for planar formats: 0 = Y, 1 = U, 2 = V.
    pub plane: u32,
    pub kind: OffsetKind,
}

impl Default for OffsetRequest {
    fn default() -> Self {
        OffsetRequest {
            mip_level: 0,
            array_index: 0,
            slice: 0,
            plane: 0,
            kind: OffsetKind::Lock,
        }
    }
}

/// A resolved offset, shaped by the requested [OffsetKind].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetInfo {
    Lock {
        offset: u64,
        pitch: u64,
    },
    Render {
        /// Tile-aligned byte base suitable for a surface-state entry.
        base: u64,
        /// Remaining X offset in elements.
        x_offset: u32,
        /// Remaining Y offset in rows.
        y_offset: u32,
        z_offset: u32,
    },
    StdLayout {
        offset: u64,
        /// Bytes between array slices in the packed tile order.
        array_pitch: u64,
        /// Bytes per row of tiles.
        tile_row_pitch: u64,
    },
}

#[derive(Debug, Clone)]
struct AuxEntry {
    kind: AuxKind,
    offset: u64,
    size: u64,
}

/// Stereo frame placement for [UsageFlags::S3D] resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S3dInfo {
    /// Rows of one eye's frame.
    pub frame_rows: u64,
    /// Row where the right-eye frame starts.
    pub right_frame_y: u64,
}

/// The complete computed layout of one resource.
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    desc: ResourceDesc,
    platform: PlatformInfo,
    restrictions: Restrictions,
    main: TextureInfo,
    planes: Vec<PlaneLayout>,
    aux: Option<TextureInfo>,
    secondary_aux: Option<TextureInfo>,
    aux_entries: Vec<AuxEntry>,
    s3d: Option<S3dInfo>,
    /// Array size with cube faces and non-interleaved samples folded in.
    expanded_array: u32,
    total_size: u64,
}

impl ResourceInfo {
    /// Validates `desc` and computes the complete layout.
    pub fn create(ctx: &LibraryContext, mut desc: ResourceDesc) -> Result<Self, LayoutError> {
        let platform = ctx
            .effective_platform(desc.info.contains(InfoFlags::OVERRIDE_PLATFORM))
            .clone();

        if !platform.supports_format(desc.format) {
            tracing::debug!(format = ?desc.format, gen = ?platform.gen, "unsupported format");
            return Err(LayoutError::UnsupportedFormat {
                format: desc.format,
                gen: platform.gen,
            });
        }

        let mut restrictions = resolve_restrictions(&platform, &desc)?;
        if let Some(base) = desc.base_alignment_override {
            restrictions.alignment = restrictions.alignment.max(base);
        }
        validate_dimensions(&platform, &restrictions, &desc)?;

        let tile_mode = select_tile_mode(
            &platform,
            desc.format,
            desc.resource_type,
            desc.samples,
            &mut desc.tiling,
        )?;
        validate_aux(&platform, &desc, tile_mode)?;

        let class = surface_class(&desc);
        let expanded_array = expanded_array_size(&desc, class, tile_mode);

        let (mut main, planes) = layout_main(
            &platform,
            &restrictions,
            &desc,
            tile_mode,
            class,
            expanded_array,
        )?;
        apply_pitch_override(&desc, &restrictions, &mut main)?;

        if desc.info.contains(InfoFlags::EXISTING_SYSMEM) {
            // Client memory backs the allocation as is; keep the exact row
            // extent instead of rounding up to the base alignment.
            main.size = main.total_rows * main.pitch;
        }

        let (aux, secondary_aux, aux_entries, total_size, main_size) =
            plan_aux(&platform, &restrictions, &desc, &main, &planes)?;
        main.size = main_size;

        let s3d = if desc.usage.contains(UsageFlags::S3D) {
            Some(S3dInfo {
                frame_rows: main.total_rows,
                right_frame_y: main.total_rows,
            })
        } else {
            None
        };
        // The second stereo frame doubles the allocation tail.
        let total_size = if s3d.is_some() {
            total_size + main.size
        } else {
            total_size
        };

        if desc.info.contains(InfoFlags::EXISTING_SYSMEM) {
            let provided = desc.existing_sysmem_size.unwrap_or(0);
            if provided < total_size {
                return Err(LayoutError::ExistingSysMemTooSmall {
                    provided,
                    required: total_size,
                });
            }
        }

        Ok(ResourceInfo {
            desc,
            platform,
            restrictions,
            main,
            planes,
            aux,
            secondary_aux,
            aux_entries,
            s3d,
            expanded_array,
            total_size,
        })
    }

    pub fn resource_type(&self) -> ResourceType {
        self.desc.resource_type
    }

    pub fn format(&self) -> Format {
        self.desc.format
    }

    pub fn base_width(&self) -> u32 {
        self.desc.width
    }

    pub fn base_height(&self) -> u32 {
        self.desc.height
    }

    pub fn base_depth(&self) -> u32 {
        self.desc.depth
    }

    pub fn array_size(&self) -> u32 {
        self.desc.array_size
    }

    pub fn mip_levels(&self) -> u32 {
        self.desc.mip_levels
    }

    pub fn samples(&self) -> u32 {
        self.desc.samples
    }

    pub fn bits_per_element(&self) -> u32 {
        self.desc.format.bits_per_element()
    }

    pub fn tile_mode(&self) -> TileMode {
        self.main.tile_mode
    }

    /// The normalized tiling flag set: exactly one bit.
    pub fn tiling(&self) -> TilingFlags {
        self.desc.tiling
    }

    pub fn pitch(&self) -> u64 {
        self.main.pitch
    }

    /// Row pitch expressed in tile columns. Zero for linear surfaces.
    pub fn pitch_in_tiles(&self) -> u64 {
        let tile = self.tile_geometry();
        if tile.is_tiled {
            self.main.pitch / tile.width_bytes as u64
        } else {
            0
        }
    }

    pub fn qpitch_rows(&self) -> u64 {
        self.main.qpitch_rows
    }

    /// Size of the main surface in bytes, including unified-aux tail padding.
    pub fn size(&self) -> u64 {
        self.main.size
    }

    /// Size of the whole allocation: main surface, co-allocated aux
    /// surfaces and reservations, and the second stereo frame.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn base_alignment(&self) -> u64 {
        self.main.base_alignment
    }

    pub fn main_surface(&self) -> &TextureInfo {
        &self.main
    }

    /// The primary aux surface (CCS, MCS or HiZ), when the request asked
    /// for one.
    pub fn aux_surface(&self) -> Option<&TextureInfo> {
        self.aux.as_ref()
    }

    /// The secondary aux surface for combined depth + HiZ + CCS cases.
    pub fn secondary_aux_surface(&self) -> Option<&TextureInfo> {
        self.secondary_aux.as_ref()
    }

    pub fn s3d_info(&self) -> Option<S3dInfo> {
        self.s3d
    }

    /// Number of format planes: 1, 2 (packed UV) or 3.
    pub fn plane_count(&self) -> u32 {
        self.desc.format.plane_count()
    }

    /// X/Y placement of `plane` in (bytes, rows). Plane 0 is always (0, 0).
    pub fn plane_offset(&self, plane: u32) -> Option<(u64, u64)> {
        if self.planes.is_empty() && plane == 0 {
            return Some((0, 0));
        }
        let p = self.planes.get(plane_index(&self.desc, plane)?)?;
        Some((p.x_bytes, p.y_rows))
    }

    /// Unpadded height in rows of `plane`.
    pub fn plane_unaligned_height(&self, plane: u32) -> Option<u64> {
        let family = self.desc.format.planar_family()?;
        let h = self.desc.height as u64;
        let down = match family {
            PlanarFamily::TailPacked { downscale, .. } => downscale as u64,
            PlanarFamily::FullPlanes => 1,
            _ => 2,
        };
        match plane {
            0 => Some(h),
            1 | 2 => Some((h + down - 1) / down),
            _ => None,
        }
    }

    /// Byte offset of `kind` within its allocation. `None` when the
    /// resource does not carry that aux kind.
    pub fn aux_offset(&self, kind: AuxKind) -> Option<u64> {
        self.aux_entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.offset)
    }

    /// Size in bytes of the `kind` aux region.
    pub fn aux_size(&self, kind: AuxKind) -> Option<u64> {
        self.aux_entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.size)
    }

    /// Padded width in elements of `level` of the main surface.
    pub fn mip_width(&self, level: u32) -> Option<u32> {
        if level >= self.desc.mip_levels {
            return None;
        }
        let block_w = self.desc.format.info().block_width;
        let w = div_round_up(mip_extent(self.desc.width, level), block_w);
        Some(align_up(w, self.main.halign))
    }

    /// Padded height in rows of `level` of the main surface.
    pub fn mip_height(&self, level: u32) -> Option<u32> {
        if level >= self.desc.mip_levels {
            return None;
        }
        let block_h = self.desc.format.info().block_height;
        let h = div_round_up(mip_extent(self.desc.height, level), block_h);
        Some(align_up(h, self.main.valign))
    }

    /// Resolves `req` against the computed layout.
    pub fn get_offset(&self, req: OffsetRequest) -> Result<OffsetInfo, LayoutError> {
        let out_of_range = || LayoutError::InvalidOffsetRequest {
            mip_level: req.mip_level,
            array_index: req.array_index,
            plane: req.plane,
        };

        // Planar surfaces always answer Y, U and V queries even when two
        // of them alias the same stored plane.
        let plane_limit = if self.planes.is_empty() {
            1
        } else {
            self.planes.len() as u32
        };
        if req.mip_level >= self.desc.mip_levels
            || req.array_index >= self.expanded_array
            || req.plane >= plane_limit
            || (req.slice > 0 && req.slice >= mip_extent(self.desc.depth, req.mip_level))
        {
            return Err(out_of_range());
        }
        if req.kind == OffsetKind::StdLayout
            && !matches!(
                self.main.tile_mode,
                TileMode::TileYf | TileMode::TileYs | TileMode::Tile64
            )
        {
            return Err(out_of_range());
        }

        // Planar surfaces have one mip and answer from the plane table.
        if let Some(index) = plane_index(&self.desc, req.plane) {
            let plane = self.planes.get(index).ok_or_else(out_of_range)?;
            return Ok(self.project(req, plane.x_bytes, plane.y_rows));
        }

        let mip = self.main.mip_offset(req.mip_level).ok_or_else(out_of_range)?;
        let mut y_rows = mip.y_rows;
        let x_bytes = mip.x_bytes;

        y_rows += req.array_index as u64 * self.main.qpitch_rows;
        if self.desc.resource_type == ResourceType::Tex3D && req.slice > 0 {
            if ops_for(self.platform.gen).three_d_uses_qpitch() {
                y_rows += req.slice as u64 * self.main.qpitch_rows;
            } else {
                // Legacy 3D: slices of one mip are stacked contiguously.
                let rows = self
                    .mip_height(req.mip_level)
                    .ok_or_else(out_of_range)? as u64;
                y_rows += req.slice as u64 * rows;
            }
        }

        Ok(self.project(req, x_bytes, y_rows))
    }

    /// Projects an (x, y) surface position into the requested addressing
    /// convention.
    fn project(&self, req: OffsetRequest, x_bytes: u64, y_rows: u64) -> OffsetInfo {
        let tile = self.tile_geometry();
        match req.kind {
            OffsetKind::Lock => OffsetInfo::Lock {
                offset: y_rows * self.main.pitch + x_bytes,
                pitch: self.main.pitch,
            },
            OffsetKind::Render => {
                if !tile.is_tiled {
                    return OffsetInfo::Render {
                        base: y_rows * self.main.pitch + x_bytes,
                        x_offset: 0,
                        y_offset: 0,
                        z_offset: 0,
                    };
                }
                let tw = tile.width_bytes as u64;
                let th = tile.height_rows as u64;
                let bpe = self.desc.format.bytes_per_element() as u64;
                let base =
                    (y_rows / th) * th * self.main.pitch + (x_bytes / tw) * tile.size_bytes();
                OffsetInfo::Render {
                    base,
                    x_offset: ((x_bytes % tw) / bpe) as u32,
                    y_offset: (y_rows % th) as u32,
                    z_offset: req.slice,
                }
            }
            OffsetKind::StdLayout => {
                let tw = tile.width_bytes as u64;
                let th = tile.height_rows as u64;
                let tile_row_pitch = (self.main.pitch / tw) * tile.size_bytes();
                let array_pitch =
                    align_up_u64(self.main.qpitch_rows.max(th), th) / th * tile_row_pitch;
                // Strip the row-space array step back out; packed tile
                // order spaces slices by whole tile rows instead.
                let y_local = y_rows - req.array_index as u64 * self.main.qpitch_rows;
                let offset = req.array_index as u64 * array_pitch
                    + (y_local / th) * tile_row_pitch
                    + (x_bytes / tw) * tile.size_bytes();
                OffsetInfo::StdLayout {
                    offset,
                    array_pitch,
                    tile_row_pitch,
                }
            }
        }
    }

    pub(crate) fn tile_geometry(&self) -> crate::platform::TileGeometry {
        self.platform.tile_geometry(
            self.main.tile_mode,
            self.desc.format.bits_per_element(),
            1,
            self.desc.resource_type == ResourceType::Tex3D,
        )
    }

    pub(crate) fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub(crate) fn restrictions(&self) -> &Restrictions {
        &self.restrictions
    }
}

/// Maps a Y/U/V query plane onto the stored plane table, collapsing the
/// interleaved UV plane of packed formats.
fn plane_index(desc: &ResourceDesc, plane: u32) -> Option<usize> {
    desc.format.planar_family()?;
    Some(plane as usize)
}

fn surface_class(desc: &ResourceDesc) -> SurfaceClass {
    if desc.usage.contains(UsageFlags::DEPTH) {
        SurfaceClass::Depth
    } else if desc.usage.contains(UsageFlags::STENCIL) || desc.format == Format::S8Uint {
        SurfaceClass::SeparateStencil
    } else if desc.format.is_compressed() {
        SurfaceClass::Compressed
    } else {
        SurfaceClass::Other
    }
}

/// Folds cube faces and non-interleaved MSAA planes into the array size.
/// Standard tile modes keep samples inside the tile footprint instead.
fn expanded_array_size(desc: &ResourceDesc, class: SurfaceClass, mode: TileMode) -> u32 {
    let mut array = desc.array_size.max(1);
    if desc.resource_type == ResourceType::Cube {
        array *= 6;
    }
    let sample_interleaved = matches!(
        class,
        SurfaceClass::Depth | SurfaceClass::SeparateStencil
    ) || matches!(mode, TileMode::TileYf | TileMode::TileYs | TileMode::Tile64);
    if desc.samples > 1 && !sample_interleaved {
        array *= desc.samples;
    }
    array
}

fn validate_dimensions(
    platform: &PlatformInfo,
    r: &Restrictions,
    desc: &ResourceDesc,
) -> Result<(), LayoutError> {
    let dims_err = Err(LayoutError::InvalidDimensions {
        width: desc.width,
        height: desc.height,
        depth: desc.depth,
    });

    if desc.width < r.min_width.max(1)
        || desc.height < r.min_height.max(1)
        || desc.depth < r.min_depth.max(1)
        || desc.width > r.max_width
        || desc.height > r.max_height
        || desc.depth > r.max_depth
    {
        tracing::debug!(
            width = desc.width,
            height = desc.height,
            depth = desc.depth,
            "dimensions out of range"
        );
        return dims_err;
    }
    if desc.resource_type == ResourceType::Cube && desc.width != desc.height {
        return dims_err;
    }
    if desc.resource_type != ResourceType::Tex3D && desc.depth > 1 {
        return dims_err;
    }

    let array_size = desc.array_size.max(1);
    if array_size > r.max_array_size {
        return Err(LayoutError::ArraySizeTooLarge {
            array_size,
            max: r.max_array_size,
        });
    }

    if !matches!(desc.samples, 1 | 2 | 4 | 8 | 16) || desc.samples > platform.max_samples() {
        return Err(LayoutError::InvalidSampleCount {
            samples: desc.samples,
        });
    }
    if desc.samples > 1
        && (desc.resource_type != ResourceType::Tex2D || desc.format.is_planar())
    {
        return Err(LayoutError::InvalidSampleCount {
            samples: desc.samples,
        });
    }

    let mips = desc.mip_levels.max(1);
    if mips > 1 {
        let max_extent = desc.width.max(desc.height).max(desc.depth);
        let full_chain = 32 - max_extent.leading_zeros();
        if mips > full_chain
            || desc.format.is_planar()
            || desc.resource_type == ResourceType::Buffer
        {
            return dims_err;
        }
    }

    Ok(())
}

fn layout_main(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    desc: &ResourceDesc,
    tile_mode: TileMode,
    class: SurfaceClass,
    expanded_array: u32,
) -> Result<(TextureInfo, Vec<PlaneLayout>), LayoutError> {
    if desc.resource_type == ResourceType::Buffer {
        let bytes = desc.width as u64 * desc.format.bytes_per_element() as u64;
        return Ok((
            layout_buffer(platform, restrictions, bytes, desc.usage)?,
            Vec::new(),
        ));
    }

    if desc.format.is_planar() {
        let (info, planes) = layout_planar(&PlanarRequest {
            platform,
            restrictions,
            tile_mode,
            format: desc.format,
            width: desc.width,
            height: desc.height,
        })?;
        return Ok((info, planes));
    }

    let info = layout_texture(&LayoutRequest {
        platform,
        restrictions,
        tile_mode,
        format: desc.format,
        resource_type: desc.resource_type,
        usage: desc.usage,
        width: desc.width,
        height: desc.height,
        depth: desc.depth,
        array_size: expanded_array,
        mip_levels: desc.mip_levels.max(1),
        samples: desc.samples,
        class,
    })?;
    Ok((info, Vec::new()))
}

fn apply_pitch_override(
    desc: &ResourceDesc,
    restrictions: &Restrictions,
    main: &mut TextureInfo,
) -> Result<(), LayoutError> {
    let pitch = match desc.pitch_override {
        Some(pitch) => pitch,
        None => return Ok(()),
    };
    if pitch < main.pitch || pitch % restrictions.pitch_alignment as u64 != 0 {
        return Err(LayoutError::InvalidPitchOverride {
            pitch,
            required: main.pitch,
        });
    }
    // Rescale: the row count is unchanged, every row just got wider.
    main.size = align_up_u64(main.total_rows * pitch, main.base_alignment);
    main.pitch = pitch;
    for mip in &mut main.mip_offsets {
        mip.offset = mip.y_rows * pitch + mip.x_bytes;
    }
    Ok(())
}

type AuxPlan = (
    Option<TextureInfo>,
    Option<TextureInfo>,
    Vec<AuxEntry>,
    u64,
    u64,
);

/// Derives the aux surfaces and, for unified aux, co-locates them after
/// the main surface. Returns (aux, secondary aux, entries, total size,
/// padded main size).
fn plan_aux(
    platform: &PlatformInfo,
    restrictions: &Restrictions,
    desc: &ResourceDesc,
    main: &TextureInfo,
    planes: &[PlaneLayout],
) -> Result<AuxPlan, LayoutError> {
    let usage = desc.usage;
    let wants_ccs = usage.intersects(
        UsageFlags::CCS | UsageFlags::RENDER_COMPRESSED | UsageFlags::MEDIA_COMPRESSED,
    ) && !platform.sku.flat_physical_ccs;

    let mut aux: Option<TextureInfo> = None;
    let mut secondary: Option<TextureInfo> = None;
    let mut sized: Vec<(AuxKind, u64)> = Vec::new();

    if usage.contains(UsageFlags::HIZ) {
        let hiz = layout_hiz(platform, restrictions, desc)?;
        sized.push((AuxKind::HiZ, hiz.size));
        aux = Some(hiz);
    }
    if usage.contains(UsageFlags::MCS) {
        let mcs = layout_mcs(platform, restrictions, desc)?;
        sized.push((AuxKind::Mcs, mcs.size));
        match aux {
            None => aux = Some(mcs),
            Some(_) => secondary = Some(mcs),
        }
    }
    if wants_ccs {
        if desc.format.is_planar() {
            if desc.format.planar_family() != Some(PlanarFamily::PackedUv) {
                return Err(LayoutError::IllegalAuxRequest {
                    reason: "planar compression supports packed-UV formats only",
                });
            }
            // One CCS per physical plane, sized from that plane's rows.
            let luma = layout_ccs(
                platform,
                restrictions,
                main.tile_mode,
                main.pitch,
                planes[0].rows,
            )?;
            let chroma = layout_ccs(
                platform,
                restrictions,
                main.tile_mode,
                main.pitch,
                planes[1].rows,
            )?;
            sized.push((AuxKind::Ccs, luma.size));
            sized.push((AuxKind::CcsUv, chroma.size));
            secondary = Some(chroma);
            aux = Some(luma);
        } else {
            let ccs = layout_ccs(
                platform,
                restrictions,
                main.tile_mode,
                main.pitch,
                main.total_rows,
            )?;
            sized.push((AuxKind::Ccs, ccs.size));
            match aux {
                None => aux = Some(ccs),
                Some(_) => secondary = Some(ccs),
            }
        }
    }

    if !usage.contains(UsageFlags::UNIFIED_AUX) || sized.is_empty() {
        // Stand-alone aux allocations start at their own base.
        let entries = sized
            .into_iter()
            .map(|(kind, size)| AuxEntry {
                kind,
                offset: 0,
                size,
            })
            .collect();
        return Ok((aux, secondary, entries, main.size, main.size));
    }

    let aux_sizes: Vec<u64> = sized.iter().map(|(_, size)| *size).collect();
    let plan = plan_unified_aux(platform, desc, main, &aux_sizes, wants_ccs);

    let mut entries: Vec<AuxEntry> = sized
        .into_iter()
        .zip(plan.aux_offsets.iter())
        .map(|((kind, size), &offset)| AuxEntry { kind, offset, size })
        .collect();
    if let Some(clear) = plan.clear_color_offset {
        let reservation = plan.total_size - clear;
        entries.push(AuxEntry {
            kind: AuxKind::IndirectClearColor,
            offset: clear,
            size: reservation,
        });
        if usage.contains(UsageFlags::MEDIA_COMPRESSED) {
            // The media compression state cacheline follows the 64B clear
            // color value inside the reserved page.
            entries.push(AuxEntry {
                kind: AuxKind::CompressionState,
                offset: clear + 64,
                size: 64,
            });
        }
    }

    Ok((
        aux,
        secondary,
        entries,
        plan.total_size,
        plan.padded_main_size,
    ))
}
