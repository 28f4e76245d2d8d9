//! Per-generation constant tables: tile geometry, capability flags and
//! numeric limits.
//!
//! [PlatformInfo] is immutable after construction. Build one per active
//! hardware generation inside a [LibraryContext] and share it read-only
//! between every layout computation.

use crate::format::Format;

/// The supported hardware generations.
///
/// Generations are ordered, so capability checks can use comparisons like
/// `gen >= GpuGen::Gen9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum GpuGen {
    Gen7,
    Gen8,
    Gen9,
    Gen11,
    Gen12,
}

/// A concrete tile mode resolved by the tile mode selector.
///
/// Each tiled mode maps a surface's logical (x, y, z) to a physical byte
/// address through a fixed swizzle pattern. The logical footprint of one
/// tile is described by [TileGeometry].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum TileMode {
    Linear,
    /// Legacy 512Bx8 tiling, required for display on older generations.
    TileX,
    /// Legacy 64Bx64 tiling used for separate stencil.
    TileW,
    /// Legacy 128Bx32 tiling, the common pre-Gen12 mode.
    TileY,
    /// 4KB standard tiling with bpp-dependent geometry (Gen9 to Gen11).
    TileYf,
    /// 64KB standard tiling with bpp-dependent geometry (Gen9 to Gen11).
    TileYs,
    /// 128Bx32 tiling replacing TileY on Gen12.
    Tile4,
    /// 64KB tiling replacing TileYs on Gen12.
    Tile64,
}

/// The logical footprint of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Tile width in bytes.
    pub width_bytes: u32,
    /// Tile height in rows.
    pub height_rows: u32,
    /// Tile depth in slices. 1 for all 2D modes.
    pub depth_slices: u32,
    pub is_tiled: bool,
}

impl TileGeometry {
    pub const fn size_bytes(&self) -> u64 {
        self.width_bytes as u64 * self.height_rows as u64 * self.depth_slices as u64
    }
}

/// SKU capability toggles that gate tile mode selection and aux planning.
///
/// These mirror what platform capability loading would provide; callers set
/// them directly since capability table parsing is out of scope here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkuFlags {
    /// 64KB standard tiling (TileYs on Gen9-Gen11, Tile64 on Gen12).
    pub tile_64kb: bool,
    /// 4KB standard tiling (TileYf, Gen9-Gen11 only).
    pub tile_yf: bool,
    /// Tiled resource (sparse) support. Raises the surface size ceiling and
    /// the unified-aux clear color reservation to 64KB.
    pub tiled_resources: bool,
    /// Compression control lives in a flat physical table rather than a
    /// per-surface CCS (some Gen12 SKUs). Skips the 4-tile pitch padding for
    /// compressed surfaces.
    pub flat_physical_ccs: bool,
}

/// Named hardware-bug policies applied during pitch and size finalization.
///
/// Each toggle reproduces a specific silicon erratum nudge. They are off by
/// default; callers targeting affected steppings opt in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Workarounds {
    /// FBC requires linear display strides padded to 512B.
    pub fbc_linear_stride_512: bool,
    /// Losslessly compressed render targets need their stride padded to
    /// four tile widths.
    pub lossless_stride_4_tiles: bool,
    /// NV12 UV plane start must land on a 4KB boundary.
    pub nv12_uv_4k_align: bool,
    /// Tile4 YUV surfaces with an odd tile-column count get one extra tile
    /// column.
    pub tile4_yuv_odd_tile_pad: bool,
    /// ASTC formats with an odd compressed block width get one extra block
    /// column of pitch.
    pub astc_odd_block_x: bool,
}

/// Immutable per-generation constant record.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub gen: GpuGen,
    pub sku: SkuFlags,
    pub wa: Workarounds,
    /// Fence region granularity in bytes.
    pub fence_granularity: u64,
    /// Number of addressable GPU virtual address bits.
    pub gpu_va_bits: u32,
}

impl PlatformInfo {
    pub fn new(gen: GpuGen, sku: SkuFlags) -> Self {
        PlatformInfo {
            gen,
            sku,
            wa: Workarounds::default(),
            fence_granularity: 4096,
            gpu_va_bits: if gen >= GpuGen::Gen8 { 48 } else { 31 },
        }
    }

    pub fn with_workarounds(mut self, wa: Workarounds) -> Self {
        self.wa = wa;
        self
    }

    /// The maximum pitch in bytes a surface may have on this generation.
    pub fn max_pitch(&self) -> u64 {
        // SURFACE_STATE carries an 18 bit pitch field on every supported
        // generation.
        256 * 1024
    }

    /// The maximum total surface size in bytes.
    pub fn max_surface_size(&self, tiled_resource: bool) -> u64 {
        if tiled_resource {
            return 1 << 40;
        }
        match self.gen {
            GpuGen::Gen7 | GpuGen::Gen8 => 1 << 34,
            GpuGen::Gen9 | GpuGen::Gen11 => 1 << 38,
            GpuGen::Gen12 => 1 << 40,
        }
    }

    /// Whether `format` is usable on this generation.
    pub fn supports_format(&self, format: Format) -> bool {
        format.info().supported_since <= self.gen
    }

    /// Looks up the logical tile geometry for `mode` at the given bits per
    /// element and sample count.
    ///
    /// The standard (Yf/Ys/Tile64) modes have bpp-dependent geometry, and
    /// their 64KB variants shrink per sample for sample-interleaved MSAA
    /// storage. The legacy modes ignore both parameters.
    pub fn tile_geometry(
        &self,
        mode: TileMode,
        bits_per_element: u32,
        samples: u32,
        is_3d: bool,
    ) -> TileGeometry {
        match mode {
            TileMode::Linear => TileGeometry {
                width_bytes: 1,
                height_rows: 1,
                depth_slices: 1,
                is_tiled: false,
            },
            TileMode::TileX => tile(512, 8, 1),
            TileMode::TileW => tile(64, 64, 1),
            TileMode::TileY | TileMode::Tile4 => tile(128, 32, 1),
            TileMode::TileYf => {
                if is_3d {
                    let (w, h, d) = match bits_per_element {
                        8 => (16, 16, 16),
                        16 | 32 => (32, 16, 8),
                        _ => (64, 8, 8),
                    };
                    tile(w, h, d)
                } else {
                    let (w, h) = match bits_per_element {
                        8 => (64, 64),
                        16 | 32 => (128, 32),
                        _ => (256, 16),
                    };
                    tile(w, h, 1)
                }
            }
            TileMode::TileYs | TileMode::Tile64 => {
                if is_3d {
                    let (w, h, d) = match bits_per_element {
                        8 => (64, 32, 32),
                        16 | 32 => (128, 32, 16),
                        _ => (256, 16, 16),
                    };
                    tile(w, h, d)
                } else {
                    let (w, h) = match bits_per_element {
                        8 => (256, 256),
                        16 | 32 => (512, 128),
                        _ => (1024, 64),
                    };
                    // Sample-interleaved MSAA shrinks the per-sample footprint.
                    let (wdiv, hdiv) = match samples {
                        2 => (2, 1),
                        4 => (2, 2),
                        8 => (4, 2),
                        16 => (4, 4),
                        _ => (1, 1),
                    };
                    tile(w / wdiv, h / hdiv, 1)
                }
            }
        }
    }

    /// The highest legal MSAA sample count on this generation.
    pub fn max_samples(&self) -> u32 {
        match self.gen {
            GpuGen::Gen7 => 8,
            _ => 16,
        }
    }
}

const fn tile(width_bytes: u32, height_rows: u32, depth_slices: u32) -> TileGeometry {
    TileGeometry {
        width_bytes,
        height_rows,
        depth_slices,
        is_tiled: true,
    }
}

/// The caller-constructed library context passed into every entry point.
///
/// Owns the primary [PlatformInfo] and an optional override platform used by
/// debug builds to model a second generation in the same process. The
/// context is immutable after construction; establish it before handing
/// references to other threads.
#[derive(Debug, Clone)]
pub struct LibraryContext {
    platform: PlatformInfo,
    override_platform: Option<PlatformInfo>,
}

impl LibraryContext {
    pub fn new(gen: GpuGen, sku: SkuFlags) -> Self {
        LibraryContext {
            platform: PlatformInfo::new(gen, sku),
            override_platform: None,
        }
    }

    pub fn from_platform(platform: PlatformInfo) -> Self {
        LibraryContext {
            platform,
            override_platform: None,
        }
    }

    /// Installs an override platform modeling a different generation.
    pub fn with_override(mut self, platform: PlatformInfo) -> Self {
        self.override_platform = Some(platform);
        self
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// The platform a request should be resolved against. Falls back to the
    /// primary platform when no override is installed.
    pub fn effective_platform(&self, use_override: bool) -> &PlatformInfo {
        if use_override {
            self.override_platform.as_ref().unwrap_or(&self.platform)
        } else {
            &self.platform
        }
    }
}
