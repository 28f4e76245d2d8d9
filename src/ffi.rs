//! Documentation for the C API.
//!
//! The C surface mirrors the Rust entry points with flat request structs
//! and the closed [IgfxStatus] status enum. Apart from
//! [igfx_context_create] and [igfx_resource_create], which allocate the
//! opaque handles released by their destroy counterparts, none of the FFI
//! methods allocate memory.
//!
//! Enums cross the boundary as `u32` codes; formats use the declaration
//! order of [Format] starting at 0, and the flag words use the same bit
//! values as [UsageFlags], [InfoFlags] and [TilingFlags].

use crate::blit::{cpu_blt, BltDirection, CpuBltRequest};
use crate::format::Format;
use crate::platform::{GpuGen, LibraryContext, PlatformInfo, SkuFlags, Workarounds};
use crate::resource::{
    AuxKind, InfoFlags, OffsetInfo, OffsetKind, OffsetRequest, ResourceDesc, ResourceInfo,
    ResourceType, TilingFlags, UsageFlags,
};
use crate::LayoutError;

/// Status returned from every fallible entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgfxStatus {
    Success = 0,
    /// A layout-stage failure: the computed pitch or size exceeded a
    /// platform limit, or a buffer was too small.
    Error = 1,
    /// A malformed request, rejected during validation.
    InvalidParam = 2,
}

fn status_of(err: &LayoutError) -> IgfxStatus {
    match err {
        LayoutError::PitchTooLarge { .. }
        | LayoutError::SizeTooLarge { .. }
        | LayoutError::NotEnoughData { .. }
        | LayoutError::ExistingSysMemTooSmall { .. } => IgfxStatus::Error,
        _ => IgfxStatus::InvalidParam,
    }
}

/// SKU capability bits for [igfx_context_create].
pub const IGFX_SKU_TILE_64KB: u32 = 1 << 0;
pub const IGFX_SKU_TILE_YF: u32 = 1 << 1;
pub const IGFX_SKU_TILED_RESOURCES: u32 = 1 << 2;
pub const IGFX_SKU_FLAT_PHYSICAL_CCS: u32 = 1 << 3;

/// Workaround bits for [igfx_context_create].
pub const IGFX_WA_FBC_LINEAR_STRIDE_512: u32 = 1 << 0;
pub const IGFX_WA_LOSSLESS_STRIDE_4_TILES: u32 = 1 << 1;
pub const IGFX_WA_NV12_UV_4K_ALIGN: u32 = 1 << 2;
pub const IGFX_WA_TILE4_YUV_ODD_TILE_PAD: u32 = 1 << 3;
pub const IGFX_WA_ASTC_ODD_BLOCK_X: u32 = 1 << 4;

fn gen_from_raw(gen: u32) -> Option<GpuGen> {
    match gen {
        7 => Some(GpuGen::Gen7),
        8 => Some(GpuGen::Gen8),
        9 => Some(GpuGen::Gen9),
        11 => Some(GpuGen::Gen11),
        12 => Some(GpuGen::Gen12),
        _ => None,
    }
}

fn resource_type_from_raw(resource_type: u32) -> Option<ResourceType> {
    match resource_type {
        0 => Some(ResourceType::Buffer),
        1 => Some(ResourceType::Tex1D),
        2 => Some(ResourceType::Tex2D),
        3 => Some(ResourceType::Tex3D),
        4 => Some(ResourceType::Cube),
        5 => Some(ResourceType::Primary),
        6 => Some(ResourceType::Shadow),
        7 => Some(ResourceType::Staging),
        8 => Some(ResourceType::Cursor),
        _ => None,
    }
}

fn format_from_raw(format: u32) -> Option<Format> {
    use Format::*;
    // Declaration order of the Rust enum.
    const TABLE: [Format; 43] = [
        R8Unorm,
        R8G8Unorm,
        R8G8B8A8Unorm,
        B8G8R8A8Unorm,
        R10G10B10A2Unorm,
        B5G6R5Unorm,
        R16Float,
        R16G16Float,
        R16G16B16A16Float,
        R32Float,
        R32G32Float,
        R32G32B32A32Float,
        Bc1,
        Bc2,
        Bc3,
        Bc4,
        Bc5,
        Bc6h,
        Bc7,
        Astc4x4,
        Astc5x4,
        Astc6x6,
        Astc8x8,
        Astc10x10,
        Astc12x12,
        D16Unorm,
        D24UnormS8Uint,
        D32Float,
        S8Uint,
        Yuy2,
        Uyvy,
        Nv12,
        P010,
        P016,
        Imc1,
        Imc2,
        Imc3,
        Imc4,
        Yv12,
        I420,
        Yvu9,
        Rgbp,
        Bgrp,
    ];
    TABLE.get(format as usize).copied()
}

fn aux_kind_from_raw(kind: u32) -> Option<AuxKind> {
    match kind {
        0 => Some(AuxKind::Ccs),
        1 => Some(AuxKind::CcsUv),
        2 => Some(AuxKind::Mcs),
        3 => Some(AuxKind::HiZ),
        4 => Some(AuxKind::IndirectClearColor),
        5 => Some(AuxKind::CompressionState),
        _ => None,
    }
}

/// The resource create request. Zero in `pitch_override`,
/// `base_alignment_override` or `existing_sysmem_size` means "not
/// supplied".
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IgfxResourceDesc {
    pub resource_type: u32,
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub samples: u32,
    pub usage: u32,
    pub info: u32,
    pub tiling: u32,
    pub pitch_override: u64,
    pub base_alignment_override: u64,
    pub existing_sysmem_size: u64,
}

fn desc_from_raw(desc: &IgfxResourceDesc) -> Option<ResourceDesc> {
    let non_zero = |v: u64| if v == 0 { None } else { Some(v) };
    Some(ResourceDesc {
        resource_type: resource_type_from_raw(desc.resource_type)?,
        format: format_from_raw(desc.format)?,
        width: desc.width,
        height: desc.height,
        depth: desc.depth,
        array_size: desc.array_size,
        mip_levels: desc.mip_levels,
        samples: desc.samples,
        usage: UsageFlags::from_bits(desc.usage)?,
        info: InfoFlags::from_bits(desc.info)?,
        tiling: TilingFlags::from_bits(desc.tiling)?,
        pitch_override: non_zero(desc.pitch_override),
        base_alignment_override: non_zero(desc.base_alignment_override),
        existing_sysmem_size: non_zero(desc.existing_sysmem_size),
    })
}

/// One offset query. `kind` selects 0 = lock, 1 = render, 2 = standard
/// layout.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IgfxOffsetRequest {
    pub mip_level: u32,
    pub array_index: u32,
    pub slice: u32,
    pub plane: u32,
    pub kind: u32,
}

/// The answer to an offset query. Only the fields of the requested
/// addressing kind are filled; the rest are zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IgfxOffsetInfo {
    pub offset: u64,
    pub pitch: u64,
    pub x_offset: u32,
    pub y_offset: u32,
    pub z_offset: u32,
    pub array_pitch: u64,
    pub tile_row_pitch: u64,
}

/// Creates a layout context for one GPU generation.
///
/// Returns null if `gen` is not a known generation number (7, 8, 9, 11 or
/// 12) or a flag word carries unknown bits. Release the context with
/// [igfx_context_destroy].
#[no_mangle]
pub extern "C" fn igfx_context_create(
    gen: u32,
    sku_flags: u32,
    workaround_flags: u32,
) -> *mut LibraryContext {
    let gen = match gen_from_raw(gen) {
        Some(gen) => gen,
        None => return std::ptr::null_mut(),
    };
    if sku_flags >> 4 != 0 || workaround_flags >> 5 != 0 {
        return std::ptr::null_mut();
    }
    let sku = SkuFlags {
        tile_64kb: sku_flags & IGFX_SKU_TILE_64KB != 0,
        tile_yf: sku_flags & IGFX_SKU_TILE_YF != 0,
        tiled_resources: sku_flags & IGFX_SKU_TILED_RESOURCES != 0,
        flat_physical_ccs: sku_flags & IGFX_SKU_FLAT_PHYSICAL_CCS != 0,
    };
    let wa = Workarounds {
        fbc_linear_stride_512: workaround_flags & IGFX_WA_FBC_LINEAR_STRIDE_512 != 0,
        lossless_stride_4_tiles: workaround_flags & IGFX_WA_LOSSLESS_STRIDE_4_TILES != 0,
        nv12_uv_4k_align: workaround_flags & IGFX_WA_NV12_UV_4K_ALIGN != 0,
        tile4_yuv_odd_tile_pad: workaround_flags & IGFX_WA_TILE4_YUV_ODD_TILE_PAD != 0,
        astc_odd_block_x: workaround_flags & IGFX_WA_ASTC_ODD_BLOCK_X != 0,
    };
    let platform = PlatformInfo::new(gen, sku).with_workarounds(wa);
    Box::into_raw(Box::new(LibraryContext::from_platform(platform)))
}

/// Releases a context from [igfx_context_create].
///
/// # Safety
/// `ctx` must be a pointer returned by [igfx_context_create] that has not
/// been destroyed, or null.
#[no_mangle]
pub unsafe extern "C" fn igfx_context_destroy(ctx: *mut LibraryContext) {
    if !ctx.is_null() {
        drop(Box::from_raw(ctx));
    }
}

/// See [ResourceInfo::create].
///
/// On success, writes the new opaque resource handle to `out`. Release it
/// with [igfx_resource_destroy].
///
/// # Safety
/// `ctx` must be a live context from [igfx_context_create]. `desc` and
/// `out` must be valid for reads and writes respectively.
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_create(
    ctx: *const LibraryContext,
    desc: *const IgfxResourceDesc,
    out: *mut *mut ResourceInfo,
) -> IgfxStatus {
    if ctx.is_null() || desc.is_null() || out.is_null() {
        return IgfxStatus::InvalidParam;
    }
    let desc = match desc_from_raw(&*desc) {
        Some(desc) => desc,
        None => return IgfxStatus::InvalidParam,
    };
    match ResourceInfo::create(&*ctx, desc) {
        Ok(info) => {
            *out = Box::into_raw(Box::new(info));
            IgfxStatus::Success
        }
        Err(err) => status_of(&err),
    }
}

/// Releases a resource from [igfx_resource_create].
///
/// # Safety
/// `info` must be a pointer returned by [igfx_resource_create] that has
/// not been destroyed, or null.
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_destroy(info: *mut ResourceInfo) {
    if !info.is_null() {
        drop(Box::from_raw(info));
    }
}

/// See [ResourceInfo::pitch].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_pitch(info: *const ResourceInfo) -> u64 {
    (*info).pitch()
}

/// See [ResourceInfo::pitch_in_tiles].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_pitch_in_tiles(info: *const ResourceInfo) -> u64 {
    (*info).pitch_in_tiles()
}

/// See [ResourceInfo::size].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_size(info: *const ResourceInfo) -> u64 {
    (*info).size()
}

/// See [ResourceInfo::total_size].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_total_size(info: *const ResourceInfo) -> u64 {
    (*info).total_size()
}

/// See [ResourceInfo::qpitch_rows].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_qpitch(info: *const ResourceInfo) -> u64 {
    (*info).qpitch_rows()
}

/// See [ResourceInfo::base_alignment].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create].
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_base_alignment(info: *const ResourceInfo) -> u64 {
    (*info).base_alignment()
}

/// See [ResourceInfo::plane_offset]. Writes the X byte offset and Y row
/// offset of the plane.
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create]. `x_bytes`
/// and `y_rows` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_plane_offset(
    info: *const ResourceInfo,
    plane: u32,
    x_bytes: *mut u64,
    y_rows: *mut u64,
) -> IgfxStatus {
    match (*info).plane_offset(plane) {
        Some((x, y)) => {
            *x_bytes = x;
            *y_rows = y;
            IgfxStatus::Success
        }
        None => IgfxStatus::InvalidParam,
    }
}

/// See [ResourceInfo::aux_offset]. `kind` uses 0 = CCS, 1 = chroma CCS,
/// 2 = MCS, 3 = HiZ, 4 = indirect clear color, 5 = compression state.
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create]. `offset`
/// must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_aux_offset(
    info: *const ResourceInfo,
    kind: u32,
    offset: *mut u64,
) -> IgfxStatus {
    let kind = match aux_kind_from_raw(kind) {
        Some(kind) => kind,
        None => return IgfxStatus::InvalidParam,
    };
    match (*info).aux_offset(kind) {
        Some(value) => {
            *offset = value;
            IgfxStatus::Success
        }
        None => IgfxStatus::InvalidParam,
    }
}

/// See [ResourceInfo::get_offset].
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create]. `req` and
/// `out` must be valid for reads and writes respectively.
#[no_mangle]
pub unsafe extern "C" fn igfx_resource_get_offset(
    info: *const ResourceInfo,
    req: *const IgfxOffsetRequest,
    out: *mut IgfxOffsetInfo,
) -> IgfxStatus {
    let raw = &*req;
    let kind = match raw.kind {
        0 => OffsetKind::Lock,
        1 => OffsetKind::Render,
        2 => OffsetKind::StdLayout,
        _ => return IgfxStatus::InvalidParam,
    };
    let answer = (*info).get_offset(OffsetRequest {
        mip_level: raw.mip_level,
        array_index: raw.array_index,
        slice: raw.slice,
        plane: raw.plane,
        kind,
    });
    match answer {
        Ok(OffsetInfo::Lock { offset, pitch }) => {
            *out = IgfxOffsetInfo {
                offset,
                pitch,
                ..IgfxOffsetInfo::default()
            };
            IgfxStatus::Success
        }
        Ok(OffsetInfo::Render {
            base,
            x_offset,
            y_offset,
            z_offset,
        }) => {
            *out = IgfxOffsetInfo {
                offset: base,
                x_offset,
                y_offset,
                z_offset,
                ..IgfxOffsetInfo::default()
            };
            IgfxStatus::Success
        }
        Ok(OffsetInfo::StdLayout {
            offset,
            array_pitch,
            tile_row_pitch,
        }) => {
            *out = IgfxOffsetInfo {
                offset,
                array_pitch,
                tile_row_pitch,
                ..IgfxOffsetInfo::default()
            };
            IgfxStatus::Success
        }
        Err(err) => status_of(&err),
    }
}

/// See [cpu_blt]. `direction` is 0 = upload (system to GPU layout) or
/// 1 = download.
///
/// # Safety
/// `info` must be a live resource from [igfx_resource_create]. `gpu` and
/// `gpu_len` must describe the surface allocation, `sys` and `sys_len` the
/// linear buffer; both valid for reads and writes.
#[no_mangle]
pub unsafe extern "C" fn igfx_cpu_blt(
    info: *const ResourceInfo,
    gpu: *mut u8,
    gpu_len: usize,
    sys: *mut u8,
    sys_len: usize,
    mip_level: u32,
    array_index: u32,
    slice: u32,
    plane: u32,
    direction: u32,
    sys_pitch: usize,
) -> IgfxStatus {
    let direction = match direction {
        0 => BltDirection::Upload,
        1 => BltDirection::Download,
        _ => return IgfxStatus::InvalidParam,
    };
    let gpu = std::slice::from_raw_parts_mut(gpu, gpu_len);
    let sys = std::slice::from_raw_parts_mut(sys, sys_len);
    let req = CpuBltRequest {
        mip_level,
        array_index,
        slice,
        plane,
        direction,
        sys_pitch,
    };
    match cpu_blt(&*info, gpu, sys, &req) {
        Ok(()) => IgfxStatus::Success,
        Err(err) => status_of(&err),
    }
}
