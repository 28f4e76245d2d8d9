//! The per-format property table: bits per element, compression block
//! dimensions, render target eligibility and hardware format codes.

use crate::platform::GpuGen;

/// The pixel and block formats the layout engine understands.
///
/// The set covers the format classes that drive distinct layout behavior:
/// ordinary color formats, block compressed (BCn and ASTC) formats, depth
/// and separate stencil, and the planar and packed YUV families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub enum Format {
    // Color.
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
    // Block compressed.
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
    // Depth and stencil.
    D16Unorm,
    D24UnormS8Uint,
    D32Float,
    S8Uint,
    // Packed YUV.
    Yuy2,
    Uyvy,
    // Planar YUV.
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
}

/// One row of the format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub bits_per_element: u32,
    /// Compression block width in pixels. 1 for uncompressed formats.
    pub block_width: u32,
    pub block_height: u32,
    pub block_depth: u32,
    pub render_target: bool,
    pub astc: bool,
    /// Hardware SURFACE_STATE format code.
    pub surface_state_code: u16,
    /// Hardware compression format code used by aux programming.
    pub compression_code: u8,
    /// First generation the format exists on.
    pub supported_since: GpuGen,
}

/// How a planar format arranges its chroma planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanarFamily {
    /// Y plane followed by an interleaved UV plane at half height (NV12,
    /// P010, P016). The UV plane has double the Y bits per element.
    PackedUv,
    /// Y plane followed by U and V planes stacked below it, each padded to
    /// full pitch rows (IMC1 and IMC3; IMC1 stores V above U).
    ImcStacked { v_first: bool },
    /// Y plane followed by U and V side by side in the same rows (IMC2 and
    /// IMC4; IMC2 stores V in the left half). Requires an even pitch.
    ImcSideBySide { v_first: bool },
    /// Chroma planes linearly packed at the tail with byte-exact rounding.
    /// The divisor is 2 for YV12/I420 (4:2:0) and 4 for YVU9 (4:1:0).
    TailPacked { downscale: u32, v_first: bool },
    /// Three full-resolution planes (RGBP, BGRP).
    FullPlanes,
}

impl Format {
    /// Looks up the table entry for this format.
    pub const fn info(self) -> FormatInfo {
        use GpuGen::*;
        match self {
            Format::R8Unorm => color(8, 0x140, Gen7),
            Format::R8G8Unorm => color(16, 0x106, Gen7),
            Format::R8G8B8A8Unorm => color(32, 0x0C7, Gen7),
            Format::B8G8R8A8Unorm => color(32, 0x0C0, Gen7),
            Format::R10G10B10A2Unorm => color(32, 0x0C8, Gen7),
            Format::B5G6R5Unorm => color(16, 0x100, Gen7),
            Format::R16Float => color(16, 0x10E, Gen7),
            Format::R16G16Float => color(32, 0x0D0, Gen7),
            Format::R16G16B16A16Float => color(64, 0x084, Gen7),
            Format::R32Float => color(32, 0x0D8, Gen7),
            Format::R32G32Float => color(64, 0x085, Gen7),
            Format::R32G32B32A32Float => color(128, 0x000, Gen7),
            Format::Bc1 => compressed(64, 4, 4, 0x186, Gen7),
            Format::Bc2 => compressed(128, 4, 4, 0x187, Gen7),
            Format::Bc3 => compressed(128, 4, 4, 0x188, Gen7),
            Format::Bc4 => compressed(64, 4, 4, 0x189, Gen7),
            Format::Bc5 => compressed(128, 4, 4, 0x18B, Gen7),
            Format::Bc6h => compressed(128, 4, 4, 0x1A1, Gen7),
            Format::Bc7 => compressed(128, 4, 4, 0x1A2, Gen7),
            Format::Astc4x4 => astc(4, 4, 0x200, Gen9),
            Format::Astc5x4 => astc(5, 4, 0x208, Gen9),
            Format::Astc6x6 => astc(6, 6, 0x211, Gen9),
            Format::Astc8x8 => astc(8, 8, 0x219, Gen9),
            Format::Astc10x10 => astc(10, 10, 0x222, Gen9),
            Format::Astc12x12 => astc(12, 12, 0x22A, Gen9),
            Format::D16Unorm => depth(16, 0x128, Gen7),
            Format::D24UnormS8Uint => depth(32, 0x121, Gen7),
            Format::D32Float => depth(32, 0x122, Gen7),
            Format::S8Uint => depth(8, 0x13B, Gen7),
            Format::Yuy2 => yuv(16, 0x190, Gen7),
            Format::Uyvy => yuv(16, 0x192, Gen7),
            Format::Nv12 => yuv(8, 0x19C, Gen7),
            Format::P010 => yuv(16, 0x19E, Gen9),
            Format::P016 => yuv(16, 0x19F, Gen9),
            Format::Imc1 => yuv(8, 0x194, Gen7),
            Format::Imc2 => yuv(8, 0x195, Gen7),
            Format::Imc3 => yuv(8, 0x196, Gen7),
            Format::Imc4 => yuv(8, 0x197, Gen7),
            Format::Yv12 => yuv(8, 0x198, Gen7),
            Format::I420 => yuv(8, 0x199, Gen7),
            Format::Yvu9 => yuv(8, 0x19A, Gen7),
            Format::Rgbp => yuv(8, 0x1A8, Gen7),
            Format::Bgrp => yuv(8, 0x1A9, Gen7),
        }
    }

    pub const fn bits_per_element(self) -> u32 {
        self.info().bits_per_element
    }

    /// Bytes per element. Sub-byte formats do not occur in this table.
    pub const fn bytes_per_element(self) -> u32 {
        self.info().bits_per_element / 8
    }

    pub const fn is_compressed(self) -> bool {
        self.info().block_width > 1 || self.info().block_height > 1
    }

    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            Format::D16Unorm | Format::D24UnormS8Uint | Format::D32Float
        )
    }

    /// Separate stencil, stored through TileW on the legacy path.
    pub const fn is_stencil(self) -> bool {
        matches!(self, Format::S8Uint)
    }

    pub const fn is_planar(self) -> bool {
        self.planar_family().is_some()
    }

    pub const fn planar_family(self) -> Option<PlanarFamily> {
        match self {
            Format::Nv12 | Format::P010 | Format::P016 => Some(PlanarFamily::PackedUv),
            Format::Imc1 => Some(PlanarFamily::ImcStacked { v_first: true }),
            Format::Imc3 => Some(PlanarFamily::ImcStacked { v_first: false }),
            Format::Imc2 => Some(PlanarFamily::ImcSideBySide { v_first: true }),
            Format::Imc4 => Some(PlanarFamily::ImcSideBySide { v_first: false }),
            Format::Yv12 => Some(PlanarFamily::TailPacked {
                downscale: 2,
                v_first: true,
            }),
            Format::I420 => Some(PlanarFamily::TailPacked {
                downscale: 2,
                v_first: false,
            }),
            Format::Yvu9 => Some(PlanarFamily::TailPacked {
                downscale: 4,
                v_first: true,
            }),
            Format::Rgbp | Format::Bgrp => Some(PlanarFamily::FullPlanes),
            _ => None,
        }
    }

    /// Number of distinct planes the layout tracks for this format.
    pub const fn plane_count(self) -> u32 {
        match self.planar_family() {
            Some(PlanarFamily::PackedUv) => 2,
            Some(_) => 3,
            None => 1,
        }
    }
}

const fn color(bits: u32, code: u16, since: GpuGen) -> FormatInfo {
    FormatInfo {
        bits_per_element: bits,
        block_width: 1,
        block_height: 1,
        block_depth: 1,
        render_target: true,
        astc: false,
        surface_state_code: code,
        compression_code: (bits / 8) as u8,
        supported_since: since,
    }
}

const fn compressed(bits: u32, bw: u32, bh: u32, code: u16, since: GpuGen) -> FormatInfo {
    FormatInfo {
        bits_per_element: bits,
        block_width: bw,
        block_height: bh,
        block_depth: 1,
        render_target: false,
        astc: false,
        surface_state_code: code,
        compression_code: 0,
        supported_since: since,
    }
}

const fn astc(bw: u32, bh: u32, code: u16, since: GpuGen) -> FormatInfo {
    FormatInfo {
        bits_per_element: 128,
        block_width: bw,
        block_height: bh,
        block_depth: 1,
        render_target: false,
        astc: true,
        surface_state_code: code,
        compression_code: 0,
        supported_since: since,
    }
}

const fn depth(bits: u32, code: u16, since: GpuGen) -> FormatInfo {
    FormatInfo {
        bits_per_element: bits,
        block_width: 1,
        block_height: 1,
        block_depth: 1,
        render_target: false,
        astc: false,
        surface_state_code: code,
        compression_code: 0,
        supported_since: since,
    }
}

const fn yuv(bits: u32, code: u16, since: GpuGen) -> FormatInfo {
    FormatInfo {
        bits_per_element: bits,
        block_width: 1,
        block_height: 1,
        block_depth: 1,
        render_target: true,
        astc: false,
        surface_state_code: code,
        compression_code: (bits / 8) as u8,
        supported_since: since,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_per_element() {
        assert_eq!(32, Format::R8G8B8A8Unorm.bits_per_element());
        assert_eq!(64, Format::Bc1.bits_per_element());
        assert_eq!(128, Format::Bc7.bits_per_element());
        assert_eq!(8, Format::Nv12.bits_per_element());
        assert_eq!(16, Format::P010.bits_per_element());
        assert_eq!(8, Format::S8Uint.bits_per_element());
    }

    #[test]
    fn block_dimensions() {
        assert_eq!(1, Format::R8Unorm.info().block_width);
        assert_eq!(4, Format::Bc3.info().block_width);
        assert_eq!(12, Format::Astc12x12.info().block_width);
        assert!(Format::Bc1.is_compressed());
        assert!(!Format::Nv12.is_compressed());
    }

    #[test]
    fn planar_families() {
        assert_eq!(Some(PlanarFamily::PackedUv), Format::Nv12.planar_family());
        assert_eq!(
            Some(PlanarFamily::ImcSideBySide { v_first: false }),
            Format::Imc4.planar_family()
        );
        assert_eq!(
            Some(PlanarFamily::TailPacked {
                downscale: 4,
                v_first: true
            }),
            Format::Yvu9.planar_family()
        );
        assert_eq!(Some(PlanarFamily::FullPlanes), Format::Rgbp.planar_family());
        assert_eq!(None, Format::D32Float.planar_family());
    }

    #[test]
    fn plane_counts() {
        assert_eq!(1, Format::R8G8B8A8Unorm.plane_count());
        assert_eq!(2, Format::Nv12.plane_count());
        assert_eq!(3, Format::Imc2.plane_count());
        assert_eq!(3, Format::Rgbp.plane_count());
    }

    #[test]
    fn generation_gating() {
        assert_eq!(GpuGen::Gen9, Format::Astc4x4.info().supported_since);
        assert_eq!(GpuGen::Gen9, Format::P010.info().supported_since);
        assert_eq!(GpuGen::Gen7, Format::Nv12.info().supported_since);
    }

    #[test]
    fn render_target_eligibility() {
        assert!(Format::R8G8B8A8Unorm.info().render_target);
        assert!(!Format::Bc7.info().render_target);
        assert!(!Format::D32Float.info().render_target);
    }
}
