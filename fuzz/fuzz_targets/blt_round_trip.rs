#![no_main]
use libfuzzer_sys::fuzz_target;

extern crate arbitrary;
use arbitrary::{Arbitrary, Result, Unstructured};

use igfx_layout::blit::{cpu_blt, BltDirection, CpuBltRequest};
use igfx_layout::{
    Format, GpuGen, LibraryContext, ResourceDesc, ResourceInfo, SkuFlags, TilingFlags, UsageFlags,
};

#[derive(Debug)]
struct Input {
    gen: GpuGen,
    width: u32,
    height: u32,
    tiling: TilingFlags,
    fill: u8,
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let tiling = *u.choose(&[
            TilingFlags::LINEAR,
            TilingFlags::TILE_X,
            TilingFlags::TILE_Y,
            TilingFlags::TILE_4,
        ])?;
        Ok(Input {
            gen: if tiling == TilingFlags::TILE_4 {
                GpuGen::Gen12
            } else {
                GpuGen::Gen9
            },
            width: u.int_in_range(1..=1024)?,
            height: u.int_in_range(1..=1024)?,
            tiling,
            fill: u.arbitrary()?,
        })
    }
}

// Uploading a buffer and downloading it back must reproduce it exactly.
fuzz_target!(|input: Input| {
    let ctx = LibraryContext::new(input.gen, SkuFlags::default());
    let usage = if input.tiling == TilingFlags::TILE_X {
        UsageFlags::RENDER_TARGET
    } else {
        UsageFlags::TEXTURE
    };
    let info = match ResourceInfo::create(
        &ctx,
        ResourceDesc {
            format: Format::R8G8B8A8Unorm,
            width: input.width,
            height: input.height,
            usage,
            tiling: input.tiling,
            ..ResourceDesc::default()
        },
    ) {
        Ok(info) => info,
        Err(_) => return,
    };

    let row = input.width as usize * 4;
    let mut gpu = vec![0u8; info.size() as usize];
    let mut source: Vec<u8> = (0..row * input.height as usize)
        .map(|i| (i as u8).wrapping_add(input.fill))
        .collect();

    cpu_blt(
        &info,
        &mut gpu,
        &mut source,
        &CpuBltRequest {
            direction: BltDirection::Upload,
            ..CpuBltRequest::default()
        },
    )
    .unwrap();

    let mut back = vec![0u8; source.len()];
    cpu_blt(
        &info,
        &mut gpu,
        &mut back,
        &CpuBltRequest {
            direction: BltDirection::Download,
            ..CpuBltRequest::default()
        },
    )
    .unwrap();
    assert_eq!(source, back);
});
