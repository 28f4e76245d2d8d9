#![no_main]
use libfuzzer_sys::fuzz_target;

extern crate arbitrary;
use arbitrary::{Arbitrary, Result, Unstructured};

use igfx_layout::{
    Format, GpuGen, InfoFlags, LibraryContext, ResourceDesc, ResourceInfo, ResourceType, SkuFlags,
    TilingFlags, UsageFlags,
};

#[derive(Debug)]
struct Input {
    gen: GpuGen,
    desc: ResourceDesc,
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let resource_type = *u.choose(&[
            ResourceType::Buffer,
            ResourceType::Tex1D,
            ResourceType::Tex2D,
            ResourceType::Tex3D,
            ResourceType::Cube,
            ResourceType::Primary,
            ResourceType::Shadow,
            ResourceType::Staging,
            ResourceType::Cursor,
        ])?;
        Ok(Input {
            gen: u.arbitrary()?,
            desc: ResourceDesc {
                resource_type,
                format: u.arbitrary::<Format>()?,
                width: u.int_in_range(0..=32768)?,
                height: u.int_in_range(0..=32768)?,
                depth: u.int_in_range(0..=4096)?,
                array_size: u.int_in_range(0..=8192)?,
                mip_levels: u.int_in_range(0..=20)?,
                samples: u.int_in_range(0..=17)?,
                usage: UsageFlags::from_bits_truncate(u.arbitrary()?),
                info: InfoFlags::from_bits_truncate(u.arbitrary()?),
                tiling: TilingFlags::from_bits_truncate(u.arbitrary()?),
                pitch_override: u.arbitrary()?,
                base_alignment_override: u.arbitrary()?,
                existing_sysmem_size: u.arbitrary()?,
            },
        })
    }
}

// Creation must reject bad requests with an error, never panic, and any
// accepted layout must satisfy the basic pitch and size invariants.
fuzz_target!(|input: Input| {
    let ctx = LibraryContext::new(input.gen, SkuFlags::default());
    if let Ok(info) = ResourceInfo::create(&ctx, input.desc) {
        assert!(info.pitch() > 0);
        assert!(info.size() > 0);
        assert!(info.total_size() >= info.size());
        assert!(info.base_alignment() > 0);
    }
});
