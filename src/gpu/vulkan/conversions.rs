use ash::vk;

use crate::gpu::structs::*;

impl From<Format> for vk::Format {
    fn from(format: Format) -> Self {
        match format {
            Format::Unknown => vk::Format::UNDEFINED,
            Format::R8Unorm => vk::Format::R8_UNORM,
            Format::R32Uint => vk::Format::R32_UINT,
            Format::R32Float => vk::Format::R32_SFLOAT,
            Format::RGBA8Unorm => vk::Format::R8G8B8A8_UNORM,
            Format::BGRA8Unorm => vk::Format::B8G8R8A8_UNORM,
            Format::RGBA16Float => vk::Format::R16G16B16A16_SFLOAT,
            Format::RGBA32Float => vk::Format::R32G32B32A32_SFLOAT,
            Format::D32Float => vk::Format::D32_SFLOAT,
            Format::D24S8 => vk::Format::D24_UNORM_S8_UINT,
        }
    }
}

impl From<Filter> for vk::Filter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => vk::Filter::NEAREST,
            Filter::Linear => vk::Filter::LINEAR,
        }
    }
}

impl From<Filter> for vk::SamplerMipmapMode {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
            Filter::Linear => vk::SamplerMipmapMode::LINEAR,
        }
    }
}

impl From<AddressMode> for vk::SamplerAddressMode {
    fn from(mode: AddressMode) -> Self {
        match mode {
            AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
            AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
            AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        }
    }
}

impl From<QueryType> for vk::QueryType {
    fn from(ty: QueryType) -> Self {
        match ty {
            QueryType::Timestamp => vk::QueryType::TIMESTAMP,
            QueryType::Occlusion => vk::QueryType::OCCLUSION,
        }
    }
}

impl From<TextureType> for vk::ImageType {
    fn from(ty: TextureType) -> Self {
        match ty {
            TextureType::Texture1D => vk::ImageType::TYPE_1D,
            TextureType::Texture2D => vk::ImageType::TYPE_2D,
            TextureType::Texture3D => vk::ImageType::TYPE_3D,
        }
    }
}

pub(super) fn buffer_usage(usage: BufferUsageBits) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsageBits::SHADER_RESOURCE) {
        flags |= vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsageBits::SHADER_RESOURCE_STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER | vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsageBits::VERTEX_BUFFER) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsageBits::INDEX_BUFFER) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsageBits::CONSTANT_BUFFER) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsageBits::ARGUMENT_BUFFER) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    // Copies are always allowed so staging through any buffer works.
    flags | vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST
}

pub(super) fn texture_usage(usage: TextureUsageBits) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsageBits::SHADER_RESOURCE) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsageBits::SHADER_RESOURCE_STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsageBits::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsageBits::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    flags | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST
}

pub(super) fn sample_count(count: u32) -> vk::SampleCountFlags {
    match count {
        0 | 1 => vk::SampleCountFlags::TYPE_1,
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        16 => vk::SampleCountFlags::TYPE_16,
        32 => vk::SampleCountFlags::TYPE_32,
        _ => vk::SampleCountFlags::TYPE_64,
    }
}

pub(super) fn aspect_mask(format: Format) -> vk::ImageAspectFlags {
    match format {
        Format::D32Float => vk::ImageAspectFlags::DEPTH,
        Format::D24S8 => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

pub(super) fn image_view_type(ty: TextureType, layers: u32) -> vk::ImageViewType {
    match (ty, layers > 1) {
        (TextureType::Texture1D, false) => vk::ImageViewType::TYPE_1D,
        (TextureType::Texture1D, true) => vk::ImageViewType::TYPE_1D_ARRAY,
        (TextureType::Texture2D, false) => vk::ImageViewType::TYPE_2D,
        (TextureType::Texture2D, true) => vk::ImageViewType::TYPE_2D_ARRAY,
        (TextureType::Texture3D, _) => vk::ImageViewType::TYPE_3D,
    }
}

pub(super) fn format_support(
    optimal: vk::FormatFeatureFlags,
    buffer: vk::FormatFeatureFlags,
) -> FormatSupportBits {
    let mut bits = FormatSupportBits::empty();
    if optimal.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE) {
        bits |= FormatSupportBits::TEXTURE;
    }
    if optimal.contains(vk::FormatFeatureFlags::STORAGE_IMAGE) {
        bits |= FormatSupportBits::STORAGE_TEXTURE;
    }
    if optimal.contains(vk::FormatFeatureFlags::COLOR_ATTACHMENT) {
        bits |= FormatSupportBits::COLOR_ATTACHMENT;
    }
    if optimal.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT) {
        bits |= FormatSupportBits::DEPTH_STENCIL;
    }
    if buffer.contains(vk::FormatFeatureFlags::UNIFORM_TEXEL_BUFFER) {
        bits |= FormatSupportBits::BUFFER;
    }
    if buffer.contains(vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER) {
        bits |= FormatSupportBits::STORAGE_BUFFER;
    }
    if buffer.contains(vk::FormatFeatureFlags::VERTEX_BUFFER) {
        bits |= FormatSupportBits::VERTEX_BUFFER;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_always_copyable() {
        let flags = buffer_usage(BufferUsageBits::CONSTANT_BUFFER);
        assert!(flags.contains(vk::BufferUsageFlags::UNIFORM_BUFFER));
        assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
    }

    #[test]
    fn depth_formats_use_depth_aspects() {
        assert_eq!(aspect_mask(Format::D32Float), vk::ImageAspectFlags::DEPTH);
        assert_eq!(aspect_mask(Format::RGBA8Unorm), vk::ImageAspectFlags::COLOR);
        assert_eq!(
            image_view_type(TextureType::Texture2D, 6),
            vk::ImageViewType::TYPE_2D_ARRAY
        );
    }
}
