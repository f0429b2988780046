use ash::vk;

use super::VulkanBackend;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::memory::{
    MemoryPropertyBits, MemoryTypeId, ResourceClass, VulkanMemoryLayout, VulkanRequirements,
};
use crate::gpu::objects::{Buffer, Memory, Texture};
use crate::gpu::structs::*;
use crate::utils::Handle;

#[derive(Debug)]
pub(super) struct VkBuffer {
    pub raw: vk::Buffer,
    pub desc: BufferDesc,
    pub memory: Option<Handle<Memory>>,
    pub offset: u64,
    /// Memory was allocated together with the buffer and dies with it.
    pub owns_memory: bool,
}

#[derive(Debug)]
pub(super) struct VkTexture {
    pub raw: vk::Image,
    pub desc: TextureDesc,
    pub memory: Option<Handle<Memory>>,
    pub owns_memory: bool,
}

#[derive(Debug)]
pub(super) struct VkMemory {
    /// Dedicated memory stays `None` until its resource is bound.
    pub raw: Option<vk::DeviceMemory>,
    pub size: u64,
    pub memory_type: MemoryTypeId,
    /// Persistent mapping of the whole allocation, null when not host visible.
    pub mapped: *mut u8,
}

/// Resource a dedicated allocation is made for.
#[derive(Clone, Copy)]
pub(super) enum DedicatedTarget {
    Buffer(vk::Buffer),
    Image(vk::Image),
}

fn requirements_of(
    memory: vk::MemoryRequirements,
    dedicated: &vk::MemoryDedicatedRequirements,
) -> VulkanRequirements {
    VulkanRequirements {
        size: memory.size,
        alignment: memory.alignment,
        type_mask: memory.memory_type_bits,
        prefers_dedicated: dedicated.prefers_dedicated_allocation == vk::TRUE,
        requires_dedicated: dedicated.requires_dedicated_allocation == vk::TRUE,
    }
}

impl VulkanBackend {
    pub(super) fn buffer_requirements(&self, raw: vk::Buffer) -> VulkanRequirements {
        let mut dedicated = vk::MemoryDedicatedRequirements::default();
        let memory = {
            let mut requirements = vk::MemoryRequirements2::builder().push_next(&mut dedicated);
            let info = vk::BufferMemoryRequirementsInfo2::builder().buffer(raw);
            unsafe {
                self.device
                    .get_buffer_memory_requirements2(&info, &mut requirements)
            };
            requirements.memory_requirements
        };
        requirements_of(memory, &dedicated)
    }

    pub(super) fn image_requirements(&self, raw: vk::Image) -> VulkanRequirements {
        let mut dedicated = vk::MemoryDedicatedRequirements::default();
        let memory = {
            let mut requirements = vk::MemoryRequirements2::builder().push_next(&mut dedicated);
            let info = vk::ImageMemoryRequirementsInfo2::builder().image(raw);
            unsafe {
                self.device
                    .get_image_memory_requirements2(&info, &mut requirements)
            };
            requirements.memory_requirements
        };
        requirements_of(memory, &dedicated)
    }

    /// Classifies a resource's requirements for `location`.
    pub(super) fn memory_desc(
        &self,
        class: ResourceClass,
        requirements: &VulkanRequirements,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        self.memory_layout
            .memory_desc(class, location, requirements)
            .map_err(|err| {
                log::error!("Can't find a memory type for {:?}: {}", location, err);
                err
            })
    }

    pub(super) fn memory_properties_of(&self, memory_type: MemoryTypeId) -> Result<(u32, MemoryPropertyBits)> {
        let index = VulkanMemoryLayout::memory_type_index(memory_type);
        if index >= self.memory_properties.memory_type_count {
            return Err(GPUError::invalid(format!(
                "memory type {:?} does not exist on this device",
                memory_type
            )));
        }
        let native = self.memory_properties.memory_types[index as usize];
        Ok((
            native.heap_index,
            MemoryPropertyBits::from_bits_truncate(native.property_flags.as_raw()),
        ))
    }

    /// Allocates and, when host visible, persistently maps native memory.
    pub(super) fn allocate_device_memory(
        &mut self,
        size: u64,
        memory_type: MemoryTypeId,
        dedicated: Option<DedicatedTarget>,
    ) -> Result<(vk::DeviceMemory, *mut u8)> {
        let (heap_index, properties) = self.memory_properties_of(memory_type)?;

        let mut dedicated_info = vk::MemoryDedicatedAllocateInfo::builder();
        match dedicated {
            Some(DedicatedTarget::Buffer(buffer)) => dedicated_info = dedicated_info.buffer(buffer),
            Some(DedicatedTarget::Image(image)) => dedicated_info = dedicated_info.image(image),
            None => {}
        }
        let mut info = vk::MemoryAllocateInfo::builder()
            .allocation_size(size)
            .memory_type_index(VulkanMemoryLayout::memory_type_index(memory_type));
        if dedicated.is_some() {
            info = info.push_next(&mut dedicated_info);
        }

        let raw = unsafe { self.device.allocate_memory(&info, None) }?;

        let mapped = if properties.contains(MemoryPropertyBits::HOST_VISIBLE) {
            match unsafe {
                self.device
                    .map_memory(raw, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
            } {
                Ok(ptr) => ptr as *mut u8,
                Err(err) => {
                    unsafe { self.device.free_memory(raw, None) };
                    return Err(err.into());
                }
            }
        } else {
            std::ptr::null_mut()
        };

        self.heap_usage[heap_index as usize] += size;
        if dedicated.is_some() {
            log::debug!("Dedicated allocation of {} bytes ({:?})", size, memory_type);
        }
        Ok((raw, mapped))
    }

    pub(super) fn release_device_memory(&mut self, memory: &VkMemory) {
        if let Some(raw) = memory.raw {
            unsafe { self.device.free_memory(raw, None) };
            if let Ok((heap_index, _)) = self.memory_properties_of(memory.memory_type) {
                let usage = &mut self.heap_usage[heap_index as usize];
                *usage = usage.saturating_sub(memory.size);
            }
        }
    }

    /// Native memory for a binding, creating dedicated memory on first use.
    fn memory_for_binding(
        &mut self,
        memory: Handle<Memory>,
        target: DedicatedTarget,
        offset: u64,
        required_size: u64,
    ) -> Result<vk::DeviceMemory> {
        let record = self
            .memories
            .get_ref(memory)
            .ok_or_else(|| GPUError::invalid(format!("unknown memory handle {:?}", memory)))?;

        if !record.memory_type.is_dedicated() {
            return record
                .raw
                .ok_or_else(|| GPUError::invalid("shared memory has no native allocation"));
        }
        if record.raw.is_some() {
            return Err(GPUError::invalid(format!(
                "dedicated memory {:?} already backs another resource",
                memory
            )));
        }
        // The allocation is sized to the resource, which must start at zero.
        if offset != 0 {
            return Err(GPUError::invalid(format!(
                "dedicated memory {:?} bound at non-zero offset {}",
                memory, offset
            )));
        }
        if record.size < required_size {
            return Err(GPUError::invalid(format!(
                "dedicated memory {:?} holds {} bytes but the resource needs {}",
                memory, record.size, required_size
            )));
        }

        let memory_type = record.memory_type;
        let (raw, mapped) =
            self.allocate_device_memory(required_size, memory_type, Some(target))?;
        if let Some(record) = self.memories.get_mut_ref(memory) {
            record.raw = Some(raw);
            record.size = required_size;
            record.mapped = mapped;
        }
        Ok(raw)
    }

    pub(super) fn bind_buffer(&mut self, binding: &BufferMemoryBinding) -> Result<()> {
        let raw_buffer = self.buffer(binding.buffer)?.raw;
        let required = self.buffer_requirements(raw_buffer).size;
        let memory = self.memory_for_binding(
            binding.memory,
            DedicatedTarget::Buffer(raw_buffer),
            binding.offset,
            required,
        )?;

        unsafe {
            self.device
                .bind_buffer_memory(raw_buffer, memory, binding.offset)
        }?;

        if let Some(buffer) = self.buffers.get_mut_ref(binding.buffer) {
            buffer.memory = Some(binding.memory);
            buffer.offset = binding.offset;
        }
        Ok(())
    }

    pub(super) fn bind_texture(&mut self, binding: &TextureMemoryBinding) -> Result<()> {
        let raw_image = self.texture(binding.texture)?.raw;
        let required = self.image_requirements(raw_image).size;
        let memory = self.memory_for_binding(
            binding.memory,
            DedicatedTarget::Image(raw_image),
            binding.offset,
            required,
        )?;

        unsafe { self.device.bind_image_memory(raw_image, memory, binding.offset) }?;

        if let Some(texture) = self.textures.get_mut_ref(binding.texture) {
            texture.memory = Some(binding.memory);
        }
        Ok(())
    }

    pub(super) fn video_memory_info(&self, location: MemoryLocation) -> VideoMemoryInfo {
        let want_device_local = matches!(
            location,
            MemoryLocation::Device | MemoryLocation::DeviceUpload
        );
        let heap_count = self.memory_properties.memory_heap_count as usize;
        let heaps = &self.memory_properties.memory_heaps[..heap_count];

        let mut selected: Vec<usize> = heaps
            .iter()
            .enumerate()
            .filter(|(_, heap)| {
                heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL) == want_device_local
            })
            .map(|(index, _)| index)
            .collect();
        // Unified memory exposes a single device-local heap.
        if selected.is_empty() {
            selected = (0..heap_count).collect();
        }

        VideoMemoryInfo {
            budget_size: selected.iter().map(|&i| heaps[i].size).sum(),
            usage_size: selected.iter().map(|&i| self.heap_usage[i]).sum(),
        }
    }

    pub(super) fn buffer(&self, buffer: Handle<Buffer>) -> Result<&VkBuffer> {
        self.buffers
            .get_ref(buffer)
            .ok_or_else(|| GPUError::invalid(format!("unknown buffer handle {:?}", buffer)))
    }

    pub(super) fn texture(&self, texture: Handle<Texture>) -> Result<&VkTexture> {
        self.textures
            .get_ref(texture)
            .ok_or_else(|| GPUError::invalid(format!("unknown texture handle {:?}", texture)))
    }
}
