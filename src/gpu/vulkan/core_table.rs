use std::ffi::CString;
use std::time::Duration;

use ash::vk;
use ash::vk::Handle as _;

use super::conversions::*;
use super::memory::{VkBuffer, VkMemory, VkTexture};
use super::{VkCommandAllocator, VkCommandBuffer, VkDescriptor, VulkanBackend, LOG_TARGET};
use crate::gpu::config::DescriptorPoolDesc;
use crate::gpu::descriptor::{
    DescriptorAllocator, DescriptorHeapType, DescriptorRange, HostDescriptorBacking,
};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::interface::CoreInterface;
use crate::gpu::memory::{MemoryPropertyBits, ResourceClass};
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::Handle;

fn unknown<K>(kind: &str, handle: Handle<K>) -> GPUError {
    GPUError::invalid(format!("unknown {} handle {:?}", kind, handle))
}

fn timeout_ns(timeout: Duration) -> u64 {
    if timeout == WAIT_INFINITE {
        u64::MAX
    } else {
        u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
    }
}

impl VulkanBackend {
    fn command_buffer(&self, cmd: Handle<CommandBuffer>) -> Result<vk::CommandBuffer> {
        self.command_buffers
            .get_ref(cmd)
            .map(|c| c.raw)
            .ok_or_else(|| unknown("command buffer", cmd))
    }

    fn fence(&self, fence: Handle<Fence>) -> Result<vk::Semaphore> {
        self.fences
            .get_ref(fence)
            .copied()
            .ok_or_else(|| unknown("fence", fence))
    }

    fn descriptor_pool(
        &mut self,
        pool: Handle<DescriptorPool>,
    ) -> Result<&mut DescriptorAllocator<HostDescriptorBacking>> {
        self.descriptor_pools
            .get_mut_ref(pool)
            .ok_or_else(|| unknown("descriptor pool", pool))
    }

    fn release_owned_memory(&mut self, memory: Option<Handle<Memory>>) {
        if let Some(record) = memory.and_then(|m| self.memories.release(m)) {
            self.release_device_memory(&record);
        }
    }

    /// Native object type and handle, when one exists.
    fn native_object(&self, object: Object) -> Option<(vk::ObjectType, u64)> {
        fn raw<T: vk::Handle>(handle: T) -> (vk::ObjectType, u64) {
            (T::TYPE, handle.as_raw())
        }
        match object {
            Object::Device => Some(raw(self.device.handle())),
            Object::Buffer(h) => self.buffers.get_ref(h).map(|b| raw(b.raw)),
            Object::Texture(h) => self.textures.get_ref(h).map(|t| raw(t.raw)),
            Object::Descriptor(h) => self.descriptors.get_ref(h).map(|d| match *d {
                VkDescriptor::Buffer {
                    view: Some(view), ..
                } => raw(view),
                VkDescriptor::Buffer { buffer, .. } => raw(buffer),
                VkDescriptor::Image(view) => raw(view),
                VkDescriptor::Sampler(sampler) => raw(sampler),
            }),
            Object::Fence(h) => self.fences.get_ref(h).map(|s| raw(*s)),
            Object::Memory(h) => self
                .memories
                .get_ref(h)
                .and_then(|m| m.raw)
                .map(raw),
            Object::CommandQueue(h) => self.queues.get_ref(h).map(|q| raw(q.raw)),
            Object::CommandAllocator(h) => self.command_allocators.get_ref(h).map(|a| raw(a.raw)),
            Object::CommandBuffer(h) => self.command_buffers.get_ref(h).map(|c| raw(c.raw)),
            Object::QueryPool(h) => self.query_pools.get_ref(h).map(|p| raw(*p)),
            Object::DescriptorPool(_)
            | Object::SwapChain(_)
            | Object::AccelerationStructure(_)
            | Object::Streamer(_) => None,
        }
    }
}

impl CoreInterface for VulkanBackend {
    fn get_device_desc(&self) -> &DeviceDesc {
        &self.desc
    }

    fn get_buffer_desc(&self, buffer: Handle<Buffer>) -> Result<BufferDesc> {
        Ok(self.buffer(buffer)?.desc)
    }

    fn get_texture_desc(&self, texture: Handle<Texture>) -> Result<TextureDesc> {
        Ok(self.texture(texture)?.desc)
    }

    fn get_format_support(&self, format: Format) -> FormatSupportBits {
        if format == Format::Unknown {
            return FormatSupportBits::empty();
        }
        let props = unsafe {
            self.instance
                .get_physical_device_format_properties(self.pdevice, format.into())
        };
        format_support(props.optimal_tiling_features, props.buffer_features)
    }

    fn get_buffer_memory_desc(
        &self,
        buffer: Handle<Buffer>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let raw = self.buffer(buffer)?.raw;
        self.memory_desc(ResourceClass::Buffer, &self.buffer_requirements(raw), location)
    }

    fn get_texture_memory_desc(
        &self,
        texture: Handle<Texture>,
        location: MemoryLocation,
    ) -> Result<MemoryDesc> {
        let raw = self.texture(texture)?.raw;
        self.memory_desc(ResourceClass::Texture, &self.image_requirements(raw), location)
    }

    fn get_command_queue(&mut self, queue_type: QueueType) -> Result<Handle<CommandQueue>> {
        if let Some(handle) = self.queue_handles.get(&queue_type) {
            return Ok(*handle);
        }
        let queue = self.queue_families[super::queue_index(queue_type)];
        let handle = self.queues.insert(queue);
        self.queue_handles.insert(queue_type, handle);
        Ok(handle)
    }

    fn create_command_allocator(
        &mut self,
        queue: Handle<CommandQueue>,
    ) -> Result<Handle<CommandAllocator>> {
        let family = self.queue(queue)?.family;
        let raw = unsafe {
            self.device.create_command_pool(
                &vk::CommandPoolCreateInfo::builder().queue_family_index(family),
                None,
            )
        }?;
        Ok(self.command_allocators.insert(VkCommandAllocator { raw }))
    }

    fn create_command_buffer(
        &mut self,
        allocator: Handle<CommandAllocator>,
    ) -> Result<Handle<CommandBuffer>> {
        let pool = self
            .command_allocators
            .get_ref(allocator)
            .ok_or_else(|| unknown("command allocator", allocator))?
            .raw;
        let raw = unsafe {
            self.device.allocate_command_buffers(
                &vk::CommandBufferAllocateInfo::builder()
                    .command_pool(pool)
                    .level(vk::CommandBufferLevel::PRIMARY)
                    .command_buffer_count(1),
            )
        }?;
        let raw = raw.first().copied().ok_or(GPUError::OutOfMemory)?;
        Ok(self.command_buffers.insert(VkCommandBuffer {
            raw,
            allocator,
            descriptor_pool: None,
        }))
    }

    fn create_descriptor_pool(
        &mut self,
        desc: &DescriptorPoolDesc,
    ) -> Result<Handle<DescriptorPool>> {
        let resolved = desc.resolved(&self.descriptor_pool_defaults);
        let pool = DescriptorAllocator::new(HostDescriptorBacking::new(), &resolved)?;
        Ok(self.descriptor_pools.insert(pool))
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Handle<Buffer>> {
        let raw = unsafe {
            self.device.create_buffer(
                &vk::BufferCreateInfo::builder()
                    .size(desc.size)
                    .usage(buffer_usage(desc.usage))
                    .sharing_mode(vk::SharingMode::EXCLUSIVE),
                None,
            )
        }?;
        Ok(self.buffers.insert(VkBuffer {
            raw,
            desc: *desc,
            memory: None,
            offset: 0,
            owns_memory: false,
        }))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Handle<Texture>> {
        let raw = unsafe {
            self.device.create_image(
                &vk::ImageCreateInfo::builder()
                    .image_type(desc.texture_type.into())
                    .format(desc.format.into())
                    .extent(vk::Extent3D {
                        width: desc.width.max(1),
                        height: desc.height.max(1),
                        depth: desc.depth.max(1),
                    })
                    .mip_levels(desc.mip_num.max(1))
                    .array_layers(desc.layer_num.max(1))
                    .samples(sample_count(desc.sample_num))
                    .tiling(vk::ImageTiling::OPTIMAL)
                    .usage(texture_usage(desc.usage))
                    .sharing_mode(vk::SharingMode::EXCLUSIVE)
                    .initial_layout(vk::ImageLayout::UNDEFINED),
                None,
            )
        }?;
        Ok(self.textures.insert(VkTexture {
            raw,
            desc: *desc,
            memory: None,
            owns_memory: false,
        }))
    }

    fn create_buffer_view(&mut self, desc: &BufferViewDesc) -> Result<Handle<Descriptor>> {
        let buffer = self.buffer(desc.buffer)?.raw;
        // Typed views only exist for formatted, non-constant access.
        let view = if desc.format == Format::Unknown || desc.view_type == BufferViewType::Constant
        {
            None
        } else {
            Some(unsafe {
                self.device.create_buffer_view(
                    &vk::BufferViewCreateInfo::builder()
                        .buffer(buffer)
                        .format(desc.format.into())
                        .offset(desc.offset)
                        .range(desc.size),
                    None,
                )
            }?)
        };
        Ok(self.descriptors.insert(VkDescriptor::Buffer { buffer, view }))
    }

    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<Handle<Descriptor>> {
        let texture = self.texture(desc.texture)?;
        let format = if desc.format == Format::Unknown {
            texture.desc.format
        } else {
            desc.format
        };
        let layer_num = if desc.layer_num == 0 {
            texture.desc.layer_num.max(1).saturating_sub(desc.layer_offset)
        } else {
            desc.layer_num
        };
        let info = vk::ImageViewCreateInfo::builder()
            .image(texture.raw)
            .view_type(image_view_type(texture.desc.texture_type, layer_num))
            .format(format.into())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_mask(format),
                base_mip_level: desc.mip_offset,
                level_count: if desc.mip_num == 0 {
                    vk::REMAINING_MIP_LEVELS
                } else {
                    desc.mip_num
                },
                base_array_layer: desc.layer_offset,
                layer_count: if desc.layer_num == 0 {
                    vk::REMAINING_ARRAY_LAYERS
                } else {
                    desc.layer_num
                },
            });
        let view = unsafe { self.device.create_image_view(&info, None) }?;
        Ok(self.descriptors.insert(VkDescriptor::Image(view)))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Handle<Descriptor>> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(desc.mag_filter.into())
            .min_filter(desc.min_filter.into())
            .mipmap_mode(desc.mip_filter.into())
            .address_mode_u(desc.address_u.into())
            .address_mode_v(desc.address_v.into())
            .address_mode_w(desc.address_w.into())
            .mip_lod_bias(desc.mip_bias)
            .anisotropy_enable(desc.anisotropy > 1)
            .max_anisotropy(desc.anisotropy.max(1) as f32)
            .min_lod(desc.mip_min)
            .max_lod(desc.mip_max);
        let sampler = unsafe { self.device.create_sampler(&info, None) }?;
        Ok(self.descriptors.insert(VkDescriptor::Sampler(sampler)))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Handle<Fence>> {
        let mut timeline = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let raw = unsafe {
            self.device.create_semaphore(
                &vk::SemaphoreCreateInfo::builder().push_next(&mut timeline),
                None,
            )
        }?;
        Ok(self.fences.insert(raw))
    }

    fn create_query_pool(&mut self, desc: &QueryPoolDesc) -> Result<Handle<QueryPool>> {
        let raw = unsafe {
            self.device.create_query_pool(
                &vk::QueryPoolCreateInfo::builder()
                    .query_type(desc.query_type.into())
                    .query_count(desc.capacity),
                None,
            )
        }?;
        Ok(self.query_pools.insert(raw))
    }

    fn destroy_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()> {
        let record = self
            .command_allocators
            .release(allocator)
            .ok_or_else(|| unknown("command allocator", allocator))?;

        // Buffers die with their pool.
        let mut orphans = Vec::new();
        self.command_buffers.for_each_occupied(|handle, cmd| {
            if cmd.allocator == allocator {
                orphans.push(handle);
            }
        });
        for handle in orphans {
            self.command_buffers.release(handle);
        }

        unsafe { self.device.destroy_command_pool(record.raw, None) };
        Ok(())
    }

    fn destroy_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let record = self
            .command_buffers
            .release(cmd)
            .ok_or_else(|| unknown("command buffer", cmd))?;
        if let Some(pool) = self.command_allocators.get_ref(record.allocator) {
            unsafe { self.device.free_command_buffers(pool.raw, &[record.raw]) };
        }
        Ok(())
    }

    fn destroy_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()> {
        self.descriptor_pools
            .release(pool)
            .map(drop)
            .ok_or_else(|| unknown("descriptor pool", pool))
    }

    fn destroy_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()> {
        let record = self
            .buffers
            .release(buffer)
            .ok_or_else(|| unknown("buffer", buffer))?;
        unsafe { self.device.destroy_buffer(record.raw, None) };
        if record.owns_memory {
            self.release_owned_memory(record.memory);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: Handle<Texture>) -> Result<()> {
        let record = self
            .textures
            .release(texture)
            .ok_or_else(|| unknown("texture", texture))?;
        unsafe { self.device.destroy_image(record.raw, None) };
        if record.owns_memory {
            self.release_owned_memory(record.memory);
        }
        Ok(())
    }

    fn destroy_descriptor(&mut self, descriptor: Handle<Descriptor>) -> Result<()> {
        let record = self
            .descriptors
            .release(descriptor)
            .ok_or_else(|| unknown("descriptor", descriptor))?;
        unsafe {
            match record {
                VkDescriptor::Buffer { view, .. } => {
                    if let Some(view) = view {
                        self.device.destroy_buffer_view(view, None);
                    }
                }
                VkDescriptor::Image(view) => self.device.destroy_image_view(view, None),
                VkDescriptor::Sampler(sampler) => self.device.destroy_sampler(sampler, None),
            }
        }
        Ok(())
    }

    fn destroy_fence(&mut self, fence: Handle<Fence>) -> Result<()> {
        let raw = self
            .fences
            .release(fence)
            .ok_or_else(|| unknown("fence", fence))?;
        unsafe { self.device.destroy_semaphore(raw, None) };
        Ok(())
    }

    fn destroy_query_pool(&mut self, pool: Handle<QueryPool>) -> Result<()> {
        let raw = self
            .query_pools
            .release(pool)
            .ok_or_else(|| unknown("query pool", pool))?;
        unsafe { self.device.destroy_query_pool(raw, None) };
        Ok(())
    }

    fn allocate_memory(&mut self, desc: &AllocateMemoryDesc) -> Result<Handle<Memory>> {
        if desc.size == 0 {
            return Err(GPUError::invalid("memory size must be non-zero"));
        }
        if desc.priority != 0.0 {
            log::trace!(target: LOG_TARGET, "Memory priority {} ignored", desc.priority);
        }

        // Dedicated memory is created when its resource is bound.
        if desc.memory_type.is_dedicated() {
            return Ok(self.memories.insert(VkMemory {
                raw: None,
                size: desc.size,
                memory_type: desc.memory_type,
                mapped: std::ptr::null_mut(),
            }));
        }

        let (raw, mapped) = self.allocate_device_memory(desc.size, desc.memory_type, None)?;
        Ok(self.memories.insert(VkMemory {
            raw: Some(raw),
            size: desc.size,
            memory_type: desc.memory_type,
            mapped,
        }))
    }

    fn bind_buffer_memory(&mut self, bindings: &[BufferMemoryBinding]) -> Result<()> {
        for binding in bindings {
            self.bind_buffer(binding)?;
        }
        Ok(())
    }

    fn bind_texture_memory(&mut self, bindings: &[TextureMemoryBinding]) -> Result<()> {
        for binding in bindings {
            self.bind_texture(binding)?;
        }
        Ok(())
    }

    fn free_memory(&mut self, memory: Handle<Memory>) -> Result<()> {
        let record = self
            .memories
            .release(memory)
            .ok_or_else(|| unknown("memory", memory))?;
        self.release_device_memory(&record);
        Ok(())
    }

    fn allocate_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorRange> {
        self.descriptor_pool(pool)?.allocate(heap_type, count)
    }

    fn free_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
    ) -> Result<()> {
        self.descriptor_pool(pool)?.free(range)
    }

    fn reset_descriptor_pool(&mut self, pool: Handle<DescriptorPool>) -> Result<()> {
        self.descriptor_pool(pool)?.reset();
        Ok(())
    }

    fn update_descriptors(
        &mut self,
        pool: Handle<DescriptorPool>,
        range: &DescriptorRange,
        offset: u32,
        descriptors: &[Handle<Descriptor>],
    ) -> Result<()> {
        let mut payloads = Vec::with_capacity(descriptors.len());
        for handle in descriptors {
            let descriptor = self
                .descriptors
                .get_ref(*handle)
                .ok_or_else(|| unknown("descriptor", *handle))?;
            if descriptor.heap_type() != range.heap_type {
                return Err(GPUError::invalid(format!(
                    "descriptor {:?} does not belong in a {:?} heap",
                    handle, range.heap_type
                )));
            }
            payloads.push(descriptor.payload());
        }
        self.descriptor_pool(pool)?.write(range, offset, &payloads)
    }

    fn begin_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let raw = self.command_buffer(cmd)?;
        unsafe {
            self.device.begin_command_buffer(
                raw,
                &vk::CommandBufferBeginInfo::builder()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
            )
        }?;
        Ok(())
    }

    fn end_command_buffer(&mut self, cmd: Handle<CommandBuffer>) -> Result<()> {
        let raw = self.command_buffer(cmd)?;
        unsafe { self.device.end_command_buffer(raw) }?;
        Ok(())
    }

    fn reset_command_allocator(&mut self, allocator: Handle<CommandAllocator>) -> Result<()> {
        let pool = self
            .command_allocators
            .get_ref(allocator)
            .ok_or_else(|| unknown("command allocator", allocator))?
            .raw;
        unsafe {
            self.device
                .reset_command_pool(pool, vk::CommandPoolResetFlags::empty())
        }?;
        Ok(())
    }

    fn cmd_set_descriptor_pool(
        &mut self,
        cmd: Handle<CommandBuffer>,
        pool: Handle<DescriptorPool>,
    ) -> Result<()> {
        if !self.descriptor_pools.contains(pool) {
            return Err(unknown("descriptor pool", pool));
        }
        // Host-side heaps: there is nothing to record natively.
        let record = self
            .command_buffers
            .get_mut_ref(cmd)
            .ok_or_else(|| unknown("command buffer", cmd))?;
        record.descriptor_pool = Some(pool);
        Ok(())
    }

    fn cmd_copy_buffer(&mut self, cmd: Handle<CommandBuffer>, copy: &BufferCopy) -> Result<()> {
        let raw = self.command_buffer(cmd)?;
        let src = self.buffer(copy.src)?.raw;
        let dst = self.buffer(copy.dst)?.raw;
        let region = vk::BufferCopy {
            src_offset: copy.src_offset,
            dst_offset: copy.dst_offset,
            size: copy.size,
        };
        unsafe { self.device.cmd_copy_buffer(raw, src, dst, &[region]) };
        Ok(())
    }

    fn queue_submit(&mut self, queue: Handle<CommandQueue>, desc: &QueueSubmitDesc) -> Result<()> {
        let queue = self.queue(queue)?.raw;
        let cmds = desc
            .command_buffers
            .iter()
            .map(|cmd| self.command_buffer(*cmd))
            .collect::<Result<Vec<_>>>()?;

        let (semaphores, values) = match desc.signal {
            Some(signal) => (vec![self.fence(signal.fence)?], vec![signal.value]),
            None => (Vec::new(), Vec::new()),
        };
        let mut timeline =
            vk::TimelineSemaphoreSubmitInfo::builder().signal_semaphore_values(&values);
        let submit = vk::SubmitInfo::builder()
            .command_buffers(&cmds)
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline)
            .build();

        unsafe { self.device.queue_submit(queue, &[submit], vk::Fence::null()) }?;
        Ok(())
    }

    fn wait(&mut self, fence: Handle<Fence>, value: u64, timeout: Duration) -> Result<()> {
        let semaphores = [self.fence(fence)?];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::builder()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { self.device.wait_semaphores(&info, timeout_ns(timeout)) }?;
        Ok(())
    }

    fn get_fence_value(&self, fence: Handle<Fence>) -> Result<u64> {
        let raw = self.fence(fence)?;
        Ok(unsafe { self.device.get_semaphore_counter_value(raw) }?)
    }

    fn map_buffer(
        &mut self,
        buffer: Handle<Buffer>,
        offset: u64,
        size: u64,
    ) -> Result<MappedMemory> {
        let record = self.buffer(buffer)?;
        let memory = record
            .memory
            .and_then(|m| self.memories.get_ref(m))
            .ok_or_else(|| GPUError::invalid(format!("buffer {:?} has no memory", buffer)))?;
        if memory.mapped.is_null() {
            return Err(GPUError::invalid(format!(
                "buffer {:?} is not in host-visible memory",
                buffer
            )));
        }
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= record.desc.size)
            .ok_or_else(|| {
                GPUError::invalid(format!(
                    "mapping {} bytes at {} overflows buffer of {}",
                    size, offset, record.desc.size
                ))
            })?;
        let start = usize::try_from(record.offset + offset)
            .map_err(|_| GPUError::invalid("mapping offset exceeds the address space"))?;
        let len = usize::try_from(end - offset)
            .map_err(|_| GPUError::invalid("mapping size exceeds the address space"))?;

        // SAFETY: the range was checked against the buffer, which lies inside
        // the persistently mapped allocation.
        let ptr = unsafe { memory.mapped.add(start) };
        Ok(MappedMemory::new(ptr, len))
    }

    fn unmap_buffer(&mut self, buffer: Handle<Buffer>) -> Result<()> {
        let record = self.buffer(buffer)?;
        let Some(memory) = record.memory.and_then(|m| self.memories.get_ref(m)) else {
            return Err(GPUError::invalid(format!("buffer {:?} has no memory", buffer)));
        };
        let (_, properties) = self.memory_properties_of(memory.memory_type)?;
        if properties.contains(MemoryPropertyBits::HOST_COHERENT) {
            return Ok(());
        }
        if let Some(raw) = memory.raw {
            let range = vk::MappedMemoryRange::builder()
                .memory(raw)
                .offset(0)
                .size(vk::WHOLE_SIZE)
                .build();
            unsafe { self.device.flush_mapped_memory_ranges(&[range]) }?;
        }
        Ok(())
    }

    fn set_debug_name(&mut self, object: Object, name: &str) -> Result<()> {
        let Some(utils) = &self.debug_utils else {
            return Ok(());
        };
        let Some((object_type, handle)) = self.native_object(object) else {
            return Ok(());
        };
        let name = CString::new(name)
            .map_err(|_| GPUError::invalid("debug names cannot contain NUL"))?;
        let info = vk::DebugUtilsObjectNameInfoEXT::builder()
            .object_type(object_type)
            .object_handle(handle)
            .object_name(&name);
        unsafe { utils.set_debug_utils_object_name(self.device.handle(), &info) }?;
        Ok(())
    }

    fn get_native_object(&self, object: Object) -> u64 {
        self.native_object(object)
            .map(|(_, raw)| raw)
            .unwrap_or(NO_NATIVE_OBJECT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_waits_never_time_out() {
        assert_eq!(timeout_ns(WAIT_INFINITE), u64::MAX);
        assert_eq!(timeout_ns(Duration::from_millis(2)), 2_000_000);
    }
}
