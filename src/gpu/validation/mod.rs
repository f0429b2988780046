//! Validation layer.
//!
//! [`ValidationDevice`] wraps any backend and implements the same groups. It
//! issues its own handles, checks every call against the object's recorded
//! state and only forwards calls that pass. Violations are logged under the
//! `rhi::validation` target and returned as `InvalidArgument`.

mod core_table;
mod extension_tables;
mod helper_table;
pub mod records;

use std::collections::HashMap;

use crate::gpu::config::DescriptorPoolDesc;
use crate::gpu::error::{GPUError, Result};
use crate::gpu::interface::*;
use crate::gpu::objects::*;
use crate::gpu::structs::QueueType;
use crate::utils::Pool;

pub use records::{UsageState, ValidationRecord};
use records::*;

pub struct ValidationDevice {
    inner: Box<dyn DeviceBackend>,
    provided: Capabilities,
    descriptor_pool_defaults: DescriptorPoolDesc,

    buffers: Pool<Wrapped<Buffer, BufferState>, Buffer>,
    textures: Pool<Wrapped<Texture, TextureState>, Texture>,
    memories: Pool<Wrapped<Memory, MemoryState>, Memory>,
    descriptors: Pool<Wrapped<Descriptor, DescriptorState>, Descriptor>,
    descriptor_pools: Pool<Wrapped<DescriptorPool, DescriptorPoolState>, DescriptorPool>,
    fences: Pool<Wrapped<Fence>, Fence>,
    query_pools: Pool<Wrapped<QueryPool>, QueryPool>,
    queues: Pool<Wrapped<CommandQueue, QueueState>, CommandQueue>,
    queue_cache: HashMap<QueueType, crate::utils::Handle<CommandQueue>>,
    command_allocators: Pool<Wrapped<CommandAllocator>, CommandAllocator>,
    command_buffers: Pool<Wrapped<CommandBuffer, CommandBufferState>, CommandBuffer>,
    swap_chains: Pool<Wrapped<SwapChain, SwapChainState>, SwapChain>,
    acceleration_structures:
        Pool<Wrapped<AccelerationStructure, AccelerationStructureState>, AccelerationStructure>,
    streamers: Pool<Wrapped<Streamer>, Streamer>,
}

impl ValidationDevice {
    pub fn new(mut inner: Box<dyn DeviceBackend>, descriptor_pool_defaults: DescriptorPoolDesc) -> Self {
        let provided = inner.advertised() & provided_groups(inner.as_mut());
        log::debug!(target: LOG_TARGET, "Validation enabled over {:?}", provided);
        Self {
            inner,
            provided,
            descriptor_pool_defaults,
            buffers: Pool::default(),
            textures: Pool::default(),
            memories: Pool::default(),
            descriptors: Pool::default(),
            descriptor_pools: Pool::default(),
            fences: Pool::default(),
            query_pools: Pool::default(),
            queues: Pool::default(),
            queue_cache: HashMap::new(),
            command_allocators: Pool::default(),
            command_buffers: Pool::default(),
            swap_chains: Pool::default(),
            acceleration_structures: Pool::default(),
            streamers: Pool::default(),
        }
    }

    /// Shadow record of an object, if the handle is current.
    pub fn record(&self, object: Object) -> Option<&ValidationRecord> {
        match object {
            Object::Device => None,
            Object::Buffer(h) => self.buffers.get_ref(h).map(|w| &w.record),
            Object::Texture(h) => self.textures.get_ref(h).map(|w| &w.record),
            Object::Descriptor(h) => self.descriptors.get_ref(h).map(|w| &w.record),
            Object::DescriptorPool(h) => self.descriptor_pools.get_ref(h).map(|w| &w.record),
            Object::Fence(h) => self.fences.get_ref(h).map(|w| &w.record),
            Object::Memory(h) => self.memories.get_ref(h).map(|w| &w.record),
            Object::CommandQueue(h) => self.queues.get_ref(h).map(|w| &w.record),
            Object::CommandAllocator(h) => self.command_allocators.get_ref(h).map(|w| &w.record),
            Object::CommandBuffer(h) => self.command_buffers.get_ref(h).map(|w| &w.record),
            Object::QueryPool(h) => self.query_pools.get_ref(h).map(|w| &w.record),
            Object::SwapChain(h) => self.swap_chains.get_ref(h).map(|w| &w.record),
            Object::AccelerationStructure(h) => {
                self.acceleration_structures.get_ref(h).map(|w| &w.record)
            }
            Object::Streamer(h) => self.streamers.get_ref(h).map(|w| &w.record),
        }
    }

    fn record_mut(&mut self, object: Object) -> Result<&mut ValidationRecord> {
        let kind = object.kind_name();
        match object {
            Object::Device => Err(violation("the device has no shadow record")),
            Object::Buffer(h) => lookup_mut(&mut self.buffers, kind, h).map(|w| &mut w.record),
            Object::Texture(h) => lookup_mut(&mut self.textures, kind, h).map(|w| &mut w.record),
            Object::Descriptor(h) => {
                lookup_mut(&mut self.descriptors, kind, h).map(|w| &mut w.record)
            }
            Object::DescriptorPool(h) => {
                lookup_mut(&mut self.descriptor_pools, kind, h).map(|w| &mut w.record)
            }
            Object::Fence(h) => lookup_mut(&mut self.fences, kind, h).map(|w| &mut w.record),
            Object::Memory(h) => lookup_mut(&mut self.memories, kind, h).map(|w| &mut w.record),
            Object::CommandQueue(h) => lookup_mut(&mut self.queues, kind, h).map(|w| &mut w.record),
            Object::CommandAllocator(h) => {
                lookup_mut(&mut self.command_allocators, kind, h).map(|w| &mut w.record)
            }
            Object::CommandBuffer(h) => {
                lookup_mut(&mut self.command_buffers, kind, h).map(|w| &mut w.record)
            }
            Object::QueryPool(h) => lookup_mut(&mut self.query_pools, kind, h).map(|w| &mut w.record),
            Object::SwapChain(h) => lookup_mut(&mut self.swap_chains, kind, h).map(|w| &mut w.record),
            Object::AccelerationStructure(h) => {
                lookup_mut(&mut self.acceleration_structures, kind, h).map(|w| &mut w.record)
            }
            Object::Streamer(h) => lookup_mut(&mut self.streamers, kind, h).map(|w| &mut w.record),
        }
    }

    /// Backend-side name for a caller object.
    fn inner_object(&self, object: Object) -> Result<Object> {
        let kind = object.kind_name();
        Ok(match object {
            Object::Device => Object::Device,
            Object::Buffer(h) => Object::Buffer(lookup(&self.buffers, kind, h)?.inner),
            Object::Texture(h) => Object::Texture(lookup(&self.textures, kind, h)?.inner),
            Object::Descriptor(h) => Object::Descriptor(lookup(&self.descriptors, kind, h)?.inner),
            Object::DescriptorPool(h) => {
                Object::DescriptorPool(lookup(&self.descriptor_pools, kind, h)?.inner)
            }
            Object::Fence(h) => Object::Fence(lookup(&self.fences, kind, h)?.inner),
            Object::Memory(h) => Object::Memory(lookup(&self.memories, kind, h)?.inner),
            Object::CommandQueue(h) => Object::CommandQueue(lookup(&self.queues, kind, h)?.inner),
            Object::CommandAllocator(h) => {
                Object::CommandAllocator(lookup(&self.command_allocators, kind, h)?.inner)
            }
            Object::CommandBuffer(h) => {
                Object::CommandBuffer(lookup(&self.command_buffers, kind, h)?.inner)
            }
            Object::QueryPool(h) => Object::QueryPool(lookup(&self.query_pools, kind, h)?.inner),
            Object::SwapChain(h) => Object::SwapChain(lookup(&self.swap_chains, kind, h)?.inner),
            Object::AccelerationStructure(h) => Object::AccelerationStructure(
                lookup(&self.acceleration_structures, kind, h)?.inner,
            ),
            Object::Streamer(h) => Object::Streamer(lookup(&self.streamers, kind, h)?.inner),
        })
    }

    fn missing_group(group: &'static str) -> GPUError {
        GPUError::Unsupported(group)
    }
}

impl DeviceBackend for ValidationDevice {
    fn advertised(&self) -> Capabilities {
        self.provided
    }

    fn core(&mut self) -> &mut dyn CoreInterface {
        self
    }

    fn helper(&mut self) -> Option<&mut dyn HelperInterface> {
        if self.provided.contains(Capabilities::HELPER) {
            Some(self)
        } else {
            None
        }
    }

    fn resource_allocator(&mut self) -> Option<&mut dyn ResourceAllocatorInterface> {
        if self.provided.contains(Capabilities::RESOURCE_ALLOCATOR) {
            Some(self)
        } else {
            None
        }
    }

    fn swap_chain(&mut self) -> Option<&mut dyn SwapChainInterface> {
        if self.provided.contains(Capabilities::SWAP_CHAIN) {
            Some(self)
        } else {
            None
        }
    }

    fn ray_tracing(&mut self) -> Option<&mut dyn RayTracingInterface> {
        if self.provided.contains(Capabilities::RAY_TRACING) {
            Some(self)
        } else {
            None
        }
    }

    fn mesh_shader(&mut self) -> Option<&mut dyn MeshShaderInterface> {
        if self.provided.contains(Capabilities::MESH_SHADER) {
            Some(self)
        } else {
            None
        }
    }

    fn streamer(&mut self) -> Option<&mut dyn StreamerInterface> {
        if self.provided.contains(Capabilities::STREAMER) {
            Some(self)
        } else {
            None
        }
    }

    fn low_latency(&mut self) -> Option<&mut dyn LowLatencyInterface> {
        if self.provided.contains(Capabilities::LOW_LATENCY) {
            Some(self)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::config::DescriptorHeapConfig;
    use crate::gpu::conformance::ConformanceBackend;
    use crate::gpu::descriptor::DescriptorHeapType;
    use crate::gpu::structs::*;

    fn validated() -> ValidationDevice {
        ValidationDevice::new(Box::new(ConformanceBackend::new()), DescriptorPoolDesc::default())
    }

    fn bound_buffer(device: &mut ValidationDevice, size: u64) -> crate::utils::Handle<Buffer> {
        let buffer = device
            .create_buffer(&BufferDesc {
                size,
                ..Default::default()
            })
            .unwrap();
        let memory = device
            .allocate_memory(&AllocateMemoryDesc {
                size,
                ..Default::default()
            })
            .unwrap();
        device
            .bind_buffer_memory(&[BufferMemoryBinding {
                buffer,
                memory,
                offset: 0,
            }])
            .unwrap();
        buffer
    }

    #[test]
    fn double_map_is_rejected() {
        let mut device = validated();
        let buffer = bound_buffer(&mut device, 256);

        device.map_buffer(buffer, 0, 64).unwrap();
        assert!(matches!(
            device.map_buffer(buffer, 0, 64),
            Err(GPUError::InvalidArgument(_))
        ));
        assert!(device.destroy_buffer(buffer).is_err());
        device.unmap_buffer(buffer).unwrap();
        assert!(device.unmap_buffer(buffer).is_err());
        device.destroy_buffer(buffer).unwrap();
    }

    #[test]
    fn unbound_buffers_cannot_be_mapped() {
        let mut device = validated();
        let buffer = device
            .create_buffer(&BufferDesc {
                size: 64,
                ..Default::default()
            })
            .unwrap();
        assert!(!device.record(Object::Buffer(buffer)).unwrap().live);
        assert!(device.map_buffer(buffer, 0, 64).is_err());
    }

    #[test]
    fn destroyed_handles_go_stale() {
        let mut device = validated();
        let fence = device.create_fence(0).unwrap();
        device.destroy_fence(fence).unwrap();
        assert!(matches!(
            device.get_fence_value(fence),
            Err(GPUError::InvalidArgument(_))
        ));
        assert!(device.record(Object::Fence(fence)).is_none());
    }

    #[test]
    fn binding_past_the_end_is_rejected() {
        let mut device = validated();
        let buffer = device
            .create_buffer(&BufferDesc {
                size: 512,
                ..Default::default()
            })
            .unwrap();
        let memory = device
            .allocate_memory(&AllocateMemoryDesc {
                size: 256,
                ..Default::default()
            })
            .unwrap();
        let binding = BufferMemoryBinding {
            buffer,
            memory,
            offset: 0,
        };
        assert!(device.bind_buffer_memory(&[binding]).is_err());
    }

    #[test]
    fn recording_state_is_tracked() {
        let mut device = validated();
        let queue = device.get_command_queue(QueueType::Graphics).unwrap();
        assert_eq!(device.get_command_queue(QueueType::Graphics).unwrap(), queue);
        let allocator = device.create_command_allocator(queue).unwrap();
        let cmd = device.create_command_buffer(allocator).unwrap();

        assert!(device.end_command_buffer(cmd).is_err());
        device.begin_command_buffer(cmd).unwrap();
        assert!(device.begin_command_buffer(cmd).is_err());
        assert!(device.reset_command_allocator(allocator).is_err());

        let submit = QueueSubmitDesc {
            command_buffers: &[cmd],
            signal: None,
        };
        assert!(device.queue_submit(queue, &submit).is_err());

        device.end_command_buffer(cmd).unwrap();
        device.queue_submit(queue, &submit).unwrap();
        device.reset_command_allocator(allocator).unwrap();
    }

    #[test]
    fn descriptor_ranges_are_issued_by_the_layer() {
        let mut device = validated();
        let pool = device
            .create_descriptor_pool(&DescriptorPoolDesc::default())
            .unwrap();
        let a = device
            .allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
            .unwrap();
        let b = device
            .allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
            .unwrap();
        assert_ne!(a.first, b.first);
        assert!(device
            .allocate_descriptors(pool, DescriptorHeapType::Resource, 0)
            .is_err());

        let sampler = device.create_sampler(&SamplerDesc::default()).unwrap();
        assert!(device.update_descriptors(pool, &a, 0, &[sampler]).is_err());
        assert!(device.update_descriptors(pool, &a, 4, &[sampler]).is_err());

        device.free_descriptors(pool, &a).unwrap();
        assert!(device.free_descriptors(pool, &a).is_err());
    }

    #[test]
    fn exhausted_pools_report_capacity() {
        let mut device = validated();
        let tight = DescriptorHeapConfig {
            initial_slots: 4,
            max_heap_slots: 4,
            max_total_slots: 4,
        };
        let pool = device
            .create_descriptor_pool(&DescriptorPoolDesc {
                resources: tight,
                samplers: tight,
            })
            .unwrap();
        device
            .allocate_descriptors(pool, DescriptorHeapType::Resource, 4)
            .unwrap();
        assert!(matches!(
            device.allocate_descriptors(pool, DescriptorHeapType::Resource, 4),
            Err(GPUError::Capacity { requested: 4, .. })
        ));
    }

    #[test]
    fn memory_outlives_its_bindings() {
        let mut device = validated();
        let buffer = device
            .create_buffer(&BufferDesc {
                size: 64,
                ..Default::default()
            })
            .unwrap();
        let memory = device
            .allocate_memory(&AllocateMemoryDesc {
                size: 64,
                ..Default::default()
            })
            .unwrap();
        device
            .bind_buffer_memory(&[BufferMemoryBinding {
                buffer,
                memory,
                offset: 0,
            }])
            .unwrap();

        assert!(matches!(
            device.free_memory(memory),
            Err(GPUError::InvalidArgument(_))
        ));
        device.destroy_buffer(buffer).unwrap();
        device.free_memory(memory).unwrap();
    }

    #[test]
    fn debug_names_land_in_the_record() {
        let mut device = validated();
        let fence = device.create_fence(0).unwrap();
        device.set_debug_name(Object::Fence(fence), "frame").unwrap();
        assert_eq!(device.record(Object::Fence(fence)).unwrap().debug_name, "frame");
        assert_eq!(device.get_native_object(Object::Fence(fence)), NO_NATIVE_OBJECT);
    }
}
