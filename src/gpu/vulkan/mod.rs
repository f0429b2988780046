//! Vulkan backend over `ash`.
//!
//! Provides the core, helper and resource allocator groups. Memory types are
//! classified from the physical device's memory properties, fences are
//! timeline semaphores and descriptor pools live in host memory.

mod conversions;
mod core_table;
mod error;
mod memory;

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};

use ash::vk;

use crate::gpu::config::{DescriptorPoolDesc, DeviceCreationInfo, MAX_DESCRIPTOR_HEAP_SLOTS};
use crate::gpu::descriptor::{DescriptorAllocator, DescriptorHeapType, HostDescriptorBacking};
use crate::gpu::error::{GPUError, Result};
use crate::gpu::interface::*;
use crate::gpu::memory::{planner, VulkanMemoryLayout};
use crate::gpu::objects::*;
use crate::gpu::structs::*;
use crate::utils::{Handle, Pool};

use memory::{VkBuffer, VkMemory, VkTexture};

/// Names of debugging layers that should be enabled when validation is requested.
const DEBUG_LAYER_NAMES: [*const c_char; 1] =
    [b"VK_LAYER_KHRONOS_validation\0".as_ptr() as *const c_char];

const LOG_TARGET: &str = "rhi::vulkan";

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!(target: LOG_TARGET, "[{:?}] {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!(target: LOG_TARGET, "[{:?}] {}", message_type, message);
    } else {
        log::debug!(target: LOG_TARGET, "[{:?}] {}", message_type, message);
    }
    vk::FALSE
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Queue {
    family: u32,
    raw: vk::Queue,
}

#[derive(Debug)]
struct VkCommandAllocator {
    raw: vk::CommandPool,
}

#[derive(Debug)]
struct VkCommandBuffer {
    raw: vk::CommandBuffer,
    allocator: Handle<CommandAllocator>,
    descriptor_pool: Option<Handle<DescriptorPool>>,
}

/// Native object behind a descriptor handle.
#[derive(Debug, Clone, Copy)]
enum VkDescriptor {
    /// Raw buffers have no view object; the buffer itself is the payload.
    Buffer {
        buffer: vk::Buffer,
        view: Option<vk::BufferView>,
    },
    Image(vk::ImageView),
    Sampler(vk::Sampler),
}

impl VkDescriptor {
    fn heap_type(&self) -> DescriptorHeapType {
        match self {
            VkDescriptor::Sampler(_) => DescriptorHeapType::Sampler,
            _ => DescriptorHeapType::Resource,
        }
    }

    /// Value written into a descriptor slot.
    fn payload(&self) -> u64 {
        use ash::vk::Handle as _;
        match self {
            VkDescriptor::Buffer {
                view: Some(view), ..
            } => view.as_raw(),
            VkDescriptor::Buffer { buffer, .. } => buffer.as_raw(),
            VkDescriptor::Image(view) => view.as_raw(),
            VkDescriptor::Sampler(sampler) => sampler.as_raw(),
        }
    }
}

pub struct VulkanBackend {
    _entry: ash::Entry,
    instance: ash::Instance,
    pdevice: vk::PhysicalDevice,
    device: ash::Device,
    desc: DeviceDesc,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    memory_layout: VulkanMemoryLayout,
    /// Bytes allocated per native heap.
    heap_usage: Vec<u64>,
    queue_families: [Queue; 3],
    preferred_memory_size: u64,
    descriptor_pool_defaults: DescriptorPoolDesc,
    debug_utils: Option<ash::extensions::ext::DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    buffers: Pool<VkBuffer, Buffer>,
    textures: Pool<VkTexture, Texture>,
    memories: Pool<VkMemory, Memory>,
    descriptors: Pool<VkDescriptor, Descriptor>,
    descriptor_pools: Pool<DescriptorAllocator<HostDescriptorBacking>, DescriptorPool>,
    fences: Pool<vk::Semaphore, Fence>,
    query_pools: Pool<vk::QueryPool, QueryPool>,
    queues: Pool<Queue, CommandQueue>,
    queue_handles: HashMap<QueueType, Handle<CommandQueue>>,
    command_allocators: Pool<VkCommandAllocator, CommandAllocator>,
    command_buffers: Pool<VkCommandBuffer, CommandBuffer>,
}

// SAFETY: the raw pointers held are persistent mappings owned by this backend;
// every access goes through `&mut self`.
unsafe impl Send for VulkanBackend {}

fn queue_index(queue_type: QueueType) -> usize {
    match queue_type {
        QueueType::Graphics => 0,
        QueueType::Compute => 1,
        QueueType::Transfer => 2,
    }
}

impl VulkanBackend {
    pub fn new(info: &DeviceCreationInfo) -> Result<Self> {
        let enable_validation = info.validation_enabled();

        let app_info = vk::ApplicationInfo {
            api_version: vk::make_api_version(0, 1, 3, 0),
            ..Default::default()
        };

        let entry = unsafe { ash::Entry::load() }?;
        let mut inst_exts = Vec::new();
        let mut inst_layers = Vec::new();
        if enable_validation {
            inst_exts.push(ash::extensions::ext::DebugUtils::name().as_ptr());
            let available_layers = entry.enumerate_instance_layer_properties()?;
            for &layer in &DEBUG_LAYER_NAMES {
                let name = unsafe { CStr::from_ptr(layer) };
                if available_layers
                    .iter()
                    .any(|prop| unsafe { CStr::from_ptr(prop.layer_name.as_ptr()) == name })
                {
                    inst_layers.push(layer);
                }
            }
        }

        let instance = unsafe {
            entry.create_instance(
                &vk::InstanceCreateInfo::builder()
                    .application_info(&app_info)
                    .enabled_extension_names(&inst_exts)
                    .enabled_layer_names(&inst_layers),
                None,
            )
        }?;

        match Self::init_device(entry, instance, info, enable_validation) {
            Ok(backend) => Ok(backend),
            Err((instance, err)) => {
                unsafe { instance.destroy_instance(None) };
                Err(err)
            }
        }
    }

    fn init_device(
        entry: ash::Entry,
        instance: ash::Instance,
        info: &DeviceCreationInfo,
        enable_validation: bool,
    ) -> std::result::Result<Self, (ash::Instance, GPUError)> {
        macro_rules! check {
            ($e:expr) => {
                match $e {
                    Ok(v) => v,
                    Err(err) => return Err((instance, err.into())),
                }
            };
        }

        let pdevices = check!(unsafe { instance.enumerate_physical_devices() });
        let pdevice = check!(pdevices
            .get(info.adapter_index as usize)
            .copied()
            .ok_or(GPUError::Unsupported("no Vulkan adapter at the requested index")));
        let properties = unsafe { instance.get_physical_device_properties(pdevice) };
        if properties.api_version < vk::make_api_version(0, 1, 2, 0) {
            return Err((
                instance,
                GPUError::Unsupported("timeline semaphores need Vulkan 1.2"),
            ));
        }

        let queue_props = unsafe { instance.get_physical_device_queue_family_properties(pdevice) };
        let mut gfx_family = None;
        let mut compute_family = None;
        let mut transfer_family = None;
        for (idx, prop) in queue_props.iter().enumerate() {
            if prop.queue_flags.contains(vk::QueueFlags::GRAPHICS) && gfx_family.is_none() {
                gfx_family = Some(idx as u32);
            }
            if prop.queue_flags.contains(vk::QueueFlags::COMPUTE)
                && !prop.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && compute_family.is_none()
            {
                compute_family = Some(idx as u32);
            }
            if prop.queue_flags.contains(vk::QueueFlags::TRANSFER)
                && !prop.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && !prop.queue_flags.contains(vk::QueueFlags::COMPUTE)
                && transfer_family.is_none()
            {
                transfer_family = Some(idx as u32);
            }
        }
        let gfx_family = check!(gfx_family.ok_or(GPUError::Unsupported("no graphics queue")));
        let compute_family = compute_family.unwrap_or(gfx_family);
        let transfer_family = transfer_family.unwrap_or(compute_family);

        let priorities = [1.0];
        let mut unique_families = vec![gfx_family];
        for family in [compute_family, transfer_family] {
            if !unique_families.contains(&family) {
                unique_families.push(family);
            }
        }
        let queue_infos: Vec<_> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let mut vulkan12 = vk::PhysicalDeviceVulkan12Features::builder().timeline_semaphore(true);
        let device_ci = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .push_next(&mut vulkan12);
        let device = check!(unsafe { instance.create_device(pdevice, &device_ci, None) });

        let queue = |family: u32| Queue {
            family,
            raw: unsafe { device.get_device_queue(family, 0) },
        };
        let queue_families = [queue(gfx_family), queue(compute_family), queue(transfer_family)];

        let memory_properties = unsafe { instance.get_physical_device_memory_properties(pdevice) };
        let memory_layout = VulkanMemoryLayout::new(
            memory_properties.memory_types[..memory_properties.memory_type_count as usize]
                .iter()
                .map(|t| t.property_flags.as_raw()),
        );

        let (debug_utils, debug_messenger) = if enable_validation {
            let utils = ash::extensions::ext::DebugUtils::new(&entry, &instance);
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(vulkan_debug_callback));
            let messenger = unsafe { utils.create_debug_utils_messenger(&messenger_info, None) }
                .map_err(|err| log::warn!(target: LOG_TARGET, "No debug messenger: {}", err))
                .ok();
            (Some(utils), messenger)
        } else {
            (None, None)
        };

        let limits = &properties.limits;
        let adapter_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        let narrow = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        let desc = DeviceDesc {
            graphics_api: GraphicsApi::Vulkan,
            interface_version: INTERFACE_VERSION,
            adapter_name,
            upload_buffer_texture_row_alignment: narrow(limits.optimal_buffer_copy_row_pitch_alignment),
            upload_buffer_texture_slice_alignment: narrow(limits.optimal_buffer_copy_offset_alignment),
            buffer_shader_resource_offset_alignment: narrow(limits.min_texel_buffer_offset_alignment),
            constant_buffer_offset_alignment: narrow(limits.min_uniform_buffer_offset_alignment),
            memory_allocation_max_num: limits.max_memory_allocation_count,
            descriptor_heap_max_slots: MAX_DESCRIPTOR_HEAP_SLOTS,
            ..Default::default()
        };
        log::info!(
            target: LOG_TARGET,
            "Selected adapter '{}' with {} memory types",
            desc.adapter_name,
            memory_properties.memory_type_count
        );

        Ok(Self {
            _entry: entry,
            instance,
            pdevice,
            device,
            desc,
            heap_usage: vec![0; memory_properties.memory_heap_count as usize],
            memory_properties,
            memory_layout,
            queue_families,
            preferred_memory_size: info.preferred_memory_size(),
            descriptor_pool_defaults: info.descriptor_pool,
            debug_utils,
            debug_messenger,
            buffers: Pool::default(),
            textures: Pool::default(),
            memories: Pool::default(),
            descriptors: Pool::default(),
            descriptor_pools: Pool::default(),
            fences: Pool::default(),
            query_pools: Pool::default(),
            queues: Pool::default(),
            queue_handles: HashMap::new(),
            command_allocators: Pool::default(),
            command_buffers: Pool::default(),
        })
    }

    fn queue(&self, queue: Handle<CommandQueue>) -> Result<Queue> {
        self.queues
            .get_ref(queue)
            .copied()
            .ok_or_else(|| GPUError::invalid(format!("unknown command queue handle {:?}", queue)))
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            if let Err(err) = self.device.device_wait_idle() {
                log::error!(target: LOG_TARGET, "Device wait failed during teardown: {}", err);
            }

            for cmd in self.command_allocators.drain() {
                self.device.destroy_command_pool(cmd.raw, None);
            }
            self.command_buffers.drain();
            for pool in self.query_pools.drain() {
                self.device.destroy_query_pool(pool, None);
            }
            for fence in self.fences.drain() {
                self.device.destroy_semaphore(fence, None);
            }
            for descriptor in self.descriptors.drain() {
                match descriptor {
                    VkDescriptor::Buffer { view, .. } => {
                        if let Some(view) = view {
                            self.device.destroy_buffer_view(view, None);
                        }
                    }
                    VkDescriptor::Image(view) => self.device.destroy_image_view(view, None),
                    VkDescriptor::Sampler(sampler) => self.device.destroy_sampler(sampler, None),
                }
            }
            self.descriptor_pools.drain();
            for buffer in self.buffers.drain() {
                self.device.destroy_buffer(buffer.raw, None);
            }
            for texture in self.textures.drain() {
                self.device.destroy_image(texture.raw, None);
            }
            for memory in self.memories.drain() {
                if let Some(raw) = memory.raw {
                    self.device.free_memory(raw, None);
                }
            }

            if let (Some(utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger) {
                utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

impl DeviceBackend for VulkanBackend {
    fn advertised(&self) -> Capabilities {
        Capabilities::CORE | Capabilities::HELPER | Capabilities::RESOURCE_ALLOCATOR
    }

    fn core(&mut self) -> &mut dyn CoreInterface {
        self
    }

    fn helper(&mut self) -> Option<&mut dyn HelperInterface> {
        Some(self)
    }

    fn resource_allocator(&mut self) -> Option<&mut dyn ResourceAllocatorInterface> {
        Some(self)
    }
}

impl HelperInterface for VulkanBackend {
    fn calculate_allocation_number(&mut self, desc: &ResourceGroupDesc) -> Result<u32> {
        planner::allocation_count(&*self, desc, self.preferred_memory_size)
    }

    fn allocate_and_bind_memory(&mut self, desc: &ResourceGroupDesc) -> Result<Vec<Handle<Memory>>> {
        let block_size = self.preferred_memory_size;
        planner::allocate_and_bind(self, desc, block_size)
    }

    fn query_video_memory_info(&mut self, location: MemoryLocation) -> Result<VideoMemoryInfo> {
        Ok(self.video_memory_info(location))
    }

    fn wait_for_idle(&mut self, queue: Handle<CommandQueue>) -> Result<()> {
        let queue = self.queue(queue)?;
        unsafe { self.device.queue_wait_idle(queue.raw) }?;
        Ok(())
    }
}

impl ResourceAllocatorInterface for VulkanBackend {
    fn allocate_buffer(&mut self, desc: &AllocateBufferDesc) -> Result<Handle<Buffer>> {
        let buffer = self.create_buffer(&desc.desc)?;
        let bound = self
            .get_buffer_memory_desc(buffer, desc.memory_location)
            .and_then(|memory_desc| {
                self.allocate_memory(&AllocateMemoryDesc {
                    size: memory_desc.size,
                    memory_type: memory_desc.memory_type,
                    priority: desc.memory_priority,
                })
            })
            .and_then(|memory| {
                let binding = BufferMemoryBinding {
                    buffer,
                    memory,
                    offset: 0,
                };
                match self.bind_buffer_memory(&[binding]) {
                    Ok(()) => Ok(memory),
                    Err(err) => {
                        if let Err(free_err) = self.free_memory(memory) {
                            log::warn!(
                                target: LOG_TARGET,
                                "Failed to release memory after a failed bind: {}",
                                free_err
                            );
                        }
                        Err(err)
                    }
                }
            });

        match bound {
            Ok(_) => {
                if let Some(record) = self.buffers.get_mut_ref(buffer) {
                    record.owns_memory = true;
                }
                Ok(buffer)
            }
            Err(err) => {
                if let Err(destroy_err) = self.destroy_buffer(buffer) {
                    log::warn!(
                        target: LOG_TARGET,
                        "Failed to destroy buffer after a failed allocation: {}",
                        destroy_err
                    );
                }
                Err(err)
            }
        }
    }

    fn allocate_texture(&mut self, desc: &AllocateTextureDesc) -> Result<Handle<Texture>> {
        let texture = self.create_texture(&desc.desc)?;
        let bound = self
            .get_texture_memory_desc(texture, desc.memory_location)
            .and_then(|memory_desc| {
                self.allocate_memory(&AllocateMemoryDesc {
                    size: memory_desc.size,
                    memory_type: memory_desc.memory_type,
                    priority: desc.memory_priority,
                })
            })
            .and_then(|memory| {
                let binding = TextureMemoryBinding {
                    texture,
                    memory,
                    offset: 0,
                };
                match self.bind_texture_memory(&[binding]) {
                    Ok(()) => Ok(memory),
                    Err(err) => {
                        if let Err(free_err) = self.free_memory(memory) {
                            log::warn!(
                                target: LOG_TARGET,
                                "Failed to release memory after a failed bind: {}",
                                free_err
                            );
                        }
                        Err(err)
                    }
                }
            });

        match bound {
            Ok(_) => {
                if let Some(record) = self.textures.get_mut_ref(texture) {
                    record.owns_memory = true;
                }
                Ok(texture)
            }
            Err(err) => {
                if let Err(destroy_err) = self.destroy_texture(texture) {
                    log::warn!(
                        target: LOG_TARGET,
                        "Failed to destroy texture after a failed allocation: {}",
                        destroy_err
                    );
                }
                Err(err)
            }
        }
    }
}
