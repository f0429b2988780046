use std::time::Duration;

use bitflags::bitflags;
#[cfg(feature = "rhi-serde")]
use serde::{Deserialize, Serialize};

use super::memory::MemoryTypeId;
use super::objects::*;
use crate::utils::Handle;

/// Pass to `wait` to block until the fence reaches the value.
pub const WAIT_INFINITE: Duration = Duration::MAX;

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum GraphicsApi {
    /// Conformance backend.
    #[default]
    None,
    D3D11,
    D3D12,
    Vulkan,
}

#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct InterfaceVersion {
    pub major: u16,
    pub minor: u16,
}

impl InterfaceVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// True when a caller built against `required` may use this version.
    pub fn satisfies(&self, required: InterfaceVersion) -> bool {
        self.major == required.major && self.minor >= required.minor
    }
}

pub const INTERFACE_VERSION: InterfaceVersion = InterfaceVersion::new(1, 3);

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum MemoryLocation {
    #[default]
    Device,
    /// Device-local and host-writable (resizable BAR / UMA).
    DeviceUpload,
    HostUpload,
    HostReadback,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum QueueType {
    #[default]
    Graphics,
    Compute,
    Transfer,
}

#[repr(u8)]
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum Format {
    #[default]
    Unknown,
    R8Unorm,
    R32Uint,
    R32Float,
    RGBA8Unorm,
    BGRA8Unorm,
    RGBA16Float,
    RGBA32Float,
    D32Float,
    D24S8,
}

impl Format {
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Format::Unknown => 0,
            Format::R8Unorm => 1,
            Format::R32Uint | Format::R32Float | Format::RGBA8Unorm | Format::BGRA8Unorm => 4,
            Format::D32Float | Format::D24S8 => 4,
            Format::RGBA16Float => 8,
            Format::RGBA32Float => 16,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, Format::D32Float | Format::D24S8)
    }
}

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatSupportBits: u32 {
        const TEXTURE               = 0x1;
        const STORAGE_TEXTURE       = 0x2;
        const COLOR_ATTACHMENT      = 0x4;
        const DEPTH_STENCIL         = 0x8;
        const BUFFER                = 0x10;
        const STORAGE_BUFFER        = 0x20;
        const VERTEX_BUFFER         = 0x40;
    }
}

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
    pub struct BufferUsageBits: u32 {
        const SHADER_RESOURCE         = 0x1;
        const SHADER_RESOURCE_STORAGE = 0x2;
        const VERTEX_BUFFER           = 0x4;
        const INDEX_BUFFER            = 0x8;
        const CONSTANT_BUFFER         = 0x10;
        const ARGUMENT_BUFFER         = 0x20;
        const COPY_SRC                = 0x40;
        const COPY_DST                = 0x80;
    }
}

bitflags! {
    #[repr(C)]
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
    pub struct TextureUsageBits: u32 {
        const SHADER_RESOURCE          = 0x1;
        const SHADER_RESOURCE_STORAGE  = 0x2;
        const COLOR_ATTACHMENT         = 0x4;
        const DEPTH_STENCIL_ATTACHMENT = 0x8;
        const COPY_SRC                 = 0x10;
        const COPY_DST                 = 0x20;
    }
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum TextureType {
    Texture1D,
    #[default]
    Texture2D,
    Texture3D,
}

#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct BufferDesc {
    pub size: u64,
    pub structure_stride: u32,
    pub usage: BufferUsageBits,
}

#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct TextureDesc {
    pub texture_type: TextureType,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_num: u32,
    pub layer_num: u32,
    pub sample_num: u32,
    pub usage: TextureUsageBits,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            texture_type: TextureType::Texture2D,
            format: Format::Unknown,
            width: 0,
            height: 0,
            depth: 0,
            mip_num: 0,
            layer_num: 0,
            sample_num: 0,
            usage: TextureUsageBits::empty(),
        }
    }
}

/// Memory requirements of a resource for one location.
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryDesc {
    pub size: u64,
    pub alignment: u32,
    pub memory_type: MemoryTypeId,
    pub must_be_dedicated: bool,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct AllocateMemoryDesc {
    pub size: u64,
    pub memory_type: MemoryTypeId,
    /// Residency priority in [-1, 1].
    pub priority: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferMemoryBinding {
    pub buffer: Handle<Buffer>,
    pub memory: Handle<Memory>,
    pub offset: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureMemoryBinding {
    pub texture: Handle<Texture>,
    pub memory: Handle<Memory>,
    pub offset: u64,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferViewType {
    #[default]
    ShaderResource,
    ShaderResourceStorage,
    Constant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferViewDesc {
    pub buffer: Handle<Buffer>,
    pub view_type: BufferViewType,
    pub format: Format,
    pub offset: u64,
    pub size: u64,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureViewType {
    #[default]
    ShaderResource,
    ShaderResourceStorage,
    ColorAttachment,
    DepthStencilAttachment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureViewDesc {
    pub texture: Handle<Texture>,
    pub view_type: TextureViewType,
    pub format: Format,
    pub mip_offset: u32,
    pub mip_num: u32,
    pub layer_offset: u32,
    pub layer_num: u32,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mip_filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub anisotropy: u8,
    pub mip_bias: f32,
    pub mip_min: f32,
    pub mip_max: f32,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub enum QueryType {
    #[default]
    Timestamp,
    Occlusion,
}

#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rhi-serde", derive(Serialize, Deserialize))]
pub struct QueryPoolDesc {
    pub query_type: QueryType,
    pub capacity: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FenceSignal {
    pub fence: Handle<Fence>,
    pub value: u64,
}

#[derive(Default, Clone, Copy, Debug)]
pub struct QueueSubmitDesc<'a> {
    pub command_buffers: &'a [Handle<CommandBuffer>],
    pub signal: Option<FenceSignal>,
}

/// Host view of a mapped buffer range. Valid until `unmap_buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedMemory {
    ptr: *mut u8,
    len: usize,
}

impl Default for MappedMemory {
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }
}

impl MappedMemory {
    pub fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// # Safety
    /// The buffer must still be mapped and no other slice over the same range
    /// may be alive.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        if self.ptr.is_null() {
            return &mut [];
        }
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct DeviceDesc {
    pub graphics_api: GraphicsApi,
    pub interface_version: InterfaceVersion,
    pub adapter_name: String,
    pub upload_buffer_texture_row_alignment: u32,
    pub upload_buffer_texture_slice_alignment: u32,
    pub buffer_shader_resource_offset_alignment: u32,
    pub constant_buffer_offset_alignment: u32,
    pub memory_allocation_max_num: u32,
    pub descriptor_heap_max_slots: u32,
    pub is_swap_chain_supported: bool,
    pub is_ray_tracing_supported: bool,
    pub is_mesh_shader_supported: bool,
    pub is_low_latency_supported: bool,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoMemoryInfo {
    pub budget_size: u64,
    pub usage_size: u64,
}

/// Resources the helper allocates and binds in one pass.
#[derive(Default, Clone, Copy, Debug)]
pub struct ResourceGroupDesc<'a> {
    pub memory_location: MemoryLocation,
    pub buffers: &'a [Handle<Buffer>],
    pub textures: &'a [Handle<Texture>],
    /// Block size for shared allocations; 0 selects the device default.
    pub preferred_memory_size: u64,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct AllocateBufferDesc {
    pub desc: BufferDesc,
    pub memory_location: MemoryLocation,
    pub memory_priority: f32,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct AllocateTextureDesc {
    pub desc: TextureDesc,
    pub memory_location: MemoryLocation,
    pub memory_priority: f32,
}

//-------------------------------------------------------------------------
// Extension group descriptions.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub queue: Handle<CommandQueue>,
    /// Platform window handle, passed through untouched.
    pub window: u64,
    pub width: u32,
    pub height: u32,
    pub texture_num: u8,
    pub format: Format,
    pub vsync_interval: u8,
}

#[repr(u8)]
#[derive(Default, Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccelerationStructureType {
    #[default]
    TopLevel,
    BottomLevel,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccelerationStructureDesc {
    pub structure_type: AccelerationStructureType,
    /// Instance count for top level, geometry count for bottom level.
    pub item_num: u32,
    pub allow_update: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccelerationStructureMemoryBinding {
    pub acceleration_structure: Handle<AccelerationStructure>,
    pub memory: Handle<Memory>,
    pub offset: u64,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamerDesc {
    pub ring_buffer_size: u64,
    pub dynamic_buffer_usage: BufferUsageBits,
    pub constant_buffer_size: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferUpdateRequest<'a> {
    pub data: &'a [u8],
    pub dst_buffer: Handle<Buffer>,
    pub dst_offset: u64,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencySleepMode {
    pub min_interval_us: u32,
    pub low_latency_mode: bool,
    pub low_latency_boost: bool,
}

#[repr(u8)]
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyMarker {
    SimulationStart,
    SimulationEnd,
    RenderSubmitStart,
    RenderSubmitEnd,
    InputSample,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencyReport {
    pub input_sample_time_us: u64,
    pub simulation_start_time_us: u64,
    pub simulation_end_time_us: u64,
    pub render_submit_start_time_us: u64,
    pub render_submit_end_time_us: u64,
    pub present_start_time_us: u64,
    pub present_end_time_us: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferCopy {
    pub src: Handle<Buffer>,
    pub src_offset: u64,
    pub dst: Handle<Buffer>,
    pub dst_offset: u64,
    pub size: u64,
}
