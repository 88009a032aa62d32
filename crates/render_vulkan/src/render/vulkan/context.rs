//! Vulkan context management
//!
//! Instance creation, presentation surface, physical device selection, the
//! logical device with its graphics and present queues, and the command pool
//! every other GPU resource is recorded from.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::vk;
use ash::{Device, Entry, Instance};
use std::collections::HashSet;
use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use thiserror::Error;

use super::commands::CommandPool;
use super::swapchain::SurfaceSupport;
use super::window::Window;
use crate::config::RendererConfig;

const ENGINE_NAME: &str = "RenderVulkan";

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The logical device was lost
    #[error("Vulkan device lost")]
    DeviceLost,

    /// The surface changed and the swapchain no longer matches it
    #[error("Swapchain is out of date with the surface")]
    SurfaceOutOfDate,

    /// Host or device memory was exhausted
    #[error("Allocation failed: {0:?}")]
    AllocationFailed(vk::Result),

    /// No physical device met the renderer's requirements
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// A shader binary is missing or unreadable
    #[error("Shader not found: {}", path.display())]
    ShaderNotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Shader bytes are not valid SPIR-V words
    #[error("Invalid SPIR-V: {0}")]
    InvalidShaderCode(String),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

impl VulkanError {
    /// Whether the renderer can continue after rebuilding its swapchain
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SurfaceOutOfDate)
    }
}

impl From<vk::Result> for VulkanError {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_DEVICE_LOST => Self::DeviceLost,
            vk::Result::ERROR_OUT_OF_DATE_KHR => Self::SurfaceOutOfDate,
            vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                Self::AllocationFailed(result)
            }
            other => Self::Api(other),
        }
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value)
        .map_err(|e| VulkanError::InitializationFailed(format!("Invalid name {value:?}: {e}")))
}

/// Read a fixed-size, NUL-terminated name field returned by the driver
fn fixed_name(raw: &[c_char]) -> String {
    // Driver strings are always NUL-terminated within the array
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    /// Create a new Vulkan instance for the window's surface extensions
    pub fn new(window: &Window, config: &RendererConfig) -> VulkanResult<Self> {
        let enable_validation = config.validation_enabled();
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e:?}")))?;

        #[allow(unused_unsafe)]
        let available_extensions: Vec<String> =
            unsafe { entry.enumerate_instance_extension_properties(None)? }
                .iter()
                .map(|ext| fixed_name(&ext.extension_name))
                .collect();

        log::debug!("Available instance extensions:");
        for name in &available_extensions {
            log::debug!("  {name}");
        }

        let app_name_cstr = to_cstring(&config.application_name)?;
        let engine_name_cstr = to_cstring(ENGINE_NAME)?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extension_names = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to get required extensions: {e}")))?;

        let portability_name = vk::KhrPortabilityEnumerationFn::name().to_string_lossy();
        let mut flags = vk::InstanceCreateFlags::empty();
        if available_extensions.iter().any(|ext| *ext == portability_name) {
            extension_names.push(portability_name.into_owned());
            flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }

        let debug_hooks = enable_validation && debug_utils_available(&available_extensions);
        if debug_hooks {
            extension_names.push(DebugUtils::name().to_string_lossy().into_owned());
        }

        let layer_names = if enable_validation {
            Self::validation_layers(&entry, &config.validation_layers)?
        } else {
            Vec::new()
        };

        let extension_cstrs = extension_names
            .iter()
            .map(|name| to_cstring(name))
            .collect::<VulkanResult<Vec<_>>>()?;
        let extension_ptrs: Vec<*const c_char> = extension_cstrs.iter().map(|ext| ext.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .flags(flags)
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        let (debug_utils, debug_messenger) = if debug_hooks {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    log::error!("Failed to set up Vulkan debug messenger: {e}");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Validation layers to enable; a missing layer is reported and skipped
    fn validation_layers(entry: &Entry, requested: &[String]) -> VulkanResult<Vec<CString>> {
        #[allow(unused_unsafe)]
        let available: Vec<String> = unsafe { entry.enumerate_instance_layer_properties()? }
            .iter()
            .map(|layer| fixed_name(&layer.layer_name))
            .collect();

        available_layers(requested, &available)
            .iter()
            .map(|name| to_cstring(name))
            .collect()
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };
        Ok(messenger)
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(debug_messenger)) = (&self.debug_utils, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(debug_messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Requested layers the loader offers, in request order; the rest are logged and dropped
pub fn available_layers(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|name| {
            let found = available.contains(*name);
            if !found {
                log::error!("Validation layer {name} requested but not available");
            }
            found
        })
        .cloned()
        .collect()
}

/// Whether the debug messenger extension can be enabled; its absence is logged, not fatal
pub fn debug_utils_available(available_extensions: &[String]) -> bool {
    let name = DebugUtils::name().to_string_lossy();
    let found = available_extensions.iter().any(|ext| *ext == name);
    if !found {
        log::error!("{name} is not available, continuing without the debug messenger");
    }
    found
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {message_type:?} - {message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {message_type:?} - {message}");
    } else {
        log::debug!("[Vulkan] {message_type:?} - {message}");
    }

    vk::FALSE
}

/// Presentation surface, destroyed after the logical device
pub struct PresentationSurface {
    loader: Surface,
    surface: vk::SurfaceKHR,
}

impl PresentationSurface {
    fn new(instance: &VulkanInstance, window: &mut Window) -> VulkanResult<Self> {
        let loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {e}")))?;

        Ok(Self { loader, surface })
    }
}

impl Drop for PresentationSurface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

/// Graphics and present queue family indices, which may coincide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// First family that supports graphics
    pub graphics: Option<u32>,
    /// First family that can present to the surface
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan the families in order, keeping the first match for each role
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> VulkanResult<bool>,
    ) -> VulkanResult<Self> {
        let mut indices = Self::default();

        for (index, family) in (0u32..).zip(families) {
            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }

            if indices.present.is_none() && supports_present(index)? {
                indices.present = Some(index);
            }

            if indices.graphics.is_some() && indices.present.is_some() {
                break;
            }
        }

        Ok(indices)
    }
}

/// Everything device selection looks at, gathered up front
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    /// Device name as reported by the driver
    pub name: String,
    /// Discrete, integrated, virtual, ...
    pub device_type: vk::PhysicalDeviceType,
    /// Geometry shader feature
    pub geometry_shader: bool,
    /// Tessellation shader feature
    pub tessellation_shader: bool,
    /// Queue family indices
    pub queue_families: QueueFamilyIndices,
    /// Required device extensions the device lacks
    pub missing_extensions: Vec<String>,
    /// Number of surface formats offered
    pub surface_format_count: usize,
    /// Number of present modes offered
    pub present_mode_count: usize,
}

impl DeviceCandidate {
    /// First requirement the device fails, or `None` when it qualifies
    pub fn rejection_reason(&self) -> Option<String> {
        if self.device_type != vk::PhysicalDeviceType::DISCRETE_GPU {
            return Some(format!("not a discrete GPU ({:?})", self.device_type));
        }
        if !self.geometry_shader {
            return Some("geometry shaders unsupported".to_string());
        }
        if !self.tessellation_shader {
            return Some("tessellation shaders unsupported".to_string());
        }
        if self.queue_families.graphics.is_none() {
            return Some("no graphics queue family".to_string());
        }
        if self.queue_families.present.is_none() {
            return Some("no present queue family".to_string());
        }
        if !self.missing_extensions.is_empty() {
            return Some(format!("missing extensions: {}", self.missing_extensions.join(", ")));
        }
        if self.surface_format_count == 0 {
            return Some("no surface formats".to_string());
        }
        if self.present_mode_count == 0 {
            return Some("no present modes".to_string());
        }
        None
    }
}

/// Swapchain presentation plus any configured extensions, without duplicates
pub fn required_device_extensions(extra: &[String]) -> Vec<String> {
    let mut names = vec![SwapchainLoader::name().to_string_lossy().into_owned()];
    for name in extra {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

/// First candidate that was described without error and meets every requirement
///
/// A candidate whose queries failed is rejected like any other; selection moves on.
pub fn first_qualifying<D>(
    candidates: impl IntoIterator<Item = (D, VulkanResult<DeviceCandidate>)>,
) -> Option<(D, DeviceCandidate)> {
    for (device, described) in candidates {
        let candidate = match described {
            Ok(candidate) => candidate,
            Err(e) => {
                log::debug!("Rejected GPU: capability query failed: {e}");
                continue;
            }
        };

        if let Some(reason) = candidate.rejection_reason() {
            log::debug!("Rejected GPU {}: {}", candidate.name, reason);
            continue;
        }

        return Some((device, candidate));
    }
    None
}

/// Distinct queue families to create queues for, in ascending order
pub fn unique_queue_families(graphics_family: u32, present_family: u32) -> Vec<u32> {
    let unique: HashSet<u32> = [graphics_family, present_family].into_iter().collect();
    let mut families: Vec<u32> = unique.into_iter().collect();
    families.sort_unstable();
    families
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory heaps and types, cached for buffer allocation
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    /// Select the first physical device that satisfies every requirement
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        required_extensions: &[String],
    ) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices()? };

        let candidates = devices.into_iter().map(|device| {
            let described = Self::describe(instance, device, surface, surface_loader, required_extensions);
            (device, described)
        });

        let Some((device, candidate)) = first_qualifying(candidates) else {
            return Err(VulkanError::NoSuitableDevice);
        };
        let (Some(graphics_family), Some(present_family)) =
            (candidate.queue_families.graphics, candidate.queue_families.present)
        else {
            return Err(VulkanError::NoSuitableDevice);
        };
        log::info!("Selected GPU: {}", candidate.name);

        Ok(unsafe {
            Self {
                device,
                properties: instance.get_physical_device_properties(device),
                features: instance.get_physical_device_features(device),
                memory_properties: instance.get_physical_device_memory_properties(device),
                graphics_family,
                present_family,
            }
        })
    }

    fn describe(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        required_extensions: &[String],
    ) -> VulkanResult<DeviceCandidate> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let queue_families = QueueFamilyIndices::find(&families, |index| unsafe {
            Ok(surface_loader.get_physical_device_surface_support(device, index, surface)?)
        })?;

        let available: Vec<String> = unsafe { instance.enumerate_device_extension_properties(device)? }
            .iter()
            .map(|ext| fixed_name(&ext.extension_name))
            .collect();
        let missing_extensions = required_extensions
            .iter()
            .filter(|name| !available.contains(*name))
            .cloned()
            .collect();

        let support = SurfaceSupport::query(surface_loader, device, surface)?;

        Ok(DeviceCandidate {
            name: fixed_name(&properties.device_name),
            device_type: properties.device_type,
            geometry_shader: features.geometry_shader != vk::FALSE,
            tessellation_shader: features.tessellation_shader != vk::FALSE,
            queue_families,
            missing_extensions,
            surface_format_count: support.formats.len(),
            present_mode_count: support.present_modes.len(),
        })
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create a new logical device with one queue per distinct family and `extensions` enabled
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
        extensions: &[String],
    ) -> VulkanResult<Self> {
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> =
            unique_queue_families(physical_device_info.graphics_family, physical_device_info.present_family)
                .into_iter()
                .map(|family| {
                    vk::DeviceQueueCreateInfo::builder()
                        .queue_family_index(family)
                        .queue_priorities(&[1.0])
                        .build()
                })
                .collect();

        let extension_cstrs = extensions
            .iter()
            .map(|name| to_cstring(name))
            .collect::<VulkanResult<Vec<_>>>()?;
        let extension_ptrs: Vec<*const c_char> = extension_cstrs.iter().map(|ext| ext.as_ptr()).collect();
        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&device_features);

        let device = unsafe { instance.create_device(physical_device_info.device, &create_info, None)? };

        let graphics_queue = unsafe { device.get_device_queue(physical_device_info.graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(physical_device_info.present_family, 0) };

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Owns the core Vulkan objects; created once and dropped last
///
/// Fields drop in declaration order: command pool, device, surface, then the
/// instance.
pub struct VulkanContext {
    command_pool: CommandPool,
    device: LogicalDevice,
    surface: PresentationSurface,
    physical_device: PhysicalDeviceInfo,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Create a new Vulkan context for the window
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        let enable_validation = config.validation_enabled();
        log::info!(
            "Creating Vulkan context for '{}' (validation {})",
            config.application_name,
            if enable_validation { "on" } else { "off" }
        );

        let instance = VulkanInstance::new(window, config)?;
        let surface = PresentationSurface::new(&instance, window)?;

        let device_extensions = required_device_extensions(&config.device_extensions);
        let physical_device = PhysicalDeviceInfo::select_suitable_device(
            &instance.instance,
            surface.surface,
            &surface.loader,
            &device_extensions,
        )?;

        let device = LogicalDevice::new(&instance.instance, &physical_device, &device_extensions)?;
        let command_pool = CommandPool::new(device.device.clone(), physical_device.graphics_family)?;

        Ok(Self {
            command_pool,
            device,
            surface,
            physical_device,
            instance,
        })
    }

    /// Get a reference to the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the surface handle
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface.surface
    }

    /// Get the surface loader
    pub fn surface_loader(&self) -> &Surface {
        &self.surface.loader
    }

    /// Get the physical device info
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Memory properties of the selected physical device
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.physical_device.memory_properties
    }

    /// Get the logical device wrapper
    pub fn logical_device(&self) -> &LogicalDevice {
        &self.device
    }

    /// Get the raw device
    pub fn device(&self) -> &Device {
        &self.device.device
    }

    /// Get the swapchain loader
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Get the graphics and present queue family indices
    pub fn queue_families(&self) -> (u32, u32) {
        (self.physical_device.graphics_family, self.physical_device.present_family)
    }

    /// Command pool for the graphics queue family
    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device.device_wait_idle()? };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualifying_candidate() -> DeviceCandidate {
        DeviceCandidate {
            name: "Test GPU".to_string(),
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            geometry_shader: true,
            tessellation_shader: true,
            queue_families: QueueFamilyIndices {
                graphics: Some(0),
                present: Some(1),
            },
            missing_extensions: Vec::new(),
            surface_format_count: 2,
            present_mode_count: 1,
        }
    }

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_result_classification() {
        assert!(matches!(VulkanError::from(vk::Result::ERROR_DEVICE_LOST), VulkanError::DeviceLost));
        assert!(matches!(
            VulkanError::from(vk::Result::ERROR_OUT_OF_DATE_KHR),
            VulkanError::SurfaceOutOfDate
        ));
        assert!(matches!(
            VulkanError::from(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            VulkanError::AllocationFailed(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)
        ));
        assert!(matches!(
            VulkanError::from(vk::Result::ERROR_INITIALIZATION_FAILED),
            VulkanError::Api(vk::Result::ERROR_INITIALIZATION_FAILED)
        ));
    }

    #[test]
    fn test_only_stale_surface_is_recoverable() {
        assert!(VulkanError::SurfaceOutOfDate.is_recoverable());
        assert!(!VulkanError::DeviceLost.is_recoverable());
        assert!(!VulkanError::NoSuitableDevice.is_recoverable());
        assert!(!VulkanError::Api(vk::Result::ERROR_UNKNOWN).is_recoverable());
    }

    #[test]
    fn test_qualifying_device_has_no_rejection() {
        assert_eq!(qualifying_candidate().rejection_reason(), None);
    }

    #[test]
    fn test_rejection_reasons() {
        let mut integrated = qualifying_candidate();
        integrated.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        assert!(integrated.rejection_reason().unwrap().contains("discrete"));

        let mut no_tessellation = qualifying_candidate();
        no_tessellation.tessellation_shader = false;
        assert!(no_tessellation.rejection_reason().unwrap().contains("tessellation"));

        let mut no_present = qualifying_candidate();
        no_present.queue_families.present = None;
        assert!(no_present.rejection_reason().unwrap().contains("present queue"));

        let mut no_swapchain = qualifying_candidate();
        no_swapchain.missing_extensions = vec!["VK_KHR_swapchain".to_string()];
        assert!(no_swapchain.rejection_reason().unwrap().contains("VK_KHR_swapchain"));

        let mut no_modes = qualifying_candidate();
        no_modes.present_mode_count = 0;
        assert!(no_modes.rejection_reason().unwrap().contains("present modes"));
    }

    #[test]
    fn test_queue_family_search_keeps_first_matches() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];

        let indices = QueueFamilyIndices::find(&families, |index| Ok(index == 2)).unwrap();

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(2));
    }

    #[test]
    fn test_queue_family_search_without_presentation() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let indices = QueueFamilyIndices::find(&families, |_| Ok(false)).unwrap();

        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, None);
    }

    #[test]
    fn test_selection_skips_candidate_whose_queries_failed() {
        let mut second = qualifying_candidate();
        second.name = "Second GPU".to_string();
        let candidates = vec![
            ("first", Err(VulkanError::Api(vk::Result::ERROR_INITIALIZATION_FAILED))),
            ("second", Ok(second)),
        ];

        let (device, candidate) = first_qualifying(candidates).unwrap();

        assert_eq!(device, "second");
        assert_eq!(candidate.name, "Second GPU");
    }

    #[test]
    fn test_selection_keeps_first_qualifying_candidate() {
        let mut integrated = qualifying_candidate();
        integrated.device_type = vk::PhysicalDeviceType::INTEGRATED_GPU;
        let candidates = vec![(0, Ok(integrated)), (1, Ok(qualifying_candidate())), (2, Ok(qualifying_candidate()))];

        assert_eq!(first_qualifying(candidates).map(|(device, _)| device), Some(1));
    }

    #[test]
    fn test_selection_without_qualifying_candidate() {
        let candidates: Vec<(u32, VulkanResult<DeviceCandidate>)> =
            vec![(0, Err(VulkanError::Api(vk::Result::ERROR_UNKNOWN)))];
        assert!(first_qualifying(candidates).is_none());
    }

    #[test]
    fn test_required_device_extensions_start_with_swapchain() {
        assert_eq!(required_device_extensions(&[]), vec!["VK_KHR_swapchain".to_string()]);

        let extra = vec!["VK_KHR_maintenance1".to_string(), "VK_KHR_swapchain".to_string()];
        assert_eq!(
            required_device_extensions(&extra),
            vec!["VK_KHR_swapchain".to_string(), "VK_KHR_maintenance1".to_string()]
        );
    }

    #[test]
    fn test_missing_layers_are_dropped() {
        let requested = vec!["VK_LAYER_KHRONOS_validation".to_string(), "VK_LAYER_LUNARG_monitor".to_string()];
        let available = vec!["VK_LAYER_LUNARG_monitor".to_string()];

        assert_eq!(available_layers(&requested, &available), vec!["VK_LAYER_LUNARG_monitor".to_string()]);
        assert!(available_layers(&requested, &[]).is_empty());
    }

    #[test]
    fn test_debug_hooks_need_debug_utils_extension() {
        let with = vec!["VK_KHR_surface".to_string(), "VK_EXT_debug_utils".to_string()];
        let without = vec!["VK_KHR_surface".to_string()];

        assert!(debug_utils_available(&with));
        assert!(!debug_utils_available(&without));
    }

    #[test]
    fn test_unique_queue_families_deduplicates() {
        assert_eq!(unique_queue_families(0, 0), vec![0]);
        assert_eq!(unique_queue_families(2, 1), vec![1, 2]);
    }
}
