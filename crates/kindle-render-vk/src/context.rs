// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, CStr, CString};

use ash::ext::debug_utils;
use ash::khr::{portability_enumeration, portability_subset, surface, swapchain};
use ash::{vk, Entry, Instance};
use kindle_render::{RenderSize, SurfaceSource};
use raw_window_handle::RawDisplayHandle;
use tracing::{debug, info};

use crate::debug::{all_present, messenger_create_info, VALIDATION_LAYER};
use crate::error::{ContextError, Resource};
use crate::negotiate::{negotiate, SwapchainConfig};
use crate::probe::{
    check_extension_support, query_swapchain_support, AshProbe, QueueFamilies, SwapchainSupport,
};
use crate::release::{acquire, ReleaseStack};
use crate::select::{pick_physical_device, SelectedDevice};

#[derive(Clone, Debug)]
pub struct ContextSettings {
    pub app_name: String,
    /// Device extensions the selected GPU must support. The swapchain
    /// extension is always added.
    pub device_extensions: Vec<CString>,
    /// Enable the Khronos validation layer and route its messages to `tracing`.
    pub validation: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            app_name: String::from("kindle"),
            device_extensions: vec![swapchain::NAME.to_owned()],
            validation: cfg!(debug_assertions),
        }
    }
}

impl ContextSettings {
    fn required_device_extensions(&self) -> Vec<&CStr> {
        let mut names: Vec<&CStr> = self.device_extensions.iter().map(CString::as_c_str).collect();
        if !names.contains(&swapchain::NAME) {
            names.push(swapchain::NAME);
        }
        names
    }
}

/// Construction progress. Strictly linear; a failed step aborts the build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Uninitialized,
    InstanceCreated,
    SurfaceCreated,
    DeviceSelected,
    LogicalDeviceCreated,
    SwapchainCreated,
    Ready,
}

impl BuildStage {
    pub fn next(self) -> Option<BuildStage> {
        use BuildStage::*;
        match self {
            Uninitialized => Some(InstanceCreated),
            InstanceCreated => Some(SurfaceCreated),
            SurfaceCreated => Some(DeviceSelected),
            DeviceSelected => Some(LogicalDeviceCreated),
            LogicalDeviceCreated => Some(SwapchainCreated),
            SwapchainCreated => Some(Ready),
            Ready => None,
        }
    }

    fn advance(&mut self, to: BuildStage) {
        debug_assert_eq!(self.next(), Some(to), "build stages must not be skipped");
        debug!("{self:?} -> {to:?}");
        *self = to;
    }
}

fn layer_names(validation: bool) -> Vec<*const c_char> {
    if validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    }
}

fn cstr_names<'a>(names: impl Iterator<Item = &'a CStr>) -> Vec<String> {
    names.map(|n| n.to_string_lossy().into_owned()).collect()
}

/// Everything a renderer needs to start recording work against a window.
///
/// Created objects are released in reverse creation order by
/// [`RenderingContext::teardown`], which also runs on drop.
pub struct RenderingContext {
    releases: ReleaseStack,

    images: Vec<vk::Image>,
    config: SwapchainConfig,
    swapchain: vk::SwapchainKHR,
    swapchain_loader: swapchain::Device,

    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    device: ash::Device,
    selected: SelectedDevice,

    surface: vk::SurfaceKHR,
    surface_loader: surface::Instance,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    instance: Instance,

    stage: BuildStage,
    // The loader library must outlive every release above.
    entry: Entry,
}

unsafe fn create_instance(
    entry: &Entry,
    display: RawDisplayHandle,
    settings: &ContextSettings,
    releases: &mut ReleaseStack,
) -> Result<Instance, ContextError> {
    let available_props = unsafe { entry.enumerate_instance_extension_properties(None) }
        .map_err(ContextError::query("enumerating instance extensions"))?;
    let available: Vec<&CStr> = available_props
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok())
        .collect();

    let mut wanted: Vec<&CStr> = ash_window::enumerate_required_extensions(display)
        .map_err(ContextError::query("querying window-system extensions"))?
        .iter()
        // SAFETY: ash-window hands out pointers to static NUL-terminated names.
        .map(|&p| unsafe { CStr::from_ptr(p) })
        .collect();

    if settings.validation {
        let layer_props = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(ContextError::query("enumerating instance layers"))?;
        let layers: Vec<&CStr> = layer_props
            .iter()
            .filter_map(|l| l.layer_name_as_c_str().ok())
            .collect();
        if !all_present(&[VALIDATION_LAYER], &layers) {
            return Err(ContextError::ValidationLayerUnavailable);
        }
        wanted.push(debug_utils::NAME);
    }

    let missing: Vec<&CStr> = wanted
        .iter()
        .copied()
        .filter(|w| !available.contains(w))
        .collect();
    if !missing.is_empty() {
        return Err(ContextError::MissingInstanceExtensions(cstr_names(
            missing.into_iter(),
        )));
    }

    let mut flags = vk::InstanceCreateFlags::empty();
    if available.contains(&portability_enumeration::NAME) {
        wanted.push(portability_enumeration::NAME);
        flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    }
    debug!("instance extensions: {:?}", cstr_names(wanted.iter().copied()));

    let app_name =
        CString::new(settings.app_name.as_str()).unwrap_or_else(|_| c"kindle".to_owned());
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"kindle")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let ext_ptrs: Vec<*const c_char> = wanted.iter().map(|n| n.as_ptr()).collect();
    let layer_ptrs = layer_names(settings.validation);
    // Covers messages emitted by vkCreateInstance / vkDestroyInstance themselves.
    let mut instance_debug = messenger_create_info();

    let mut create_info = vk::InstanceCreateInfo::default()
        .flags(flags)
        .application_info(&app_info)
        .enabled_extension_names(&ext_ptrs)
        .enabled_layer_names(&layer_ptrs);
    if settings.validation {
        create_info = create_info.push_next(&mut instance_debug);
    }

    acquire(
        releases,
        Resource::Instance,
        || unsafe { entry.create_instance(&create_info, None) },
        |instance: Instance| unsafe { instance.destroy_instance(None) },
    )
}

unsafe fn create_debug_messenger(
    entry: &Entry,
    instance: &Instance,
    releases: &mut ReleaseStack,
) -> Result<vk::DebugUtilsMessengerEXT, ContextError> {
    let loader = debug_utils::Instance::new(entry, instance);
    let destroyer = loader.clone();
    let create_info = messenger_create_info();
    acquire(
        releases,
        Resource::DebugMessenger,
        || unsafe { loader.create_debug_utils_messenger(&create_info, None) },
        move |messenger| unsafe { destroyer.destroy_debug_utils_messenger(messenger, None) },
    )
}

unsafe fn create_logical_device(
    instance: &Instance,
    probe: &AshProbe<'_>,
    selected: &SelectedDevice,
    required: &[&CStr],
    releases: &mut ReleaseStack,
) -> Result<ash::Device, ContextError> {
    let priorities = [1.0_f32];
    let queue_infos: Vec<vk::DeviceQueueCreateInfo> = selected
        .families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&priorities)
        })
        .collect();

    let mut extensions: Vec<*const c_char> = required.iter().map(|n| n.as_ptr()).collect();
    if !required.contains(&portability_subset::NAME)
        && check_extension_support(probe, selected.physical, &[portability_subset::NAME])
    {
        extensions.push(portability_subset::NAME.as_ptr());
    }

    let features = vk::PhysicalDeviceFeatures::default();
    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    acquire(
        releases,
        Resource::Device,
        || unsafe { instance.create_device(selected.physical, &create_info, None) },
        |device: ash::Device| unsafe { device.destroy_device(None) },
    )
}

/// The negotiator needs non-empty lists; a surface that lost them after
/// selection fails the build instead.
fn negotiate_fresh(
    support: &SwapchainSupport,
    framebuffer: RenderSize,
    families: QueueFamilies,
) -> Result<SwapchainConfig, ContextError> {
    if !support.is_adequate() {
        return Err(ContextError::SwapchainUnsupported {
            formats: support.formats.len(),
            present_modes: support.present_modes.len(),
        });
    }
    Ok(negotiate(support, framebuffer, families))
}

unsafe fn create_swapchain(
    loader: &swapchain::Device,
    surface: vk::SurfaceKHR,
    config: &SwapchainConfig,
    releases: &mut ReleaseStack,
) -> Result<vk::SwapchainKHR, ContextError> {
    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(config.image_count)
        .image_format(config.format)
        .image_color_space(config.color_space)
        .image_extent(config.extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(config.sharing.mode())
        .queue_family_indices(config.sharing.family_indices())
        .pre_transform(config.pre_transform)
        .composite_alpha(config.composite_alpha)
        .present_mode(config.present_mode)
        .clipped(true);

    let destroyer = loader.clone();
    acquire(
        releases,
        Resource::Swapchain,
        || unsafe { loader.create_swapchain(&create_info, None) },
        move |swapchain| unsafe { destroyer.destroy_swapchain(swapchain, None) },
    )
}

impl RenderingContext {
    /// Select a GPU for `source`'s window and create a device, queues and a
    /// swapchain for it.
    ///
    /// On error every object created so far has already been released.
    pub fn new<S: SurfaceSource + ?Sized>(
        source: &S,
        settings: &ContextSettings,
    ) -> Result<Self, ContextError> {
        let display = source.display_handle()?.as_raw();
        let window = source.window_handle()?.as_raw();
        let mut stage = BuildStage::Uninitialized;

        // SAFETY: the library stays loaded for as long as `entry` lives, and
        // `entry` outlives `releases` here and in the finished context.
        let entry = unsafe { Entry::load() }?;
        let mut releases = ReleaseStack::default();

        // SAFETY (through the end of this function): each call below uses only
        // handles created earlier from `entry` and still registered in
        // `releases`.
        let instance = unsafe { create_instance(&entry, display, settings, &mut releases) }?;
        let debug_messenger = if settings.validation {
            Some(unsafe { create_debug_messenger(&entry, &instance, &mut releases) }?)
        } else {
            None
        };
        stage.advance(BuildStage::InstanceCreated);

        let surface_loader = surface::Instance::new(&entry, &instance);
        let surface = {
            let destroyer = surface_loader.clone();
            acquire(
                &mut releases,
                Resource::Surface,
                || unsafe { ash_window::create_surface(&entry, &instance, display, window, None) },
                move |surface| unsafe { destroyer.destroy_surface(surface, None) },
            )?
        };
        stage.advance(BuildStage::SurfaceCreated);

        let required = settings.required_device_extensions();
        let candidates = unsafe { instance.enumerate_physical_devices() }
            .map_err(ContextError::query("enumerating physical devices"))?;
        info!("{} physical device(s) enumerated", candidates.len());
        let probe = unsafe { AshProbe::new(&instance, &surface_loader, surface) };
        let selected = pick_physical_device(&probe, &candidates, &required)?;
        stage.advance(BuildStage::DeviceSelected);

        let device = unsafe {
            create_logical_device(&instance, &probe, &selected, &required, &mut releases)
        }?;
        let QueueFamilies { graphics, present } = selected.families;
        let graphics_queue = unsafe { device.get_device_queue(graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(present, 0) };
        stage.advance(BuildStage::LogicalDeviceCreated);

        // Capabilities may have changed since selection; negotiate against a fresh snapshot.
        let support = query_swapchain_support(&probe, selected.physical);
        let config = negotiate_fresh(&support, source.framebuffer_size(), selected.families)?;
        let swapchain_loader = swapchain::Device::new(&instance, &device);
        let swapchain =
            unsafe { create_swapchain(&swapchain_loader, surface, &config, &mut releases) }?;
        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(ContextError::query("fetching swapchain images"))?;
        stage.advance(BuildStage::SwapchainCreated);

        info!(
            "swapchain ready on {:?}: {}x{} {:?}/{:?}, {:?}, {} images ({:?})",
            selected.name,
            config.extent.width,
            config.extent.height,
            config.format,
            config.color_space,
            config.present_mode,
            images.len(),
            config.sharing,
        );
        stage.advance(BuildStage::Ready);

        Ok(Self {
            releases,
            images,
            config,
            swapchain,
            swapchain_loader,
            graphics_queue,
            present_queue,
            device,
            selected,
            surface,
            surface_loader,
            debug_messenger,
            instance,
            stage,
            entry,
        })
    }

    /// Destroy every owned object, newest first. Later calls do nothing.
    ///
    /// Handles returned by the accessors are dangling afterwards.
    pub fn teardown(&mut self) {
        if self.releases.is_empty() {
            return;
        }
        if self.releases.held().any(|r| r == Resource::Device) {
            // SAFETY: the device has not been released yet.
            unsafe { self.device.device_wait_idle() }.ok();
        }
        self.images.clear();
        self.releases.release_all();
        info!("rendering context torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn validation_enabled(&self) -> bool {
        self.debug_messenger.is_some()
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub fn surface_loader(&self) -> &surface::Instance {
        &self.surface_loader
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.selected.physical
    }

    pub fn device_name(&self) -> &str {
        &self.selected.name
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.selected.families
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn swapchain_loader(&self) -> &swapchain::Device {
        &self.swapchain_loader
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }
}

impl Drop for RenderingContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevice, FakeProbe};

    #[test]
    fn stages_form_a_single_chain() {
        let mut stage = BuildStage::Uninitialized;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage.advance(next);
            seen.push(stage);
        }
        assert_eq!(stage, BuildStage::Ready);
        assert_eq!(seen.len(), 7);
    }

    #[test]
    #[should_panic(expected = "must not be skipped")]
    #[cfg(debug_assertions)]
    fn skipping_a_stage_is_caught() {
        let mut stage = BuildStage::InstanceCreated;
        stage.advance(BuildStage::DeviceSelected);
    }

    #[test]
    fn swapchain_extension_is_always_required() {
        let settings = ContextSettings {
            device_extensions: vec![c"VK_KHR_maintenance1".to_owned()],
            ..ContextSettings::default()
        };
        assert_eq!(
            settings.required_device_extensions(),
            vec![c"VK_KHR_maintenance1", swapchain::NAME]
        );
        assert_eq!(
            ContextSettings::default().required_device_extensions(),
            vec![swapchain::NAME]
        );
    }

    #[test]
    fn emptied_snapshot_after_selection_is_an_error() {
        let settings = ContextSettings::default();
        let required = settings.required_device_extensions();
        let probe = FakeProbe::new(vec![FakeDevice::suitable("gpu")]);
        let selected = pick_physical_device(&probe, &probe.handles(), &required).unwrap();

        let mut lost = FakeDevice::suitable("gpu");
        lost.formats.clear();
        let fresh = FakeProbe::new(vec![lost]);
        let support = query_swapchain_support(&fresh, selected.physical);

        let framebuffer = RenderSize {
            width: 800,
            height: 600,
        };
        match negotiate_fresh(&support, framebuffer, selected.families) {
            Err(ContextError::SwapchainUnsupported {
                formats: 0,
                present_modes: 1,
            }) => {}
            other => panic!("expected SwapchainUnsupported, got {other:?}"),
        }

        let support = query_swapchain_support(&probe, selected.physical);
        let config = negotiate_fresh(&support, framebuffer, selected.families).unwrap();
        assert_eq!(config.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn validation_layers_follow_the_flag() {
        assert!(layer_names(false).is_empty());
        assert_eq!(layer_names(true).len(), 1);
    }
}
