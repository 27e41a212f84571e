//! Exposes all structs needed to store initialization parameters.

use ash::vk;

use crate::wsi::window::Window;

/// Extra data that is stored within the [`AppSettings`] whenever we want to enable
/// renderable surfaces.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct SurfaceSettings<'a> {
    /// Optionally a preferred surface format. If set to None, a fallback surface format
    /// will be chosen. This format is `{BGRA8_SRGB, NONLINEAR_SRGB}` if it is available.
    /// Otherwise, the format is implementation-defined.
    pub surface_format: Option<vk::SurfaceFormatKHR>,
    /// Optionally a preferred present mode. If set to None, `MAILBOX` is used when
    /// available, falling back to `FIFO` which the spec guarantees to be supported.
    pub present_mode: Option<vk::PresentModeKHR>,
    /// The window that we will use for rendering. Do note that this doesn't necessarily
    /// need to be a winit window.
    #[derivative(Debug = "ignore")]
    pub window: &'a dyn Window,
}

/// Application settings used to initialize the library.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AppSettings<'a> {
    /// Application name. Possibly displayed in debugging tools, task manager, etc.
    pub name: String,
    /// Application version.
    pub version: (u32, u32, u32),
    /// Enable Vulkan validation layers for additional debug output.
    pub enable_validation: bool,
    /// Surface and window settings. `None` for a headless context.
    pub surface_settings: Option<SurfaceSettings<'a>>,
    /// The number of frames the CPU is allowed to record ahead of the GPU.
    /// Bounded by the in-flight fences in [`FrameManager`](crate::FrameManager).
    pub frames_in_flight: usize,
}

impl Default for AppSettings<'_> {
    fn default() -> Self {
        AppSettings {
            name: String::from(""),
            version: (0, 0, 0),
            enable_validation: false,
            surface_settings: None,
            frames_in_flight: 2,
        }
    }
}

/// Builder structure for [`AppSettings`].
pub struct AppBuilder<'a> {
    inner: AppSettings<'a>,
}

impl<'a> AppBuilder<'a> {
    /// Create a new app builder with default settings.
    pub fn new() -> Self {
        AppBuilder {
            inner: AppSettings::default(),
        }
    }

    /// Application name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Application version as (major, minor, patch).
    pub fn version(mut self, version: (u32, u32, u32)) -> Self {
        self.inner.version = version;
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enabled: bool) -> Self {
        self.inner.enable_validation = enabled;
        self
    }

    /// The window to render to. Without this the context is headless.
    pub fn window(mut self, window: &'a dyn Window) -> Self {
        let settings = self.inner.surface_settings.get_or_insert(SurfaceSettings {
            surface_format: None,
            present_mode: None,
            window,
        });
        settings.window = window;
        self
    }

    /// Preferred surface format. Requires a window.
    pub fn surface_format(mut self, format: vk::SurfaceFormatKHR) -> Self {
        if let Some(settings) = self.inner.surface_settings.as_mut() {
            settings.surface_format = Some(format);
        }
        self
    }

    /// Preferred present mode. Requires a window.
    pub fn present_mode(mut self, mode: vk::PresentModeKHR) -> Self {
        if let Some(settings) = self.inner.surface_settings.as_mut() {
            settings.present_mode = Some(mode);
        }
        self
    }

    /// Number of frames in flight. Values above 3 rarely help and only add latency.
    pub fn frames_in_flight(mut self, frames: usize) -> Self {
        self.inner.frames_in_flight = frames.max(1);
        self
    }

    /// Build the final [`AppSettings`].
    pub fn build(self) -> AppSettings<'a> {
        self.inner
    }
}

impl Default for AppBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_in_flight_is_at_least_one() {
        let settings = AppBuilder::new().frames_in_flight(0).build();
        assert_eq!(settings.frames_in_flight, 1);
    }

    #[test]
    fn default_is_headless() {
        let settings = AppBuilder::new().name("test").build();
        assert!(settings.surface_settings.is_none());
        assert_eq!(settings.frames_in_flight, 2);
    }
}
