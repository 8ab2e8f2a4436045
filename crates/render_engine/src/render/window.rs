//! Window and presentation surface management using GLFW
//!
//! Provides cross-platform window creation and event handling for Vulkan.
//! The window owns the GLFW handles; the [`Surface`] owns the Vulkan surface
//! created against it. Keeping surface ownership here (rather than inside the
//! swapchain) means swapchain recreation never has to special-case "destroy
//! everything except the surface": the swapchain simply does not own it.

use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW library initialization failed
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// Window creation failed
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW-reported error
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a window configured for Vulkan rendering
    pub fn new(title: &str, width: u32, height: u32, resizable: bool) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(resizable));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Whether the user has requested the window to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Mark the window as closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Process pending platform events without blocking
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain buffered window events
    pub fn flush_events(&self) -> glfw::FlushedMessages<(f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width as u32, height as u32)
    }

    /// Block until the framebuffer reports a nonzero area
    ///
    /// A minimized window reports a zero-area framebuffer; rendering against
    /// a zero-sized target is pointless and swapchain creation would fail, so
    /// the render loop parks here on platform events until the window is
    /// restored. Returns the first nonzero size observed.
    pub fn wait_for_valid_framebuffer(&mut self) -> (u32, u32) {
        let initial = self.framebuffer_size();
        let glfw = &mut self.glfw;
        let window = &self.window;
        crate::render::frame::wait_for_nonzero_extent(initial, || {
            glfw.wait_events();
            let (width, height) = window.get_framebuffer_size();
            (width as u32, height as u32)
        })
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create a Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(
        &mut self,
        instance: ash::vk::Instance,
    ) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!(
                "Failed to create Vulkan surface: {:?}",
                result
            )))
        }
    }
}

/// Owned Vulkan presentation surface
///
/// Created once after the instance exists and destroyed exactly once at final
/// teardown, after every swapchain that referenced it. Swapchains borrow the
/// surface; they never own or destroy it.
pub struct Surface {
    loader: ash::extensions::khr::Surface,
    surface: ash::vk::SurfaceKHR,
}

impl Surface {
    /// Create the surface for a window
    pub fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &mut Window,
    ) -> WindowResult<Self> {
        let loader = ash::extensions::khr::Surface::new(entry, instance);
        let surface = window.create_vulkan_surface(instance.handle())?;
        Ok(Self { loader, surface })
    }

    /// Get the surface handle
    pub fn handle(&self) -> ash::vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface extension loader
    pub fn loader(&self) -> &ash::extensions::khr::Surface {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}
