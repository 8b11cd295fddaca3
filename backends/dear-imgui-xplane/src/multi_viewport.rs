//! Multi-viewport support: one native X-Plane window per Dear ImGui viewport
//!
//! [`MultiViewport`] owns a single Dear ImGui context whose main viewport
//! covers the whole simulator screen but has no native window of its own.
//! Every Dear ImGui window becomes a secondary viewport (auto-merge is off)
//! and is backed by a self-decorated X-Plane window created through the
//! platform callbacks installed here.
//!
//! The frame is built in a flight loop; each native window's draw callback
//! then renders the draw data of its viewport.

use std::ffi::{CStr, c_char, c_void};
use std::ptr::NonNull;
use std::rc::Rc;

use dear_imgui_rs::internal::RawCast;
use dear_imgui_rs::render::DrawData;
use dear_imgui_rs::{BackendFlags, ConfigFlags, Context, SuspendedContext, Ui, sys};

use crate::error::{InitError, InitResult};
use crate::geometry::WindowGeometry;
use crate::host::{
    CreateWindowParams, CursorStatus, Decoration, FlightLoopHandler, FlightLoopId, Host, Layer,
    MouseStatus, WindowEvents, WindowId,
};
use crate::input::{KeyFlags, forward_key, forward_mouse_button, forward_wheel};
use crate::renderer::{FrameRenderer, RenderTarget};

const LOG_TARGET: &str = "dear-imgui-xplane::viewport";

const MIN_DELTA_TIME: f32 = 1.0e-4;

/// What a [`MultiViewport`] shows
pub trait ViewportDelegate {
    /// Adjust the freshly created context (fonts, style, flags).
    fn configure_context(&mut self, _imgui_context: &mut Context) {}

    /// Build the frame. Each Dear ImGui window opened here gets its own
    /// native window.
    fn build(&mut self, ui: &Ui);
}

/// Work a viewport window hands back to the [`MultiViewport`] that owns it
trait ViewportOwner {
    fn render_viewport(&mut self, viewport: *mut sys::ImGuiViewport, window: WindowId);
    fn mouse_button(&mut self, x: i32, y: i32, status: MouseStatus, button: usize);
    fn key(&mut self, key: u8, flags: KeyFlags, virtual_key: u8, losing_focus: bool);
    fn mouse_wheel(&mut self, x: i32, y: i32, wheel: i32, clicks: i32);
}

/// Reached from the platform callbacks through `BackendPlatformUserData`
struct PlatformBackend {
    host: Rc<dyn Host>,
    layer: Layer,
    owner: NonNull<dyn ViewportOwner>,
}

/// Stored in `PlatformUserData` of every secondary viewport
struct ViewportWindow {
    viewport: *mut sys::ImGuiViewport,
    window: Option<WindowId>,
    owner: NonNull<dyn ViewportOwner>,
}

impl WindowEvents for ViewportWindow {
    fn draw(&mut self) {
        if let Some(window) = self.window {
            // SAFETY: the owner outlives every viewport window.
            unsafe { self.owner.as_mut().render_viewport(self.viewport, window) };
        }
    }

    fn mouse_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool {
        unsafe { self.owner.as_mut().mouse_button(x, y, status, 0) };
        true
    }

    fn right_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool {
        unsafe { self.owner.as_mut().mouse_button(x, y, status, 1) };
        true
    }

    fn key(&mut self, key: u8, flags: KeyFlags, virtual_key: u8, losing_focus: bool) {
        unsafe { self.owner.as_mut().key(key, flags, virtual_key, losing_focus) };
    }

    fn cursor(&mut self, _x: i32, _y: i32) -> CursorStatus {
        CursorStatus::Default
    }

    fn mouse_wheel(&mut self, x: i32, y: i32, wheel: i32, clicks: i32) -> bool {
        unsafe { self.owner.as_mut().mouse_wheel(x, y, wheel, clicks) };
        true
    }
}

/// A Dear ImGui context spread over as many native windows as it has viewports
pub struct MultiViewport<D: ViewportDelegate + 'static> {
    host: Rc<dyn Host>,
    renderer: Box<dyn FrameRenderer>,
    delegate: D,
    context: Option<SuspendedContext>,
    platform: Option<Box<PlatformBackend>>,
    flight_loop: Option<FlightLoopId>,
    screen: WindowGeometry,
}

impl<D: ViewportDelegate + 'static> MultiViewport<D> {
    /// Creates the context and installs the platform callbacks. Viewport
    /// windows are created on `layer`.
    pub fn new(
        host: Rc<dyn Host>,
        renderer: Box<dyn FrameRenderer>,
        delegate: D,
        layer: Layer,
    ) -> InitResult<Box<Self>> {
        let context =
            SuspendedContext::try_create().map_err(|e| InitError::Context(e.to_string()))?;
        let screen = host.screen_bounds_global();
        let mut this = Box::new(Self {
            host,
            renderer,
            delegate,
            context: Some(context),
            platform: None,
            flight_loop: None,
            screen,
        });

        let owner = NonNull::from(&mut *this as &mut dyn ViewportOwner);
        this.platform = Some(Box::new(PlatformBackend {
            host: this.host.clone(),
            layer,
            owner,
        }));

        let configured = this.with_context(|this, ctx| this.configure_context(ctx));
        match configured {
            Some(result) => result?,
            None => {
                return Err(InitError::Context(
                    "another Dear ImGui context is current".to_string(),
                ));
            }
        }

        let handler = NonNull::from(&mut *this as &mut dyn FlightLoopHandler);
        // SAFETY: the box never moves and the flight loop is destroyed on drop.
        let flight_loop = unsafe { this.host.create_flight_loop(handler) }
            .ok_or(InitError::CreateFlightLoop)?;
        this.flight_loop = Some(flight_loop);

        log::debug!(target: LOG_TARGET, "multi-viewport context ready on {layer:?}");
        Ok(this)
    }

    fn configure_context(&mut self, ctx: &mut Context) -> InitResult<()> {
        let ctx_err = |e: dear_imgui_rs::ImGuiError| InitError::Context(e.to_string());
        ctx.set_ini_filename(None::<std::path::PathBuf>)
            .map_err(ctx_err)?;
        ctx.set_platform_name(Some(format!(
            "dear-imgui-xplane-viewports {}",
            env!("CARGO_PKG_VERSION")
        )))
        .map_err(ctx_err)?;

        self.renderer.configure_context(ctx);

        {
            let io = ctx.io_mut();
            let mut config_flags = io.config_flags();
            config_flags.insert(ConfigFlags::VIEWPORTS_ENABLE);
            io.set_config_flags(config_flags);

            let mut backend_flags = io.backend_flags();
            backend_flags.insert(BackendFlags::PLATFORM_HAS_VIEWPORTS);
            backend_flags.insert(BackendFlags::RENDERER_HAS_VIEWPORTS);
            io.set_backend_flags(backend_flags);
        }

        #[cfg(feature = "clipboard")]
        ctx.set_clipboard_backend(crate::clipboard::SystemClipboard::new());

        unsafe {
            let io = sys::igGetIO_Nil();
            if !io.is_null() {
                (*io).ConfigViewportsNoAutoMerge = true;
                (*io).ConfigMacOSXBehaviors = false;
                if let Some(platform) = self.platform.as_deref() {
                    (*io).BackendPlatformUserData =
                        platform as *const PlatformBackend as *mut c_void;
                }
            }
            let style = sys::igGetStyle();
            if !style.is_null() {
                (*style).WindowRounding = 0.0;
            }
            install_platform_callbacks();
            update_monitors(&self.screen);

            let main_viewport = sys::igGetMainViewport();
            if !main_viewport.is_null() {
                // No native window, but Dear ImGui wants a handle.
                (*main_viewport).PlatformHandle = self as *mut Self as *mut c_void;
            }
        }

        self.delegate.configure_context(ctx);
        Ok(())
    }

    fn with_context<R>(&mut self, f: impl FnOnce(&mut Self, &mut Context) -> R) -> Option<R> {
        let suspended = self.context.take()?;
        let mut ctx = match suspended.activate() {
            Ok(ctx) => ctx,
            Err(suspended) => {
                log::warn!(
                    target: LOG_TARGET,
                    "cannot activate context while another is current"
                );
                self.context = Some(suspended);
                return None;
            }
        };
        let result = f(self, &mut ctx);
        self.context = Some(ctx.suspend());
        Some(result)
    }

    /// Builds the next frame in the next flight loop.
    pub fn draw(&mut self) {
        if let Some(flight_loop) = self.flight_loop {
            self.host.schedule_flight_loop(flight_loop, -1.0, true);
        }
    }

    /// The delegate passed at creation
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Native windows currently backing secondary viewports
    pub fn viewport_windows(&mut self) -> Vec<WindowId> {
        self.with_context(|_, _| unsafe { viewport_windows() })
            .unwrap_or_default()
    }

    fn run_frame(&mut self, ctx: &mut Context, since_last_call: f32) {
        let screen = self.host.screen_bounds_global();
        if screen != self.screen {
            self.screen = screen;
            unsafe { update_monitors(&screen) };
        }

        {
            let io = ctx.io_mut();
            io.set_display_size([screen.width() as f32, screen.height() as f32]);
            io.set_display_framebuffer_scale([1.0, 1.0]);
            io.set_delta_time(since_last_call.max(MIN_DELTA_TIME));
            let (x, y) = self.host.mouse_location_global();
            io.add_mouse_pos_event(screen.to_imgui(x, y));
        }

        let ui = ctx.frame();
        self.delegate.build(ui);
        ctx.render();
        ctx.update_platform_windows();
    }
}

impl<D: ViewportDelegate + 'static> ViewportOwner for MultiViewport<D> {
    fn render_viewport(&mut self, viewport: *mut sys::ImGuiViewport, window: WindowId) {
        self.with_context(|this, _| {
            // SAFETY: viewports live as long as the context; draw data is
            // refreshed by every `render`.
            let draw_data = unsafe {
                let raw = (*viewport).DrawData;
                if raw.is_null() {
                    return;
                }
                DrawData::from_raw(&*raw)
            };
            if !draw_data.valid() {
                return;
            }
            let target = RenderTarget {
                geometry: this.host.window_geometry(window),
                scene: this.host.scene_matrices(),
            };
            if let Err(err) = this.renderer.render(this.host.as_ref(), &target, draw_data) {
                log::warn!(target: LOG_TARGET, "viewport window {window:?}: render failed: {err}");
            }
        });
    }

    fn mouse_button(&mut self, x: i32, y: i32, status: MouseStatus, button: usize) {
        self.with_context(|this, ctx| {
            let io = ctx.io_mut();
            io.add_mouse_pos_event(this.screen.to_imgui(x, y));
            forward_mouse_button(io, button, status != MouseStatus::Up);
        });
    }

    fn key(&mut self, key: u8, flags: KeyFlags, virtual_key: u8, losing_focus: bool) {
        self.with_context(|_, ctx| {
            if ctx.io().want_capture_keyboard() {
                forward_key(ctx.io_mut(), key, flags, virtual_key);
            }
            if losing_focus {
                unsafe {
                    sys::igClearActiveID();
                    sys::igSetNextFrameWantCaptureKeyboard(false);
                }
            }
        });
    }

    fn mouse_wheel(&mut self, x: i32, y: i32, wheel: i32, clicks: i32) {
        self.with_context(|this, ctx| {
            let io = ctx.io_mut();
            io.add_mouse_pos_event(this.screen.to_imgui(x, y));
            forward_wheel(io, wheel, clicks);
        });
    }
}

impl<D: ViewportDelegate + 'static> FlightLoopHandler for MultiViewport<D> {
    fn flight_loop(&mut self, since_last_call: f32, _since_last_loop: f32, _counter: i32) -> f32 {
        self.with_context(|this, ctx| this.run_frame(ctx, since_last_call));
        -1.0
    }
}

impl<D: ViewportDelegate + 'static> Drop for MultiViewport<D> {
    fn drop(&mut self) {
        if let Some(flight_loop) = self.flight_loop.take() {
            self.host.destroy_flight_loop(flight_loop);
        }
        self.with_context(|_, ctx| {
            ctx.destroy_platform_windows();
            unsafe {
                let io = sys::igGetIO_Nil();
                if !io.is_null() {
                    (*io).BackendPlatformUserData = std::ptr::null_mut();
                }
                let main_viewport = sys::igGetMainViewport();
                if !main_viewport.is_null() {
                    (*main_viewport).PlatformHandle = std::ptr::null_mut();
                }
            }
        });
        self.renderer.destroy(self.host.as_ref());
        self.context = None;
        self.platform = None;
        log::debug!(target: LOG_TARGET, "multi-viewport context destroyed");
    }
}

/// Native geometry of a viewport at `pos` with `size`, both in screen-space
/// Dear ImGui coordinates (origin at the top left of the screen bounds).
fn viewport_geometry(screen: &WindowGeometry, pos: [f32; 2], size: [f32; 2]) -> WindowGeometry {
    let left = screen.left + pos[0].round() as i32;
    let top = screen.top - pos[1].round() as i32;
    WindowGeometry::new(
        left,
        top,
        left + size[0].round() as i32,
        top - size[1].round() as i32,
    )
}

fn viewport_position(screen: &WindowGeometry, geometry: &WindowGeometry) -> [f32; 2] {
    [
        (geometry.left - screen.left) as f32,
        (screen.top - geometry.top) as f32,
    ]
}

unsafe fn install_platform_callbacks() {
    unsafe {
        let pio = sys::igGetPlatformIO_Nil();
        if pio.is_null() {
            return;
        }
        (*pio).Platform_CreateWindow = Some(platform_create_window);
        (*pio).Platform_DestroyWindow = Some(platform_destroy_window);
        (*pio).Platform_ShowWindow = Some(platform_show_window);
        (*pio).Platform_SetWindowPos = Some(platform_set_window_pos);
        (*pio).Platform_GetWindowPos = Some(platform_get_window_pos);
        (*pio).Platform_SetWindowSize = Some(platform_set_window_size);
        (*pio).Platform_GetWindowSize = Some(platform_get_window_size);
        (*pio).Platform_SetWindowTitle = Some(platform_set_window_title);
        (*pio).Platform_SetWindowFocus = Some(platform_set_window_focus);
        (*pio).Platform_GetWindowFocus = Some(platform_get_window_focus);
        (*pio).Platform_GetWindowMinimized = Some(platform_get_window_minimized);
    }
}

/// Publishes the screen bounds as the only monitor.
unsafe fn update_monitors(screen: &WindowGeometry) {
    unsafe {
        let pio = sys::igGetPlatformIO_Nil();
        if pio.is_null() {
            return;
        }
        let mut monitor = sys::ImGuiPlatformMonitor::default();
        monitor.MainPos = sys::ImVec2 { x: 0.0, y: 0.0 };
        monitor.MainSize = sys::ImVec2 {
            x: screen.width() as f32,
            y: screen.height() as f32,
        };
        monitor.WorkPos = monitor.MainPos;
        monitor.WorkSize = monitor.MainSize;
        monitor.DpiScale = 1.0;
        monitor.PlatformHandle = std::ptr::null_mut();

        let vec = &mut (*pio).Monitors;
        if vec.Data.is_null() || vec.Capacity < 1 {
            if !vec.Data.is_null() {
                sys::igMemFree(vec.Data as *mut c_void);
            }
            let data = sys::igMemAlloc(std::mem::size_of::<sys::ImGuiPlatformMonitor>())
                as *mut sys::ImGuiPlatformMonitor;
            if data.is_null() {
                vec.Data = std::ptr::null_mut();
                vec.Size = 0;
                vec.Capacity = 0;
                return;
            }
            vec.Data = data;
            vec.Capacity = 1;
        }
        *vec.Data = monitor;
        vec.Size = 1;
    }
}

unsafe fn backend<'a>() -> Option<&'a PlatformBackend> {
    unsafe {
        let io = sys::igGetIO_Nil();
        if io.is_null() {
            return None;
        }
        ((*io).BackendPlatformUserData as *const PlatformBackend).as_ref()
    }
}

unsafe fn viewport_window<'a>(vp: *mut sys::ImGuiViewport) -> Option<&'a mut ViewportWindow> {
    unsafe {
        if vp.is_null() {
            return None;
        }
        ((*vp).PlatformUserData as *mut ViewportWindow).as_mut()
    }
}

unsafe fn native_window(vp: *mut sys::ImGuiViewport) -> Option<(&'static PlatformBackend, WindowId)> {
    unsafe {
        let backend = backend()?;
        let window = viewport_window(vp)?.window?;
        Some((backend, window))
    }
}

unsafe fn viewport_windows() -> Vec<WindowId> {
    unsafe {
        let pio = sys::igGetPlatformIO_Nil();
        if pio.is_null() {
            return Vec::new();
        }
        let viewports = &(*pio).Viewports;
        if viewports.Data.is_null() || viewports.Size <= 0 {
            return Vec::new();
        }
        (0..viewports.Size as usize)
            .filter_map(|i| viewport_window(*viewports.Data.add(i))?.window)
            .collect()
    }
}

unsafe extern "C" fn platform_create_window(vp: *mut sys::ImGuiViewport) {
    unsafe {
        let Some(backend) = backend() else {
            return;
        };
        if vp.is_null() {
            return;
        }
        let screen = backend.host.screen_bounds_global();
        let geometry = viewport_geometry(
            &screen,
            [(*vp).Pos.x, (*vp).Pos.y],
            [(*vp).Size.x, (*vp).Size.y],
        );
        let mut data = Box::new(ViewportWindow {
            viewport: vp,
            window: None,
            owner: backend.owner,
        });
        let params = CreateWindowParams {
            geometry,
            visible: false,
            decoration: Decoration::SelfDecorated,
            layer: backend.layer,
        };
        let events = NonNull::from(&mut *data as &mut dyn WindowEvents);
        match backend.host.create_window(&params, events) {
            Some(window) => {
                data.window = Some(window);
                (*vp).PlatformHandle = window.0 as *mut c_void;
                (*vp).PlatformUserData = Box::into_raw(data) as *mut c_void;
                log::debug!(
                    target: LOG_TARGET,
                    "viewport {:#x}: created window {window:?} at {geometry:?}",
                    (*vp).ID
                );
            }
            None => log::warn!(
                target: LOG_TARGET,
                "viewport {:#x}: native window creation failed",
                (*vp).ID
            ),
        }
    }
}

unsafe extern "C" fn platform_destroy_window(vp: *mut sys::ImGuiViewport) {
    unsafe {
        if vp.is_null() {
            return;
        }
        let data = (*vp).PlatformUserData as *mut ViewportWindow;
        if !data.is_null() {
            let data = Box::from_raw(data);
            if let (Some(backend), Some(window)) = (backend(), data.window) {
                backend.host.destroy_window(window);
                log::debug!(target: LOG_TARGET, "destroyed viewport window {window:?}");
            }
        }
        (*vp).PlatformUserData = std::ptr::null_mut();
        (*vp).PlatformHandle = std::ptr::null_mut();
    }
}

unsafe extern "C" fn platform_show_window(vp: *mut sys::ImGuiViewport) {
    unsafe {
        if let Some((backend, window)) = native_window(vp) {
            backend.host.set_window_visible(window, true);
        }
    }
}

unsafe extern "C" fn platform_set_window_pos(vp: *mut sys::ImGuiViewport, pos: sys::ImVec2) {
    unsafe {
        if let Some((backend, window)) = native_window(vp) {
            let screen = backend.host.screen_bounds_global();
            let mut geometry = backend.host.window_geometry(window);
            geometry.place(
                screen.left + pos.x.round() as i32,
                screen.top - pos.y.round() as i32,
                crate::geometry::Anchor::TopLeft,
            );
            backend.host.set_window_geometry(window, geometry);
        }
    }
}

unsafe extern "C" fn platform_get_window_pos(vp: *mut sys::ImGuiViewport) -> sys::ImVec2 {
    unsafe {
        match native_window(vp) {
            Some((backend, window)) => {
                let screen = backend.host.screen_bounds_global();
                let [x, y] = viewport_position(&screen, &backend.host.window_geometry(window));
                sys::ImVec2 { x, y }
            }
            // The main viewport sits at the screen origin
            None => sys::ImVec2 { x: 0.0, y: 0.0 },
        }
    }
}

unsafe extern "C" fn platform_set_window_size(vp: *mut sys::ImGuiViewport, size: sys::ImVec2) {
    unsafe {
        if let Some((backend, window)) = native_window(vp) {
            let mut geometry = backend.host.window_geometry(window);
            geometry.resize(
                size.x.round() as i32,
                size.y.round() as i32,
                crate::geometry::Anchor::TopLeft,
            );
            backend.host.set_window_geometry(window, geometry);
        }
    }
}

unsafe extern "C" fn platform_get_window_size(vp: *mut sys::ImGuiViewport) -> sys::ImVec2 {
    unsafe {
        match native_window(vp) {
            Some((backend, window)) => {
                let geometry = backend.host.window_geometry(window);
                sys::ImVec2 {
                    x: geometry.width() as f32,
                    y: geometry.height() as f32,
                }
            }
            None => {
                let io = sys::igGetIO_Nil();
                if io.is_null() {
                    sys::ImVec2 { x: 0.0, y: 0.0 }
                } else {
                    (*io).DisplaySize
                }
            }
        }
    }
}

unsafe extern "C" fn platform_set_window_title(vp: *mut sys::ImGuiViewport, title: *const c_char) {
    unsafe {
        if title.is_null() {
            return;
        }
        if let Some((backend, window)) = native_window(vp) {
            let title = CStr::from_ptr(title).to_string_lossy();
            backend.host.set_window_title(window, &title);
        }
    }
}

unsafe extern "C" fn platform_set_window_focus(vp: *mut sys::ImGuiViewport) {
    unsafe {
        if let Some((backend, window)) = native_window(vp) {
            backend.host.take_keyboard_focus(Some(window));
        }
    }
}

unsafe extern "C" fn platform_get_window_focus(vp: *mut sys::ImGuiViewport) -> bool {
    unsafe {
        native_window(vp).is_some_and(|(backend, window)| backend.host.has_keyboard_focus(window))
    }
}

unsafe extern "C" fn platform_get_window_minimized(_vp: *mut sys::ImGuiViewport) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{MockHost, RecordingRenderer, RenderLog, SCREEN, lock_context};
    use dear_imgui_rs::Condition;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    struct Palette;

    impl ViewportDelegate for Palette {
        fn build(&mut self, ui: &Ui) {
            ui.window("Tools")
                .position([100.0, 50.0], Condition::Always)
                .size([200.0, 120.0], Condition::Always)
                .build(|| ui.text("palette"));
        }
    }

    fn setup() -> (Rc<MockHost>, Rc<RefCell<RenderLog>>, Box<MultiViewport<Palette>>) {
        let host = MockHost::new();
        let (renderer, log) = RecordingRenderer::new();
        let viewports =
            MultiViewport::new(host.clone(), Box::new(renderer), Palette, Layer::Modal).unwrap();
        (host, log, viewports)
    }

    #[test]
    fn maps_viewports_to_screen_boxels() {
        let geometry = viewport_geometry(&SCREEN, [100.0, 50.0], [200.0, 120.0]);
        assert_eq!(geometry, WindowGeometry::new(100, 1030, 300, 910));
        assert_eq!(viewport_position(&SCREEN, &geometry), [100.0, 50.0]);

        let offset = WindowGeometry::new(-1920, 1080, 1920, 0);
        let geometry = viewport_geometry(&offset, [0.0, 0.0], [10.0, 10.0]);
        assert_eq!(geometry, WindowGeometry::new(-1920, 1080, -1910, 1070));
    }

    #[test]
    fn draw_schedules_the_next_frame() {
        let _guard = lock_context();
        let (host, _log, mut viewports) = setup();
        let schedule = |host: &MockHost| {
            host.state
                .borrow()
                .flight_loops
                .values()
                .next()
                .and_then(|fl| fl.schedule)
        };
        assert_eq!(schedule(&host), None);
        viewports.draw();
        assert_eq!(schedule(&host), Some((-1.0, true)));
    }

    #[test]
    fn windows_get_native_viewports() {
        let _guard = lock_context();
        let (host, log, mut viewports) = setup();
        viewports.draw();
        host.run_flight_loops();
        host.run_flight_loops();

        let windows = viewports.viewport_windows();
        assert_eq!(windows.len(), 1);
        let native = host.window(windows[0]);
        assert_eq!(native.params.decoration, Decoration::SelfDecorated);
        assert_eq!(native.params.layer, Layer::Modal);
        assert_eq!(native.geometry, WindowGeometry::new(100, 1030, 300, 910));
        assert!(native.visible);

        host.draw(windows[0]);
        let log = log.borrow();
        let frame = log.frames.last().unwrap();
        assert_eq!(frame.geometry, native.geometry);
        assert_eq!(frame.display_pos, [100.0, 50.0]);
        assert_eq!(frame.display_size, [200.0, 120.0]);
    }

    #[test]
    fn viewport_windows_consume_input() {
        let _guard = lock_context();
        let (host, _log, mut viewports) = setup();
        viewports.draw();
        host.run_flight_loops();
        host.run_flight_loops();
        let window = viewports.viewport_windows()[0];

        assert!(host.click(window, 150, 1000, MouseStatus::Down));
        assert!(host.click(window, 150, 1000, MouseStatus::Up));
        assert!(host.wheel(window, 150, 1000, 0, 1));
        assert_eq!(host.cursor(window, 150, 1000), Some(CursorStatus::Default));
    }

    #[test]
    fn drop_destroys_viewport_windows() {
        let _guard = lock_context();
        let (host, log, mut viewports) = setup();
        viewports.draw();
        host.run_flight_loops();
        host.run_flight_loops();
        let windows = viewports.viewport_windows();
        drop(viewports);

        let state = host.state.borrow();
        assert_eq!(state.destroyed_windows, windows);
        assert!(state.windows.is_empty());
        assert!(state.flight_loops.is_empty());
        assert!(log.borrow().destroyed);
    }
}
