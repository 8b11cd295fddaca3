//! [`Host`] implementation bound to the X-Plane plugin SDK
//!
//! Only the handful of XPLM 3.0+ entry points the backend needs are declared
//! here. The plugin crate links against the SDK's `XPLM` library (or lets the
//! simulator resolve the symbols at load time on Linux).
//!
//! Callbacks registered with the simulator carry a boxed fat pointer to the
//! Rust event sink as their refcon. Every trampoline catches panics, since
//! unwinding into the simulator is undefined behaviour.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CString, c_char, c_int, c_void};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;
use std::rc::Rc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::error::{InitError, InitResult};
use crate::geometry::WindowGeometry;
use crate::host::{
    CreateWindowParams, CursorStatus, FlightLoopHandler, FlightLoopId, GraphicsState, Gravity,
    Host, MouseStatus, PositioningMode, ResizingLimits, WindowEvents, WindowId,
};
use crate::input::KeyFlags;
use crate::scene::{IDENTITY, SceneMatrices};

const LOG_TARGET: &str = "dear-imgui-xplane::xplm";

pub type XPLMWindowID = *mut c_void;
pub type XPLMFlightLoopID = *mut c_void;
pub type XPLMDataRef = *mut c_void;

type DrawWindowFn = unsafe extern "C" fn(XPLMWindowID, *mut c_void);
type MouseClickFn = unsafe extern "C" fn(XPLMWindowID, c_int, c_int, c_int, *mut c_void) -> c_int;
type KeyFn = unsafe extern "C" fn(XPLMWindowID, c_char, c_int, c_char, *mut c_void, c_int);
type CursorFn = unsafe extern "C" fn(XPLMWindowID, c_int, c_int, *mut c_void) -> c_int;
type MouseWheelFn =
    unsafe extern "C" fn(XPLMWindowID, c_int, c_int, c_int, c_int, *mut c_void) -> c_int;
type FlightLoopFn = unsafe extern "C" fn(f32, f32, c_int, *mut c_void) -> f32;

/// `XPLMCreateWindow_t`
#[repr(C)]
struct XPLMCreateWindow {
    struct_size: c_int,
    left: c_int,
    top: c_int,
    right: c_int,
    bottom: c_int,
    visible: c_int,
    draw_window_func: Option<DrawWindowFn>,
    handle_mouse_click_func: Option<MouseClickFn>,
    handle_key_func: Option<KeyFn>,
    handle_cursor_func: Option<CursorFn>,
    handle_mouse_wheel_func: Option<MouseWheelFn>,
    refcon: *mut c_void,
    decorate_as_floating_window: c_int,
    layer: c_int,
    handle_right_click_func: Option<MouseClickFn>,
}

/// `XPLMCreateFlightLoop_t`
#[repr(C)]
struct XPLMCreateFlightLoop {
    struct_size: c_int,
    phase: c_int,
    callback_func: Option<FlightLoopFn>,
    refcon: *mut c_void,
}

const FLIGHT_LOOP_PHASE_AFTER_FLIGHT_MODEL: c_int = 1;

unsafe extern "C" {
    // XPLMDisplay
    fn XPLMCreateWindowEx(params: *mut XPLMCreateWindow) -> XPLMWindowID;
    fn XPLMDestroyWindow(window: XPLMWindowID);
    fn XPLMGetWindowGeometry(
        window: XPLMWindowID,
        left: *mut c_int,
        top: *mut c_int,
        right: *mut c_int,
        bottom: *mut c_int,
    );
    fn XPLMSetWindowGeometry(window: XPLMWindowID, left: c_int, top: c_int, right: c_int, bottom: c_int);
    fn XPLMSetWindowGeometryVR(window: XPLMWindowID, width: c_int, height: c_int);
    fn XPLMGetWindowIsVisible(window: XPLMWindowID) -> c_int;
    fn XPLMSetWindowIsVisible(window: XPLMWindowID, visible: c_int);
    fn XPLMWindowIsPoppedOut(window: XPLMWindowID) -> c_int;
    fn XPLMIsWindowInFront(window: XPLMWindowID) -> c_int;
    fn XPLMSetWindowPositioningMode(window: XPLMWindowID, mode: c_int, monitor: c_int);
    fn XPLMSetWindowGravity(window: XPLMWindowID, left: f32, top: f32, right: f32, bottom: f32);
    fn XPLMSetWindowResizingLimits(
        window: XPLMWindowID,
        min_width: c_int,
        min_height: c_int,
        max_width: c_int,
        max_height: c_int,
    );
    fn XPLMSetWindowTitle(window: XPLMWindowID, title: *const c_char);
    fn XPLMTakeKeyboardFocus(window: XPLMWindowID);
    fn XPLMHasKeyboardFocus(window: XPLMWindowID) -> c_int;
    fn XPLMGetScreenBoundsGlobal(
        left: *mut c_int,
        top: *mut c_int,
        right: *mut c_int,
        bottom: *mut c_int,
    );
    fn XPLMGetMouseLocationGlobal(x: *mut c_int, y: *mut c_int);

    // XPLMGraphics
    fn XPLMSetGraphicsState(
        fog: c_int,
        texture_units: c_int,
        lighting: c_int,
        alpha_testing: c_int,
        alpha_blending: c_int,
        depth_testing: c_int,
        depth_writing: c_int,
    );
    fn XPLMGenerateTextureNumbers(textures: *mut c_int, count: c_int);
    fn XPLMBindTexture2d(texture: c_int, unit: c_int);

    // XPLMDataAccess
    fn XPLMFindDataRef(name: *const c_char) -> XPLMDataRef;
    fn XPLMGetDatai(dataref: XPLMDataRef) -> c_int;
    fn XPLMGetDatavf(dataref: XPLMDataRef, values: *mut f32, offset: c_int, max: c_int) -> c_int;
    fn XPLMGetDatavi(dataref: XPLMDataRef, values: *mut c_int, offset: c_int, max: c_int) -> c_int;

    // XPLMProcessing
    fn XPLMGetElapsedTime() -> f32;
    fn XPLMCreateFlightLoop(params: *mut XPLMCreateFlightLoop) -> XPLMFlightLoopID;
    fn XPLMScheduleFlightLoop(flight_loop: XPLMFlightLoopID, interval: f32, relative_to_now: c_int);
    fn XPLMDestroyFlightLoop(flight_loop: XPLMFlightLoopID);

    // XPLMUtilities
    fn XPLMDebugString(message: *const c_char);
}

type WindowSink = NonNull<dyn WindowEvents>;
type FlightLoopSink = NonNull<dyn FlightLoopHandler>;

struct DataRefs {
    vr_enabled: XPLMDataRef,
    modelview: XPLMDataRef,
    projection: XPLMDataRef,
    viewport: XPLMDataRef,
}

impl DataRefs {
    fn find() -> InitResult<Self> {
        Ok(Self {
            vr_enabled: find_dataref("sim/graphics/VR/enabled")?,
            modelview: find_dataref("sim/graphics/view/modelview_matrix")?,
            projection: find_dataref("sim/graphics/view/projection_matrix")?,
            viewport: find_dataref("sim/graphics/view/viewport")?,
        })
    }
}

fn find_dataref(name: &str) -> InitResult<XPLMDataRef> {
    let c_name = CString::new(name).map_err(|_| InitError::MissingDataRef(name.to_string()))?;
    let dataref = unsafe { XPLMFindDataRef(c_name.as_ptr()) };
    if dataref.is_null() {
        return Err(InitError::MissingDataRef(name.to_string()));
    }
    Ok(dataref)
}

/// The simulator, as seen by the backend
pub struct XplmHost {
    datarefs: DataRefs,
    windows: RefCell<HashMap<WindowId, *mut WindowSink>>,
    flight_loops: RefCell<HashMap<FlightLoopId, *mut FlightLoopSink>>,
}

impl XplmHost {
    /// Looks up the datarefs the backend reads every frame.
    pub fn new() -> InitResult<Rc<Self>> {
        let datarefs = DataRefs::find()?;
        Ok(Rc::new(Self {
            datarefs,
            windows: RefCell::new(HashMap::new()),
            flight_loops: RefCell::new(HashMap::new()),
        }))
    }
}

#[inline]
fn raw_window(window: WindowId) -> XPLMWindowID {
    window.0 as XPLMWindowID
}

#[inline]
fn raw_flight_loop(flight_loop: FlightLoopId) -> XPLMFlightLoopID {
    flight_loop.0 as XPLMFlightLoopID
}

/// Interior NUL bytes cannot cross into C; they are dropped.
fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', "")).unwrap_or_default()
}

impl Host for XplmHost {
    unsafe fn create_window(
        &self,
        params: &CreateWindowParams,
        events: NonNull<dyn WindowEvents>,
    ) -> Option<WindowId> {
        let sink = Box::into_raw(Box::new(events));
        let geometry = params.geometry;
        let mut raw = XPLMCreateWindow {
            struct_size: std::mem::size_of::<XPLMCreateWindow>() as c_int,
            left: geometry.left,
            top: geometry.top,
            right: geometry.right,
            bottom: geometry.bottom,
            visible: params.visible as c_int,
            draw_window_func: Some(draw_window),
            handle_mouse_click_func: Some(mouse_click),
            handle_key_func: Some(key),
            handle_cursor_func: Some(cursor),
            handle_mouse_wheel_func: Some(mouse_wheel),
            refcon: sink as *mut c_void,
            decorate_as_floating_window: params.decoration as c_int,
            layer: params.layer as c_int,
            handle_right_click_func: Some(right_click),
        };
        let window = unsafe { XPLMCreateWindowEx(&mut raw) };
        if window.is_null() {
            drop(unsafe { Box::from_raw(sink) });
            return None;
        }
        let id = WindowId(window as usize);
        self.windows.borrow_mut().insert(id, sink);
        Some(id)
    }

    fn destroy_window(&self, window: WindowId) {
        unsafe { XPLMDestroyWindow(raw_window(window)) };
        if let Some(sink) = self.windows.borrow_mut().remove(&window) {
            drop(unsafe { Box::from_raw(sink) });
        }
    }

    fn window_geometry(&self, window: WindowId) -> WindowGeometry {
        let mut geometry = WindowGeometry::default();
        unsafe {
            XPLMGetWindowGeometry(
                raw_window(window),
                &mut geometry.left,
                &mut geometry.top,
                &mut geometry.right,
                &mut geometry.bottom,
            )
        };
        geometry
    }

    fn set_window_geometry(&self, window: WindowId, geometry: WindowGeometry) {
        unsafe {
            XPLMSetWindowGeometry(
                raw_window(window),
                geometry.left,
                geometry.top,
                geometry.right,
                geometry.bottom,
            )
        };
    }

    fn set_window_geometry_vr(&self, window: WindowId, width: i32, height: i32) {
        unsafe { XPLMSetWindowGeometryVR(raw_window(window), width, height) };
    }

    fn window_is_visible(&self, window: WindowId) -> bool {
        unsafe { XPLMGetWindowIsVisible(raw_window(window)) != 0 }
    }

    fn set_window_visible(&self, window: WindowId, visible: bool) {
        unsafe { XPLMSetWindowIsVisible(raw_window(window), visible as c_int) };
    }

    fn window_is_popped_out(&self, window: WindowId) -> bool {
        unsafe { XPLMWindowIsPoppedOut(raw_window(window)) != 0 }
    }

    fn window_is_in_front(&self, window: WindowId) -> bool {
        unsafe { XPLMIsWindowInFront(raw_window(window)) != 0 }
    }

    fn set_window_positioning_mode(&self, window: WindowId, mode: PositioningMode, monitor: i32) {
        unsafe { XPLMSetWindowPositioningMode(raw_window(window), mode as c_int, monitor) };
    }

    fn set_window_gravity(&self, window: WindowId, gravity: Gravity) {
        unsafe {
            XPLMSetWindowGravity(
                raw_window(window),
                gravity.left,
                gravity.top,
                gravity.right,
                gravity.bottom,
            )
        };
    }

    fn set_window_resizing_limits(&self, window: WindowId, limits: ResizingLimits) {
        unsafe {
            XPLMSetWindowResizingLimits(
                raw_window(window),
                limits.min_width,
                limits.min_height,
                limits.max_width,
                limits.max_height,
            )
        };
    }

    fn set_window_title(&self, window: WindowId, title: &str) {
        let title = c_string(title);
        unsafe { XPLMSetWindowTitle(raw_window(window), title.as_ptr()) };
    }

    fn take_keyboard_focus(&self, window: Option<WindowId>) {
        let raw = window.map_or(std::ptr::null_mut(), raw_window);
        unsafe { XPLMTakeKeyboardFocus(raw) };
    }

    fn has_keyboard_focus(&self, window: WindowId) -> bool {
        unsafe { XPLMHasKeyboardFocus(raw_window(window)) != 0 }
    }

    fn screen_bounds_global(&self) -> WindowGeometry {
        let mut screen = WindowGeometry::default();
        unsafe {
            XPLMGetScreenBoundsGlobal(
                &mut screen.left,
                &mut screen.top,
                &mut screen.right,
                &mut screen.bottom,
            )
        };
        screen
    }

    fn mouse_location_global(&self) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        unsafe { XPLMGetMouseLocationGlobal(&mut x, &mut y) };
        (x, y)
    }

    fn elapsed_time(&self) -> f32 {
        unsafe { XPLMGetElapsedTime() }
    }

    fn vr_enabled(&self) -> bool {
        unsafe { XPLMGetDatai(self.datarefs.vr_enabled) != 0 }
    }

    fn scene_matrices(&self) -> SceneMatrices {
        let mut scene = SceneMatrices {
            modelview: IDENTITY,
            projection: IDENTITY,
            viewport: [0; 4],
        };
        unsafe {
            XPLMGetDatavf(self.datarefs.modelview, scene.modelview.as_mut_ptr(), 0, 16);
            XPLMGetDatavf(self.datarefs.projection, scene.projection.as_mut_ptr(), 0, 16);
            XPLMGetDatavi(self.datarefs.viewport, scene.viewport.as_mut_ptr(), 0, 4);
        }
        scene
    }

    fn set_graphics_state(&self, state: GraphicsState) {
        unsafe {
            XPLMSetGraphicsState(
                state.fog as c_int,
                state.texture_units,
                state.lighting as c_int,
                state.alpha_testing as c_int,
                state.alpha_blending as c_int,
                state.depth_testing as c_int,
                state.depth_writing as c_int,
            )
        };
    }

    fn generate_texture_number(&self) -> u32 {
        let mut texture: c_int = 0;
        unsafe { XPLMGenerateTextureNumbers(&mut texture, 1) };
        texture as u32
    }

    fn bind_texture_2d(&self, texture: u32, unit: i32) {
        unsafe { XPLMBindTexture2d(texture as c_int, unit) };
    }

    unsafe fn create_flight_loop(
        &self,
        handler: NonNull<dyn FlightLoopHandler>,
    ) -> Option<FlightLoopId> {
        let sink = Box::into_raw(Box::new(handler));
        let mut raw = XPLMCreateFlightLoop {
            struct_size: std::mem::size_of::<XPLMCreateFlightLoop>() as c_int,
            phase: FLIGHT_LOOP_PHASE_AFTER_FLIGHT_MODEL,
            callback_func: Some(flight_loop),
            refcon: sink as *mut c_void,
        };
        let flight_loop = unsafe { XPLMCreateFlightLoop(&mut raw) };
        if flight_loop.is_null() {
            drop(unsafe { Box::from_raw(sink) });
            return None;
        }
        let id = FlightLoopId(flight_loop as usize);
        self.flight_loops.borrow_mut().insert(id, sink);
        Some(id)
    }

    fn schedule_flight_loop(&self, flight_loop: FlightLoopId, interval: f32, relative_to_now: bool) {
        unsafe {
            XPLMScheduleFlightLoop(raw_flight_loop(flight_loop), interval, relative_to_now as c_int)
        };
    }

    fn destroy_flight_loop(&self, flight_loop: FlightLoopId) {
        unsafe { XPLMDestroyFlightLoop(raw_flight_loop(flight_loop)) };
        if let Some(sink) = self.flight_loops.borrow_mut().remove(&flight_loop) {
            drop(unsafe { Box::from_raw(sink) });
        }
    }
}

impl Drop for XplmHost {
    fn drop(&mut self) {
        let windows = self.windows.get_mut().len();
        let flight_loops = self.flight_loops.get_mut().len();
        if windows > 0 || flight_loops > 0 {
            log::warn!(
                target: LOG_TARGET,
                "host dropped with {windows} windows and {flight_loops} flight loops alive"
            );
        }
    }
}

/// Runs a callback body, turning a panic into a log line and `fallback`.
fn guarded<R>(callback: &str, fallback: R, body: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            log::error!(target: LOG_TARGET, "panic in {callback} callback");
            fallback
        }
    }
}

unsafe fn window_sink<'a>(refcon: *mut c_void) -> Option<&'a mut dyn WindowEvents> {
    unsafe {
        (refcon as *mut WindowSink)
            .as_mut()
            .map(|sink| sink.as_mut())
    }
}

unsafe extern "C" fn draw_window(_window: XPLMWindowID, refcon: *mut c_void) {
    guarded("draw", (), || {
        if let Some(sink) = unsafe { window_sink(refcon) } {
            sink.draw();
        }
    })
}

unsafe extern "C" fn mouse_click(
    _window: XPLMWindowID,
    x: c_int,
    y: c_int,
    status: c_int,
    refcon: *mut c_void,
) -> c_int {
    guarded("mouse click", 0, || {
        let Some(status) = MouseStatus::from_raw(status) else {
            return 0;
        };
        unsafe { window_sink(refcon) }.map_or(0, |sink| sink.mouse_click(x, y, status) as c_int)
    })
}

unsafe extern "C" fn right_click(
    _window: XPLMWindowID,
    x: c_int,
    y: c_int,
    status: c_int,
    refcon: *mut c_void,
) -> c_int {
    guarded("right click", 0, || {
        let Some(status) = MouseStatus::from_raw(status) else {
            return 0;
        };
        unsafe { window_sink(refcon) }.map_or(0, |sink| sink.right_click(x, y, status) as c_int)
    })
}

unsafe extern "C" fn key(
    _window: XPLMWindowID,
    key: c_char,
    flags: c_int,
    virtual_key: c_char,
    refcon: *mut c_void,
    losing_focus: c_int,
) {
    guarded("key", (), || {
        if let Some(sink) = unsafe { window_sink(refcon) } {
            sink.key(
                key as u8,
                KeyFlags::from_bits_truncate(flags),
                virtual_key as u8,
                losing_focus != 0,
            );
        }
    })
}

unsafe extern "C" fn cursor(_window: XPLMWindowID, x: c_int, y: c_int, refcon: *mut c_void) -> c_int {
    guarded("cursor", CursorStatus::Default as c_int, || {
        unsafe { window_sink(refcon) }
            .map_or(CursorStatus::Default, |sink| sink.cursor(x, y)) as c_int
    })
}

unsafe extern "C" fn mouse_wheel(
    _window: XPLMWindowID,
    x: c_int,
    y: c_int,
    wheel: c_int,
    clicks: c_int,
    refcon: *mut c_void,
) -> c_int {
    guarded("mouse wheel", 0, || {
        unsafe { window_sink(refcon) }
            .map_or(0, |sink| sink.mouse_wheel(x, y, wheel, clicks) as c_int)
    })
}

unsafe extern "C" fn flight_loop(
    since_last_call: f32,
    since_last_loop: f32,
    counter: c_int,
    refcon: *mut c_void,
) -> f32 {
    // Zero unschedules the loop, so a panicking handler stops running.
    guarded("flight loop", 0.0, || {
        let sink = unsafe { (refcon as *mut FlightLoopSink).as_mut() };
        sink.map_or(0.0, |sink| unsafe {
            sink.as_mut()
                .flight_loop(since_last_call, since_last_loop, counter)
        })
    })
}

/// `log` backend writing to the simulator's `Log.txt`
pub struct XplmLogger;

static LOGGER: XplmLogger = XplmLogger;

fn format_line(target: &str, level: log::Level, args: &fmt::Arguments<'_>) -> String {
    format!("[{target}] {level} {args}\n")
}

impl Log for XplmLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = c_string(&format_line(record.target(), record.level(), record.args()));
        unsafe { XPLMDebugString(line.as_ptr()) };
    }

    fn flush(&self) {}
}

/// Routes `log` output to the simulator log. Fails if a logger is already installed.
pub fn init_logging(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_lines_name_target_and_level() {
        assert_eq!(
            format_line("my_plugin::ui", log::Level::Warn, &format_args!("{} windows", 3)),
            "[my_plugin::ui] WARN 3 windows\n"
        );
    }

    #[test]
    fn titles_lose_interior_nul() {
        assert_eq!(c_string("Radio\0 Stack").as_bytes(), b"Radio Stack");
    }

    #[test]
    fn panics_become_fallback_values() {
        assert_eq!(guarded("test", 7, || -> i32 { panic!("boom") }), 7);
        assert_eq!(guarded("test", 7, || 1), 1);
    }
}
