//! The simulator seam
//!
//! Everything the backend needs from X-Plane goes through [`Host`]. The
//! `xplm` feature provides the implementation bound to the plugin SDK; tests
//! use a recording double. Callbacks travel the other way through
//! [`WindowEvents`] and [`FlightLoopHandler`].
//!
//! All methods are called on the simulator's main thread.

use std::ptr::NonNull;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::WindowGeometry;
use crate::input::KeyFlags;
use crate::scene::SceneMatrices;

/// Opaque handle of a native window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub usize);

/// Opaque handle of a flight loop callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlightLoopId(pub usize);

/// `XPLMWindowDecoration`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Decoration {
    None = 0,
    #[default]
    RoundRectangle = 1,
    SelfDecorated = 2,
    SelfDecoratedResizable = 3,
}

/// `XPLMWindowLayer`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Layer {
    FlightOverlay = 0,
    #[default]
    FloatingWindows = 1,
    Modal = 2,
    GrowlNotifications = 3,
}

/// `XPLMWindowPositioningMode`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PositioningMode {
    #[default]
    Free = 0,
    CenterOnMonitor = 1,
    FullScreenOnMonitor = 2,
    FullScreenOnAllMonitors = 3,
    PopOut = 4,
    Vr = 5,
}

/// `XPLMMouseStatus`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseStatus {
    Down = 1,
    Drag = 2,
    Up = 3,
}

impl MouseStatus {
    /// Decodes the SDK value; unknown values yield `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Down),
            2 => Some(Self::Drag),
            3 => Some(Self::Up),
            _ => None,
        }
    }
}

/// `XPLMCursorStatus`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorStatus {
    #[default]
    Default = 0,
    Hidden = 1,
    Arrow = 2,
    Custom = 3,
}

/// Fractions of the screen size each edge follows when the screen is resized
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gravity {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for Gravity {
    /// Keep the window's offset from the top left corner.
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 1.0,
            right: 0.0,
            bottom: 1.0,
        }
    }
}

/// Minimum and maximum size in boxels the user can drag a window to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResizingLimits {
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

/// Arguments of `XPLMSetGraphicsState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsState {
    pub fog: bool,
    /// Number of texture units to enable
    pub texture_units: i32,
    pub lighting: bool,
    pub alpha_testing: bool,
    pub alpha_blending: bool,
    pub depth_testing: bool,
    pub depth_writing: bool,
}

impl GraphicsState {
    /// One texture unit, alpha test and blend, no depth.
    pub const GUI: Self = Self {
        fog: false,
        texture_units: 1,
        lighting: false,
        alpha_testing: true,
        alpha_blending: true,
        depth_testing: false,
        depth_writing: false,
    };
}

/// Parameters of a new native window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateWindowParams {
    /// Initial rectangle in global boxels
    pub geometry: WindowGeometry,
    pub visible: bool,
    pub decoration: Decoration,
    pub layer: Layer,
}

/// Callbacks of one native window
pub trait WindowEvents {
    /// The window is being drawn; the simulator's framebuffer is bound.
    fn draw(&mut self);

    /// Left button. Returns `true` if the click was consumed.
    fn mouse_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool;

    /// Right button. Returns `true` if the click was consumed.
    fn right_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool;

    /// Key press or release while the window has keyboard focus.
    /// `losing_focus` is set when focus moves elsewhere instead.
    fn key(&mut self, key: u8, flags: KeyFlags, virtual_key: u8, losing_focus: bool);

    /// Which cursor to show while the mouse is over the window.
    fn cursor(&mut self, x: i32, y: i32) -> CursorStatus;

    /// Wheel 0 is vertical, 1 horizontal. Returns `true` if consumed.
    fn mouse_wheel(&mut self, x: i32, y: i32, wheel: i32, clicks: i32) -> bool;
}

/// Per-frame processing callback
pub trait FlightLoopHandler {
    /// Returns the next call interval; negative values count frames.
    fn flight_loop(&mut self, since_last_call: f32, since_last_loop: f32, counter: i32) -> f32;
}

/// Access to the simulator's display, graphics and processing APIs
pub trait Host {
    /// Creates a native window that reports to `events`.
    ///
    /// # Safety
    ///
    /// `events` must stay valid and must not move until the window is
    /// destroyed with [`Host::destroy_window`].
    unsafe fn create_window(
        &self,
        params: &CreateWindowParams,
        events: NonNull<dyn WindowEvents>,
    ) -> Option<WindowId>;
    /// Destroys the window; its events sink is never called again.
    fn destroy_window(&self, window: WindowId);

    /// Current rectangle in global boxels
    fn window_geometry(&self, window: WindowId) -> WindowGeometry;
    fn set_window_geometry(&self, window: WindowId, geometry: WindowGeometry);
    /// Size of a window placed in the VR world, in boxels
    fn set_window_geometry_vr(&self, window: WindowId, width: i32, height: i32);
    fn window_is_visible(&self, window: WindowId) -> bool;
    fn set_window_visible(&self, window: WindowId, visible: bool);
    /// `true` when the window lives in its own OS window.
    fn window_is_popped_out(&self, window: WindowId) -> bool;
    /// `true` when no other window covers this one.
    fn window_is_in_front(&self, window: WindowId) -> bool;
    /// `monitor` is the monitor index, or -1 for the main monitor.
    fn set_window_positioning_mode(&self, window: WindowId, mode: PositioningMode, monitor: i32);
    fn set_window_gravity(&self, window: WindowId, gravity: Gravity);
    fn set_window_resizing_limits(&self, window: WindowId, limits: ResizingLimits);
    fn set_window_title(&self, window: WindowId, title: &str);
    /// `None` gives keyboard focus back to the simulator.
    fn take_keyboard_focus(&self, window: Option<WindowId>);
    /// Whether `window` currently receives key callbacks.
    fn has_keyboard_focus(&self, window: WindowId) -> bool;

    /// Bounding box of all monitors in global boxels
    fn screen_bounds_global(&self) -> WindowGeometry;
    /// Mouse position in global boxels
    fn mouse_location_global(&self) -> (i32, i32);
    /// Seconds since the simulator started
    fn elapsed_time(&self) -> f32;
    fn vr_enabled(&self) -> bool;
    /// Matrices and viewport in effect for the current draw callback
    fn scene_matrices(&self) -> SceneMatrices;

    /// Sets the fixed-function state the simulator tracks.
    fn set_graphics_state(&self, state: GraphicsState);
    /// Reserves a GL texture name the simulator will not reuse.
    fn generate_texture_number(&self) -> u32;
    /// Binds through the simulator so its texture cache stays coherent.
    fn bind_texture_2d(&self, texture: u32, unit: i32);

    /// Creates a flight loop that reports to `handler`. It is not scheduled.
    ///
    /// # Safety
    ///
    /// `handler` must stay valid and must not move until the flight loop is
    /// destroyed with [`Host::destroy_flight_loop`].
    unsafe fn create_flight_loop(
        &self,
        handler: NonNull<dyn FlightLoopHandler>,
    ) -> Option<FlightLoopId>;
    /// Negative `interval` counts frames, positive counts seconds.
    fn schedule_flight_loop(&self, flight_loop: FlightLoopId, interval: f32, relative_to_now: bool);
    /// Unschedules and destroys the flight loop.
    fn destroy_flight_loop(&self, flight_loop: FlightLoopId);
}
