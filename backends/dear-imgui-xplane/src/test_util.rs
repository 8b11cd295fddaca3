//! Shared test doubles

use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};

use dear_imgui_rs::render::DrawData;
use dear_imgui_rs::{TextureId, TextureStatus};

use crate::error::RenderResult;
use crate::geometry::WindowGeometry;
use crate::host::{
    CreateWindowParams, CursorStatus, FlightLoopHandler, FlightLoopId, GraphicsState, Gravity,
    Host, MouseStatus, PositioningMode, ResizingLimits, WindowEvents, WindowId,
};
use crate::input::KeyFlags;
use crate::renderer::{FrameRenderer, RenderTarget};
use crate::scene::SceneMatrices;

// Dear ImGui keeps one current context per process
static CTX_TEST_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

pub fn lock_context() -> MutexGuard<'static, ()> {
    let _ = env_logger::builder().is_test(true).try_init();
    CTX_TEST_MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub const SCREEN: WindowGeometry = WindowGeometry::new(0, 1080, 1920, 0);

#[derive(Clone)]
pub struct MockWindow {
    pub params: CreateWindowParams,
    pub geometry: WindowGeometry,
    pub geometry_writes: usize,
    pub vr_size: Option<(i32, i32)>,
    pub visible: bool,
    pub popped_out: bool,
    pub in_front: bool,
    pub positioning: Vec<(PositioningMode, i32)>,
    pub gravity: Option<Gravity>,
    pub limits: Option<ResizingLimits>,
    pub title: Option<String>,
    events: NonNull<dyn WindowEvents>,
}

#[derive(Clone, Copy)]
pub struct MockFlightLoop {
    pub schedule: Option<(f32, bool)>,
    handler: NonNull<dyn FlightLoopHandler>,
}

pub struct MockState {
    next_id: usize,
    pub windows: HashMap<WindowId, MockWindow>,
    pub destroyed_windows: Vec<WindowId>,
    pub flight_loops: HashMap<FlightLoopId, MockFlightLoop>,
    pub destroyed_flight_loops: Vec<FlightLoopId>,
    pub focus: Option<WindowId>,
    pub screen: WindowGeometry,
    pub mouse: (i32, i32),
    pub time: f32,
    pub vr: bool,
    pub graphics_states: Vec<GraphicsState>,
    pub next_texture: u32,
    pub bound_textures: Vec<u32>,
}

/// Host double that records every call and dispatches callbacks on demand
pub struct MockHost {
    pub state: RefCell<MockState>,
}

impl MockHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(MockState {
                next_id: 1,
                windows: HashMap::new(),
                destroyed_windows: Vec::new(),
                flight_loops: HashMap::new(),
                destroyed_flight_loops: Vec::new(),
                focus: None,
                screen: SCREEN,
                mouse: (-1000, -1000),
                time: 1.0,
                vr: false,
                graphics_states: Vec::new(),
                next_texture: 100,
                bound_textures: Vec::new(),
            }),
        })
    }

    pub fn window(&self, id: WindowId) -> MockWindow {
        self.state.borrow().windows[&id].clone()
    }

    pub fn with_window(&self, id: WindowId, f: impl FnOnce(&mut MockWindow)) {
        if let Some(window) = self.state.borrow_mut().windows.get_mut(&id) {
            f(window);
        }
    }

    pub fn advance_time(&self, seconds: f32) {
        self.state.borrow_mut().time += seconds;
    }

    pub fn set_mouse(&self, x: i32, y: i32) {
        self.state.borrow_mut().mouse = (x, y);
    }

    pub fn set_vr(&self, enabled: bool) {
        self.state.borrow_mut().vr = enabled;
    }

    fn events(&self, id: WindowId) -> Option<NonNull<dyn WindowEvents>> {
        self.state.borrow().windows.get(&id).map(|w| w.events)
    }

    pub fn draw(&self, id: WindowId) {
        if let Some(events) = self.events(id) {
            unsafe { (*events.as_ptr()).draw() };
        }
    }

    pub fn click(&self, id: WindowId, x: i32, y: i32, status: MouseStatus) -> bool {
        self.events(id)
            .is_some_and(|events| unsafe { (*events.as_ptr()).mouse_click(x, y, status) })
    }

    pub fn right_click(&self, id: WindowId, x: i32, y: i32, status: MouseStatus) -> bool {
        self.events(id)
            .is_some_and(|events| unsafe { (*events.as_ptr()).right_click(x, y, status) })
    }

    pub fn key(&self, id: WindowId, key: u8, flags: KeyFlags, virtual_key: u8, losing_focus: bool) {
        if let Some(events) = self.events(id) {
            unsafe { (*events.as_ptr()).key(key, flags, virtual_key, losing_focus) };
        }
    }

    pub fn cursor(&self, id: WindowId, x: i32, y: i32) -> Option<CursorStatus> {
        self.events(id)
            .map(|events| unsafe { (*events.as_ptr()).cursor(x, y) })
    }

    pub fn wheel(&self, id: WindowId, x: i32, y: i32, wheel: i32, clicks: i32) -> bool {
        self.events(id).is_some_and(|events| unsafe {
            (*events.as_ptr()).mouse_wheel(x, y, wheel, clicks)
        })
    }

    /// Calls every scheduled flight loop once, like one simulator frame.
    pub fn run_flight_loops(&self) {
        let scheduled: Vec<_> = self
            .state
            .borrow()
            .flight_loops
            .iter()
            .filter(|(_, fl)| fl.schedule.is_some())
            .map(|(id, fl)| (*id, fl.handler))
            .collect();
        for (id, handler) in scheduled {
            if !self.state.borrow().flight_loops.contains_key(&id) {
                continue;
            }
            let next = unsafe { (*handler.as_ptr()).flight_loop(0.05, 0.05, 1) };
            if let Some(fl) = self.state.borrow_mut().flight_loops.get_mut(&id) {
                fl.schedule = (next != 0.0).then_some((next, true));
            }
        }
    }
}

impl Host for MockHost {
    unsafe fn create_window(
        &self,
        params: &CreateWindowParams,
        events: NonNull<dyn WindowEvents>,
    ) -> Option<WindowId> {
        let mut state = self.state.borrow_mut();
        let id = WindowId(state.next_id);
        state.next_id += 1;
        state.windows.insert(
            id,
            MockWindow {
                params: *params,
                geometry: params.geometry,
                geometry_writes: 0,
                vr_size: None,
                visible: params.visible,
                popped_out: false,
                in_front: true,
                positioning: Vec::new(),
                gravity: None,
                limits: None,
                title: None,
                events,
            },
        );
        Some(id)
    }

    fn destroy_window(&self, window: WindowId) {
        let mut state = self.state.borrow_mut();
        state.windows.remove(&window);
        state.destroyed_windows.push(window);
        if state.focus == Some(window) {
            state.focus = None;
        }
    }

    fn window_geometry(&self, window: WindowId) -> WindowGeometry {
        self.state
            .borrow()
            .windows
            .get(&window)
            .map(|w| w.geometry)
            .unwrap_or_default()
    }

    fn set_window_geometry(&self, window: WindowId, geometry: WindowGeometry) {
        self.with_window(window, |w| {
            w.geometry = geometry;
            w.geometry_writes += 1;
        });
    }

    fn set_window_geometry_vr(&self, window: WindowId, width: i32, height: i32) {
        self.with_window(window, |w| w.vr_size = Some((width, height)));
    }

    fn window_is_visible(&self, window: WindowId) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.visible)
    }

    fn set_window_visible(&self, window: WindowId, visible: bool) {
        self.with_window(window, |w| w.visible = visible);
    }

    fn window_is_popped_out(&self, window: WindowId) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.popped_out)
    }

    fn window_is_in_front(&self, window: WindowId) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.in_front)
    }

    fn set_window_positioning_mode(&self, window: WindowId, mode: PositioningMode, monitor: i32) {
        self.with_window(window, |w| w.positioning.push((mode, monitor)));
    }

    fn set_window_gravity(&self, window: WindowId, gravity: Gravity) {
        self.with_window(window, |w| w.gravity = Some(gravity));
    }

    fn set_window_resizing_limits(&self, window: WindowId, limits: ResizingLimits) {
        self.with_window(window, |w| w.limits = Some(limits));
    }

    fn set_window_title(&self, window: WindowId, title: &str) {
        self.with_window(window, |w| w.title = Some(title.to_owned()));
    }

    fn take_keyboard_focus(&self, window: Option<WindowId>) {
        self.state.borrow_mut().focus = window;
    }

    fn has_keyboard_focus(&self, window: WindowId) -> bool {
        self.state.borrow().focus == Some(window)
    }

    fn screen_bounds_global(&self) -> WindowGeometry {
        self.state.borrow().screen
    }

    fn mouse_location_global(&self) -> (i32, i32) {
        self.state.borrow().mouse
    }

    fn elapsed_time(&self) -> f32 {
        self.state.borrow().time
    }

    fn vr_enabled(&self) -> bool {
        self.state.borrow().vr
    }

    fn scene_matrices(&self) -> SceneMatrices {
        let screen = self.state.borrow().screen;
        SceneMatrices::orthographic(
            screen.width() as f32,
            screen.height() as f32,
            [0, 0, screen.width(), screen.height()],
        )
    }

    fn set_graphics_state(&self, state: GraphicsState) {
        self.state.borrow_mut().graphics_states.push(state);
    }

    fn generate_texture_number(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.next_texture += 1;
        state.next_texture
    }

    fn bind_texture_2d(&self, texture: u32, _unit: i32) {
        self.state.borrow_mut().bound_textures.push(texture);
    }

    unsafe fn create_flight_loop(
        &self,
        handler: NonNull<dyn FlightLoopHandler>,
    ) -> Option<FlightLoopId> {
        let mut state = self.state.borrow_mut();
        let id = FlightLoopId(state.next_id);
        state.next_id += 1;
        state.flight_loops.insert(
            id,
            MockFlightLoop {
                schedule: None,
                handler,
            },
        );
        Some(id)
    }

    fn schedule_flight_loop(&self, flight_loop: FlightLoopId, interval: f32, relative_to_now: bool) {
        if let Some(fl) = self.state.borrow_mut().flight_loops.get_mut(&flight_loop) {
            fl.schedule = Some((interval, relative_to_now));
        }
    }

    fn destroy_flight_loop(&self, flight_loop: FlightLoopId) {
        let mut state = self.state.borrow_mut();
        state.flight_loops.remove(&flight_loop);
        state.destroyed_flight_loops.push(flight_loop);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedFrame {
    pub geometry: WindowGeometry,
    pub display_pos: [f32; 2],
    pub display_size: [f32; 2],
    pub draw_lists: usize,
}

#[derive(Debug, Default)]
pub struct RenderLog {
    pub frames: Vec<RenderedFrame>,
    pub shared_font_atlas: bool,
    pub destroyed: bool,
}

/// Renderer double: acknowledges texture requests and records each frame
pub struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
    next_texture: u64,
}

impl RecordingRenderer {
    pub fn new() -> (Self, Rc<RefCell<RenderLog>>) {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        (
            Self {
                log: log.clone(),
                next_texture: 1,
            },
            log,
        )
    }
}

impl FrameRenderer for RecordingRenderer {
    fn set_shared_font_atlas(&mut self, shared: bool) {
        self.log.borrow_mut().shared_font_atlas = shared;
    }

    fn render(
        &mut self,
        _host: &dyn Host,
        target: &RenderTarget,
        draw_data: &DrawData,
    ) -> RenderResult<()> {
        for mut td in draw_data.textures() {
            match td.status() {
                TextureStatus::WantCreate => {
                    td.set_tex_id(TextureId::from(self.next_texture));
                    self.next_texture += 1;
                    td.set_status(TextureStatus::OK);
                }
                TextureStatus::WantUpdates => td.set_status(TextureStatus::OK),
                TextureStatus::WantDestroy => {
                    unsafe {
                        (*td.as_raw_mut()).WantDestroyNextFrame = true;
                    }
                    td.set_status(TextureStatus::Destroyed);
                }
                TextureStatus::OK | TextureStatus::Destroyed => {}
            }
        }

        self.log.borrow_mut().frames.push(RenderedFrame {
            geometry: target.geometry,
            display_pos: draw_data.display_pos,
            display_size: draw_data.display_size,
            draw_lists: draw_data.draw_lists_count(),
        });
        Ok(())
    }

    fn destroy(&mut self, _host: &dyn Host) {
        self.log.borrow_mut().destroyed = true;
    }
}
