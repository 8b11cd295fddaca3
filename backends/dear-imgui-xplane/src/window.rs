//! Single native window hosting one Dear ImGui context
//!
//! [`ImgWindow`] owns a suspended Dear ImGui context, a native window and a
//! flight loop. Each host callback activates the context, does its work and
//! suspends it again, so any number of windows can coexist in one plugin.
//!
//! Operations that would mutate the native window from inside its own
//! callbacks (delete, hide, resize, place, positioning mode) are available in
//! a `safe_*` flavour that parks the request until the next flight loop.

use std::path::PathBuf;
use std::ptr::NonNull;
use std::rc::Rc;

use dear_imgui_rs::{Condition, Context, SharedFontAtlas, SuspendedContext, Ui, WindowFlags, sys};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::deferred::{DeferredAction, PendingActions};
use crate::error::{InitError, InitResult};
use crate::geometry::{Anchor, WindowGeometry};
use crate::host::{
    CreateWindowParams, CursorStatus, Decoration, FlightLoopHandler, FlightLoopId, Gravity, Host,
    Layer, MouseStatus, PositioningMode, ResizingLimits, WindowEvents, WindowId,
};
use crate::input::{KeyFlags, forward_key, forward_mouse_button, forward_wheel};
use crate::renderer::{FrameRenderer, RenderTarget};

const LOG_TARGET: &str = "dear-imgui-xplane";

/// Title used until [`ImgWindow::set_title`] is called
pub const DEFAULT_TITLE: &str = "Default window title";

/// Dear ImGui refuses a zero delta time
const MIN_DELTA_TIME: f32 = 1.0e-4;

/// Flags of the full-size window the default [`WindowDelegate::frame`] opens
pub const FULL_WINDOW_FLAGS: WindowFlags = WindowFlags::NO_TITLE_BAR
    .union(WindowFlags::NO_RESIZE)
    .union(WindowFlags::NO_COLLAPSE)
    .union(WindowFlags::NO_MOVE);

/// Creation options of an [`ImgWindow`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WindowOptions {
    /// Size in boxels
    pub width: i32,
    pub height: i32,
    /// Global boxel position of the `anchor` point
    pub x: i32,
    pub y: i32,
    pub anchor: Anchor,
    pub decoration: Decoration,
    pub layer: Layer,
    /// Mode restored whenever the window leaves VR
    pub positioning_mode: PositioningMode,
    /// Native window title, also the name of the default Dear ImGui window
    pub title: String,
    /// Where Dear ImGui persists window state. `None` disables the ini file.
    pub ini_filename: Option<PathBuf>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            x: 100,
            y: 700,
            anchor: Anchor::TopLeft,
            decoration: Decoration::RoundRectangle,
            layer: Layer::FloatingWindows,
            positioning_mode: PositioningMode::Free,
            title: DEFAULT_TITLE.to_string(),
            ini_filename: None,
        }
    }
}

impl WindowOptions {
    /// Same as [`WindowOptions::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size in boxels.
    pub fn size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Puts the `anchor` corner of the window at `(x, y)`.
    pub fn position(mut self, x: i32, y: i32, anchor: Anchor) -> Self {
        self.x = x;
        self.y = y;
        self.anchor = anchor;
        self
    }

    pub fn decoration(mut self, decoration: Decoration) -> Self {
        self.decoration = decoration;
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn positioning_mode(mut self, mode: PositioningMode) -> Self {
        self.positioning_mode = mode;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Enables the ini file at `filename`.
    pub fn ini_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.ini_filename = Some(filename.into());
        self
    }
}

/// What a window shows and how it reacts to being shown
pub trait WindowDelegate {
    /// Adjust the freshly created context (fonts, style, flags).
    fn configure_context(&mut self, _imgui_context: &mut Context) {}

    /// Called before the window becomes visible. Returning `false` keeps it hidden.
    fn on_show(&mut self) -> bool {
        true
    }

    /// Build the window's contents.
    fn build(&mut self, ui: &Ui, frame: &mut WindowFrame<'_>);

    /// Build the whole frame. The default opens one borderless Dear ImGui
    /// window covering the native window and calls [`WindowDelegate::build`]
    /// inside it.
    fn frame(&mut self, ui: &Ui, frame: &mut WindowFrame<'_>) {
        let geometry = frame.geometry();
        let title = frame.title().to_owned();
        ui.window(title)
            .position([0.0, 0.0], Condition::Always)
            .size(
                [geometry.width() as f32, geometry.height() as f32],
                Condition::Always,
            )
            .flags(FULL_WINDOW_FLAGS)
            .build(|| self.build(ui, frame));
    }
}

/// Per-frame view of the window handed to a [`WindowDelegate`]
pub struct WindowFrame<'a> {
    pending: &'a mut PendingActions,
    geometry: WindowGeometry,
    title: &'a str,
    first_render: bool,
}

impl WindowFrame<'_> {
    /// `true` during the first frame after creation.
    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// Geometry this frame is laid out for
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn title(&self) -> &str {
        self.title
    }

    /// See [`ImgWindow::safe_delete`].
    pub fn safe_delete(&mut self) {
        self.pending.delete();
    }

    pub fn safe_hide(&mut self) {
        self.pending.hide();
    }

    pub fn safe_resize(&mut self, width: i32, height: i32, anchor: Anchor) {
        self.pending.resize(width, height, anchor);
    }

    pub fn safe_place(&mut self, x: i32, y: i32, anchor: Anchor) {
        self.pending.place(x, y, anchor);
    }

    pub fn safe_positioning_mode(&mut self, mode: PositioningMode, monitor: i32) {
        self.pending.positioning(mode, monitor);
    }
}

#[derive(Debug, Default)]
struct DragState {
    dragging: bool,
    last: Option<(i32, i32)>,
}

impl DragState {
    fn delta(&self, x: i32, y: i32) -> (i32, i32) {
        self.last.map_or((0, 0), |(lx, ly)| (x - lx, y - ly))
    }
}

/// A native window rendering its own Dear ImGui context
pub struct ImgWindow<D: WindowDelegate + 'static> {
    host: Rc<dyn Host>,
    renderer: Box<dyn FrameRenderer>,
    delegate: D,
    context: Option<SuspendedContext>,
    window: Option<WindowId>,
    flight_loop: Option<FlightLoopId>,
    geometry: WindowGeometry,
    decoration: Decoration,
    preferred_mode: PositioningMode,
    in_vr: bool,
    first_render: bool,
    has_shared_atlas: bool,
    title: String,
    pending: PendingActions,
    last_time: f32,
    drag: DragState,
    destroyed: bool,
}

impl<D: WindowDelegate + 'static> ImgWindow<D> {
    /// Creates the window with its own font atlas.
    ///
    /// The native window starts hidden; call [`ImgWindow::set_visible`].
    pub fn new(
        host: Rc<dyn Host>,
        renderer: Box<dyn FrameRenderer>,
        delegate: D,
        options: WindowOptions,
    ) -> InitResult<Box<Self>> {
        let context =
            SuspendedContext::try_create().map_err(|e| InitError::Context(e.to_string()))?;
        Self::init(host, renderer, delegate, options, context, false)
    }

    /// Creates the window drawing with fonts from an atlas shared with other windows.
    pub fn with_shared_font_atlas(
        host: Rc<dyn Host>,
        renderer: Box<dyn FrameRenderer>,
        delegate: D,
        options: WindowOptions,
        atlas: SharedFontAtlas,
    ) -> InitResult<Box<Self>> {
        let context = SuspendedContext::try_create_with_shared_font_atlas(atlas)
            .map_err(|e| InitError::Context(e.to_string()))?;
        Self::init(host, renderer, delegate, options, context, true)
    }

    fn init(
        host: Rc<dyn Host>,
        renderer: Box<dyn FrameRenderer>,
        delegate: D,
        options: WindowOptions,
        context: SuspendedContext,
        has_shared_atlas: bool,
    ) -> InitResult<Box<Self>> {
        let last_time = host.elapsed_time();
        let mut this = Box::new(Self {
            host,
            renderer,
            delegate,
            context: None,
            window: None,
            flight_loop: None,
            geometry: WindowGeometry::default(),
            decoration: options.decoration,
            preferred_mode: options.positioning_mode,
            in_vr: false,
            first_render: true,
            has_shared_atlas,
            title: options.title.clone(),
            pending: PendingActions::default(),
            last_time,
            drag: DragState::default(),
            destroyed: false,
        });
        this.configure_context(context, &options)?;

        let mut geometry = WindowGeometry::anchored(
            options.width,
            options.height,
            options.x,
            options.y,
            options.anchor,
        );
        if this.decoration == Decoration::SelfDecorated {
            geometry.fit_into(&this.host.screen_bounds_global());
        }
        this.geometry = geometry;

        let params = CreateWindowParams {
            geometry,
            visible: false,
            decoration: options.decoration,
            layer: options.layer,
        };
        let events = NonNull::from(&mut *this as &mut dyn WindowEvents);
        // SAFETY: the box never moves and the window is destroyed in `teardown`.
        let window = unsafe { this.host.create_window(&params, events) }
            .ok_or(InitError::CreateWindow)?;
        this.window = Some(window);
        this.host
            .set_window_positioning_mode(window, this.preferred_mode, -1);
        this.host.set_window_title(window, &this.title);

        let handler = NonNull::from(&mut *this as &mut dyn FlightLoopHandler);
        // SAFETY: as above, destroyed in `teardown`.
        let flight_loop = unsafe { this.host.create_flight_loop(handler) }
            .ok_or(InitError::CreateFlightLoop)?;
        this.flight_loop = Some(flight_loop);
        this.host.schedule_flight_loop(flight_loop, -1.0, true);

        log::debug!(
            target: LOG_TARGET,
            "created window {:?} \"{}\" at {:?}",
            window,
            this.title,
            geometry
        );
        Ok(this)
    }

    fn configure_context(
        &mut self,
        context: SuspendedContext,
        options: &WindowOptions,
    ) -> InitResult<()> {
        let mut ctx = context.activate().map_err(|_| {
            InitError::Context("another Dear ImGui context is current".to_string())
        })?;

        let setup = |ctx: &mut Context| -> InitResult<()> {
            let ctx_err = |e: dear_imgui_rs::ImGuiError| InitError::Context(e.to_string());
            ctx.set_ini_filename(options.ini_filename.clone())
                .map_err(ctx_err)?;
            ctx.set_platform_name(Some(format!(
                "dear-imgui-xplane {}",
                env!("CARGO_PKG_VERSION")
            )))
            .map_err(ctx_err)?;
            Ok(())
        };
        if let Err(err) = setup(&mut ctx) {
            self.context = Some(ctx.suspend());
            return Err(err);
        }

        self.renderer.configure_context(&mut ctx);
        self.renderer.set_shared_font_atlas(self.has_shared_atlas);

        #[cfg(feature = "clipboard")]
        ctx.set_clipboard_backend(crate::clipboard::SystemClipboard::new());

        unsafe {
            let io = sys::igGetIO_Nil();
            if !io.is_null() {
                // No key mapping exists for the macOS shortcuts.
                (*io).ConfigMacOSXBehaviors = false;
            }
            let style = sys::igGetStyle();
            if !style.is_null() {
                // The simulator draws the frame of decorated windows.
                if self.decoration == Decoration::RoundRectangle {
                    (*style).WindowRounding = 0.0;
                } else {
                    (*style).WindowBorderSize = 0.0;
                }
            }
        }

        self.delegate.configure_context(&mut ctx);
        self.context = Some(ctx.suspend());
        Ok(())
    }

    /// Runs `f` with this window's context current.
    fn with_context<R>(&mut self, f: impl FnOnce(&mut Self, &mut Context) -> R) -> Option<R> {
        let suspended = self.context.take()?;
        let mut ctx = match suspended.activate() {
            Ok(ctx) => ctx,
            Err(suspended) => {
                log::warn!(
                    target: LOG_TARGET,
                    "window {:?}: cannot activate context while another is current",
                    self.window
                );
                self.context = Some(suspended);
                return None;
            }
        };
        let result = f(self, &mut ctx);
        self.context = Some(ctx.suspend());
        Some(result)
    }

    fn draw_frame(&mut self, ctx: &mut Context, window: WindowId) {
        self.check_screen_and_place();
        self.geometry = self.host.window_geometry(window);
        let geometry = self.geometry;

        let now = self.host.elapsed_time();
        let delta = (now - self.last_time).max(MIN_DELTA_TIME);
        self.last_time = now;

        {
            let io = ctx.io_mut();
            io.set_display_size([geometry.width() as f32, geometry.height() as f32]);
            // Boxels, never scaled
            io.set_display_framebuffer_scale([1.0, 1.0]);
            if self.host.window_is_in_front(window) {
                let (x, y) = self.host.mouse_location_global();
                io.add_mouse_pos_event(geometry.to_imgui(x, y));
            }
            io.set_delta_time(delta);
        }

        let ui = ctx.frame();
        let mut frame = WindowFrame {
            pending: &mut self.pending,
            geometry,
            title: &self.title,
            first_render: self.first_render,
        };
        self.delegate.frame(ui, &mut frame);
        self.first_render = false;

        let draw_data = ctx.render();
        let target = RenderTarget {
            geometry,
            scene: self.host.scene_matrices(),
        };
        if let Err(err) = self
            .renderer
            .render(self.host.as_ref(), &target, draw_data)
        {
            log::warn!(target: LOG_TARGET, "window {window:?}: render failed: {err}");
        }

        self.sync_keyboard_focus(ctx, window);
    }

    fn sync_keyboard_focus(&mut self, ctx: &mut Context, window: WindowId) {
        let wants_keyboard = ctx.io().want_capture_keyboard();
        let has_focus = self.host.has_keyboard_focus(window);
        if wants_keyboard && !has_focus {
            self.host.take_keyboard_focus(Some(window));
        } else if !wants_keyboard && has_focus {
            self.host.take_keyboard_focus(None);
            // Keys used to leave the widget would otherwise stay down.
            unsafe {
                let io = sys::igGetIO_Nil();
                if !io.is_null() {
                    sys::ImGuiIO_AddFocusEvent(io, false);
                }
                sys::igClearActiveID();
            }
        }
    }

    fn handle_click(&mut self, x: i32, y: i32, status: MouseStatus, button: usize) -> bool {
        let Some(window) = self.window else {
            return false;
        };
        self.with_context(|this, ctx| {
            match status {
                MouseStatus::Down => {
                    let over_item = unsafe { sys::igIsAnyItemHovered() };
                    if this.decoration != Decoration::RoundRectangle && !over_item {
                        this.drag.dragging = true;
                    }
                    forward_mouse_button(ctx.io_mut(), button, true);
                }
                MouseStatus::Drag => {
                    let (dx, dy) = this.drag.delta(x, y);
                    if this.drag.dragging
                        && (dx != 0 || dy != 0)
                        && !this.in_vr
                        && !this.host.window_is_popped_out(window)
                    {
                        this.geometry.translate(dx, dy);
                        this.host.set_window_geometry(window, this.geometry);
                    }
                    forward_mouse_button(ctx.io_mut(), button, true);
                }
                MouseStatus::Up => {
                    this.drag.dragging = false;
                    forward_mouse_button(ctx.io_mut(), button, false);
                }
            }
            this.drag.last = Some((x, y));
        });
        true
    }

    /// Pulls a self-decorated window back onto the screen. Returns `true`
    /// when the native geometry was rewritten.
    fn check_screen_and_place(&mut self) -> bool {
        let Some(window) = self.window else {
            return false;
        };
        if self.decoration != Decoration::SelfDecorated
            || self.in_vr
            || self.host.window_is_popped_out(window)
        {
            return false;
        }
        let screen = self.host.screen_bounds_global();
        if self.geometry.clamp_into(&screen) {
            self.host.set_window_geometry(window, self.geometry);
            return true;
        }
        false
    }

    fn apply(&mut self, action: DeferredAction) {
        log::trace!(target: LOG_TARGET, "window {:?}: {action:?}", self.window);
        match action {
            DeferredAction::Hide => {
                if let Some(window) = self.window {
                    self.host.set_window_visible(window, false);
                }
            }
            DeferredAction::Resize {
                width,
                height,
                anchor,
            } => self.resize(width, height, anchor),
            DeferredAction::Positioning { mode, monitor } => {
                self.set_positioning_mode(mode, monitor)
            }
            DeferredAction::Place { x, y, anchor } => self.place(x, y, anchor),
            DeferredAction::Delete => self.teardown(),
        }
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(flight_loop) = self.flight_loop.take() {
            self.host.destroy_flight_loop(flight_loop);
        }
        if let Some(window) = self.window.take() {
            if self.host.has_keyboard_focus(window) {
                self.host.take_keyboard_focus(None);
            }
            self.host.destroy_window(window);
            log::debug!(target: LOG_TARGET, "destroyed window {window:?}");
        }
        self.renderer.destroy(self.host.as_ref());
        self.context = None;
        self.pending = PendingActions::default();
    }

    /// Shows or hides the window. Showing moves it into VR when VR is on and
    /// asks [`WindowDelegate::on_show`] first.
    pub fn set_visible(&mut self, visible: bool) {
        let Some(window) = self.window else {
            return;
        };
        if visible {
            self.move_for_vr();
        }
        if self.host.window_is_visible(window) == visible {
            return;
        }
        if visible && !self.delegate.on_show() {
            return;
        }
        self.host.set_window_visible(window, visible);
    }

    /// Visibility as the simulator reports it
    pub fn is_visible(&self) -> bool {
        self.window
            .is_some_and(|window| self.host.window_is_visible(window))
    }

    /// Moves the window into the VR world when VR is on, or back to its
    /// preferred positioning mode when VR was turned off.
    pub fn move_for_vr(&mut self) {
        let Some(window) = self.window else {
            return;
        };
        if self.host.vr_enabled() {
            self.host
                .set_window_positioning_mode(window, PositioningMode::Vr, 0);
            self.in_vr = true;
        } else if self.in_vr {
            self.host
                .set_window_positioning_mode(window, self.preferred_mode, -1);
            self.in_vr = false;
        }
    }

    /// `true` while the window is placed in the VR world.
    pub fn is_in_vr(&self) -> bool {
        self.in_vr
    }

    /// Resizes around `anchor`. Popped-out windows are left to the OS.
    pub fn resize(&mut self, width: i32, height: i32, anchor: Anchor) {
        let Some(window) = self.window else {
            return;
        };
        if self.host.window_is_popped_out(window) {
            return;
        }
        self.geometry = self.host.window_geometry(window);
        self.geometry.resize(width, height, anchor);
        if self.in_vr {
            self.host.set_window_geometry_vr(window, width, height);
        } else {
            self.host.set_window_geometry(window, self.geometry);
        }
    }

    /// Moves the window so its `anchor` point sits at `(x, y)`.
    pub fn place(&mut self, x: i32, y: i32, anchor: Anchor) {
        let Some(window) = self.window else {
            return;
        };
        if self.host.window_is_popped_out(window) {
            return;
        }
        self.geometry = self.host.window_geometry(window);
        self.geometry.place(x, y, anchor);
        if !self.check_screen_and_place() {
            self.host.set_window_geometry(window, self.geometry);
        }
    }

    /// Renames the native window and the default Dear ImGui window.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if let Some(window) = self.window {
            self.host.set_window_title(window, &self.title);
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Limits the size the user can drag the window to.
    pub fn set_resizing_limits(&mut self, limits: ResizingLimits) {
        if let Some(window) = self.window {
            self.host.set_window_resizing_limits(window, limits);
        }
    }

    /// Changes the positioning mode now. Inside a callback use
    /// [`ImgWindow::safe_positioning_mode`].
    pub fn set_positioning_mode(&mut self, mode: PositioningMode, monitor: i32) {
        if let Some(window) = self.window {
            self.host.set_window_positioning_mode(window, mode, monitor);
        }
    }

    /// How the window follows a resized screen.
    pub fn set_gravity(&mut self, gravity: Gravity) {
        if let Some(window) = self.window {
            self.host.set_window_gravity(window, gravity);
        }
    }

    /// Last known geometry in global boxels
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Native window handle; `None` once destroyed.
    pub fn window_id(&self) -> Option<WindowId> {
        self.window
    }

    /// `true` when created with [`ImgWindow::with_shared_font_atlas`].
    pub fn has_shared_font_atlas(&self) -> bool {
        self.has_shared_atlas
    }

    /// `true` once a deferred delete has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The delegate passed at creation
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Deletes the window at the next flight loop.
    pub fn safe_delete(&mut self) {
        self.pending.delete();
    }

    /// Hides the window at the next flight loop.
    pub fn safe_hide(&mut self) {
        self.pending.hide();
    }

    /// Resizes at the next flight loop, like [`ImgWindow::resize`].
    pub fn safe_resize(&mut self, width: i32, height: i32, anchor: Anchor) {
        self.pending.resize(width, height, anchor);
    }

    /// Moves at the next flight loop, like [`ImgWindow::place`].
    pub fn safe_place(&mut self, x: i32, y: i32, anchor: Anchor) {
        self.pending.place(x, y, anchor);
    }

    /// Changes the positioning mode at the next flight loop.
    pub fn safe_positioning_mode(&mut self, mode: PositioningMode, monitor: i32) {
        self.pending.positioning(mode, monitor);
    }
}

impl<D: WindowDelegate + 'static> WindowEvents for ImgWindow<D> {
    fn draw(&mut self) {
        let Some(window) = self.window else {
            return;
        };
        self.with_context(|this, ctx| this.draw_frame(ctx, window));
    }

    fn mouse_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool {
        self.handle_click(x, y, status, 0)
    }

    fn right_click(&mut self, x: i32, y: i32, status: MouseStatus) -> bool {
        self.handle_click(x, y, status, 1)
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

    fn cursor(&mut self, _x: i32, _y: i32) -> CursorStatus {
        CursorStatus::Default
    }

    fn mouse_wheel(&mut self, x: i32, y: i32, wheel: i32, clicks: i32) -> bool {
        self.with_context(|this, ctx| {
            let io = ctx.io_mut();
            io.add_mouse_pos_event(this.geometry.to_imgui(x, y));
            forward_wheel(io, wheel, clicks);
        });
        true
    }
}

impl<D: WindowDelegate + 'static> FlightLoopHandler for ImgWindow<D> {
    fn flight_loop(&mut self, _since_last_call: f32, _since_last_loop: f32, _counter: i32) -> f32 {
        for action in self.pending.drain() {
            self.apply(action);
        }
        -1.0
    }
}

impl<D: WindowDelegate + 'static> Drop for ImgWindow<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
