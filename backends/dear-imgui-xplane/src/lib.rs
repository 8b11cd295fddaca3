//! X-Plane plugin backend for Dear ImGui
//!
//! This crate hosts Dear ImGui inside X-Plane 11/12 plugin windows. It
//! creates native windows through the plugin SDK, forwards their input
//! callbacks into Dear ImGui and renders the resulting draw data into the
//! framebuffer the simulator has bound.
//!
//! # Features
//!
//! - **Single windows**: [`ImgWindow`] owns one native window and one Dear
//!   ImGui context, with deferred (`safe_*`) window operations
//! - **Multi-viewport**: [`MultiViewport`] maps every Dear ImGui viewport to
//!   its own native window (feature `multi-viewport`)
//! - **SDK binding**: [`xplm::XplmHost`] and a logger writing to `Log.txt`
//!   (feature `xplm`)
//! - **Clipboard**: system clipboard for text widgets (feature `clipboard`)
//!
//! # Example
//!
//! ```rust,ignore
//! use dear_imgui_xplane::{GlowRenderer, ImgWindow, WindowDelegate, WindowFrame, WindowOptions};
//! use dear_imgui_xplane::xplm::{XplmHost, init_logging};
//!
//! struct Hello;
//!
//! impl WindowDelegate for Hello {
//!     fn build(&mut self, ui: &dear_imgui_rs::Ui, frame: &mut WindowFrame<'_>) {
//!         ui.text("Hello from the cockpit");
//!         if ui.button("Close") {
//!             frame.safe_delete();
//!         }
//!     }
//! }
//!
//! // In XPluginEnable:
//! init_logging(log::LevelFilter::Info).ok();
//! let host = XplmHost::new()?;
//! let gl = std::rc::Rc::new(unsafe { glow::Context::from_loader_function(load_gl) });
//! let renderer = GlowRenderer::new(gl)?;
//! let mut window = ImgWindow::new(
//!     host,
//!     Box::new(renderer),
//!     Hello,
//!     WindowOptions::new().size(320, 200).title("Hello"),
//! )?;
//! window.set_visible(true);
//! ```

pub use glow;

#[cfg(feature = "clipboard")]
mod clipboard;
mod deferred;
mod error;
mod geometry;
mod host;
mod input;
#[cfg(feature = "multi-viewport")]
mod multi_viewport;
mod renderer;
mod scene;
mod shaders;
mod state;
#[cfg(test)]
mod test_util;
mod window;

#[cfg(feature = "xplm")]
pub mod xplm;

#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;
pub use deferred::{DeferredAction, PendingActions};
pub use error::*;
pub use geometry::{Anchor, WindowGeometry};
pub use host::*;
pub use input::{KeyFlags, forward_key, forward_mouse_button, forward_wheel, mouse_button, vk_to_imgui_key};
#[cfg(feature = "multi-viewport")]
pub use multi_viewport::{MultiViewport, ViewportDelegate};
pub use renderer::{FrameRenderer, GlowRenderer, RenderTarget, configure_backend_flags};
pub use scene::SceneMatrices;
pub use window::{
    DEFAULT_TITLE, FULL_WINDOW_FLAGS, ImgWindow, WindowDelegate, WindowFrame, WindowOptions,
};
