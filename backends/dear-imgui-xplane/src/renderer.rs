//! Draw data renderer
//!
//! [`GlowRenderer`] draws Dear ImGui output into whatever framebuffer the
//! simulator has bound when a window's draw callback fires. Textures are
//! named through the simulator (`XPLMGenerateTextureNumbers`) and bound with
//! `XPLMBindTexture2d` so its texture cache stays coherent.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::rc::Rc;

use dear_imgui_rs::render::{DrawCmd, DrawData, DrawIdx, DrawVert};
use dear_imgui_rs::{BackendFlags, Context, sys};
use dear_imgui_rs::{TextureData, TextureFormat, TextureId, TextureStatus};
use glow::HasContext;

use crate::error::{InitError, InitResult, RenderError, RenderResult};
use crate::geometry::WindowGeometry;
use crate::host::{GraphicsState, Host};
use crate::scene::SceneMatrices;
use crate::shaders::Shaders;
use crate::state::GlStateBackup;

/// Where a frame lands: the window's global boxel rectangle and the
/// simulator matrices in effect while it draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub geometry: WindowGeometry,
    pub scene: SceneMatrices,
}

/// Renders finished Dear ImGui frames on behalf of a window
pub trait FrameRenderer {
    /// Announce the renderer's capabilities to a freshly created context.
    fn configure_context(&mut self, imgui_context: &mut Context) {
        configure_backend_flags(imgui_context);
    }

    /// Textures of a font atlas shared with other contexts belong to the
    /// atlas, not to this renderer, and survive [`FrameRenderer::destroy`].
    fn set_shared_font_atlas(&mut self, _shared: bool) {}

    fn render(
        &mut self,
        host: &dyn Host,
        target: &RenderTarget,
        draw_data: &DrawData,
    ) -> RenderResult<()>;

    fn destroy(&mut self, host: &dyn Host);
}

/// Sets the renderer backend flags every [`FrameRenderer`] supports.
pub fn configure_backend_flags(imgui_context: &mut Context) {
    let _ = imgui_context.set_renderer_name(Some(format!(
        "dear-imgui-xplane {}",
        env!("CARGO_PKG_VERSION")
    )));

    let io = imgui_context.io_mut();
    let mut flags = io.backend_flags();
    flags.insert(BackendFlags::RENDERER_HAS_TEXTURES);
    #[cfg(feature = "multi-viewport")]
    flags.insert(BackendFlags::RENDERER_HAS_VIEWPORTS);
    io.set_backend_flags(flags);
}

/// OpenGL renderer using a GLSL 1.20 program
pub struct GlowRenderer {
    gl: Rc<glow::Context>,
    shaders: Shaders,
    vbo_handle: Option<glow::NativeBuffer>,
    ebo_handle: Option<glow::NativeBuffer>,
    state_backup: GlStateBackup,
    textures: HashSet<u32>,
    shared_font_atlas: bool,
    is_destroyed: bool,
}

impl GlowRenderer {
    /// Creates the shader program and buffers. Must be called with the
    /// simulator's context current, i.e. from a plugin callback.
    pub fn new(gl: Rc<glow::Context>) -> InitResult<Self> {
        let shaders = Shaders::new(&gl)?;
        let (vbo_handle, ebo_handle) = unsafe {
            let vbo = gl.create_buffer().map_err(InitError::CreateBufferObject)?;
            let ebo = match gl.create_buffer() {
                Ok(ebo) => ebo,
                Err(err) => {
                    gl.delete_buffer(vbo);
                    return Err(InitError::CreateBufferObject(err));
                }
            };
            (vbo, ebo)
        };

        Ok(Self {
            gl,
            shaders,
            vbo_handle: Some(vbo_handle),
            ebo_handle: Some(ebo_handle),
            state_backup: GlStateBackup::default(),
            textures: HashSet::new(),
            shared_font_atlas: false,
            is_destroyed: false,
        })
    }

    pub fn gl_context(&self) -> &Rc<glow::Context> {
        &self.gl
    }

    /// Number of textures this renderer created and still owns
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn update_textures(&mut self, host: &dyn Host, draw_data: &DrawData) -> RenderResult<()> {
        for mut td in draw_data.textures() {
            let texture = u32::try_from(td.tex_id().id()).unwrap_or(0);
            let owned = self.textures.contains(&texture);

            match texture_action(td.status(), texture, owned) {
                TextureAction::Create => {
                    self.create_texture(host, &mut td)?;
                }
                TextureAction::Update(texture) => {
                    self.update_texture(host, texture, &td);
                    td.set_status(TextureStatus::OK);
                }
                TextureAction::Destroy { delete } => {
                    if let Some(texture) = delete {
                        self.delete_texture(texture);
                    }
                    unsafe {
                        (*td.as_raw_mut()).WantDestroyNextFrame = true;
                    }
                    td.set_status(TextureStatus::Destroyed);
                }
                TextureAction::Keep => {}
            }
        }
        Ok(())
    }

    fn create_texture(&mut self, host: &dyn Host, td: &mut TextureData) -> RenderResult<()> {
        let (width, height) = (td.width() as u32, td.height() as u32);
        let Some(pixels) = texture_data_to_rgba_subrect(td, 0, 0, width, height) else {
            return Ok(());
        };

        let texture = host.generate_texture_number();
        if texture == 0 {
            return Err(RenderError::OpenGl(
                "simulator returned texture number 0".to_string(),
            ));
        }
        host.bind_texture_2d(texture, 0);

        let gl = &self.gl;
        unsafe {
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&pixels)),
            );
        }

        log::trace!(target: "dear-imgui-xplane", "created texture {texture} ({width}x{height})");
        self.textures.insert(texture);
        td.set_tex_id(TextureId::from(u64::from(texture)));
        td.set_status(TextureStatus::OK);
        Ok(())
    }

    fn update_texture(&self, host: &dyn Host, texture: u32, td: &TextureData) {
        let (tw, th) = (td.width() as u32, td.height() as u32);
        let (x, y, w, h) = clamp_rect(td.update_rect(), tw, th);
        if w == 0 || h == 0 {
            return;
        }
        let Some(pixels) = texture_data_to_rgba_subrect(td, x, y, w, h) else {
            return;
        };

        host.bind_texture_2d(texture, 0);
        unsafe {
            self.gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                x as i32,
                y as i32,
                w as i32,
                h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&pixels)),
            );
        }
    }

    fn delete_texture(&mut self, texture: u32) {
        if self.textures.remove(&texture)
            && let Some(name) = NonZeroU32::new(texture)
        {
            unsafe { self.gl.delete_texture(glow::NativeTexture(name)) };
        }
    }

    fn set_up_render_state(&self, host: &dyn Host, target: &RenderTarget, draw_data: &DrawData) {
        host.set_graphics_state(GraphicsState::GUI);

        let gl = &self.gl;
        unsafe {
            gl.enable(glow::BLEND);
            gl.blend_equation(glow::FUNC_ADD);
            gl.blend_func_separate(
                glow::SRC_ALPHA,
                glow::ONE_MINUS_SRC_ALPHA,
                glow::ONE,
                glow::ONE_MINUS_SRC_ALPHA,
            );
            gl.disable(glow::CULL_FACE);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::STENCIL_TEST);
            gl.enable(glow::SCISSOR_TEST);

            let mvp = target
                .scene
                .imgui_mvp(&target.geometry, draw_data.display_pos);

            gl.use_program(self.shaders.program);
            if let Some(location) = &self.shaders.location_tex {
                gl.uniform_1_i32(Some(location), 0);
            }
            if let Some(location) = &self.shaders.location_proj_mtx {
                gl.uniform_matrix_4_f32_slice(Some(location), false, &mvp);
            }

            gl.bind_buffer(glow::ARRAY_BUFFER, self.vbo_handle);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, self.ebo_handle);
            for location in self.shaders.attrib_locations() {
                gl.enable_vertex_attrib_array(location);
            }

            let stride = size_of::<DrawVert>() as i32;
            gl.vertex_attrib_pointer_f32(
                self.shaders.location_vtx_pos,
                2,
                glow::FLOAT,
                false,
                stride,
                memoffset::offset_of!(DrawVert, pos) as i32,
            );
            gl.vertex_attrib_pointer_f32(
                self.shaders.location_vtx_uv,
                2,
                glow::FLOAT,
                false,
                stride,
                memoffset::offset_of!(DrawVert, uv) as i32,
            );
            // Packed RGBA bytes
            gl.vertex_attrib_pointer_f32(
                self.shaders.location_vtx_color,
                4,
                glow::UNSIGNED_BYTE,
                true,
                stride,
                memoffset::offset_of!(DrawVert, col) as i32,
            );
        }
    }

    fn render_draw_lists(
        &self,
        host: &dyn Host,
        target: &RenderTarget,
        draw_data: &DrawData,
    ) -> RenderResult<()> {
        let gl = &self.gl;
        for draw_list in draw_data.draw_lists() {
            unsafe {
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    to_byte_slice(draw_list.vtx_buffer()),
                    glow::STREAM_DRAW,
                );
                gl.buffer_data_u8_slice(
                    glow::ELEMENT_ARRAY_BUFFER,
                    to_byte_slice(draw_list.idx_buffer()),
                    glow::STREAM_DRAW,
                );
            }

            for command in draw_list.commands() {
                match command {
                    DrawCmd::Elements {
                        count,
                        cmd_params,
                        raw_cmd,
                    } => {
                        let tex_id = resolve_effective_texture_id(cmd_params.texture_id, raw_cmd);
                        let texture = u32::try_from(tex_id.id())
                            .map_err(|_| RenderError::InvalidTexture(tex_id.id() as u64))?;

                        let Some(clip) = clip_to_window(cmd_params.clip_rect, draw_data.display_pos)
                        else {
                            continue;
                        };

                        host.bind_texture_2d(texture, 0);
                        let [x, y, w, h] = target.scene.scissor_for_clip_rect(&target.geometry, clip);
                        unsafe {
                            gl.scissor(x, y, w, h);
                            gl.draw_elements(
                                glow::TRIANGLES,
                                count as i32,
                                glow::UNSIGNED_SHORT,
                                (cmd_params.idx_offset * size_of::<DrawIdx>()) as i32,
                            );
                        }
                    }
                    DrawCmd::ResetRenderState => {
                        self.set_up_render_state(host, target, draw_data);
                    }
                    DrawCmd::RawCallback { .. } => {
                        // Skip raw callbacks.
                    }
                }
            }
        }
        Ok(())
    }
}

impl FrameRenderer for GlowRenderer {
    fn set_shared_font_atlas(&mut self, shared: bool) {
        self.shared_font_atlas = shared;
    }

    fn render(
        &mut self,
        host: &dyn Host,
        target: &RenderTarget,
        draw_data: &DrawData,
    ) -> RenderResult<()> {
        if self.is_destroyed {
            return Err(RenderError::RendererDestroyed);
        }
        if !(draw_data.display_size[0] > 0.0 && draw_data.display_size[1] > 0.0) {
            return Ok(());
        }

        self.update_textures(host, draw_data)?;

        self.state_backup
            .backup(&self.gl, &self.shaders.attrib_locations());
        self.set_up_render_state(host, target, draw_data);
        let result = self.render_draw_lists(host, target, draw_data);

        unsafe {
            for location in self.shaders.attrib_locations() {
                self.gl.disable_vertex_attrib_array(location);
            }
        }
        self.state_backup.restore(&self.gl);
        result
    }

    fn destroy(&mut self, _host: &dyn Host) {
        if self.is_destroyed {
            return;
        }
        let gl = &self.gl;
        unsafe {
            if let Some(vbo) = self.vbo_handle.take() {
                gl.delete_buffer(vbo);
            }
            if let Some(ebo) = self.ebo_handle.take() {
                gl.delete_buffer(ebo);
            }
        }
        self.shaders.destroy(gl);

        if self.shared_font_atlas {
            self.textures.clear();
        } else {
            for texture in std::mem::take(&mut self.textures) {
                if let Some(name) = NonZeroU32::new(texture) {
                    unsafe { gl.delete_texture(glow::NativeTexture(name)) };
                }
            }
        }
        self.is_destroyed = true;
    }
}

impl Drop for GlowRenderer {
    fn drop(&mut self) {
        if !self.is_destroyed {
            log::warn!(target: "dear-imgui-xplane", "GlowRenderer dropped without destroy(); GL objects leaked");
        }
    }
}

/// What [`GlowRenderer`] does with one entry of the texture list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureAction {
    Create,
    /// Upload the update rectangle into an existing host texture.
    Update(u32),
    /// Mark the texture destroyed, deleting the GL name only when this
    /// renderer created it.
    Destroy { delete: Option<u32> },
    Keep,
}

/// Texture numbers are global to the simulator, so a texture created by
/// another window's renderer (shared font atlas) is updated in place rather
/// than created again.
fn texture_action(status: TextureStatus, texture: u32, owned: bool) -> TextureAction {
    match status {
        TextureStatus::WantCreate => TextureAction::Create,
        TextureStatus::WantUpdates if texture == 0 => TextureAction::Create,
        TextureStatus::WantUpdates => TextureAction::Update(texture),
        TextureStatus::WantDestroy => TextureAction::Destroy {
            delete: (owned && texture != 0).then_some(texture),
        },
        TextureStatus::OK | TextureStatus::Destroyed => TextureAction::Keep,
    }
}

fn to_byte_slice<T>(slice: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

fn resolve_effective_texture_id(legacy: TextureId, raw_cmd: *const sys::ImDrawCmd) -> TextureId {
    if raw_cmd.is_null() {
        return legacy;
    }
    unsafe {
        let mut copy = *raw_cmd;
        TextureId::from(sys::ImDrawCmd_GetTexID(&mut copy))
    }
}

/// Moves a clip rectangle into window space; `None` when it is empty.
fn clip_to_window(clip_rect: [f32; 4], display_pos: [f32; 2]) -> Option<[f32; 4]> {
    let clip = [
        clip_rect[0] - display_pos[0],
        clip_rect[1] - display_pos[1],
        clip_rect[2] - display_pos[0],
        clip_rect[3] - display_pos[1],
    ];
    if clip[2] <= clip[0] || clip[3] <= clip[1] {
        return None;
    }
    Some(clip)
}

fn texture_data_to_rgba_subrect(
    td: &TextureData,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Option<Vec<u8>> {
    let pixels = td.pixels()?;
    rgba_subrect(
        pixels,
        td.format(),
        td.width() as usize,
        td.height() as usize,
        [x as usize, y as usize, w as usize, h as usize],
    )
}

/// Copies `[x, y, w, h]` out of a tightly packed texture as RGBA8.
/// Alpha8 texels expand to white with the texel as alpha.
fn rgba_subrect(
    pixels: &[u8],
    format: TextureFormat,
    tex_w: usize,
    tex_h: usize,
    [x, y, w, h]: [usize; 4],
) -> Option<Vec<u8>> {
    if tex_w == 0 || tex_h == 0 || w == 0 || h == 0 || x >= tex_w || y >= tex_h {
        return None;
    }
    let w = w.min(tex_w - x);
    let h = h.min(tex_h - y);
    let bpp = match format {
        TextureFormat::RGBA32 => 4,
        TextureFormat::Alpha8 => 1,
    };
    if pixels.len() < tex_w * tex_h * bpp {
        return None;
    }

    let mut out = vec![0u8; w.checked_mul(h)?.checked_mul(4)?];
    for row in 0..h {
        let src_off = ((y + row) * tex_w + x) * bpp;
        let dst_off = row * w * 4;
        match format {
            TextureFormat::RGBA32 => {
                out[dst_off..dst_off + w * 4].copy_from_slice(&pixels[src_off..src_off + w * 4]);
            }
            TextureFormat::Alpha8 => {
                for col in 0..w {
                    let o = dst_off + col * 4;
                    out[o..o + 4].copy_from_slice(&[255, 255, 255, pixels[src_off + col]]);
                }
            }
        }
    }
    Some(out)
}

fn clamp_rect(rect: dear_imgui_rs::texture::TextureRect, tw: u32, th: u32) -> (u32, u32, u32, u32) {
    let x = u32::from(rect.x).min(tw);
    let y = u32::from(rect.y).min(th);
    let w = u32::from(rect.w);
    let h = u32::from(rect.h);
    if w == 0 || h == 0 || x >= tw || y >= th {
        return (x, y, 0, 0);
    }
    (x, y, w.min(tw - x), h.min(th - y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dear_imgui_rs::texture::TextureRect;
    use pretty_assertions::assert_eq;

    #[test]
    fn texture_from_another_renderer_is_updated_in_place() {
        assert_eq!(
            texture_action(TextureStatus::WantUpdates, 7, false),
            TextureAction::Update(7)
        );
        assert_eq!(
            texture_action(TextureStatus::WantUpdates, 7, true),
            TextureAction::Update(7)
        );
        assert_eq!(
            texture_action(TextureStatus::WantUpdates, 0, false),
            TextureAction::Create
        );
        assert_eq!(
            texture_action(TextureStatus::WantCreate, 0, false),
            TextureAction::Create
        );
    }

    #[test]
    fn only_owned_textures_are_deleted() {
        assert_eq!(
            texture_action(TextureStatus::WantDestroy, 7, true),
            TextureAction::Destroy { delete: Some(7) }
        );
        assert_eq!(
            texture_action(TextureStatus::WantDestroy, 7, false),
            TextureAction::Destroy { delete: None }
        );
        assert_eq!(
            texture_action(TextureStatus::OK, 7, true),
            TextureAction::Keep
        );
    }

    #[test]
    fn alpha8_expands_to_white() {
        let pixels = [0u8, 64, 128, 255];
        let out = rgba_subrect(&pixels, TextureFormat::Alpha8, 2, 2, [1, 0, 1, 2]).unwrap();
        assert_eq!(out, vec![255, 255, 255, 64, 255, 255, 255, 255]);
    }

    #[test]
    fn rgba_subrect_copies_rows() {
        let pixels: Vec<u8> = (0..16u8).collect();
        // 2x2 texture, take the bottom row
        let out = rgba_subrect(&pixels, TextureFormat::RGBA32, 2, 2, [0, 1, 2, 1]).unwrap();
        assert_eq!(out, (8..16u8).collect::<Vec<_>>());
    }

    #[test]
    fn subrect_outside_texture_is_rejected() {
        let pixels = [0u8; 4];
        assert!(rgba_subrect(&pixels, TextureFormat::Alpha8, 2, 2, [2, 0, 1, 1]).is_none());
        assert!(rgba_subrect(&pixels, TextureFormat::Alpha8, 2, 2, [0, 0, 0, 1]).is_none());
        // Short pixel buffer
        assert!(rgba_subrect(&pixels, TextureFormat::RGBA32, 2, 2, [0, 0, 1, 1]).is_none());
    }

    #[test]
    fn update_rect_is_clamped() {
        let rect = TextureRect {
            x: 60,
            y: 10,
            w: 10,
            h: 10,
        };
        assert_eq!(clamp_rect(rect, 64, 64), (60, 10, 4, 10));

        let outside = TextureRect {
            x: 70,
            y: 0,
            w: 4,
            h: 4,
        };
        assert_eq!(clamp_rect(outside, 64, 64), (64, 0, 0, 0));
    }

    #[test]
    fn empty_clip_rect_is_skipped() {
        assert_eq!(clip_to_window([10.0, 10.0, 10.0, 20.0], [0.0, 0.0]), None);
        assert_eq!(
            clip_to_window([110.0, 220.0, 150.0, 260.0], [100.0, 200.0]),
            Some([10.0, 20.0, 50.0, 60.0])
        );
    }
}
