//! OpenGL state backup and restoration
//!
//! The simulator keeps drawing with the same context after a window callback
//! returns, so everything the renderer touches beyond what
//! `XPLMSetGraphicsState` manages is saved and put back.

use std::num::NonZeroU32;

use glow::{Context, HasContext};

fn native_buffer(name: i32) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(name as u32).map(glow::NativeBuffer)
}

fn native_program(name: i32) -> Option<glow::NativeProgram> {
    NonZeroU32::new(name as u32).map(glow::NativeProgram)
}

#[derive(Default)]
pub struct GlStateBackup {
    blend_src_rgb: u32,
    blend_dst_rgb: u32,
    blend_src_alpha: u32,
    blend_dst_alpha: u32,
    blend_equation_rgb: u32,
    blend_equation_alpha: u32,

    scissor_test_enabled: bool,
    scissor_box: [i32; 4],

    array_buffer_binding: Option<glow::NativeBuffer>,
    element_array_buffer_binding: Option<glow::NativeBuffer>,

    active_texture: u32,
    current_program: Option<glow::NativeProgram>,

    cull_face_enabled: bool,
    stencil_test_enabled: bool,

    // (location, was enabled)
    vertex_attribs: Vec<(u32, bool)>,
}

impl GlStateBackup {
    /// Backup OpenGL state before rendering
    pub fn backup(&mut self, gl: &Context, attrib_locations: &[u32]) {
        unsafe {
            self.blend_src_rgb = gl.get_parameter_i32(glow::BLEND_SRC_RGB) as u32;
            self.blend_dst_rgb = gl.get_parameter_i32(glow::BLEND_DST_RGB) as u32;
            self.blend_src_alpha = gl.get_parameter_i32(glow::BLEND_SRC_ALPHA) as u32;
            self.blend_dst_alpha = gl.get_parameter_i32(glow::BLEND_DST_ALPHA) as u32;
            self.blend_equation_rgb = gl.get_parameter_i32(glow::BLEND_EQUATION_RGB) as u32;
            self.blend_equation_alpha = gl.get_parameter_i32(glow::BLEND_EQUATION_ALPHA) as u32;

            self.scissor_test_enabled = gl.is_enabled(glow::SCISSOR_TEST);
            gl.get_parameter_i32_slice(glow::SCISSOR_BOX, &mut self.scissor_box);

            self.array_buffer_binding =
                native_buffer(gl.get_parameter_i32(glow::ARRAY_BUFFER_BINDING));
            self.element_array_buffer_binding =
                native_buffer(gl.get_parameter_i32(glow::ELEMENT_ARRAY_BUFFER_BINDING));

            self.active_texture = gl.get_parameter_i32(glow::ACTIVE_TEXTURE) as u32;
            self.current_program = native_program(gl.get_parameter_i32(glow::CURRENT_PROGRAM));

            self.cull_face_enabled = gl.is_enabled(glow::CULL_FACE);
            self.stencil_test_enabled = gl.is_enabled(glow::STENCIL_TEST);

            self.vertex_attribs.clear();
            for &location in attrib_locations {
                let mut enabled = [0.0f32; 4];
                gl.get_vertex_attrib_parameter_f32_slice(
                    location,
                    glow::VERTEX_ATTRIB_ARRAY_ENABLED,
                    &mut enabled,
                );
                self.vertex_attribs.push((location, enabled[0] != 0.0));
            }
        }
    }

    /// Restore OpenGL state after rendering
    pub fn restore(&self, gl: &Context) {
        unsafe {
            for &(location, enabled) in &self.vertex_attribs {
                if enabled {
                    gl.enable_vertex_attrib_array(location);
                } else {
                    gl.disable_vertex_attrib_array(location);
                }
            }

            gl.use_program(self.current_program);
            gl.active_texture(self.active_texture);

            gl.bind_buffer(glow::ARRAY_BUFFER, self.array_buffer_binding);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, self.element_array_buffer_binding);

            gl.blend_equation_separate(self.blend_equation_rgb, self.blend_equation_alpha);
            gl.blend_func_separate(
                self.blend_src_rgb,
                self.blend_dst_rgb,
                self.blend_src_alpha,
                self.blend_dst_alpha,
            );

            set_capability(gl, glow::CULL_FACE, self.cull_face_enabled);
            set_capability(gl, glow::STENCIL_TEST, self.stencil_test_enabled);
            set_capability(gl, glow::SCISSOR_TEST, self.scissor_test_enabled);
            gl.scissor(
                self.scissor_box[0],
                self.scissor_box[1],
                self.scissor_box[2],
                self.scissor_box[3],
            );
        }
    }
}

unsafe fn set_capability(gl: &Context, capability: u32, enabled: bool) {
    unsafe {
        if enabled {
            gl.enable(capability);
        } else {
            gl.disable(capability);
        }
    }
}
