//! Shader program for Dear ImGui rendering
//!
//! X-Plane hands plugins a compatibility profile context (2.1 on macOS), so
//! the program sticks to GLSL 1.20 with `attribute`/`varying`.

use glow::{Context, HasContext};

use crate::error::{InitError, InitResult};

const VERTEX_SHADER: &str = r#"#version 120
uniform mat4 ProjMtx;
attribute vec2 Position;
attribute vec2 UV;
attribute vec4 Color;
varying vec2 Frag_UV;
varying vec4 Frag_Color;
void main()
{
    Frag_UV = UV;
    Frag_Color = Color;
    gl_Position = ProjMtx * vec4(Position.xy, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 120
uniform sampler2D Texture;
varying vec2 Frag_UV;
varying vec4 Frag_Color;
void main()
{
    gl_FragColor = Frag_Color * texture2D(Texture, Frag_UV.st);
}
"#;

/// Shader program and its uniform/attribute locations
pub struct Shaders {
    pub program: Option<glow::NativeProgram>,
    pub location_tex: Option<glow::NativeUniformLocation>,
    pub location_proj_mtx: Option<glow::NativeUniformLocation>,
    pub location_vtx_pos: u32,
    pub location_vtx_uv: u32,
    pub location_vtx_color: u32,
}

impl Shaders {
    pub fn new(gl: &Context) -> InitResult<Self> {
        unsafe {
            let vertex_shader = compile(gl, glow::VERTEX_SHADER, VERTEX_SHADER, "Vertex")?;
            let fragment_shader =
                match compile(gl, glow::FRAGMENT_SHADER, FRAGMENT_SHADER, "Fragment") {
                    Ok(shader) => shader,
                    Err(err) => {
                        gl.delete_shader(vertex_shader);
                        return Err(err);
                    }
                };

            let program = gl.create_program().map_err(InitError::CreateShader)?;
            gl.attach_shader(program, vertex_shader);
            gl.attach_shader(program, fragment_shader);
            gl.link_program(program);

            gl.detach_shader(program, vertex_shader);
            gl.detach_shader(program, fragment_shader);
            gl.delete_shader(vertex_shader);
            gl.delete_shader(fragment_shader);

            if !gl.get_program_link_status(program) {
                let error = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(InitError::LinkProgram(error));
            }

            let attrib = |name: &str| {
                gl.get_attrib_location(program, name)
                    .ok_or_else(|| InitError::Generic(format!("Could not find {name} attribute")))
            };
            let location_vtx_pos = attrib("Position")?;
            let location_vtx_uv = attrib("UV")?;
            let location_vtx_color = attrib("Color")?;

            Ok(Self {
                program: Some(program),
                location_tex: gl.get_uniform_location(program, "Texture"),
                location_proj_mtx: gl.get_uniform_location(program, "ProjMtx"),
                location_vtx_pos,
                location_vtx_uv,
                location_vtx_color,
            })
        }
    }

    pub fn attrib_locations(&self) -> [u32; 3] {
        [
            self.location_vtx_pos,
            self.location_vtx_uv,
            self.location_vtx_color,
        ]
    }

    pub fn destroy(&mut self, gl: &Context) {
        if let Some(program) = self.program.take() {
            unsafe { gl.delete_program(program) };
        }
    }
}

unsafe fn compile(
    gl: &Context,
    kind: u32,
    source: &str,
    label: &str,
) -> InitResult<glow::NativeShader> {
    unsafe {
        let shader = gl.create_shader(kind).map_err(InitError::CreateShader)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let error = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(InitError::CompileShader(format!("{label} shader: {error}")));
        }
        Ok(shader)
    }
}
