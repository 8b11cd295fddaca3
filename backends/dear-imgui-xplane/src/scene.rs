//! Simulator scene matrices and the boxel to framebuffer mapping
//!
//! While a window draw callback runs, X-Plane has already set up a projection
//! that maps boxels onto the current framebuffer. The backend reads the same
//! matrices through datarefs so it can compute native scissor rectangles and
//! feed its shader an equivalent transform.

use crate::geometry::WindowGeometry;

pub type Mat4 = [f32; 16];

pub const IDENTITY: Mat4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Column-major `m * v`.
#[inline]
pub fn mult_matrix_vec4(m: &Mat4, v: [f32; 4]) -> [f32; 4] {
    let mut out = [0.0; 4];
    for (i, o) in out.iter_mut().enumerate() {
        *o = v[0] * m[i] + v[1] * m[4 + i] + v[2] * m[8 + i] + v[3] * m[12 + i];
    }
    out
}

/// Column-major `a * b`.
pub fn mult_matrix(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0; 16];
    for col in 0..4 {
        let column = [b[col * 4], b[col * 4 + 1], b[col * 4 + 2], b[col * 4 + 3]];
        out[col * 4..col * 4 + 4].copy_from_slice(&mult_matrix_vec4(a, column));
    }
    out
}

/// Modelview, projection and viewport as published by the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneMatrices {
    pub modelview: Mat4,
    pub projection: Mat4,
    /// `[x, y, width, height]` in framebuffer pixels
    pub viewport: [i32; 4],
}

impl Default for SceneMatrices {
    fn default() -> Self {
        Self {
            modelview: IDENTITY,
            projection: IDENTITY,
            viewport: [0, 0, 0, 0],
        }
    }
}

impl SceneMatrices {
    /// Matrices that map `width` x `height` boxels onto `viewport`.
    pub fn orthographic(width: f32, height: f32, viewport: [i32; 4]) -> Self {
        let mut projection = IDENTITY;
        projection[0] = 2.0 / width;
        projection[5] = 2.0 / height;
        projection[10] = -1.0;
        projection[12] = -1.0;
        projection[13] = -1.0;
        Self {
            modelview: IDENTITY,
            projection,
            viewport,
        }
    }

    /// Maps a global boxel position to framebuffer pixels, rounded to the nearest pixel.
    pub fn boxels_to_native(&self, x: i32, y: i32) -> (i32, i32) {
        let eye = mult_matrix_vec4(&self.modelview, [x as f32, y as f32, 0.0, 1.0]);
        let clip = mult_matrix_vec4(&self.projection, eye);
        let inv_w = 1.0 / clip[3];
        let ndc_x = clip[0] * inv_w;
        let ndc_y = clip[1] * inv_w;
        let [vx, vy, vw, vh] = self.viewport;
        (
            ((ndc_x * 0.5 + 0.5) * vw as f32 + vx as f32).round() as i32,
            ((ndc_y * 0.5 + 0.5) * vh as f32 + vy as f32).round() as i32,
        )
    }

    /// Native `glScissor` box `[x, y, width, height]` for a Dear ImGui clip rectangle.
    pub fn scissor_for_clip_rect(&self, geometry: &WindowGeometry, clip_rect: [f32; 4]) -> [i32; 4] {
        let (left, top) = geometry.imgui_to_boxel(clip_rect[0], clip_rect[1]);
        let (right, bottom) = geometry.imgui_to_boxel(clip_rect[2], clip_rect[3]);
        let (n_left, n_top) = self.boxels_to_native(left, top);
        let (n_right, n_bottom) = self.boxels_to_native(right, bottom);
        [n_left, n_bottom, n_right - n_left, n_top - n_bottom]
    }

    /// Transform from Dear ImGui window space straight to clip space.
    ///
    /// Equivalent to the simulator's own projection and modelview applied
    /// after flipping y and moving `origin` (the draw data's display position)
    /// to the window's top left corner.
    pub fn imgui_mvp(&self, geometry: &WindowGeometry, origin: [f32; 2]) -> Mat4 {
        let left = geometry.left as f32 - origin[0];
        let top = geometry.top as f32 + origin[1];
        let to_boxels: Mat4 = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, -1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            left, top, 0.0, 1.0,
        ];
        mult_matrix(&self.projection, &mult_matrix(&self.modelview, &to_boxels))
    }
}
