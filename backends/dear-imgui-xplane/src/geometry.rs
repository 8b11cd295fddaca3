//! Window rectangles in simulator boxel space
//!
//! X-Plane describes native windows by their four edges in global desktop
//! boxels with the origin at the bottom left and y growing upwards. Dear ImGui
//! works top-down relative to the window's own top left corner. This module
//! holds the rectangle type and the conversions between the two spaces.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which point of the window a position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Anchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Edges of a window in global boxels (y up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowGeometry {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowGeometry {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a rectangle of the given size whose `anchor` point sits at `(x, y)`.
    pub fn anchored(width: i32, height: i32, x: i32, y: i32, anchor: Anchor) -> Self {
        let mut geometry = Self::new(0, height, width, 0);
        geometry.place(x, y, anchor);
        geometry
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.top - self.bottom
    }

    /// Moves the rectangle so that its `anchor` point sits at `(x, y)`, keeping its size.
    pub fn place(&mut self, x: i32, y: i32, anchor: Anchor) {
        let (width, height) = (self.width(), self.height());
        match anchor {
            Anchor::TopLeft => {
                self.left = x;
                self.top = y;
            }
            Anchor::TopRight => {
                self.left = x - width;
                self.top = y;
            }
            Anchor::BottomLeft => {
                self.left = x;
                self.top = y + height;
            }
            Anchor::BottomRight => {
                self.left = x - width;
                self.top = y + height;
            }
            Anchor::Center => {
                self.left = x - width / 2;
                self.top = y + height / 2;
            }
        }
        self.right = self.left + width;
        self.bottom = self.top - height;
    }

    /// Changes the size while keeping the `anchor` point where it is.
    pub fn resize(&mut self, width: i32, height: i32, anchor: Anchor) {
        match anchor {
            Anchor::TopLeft => {
                self.right = self.left + width;
                self.bottom = self.top - height;
            }
            Anchor::TopRight => {
                self.left = self.right - width;
                self.bottom = self.top - height;
            }
            Anchor::BottomLeft => {
                self.right = self.left + width;
                self.top = self.bottom + height;
            }
            Anchor::BottomRight => {
                self.left = self.right - width;
                self.top = self.bottom + height;
            }
            Anchor::Center => {
                self.left = (2 * self.left + self.width() - width) / 2;
                self.right = self.left + width;
                self.bottom = (2 * self.bottom + self.height() - height) / 2;
                self.top = self.bottom + height;
            }
        }
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.left += dx;
        self.right += dx;
        self.top += dy;
        self.bottom += dy;
    }

    /// Pulls a freshly created window back onto the screen.
    ///
    /// Any edge lying outside the screen on either side moves the window so
    /// that this edge lines up with the screen border.
    pub fn fit_into(&mut self, screen: &WindowGeometry) {
        let (width, height) = (self.width(), self.height());
        if self.left < screen.left || self.left > screen.right {
            self.left = screen.left;
            self.right = screen.left + width;
        }
        if self.right > screen.right || self.right < screen.left {
            self.right = screen.right;
            self.left = screen.right - width;
        }
        if self.bottom < screen.bottom || self.bottom > screen.top {
            self.bottom = screen.bottom;
            self.top = screen.bottom + height;
        }
        if self.top > screen.top || self.top < screen.bottom {
            self.top = screen.top;
            self.bottom = screen.top - height;
        }
    }

    /// Keeps a window inside the screen after the user or the simulator moved it.
    ///
    /// Returns `true` if the rectangle changed.
    pub fn clamp_into(&mut self, screen: &WindowGeometry) -> bool {
        let before = *self;
        let (width, height) = (self.width(), self.height());
        if self.left < screen.left {
            self.left = screen.left;
            self.right = screen.left + width;
        }
        if self.right > screen.right {
            self.right = screen.right;
            self.left = screen.right - width;
        }
        if self.bottom < screen.bottom {
            self.bottom = screen.bottom;
            self.top = screen.bottom + height;
        }
        if self.top > screen.top {
            self.top = screen.top;
            self.bottom = screen.top - height;
        }
        before != *self
    }

    /// Converts a global boxel position into Dear ImGui window space.
    ///
    /// Positions outside the window map to `-f32::MAX` on both axes, which
    /// Dear ImGui treats as "mouse not available".
    pub fn to_imgui(&self, x: i32, y: i32) -> [f32; 2] {
        let out_x = (x - self.left) as f32;
        let out_y = (self.top - y) as f32;
        if out_x < 0.0
            || out_x > self.width() as f32
            || out_y < 0.0
            || out_y > self.height() as f32
        {
            return [-f32::MAX, -f32::MAX];
        }
        [out_x, out_y]
    }

    /// Converts a Dear ImGui window-space position into global boxels.
    #[inline]
    pub fn imgui_to_boxel(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (self.left as f32 + x) as i32,
            (self.top as f32 - y) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCREEN: WindowGeometry = WindowGeometry::new(0, 1080, 1920, 0);

    #[test]
    fn anchored_places_each_corner() {
        assert_eq!(
            WindowGeometry::anchored(200, 100, 50, 500, Anchor::TopLeft),
            WindowGeometry::new(50, 500, 250, 400)
        );
        assert_eq!(
            WindowGeometry::anchored(200, 100, 50, 500, Anchor::TopRight),
            WindowGeometry::new(-150, 500, 50, 400)
        );
        assert_eq!(
            WindowGeometry::anchored(200, 100, 50, 500, Anchor::BottomLeft),
            WindowGeometry::new(50, 600, 250, 500)
        );
        assert_eq!(
            WindowGeometry::anchored(200, 100, 50, 500, Anchor::BottomRight),
            WindowGeometry::new(-150, 600, 50, 500)
        );
        assert_eq!(
            WindowGeometry::anchored(200, 100, 960, 540, Anchor::Center),
            WindowGeometry::new(860, 590, 1060, 490)
        );
    }

    #[test]
    fn place_keeps_size() {
        let mut g = WindowGeometry::new(10, 300, 110, 250);
        g.place(500, 500, Anchor::BottomRight);
        assert_eq!(g, WindowGeometry::new(400, 550, 500, 500));
        assert_eq!((g.width(), g.height()), (100, 50));
    }

    #[test]
    fn resize_keeps_anchor_fixed() {
        let base = WindowGeometry::new(100, 500, 300, 400);

        let mut g = base;
        g.resize(50, 20, Anchor::TopLeft);
        assert_eq!(g, WindowGeometry::new(100, 500, 150, 480));

        let mut g = base;
        g.resize(50, 20, Anchor::TopRight);
        assert_eq!(g, WindowGeometry::new(250, 500, 300, 480));

        let mut g = base;
        g.resize(50, 20, Anchor::BottomLeft);
        assert_eq!(g, WindowGeometry::new(100, 420, 150, 400));

        let mut g = base;
        g.resize(50, 20, Anchor::BottomRight);
        assert_eq!(g, WindowGeometry::new(250, 420, 300, 400));
    }

    #[test]
    fn resize_around_center() {
        let mut g = WindowGeometry::new(100, 500, 300, 400);
        g.resize(100, 50, Anchor::Center);
        assert_eq!(g, WindowGeometry::new(150, 475, 250, 425));
        g.resize(200, 100, Anchor::Center);
        assert_eq!(g, WindowGeometry::new(100, 500, 300, 400));
    }

    #[test]
    fn fit_into_moves_offscreen_window_back() {
        let mut g = WindowGeometry::anchored(300, 200, -50, 1200, Anchor::TopLeft);
        g.fit_into(&SCREEN);
        assert_eq!(g, WindowGeometry::new(0, 1080, 300, 880));

        let mut g = WindowGeometry::anchored(300, 200, 1900, 100, Anchor::TopLeft);
        g.fit_into(&SCREEN);
        assert_eq!(g, WindowGeometry::new(1620, 200, 1920, 0));
    }

    #[test]
    fn fit_into_leaves_onscreen_window_alone() {
        let mut g = WindowGeometry::new(100, 800, 400, 600);
        g.fit_into(&SCREEN);
        assert_eq!(g, WindowGeometry::new(100, 800, 400, 600));
    }

    #[test]
    fn clamp_into_reports_changes() {
        let mut g = WindowGeometry::new(100, 800, 400, 600);
        assert!(!g.clamp_into(&SCREEN));

        let mut g = WindowGeometry::new(1800, 1100, 2000, 1000);
        assert!(g.clamp_into(&SCREEN));
        assert_eq!(g, WindowGeometry::new(1720, 1080, 1920, 980));

        let mut g = WindowGeometry::new(-30, 40, 70, -10);
        assert!(g.clamp_into(&SCREEN));
        assert_eq!(g, WindowGeometry::new(0, 50, 100, 0));
    }

    #[test]
    fn to_imgui_is_top_down_and_window_relative() {
        let g = WindowGeometry::new(100, 500, 300, 400);
        assert_eq!(g.to_imgui(100, 500), [0.0, 0.0]);
        assert_eq!(g.to_imgui(150, 480), [50.0, 20.0]);
        assert_eq!(g.to_imgui(300, 400), [200.0, 100.0]);
    }

    #[test]
    fn to_imgui_outside_window_is_unavailable() {
        let g = WindowGeometry::new(100, 500, 300, 400);
        assert_eq!(g.to_imgui(99, 450), [-f32::MAX, -f32::MAX]);
        assert_eq!(g.to_imgui(150, 501), [-f32::MAX, -f32::MAX]);
        assert_eq!(g.to_imgui(301, 450), [-f32::MAX, -f32::MAX]);
        assert_eq!(g.to_imgui(150, 399), [-f32::MAX, -f32::MAX]);
    }

    #[test]
    fn imgui_to_boxel_inverts_to_imgui() {
        let g = WindowGeometry::new(100, 500, 300, 400);
        assert_eq!(g.imgui_to_boxel(50.0, 20.0), (150, 480));
        let [x, y] = g.to_imgui(123, 456);
        assert_eq!(g.imgui_to_boxel(x, y), (123, 456));
    }
}
