//! Window operations postponed to the next flight loop
//!
//! Deleting, hiding, moving or resizing a native window from inside one of
//! its own callbacks is not allowed, so requests made while building the UI
//! are parked here and replayed once per frame.

use crate::geometry::Anchor;
use crate::host::PositioningMode;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    Hide,
    Resize {
        width: i32,
        height: i32,
        anchor: Anchor,
    },
    Positioning {
        mode: PositioningMode,
        monitor: i32,
    },
    Place {
        x: i32,
        y: i32,
        anchor: Anchor,
    },
    Delete,
}

/// At most one pending request per kind; later requests replace earlier ones.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingActions {
    hide: bool,
    resize: Option<(i32, i32, Anchor)>,
    positioning: Option<(PositioningMode, i32)>,
    place: Option<(i32, i32, Anchor)>,
    delete: bool,
}

impl PendingActions {
    pub fn hide(&mut self) {
        self.hide = true;
    }

    pub fn resize(&mut self, width: i32, height: i32, anchor: Anchor) {
        self.resize = Some((width, height, anchor));
    }

    pub fn positioning(&mut self, mode: PositioningMode, monitor: i32) {
        self.positioning = Some((mode, monitor));
    }

    pub fn place(&mut self, x: i32, y: i32, anchor: Anchor) {
        self.place = Some((x, y, anchor));
    }

    pub fn delete(&mut self) {
        self.delete = true;
    }

    pub fn is_empty(&self) -> bool {
        !self.hide
            && self.resize.is_none()
            && self.positioning.is_none()
            && self.place.is_none()
            && !self.delete
    }

    pub fn delete_requested(&self) -> bool {
        self.delete
    }

    /// Takes all pending requests in execution order: hide, resize,
    /// positioning, place, delete.
    pub fn drain(&mut self) -> Vec<DeferredAction> {
        let taken = std::mem::take(self);
        let mut actions = Vec::new();
        if taken.hide {
            actions.push(DeferredAction::Hide);
        }
        if let Some((width, height, anchor)) = taken.resize {
            actions.push(DeferredAction::Resize {
                width,
                height,
                anchor,
            });
        }
        if let Some((mode, monitor)) = taken.positioning {
            actions.push(DeferredAction::Positioning { mode, monitor });
        }
        if let Some((x, y, anchor)) = taken.place {
            actions.push(DeferredAction::Place { x, y, anchor });
        }
        if taken.delete {
            actions.push(DeferredAction::Delete);
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drains_in_fixed_order() {
        let mut pending = PendingActions::default();
        pending.delete();
        pending.place(10, 20, Anchor::Center);
        pending.positioning(PositioningMode::PopOut, -1);
        pending.resize(300, 200, Anchor::TopLeft);
        pending.hide();

        assert_eq!(
            pending.drain(),
            vec![
                DeferredAction::Hide,
                DeferredAction::Resize {
                    width: 300,
                    height: 200,
                    anchor: Anchor::TopLeft
                },
                DeferredAction::Positioning {
                    mode: PositioningMode::PopOut,
                    monitor: -1
                },
                DeferredAction::Place {
                    x: 10,
                    y: 20,
                    anchor: Anchor::Center
                },
                DeferredAction::Delete,
            ]
        );
        assert!(pending.is_empty());
        assert!(pending.drain().is_empty());
    }

    #[test]
    fn later_request_replaces_earlier() {
        let mut pending = PendingActions::default();
        pending.resize(100, 100, Anchor::TopLeft);
        pending.resize(640, 480, Anchor::Center);
        assert_eq!(
            pending.drain(),
            vec![DeferredAction::Resize {
                width: 640,
                height: 480,
                anchor: Anchor::Center
            }]
        );
    }

    #[test]
    fn empty_by_default() {
        let mut pending = PendingActions::default();
        assert!(pending.is_empty());
        assert!(!pending.delete_requested());
        pending.delete();
        assert!(pending.delete_requested());
    }
}
