//! Turns raw pointer input into globe rotation and zoom updates. Holds only
//! pointer bookkeeping and the current zoom factor, nothing quiz related.

use tracing::debug;

use crate::projection::{Bounds, Orthographic};

/// Degrees of rotation per viewport unit of drag.
pub const DRAG_DAMPING: f64 = 0.5;
pub const ZOOM_EXTENT: (f64, f64) = (1.0, 50.0);
pub const WHEEL_FACTOR: f64 = 1.25;

/// Zoom applied on top of the projected paths: `screen = translate + scale * p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub translate: (f64, f64),
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, translate: (0.0, 0.0) }
    }
}

impl ViewTransform {
    pub fn apply(&self, p: (f64, f64)) -> (f64, f64) {
        (self.translate.0 + self.scale * p.0, self.translate.1 + self.scale * p.1)
    }

    pub fn invert(&self, p: (f64, f64)) -> (f64, f64) {
        ((p.0 - self.translate.0) / self.scale, (p.1 - self.translate.1) / self.scale)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Pointer {
    #[default]
    Idle,
    Pressed { at: (u16, u16) },
    Dragging { last: (u16, u16) },
}

#[derive(Clone, Debug, PartialEq)]
pub struct GestureController {
    pointer: Pointer,
    zoom: f64,
}

impl Default for GestureController {
    fn default() -> Self {
        Self { pointer: Pointer::Idle, zoom: 1.0 }
    }
}

impl GestureController {
    #[cfg(test)]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Adds a damped drag delta (viewport units) to the projection rotation.
    pub fn rotate(projection: &mut Orthographic, dx: f64, dy: f64) {
        let [lambda, phi, gamma] = projection.rotation();
        projection.set_rotation([lambda + dx * DRAG_DAMPING, phi - dy * DRAG_DAMPING, gamma]);
        debug!(rotation = ?projection.rotation(), "globe rotated");
    }

    /// Sets the zoom factor, clamped to [`ZOOM_EXTENT`], keeping the centre
    /// of `anchor` fixed on screen.
    pub fn zoom_to(&mut self, k: f64, anchor: Bounds) -> ViewTransform {
        self.zoom = k.clamp(ZOOM_EXTENT.0, ZOOM_EXTENT.1);
        let (cx, cy) = anchor.center();
        let view = ViewTransform {
            scale: self.zoom,
            translate: (cx * (1.0 - self.zoom), cy * (1.0 - self.zoom)),
        };
        debug!(scale = view.scale, "zoom changed");
        view
    }

    pub fn wheel(&mut self, direction: ZoomDirection, anchor: Bounds) -> ViewTransform {
        let k = match direction {
            ZoomDirection::In => self.zoom * WHEEL_FACTOR,
            ZoomDirection::Out => self.zoom / WHEEL_FACTOR,
        };
        self.zoom_to(k, anchor)
    }

    pub fn press(&mut self, at: (u16, u16)) {
        self.pointer = Pointer::Pressed { at };
    }

    /// Pointer moved with the button held. Returns the cell delta since the
    /// previous position, if any.
    pub fn motion(&mut self, at: (u16, u16)) -> Option<(i32, i32)> {
        let from = match self.pointer {
            Pointer::Idle => return None,
            Pointer::Pressed { at: prev } | Pointer::Dragging { last: prev } => prev,
        };
        self.pointer = Pointer::Dragging { last: at };
        let delta = (at.0 as i32 - from.0 as i32, at.1 as i32 - from.1 as i32);
        (delta != (0, 0)).then_some(delta)
    }

    /// Button released. A press that never moved is a click at its cell.
    pub fn release(&mut self) -> Option<(u16, u16)> {
        match std::mem::take(&mut self.pointer) {
            Pointer::Pressed { at } => Some(at),
            _ => None,
        }
    }
}
