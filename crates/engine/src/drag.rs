use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mapping::TrackGeometry;
use crate::time::TrimWindow;

/// One of the two draggable markers on the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    Start,
    End,
}

/// Pixel offsets of both handles. Unset offsets fall back to the track edges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HandlePositions {
    start_px: Option<f64>,
    end_px: Option<f64>,
}

impl HandlePositions {
    pub fn start_px(&self) -> f64 {
        self.start_px.unwrap_or(0.0)
    }

    pub fn end_px(&self, geometry: &TrackGeometry) -> f64 {
        self.end_px.unwrap_or(geometry.width_px())
    }

    pub fn offset_of(&self, handle: Handle, geometry: &TrackGeometry) -> f64 {
        match handle {
            Handle::Start => self.start_px(),
            Handle::End => self.end_px(geometry),
        }
    }

    fn set(&mut self, handle: Handle, offset_px: f64) {
        match handle {
            Handle::Start => self.start_px = Some(offset_px),
            Handle::End => self.end_px = Some(offset_px),
        }
    }
}

/// Transient pointer state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        handle: Handle,
        origin_x: f64,
    },
}

/// Turns relative pointer movement into handle offsets and a trim window.
///
/// A handle never leaves the track and never crosses the other handle, so the
/// derived window always has `start_time <= end_time`.
#[derive(Debug, Clone)]
pub struct DragGestureController {
    geometry: TrackGeometry,
    positions: HandlePositions,
    state: DragState,
    window: Option<TrimWindow>,
}

impl DragGestureController {
    pub fn new(geometry: TrackGeometry) -> Self {
        Self {
            geometry,
            positions: HandlePositions::default(),
            state: DragState::Idle,
            window: None,
        }
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn positions(&self) -> &HandlePositions {
        &self.positions
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Handle currently engaged by a gesture.
    pub fn active_handle(&self) -> Option<Handle> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging { handle, .. } => Some(handle),
        }
    }

    /// Latest window derived by a move, not necessarily committed.
    pub fn window(&self) -> Option<TrimWindow> {
        self.window
    }

    /// Engages `handle` with the pointer resting at `x`.
    ///
    /// A non-finite `x` leaves the controller untouched.
    pub fn begin(&mut self, handle: Handle, x: f64) {
        if !x.is_finite() {
            warn!(?handle, x, "drag start ignored: non-finite pointer");
            return;
        }
        debug!(?handle, x, "drag started");
        self.state = DragState::Dragging {
            handle,
            origin_x: x,
        };
    }

    /// Applies one pointer move and returns the recomputed window.
    ///
    /// Returns `None` when no handle is engaged or `x` is not finite; the
    /// offsets keep their previous values in both cases.
    ///
    /// # Example
    /// ```
    /// use trim_engine::drag::{DragGestureController, Handle};
    /// use trim_engine::mapping::TrackGeometry;
    ///
    /// let geometry = TrackGeometry::new(300.0).expect("valid width");
    /// let mut drag = DragGestureController::new(geometry);
    ///
    /// drag.begin(Handle::Start, 10.0);
    /// let window = drag.update(85.0, 20.0).expect("dragging");
    /// assert_eq!(window.start_time, 5.0);
    /// assert_eq!(window.end_time, 20.0);
    /// ```
    pub fn update(&mut self, x: f64, duration: f64) -> Option<TrimWindow> {
        let DragState::Dragging { handle, origin_x } = self.state else {
            return None;
        };
        if !x.is_finite() {
            warn!(?handle, x, "drag move ignored: non-finite pointer");
            return None;
        }

        let delta = origin_x - x;
        let current = self.positions.offset_of(handle, &self.geometry);
        let offset = self.clamp_for(handle, current - delta);
        self.positions.set(handle, offset);
        self.state = DragState::Dragging {
            handle,
            origin_x: x,
        };

        let window = self.current_window(duration);
        self.window = Some(window);
        debug!(
            ?handle,
            x,
            delta,
            offset,
            start_time = window.start_time,
            end_time = window.end_time,
            "drag moved"
        );
        Some(window)
    }

    /// Releases the engaged handle and returns the window to commit.
    ///
    /// Returns `None` when no handle was engaged.
    pub fn end(&mut self, duration: f64) -> Option<TrimWindow> {
        let handle = self.active_handle()?;
        self.state = DragState::Idle;

        let window = self.current_window(duration);
        self.window = Some(window);
        debug!(
            ?handle,
            start_time = window.start_time,
            end_time = window.end_time,
            "drag ended"
        );
        Some(window)
    }

    /// Forgets handle positions and any derived window.
    pub fn reset(&mut self) {
        self.positions = HandlePositions::default();
        self.state = DragState::Idle;
        self.window = None;
    }

    fn current_window(&self, duration: f64) -> TrimWindow {
        self.geometry.window_between(
            self.positions.start_px(),
            self.positions.end_px(&self.geometry),
            duration,
        )
    }

    fn clamp_for(&self, handle: Handle, offset_px: f64) -> f64 {
        let (min, max) = match handle {
            Handle::Start => (0.0, self.positions.end_px(&self.geometry)),
            Handle::End => (self.positions.start_px(), self.geometry.width_px()),
        };
        offset_px.clamp(min, max)
    }
}
