use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use crossterm::event::{KeyCode, MouseButton, MouseEvent, MouseEventKind};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::layout::Rect;
use tracing::debug;

use crate::{
    config::Config,
    data::CountrySet,
    gesture::{GestureController, ZoomDirection},
    machine::{ClickOutcome, Machine},
    map_draw::{CELL_DOTS, MapView, RenderSurface},
};

/// Longest wait for input before the loop checks timers again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drag distance (in cells) one arrow key press stands for.
const KEY_ROTATE_CELLS: f64 = 5.0;

pub struct AppState {
    pub countries: CountrySet,
    pub map: MapView,
    pub machine: Machine<StdRng>,
    pub gestures: GestureController,
    pub flags_dir: PathBuf,
    /// Inner area of the map block, as last laid out.
    pub map_area: Rect,
    pub status: String,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
mouse: click country, drag to rotate, wheel to zoom
s: select countries   t: start test   c: clear
arrows: rotate   +/-: zoom   q: quit";

    pub fn new(config: &Config, countries: CountrySet, map_area: Rect) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut map = MapView::new(MapView::viewport_for(map_area), config.fit_fraction);
        map.render_shapes(countries.as_slice());
        let status = format!("World – {} countries", map.feature_count());

        Self {
            countries,
            map,
            machine: Machine::new(rng, config.advance_delay()),
            gestures: GestureController::default(),
            flags_dir: config.flags_dir.clone(),
            map_area,
            status,
        }
    }

    /// Called by the layout pass; refits the globe when the map area changed size.
    pub fn set_map_area(&mut self, area: Rect) {
        if (area.width, area.height) != (self.map_area.width, self.map_area.height) {
            self.map.resize(MapView::viewport_for(area));
            self.gestures = GestureController::default();
        }
        self.map_area = area;
    }

    /// How long the event loop may block waiting for input.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        match self.machine.next_deadline() {
            Some(due) => due.saturating_duration_since(now).min(POLL_INTERVAL),
            None => POLL_INTERVAL,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.machine.tick(now, &mut self.map);
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        use KeyCode::*;
        match key {
            Char('q') | Esc => return true,
            Char('s') => {
                self.machine.show_selection(&mut self.map);
                self.status = "Pick countries for the test".into();
            }
            Char('t') => {
                if !self.machine.start_enabled() {
                    self.status = "Select at least 2 countries first".into();
                } else if self.machine.start_test(&mut self.map).is_ok() {
                    self.status = "Find the country on the map".into();
                }
            }
            Char('c') => {
                if self.machine.clear_selection(&mut self.map) {
                    self.status = "Selection cleared".into();
                }
            }
            Left => self.drag_by(-KEY_ROTATE_CELLS, 0.0),
            Right => self.drag_by(KEY_ROTATE_CELLS, 0.0),
            Up => self.drag_by(0.0, -KEY_ROTATE_CELLS),
            Down => self.drag_by(0.0, KEY_ROTATE_CELLS),
            Char('+') | Char('=') => self.zoom(ZoomDirection::In),
            Char('-') => self.zoom(ZoomDirection::Out),
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, now: Instant) {
        let cell = (event.column, event.row);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.gestures.press(cell),
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((dx, dy)) = self.gestures.motion(cell) {
                    self.drag_by(dx as f64, dy as f64);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(at) = self.gestures.release() {
                    self.click(at, now);
                }
            }
            MouseEventKind::ScrollUp => self.zoom(ZoomDirection::In),
            MouseEventKind::ScrollDown => self.zoom(ZoomDirection::Out),
            _ => {}
        }
    }

    /// Rotates the globe by a drag of `dx`, `dy` cells.
    fn drag_by(&mut self, dx: f64, dy: f64) {
        self.machine.hide_tooltip();
        GestureController::rotate(self.map.projection_mut(), dx * CELL_DOTS.0, dy * CELL_DOTS.1);
        self.map.apply_rotation_repaint();
    }

    fn zoom(&mut self, direction: ZoomDirection) {
        self.machine.hide_tooltip();
        let anchor = self.map.zoom_anchor();
        let view = self.gestures.wheel(direction, anchor);
        self.map.apply_view_transform(view.translate, view.scale);
    }

    pub fn click(&mut self, cell: (u16, u16), now: Instant) -> ClickOutcome {
        let Some(id) = self.map.hit_test(cell, self.map_area).cloned() else {
            return ClickOutcome::Ignored;
        };
        let Some(country) = self.countries.get(&id) else {
            return ClickOutcome::Ignored;
        };
        let outcome = self.machine.click(country, cell, now, &mut self.map);
        debug!(id = %id, ?outcome, "map click");
        outcome
    }
}
