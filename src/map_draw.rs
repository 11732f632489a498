use std::collections::HashMap;

use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use ratatui::{
    Frame,
    layout::Rect as TuiRect,
    style::Color,
    symbols::Marker,
    widgets::{
        Block, Borders,
        canvas::{Canvas, Circle, Line, Points},
    },
};
use tracing::debug;

use crate::{
    data::{Country, CountryId},
    gesture::ViewTransform,
    machine::{Fill, HighlightSink},
    projection::{Bounds, Orthographic, ProjectedPolygon, ZoomAnchor},
};

/// Braille resolution of one terminal cell.
pub const CELL_DOTS: (f64, f64) = (2.0, 4.0);

/// What the core needs from whatever draws the map.
pub trait RenderSurface: HighlightSink {
    fn render_shapes(&mut self, countries: &[Country]);
    fn apply_view_transform(&mut self, translate: (f64, f64), scale: f64);
    /// Reprojects every shape after the projection rotation changed.
    fn apply_rotation_repaint(&mut self);
}

fn fill_color(fill: Fill) -> Color {
    match fill {
        Fill::Neutral => Color::Gray,
        Fill::Selected | Fill::Correct => Color::LightGreen,
        Fill::Incorrect => Color::LightRed,
    }
}

struct Shape {
    id: CountryId,
    fill: Fill,
    geometry: MultiPolygon<f64>,
    lonlat_box: Option<Rect<f64>>,
    projected: Vec<ProjectedPolygon>,
}

/// The globe as drawn on a braille canvas. Coordinates are in dots, y down.
pub struct MapView {
    projection: Orthographic,
    view: ViewTransform,
    anchor: ZoomAnchor,
    viewport: (f64, f64),
    fit_fraction: f64,
    shapes: Vec<Shape>,
    index: HashMap<CountryId, usize>,
}

impl MapView {
    pub fn new(viewport: (f64, f64), fit_fraction: f64) -> Self {
        Self {
            projection: Orthographic::default(),
            view: ViewTransform::default(),
            anchor: ZoomAnchor::default(),
            viewport: (viewport.0.max(1.0), viewport.1.max(1.0)),
            fit_fraction,
            shapes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Dot size of a canvas drawn inside `inner`.
    pub fn viewport_for(inner: TuiRect) -> (f64, f64) {
        (inner.width as f64 * CELL_DOTS.0, inner.height as f64 * CELL_DOTS.1)
    }

    #[cfg(test)]
    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    #[cfg(test)]
    pub fn projection(&self) -> &Orthographic {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut Orthographic {
        &mut self.projection
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    #[cfg(test)]
    pub fn fill_of(&self, id: &CountryId) -> Option<Fill> {
        self.index.get(id).map(|&i| self.shapes[i].fill)
    }

    pub fn feature_count(&self) -> usize {
        self.shapes.len()
    }

    /// Bounds zooming is centred on, measured on first use.
    pub fn zoom_anchor(&mut self) -> Bounds {
        let fallback = Bounds { min: (0.0, 0.0), max: self.viewport };
        let (projection, shapes) = (&self.projection, &self.shapes);
        self.anchor.get_or_measure(|| {
            projection
                .path_bounds(shapes.iter().map(|s| &s.geometry))
                .unwrap_or(fallback)
        })
    }

    /// Refits to a new canvas size, keeping the current rotation.
    pub fn resize(&mut self, viewport: (f64, f64)) {
        let viewport = (viewport.0.max(1.0), viewport.1.max(1.0));
        if viewport == self.viewport {
            return;
        }
        let rotation = self.projection.rotation();
        self.viewport = viewport;
        self.fit();
        self.projection.set_rotation(rotation);
        self.anchor.reset();
        self.view = ViewTransform::default();
        self.apply_rotation_repaint();
        debug!(?viewport, "map resized");
    }

    fn fit(&mut self) {
        self.projection
            .fit(self.shapes.iter().map(|s| &s.geometry), self.viewport, self.fit_fraction);
    }

    /// Centre of a terminal cell in canvas dots.
    pub fn cell_to_dots(cell: (u16, u16), inner: TuiRect) -> Option<(f64, f64)> {
        let (col, row) = cell;
        if col < inner.x
            || row < inner.y
            || col >= inner.x + inner.width
            || row >= inner.y + inner.height
        {
            return None;
        }
        Some((
            (col - inner.x) as f64 * CELL_DOTS.0 + CELL_DOTS.0 / 2.0,
            (row - inner.y) as f64 * CELL_DOTS.1 + CELL_DOTS.1 / 2.0,
        ))
    }

    /// Country under a terminal cell of the map area.
    pub fn hit_test(&self, cell: (u16, u16), inner: TuiRect) -> Option<&CountryId> {
        self.hit_test_dots(Self::cell_to_dots(cell, inner)?)
    }

    pub fn hit_test_dots(&self, dots: (f64, f64)) -> Option<&CountryId> {
        let (x, y) = self.view.invert(dots);
        let (lon, lat) = self.projection.invert(x, y)?;
        let point = Point::new(lon, lat);
        self.shapes
            .iter()
            .filter(|s| s.lonlat_box.is_some_and(|b| b.contains(&point)))
            .find(|s| s.geometry.contains(&point))
            .map(|s| &s.id)
    }

    pub fn render(&self, f: &mut Frame<'_>, area: TuiRect, title: &str) {
        let (w, h) = self.viewport;
        let view = self.view;
        let to_canvas = move |p: (f64, f64)| {
            let (x, y) = view.apply(p);
            (x, h - y)
        };

        let canvas = Canvas::default()
            .block(Block::default().title(title).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds([0.0, w])
            .y_bounds([0.0, h])
            .paint(|ctx| {
                // 1) globe outline
                let (cx, cy) = to_canvas(self.projection.translate());
                ctx.draw(&Circle {
                    x: cx,
                    y: cy,
                    radius: self.projection.scale() * view.scale,
                    color: Color::DarkGray,
                });

                // 2) interiors of highlighted shapes
                for shape in self.shapes.iter().filter(|s| s.fill != Fill::Neutral) {
                    let mut coords = Vec::new();
                    for poly in &shape.projected {
                        let rings: Vec<Vec<(f64, f64)>> = poly
                            .iter()
                            .map(|ring| ring.iter().flatten().map(|&p| view.apply(p)).collect())
                            .collect();
                        scanline_fill(&rings, (w, h), &mut coords);
                    }
                    ctx.draw(&Points { coords: &coords, color: fill_color(shape.fill) });
                }

                // 3) borders, coloured by fill
                for shape in &self.shapes {
                    let color = fill_color(shape.fill);
                    for ring in shape.projected.iter().flatten() {
                        for pair in ring.windows(2) {
                            let (Some(a), Some(b)) = (pair[0], pair[1]) else { continue };
                            let (x1, y1) = to_canvas(a);
                            let (x2, y2) = to_canvas(b);
                            let off_canvas = (x1 < 0.0 && x2 < 0.0)
                                || (x1 > w && x2 > w)
                                || (y1 < 0.0 && y2 < 0.0)
                                || (y1 > h && y2 > h);
                            if off_canvas {
                                continue;
                            }
                            ctx.draw(&Line { x1, y1, x2, y2, color });
                        }
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

/// Even-odd scanline fill at dot resolution, clipped to the viewport.
/// Output points are in canvas coordinates (y up).
fn scanline_fill(rings: &[Vec<(f64, f64)>], viewport: (f64, f64), out: &mut Vec<(f64, f64)>) {
    let (w, h) = viewport;
    let ys = rings.iter().flatten().map(|p| p.1);
    let (Some(ymin), Some(ymax)) = (ys.clone().reduce(f64::min), ys.reduce(f64::max)) else {
        return;
    };
    let (ymin, ymax) = (ymin.max(0.0).floor(), ymax.min(h).ceil());

    let mut xs = Vec::new();
    let mut row = ymin;
    while row < ymax {
        let yc = row + 0.5;
        xs.clear();
        for ring in rings.iter().filter(|r| r.len() >= 3) {
            let closing = std::iter::once((ring[ring.len() - 1], ring[0]));
            for (a, b) in ring.windows(2).map(|p| (p[0], p[1])).chain(closing) {
                if (a.1 <= yc) != (b.1 <= yc) {
                    xs.push(a.0 + (yc - a.1) * (b.0 - a.0) / (b.1 - a.1));
                }
            }
        }
        xs.sort_by(f64::total_cmp);
        for span in xs.chunks_exact(2) {
            let mut x = span[0].max(0.0).ceil() + 0.5;
            while x < span[1].min(w) {
                out.push((x, h - yc));
                x += 1.0;
            }
        }
        row += 1.0;
    }
}

impl HighlightSink for MapView {
    fn set_shape_fill(&mut self, id: &CountryId, fill: Fill) {
        if let Some(&i) = self.index.get(id) {
            self.shapes[i].fill = fill;
        }
    }

    fn set_all_shapes_fill(&mut self, fill: Fill) {
        for shape in &mut self.shapes {
            shape.fill = fill;
        }
    }
}

impl RenderSurface for MapView {
    fn render_shapes(&mut self, countries: &[Country]) {
        self.shapes = countries
            .iter()
            .map(|c| Shape {
                id: c.id.clone(),
                fill: Fill::Neutral,
                geometry: c.shape.clone(),
                lonlat_box: c.shape.bounding_rect(),
                projected: Vec::new(),
            })
            .collect();
        self.index = self.shapes.iter().enumerate().map(|(i, s)| (s.id.clone(), i)).collect();
        self.fit();
        self.anchor.reset();
        self.apply_rotation_repaint();
    }

    fn apply_view_transform(&mut self, translate: (f64, f64), scale: f64) {
        self.view = ViewTransform { scale, translate };
    }

    fn apply_rotation_repaint(&mut self) {
        let projection = &self.projection;
        for shape in &mut self.shapes {
            shape.projected = projection.project_shape(&shape.geometry);
        }
    }
}
