//! Orthographic ("globe") projection with horizon clipping, plus the fit and
//! bounds helpers the map view needs. Angles are degrees at the API surface,
//! screen y grows downwards like an SVG viewport.

use std::f64::consts::{PI, TAU};

use geo::{Coord, MultiPolygon};

/// `[lambda, phi, gamma]` in degrees.
pub type Rotation = [f64; 3];

/// Faces the 90°W meridian.
pub const DEFAULT_ROTATION: Rotation = [90.0, 0.0, 0.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl Bounds {
    fn point(p: (f64, f64)) -> Self {
        Self { min: p, max: p }
    }

    fn extend(&mut self, p: (f64, f64)) {
        self.min.0 = self.min.0.min(p.0);
        self.min.1 = self.min.1.min(p.1);
        self.max.0 = self.max.0.max(p.0);
        self.max.1 = self.max.1.max(p.1);
    }

    pub fn width(&self) -> f64 {
        self.max.0 - self.min.0
    }

    pub fn height(&self) -> f64 {
        self.max.1 - self.min.1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min.0 + self.max.0) / 2.0, (self.min.1 + self.max.1) / 2.0)
    }
}

/// One ring after projection; `None` marks vertices behind the horizon.
pub type ProjectedRing = Vec<Option<(f64, f64)>>;

/// Rings of one polygon: exterior first, then holes.
pub type ProjectedPolygon = Vec<ProjectedRing>;

#[derive(Clone, Debug, PartialEq)]
pub struct Orthographic {
    scale: f64,
    translate: (f64, f64),
    rotation: Rotation,
}

impl Default for Orthographic {
    fn default() -> Self {
        Self { scale: 1.0, translate: (0.0, 0.0), rotation: [0.0; 3] }
    }
}

impl Orthographic {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        self.translate
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Sets the rotation, keeping lambda within [-180, 180).
    pub fn set_rotation(&mut self, rotation: Rotation) {
        let [lambda, phi, gamma] = rotation;
        self.rotation = [(lambda + 180.0).rem_euclid(360.0) - 180.0, phi, gamma];
    }

    /// Screen position of a lon/lat pair, `None` on the far hemisphere.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (lambda, phi) = self.rotate(lon.to_radians(), lat.to_radians());
        let cos_phi = phi.cos();
        if cos_phi * lambda.cos() < 0.0 {
            return None;
        }
        let x = cos_phi * lambda.sin();
        let y = phi.sin();
        Some((self.translate.0 + self.scale * x, self.translate.1 - self.scale * y))
    }

    /// Lon/lat under a screen position, `None` outside the globe disk.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let px = (x - self.translate.0) / self.scale;
        let py = (self.translate.1 - y) / self.scale;
        let z = px.hypot(py);
        if z > 1.0 {
            return None;
        }
        let c = z.asin();
        let (sin_c, cos_c) = c.sin_cos();
        let lambda = (px * sin_c).atan2(z * cos_c);
        let phi = if z == 0.0 { 0.0 } else { (py * sin_c / z).asin() };
        let (lon, lat) = self.unrotate(lambda, phi);
        Some((lon.to_degrees(), lat.to_degrees()))
    }

    fn angles(&self) -> (f64, f64, f64) {
        (
            self.rotation[0].to_radians(),
            self.rotation[1].to_radians(),
            self.rotation[2].to_radians(),
        )
    }

    fn rotate(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let (d_lambda, d_phi, d_gamma) = self.angles();
        let lambda = wrap(lambda + d_lambda);
        if d_phi == 0.0 && d_gamma == 0.0 {
            return (lambda, phi);
        }
        let (sin_dp, cos_dp) = d_phi.sin_cos();
        let (sin_dg, cos_dg) = d_gamma.sin_cos();
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * cos_dp + x * sin_dp;
        (
            (y * cos_dg - k * sin_dg).atan2(x * cos_dp - z * sin_dp),
            (k * cos_dg + y * sin_dg).clamp(-1.0, 1.0).asin(),
        )
    }

    fn unrotate(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let (d_lambda, d_phi, d_gamma) = self.angles();
        let (lambda, phi) = if d_phi == 0.0 && d_gamma == 0.0 {
            (lambda, phi)
        } else {
            let (sin_dp, cos_dp) = d_phi.sin_cos();
            let (sin_dg, cos_dg) = d_gamma.sin_cos();
            let cos_phi = phi.cos();
            let x = lambda.cos() * cos_phi;
            let y = lambda.sin() * cos_phi;
            let z = phi.sin();
            let k = z * cos_dg - y * sin_dg;
            (
                (y * cos_dg + z * sin_dg).atan2(x * cos_dp + k * sin_dp),
                (k * cos_dp - x * sin_dp).clamp(-1.0, 1.0).asin(),
            )
        };
        (wrap(lambda - d_lambda), phi)
    }

    pub fn project_ring(&self, coords: &[Coord<f64>]) -> ProjectedRing {
        coords.iter().map(|c| self.project(c.x, c.y)).collect()
    }

    pub fn project_shape(&self, shape: &MultiPolygon<f64>) -> Vec<ProjectedPolygon> {
        shape
            .0
            .iter()
            .map(|poly| {
                std::iter::once(poly.exterior())
                    .chain(poly.interiors())
                    .map(|ring| self.project_ring(&ring.0))
                    .collect()
            })
            .collect()
    }

    /// Bounds of every visible vertex, `None` when nothing faces the viewer.
    pub fn path_bounds<'a>(
        &self,
        shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
    ) -> Option<Bounds> {
        let mut bounds: Option<Bounds> = None;
        for shape in shapes {
            for poly in &shape.0 {
                let rings = std::iter::once(poly.exterior()).chain(poly.interiors());
                for c in rings.flat_map(|r| r.0.iter()) {
                    if let Some(p) = self.project(c.x, c.y) {
                        match bounds.as_mut() {
                            Some(b) => b.extend(p),
                            None => bounds = Some(Bounds::point(p)),
                        }
                    }
                }
            }
        }
        bounds
    }

    /// Scales and centres the shapes so that their larger dimension takes
    /// `fraction` of the viewport, measured with rotation reset, then turns
    /// the globe to [`DEFAULT_ROTATION`].
    pub fn fit<'a>(
        &mut self,
        shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
        viewport: (f64, f64),
        fraction: f64,
    ) {
        *self = Self::default();
        let (w, h) = viewport;
        let b = self
            .path_bounds(shapes)
            .filter(|b| b.width() > 0.0 || b.height() > 0.0)
            .unwrap_or(Bounds { min: (-1.0, -1.0), max: (1.0, 1.0) });
        let s = fraction / (b.width() / w).max(b.height() / h);
        self.scale = s;
        self.translate = (
            (w - s * (b.max.0 + b.min.0)) / 2.0,
            (h - s * (b.max.1 + b.min.1)) / 2.0,
        );
        self.rotation = DEFAULT_ROTATION;
    }
}

fn wrap(lambda: f64) -> f64 {
    if (-PI..=PI).contains(&lambda) {
        lambda
    } else {
        (lambda + PI).rem_euclid(TAU) - PI
    }
}

/// Map bounds used to centre zooming. Measured on the first zoom and kept
/// until the projection is refitted.
#[derive(Clone, Debug, Default)]
pub struct ZoomAnchor {
    cached: Option<Bounds>,
}

impl ZoomAnchor {
    pub fn get_or_measure(&mut self, measure: impl FnOnce() -> Bounds) -> Bounds {
        *self.cached.get_or_insert_with(measure)
    }

    #[cfg(test)]
    pub fn is_measured(&self) -> bool {
        self.cached.is_some()
    }

    pub fn reset(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn unit_projection_maps_the_centre_to_the_origin() {
        let p = Orthographic::default();
        assert!(close(p.project(0.0, 0.0).unwrap(), (0.0, 0.0)));
        let (x, y) = p.project(30.0, 0.0).unwrap();
        assert!((x - 0.5).abs() < 1e-9 && y.abs() < 1e-9);
        // north is up on screen
        assert!(p.project(0.0, 30.0).unwrap().1 < 0.0);
        assert!(p.project(180.0, 0.0).is_none());
    }

    #[test]
    fn default_rotation_faces_ninety_west() {
        let mut p = Orthographic::default();
        p.set_rotation(DEFAULT_ROTATION);
        assert!(close(p.project(-90.0, 0.0).unwrap(), (0.0, 0.0)));
        assert!(p.project(90.0, 0.0).is_none());
    }

    #[test]
    fn invert_undoes_project_under_rotation() {
        let mut p = Orthographic::default();
        p.set_rotation([-20.0, -35.0, 10.0]);
        for &(lon, lat) in &[(15.0, 40.0), (30.0, 55.0), (0.0, 20.0), (40.0, 30.0)] {
            let (x, y) = p.project(lon, lat).unwrap();
            let back = p.invert(x, y).unwrap();
            assert!((back.0 - lon).abs() < 1e-6 && (back.1 - lat).abs() < 1e-6, "{back:?}");
        }
    }

    #[test]
    fn lambda_rotation_stays_in_one_turn() {
        let mut p = Orthographic::default();
        p.set_rotation([725.0, 10.0, -5.0]);
        assert_eq!(p.rotation(), [5.0, 10.0, -5.0]);
        p.set_rotation([-720.0, 0.0, 0.0]);
        assert_eq!(p.rotation(), [0.0, 0.0, 0.0]);
        p.set_rotation([180.0, 0.0, 0.0]);
        assert_eq!(p.rotation()[0], -180.0);

        p.set_rotation([1085.0, 0.0, 0.0]);
        let (x, y) = p.project(-4.0, 40.0).unwrap();
        let (lon, lat) = p.invert(x, y).unwrap();
        assert!((lon + 4.0).abs() < 1e-6 && (lat - 40.0).abs() < 1e-6, "{lon} {lat}");
    }

    #[test]
    fn wrap_reduces_any_number_of_turns() {
        for turns in [-3.0, -1.0, 2.0, 5.0] {
            let w = wrap(0.5 + turns * TAU);
            assert!((w - 0.5).abs() < 1e-9, "{w}");
        }
        assert_eq!(wrap(-PI), -PI);
    }

    #[test]
    fn invert_outside_the_disk_is_none() {
        let p = Orthographic::default();
        assert!(p.invert(1.5, 0.0).is_none());
    }

    #[test]
    fn fit_fills_the_requested_share_and_centres() {
        let set = fixtures::europe();
        let mut p = Orthographic::default();
        p.fit(set.iter().map(|c| &c.shape), (200.0, 100.0), 0.9);
        assert_eq!(p.rotation(), DEFAULT_ROTATION);

        // measure again with the rotation used for fitting
        p.set_rotation([0.0; 3]);
        let b = p.path_bounds(set.iter().map(|c| &c.shape)).unwrap();
        let share = (b.width() / 200.0).max(b.height() / 100.0);
        assert!((share - 0.9).abs() < 1e-9);
        assert!(close(b.center(), (100.0, 50.0)));
    }

    #[test]
    fn zoom_anchor_measures_once() {
        let mut anchor = ZoomAnchor::default();
        let first = Bounds { min: (0.0, 0.0), max: (10.0, 4.0) };
        assert_eq!(anchor.get_or_measure(|| first), first);
        let again = anchor.get_or_measure(|| panic!("measured twice"));
        assert_eq!(again, first);
        anchor.reset();
        assert!(!anchor.is_measured());
    }
}
