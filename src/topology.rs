//! Minimal TopoJSON decoding: enough of the format to turn a `GeometryCollection`
//! of polygons into `geo` multipolygons.

use std::collections::HashMap;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DataError;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    objects: HashMap<String, TopoGeometry>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    arcs: Value,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
}

/// A decoded feature before it is mapped onto a [`crate::data::Country`].
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub shape: Option<MultiPolygon<f64>>,
}

impl Topology {
    /// Decodes every member of the named object into features.
    pub fn features(&self, object: &str) -> Result<Vec<RawFeature>, DataError> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| DataError::MissingObject(object.to_string()))?;
        let arcs = self.absolute_arcs();

        let members: Vec<&TopoGeometry> = match root.kind.as_deref() {
            Some("GeometryCollection") => root.geometries.iter().collect(),
            _ => vec![root],
        };

        members
            .into_iter()
            .map(|g| -> Result<RawFeature, DataError> {
                Ok(RawFeature {
                    id: g.id.clone(),
                    properties: g.properties.clone().unwrap_or_default(),
                    shape: decode_shape(g, &arcs)?,
                })
            })
            .collect()
    }

    /// Undoes quantization and delta encoding when a transform is present.
    fn absolute_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| match &self.transform {
                        Some(t) => {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        }
                        None => Coord { x: p[0], y: p[1] },
                    })
                    .collect()
            })
            .collect()
    }
}

fn decode_shape(
    g: &TopoGeometry,
    arcs: &[Vec<Coord<f64>>],
) -> Result<Option<MultiPolygon<f64>>, DataError> {
    match g.kind.as_deref() {
        Some("Polygon") => {
            let rings: Vec<Vec<i64>> = serde_json::from_value(g.arcs.clone())?;
            Ok(Some(MultiPolygon(vec![polygon(&rings, arcs)?])))
        }
        Some("MultiPolygon") => {
            let polys: Vec<Vec<Vec<i64>>> = serde_json::from_value(g.arcs.clone())?;
            let polys = polys
                .iter()
                .map(|rings| polygon(rings, arcs))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(MultiPolygon(polys)))
        }
        _ => Ok(None),
    }
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>, DataError> {
    let mut rings = rings
        .iter()
        .map(|r| ring(r, arcs).map(LineString))
        .collect::<Result<Vec<_>, _>>()?;
    if rings.is_empty() {
        return Ok(Polygon::new(LineString(Vec::new()), Vec::new()));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

/// Stitches arcs into one ring; consecutive arcs share their joint point.
/// A negative index `i` means arc `!i` walked backwards.
fn ring(indices: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<Vec<Coord<f64>>, DataError> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for &i in indices {
        let (idx, reversed) = if i < 0 { (!i, true) } else { (i, false) };
        let arc = usize::try_from(idx)
            .ok()
            .and_then(|idx| arcs.get(idx))
            .ok_or(DataError::ArcIndex(i))?;
        points.pop();
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }
    Ok(points)
}
