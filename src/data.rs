use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use geo::{Geometry, MultiPolygon};
use geojson::{GeoJson, feature::Id};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    error::DataError,
    topology::{RawFeature, Topology},
};

/// Object inside the topology that holds the country shapes.
pub const COUNTRIES_OBJECT: &str = "countries";

const NAME_KEYS: [&str; 3] = ["name", "NAME", "ADMIN"];
const A3_KEYS: [&str; 3] = ["a3", "ISO_A3", "ADM0_A3"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryId(pub String);

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CountryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One country as loaded for the session; never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    /// ISO-3166 alpha-3, also the flag file stem
    pub a3: String,
    pub shape: MultiPolygon<f64>,
}

/// The loaded country set with lookup by id.
#[derive(Clone, Debug, Default)]
pub struct CountrySet {
    countries: Vec<Country>,
    index: HashMap<CountryId, usize>,
}

impl CountrySet {
    /// Builds the set, dropping later duplicates of an id.
    pub fn new(countries: impl IntoIterator<Item = Country>) -> Self {
        let mut set = Self::default();
        for c in countries {
            if set.index.contains_key(&c.id) {
                warn!(id = %c.id, name = %c.name, "duplicate country id, skipped");
                continue;
            }
            set.index.insert(c.id.clone(), set.countries.len());
            set.countries.push(c);
        }
        set
    }

    pub fn get(&self, id: &CountryId) -> Option<&Country> {
        self.index.get(id).map(|&i| &self.countries[i])
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }

    pub fn as_slice(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Flag image location for an alpha-3 code.
pub fn flag_path(flags_dir: &Path, a3: &str) -> PathBuf {
    flags_dir.join(format!("{a3}.svg"))
}

/// Loads the geography file once. Accepts a TopoJSON topology with a
/// `countries` object or a plain GeoJSON feature collection.
pub fn load_countries<P: AsRef<Path>>(path: P) -> Result<CountrySet, DataError> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let set = parse_countries(&txt)?;
    info!(path = %path.display(), countries = set.len(), "geography loaded");
    Ok(set)
}

pub fn parse_countries(txt: &str) -> Result<CountrySet, DataError> {
    let doc: Value = serde_json::from_str(txt)?;
    let raw = match doc.get("type").and_then(Value::as_str) {
        Some("Topology") => serde_json::from_value::<Topology>(doc)?.features(COUNTRIES_OBJECT)?,
        Some("FeatureCollection") => geojson_features(txt)?,
        other => return Err(DataError::Unsupported(other.unwrap_or("no type").to_string())),
    };

    let set = CountrySet::new(raw.into_iter().filter_map(into_country));
    if set.is_empty() {
        return Err(DataError::NoCountries);
    }
    Ok(set)
}

fn geojson_features(txt: &str) -> Result<Vec<RawFeature>, DataError> {
    let GeoJson::FeatureCollection(fc) = GeoJson::from_str(txt)? else {
        return Err(DataError::Unsupported("GeoJSON without feature collection".into()));
    };
    let mut out = Vec::with_capacity(fc.features.len());
    for feature in fc.features {
        let shape = match feature.geometry {
            Some(gj) => match Geometry::<f64>::try_from(gj.value)? {
                Geometry::Polygon(p) => Some(p.into()),
                Geometry::MultiPolygon(m) => Some(m),
                _ => None,
            },
            None => None,
        };
        let id = feature.id.map(|id| match id {
            Id::String(s) => Value::String(s),
            Id::Number(n) => Value::Number(n),
        });
        out.push(RawFeature {
            id,
            properties: feature.properties.unwrap_or_default(),
            shape,
        });
    }
    Ok(out)
}

fn first_str(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| props.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn into_country(raw: RawFeature) -> Option<Country> {
    let a3 = first_str(&raw.properties, &A3_KEYS);
    let Some(shape) = raw.shape else {
        warn!(id = ?raw.id, "feature without polygon geometry, skipped");
        return None;
    };
    let Some(a3) = a3 else {
        warn!(id = ?raw.id, "feature without alpha-3 code, skipped");
        return None;
    };
    let id = match raw.id {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => a3.clone(),
    };
    let name = first_str(&raw.properties, &NAME_KEYS).unwrap_or_else(|| a3.clone());
    Some(Country { id: CountryId(id), name, a3, shape })
}
