use geo::MultiPolygon;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Upazila {
    pub code: Option<String>,
    pub name: Option<String>,
    pub population: Option<i64>,
    pub male: Option<i64>,
    pub female: Option<i64>,
    pub building_count: Option<i64>,
    // None when the feature carries no polygonal geometry; such features
    // still feed the selector but are invisible to identify/zoom.
    pub geometry: Option<MultiPolygon<f64>>,
}

// One <option> of the upazila picker: value = code, label = name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorEntry {
    pub code: String,
    pub name: String,
}
