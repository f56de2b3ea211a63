use crate::config::FieldNames;
use crate::types::Upazila;
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn load_feature_collection(path: &Path) -> Result<FeatureCollection> {
    tracing::info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parse the GeoJSON. warning: this loads the whole file into memory.
    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(anyhow!("GeoJSON must be a FeatureCollection: {:?}", path)),
    }
}

// Typed view of the population collection, one record per feature in
// collection order. Nothing is skipped here: missing-attribute policy
// belongs to the consumers (selector, classifier, spatial index).
pub fn extract_upazilas(collection: &FeatureCollection, fields: &FieldNames) -> Vec<Upazila> {
    collection
        .features
        .iter()
        .map(|feature| Upazila {
            code: prop_string(feature, &fields.code),
            name: prop_string(feature, &fields.name),
            population: prop_count(feature, &fields.population),
            male: prop_count(feature, &fields.male),
            female: prop_count(feature, &fields.female),
            building_count: prop_count(feature, &fields.building_count),
            geometry: polygonal_geometry(feature),
        })
        .collect()
}

pub fn prop_string(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        // P-codes occasionally arrive as bare numbers
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Census exports are inconsistent about numbers: plain integers, floats,
// or quoted digit strings all occur. Anything else reads as missing.
pub fn prop_count(feature: &Feature, key: &str) -> Option<i64> {
    match feature.property(key)? {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn polygonal_geometry(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geometry = feature.geometry.as_ref()?;
    let converted: geo::Geometry<f64> = geometry.value.clone().try_into().ok()?;
    match converted {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        _ => None, // points/lines carry no area to identify against
    }
}
