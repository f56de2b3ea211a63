use crate::config::{FieldNames, PopulationStyleConfig};
use crate::data::{prop_count, prop_string};
use crate::style::{CategoryStyles, ColorRamp};
use crate::types::{SelectorEntry, Upazila};
use geojson::FeatureCollection;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

// Build the upazila picker entries: collection order, one entry per code,
// first occurrence wins (including its name - a later feature repeating the
// code with a different spelling is ignored). Features missing either code
// or name contribute nothing.
pub fn selector_entries(upazilas: &[Upazila]) -> Vec<SelectorEntry> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    for upazila in upazilas {
        let (Some(code), Some(name)) = (&upazila.code, &upazila.name) else {
            continue;
        };
        if seen.insert(code) {
            entries.push(SelectorEntry {
                code: code.clone(),
                name: name.clone(),
            });
        }
    }

    entries
}

// Choropleth colors are decided here, once, server side. The frontend only
// ever reads fillColor/color/fillOpacity back off the feature.
pub fn style_population_layer(
    collection: &FeatureCollection,
    fields: &FieldNames,
    ramp: &ColorRamp,
    style: &PopulationStyleConfig,
) -> FeatureCollection {
    let features = collection
        .features
        .par_iter()
        .map(|feature| {
            let mut feature = feature.clone();
            let population = prop_count(&feature, &fields.population);
            feature.set_property("fillColor", ramp.classify(population));
            feature.set_property("color", style.outline_color.clone());
            feature.set_property("fillOpacity", style.fill_opacity);
            feature
        })
        .collect();

    FeatureCollection {
        bbox: collection.bbox.clone(),
        features,
        foreign_members: collection.foreign_members.clone(),
    }
}

pub fn style_building_layer(
    collection: &FeatureCollection,
    fields: &FieldNames,
    styles: &CategoryStyles,
) -> FeatureCollection {
    let features = collection
        .features
        .par_iter()
        .map(|feature| {
            let mut feature = feature.clone();
            let category = prop_string(&feature, &fields.building_category);
            feature.set_property("color", styles.resolve(category.as_deref()));
            feature
        })
        .collect();

    FeatureCollection {
        bbox: collection.bbox.clone(),
        features,
        foreign_members: collection.foreign_members.clone(),
    }
}

#[derive(Debug)]
pub struct PopulationSummary {
    pub features: usize,
    pub selector_entries: usize,
    // features excluded from the selector for lacking code or name
    pub missing_identity: usize,
    // later features repeating an already-seen code
    pub duplicate_codes: usize,
    // per-bucket feature counts, parallel to ColorRamp::buckets()
    pub bucket_counts: Vec<usize>,
}

pub fn summarize_population(upazilas: &[Upazila], ramp: &ColorRamp) -> PopulationSummary {
    let entries = selector_entries(upazilas);

    let missing_identity = upazilas
        .iter()
        .filter(|u| u.code.is_none() || u.name.is_none())
        .count();
    let duplicate_codes = upazilas.len() - missing_identity - entries.len();

    let mut bucket_counts = vec![0usize; ramp.buckets().len()];
    for upazila in upazilas {
        bucket_counts[ramp.bucket_index(upazila.population)] += 1;
    }

    PopulationSummary {
        features: upazilas.len(),
        selector_entries: entries.len(),
        missing_identity,
        duplicate_codes,
        bucket_counts,
    }
}

#[derive(Debug)]
pub struct BuildingSummary {
    pub features: usize,
    pub category_counts: BTreeMap<String, usize>,
    // features styled with the default color: unknown category or none at all
    pub defaulted: usize,
}

pub fn summarize_buildings(
    collection: &FeatureCollection,
    fields: &FieldNames,
    styles: &CategoryStyles,
) -> BuildingSummary {
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut defaulted = 0;

    for feature in &collection.features {
        match prop_string(feature, &fields.building_category) {
            Some(category) => {
                if !styles.colors().contains_key(&category) {
                    defaulted += 1;
                }
                *category_counts.entry(category).or_insert(0) += 1;
            }
            None => defaulted += 1,
        }
    }

    BuildingSummary {
        features: collection.features.len(),
        category_counts,
        defaulted,
    }
}
