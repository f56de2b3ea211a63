// Runs the bundled sample datasets through the same load -> classify ->
// dedup -> index path the server uses at startup.

use std::path::PathBuf;

use upazila_map::config::AppConfig;
use upazila_map::server::AppState;
use upazila_map::style::{CategoryStyles, ColorRamp};
use upazila_map::{data, processing};

fn manifest_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn load_config() -> AppConfig {
    AppConfig::load_from_file(&manifest_path("config.toml")).expect("config.toml should parse")
}

#[test]
fn sample_data_flows_through_the_full_pipeline() {
    let config = load_config();

    let population = data::load_feature_collection(&manifest_path("data/upazila_population.geojson"))
        .expect("population sample should load");
    let buildings = data::load_feature_collection(&manifest_path("data/building_points.geojson"))
        .expect("building sample should load");

    let ramp = ColorRamp::from_config(&config.style.population.buckets).unwrap();
    let styles = CategoryStyles::from_config(&config.style.buildings).unwrap();

    let upazilas = data::extract_upazilas(&population, &config.input.fields);
    assert_eq!(upazilas.len(), 6);

    // every sample feature carries code and name, none repeat
    let entries = processing::selector_entries(&upazilas);
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0].code, "302614");
    assert_eq!(entries[0].name, "Dhanmondi");

    // Dhanmondi's 600000 tops the default ramp; Nawabganj has no T_TL and
    // reads as the lowest bucket
    assert_eq!(ramp.classify(upazilas[0].population), "#800026");
    assert_eq!(ramp.classify(upazilas[5].population), "#FFEDA0");

    let styled = processing::style_population_layer(
        &population,
        &config.input.fields,
        &ramp,
        &config.style.population,
    );
    for feature in &styled.features {
        assert!(feature.property("fillColor").is_some());
        assert!(feature.property("fillOpacity").is_some());
    }

    let styled_buildings =
        processing::style_building_layer(&buildings, &config.input.fields, &styles);
    for feature in &styled_buildings.features {
        assert!(feature.property("color").is_some());
    }

    // the school point and the category-less point fall back to the default
    let summary = processing::summarize_buildings(&buildings, &config.input.fields, &styles);
    assert_eq!(summary.features, 7);
    assert_eq!(summary.defaulted, 2);
}

#[test]
fn server_state_builds_and_identifies_from_sample_data() {
    let config = load_config();

    let population = data::load_feature_collection(&manifest_path("data/upazila_population.geojson"))
        .unwrap();
    let buildings =
        data::load_feature_collection(&manifest_path("data/building_points.geojson")).unwrap();

    let state = AppState::build(config, population, buildings).unwrap();

    // a point in central Dhanmondi
    let hit = state.identify(90.37, 23.74).expect("point should identify");
    assert_eq!(hit.code.as_deref(), Some("302614"));
    assert_eq!(hit.population, Some(600000));

    // open water south of the sample polygons
    assert!(state.identify(89.0, 22.0).is_none());

    // select-to-zoom lookup returns bounds matching the sample square
    let detail = state.lookup("302672").expect("Savar should resolve");
    assert_eq!(detail.bounds, Some([90.20, 23.78, 90.30, 23.90]));
}
