use crate::config::AppConfig;
use crate::data;
use crate::processing;
use crate::style::{Bucket, CategoryStyles, ColorRamp};
use crate::types::{SelectorEntry, Upazila};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub upazilas: Vec<Upazila>,
    pub entries: Vec<SelectorEntry>,
    // styled layers are serialized once at startup and handed out as-is
    pub population_layer: serde_json::Value,
    pub building_layer: serde_json::Value,
    pub legend: Legend,
    tree: RTree<AreaIndex>,
}

#[derive(Serialize, Clone)]
pub struct Legend {
    pub population: Vec<Bucket>,
    pub buildings: BuildingLegend,
}

#[derive(Serialize, Clone)]
pub struct BuildingLegend {
    pub colors: HashMap<String, String>,
    pub default_color: String,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
pub struct UpazilaDetail {
    pub code: Option<String>,
    pub name: Option<String>,
    pub population: Option<i64>,
    pub male: Option<i64>,
    pub female: Option<i64>,
    pub building_count: Option<i64>,
    // [minx, miny, maxx, maxy], for fitBounds on select-to-zoom
    pub bounds: Option<[f64; 4]>,
}

impl UpazilaDetail {
    fn from_upazila(upazila: &Upazila) -> Self {
        let bounds = upazila
            .geometry
            .as_ref()
            .and_then(|g| g.bounding_rect())
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
        UpazilaDetail {
            code: upazila.code.clone(),
            name: upazila.name.clone(),
            population: upazila.population,
            male: upazila.male,
            female: upazila.female,
            building_count: upazila.building_count,
            bounds,
        }
    }
}

impl AppState {
    pub fn build(
        config: AppConfig,
        population: FeatureCollection,
        buildings: FeatureCollection,
    ) -> Result<Self> {
        let ramp = ColorRamp::from_config(&config.style.population.buckets)
            .context("Invalid population style")?;
        let styles = CategoryStyles::from_config(&config.style.buildings)
            .context("Invalid building style")?;

        let upazilas = data::extract_upazilas(&population, &config.input.fields);
        let entries = processing::selector_entries(&upazilas);
        info!(
            "Prepared {} selector entries from {} population features",
            entries.len(),
            upazilas.len()
        );

        let population_layer = serde_json::to_value(processing::style_population_layer(
            &population,
            &config.input.fields,
            &ramp,
            &config.style.population,
        ))?;
        let building_layer = serde_json::to_value(processing::style_building_layer(
            &buildings,
            &config.input.fields,
            &styles,
        ))?;

        let legend = Legend {
            population: ramp.buckets().to_vec(),
            buildings: BuildingLegend {
                colors: styles.colors().clone(),
                default_color: styles.default_color().to_string(),
            },
        };

        // Build Spatial Index
        let tree_items: Vec<AreaIndex> = upazilas
            .iter()
            .enumerate()
            .filter_map(|(i, upazila)| {
                let rect = upazila.geometry.as_ref()?.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        let tree = RTree::bulk_load(tree_items);
        info!("Spatial index built over {} polygons", tree.size());

        Ok(AppState {
            config,
            upazilas,
            entries,
            population_layer,
            building_layer,
            legend,
            tree,
        })
    }

    // Click-to-identify: cheap envelope candidates first, exact
    // point-in-polygon to confirm, first containing polygon wins.
    pub fn identify(&self, lon: f64, lat: f64) -> Option<UpazilaDetail> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        for candidate in self.tree.locate_in_envelope_intersecting(&envelope) {
            let upazila = self.upazilas.get(candidate.index)?;
            if let Some(geometry) = &upazila.geometry {
                if geometry.contains(&point) {
                    return Some(UpazilaDetail::from_upazila(upazila));
                }
            }
        }

        None
    }

    // Select-to-zoom: first feature carrying the code, same order the
    // selector was built in.
    pub fn lookup(&self, code: &str) -> Option<UpazilaDetail> {
        self.upazilas
            .iter()
            .find(|u| u.code.as_deref() == Some(code))
            .map(UpazilaDetail::from_upazila)
    }
}

pub async fn start_server(
    config: AppConfig,
    population: FeatureCollection,
    buildings: FeatureCollection,
) -> Result<()> {
    let static_dir = config.server.static_dir.clone();
    let port = config.server.port;

    let state = Arc::new(AppState::build(config, population, buildings)?);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/upazilas", get(selector_handler))
        .route("/api/upazilas/:code", get(lookup_handler))
        .route("/api/layers/population", get(population_layer_handler))
        .route("/api/layers/buildings", get(building_layer_handler))
        .route("/api/query", get(query_handler))
        .route("/api/meta", get(meta_handler))
        .nest_service("/", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn selector_handler(State(state): State<Arc<AppState>>) -> Json<Vec<SelectorEntry>> {
    Json(state.entries.clone())
}

async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<Option<UpazilaDetail>> {
    Json(state.lookup(&code))
}

async fn population_layer_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.population_layer.clone())
}

async fn building_layer_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.building_layer.clone())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<UpazilaDetail>> {
    Json(state.identify(params.lon, params.lat))
}

#[derive(Serialize)]
struct MetaResponse {
    map: MapMeta,
    legend: Legend,
}

#[derive(Serialize)]
struct MapMeta {
    center: [f64; 2],
    zoom: u8,
    select_zoom: u8,
}

async fn meta_handler(State(state): State<Arc<AppState>>) -> Json<MetaResponse> {
    Json(MetaResponse {
        map: MapMeta {
            center: state.config.map.center,
            zoom: state.config.map.zoom,
            select_zoom: state.config.map.select_zoom,
        },
        legend: state.legend.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::GeoJson;

    fn test_config() -> AppConfig {
        toml::from_str(
            r##"
            [input]
            population_geojson = "unused.geojson"
            building_geojson = "unused.geojson"

            [style.population]
            buckets = [
                { lower = 0, upper = 50000, color = "#FFEDA0" },
                { lower = 50001, color = "#800026" },
            ]

            [style.buildings]
            default_color = "#3388FF"
            [style.buildings.colors]
            residential = "#3388FF"

            [map]
            center = [90.4125, 23.8103]
            zoom = 7
            select_zoom = 10

            [server]
            port = 0
            static_dir = "web"
        "##,
        )
        .unwrap()
    }

    fn collection(json: &str) -> FeatureCollection {
        let geojson: GeoJson = json.parse().unwrap();
        FeatureCollection::try_from(geojson).unwrap()
    }

    fn test_state() -> AppState {
        let population = collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"ADM3_PCODE": "P1", "ADM3_EN": "Dhanmondi", "T_TL": 600000},
                        "geometry": {
                            "type": "Polygon",
                            "coordinates": [[[90.0, 23.0], [91.0, 23.0], [91.0, 24.0], [90.0, 24.0], [90.0, 23.0]]]
                        }
                    },
                    {
                        "type": "Feature",
                        "properties": {"ADM3_PCODE": "P2", "ADM3_EN": "Savar", "T_TL": 1200},
                        "geometry": {
                            "type": "Polygon",
                            "coordinates": [[[92.0, 23.0], [93.0, 23.0], [93.0, 24.0], [92.0, 24.0], [92.0, 23.0]]]
                        }
                    }
                ]
            }"#,
        );
        let buildings = collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"building": "residential"},
                        "geometry": {"type": "Point", "coordinates": [90.5, 23.5]}
                    }
                ]
            }"#,
        );
        AppState::build(test_config(), population, buildings).unwrap()
    }

    #[test]
    fn identify_returns_the_containing_upazila() {
        let state = test_state();
        let hit = state.identify(90.5, 23.5).unwrap();
        assert_eq!(hit.code.as_deref(), Some("P1"));
        assert_eq!(hit.name.as_deref(), Some("Dhanmondi"));
        assert_eq!(hit.population, Some(600000));
        assert_eq!(hit.bounds, Some([90.0, 23.0, 91.0, 24.0]));
    }

    #[test]
    fn identify_misses_outside_every_polygon() {
        let state = test_state();
        assert!(state.identify(95.0, 23.5).is_none());
        // the gap between the two squares: no envelope matches
        assert!(state.identify(91.5, 23.5).is_none());
    }

    #[test]
    fn lookup_finds_by_code() {
        let state = test_state();
        let detail = state.lookup("P2").unwrap();
        assert_eq!(detail.name.as_deref(), Some("Savar"));
        assert!(state.lookup("P9").is_none());
    }

    #[test]
    fn styled_layers_and_legend_are_prepared_at_build() {
        let state = test_state();
        assert_eq!(state.entries.len(), 2);

        let features = state.population_layer["features"].as_array().unwrap();
        assert_eq!(features[0]["properties"]["fillColor"], "#800026");
        assert_eq!(features[1]["properties"]["fillColor"], "#FFEDA0");

        let buildings = state.building_layer["features"].as_array().unwrap();
        assert_eq!(buildings[0]["properties"]["color"], "#3388FF");

        assert_eq!(state.legend.population.len(), 2);
        assert_eq!(state.legend.buildings.default_color, "#3388FF");
    }
}
