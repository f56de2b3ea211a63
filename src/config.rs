use std::collections::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub style: StyleConfig,
    pub map: MapConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub population_geojson: PathBuf,
    pub building_geojson: PathBuf,
    #[serde(default)]
    pub fields: FieldNames,
}

// GeoJSON property keys, defaulting to the BBS upazila export schema.
#[derive(Debug, Deserialize, Clone)]
pub struct FieldNames {
    #[serde(default = "default_code_field")]
    pub code: String,
    #[serde(default = "default_name_field")]
    pub name: String,
    #[serde(default = "default_population_field")]
    pub population: String,
    #[serde(default = "default_male_field")]
    pub male: String,
    #[serde(default = "default_female_field")]
    pub female: String,
    #[serde(default = "default_building_count_field")]
    pub building_count: String,
    #[serde(default = "default_category_field")]
    pub building_category: String,
}

fn default_code_field() -> String {
    "ADM3_PCODE".to_string()
}
fn default_name_field() -> String {
    "ADM3_EN".to_string()
}
fn default_population_field() -> String {
    "T_TL".to_string()
}
fn default_male_field() -> String {
    "M_TL".to_string()
}
fn default_female_field() -> String {
    "F_TL".to_string()
}
fn default_building_count_field() -> String {
    "buildingCount".to_string()
}
fn default_category_field() -> String {
    "building".to_string()
}

impl Default for FieldNames {
    fn default() -> Self {
        FieldNames {
            code: default_code_field(),
            name: default_name_field(),
            population: default_population_field(),
            male: default_male_field(),
            female: default_female_field(),
            building_count: default_building_count_field(),
            building_category: default_category_field(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StyleConfig {
    pub population: PopulationStyleConfig,
    pub buildings: BuildingStyleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PopulationStyleConfig {
    pub buckets: Vec<BucketConfig>,
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,
    #[serde(default = "default_outline_color")]
    pub outline_color: String, // Hex code
}

fn default_fill_opacity() -> f64 {
    0.7
}
fn default_outline_color() -> String {
    "#000000".to_string()
}

// One class break: inclusive on both ends, upper = None means unbounded.
#[derive(Debug, Deserialize, Clone)]
pub struct BucketConfig {
    pub lower: u64,
    pub upper: Option<u64>,
    pub color: String, // Hex code
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildingStyleConfig {
    pub default_color: String,
    pub colors: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    // [lon, lat], GeoJSON axis order
    pub center: [f64; 2],
    pub zoom: u8,
    pub select_zoom: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
