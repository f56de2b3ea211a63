use crate::config::{BucketConfig, BuildingStyleConfig};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::HashMap;

// Validated population class breaks, ascending by lower bound. Validation
// guarantees the table starts at 0, is contiguous with inclusive bounds
// (next lower = upper + 1) and ends in a single unbounded bucket, so every
// non-negative count lands in exactly one bucket.
#[derive(Debug, Clone)]
pub struct ColorRamp {
    buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub lower: u64,
    pub upper: Option<u64>,
    pub color: String,
}

impl Bucket {
    pub fn label(&self) -> String {
        match self.upper {
            Some(upper) => format!("{} - {}", self.lower, upper),
            None => format!("{}+", self.lower),
        }
    }
}

impl ColorRamp {
    pub fn from_config(buckets: &[BucketConfig]) -> Result<Self> {
        if buckets.is_empty() {
            return Err(anyhow!("Population style needs at least one bucket"));
        }

        let mut sorted: Vec<Bucket> = buckets
            .iter()
            .map(|b| {
                parse_hex_color(&b.color)
                    .with_context(|| format!("Bad bucket color {:?}", b.color))?;
                Ok(Bucket {
                    lower: b.lower,
                    upper: b.upper,
                    color: b.color.clone(),
                })
            })
            .collect::<Result<_>>()?;
        sorted.sort_by_key(|b| b.lower);

        if sorted[0].lower != 0 {
            return Err(anyhow!(
                "Buckets must cover from 0, first bucket starts at {}",
                sorted[0].lower
            ));
        }

        for pair in sorted.windows(2) {
            let upper = pair[0]
                .upper
                .ok_or_else(|| anyhow!("Only the last bucket may be unbounded"))?;
            if upper + 1 != pair[1].lower {
                return Err(anyhow!(
                    "Buckets must be contiguous: [{}, {}] is followed by lower bound {}",
                    pair[0].lower,
                    upper,
                    pair[1].lower
                ));
            }
        }

        let last = sorted.last().expect("checked non-empty");
        if last.upper.is_some() {
            return Err(anyhow!("The top bucket must be unbounded"));
        }

        Ok(ColorRamp { buckets: sorted })
    }

    // Missing counts read as the lowest bucket; negative counts clamp to zero.
    // Thresholds are scanned from the highest lower bound down, first match
    // wins, which with contiguous inclusive bounds is exact range membership.
    pub fn classify(&self, population: Option<i64>) -> &str {
        &self.buckets[self.bucket_index(population)].color
    }

    pub fn bucket_index(&self, population: Option<i64>) -> usize {
        let value = population.unwrap_or(0).max(0) as u64;
        for (i, bucket) in self.buckets.iter().enumerate().rev() {
            if value >= bucket.lower {
                return i;
            }
        }
        // lowest bucket starts at 0, so the scan cannot fall through
        0
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }
}

// Fixed category -> color table with a fallback for anything it has never
// heard of, including features with no category at all.
#[derive(Debug, Clone)]
pub struct CategoryStyles {
    colors: HashMap<String, String>,
    default_color: String,
}

impl CategoryStyles {
    pub fn from_config(config: &BuildingStyleConfig) -> Result<Self> {
        parse_hex_color(&config.default_color)
            .with_context(|| format!("Bad default color {:?}", config.default_color))?;
        for (category, color) in &config.colors {
            parse_hex_color(color)
                .with_context(|| format!("Bad color {:?} for category {:?}", color, category))?;
        }
        Ok(CategoryStyles {
            colors: config.colors.clone(),
            default_color: config.default_color.clone(),
        })
    }

    // Exact, case-sensitive lookup.
    pub fn resolve(&self, category: Option<&str>) -> &str {
        category
            .and_then(|c| self.colors.get(c))
            .unwrap_or(&self.default_color)
    }

    pub fn colors(&self) -> &HashMap<String, String> {
        &self.colors
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }
}

pub fn parse_hex_color(hex: &str) -> Result<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(anyhow!("Expected #RRGGBB, got {:?}", hex));
    }
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok((r, g, b))
}
