// Regional knowledge base for the assistant
// Static Mon Valley air-quality context and the keyword retrieval
// used to enrich prompts sent to the model
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Location,
    AirQualitySources,
    HealthEffects,
    SteelMillEmissions,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Location,
        Category::AirQualitySources,
        Category::HealthEffects,
        Category::SteelMillEmissions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Location => "location",
            Category::AirQualitySources => "air_quality_sources",
            Category::HealthEffects => "health_effects",
            Category::SteelMillEmissions => "steel_mill_emissions",
        }
    }

    pub fn data(&self) -> &'static Value {
        &KNOWLEDGE[self.name()]
    }
}

static KNOWLEDGE: Lazy<Value> = Lazy::new(|| {
    json!({
        "location": {
            "name": "Mon Valley",
            "description": "The Monongahela Valley in southwestern Pennsylvania, home to major steel mills including U.S. Steel's Clairton Works",
            "coordinates": { "lat": 40.292, "lng": -79.881 },
            "key_industries": ["Steel manufacturing", "Coke production", "Chemical processing"]
        },
        "air_quality_sources": {
            "epa": "Environmental Protection Agency air quality standards and monitoring",
            "purpleair": "Community air quality sensors providing real-time PM2.5 data",
            "nasa": "Satellite-based air quality monitoring and forecasting",
            "openweathermap": "Weather and air quality data for the region",
            "achd": "Allegheny County Health Department air quality monitoring",
            "pa_dep": "Pennsylvania Department of Environmental Protection"
        },
        "health_effects": {
            "pm25": "Fine particulate matter that can penetrate deep into lungs",
            "pm10": "Coarse particulate matter that can irritate respiratory system",
            "so2": "Sulfur dioxide from industrial processes, can cause respiratory issues",
            "no2": "Nitrogen dioxide from combustion, can aggravate asthma",
            "o3": "Ground-level ozone, can cause breathing problems"
        },
        "steel_mill_emissions": {
            "clairton_works": "U.S. Steel's Clairton Works - largest coke plant in North America",
            "emissions": ["PM2.5", "PM10", "SO2", "NOx", "VOCs", "Heavy metals"],
            "health_impacts": "Increased respiratory issues, cardiovascular problems, and cancer risk"
        }
    })
});

const RULES: &[(&[&str], &[Category])] = &[
    (
        &["mon valley", "clairton", "steel mill"],
        &[Category::Location, Category::SteelMillEmissions],
    ),
    (
        &["air quality", "aqi", "pollution"],
        &[Category::AirQualitySources],
    ),
    (&["health", "symptom", "effect"], &[Category::HealthEffects]),
    (&["pm2.5", "pm10", "so2", "no2"], &[Category::HealthEffects]),
];

const PREAMBLE: &str = "You are BreatheAI, an air quality health assistant for the Mon Valley region of Pennsylvania. \
Answer accurately and put the user's health and safety first.";

/// Categories relevant to `query`, in match order, each at most once.
pub fn retrieve(query: &str) -> Vec<Category> {
    let query = query.to_lowercase();
    let mut found = Vec::new();
    for (keywords, categories) in RULES {
        if keywords.iter().any(|k| query.contains(k)) {
            for category in *categories {
                if !found.contains(category) {
                    found.push(*category);
                }
            }
        }
    }
    found
}

/// Keys of the first matched category, reported back to the client as sources
pub fn sources(context: &[Category]) -> Vec<String> {
    context
        .first()
        .and_then(|c| c.data().as_object())
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn build_prompt(message: &str, context: &[Category]) -> String {
    let mut system = PREAMBLE.to_string();
    if !context.is_empty() {
        let data: Vec<&Value> = context.iter().map(|c| c.data()).collect();
        let rendered = serde_json::to_string_pretty(&data).unwrap_or_default();
        system.push_str("\n\nRelevant context for this query:\n");
        system.push_str(&rendered);
    }
    format!("{system}\n\nUser: {message}\n\nBreatheAI:")
}
