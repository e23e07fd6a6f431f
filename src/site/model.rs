//! Content records as the API delivers them
//!
//! Every field defaults, so a record missing optional fields still renders.
//! Unknown fields (ids, timestamps) are ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Slide {
    pub image: String,
    pub heading: String,
    pub caption: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ministry {
    pub name: String,
    pub description: String,
    pub leader: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    pub title: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeGroup {
    pub name: String,
    pub leader: String,
    pub day: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Testimonial {
    pub name: String,
    pub quote: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GiveOption {
    pub label: String,
    pub description: String,
    pub url: String,
}

/// Summary the home page publishes to the store under `site`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteSummary {
    pub name: String,
    pub tagline: String,
    pub service_times: Vec<String>,
}
