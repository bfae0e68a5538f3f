//! Bootcamp model and request bodies.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Course;

/// Photo assigned to bootcamps that never uploaded one.
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

static WEBSITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$")
        .unwrap_or_else(|error| panic!("website regex failed to compile: {error}"))
});

static SLUG_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+")
        .unwrap_or_else(|error| panic!("slug regex failed to compile: {error}"))
});

/// Career tracks a bootcamp can advertise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Career {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    Others,
}

impl Career {
    pub fn as_str(&self) -> &'static str {
        match self {
            Career::WebDevelopment => "Web Development",
            Career::MobileDevelopment => "Mobile Development",
            Career::UiUx => "UI/UX",
            Career::DataScience => "Data Science",
            Career::Business => "Business",
            Career::Others => "Others",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Web Development" => Some(Career::WebDevelopment),
            "Mobile Development" => Some(Career::MobileDevelopment),
            "UI/UX" => Some(Career::UiUx),
            "Data Science" => Some(Career::DataScience),
            "Business" => Some(Career::Business),
            "Others" => Some(Career::Others),
            _ => None,
        }
    }
}

/// GeoJSON point plus the structured address the geocoder resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A listed bootcamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub location: Option<Location>,
    pub careers: Vec<Career>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    /// Derived from course tuitions; `None` while the bootcamp has no courses
    pub average_cost: Option<i64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    /// Owning user id
    pub user: String,
    pub created_at: String,
    /// Populated on reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<Course>>,
}

/// A validated, geocoded bootcamp ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewBootcamp {
    pub user: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Location,
    pub careers: Vec<Career>,
    pub average_rating: Option<f64>,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
}

/// Request body for creating a bootcamp.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcampRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Please add a name of at most 50 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 500,
        message = "Please add a description of at most 500 characters"
    ))]
    pub description: String,
    #[serde(default)]
    #[validate(regex(path = *WEBSITE_RE, message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add an address"))]
    pub address: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Vec<Career>,
    #[serde(default)]
    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

impl CreateBootcampRequest {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.address = self.address.trim().to_string();
    }
}

/// Partial update of a bootcamp. Owner, slug and average cost are not client-settable.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcampRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Please add a name of at most 50 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 500,
        message = "Please add a description of at most 500 characters"
    ))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(regex(path = *WEBSITE_RE, message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add an address"))]
    pub address: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Option<Vec<Career>>,
    #[serde(default)]
    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub housing: Option<bool>,
    #[serde(default)]
    pub job_assistance: Option<bool>,
    #[serde(default)]
    pub job_guarantee: Option<bool>,
    #[serde(default)]
    pub accept_gi: Option<bool>,
}

impl UpdateBootcampRequest {
    pub fn normalize(&mut self) {
        if let Some(name) = self.name.as_mut() {
            *name = name.trim().to_string();
        }
        if let Some(address) = self.address.as_mut() {
            *address = address.trim().to_string();
        }
    }
}

/// Derive the URL-safe slug of a bootcamp name.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    SLUG_SEPARATOR_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
