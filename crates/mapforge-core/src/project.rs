use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::geo::{self, Bbox, Position};

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "DRAFT",
            ProjectStatus::Published => "PUBLISHED",
            ProjectStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Ok(ProjectStatus::Draft),
            "PUBLISHED" => Ok(ProjectStatus::Published),
            "ARCHIVED" => Ok(ProjectStatus::Archived),
            _ => Err(format!("Unknown project status: {s}")),
        }
    }
}

/// Scheduling priority of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl ProjectPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPriority::Urgent => "URGENT",
            ProjectPriority::High => "HIGH",
            ProjectPriority::Medium => "MEDIUM",
            ProjectPriority::Low => "LOW",
        }
    }
}

impl fmt::Display for ProjectPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "URGENT" => Ok(ProjectPriority::Urgent),
            "HIGH" => Ok(ProjectPriority::High),
            "MEDIUM" => Ok(ProjectPriority::Medium),
            "LOW" => Ok(ProjectPriority::Low),
            _ => Err(format!("Unknown project priority: {s}")),
        }
    }
}

/// Mapping difficulty advertised to contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Moderate => "MODERATE",
            Difficulty::Challenging => "CHALLENGING",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EASY" => Ok(Difficulty::Easy),
            "MODERATE" => Ok(Difficulty::Moderate),
            "CHALLENGING" => Ok(Difficulty::Challenging),
            _ => Err(format!("Unknown difficulty: {s}")),
        }
    }
}

/// Kind of feature a project asks contributors to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingType {
    Buildings,
    Roads,
    Waterways,
    LandUse,
    Other,
}

impl MappingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingType::Buildings => "BUILDINGS",
            MappingType::Roads => "ROADS",
            MappingType::Waterways => "WATERWAYS",
            MappingType::LandUse => "LAND_USE",
            MappingType::Other => "OTHER",
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MappingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUILDINGS" => Ok(MappingType::Buildings),
            "ROADS" => Ok(MappingType::Roads),
            "WATERWAYS" => Ok(MappingType::Waterways),
            "LAND_USE" => Ok(MappingType::LandUse),
            "OTHER" => Ok(MappingType::Other),
            _ => Err(format!("Unknown mapping type: {s}")),
        }
    }
}

/// Localized project texts for one locale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub locale: String,
    pub name: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
}

/// A project as persisted: scalar fields plus AOI/task payloads.
///
/// Locale translations, allowed users and priority areas hang off the
/// project row and are aggregated in [`ProjectDetail`].
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub difficulty: Difficulty,
    pub author_id: i64,
    pub organisation_id: Option<i64>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub default_locale: String,
    pub imagery: Option<String>,
    pub license_id: Option<i64>,
    pub private: bool,
    pub featured: bool,
    pub mapping_types: Vec<MappingType>,
    pub changeset_comment: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// GeoJSON MultiPolygon of the area of interest.
    pub aoi: Value,
    pub bbox: Bbox,
    pub centroid: Position,
    /// GeoJSON FeatureCollection of task geometries.
    pub tasks: Value,
    pub arbitrary_tasks: bool,
    pub total_tasks: i32,
    pub tasks_mapped: i32,
    pub tasks_validated: i32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Project {
    pub fn percent_mapped(&self) -> u32 {
        percent(self.tasks_mapped, self.total_tasks)
    }

    pub fn percent_validated(&self) -> u32 {
        percent(self.tasks_validated, self.total_tasks)
    }

    /// GeoJSON Point at the AOI centroid.
    pub fn centroid_geojson(&self) -> Value {
        serde_json::json!({ "type": "Point", "coordinates": [self.centroid.0, self.centroid.1] })
    }
}

fn percent(part: i32, total: i32) -> u32 {
    if total <= 0 {
        0
    } else {
        (part.max(0) as u32 * 100) / total as u32
    }
}

/// A project with its satellite rows, as served by detail endpoints.
#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub project: Project,
    pub locales: Vec<ProjectInfo>,
    pub priority_areas: Vec<Value>,
    pub allowed_usernames: Vec<String>,
    pub organisation_name: Option<String>,
    pub author_username: String,
}

impl ProjectDetail {
    /// Resolve texts for the requested locale: exact match, then the
    /// primary subtag (`pt-BR` falls back to `pt`), then the project
    /// default locale, then a bare record carrying the project name.
    pub fn info_for_locale(&self, locale: &str) -> ProjectInfo {
        let find = |l: &str| {
            self.locales
                .iter()
                .find(|info| info.locale.eq_ignore_ascii_case(l))
        };
        let primary = locale.split('-').next().unwrap_or(locale);
        find(locale)
            .or_else(|| find(primary))
            .or_else(|| find(&self.project.default_locale))
            .cloned()
            .unwrap_or_else(|| ProjectInfo {
                locale: self.project.default_locale.clone(),
                name: self.project.name.clone(),
                short_description: None,
                description: None,
                instructions: None,
            })
    }
}

/// Input for creating a draft project.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftProject {
    pub name: String,
    /// GeoJSON Polygon/MultiPolygon/FeatureCollection delimiting the AOI.
    pub area_of_interest: Value,
    /// Optional pre-split task FeatureCollection.
    pub tasks: Option<Value>,
    pub arbitrary_tasks: bool,
    pub organisation_id: Option<i64>,
}

/// A draft that passed validation, with derived geometry attached.
#[derive(Debug, Clone)]
pub struct ValidatedDraft {
    pub name: String,
    pub aoi: Value,
    pub bbox: Bbox,
    pub centroid: Position,
    pub tasks: Value,
    pub total_tasks: i32,
    pub arbitrary_tasks: bool,
    pub organisation_id: Option<i64>,
}

impl DraftProject {
    /// Validate the draft and derive AOI geometry.
    ///
    /// When no task FeatureCollection is supplied the AOI itself becomes
    /// the single task, matching arbitrary-task project creation.
    pub fn validate(self) -> Result<ValidatedDraft, AppError> {
        let name = self.name.trim();
        if name.len() < 3 {
            return Err(AppError::InvalidData(
                "Project name must be at least 3 characters".to_string(),
            ));
        }

        let aoi = geo::parse_multipolygon(&self.area_of_interest)?;
        let bbox = aoi.bbox();
        let centroid = aoi.centroid();

        let (tasks, total_tasks) = match self.tasks {
            Some(tasks) => {
                let count = geo::feature_count(&tasks)?;
                if count == 0 {
                    return Err(AppError::InvalidData(
                        "Task collection must contain at least one task".to_string(),
                    ));
                }
                (tasks, count as i32)
            }
            None => {
                let task = geo::feature(
                    aoi.to_geojson(),
                    serde_json::json!({ "taskId": 1 }),
                );
                (geo::feature_collection(vec![task]), 1)
            }
        };

        Ok(ValidatedDraft {
            name: name.to_string(),
            aoi: aoi.to_geojson(),
            bbox,
            centroid,
            tasks,
            total_tasks,
            arbitrary_tasks: self.arbitrary_tasks,
            organisation_id: self.organisation_id,
        })
    }
}

/// Partial update applied by PATCH; every field optional.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub difficulty: Option<Difficulty>,
    pub default_locale: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub organisation_id: Option<i64>,
    pub imagery: Option<String>,
    pub license_id: Option<i64>,
    pub private: Option<bool>,
    pub mapping_types: Option<Vec<MappingType>>,
    pub changeset_comment: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub locales: Option<Vec<ProjectInfo>>,
    pub allowed_usernames: Option<Vec<String>>,
    pub priority_areas: Option<Vec<Value>>,
}

impl ProjectUpdate {
    /// Validate field contents before the update is applied.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(imagery) = &self.imagery {
            url::Url::parse(imagery).map_err(|_| {
                AppError::InvalidData(format!("Invalid imagery URL: {imagery}"))
            })?;
        }
        if let Some(locales) = &self.locales {
            for info in locales {
                if info.locale.trim().is_empty() || info.name.trim().is_empty() {
                    return Err(AppError::InvalidData(
                        "Project info entries need a locale and a name".to_string(),
                    ));
                }
            }
        }
        if let Some(areas) = &self.priority_areas {
            for area in areas {
                geo::parse_polygon(area)?;
            }
        }
        Ok(())
    }
}
