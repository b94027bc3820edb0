use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::geo::Bbox;
use crate::project::{Difficulty, MappingType, ProjectStatus};

/// Results per search page.
pub const PAGE_SIZE: u32 = 14;

/// Largest bounding box a geo-search may cover, in square degrees.
pub const MAX_BBOX_AREA_SQ_DEG: f64 = 25.0;

/// Sortable columns for project search, whitelisted to keep ORDER BY
/// assembly injection-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Id,
    #[default]
    Priority,
    Difficulty,
    Status,
    LastUpdated,
    DueDate,
}

impl OrderBy {
    /// Column name used verbatim in ORDER BY.
    pub fn as_column(&self) -> &'static str {
        match self {
            OrderBy::Id => "id",
            OrderBy::Priority => "priority",
            OrderBy::Difficulty => "difficulty",
            OrderBy::Status => "status",
            OrderBy::LastUpdated => "last_updated",
            OrderBy::DueDate => "due_date",
        }
    }
}

impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(OrderBy::Id),
            "priority" => Ok(OrderBy::Priority),
            "difficulty" => Ok(OrderBy::Difficulty),
            "status" => Ok(OrderBy::Status),
            "last_updated" => Ok(OrderBy::LastUpdated),
            "due_date" => Ok(OrderBy::DueDate),
            _ => Err(format!("Unknown order column: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ASC" => Ok(OrderDirection::Asc),
            "DESC" => Ok(OrderDirection::Desc),
            _ => Err(format!("Order direction must be ASC or DESC, got {s}")),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Filter set for project search.
///
/// `created_by` / `mapped_by` / `managed_by` carry the authenticated
/// user's id when the corresponding "…ByMe" flag was requested.
#[derive(Debug, Clone)]
pub struct ProjectSearch {
    pub preferred_locale: String,
    pub difficulty: Option<Difficulty>,
    pub mapping_types: Vec<MappingType>,
    /// Require projects to carry exactly the requested mapping types.
    pub mapping_types_exact: bool,
    pub statuses: Vec<ProjectStatus>,
    pub organisation_id: Option<i64>,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub text_search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub last_updated_from: Option<DateTime<Utc>>,
    pub last_updated_to: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub mapped_by: Option<i64>,
    pub managed_by: Option<i64>,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
    /// 1-based page number.
    pub page: u32,
    pub omit_map_results: bool,
}

impl Default for ProjectSearch {
    fn default() -> Self {
        Self {
            preferred_locale: "en".to_string(),
            difficulty: None,
            mapping_types: Vec::new(),
            mapping_types_exact: false,
            statuses: Vec::new(),
            organisation_id: None,
            organisation_name: None,
            campaign: None,
            country: None,
            text_search: None,
            created_from: None,
            created_to: None,
            last_updated_from: None,
            last_updated_to: None,
            created_by: None,
            mapped_by: None,
            managed_by: None,
            order_by: OrderBy::default(),
            order_direction: OrderDirection::default(),
            page: 1,
            omit_map_results: false,
        }
    }
}

impl ProjectSearch {
    /// SQL OFFSET for the requested page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(PAGE_SIZE)
    }

    /// Total page count for a result total.
    pub fn pages(total: i64) -> i64 {
        (total + i64::from(PAGE_SIZE) - 1) / i64::from(PAGE_SIZE)
    }
}

/// Parameters of a bounding-box project query.
#[derive(Debug, Clone)]
pub struct BboxSearch {
    pub bbox: Bbox,
    pub srid: i32,
    /// Restrict to projects created by this user.
    pub author_id: Option<i64>,
}

impl BboxSearch {
    /// Parse `xmin,ymin,xmax,ymax` into a validated search.
    ///
    /// Only EPSG:4326 input is accepted; the area guard rejects boxes
    /// larger than [`MAX_BBOX_AREA_SQ_DEG`].
    pub fn parse(raw: &str, srid: i32) -> Result<Self, AppError> {
        if srid != 4326 {
            return Err(AppError::InvalidData(format!(
                "Unsupported srid {srid}, only 4326 is accepted"
            )));
        }
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| {
                AppError::InvalidData(format!("Invalid bbox \"{raw}\": expected four numbers"))
            })?;
        let &[min_x, min_y, max_x, max_y] = parts.as_slice() else {
            return Err(AppError::InvalidData(format!(
                "Invalid bbox \"{raw}\": expected xmin,ymin,xmax,ymax"
            )));
        };
        if min_x >= max_x || min_y >= max_y {
            return Err(AppError::InvalidData(
                "Invalid bbox: min corner must be south-west of max corner".to_string(),
            ));
        }
        let bbox = Bbox { min_x, min_y, max_x, max_y };
        let area = bbox.area();
        if area > MAX_BBOX_AREA_SQ_DEG {
            return Err(AppError::BBoxTooBig { area, max: MAX_BBOX_AREA_SQ_DEG });
        }
        Ok(Self { bbox, srid, author_id: None })
    }
}
