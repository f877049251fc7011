use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{FlatType, ManagerId, Project, ProjectId, UnitType};

/// Errors raised while loading a project roster from CSV.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read project roster: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("project '{project}': unrecognized flat type '{value}'")]
    InvalidFlatType { project: String, value: String },
    #[error("project '{project}': unparseable date '{value}'")]
    InvalidDate { project: String, value: String },
    #[error("project '{project}': closing date precedes opening date")]
    InvalidWindow { project: String },
    #[error("project '{project}': flat type '{value}' listed twice")]
    DuplicateFlatType { project: String, value: String },
    #[error("duplicate project '{0}'")]
    DuplicateProject(String),
}

/// Parse a project roster CSV into domain records.
///
/// Accepts the flat-file layout the legacy system shipped with: one row per
/// project, a mandatory first flat type and an optional second one, dates in
/// either ISO or `dd/mm/yyyy` form.
pub fn projects_from_reader<R: Read>(reader: R) -> Result<Vec<Project>, SeedError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut projects = Vec::new();

    for record in csv_reader.deserialize::<ProjectRow>() {
        let row = record?;
        if !seen.insert(row.name.clone()) {
            return Err(SeedError::DuplicateProject(row.name));
        }
        projects.push(row.into_project()?);
    }

    Ok(projects)
}

pub fn projects_from_path(path: impl AsRef<Path>) -> Result<Vec<Project>, SeedError> {
    let file = std::fs::File::open(path)?;
    projects_from_reader(file)
}

#[derive(Debug, Deserialize)]
struct ProjectRow {
    #[serde(rename = "Project Name")]
    name: String,
    #[serde(rename = "Neighborhood")]
    neighborhood: String,
    #[serde(rename = "Type 1")]
    type_1: String,
    #[serde(rename = "Number of units for Type 1")]
    units_1: u32,
    #[serde(rename = "Selling price for Type 1")]
    price_1: u32,
    #[serde(rename = "Type 2", default, deserialize_with = "empty_string_as_none")]
    type_2: Option<String>,
    #[serde(rename = "Number of units for Type 2", default)]
    units_2: Option<u32>,
    #[serde(rename = "Selling price for Type 2", default)]
    price_2: Option<u32>,
    #[serde(rename = "Application opening date")]
    open_date: String,
    #[serde(rename = "Application closing date")]
    close_date: String,
    #[serde(rename = "Manager")]
    manager: String,
    #[serde(rename = "Officer Slot")]
    officer_slots: u8,
    #[serde(rename = "Visible", default)]
    visible: Option<bool>,
}

impl ProjectRow {
    fn into_project(self) -> Result<Project, SeedError> {
        let open_date = parse_date(&self.open_date).ok_or_else(|| SeedError::InvalidDate {
            project: self.name.clone(),
            value: self.open_date.clone(),
        })?;
        let close_date = parse_date(&self.close_date).ok_or_else(|| SeedError::InvalidDate {
            project: self.name.clone(),
            value: self.close_date.clone(),
        })?;
        if close_date < open_date {
            return Err(SeedError::InvalidWindow {
                project: self.name.clone(),
            });
        }

        let mut unit_types = BTreeMap::new();
        let first = parse_flat_type(&self.type_1).ok_or_else(|| SeedError::InvalidFlatType {
            project: self.name.clone(),
            value: self.type_1.clone(),
        })?;
        unit_types.insert(
            first,
            UnitType {
                total: self.units_1,
                available: self.units_1,
                price: self.price_1,
            },
        );

        if let Some(raw) = &self.type_2 {
            let second = parse_flat_type(raw).ok_or_else(|| SeedError::InvalidFlatType {
                project: self.name.clone(),
                value: raw.clone(),
            })?;
            let replaced = unit_types
                .insert(
                    second,
                    UnitType {
                        total: self.units_2.unwrap_or(0),
                        available: self.units_2.unwrap_or(0),
                        price: self.price_2.unwrap_or(0),
                    },
                )
                .is_some();
            if replaced {
                return Err(SeedError::DuplicateFlatType {
                    project: self.name.clone(),
                    value: raw.clone(),
                });
            }
        }

        Ok(Project {
            id: ProjectId(self.name.clone()),
            name: self.name,
            neighborhood: self.neighborhood,
            unit_types,
            open_date,
            close_date,
            manager: ManagerId(self.manager),
            officer_slots: self.officer_slots,
            assigned_officers: Vec::new(),
            visible: self.visible.unwrap_or(true),
        })
    }
}

fn parse_flat_type(value: &str) -> Option<FlatType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "2-room" | "2 room" | "two-room" => Some(FlatType::TwoRoom),
        "3-room" | "3 room" | "three-room" => Some(FlatType::ThreeRoom),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
