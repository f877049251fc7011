use std::sync::Arc;

use super::domain::{FlatType, OfficerId, Project, ProjectId, UnitType};
use super::store::{EntityStore, StoreError};

/// Validation errors raised by inventory and officer-roster mutations.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    #[error("project {project} already offers {flat_type}")]
    DuplicateUnitType {
        project: ProjectId,
        flat_type: FlatType,
    },
    #[error("project {project} does not offer {flat_type}")]
    UnitTypeNotFound {
        project: ProjectId,
        flat_type: FlatType,
    },
    #[error("project {project} has {available} {flat_type} unit(s) left, {requested} requested")]
    InsufficientInventory {
        project: ProjectId,
        flat_type: FlatType,
        available: u32,
        requested: u32,
    },
    #[error("returning {requested} {flat_type} unit(s) to {project} would exceed the total of {total}")]
    OverAllocation {
        project: ProjectId,
        flat_type: FlatType,
        total: u32,
        requested: u32,
    },
    #[error("project {project} has no open officer slots ({slots} filled)")]
    SlotsFull { project: ProjectId, slots: u8 },
    #[error("officer {officer} is already assigned to project {project}")]
    DuplicateOfficer {
        project: ProjectId,
        officer: OfficerId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mutation surface for a project's unit counts and officer roster.
///
/// Each operation fetches the project, validates and mutates a copy, and
/// persists it with `replace` only once validation has passed, so a failed
/// call leaves the store untouched.
pub struct ProjectInventory<S> {
    store: Arc<S>,
}

impl<S> ProjectInventory<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn fetch(&self, project: &ProjectId) -> Result<Project, InventoryError> {
        self.store
            .find_project(project)?
            .ok_or_else(|| InventoryError::ProjectNotFound(project.clone()))
    }

    /// Add a flat type to a project with `available` starting at `total`.
    pub fn add_unit_type(
        &self,
        project: &ProjectId,
        flat_type: FlatType,
        total: u32,
        price: u32,
    ) -> Result<(), InventoryError> {
        let mut record = self.fetch(project)?;
        if record.offers(flat_type) {
            return Err(InventoryError::DuplicateUnitType {
                project: project.clone(),
                flat_type,
            });
        }

        record.unit_types.insert(
            flat_type,
            UnitType {
                total,
                available: total,
                price,
            },
        );
        self.store.replace_project(record)?;
        Ok(())
    }

    /// Consume `count` units of `flat_type`. Booking is the only caller.
    pub fn decrease_available(
        &self,
        project: &ProjectId,
        flat_type: FlatType,
        count: u32,
    ) -> Result<(), InventoryError> {
        let mut record = self.fetch(project)?;
        let unit = record.unit_types.get_mut(&flat_type).ok_or_else(|| {
            InventoryError::UnitTypeNotFound {
                project: project.clone(),
                flat_type,
            }
        })?;

        if unit.available < count {
            return Err(InventoryError::InsufficientInventory {
                project: project.clone(),
                flat_type,
                available: unit.available,
                requested: count,
            });
        }

        unit.available -= count;
        self.store.replace_project(record)?;
        Ok(())
    }

    /// Reverse a prior decrease (withdrawal reversal or booking rollback).
    pub fn increase_available(
        &self,
        project: &ProjectId,
        flat_type: FlatType,
        count: u32,
    ) -> Result<(), InventoryError> {
        let mut record = self.fetch(project)?;
        let unit = record.unit_types.get_mut(&flat_type).ok_or_else(|| {
            InventoryError::UnitTypeNotFound {
                project: project.clone(),
                flat_type,
            }
        })?;

        if unit.available + count > unit.total {
            return Err(InventoryError::OverAllocation {
                project: project.clone(),
                flat_type,
                total: unit.total,
                requested: count,
            });
        }

        unit.available += count;
        self.store.replace_project(record)?;
        Ok(())
    }

    /// Append an officer to the project roster, respecting slot capacity.
    pub fn assign_officer(
        &self,
        project: &ProjectId,
        officer: &OfficerId,
    ) -> Result<(), InventoryError> {
        let mut record = self.fetch(project)?;
        if record.assigned_officers.contains(officer) {
            return Err(InventoryError::DuplicateOfficer {
                project: project.clone(),
                officer: officer.clone(),
            });
        }
        if record.assigned_officers.len() >= usize::from(record.officer_slots) {
            return Err(InventoryError::SlotsFull {
                project: project.clone(),
                slots: record.officer_slots,
            });
        }

        record.assigned_officers.push(officer.clone());
        self.store.replace_project(record)?;
        Ok(())
    }
}

impl<S> Clone for ProjectInventory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
