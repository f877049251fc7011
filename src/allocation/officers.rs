use std::sync::Arc;

use super::domain::{
    windows_overlap, ApplicantId, ApplicationId, OfficerId, OfficerRegistration, Project,
    ProjectId, RegistrationId, RegistrationStatus,
};
use super::inventory::{InventoryError, ProjectInventory};
use super::store::{Clock, EntityStore, IdGenerator, StoreError};

/// Error raised by the officer registration guard.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration {0} not found")]
    NotFound(RegistrationId),
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    #[error("officer {officer} holds live application {application} for project {project}")]
    RoleConflict {
        officer: OfficerId,
        project: ProjectId,
        application: ApplicationId,
    },
    #[error(
        "officer {officer} is already approved for {conflicting_project}, whose window overlaps {project}"
    )]
    OverlappingAssignment {
        officer: OfficerId,
        project: ProjectId,
        conflicting_project: ProjectId,
    },
    #[error("cannot {attempted} registration {registration} while it is {status}")]
    InvalidTransition {
        registration: RegistrationId,
        status: &'static str,
        attempted: &'static str,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Guard enforcing officer/applicant role exclusivity and the
/// one-active-project-at-a-time rule for officers.
pub struct OfficerRegistrationService<S> {
    store: Arc<S>,
    inventory: ProjectInventory<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<S> OfficerRegistrationService<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        let inventory = ProjectInventory::new(store.clone());
        Self {
            store,
            inventory,
            clock,
            ids,
        }
    }

    fn fetch(&self, id: &RegistrationId) -> Result<OfficerRegistration, RegistrationError> {
        self.store
            .find_registration(id)?
            .ok_or_else(|| RegistrationError::NotFound(id.clone()))
    }

    /// Reject if any other Approved registration for `officer` targets a
    /// project whose application window intersects `target`'s window.
    /// Pending registrations do not block; the check re-runs at approval.
    fn ensure_no_overlap(
        &self,
        officer: &OfficerId,
        target: &Project,
        exclude: Option<&RegistrationId>,
    ) -> Result<(), RegistrationError> {
        for registration in self.store.list_registrations()? {
            if registration.officer != *officer
                || registration.status != RegistrationStatus::Approved
                || registration.project == target.id
                || exclude == Some(&registration.id)
            {
                continue;
            }

            // Dangling project references are skipped rather than treated as
            // conflicts; the registration can no longer become active.
            let Some(other) = self.store.find_project(&registration.project)? else {
                continue;
            };

            if windows_overlap(
                other.open_date,
                other.close_date,
                target.open_date,
                target.close_date,
            ) {
                return Err(RegistrationError::OverlappingAssignment {
                    officer: officer.clone(),
                    project: target.id.clone(),
                    conflicting_project: other.id,
                });
            }
        }

        Ok(())
    }

    /// File a Pending registration for `officer` on `project`.
    pub fn register(
        &self,
        officer: &OfficerId,
        project: &ProjectId,
    ) -> Result<OfficerRegistration, RegistrationError> {
        let target = self
            .store
            .find_project(project)?
            .ok_or_else(|| RegistrationError::ProjectNotFound(project.clone()))?;

        // Officers and applicants share one identity (NRIC); a live
        // application on the same project bars the officer role.
        let as_applicant = ApplicantId(officer.0.clone());
        if let Some(application) = self.store.find_live_application_by_applicant(&as_applicant)? {
            if application.project == *project {
                return Err(RegistrationError::RoleConflict {
                    officer: officer.clone(),
                    project: project.clone(),
                    application: application.id,
                });
            }
        }

        self.ensure_no_overlap(officer, &target, None)?;

        let registration = OfficerRegistration {
            id: RegistrationId(self.ids.next("reg")),
            officer: officer.clone(),
            project: project.clone(),
            status: RegistrationStatus::Pending,
            registered_at: self.clock.now(),
        };
        self.store.insert_registration(registration.clone())?;
        Ok(registration)
    }

    /// Approve a Pending registration and claim a project officer slot.
    ///
    /// The overlap check runs again here because other approvals may have
    /// landed since registration time. If the slot claim fails the
    /// registration stays Pending and nothing is persisted.
    pub fn approve(&self, id: &RegistrationId) -> Result<OfficerRegistration, RegistrationError> {
        let mut registration = self.fetch(id)?;
        if registration.status != RegistrationStatus::Pending {
            return Err(RegistrationError::InvalidTransition {
                registration: id.clone(),
                status: registration.status.label(),
                attempted: "approve",
            });
        }

        let target = self
            .store
            .find_project(&registration.project)?
            .ok_or_else(|| RegistrationError::ProjectNotFound(registration.project.clone()))?;
        self.ensure_no_overlap(&registration.officer, &target, Some(id))?;

        self.inventory
            .assign_officer(&registration.project, &registration.officer)?;

        registration.status = RegistrationStatus::Approved;
        self.store.replace_registration(registration.clone())?;
        Ok(registration)
    }

    /// Reject a Pending registration.
    pub fn reject(&self, id: &RegistrationId) -> Result<OfficerRegistration, RegistrationError> {
        let mut registration = self.fetch(id)?;
        if registration.status != RegistrationStatus::Pending {
            return Err(RegistrationError::InvalidTransition {
                registration: id.clone(),
                status: registration.status.label(),
                attempted: "reject",
            });
        }

        registration.status = RegistrationStatus::Rejected;
        self.store.replace_registration(registration.clone())?;
        Ok(registration)
    }

    /// Fetch a registration for status views. Pure read.
    pub fn get(&self, id: &RegistrationId) -> Result<OfficerRegistration, RegistrationError> {
        self.fetch(id)
    }
}
