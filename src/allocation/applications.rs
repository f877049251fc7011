use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::{
    Applicant, ApplicantId, Application, ApplicationId, ApplicationStatus, FlatType, ManagerId,
    OfficerId, ProjectId,
};
use super::eligibility::eligible_flat_types;
use super::inventory::{InventoryError, ProjectInventory};
use super::store::{Clock, EntityStore, IdGenerator, StoreError};

/// Error raised by the application state machine.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("applicant {applicant} is not eligible for {flat_type} at project {project}")]
    NotEligible {
        applicant: ApplicantId,
        project: ProjectId,
        flat_type: FlatType,
    },
    #[error("applicant {applicant} already holds live application {existing}")]
    DuplicateLiveApplication {
        applicant: ApplicantId,
        existing: ApplicationId,
    },
    #[error("cannot {attempted} application {application} while it is {status}")]
    InvalidTransition {
        application: ApplicationId,
        status: &'static str,
        attempted: &'static str,
    },
    #[error("application {application} is {status}, receipts require a booked application")]
    InvalidState {
        application: ApplicationId,
        status: &'static str,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State machine over one applicant's application lifecycle.
///
/// `Pending -> {Successful, Unsuccessful}`, `Successful -> Booked`, with
/// withdrawal handled by the reconciliation service. Authorization (who may
/// approve) is the caller's concern; only the state graph is enforced here.
pub struct ApplicationService<S> {
    store: Arc<S>,
    inventory: ProjectInventory<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<S> ApplicationService<S>
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

    fn fetch(&self, id: &ApplicationId) -> Result<Application, ApplicationError> {
        self.store
            .find_application(id)?
            .ok_or_else(|| ApplicationError::NotFound(id.clone()))
    }

    /// Submit a new application, re-checking eligibility against the
    /// project's current visibility and window.
    pub fn submit(
        &self,
        applicant: &Applicant,
        project: &ProjectId,
        flat_type: FlatType,
    ) -> Result<Application, ApplicationError> {
        let record = self
            .store
            .find_project(project)?
            .ok_or_else(|| ApplicationError::ProjectNotFound(project.clone()))?;

        let now = self.clock.now();
        let eligible = eligible_flat_types(applicant, &record, now.date());
        if !eligible.contains(&flat_type) {
            return Err(ApplicationError::NotEligible {
                applicant: applicant.id.clone(),
                project: project.clone(),
                flat_type,
            });
        }

        if let Some(existing) = self
            .store
            .find_live_application_by_applicant(&applicant.id)?
        {
            return Err(ApplicationError::DuplicateLiveApplication {
                applicant: applicant.id.clone(),
                existing: existing.id,
            });
        }

        let application = Application {
            id: ApplicationId(self.ids.next("app")),
            applicant: applicant.id.clone(),
            project: project.clone(),
            flat_type,
            status: ApplicationStatus::Pending,
            assigned_unit: None,
            assigned_officer: None,
            submitted_at: now,
            updated_at: now,
            remarks: None,
        };
        self.store.insert_application(application.clone())?;
        Ok(application)
    }

    /// Mark a pending application Successful.
    pub fn approve(&self, id: &ApplicationId) -> Result<Application, ApplicationError> {
        self.settle_pending(id, ApplicationStatus::Successful, "approve")
    }

    /// Mark a pending application Unsuccessful.
    pub fn reject(&self, id: &ApplicationId) -> Result<Application, ApplicationError> {
        self.settle_pending(id, ApplicationStatus::Unsuccessful, "reject")
    }

    fn settle_pending(
        &self,
        id: &ApplicationId,
        outcome: ApplicationStatus,
        attempted: &'static str,
    ) -> Result<Application, ApplicationError> {
        let mut application = self.fetch(id)?;
        if application.status != ApplicationStatus::Pending {
            return Err(ApplicationError::InvalidTransition {
                application: id.clone(),
                status: application.status.label(),
                attempted,
            });
        }

        application.status = outcome;
        application.updated_at = self.clock.now();
        self.store.replace_application(application.clone())?;
        Ok(application)
    }

    /// Book a unit for a Successful application.
    ///
    /// The inventory decrement runs before any status change, so a failed
    /// decrement leaves the application exactly as it was.
    pub fn book(
        &self,
        id: &ApplicationId,
        assigned_unit: String,
        assigned_officer: OfficerId,
    ) -> Result<Application, ApplicationError> {
        let mut application = self.fetch(id)?;
        if application.status != ApplicationStatus::Successful {
            return Err(ApplicationError::InvalidTransition {
                application: id.clone(),
                status: application.status.label(),
                attempted: "book",
            });
        }

        self.inventory
            .decrease_available(&application.project, application.flat_type, 1)?;

        application.status = ApplicationStatus::Booked;
        application.assigned_unit = Some(assigned_unit);
        application.assigned_officer = Some(assigned_officer);
        application.updated_at = self.clock.now();
        self.store.replace_application(application.clone())?;
        Ok(application)
    }

    /// Produce the booking receipt for a Booked application. Pure read.
    pub fn generate_receipt(&self, id: &ApplicationId) -> Result<BookingReceipt, ApplicationError> {
        let application = self.fetch(id)?;
        if application.status != ApplicationStatus::Booked {
            return Err(ApplicationError::InvalidState {
                application: id.clone(),
                status: application.status.label(),
            });
        }

        let project = self
            .store
            .find_project(&application.project)?
            .ok_or_else(|| ApplicationError::ProjectNotFound(application.project.clone()))?;
        let unit = project
            .unit_types
            .get(&application.flat_type)
            .ok_or_else(|| InventoryError::UnitTypeNotFound {
                project: project.id.clone(),
                flat_type: application.flat_type,
            })?;

        Ok(BookingReceipt {
            application_id: application.id.clone(),
            applicant: application.applicant.clone(),
            project: project.id.clone(),
            project_name: project.name.clone(),
            neighborhood: project.neighborhood.clone(),
            manager: project.manager.clone(),
            flat_type: application.flat_type,
            assigned_unit: application.assigned_unit.clone(),
            assigned_officer: application.assigned_officer.clone(),
            selling_price: unit.price,
            status: application.status.label(),
            submitted_at: application.submitted_at,
            booked_at: application.updated_at,
            remarks: application.remarks,
        })
    }

    /// Fetch an application for status views. Pure read.
    pub fn get(&self, id: &ApplicationId) -> Result<Application, ApplicationError> {
        self.fetch(id)
    }
}

/// Summary handed to a successful booker; rendering is the caller's job.
#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub application_id: ApplicationId,
    pub applicant: ApplicantId,
    pub project: ProjectId,
    pub project_name: String,
    pub neighborhood: String,
    pub manager: ManagerId,
    pub flat_type: FlatType,
    pub assigned_unit: Option<String>,
    pub assigned_officer: Option<OfficerId>,
    pub selling_price: u32,
    pub status: &'static str,
    pub submitted_at: NaiveDateTime,
    pub booked_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub applicant: ApplicantId,
    pub project: ProjectId,
    pub flat_type: FlatType,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_officer: Option<OfficerId>,
    pub updated_at: NaiveDateTime,
}

impl From<&Application> for ApplicationView {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.id.clone(),
            applicant: application.applicant.clone(),
            project: application.project.clone(),
            flat_type: application.flat_type,
            status: application.status.label(),
            assigned_unit: application.assigned_unit.clone(),
            assigned_officer: application.assigned_officer.clone(),
            updated_at: application.updated_at,
        }
    }
}
