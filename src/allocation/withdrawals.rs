use std::sync::Arc;

use super::domain::{
    ApplicationId, ApplicationStatus, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};
use super::inventory::{InventoryError, ProjectInventory};
use super::store::{Clock, EntityStore, IdGenerator, StoreError};

/// Error raised by withdrawal reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum WithdrawalError {
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("withdrawal request {0} not found")]
    RequestNotFound(WithdrawalId),
    #[error("application {application} is {status} and cannot be withdrawn")]
    InvalidState {
        application: ApplicationId,
        status: &'static str,
    },
    #[error("application {application} already has pending withdrawal request {existing}")]
    DuplicatePending {
        application: ApplicationId,
        existing: WithdrawalId,
    },
    #[error("cannot {attempted} withdrawal request {request} while it is {status}")]
    InvalidTransition {
        request: WithdrawalId,
        status: &'static str,
        attempted: &'static str,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Links withdrawal requests to applications and, on approval, reverses the
/// inventory effect of an earlier booking.
pub struct WithdrawalService<S> {
    store: Arc<S>,
    inventory: ProjectInventory<S>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<S> WithdrawalService<S>
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

    fn fetch(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, WithdrawalError> {
        self.store
            .find_withdrawal(id)?
            .ok_or_else(|| WithdrawalError::RequestNotFound(id.clone()))
    }

    /// File a Pending withdrawal request against a live application.
    pub fn request(
        &self,
        application: &ApplicationId,
        remarks: Option<String>,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let record = self
            .store
            .find_application(application)?
            .ok_or_else(|| WithdrawalError::ApplicationNotFound(application.clone()))?;

        if !record.status.is_live() {
            return Err(WithdrawalError::InvalidState {
                application: application.clone(),
                status: record.status.label(),
            });
        }

        if let Some(existing) = self
            .store
            .list_withdrawals()?
            .into_iter()
            .find(|request| {
                request.application == *application && request.status == WithdrawalStatus::Pending
            })
        {
            return Err(WithdrawalError::DuplicatePending {
                application: application.clone(),
                existing: existing.id,
            });
        }

        let request = WithdrawalRequest {
            id: WithdrawalId(self.ids.next("wdr")),
            application: application.clone(),
            applicant: record.applicant,
            project: record.project,
            status: WithdrawalStatus::Pending,
            requested_at: self.clock.now(),
            processed_at: None,
            remarks,
        };
        self.store.insert_withdrawal(request.clone())?;
        Ok(request)
    }

    /// Approve a Pending request: the application becomes Withdrawn and a
    /// Booked application's unit returns to availability.
    ///
    /// Officer assignments held by the same person are deliberately left in
    /// place; revoking one is a separate manager action.
    pub fn approve(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, WithdrawalError> {
        let mut request = self.fetch(id)?;
        if request.status != WithdrawalStatus::Pending {
            return Err(WithdrawalError::InvalidTransition {
                request: id.clone(),
                status: request.status.label(),
                attempted: "approve",
            });
        }

        let mut application = self
            .store
            .find_application(&request.application)?
            .ok_or_else(|| WithdrawalError::ApplicationNotFound(request.application.clone()))?;

        // Reverse the booked unit before persisting anything, so a failed
        // reversal leaves both records untouched.
        if application.status == ApplicationStatus::Booked {
            self.inventory
                .increase_available(&application.project, application.flat_type, 1)?;
        }

        let now = self.clock.now();
        application.status = ApplicationStatus::Withdrawn;
        application.updated_at = now;
        self.store.replace_application(application)?;

        request.status = WithdrawalStatus::Approved;
        request.processed_at = Some(now);
        self.store.replace_withdrawal(request.clone())?;
        Ok(request)
    }

    /// Reject a Pending request; the linked application is untouched.
    pub fn reject(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, WithdrawalError> {
        let mut request = self.fetch(id)?;
        if request.status != WithdrawalStatus::Pending {
            return Err(WithdrawalError::InvalidTransition {
                request: id.clone(),
                status: request.status.label(),
                attempted: "reject",
            });
        }

        request.status = WithdrawalStatus::Rejected;
        request.processed_at = Some(self.clock.now());
        self.store.replace_withdrawal(request.clone())?;
        Ok(request)
    }

    /// Fetch a withdrawal request for status views. Pure read.
    pub fn get(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, WithdrawalError> {
        self.fetch(id)
    }
}
