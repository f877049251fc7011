//! Allocation and eligibility engine for the BTO application lifecycle.
//!
//! Ties project unit inventory, applications, officer registrations, and
//! withdrawal requests together under one mutation surface. Every operation
//! validates against fetched copies and persists through the entity store
//! only once validation has passed, so callers never observe a half-applied
//! transition (an application is never Booked without its unit decrement).

pub mod applications;
pub mod domain;
pub mod eligibility;
pub mod inventory;
pub mod officers;
pub mod router;
pub mod seed;
pub mod store;
pub mod withdrawals;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use applications::{ApplicationError, ApplicationService, ApplicationView, BookingReceipt};
pub use domain::{
    windows_overlap, Applicant, ApplicantId, Application, ApplicationId, ApplicationStatus,
    FlatType, ManagerId, MaritalStatus, OfficerId, OfficerRegistration, Project, ProjectId,
    RegistrationId, RegistrationStatus, UnitType, WithdrawalId, WithdrawalRequest,
    WithdrawalStatus,
};
pub use eligibility::{eligible_flat_types, MARRIED_MINIMUM_AGE, SINGLE_MINIMUM_AGE};
pub use inventory::{InventoryError, ProjectInventory};
pub use officers::{OfficerRegistrationService, RegistrationError};
pub use router::allocation_router;
pub use seed::{projects_from_path, projects_from_reader, SeedError};
pub use store::{
    Clock, EntityStore, IdGenerator, MemoryStore, SequenceIds, StoreError, SystemClock,
};
pub use withdrawals::{WithdrawalError, WithdrawalService};

/// Facade bundling the engine services over one shared store.
pub struct AllocationEngine<S> {
    applications: ApplicationService<S>,
    officers: OfficerRegistrationService<S>,
    withdrawals: WithdrawalService<S>,
    inventory: ProjectInventory<S>,
}

impl<S> AllocationEngine<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            applications: ApplicationService::new(store.clone(), clock.clone(), ids.clone()),
            officers: OfficerRegistrationService::new(store.clone(), clock.clone(), ids.clone()),
            withdrawals: WithdrawalService::new(store.clone(), clock, ids),
            inventory: ProjectInventory::new(store),
        }
    }

    pub fn applications(&self) -> &ApplicationService<S> {
        &self.applications
    }

    pub fn officers(&self) -> &OfficerRegistrationService<S> {
        &self.officers
    }

    pub fn withdrawals(&self) -> &WithdrawalService<S> {
        &self.withdrawals
    }

    pub fn inventory(&self) -> &ProjectInventory<S> {
        &self.inventory
    }
}
