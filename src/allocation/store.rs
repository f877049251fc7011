use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};

use super::domain::{
    Application, ApplicationId, ApplicantId, OfficerRegistration, Project, ProjectId,
    RegistrationId, WithdrawalId, WithdrawalRequest,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction over the four engine-owned entity collections.
///
/// Every engine operation goes through this trait; callers must not mutate
/// entities behind its back. `replace` persists a fully-validated copy, so
/// implementations never observe partial transitions.
pub trait EntityStore: Send + Sync {
    fn list_projects(&self) -> Result<Vec<Project>, StoreError>;
    fn find_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError>;
    fn insert_project(&self, project: Project) -> Result<(), StoreError>;
    fn replace_project(&self, project: Project) -> Result<(), StoreError>;

    fn list_applications(&self) -> Result<Vec<Application>, StoreError>;
    fn find_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn find_live_application_by_applicant(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Option<Application>, StoreError>;
    fn insert_application(&self, application: Application) -> Result<(), StoreError>;
    fn replace_application(&self, application: Application) -> Result<(), StoreError>;

    fn list_registrations(&self) -> Result<Vec<OfficerRegistration>, StoreError>;
    fn find_registration(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<OfficerRegistration>, StoreError>;
    fn insert_registration(&self, registration: OfficerRegistration) -> Result<(), StoreError>;
    fn replace_registration(&self, registration: OfficerRegistration) -> Result<(), StoreError>;

    fn list_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, StoreError>;
    fn find_withdrawal(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>, StoreError>;
    fn insert_withdrawal(&self, request: WithdrawalRequest) -> Result<(), StoreError>;
    fn replace_withdrawal(&self, request: WithdrawalRequest) -> Result<(), StoreError>;
}

/// Clock abstraction so timestamps stay deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock implementation used by the server and CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Identifier generator injected into the services so id assignment is
/// deterministic and testable rather than timestamp-derived.
pub trait IdGenerator: Send + Sync {
    fn next(&self, prefix: &str) -> String;
}

/// Monotonic sequence generator producing ids like `app-000001`.
#[derive(Debug, Default)]
pub struct SequenceIds {
    sequence: AtomicU64,
}

impl IdGenerator for SequenceIds {
    fn next(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{id:06}")
    }
}

#[derive(Default)]
struct MemoryCollections {
    projects: HashMap<ProjectId, Project>,
    applications: HashMap<ApplicationId, Application>,
    registrations: HashMap<RegistrationId, OfficerRegistration>,
    withdrawals: HashMap<WithdrawalId, WithdrawalRequest>,
}

/// In-process store backing the server, the demo command, and tests.
///
/// A single mutex serializes every operation, which is what upholds the
/// "effects only after validation succeeds" guarantee if callers ever
/// arrive concurrently.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<MemoryCollections>,
}

impl MemoryStore {
    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut MemoryCollections) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))?;
        f(&mut guard)
    }
}

fn insert_unique<K, V>(map: &mut HashMap<K, V>, key: K, value: V) -> Result<(), StoreError>
where
    K: std::hash::Hash + Eq,
{
    if map.contains_key(&key) {
        return Err(StoreError::Conflict);
    }
    map.insert(key, value);
    Ok(())
}

fn replace_existing<K, V>(map: &mut HashMap<K, V>, key: K, value: V) -> Result<(), StoreError>
where
    K: std::hash::Hash + Eq,
{
    if !map.contains_key(&key) {
        return Err(StoreError::NotFound);
    }
    map.insert(key, value);
    Ok(())
}

impl EntityStore for MemoryStore {
    fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.with_collections(|c| Ok(c.projects.values().cloned().collect()))
    }

    fn find_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        self.with_collections(|c| Ok(c.projects.get(id).cloned()))
    }

    fn insert_project(&self, project: Project) -> Result<(), StoreError> {
        self.with_collections(|c| insert_unique(&mut c.projects, project.id.clone(), project))
    }

    fn replace_project(&self, project: Project) -> Result<(), StoreError> {
        self.with_collections(|c| replace_existing(&mut c.projects, project.id.clone(), project))
    }

    fn list_applications(&self) -> Result<Vec<Application>, StoreError> {
        self.with_collections(|c| Ok(c.applications.values().cloned().collect()))
    }

    fn find_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.with_collections(|c| Ok(c.applications.get(id).cloned()))
    }

    fn find_live_application_by_applicant(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Option<Application>, StoreError> {
        self.with_collections(|c| {
            Ok(c.applications
                .values()
                .find(|application| {
                    application.applicant == *applicant && application.status.is_live()
                })
                .cloned())
        })
    }

    fn insert_application(&self, application: Application) -> Result<(), StoreError> {
        self.with_collections(|c| {
            insert_unique(&mut c.applications, application.id.clone(), application)
        })
    }

    fn replace_application(&self, application: Application) -> Result<(), StoreError> {
        self.with_collections(|c| {
            replace_existing(&mut c.applications, application.id.clone(), application)
        })
    }

    fn list_registrations(&self) -> Result<Vec<OfficerRegistration>, StoreError> {
        self.with_collections(|c| Ok(c.registrations.values().cloned().collect()))
    }

    fn find_registration(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<OfficerRegistration>, StoreError> {
        self.with_collections(|c| Ok(c.registrations.get(id).cloned()))
    }

    fn insert_registration(&self, registration: OfficerRegistration) -> Result<(), StoreError> {
        self.with_collections(|c| {
            insert_unique(&mut c.registrations, registration.id.clone(), registration)
        })
    }

    fn replace_registration(&self, registration: OfficerRegistration) -> Result<(), StoreError> {
        self.with_collections(|c| {
            replace_existing(&mut c.registrations, registration.id.clone(), registration)
        })
    }

    fn list_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, StoreError> {
        self.with_collections(|c| Ok(c.withdrawals.values().cloned().collect()))
    }

    fn find_withdrawal(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>, StoreError> {
        self.with_collections(|c| Ok(c.withdrawals.get(id).cloned()))
    }

    fn insert_withdrawal(&self, request: WithdrawalRequest) -> Result<(), StoreError> {
        self.with_collections(|c| insert_unique(&mut c.withdrawals, request.id.clone(), request))
    }

    fn replace_withdrawal(&self, request: WithdrawalRequest) -> Result<(), StoreError> {
        self.with_collections(|c| {
            replace_existing(&mut c.withdrawals, request.id.clone(), request)
        })
    }
}
