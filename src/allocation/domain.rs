use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for housing projects (project names are unique).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// Identifier wrapper for applicants (NRIC, validated upstream).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

/// Identifier wrapper for HDB officers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficerId(pub String);

/// Identifier wrapper for project managers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for officer registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationId(pub String);

/// Identifier wrapper for withdrawal requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawalId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OfficerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flat categories a BTO project may offer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FlatType {
    TwoRoom,
    ThreeRoom,
}

impl FlatType {
    pub const fn label(self) -> &'static str {
        match self {
            FlatType::TwoRoom => "2-Room",
            FlatType::ThreeRoom => "3-Room",
        }
    }
}

impl fmt::Display for FlatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-flat-type inventory tracked inside a project.
///
/// `total` is fixed at creation; `available` only moves down on booking and
/// back up on withdrawal reversal, never past `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub total: u32,
    pub available: u32,
    pub price: u32,
}

/// A published BTO project with its unit inventory and officer roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub neighborhood: String,
    pub unit_types: BTreeMap<FlatType, UnitType>,
    pub open_date: NaiveDate,
    pub close_date: NaiveDate,
    pub manager: ManagerId,
    pub officer_slots: u8,
    pub assigned_officers: Vec<OfficerId>,
    pub visible: bool,
}

impl Project {
    /// Whether the project accepts applications on `today` (inclusive window).
    pub fn accepts_applications_on(&self, today: NaiveDate) -> bool {
        self.visible && self.open_date <= today && today <= self.close_date
    }

    pub fn offers(&self, flat_type: FlatType) -> bool {
        self.unit_types.contains_key(&flat_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
}

/// Applicant attributes consulted by the eligibility policy.
///
/// Applicants are not stored by the engine; callers supply the attributes
/// with each submission so the policy always sees current data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub age: u8,
    pub marital_status: MaritalStatus,
}

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Successful,
    Unsuccessful,
    Booked,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Successful => "successful",
            ApplicationStatus::Unsuccessful => "unsuccessful",
            ApplicationStatus::Booked => "booked",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// A live application blocks further submissions by the same applicant.
    pub const fn is_live(self) -> bool {
        !matches!(
            self,
            ApplicationStatus::Unsuccessful | ApplicationStatus::Withdrawn
        )
    }
}

/// One applicant's application to one project. Records are never deleted;
/// terminal statuses keep the audit trail intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant: ApplicantId,
    pub project: ProjectId,
    pub flat_type: FlatType,
    pub status: ApplicationStatus,
    pub assigned_unit: Option<String>,
    pub assigned_officer: Option<OfficerId>,
    pub submitted_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }
}

/// An officer's request to be assigned to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficerRegistration {
    pub id: RegistrationId,
    pub officer: OfficerId,
    pub project: ProjectId,
    pub status: RegistrationStatus,
    pub registered_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

/// An applicant's request to withdraw a live application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub application: ApplicationId,
    pub applicant: ApplicantId,
    pub project: ProjectId,
    pub status: WithdrawalStatus,
    pub requested_at: NaiveDateTime,
    pub processed_at: Option<NaiveDateTime>,
    pub remarks: Option<String>,
}

/// Inclusive interval intersection test for application windows.
pub fn windows_overlap(
    a_open: NaiveDate,
    a_close: NaiveDate,
    b_open: NaiveDate,
    b_close: NaiveDate,
) -> bool {
    a_open <= b_close && b_open <= a_close
}
