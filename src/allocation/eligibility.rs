use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::domain::{Applicant, FlatType, MaritalStatus, Project};

/// Singles qualify for 2-Room flats only, from this age.
pub const SINGLE_MINIMUM_AGE: u8 = 35;
/// Married applicants qualify for any offered flat type from this age.
pub const MARRIED_MINIMUM_AGE: u8 = 21;

/// Flat types `applicant` may apply for on `project` as of `today`.
///
/// Pure function of the applicant's attributes and the project's offering,
/// visibility, and application window. Callers re-evaluate this at
/// submission time rather than caching a result, since visibility and dates
/// change between sessions.
pub fn eligible_flat_types(
    applicant: &Applicant,
    project: &Project,
    today: NaiveDate,
) -> BTreeSet<FlatType> {
    if !project.accepts_applications_on(today) {
        return BTreeSet::new();
    }

    let offered = project.unit_types.keys().copied();
    match applicant.marital_status {
        MaritalStatus::Single if applicant.age >= SINGLE_MINIMUM_AGE => offered
            .filter(|flat_type| *flat_type == FlatType::TwoRoom)
            .collect(),
        MaritalStatus::Married if applicant.age >= MARRIED_MINIMUM_AGE => offered.collect(),
        _ => BTreeSet::new(),
    }
}
