use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::allocation::domain::{
    Applicant, ApplicantId, FlatType, ManagerId, MaritalStatus, Project, ProjectId, UnitType,
};
use crate::allocation::store::{Clock, EntityStore, MemoryStore, SequenceIds};
use crate::allocation::AllocationEngine;

/// Frozen clock so submissions and windows line up deterministically.
pub(super) struct FixedClock(pub(super) NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// The tests' "today": inside the default project window below.
pub(super) fn today() -> NaiveDate {
    date(2025, 1, 10)
}

pub(super) fn now() -> NaiveDateTime {
    today().and_hms_opt(9, 30, 0).expect("valid time")
}

/// Project offering both flat types, open Jan 1-31 2025, two officer slots.
pub(super) fn project(name: &str) -> Project {
    let mut unit_types = BTreeMap::new();
    unit_types.insert(
        FlatType::TwoRoom,
        UnitType {
            total: 2,
            available: 2,
            price: 120_000,
        },
    );
    unit_types.insert(
        FlatType::ThreeRoom,
        UnitType {
            total: 3,
            available: 3,
            price: 180_000,
        },
    );

    Project {
        id: ProjectId(name.to_string()),
        name: name.to_string(),
        neighborhood: "Yishun".to_string(),
        unit_types,
        open_date: date(2025, 1, 1),
        close_date: date(2025, 1, 31),
        manager: ManagerId("M0000001C".to_string()),
        officer_slots: 2,
        assigned_officers: Vec::new(),
        visible: true,
    }
}

pub(super) fn project_with_window(name: &str, open: NaiveDate, close: NaiveDate) -> Project {
    let mut record = project(name);
    record.open_date = open;
    record.close_date = close;
    record
}

/// Project offering only 2-Room units.
pub(super) fn two_room_project(name: &str) -> Project {
    let mut record = project(name);
    record.unit_types.remove(&FlatType::ThreeRoom);
    record
}

pub(super) fn single_applicant(nric: &str, age: u8) -> Applicant {
    Applicant {
        id: ApplicantId(nric.to_string()),
        age,
        marital_status: MaritalStatus::Single,
    }
}

pub(super) fn married_applicant(nric: &str, age: u8) -> Applicant {
    Applicant {
        id: ApplicantId(nric.to_string()),
        age,
        marital_status: MaritalStatus::Married,
    }
}

pub(super) fn build_engine() -> (Arc<MemoryStore>, AllocationEngine<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let engine = AllocationEngine::new(
        store.clone(),
        Arc::new(FixedClock(now())),
        Arc::new(SequenceIds::default()),
    );
    (store, engine)
}

pub(super) fn seed_project(store: &MemoryStore, record: Project) -> ProjectId {
    let id = record.id.clone();
    store.insert_project(record).expect("project inserted");
    id
}

pub(super) fn available_units(store: &MemoryStore, project: &ProjectId, flat: FlatType) -> u32 {
    store
        .find_project(project)
        .expect("store reachable")
        .expect("project present")
        .unit_types
        .get(&flat)
        .expect("flat type present")
        .available
}
