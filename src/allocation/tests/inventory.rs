use super::common::*;
use crate::allocation::domain::{FlatType, OfficerId, UnitType};
use crate::allocation::inventory::InventoryError;
use crate::allocation::store::EntityStore;

#[test]
fn add_unit_type_rejects_duplicates() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    engine
        .inventory()
        .add_unit_type(&id, FlatType::ThreeRoom, 4, 180_000)
        .expect("new flat type added");
    match engine
        .inventory()
        .add_unit_type(&id, FlatType::ThreeRoom, 4, 180_000)
    {
        Err(InventoryError::DuplicateUnitType { flat_type, .. }) => {
            assert_eq!(flat_type, FlatType::ThreeRoom);
        }
        other => panic!("expected duplicate unit type error, got {other:?}"),
    }
}

#[test]
fn add_unit_type_starts_with_full_availability() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    engine
        .inventory()
        .add_unit_type(&id, FlatType::ThreeRoom, 4, 180_000)
        .expect("new flat type added");

    let record = store
        .find_project(&id)
        .expect("store reachable")
        .expect("project present");
    assert_eq!(
        record.unit_types.get(&FlatType::ThreeRoom),
        Some(&UnitType {
            total: 4,
            available: 4,
            price: 180_000
        })
    );
}

#[test]
fn decrease_fails_for_unknown_flat_type() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    match engine
        .inventory()
        .decrease_available(&id, FlatType::ThreeRoom, 1)
    {
        Err(InventoryError::UnitTypeNotFound { .. }) => {}
        other => panic!("expected unit type not found, got {other:?}"),
    }
}

#[test]
fn decrease_fails_once_exhausted_and_leaves_count_untouched() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    engine
        .inventory()
        .decrease_available(&id, FlatType::TwoRoom, 2)
        .expect("both units consumed");
    assert_eq!(available_units(&store, &id, FlatType::TwoRoom), 0);

    match engine
        .inventory()
        .decrease_available(&id, FlatType::TwoRoom, 1)
    {
        Err(InventoryError::InsufficientInventory {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected insufficient inventory, got {other:?}"),
    }
    assert_eq!(available_units(&store, &id, FlatType::TwoRoom), 0);
}

#[test]
fn increase_never_exceeds_total() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    engine
        .inventory()
        .decrease_available(&id, FlatType::TwoRoom, 1)
        .expect("one unit consumed");
    engine
        .inventory()
        .increase_available(&id, FlatType::TwoRoom, 1)
        .expect("unit returned");
    assert_eq!(available_units(&store, &id, FlatType::TwoRoom), 2);

    match engine
        .inventory()
        .increase_available(&id, FlatType::TwoRoom, 1)
    {
        Err(InventoryError::OverAllocation { total, .. }) => assert_eq!(total, 2),
        other => panic!("expected over-allocation error, got {other:?}"),
    }
    assert_eq!(available_units(&store, &id, FlatType::TwoRoom), 2);
}

#[test]
fn availability_stays_within_total_across_sequences() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, two_room_project("Acacia Breeze"));

    let steps: [(bool, u32); 6] = [
        (true, 1),
        (true, 1),
        (false, 1),
        (true, 1),
        (false, 1),
        (false, 1),
    ];
    for (consume, count) in steps {
        let result = if consume {
            engine.inventory().decrease_available(&id, FlatType::TwoRoom, count)
        } else {
            engine.inventory().increase_available(&id, FlatType::TwoRoom, count)
        };
        // Individual steps may legitimately fail; the invariant must hold
        // regardless of which ones did.
        let _ = result;
        let available = available_units(&store, &id, FlatType::TwoRoom);
        assert!(available <= 2, "available {available} exceeded total 2");
    }
}

#[test]
fn assign_officer_enforces_capacity_and_uniqueness() {
    let (store, engine) = build_engine();
    let id = seed_project(&store, project("Acacia Breeze"));

    let first = OfficerId("T1111111A".to_string());
    let second = OfficerId("T2222222B".to_string());
    let third = OfficerId("T3333333C".to_string());

    engine
        .inventory()
        .assign_officer(&id, &first)
        .expect("first officer assigned");
    match engine.inventory().assign_officer(&id, &first) {
        Err(InventoryError::DuplicateOfficer { officer, .. }) => assert_eq!(officer, first),
        other => panic!("expected duplicate officer error, got {other:?}"),
    }

    engine
        .inventory()
        .assign_officer(&id, &second)
        .expect("second officer assigned");
    match engine.inventory().assign_officer(&id, &third) {
        Err(InventoryError::SlotsFull { slots, .. }) => assert_eq!(slots, 2),
        other => panic!("expected slots full error, got {other:?}"),
    }

    let record = store
        .find_project(&id)
        .expect("store reachable")
        .expect("project present");
    assert_eq!(record.assigned_officers, vec![first, second]);
}
