//! Draft persistence: dirty tracking, save/restore, expiry, failure and
//! concurrency behavior of `DraftController`.

#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use support::*;
use wizard_drafts::{
    AutosaveOutcome, DraftCleared, DraftConfig, DraftError, DraftLoaded, DraftSaveFailed,
    DraftSaved, FieldKind, FieldMap, FieldValue, FormSurface, InMemoryForm, SaveFailure,
    SessionSnapshotStore, Snapshot, SnapshotStore, StorageError, SystemClock, Validity,
    WizardController, WizardEvents,
};

#[test]
fn mutation_dirties_and_save_cleans() {
    let form = signup_form();
    let (_, store) = session_store();
    let wizard = signup_wizard(&form, store, manual_clock());
    let draft = wizard.draft().unwrap();

    assert!(!draft.is_dirty());
    for name in ["Al", "Ali", "Alice"] {
        form.input("name", name);
        assert!(draft.is_dirty());
    }

    let saved = draft.save_draft().unwrap();
    assert!(!draft.is_dirty());
    assert_eq!(draft.last_save_timestamp(), Some(saved.timestamp));

    form.input("email", "alice@example.com");
    assert!(draft.is_dirty());
}

#[test]
fn save_emits_draft_saved() {
    let form = signup_form();
    let (_, store) = session_store();
    let events = WizardEvents::new();
    let saved = record::<DraftSaved>(&events);
    let wizard = signup_wizard_with(&form, store, manual_clock(), events);

    form.input("name", "Alice");
    form.input("newsletter", true);
    wizard.save_draft().unwrap();

    let saved = saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].wizard_id, SIGNUP);
    assert_eq!(saved[0].step, 0);
    assert_eq!(saved[0].timestamp, EPOCH_MS);
    // newsletter belongs to a step not yet visited
    assert_eq!(saved[0].field_count, 1);
}

#[test]
fn saved_draft_restores_into_a_new_session() {
    let form = signup_form();
    let (_, store) = session_store();
    let clock = manual_clock();

    {
        let wizard = signup_wizard(&form, store.clone(), clock.clone());
        form.input("name", "Alice");
        form.input("avatar", "/tmp/alice.png");
        wizard.next_step().unwrap();
        form.input("newsletter", "on");
        form.input("topics", FieldValue::multi(["rust", "web"]));
        wizard.save_draft().unwrap();
        wizard.teardown();
    }

    let fresh_form = signup_form();
    let events = WizardEvents::new();
    let loaded = record::<DraftLoaded>(&events);
    let wizard = signup_wizard_with(&fresh_form, store, clock, events);
    let draft = wizard.draft().unwrap();

    let snapshot = draft.check_for_draft().unwrap();
    assert_eq!(snapshot.step, 1);
    assert!(!snapshot.data.contains_key("avatar"));

    let report = draft.restore_draft(&snapshot).unwrap();
    assert_eq!(report.step, 1);
    assert!(report.skipped.is_empty());
    assert_eq!(wizard.current_index(), 1);
    assert!(!wizard.is_dirty());

    assert_eq!(fresh_form.value("name"), Some(FieldValue::text("Alice")));
    assert_eq!(fresh_form.value("newsletter"), Some(FieldValue::Flag(true)));
    assert_eq!(
        fresh_form.value("topics"),
        Some(FieldValue::multi(["rust", "web"]))
    );
    assert_eq!(fresh_form.value("avatar"), None);
    assert_eq!(loaded.lock().unwrap().len(), 1);
}

#[test]
fn fields_from_earlier_steps_are_kept_across_saves() {
    let form = signup_form();
    let (store, shared) = session_store();
    let wizard = signup_wizard(&form, shared, manual_clock());

    form.input("name", "Alice");
    wizard.next_step().unwrap();
    form.input("topics", "rust");
    wizard.next_step().unwrap();

    let saved = store.read(SIGNUP_KEY).unwrap();
    assert_eq!(saved.step, 1);
    assert_eq!(saved.data.get("name"), Some(&FieldValue::text("Alice")));
    assert_eq!(saved.data.get("topics"), Some(&FieldValue::multi(["rust"])));
}

#[test]
fn restored_data_is_carried_into_the_next_save() {
    let form = signup_form();
    let (store, shared) = session_store();
    let wizard = signup_wizard(&form, shared.clone(), manual_clock());
    let draft = wizard.draft().unwrap();

    // One field before, two at and one after the saved step.
    let mut data = FieldMap::new();
    data.insert("name".into(), FieldValue::text("Alice"));
    data.insert("newsletter".into(), FieldValue::Flag(true));
    data.insert("topics".into(), FieldValue::multi(["rust", "web"]));
    data.insert("agree".into(), FieldValue::Flag(true));
    let original = Snapshot::new(SIGNUP, EPOCH_MS, 1, data);
    shared.write(SIGNUP_KEY, &original).unwrap();

    let snapshot = draft.load_draft().unwrap();
    draft.restore_draft(&snapshot).unwrap();
    let resaved = draft.save_draft().unwrap();

    assert_eq!(resaved.step, 1);
    for (name, value) in &original.data {
        assert_eq!(resaved.data.get(name), Some(value), "field {name} was lost");
    }
    assert_eq!(store.read(SIGNUP_KEY).unwrap().data, resaved.data);
}

#[test]
fn restore_skips_fields_the_form_no_longer_has() {
    let form = signup_form();
    let (_, store) = session_store();
    let wizard = signup_wizard(&form, store.clone(), manual_clock());

    let mut data = FieldMap::new();
    data.insert("name".into(), FieldValue::text("Alice"));
    data.insert("nickname".into(), FieldValue::text("Al"));
    store
        .write(SIGNUP_KEY, &Snapshot::new(SIGNUP, EPOCH_MS, 0, data))
        .unwrap();

    let snapshot = wizard.draft().unwrap().load_draft().unwrap();
    let report = wizard.draft().unwrap().restore_draft(&snapshot).unwrap();
    assert_eq!(report.applied, vec!["name".to_string()]);
    assert_eq!(report.skipped, vec!["nickname".to_string()]);
}

#[test]
fn expired_draft_is_absent_but_not_deleted() {
    let form = signup_form();
    let (store, shared) = session_store();
    let clock = manual_clock();
    let wizard = signup_wizard(&form, shared, clock.clone());
    let draft = wizard.draft().unwrap();

    form.input("name", "Alice");
    let saved = draft.save_draft().unwrap();

    clock.advance(Duration::from_secs(7 * 24 * 60 * 60));
    assert!(draft.check_for_draft().is_some());

    clock.advance(Duration::from_millis(1));
    assert!(draft.check_for_draft().is_none());
    assert!(draft.load_draft().is_none());
    assert_eq!(store.len(), 1);
    assert!(matches!(
        draft.restore_draft(&saved),
        Err(DraftError::InvalidSnapshot(Validity::Expired { .. }))
    ));
}

#[test]
fn foreign_draft_is_absent_but_not_deleted() {
    let form = signup_form();
    let (store, shared) = session_store();
    let wizard = signup_wizard(&form, shared.clone(), manual_clock());

    let foreign = Snapshot::new("checkout", EPOCH_MS, 0, FieldMap::new());
    shared.write(SIGNUP_KEY, &foreign).unwrap();

    assert!(wizard.draft().unwrap().check_for_draft().is_none());
    assert_eq!(store.len(), 1);
    assert_eq!(
        wizard.draft().unwrap().restore_draft(&foreign),
        Err(DraftError::InvalidSnapshot(Validity::ForeignWizard))
    );
}

#[test]
fn corrupt_payload_is_absent() {
    let form = signup_form();
    let (store, shared) = session_store();
    store
        .write_raw(SIGNUP_KEY, "{\"wizardId\":\"signup\",".into())
        .unwrap();
    let wizard = signup_wizard(&form, shared, manual_clock());

    assert!(wizard.draft().unwrap().check_for_draft().is_none());
}

#[test]
fn failed_save_keeps_the_form_dirty() {
    let form = signup_form();
    let store = FailingStore::quota_exceeded();
    let events = WizardEvents::new();
    let failed = record::<DraftSaveFailed>(&events);
    let saved = record::<DraftSaved>(&events);
    let wizard = signup_wizard_with(&form, Arc::new(store.clone()), manual_clock(), events);

    form.input("name", "Alice");
    let error = wizard.save_draft().unwrap_err();

    assert!(matches!(
        error,
        DraftError::Storage(StorageError::QuotaExceeded(_))
    ));
    assert!(wizard.is_dirty());
    assert_eq!(wizard.last_save_timestamp(), None);
    assert!(saved.lock().unwrap().is_empty());

    let failed = failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reason, SaveFailure::QuotaExceeded);
}

#[test]
fn navigation_continues_when_storage_is_unavailable() {
    let form = signup_form();
    let store = FailingStore::unavailable();
    let wizard = signup_wizard(&form, Arc::new(store.clone()), manual_clock());

    form.input("name", "Alice");
    let transition = wizard.next_step().unwrap();

    assert!(transition.moved());
    assert_eq!(store.attempts(), 1);
    assert!(wizard.is_dirty());
}

#[test]
fn clear_then_check_finds_nothing() {
    let form = signup_form();
    let (store, shared) = session_store();
    let events = WizardEvents::new();
    let cleared = record::<DraftCleared>(&events);
    let wizard = signup_wizard_with(&form, shared, manual_clock(), events);
    let draft = wizard.draft().unwrap();

    form.input("name", "Alice");
    draft.save_draft().unwrap();
    draft.clear_draft().unwrap();

    assert!(draft.check_for_draft().is_none());
    assert!(store.is_empty());
    assert_eq!(cleared.lock().unwrap().len(), 1);

    // Clearing an absent draft is not an error.
    draft.clear_draft().unwrap();
}

#[test]
fn timestamps_increase_even_when_the_clock_stalls() {
    let form = signup_form();
    let (_, store) = session_store();
    let wizard = signup_wizard(&form, store, manual_clock());

    form.input("name", "Alice");
    let first = wizard.save_draft().unwrap();
    form.input("name", "Alicia");
    let second = wizard.save_draft().unwrap();

    assert_eq!(first.timestamp, EPOCH_MS);
    assert!(second.timestamp > first.timestamp);
}

#[test]
fn autosave_tick_saves_only_when_dirty() {
    let form = signup_form();
    let (store, shared) = session_store();
    let wizard = signup_wizard(&form, shared, manual_clock());
    let draft = wizard.draft().unwrap();

    assert_eq!(draft.autosave_tick(), AutosaveOutcome::Clean);
    assert!(store.is_empty());

    form.input("name", "Alice");
    assert_eq!(draft.autosave_tick(), AutosaveOutcome::Saved);
    assert_eq!(draft.autosave_tick(), AutosaveOutcome::Clean);
    assert_eq!(store.len(), 1);

    draft.teardown();
    assert_eq!(draft.autosave_tick(), AutosaveOutcome::Stopped);
}

#[test]
fn autosave_thread_persists_dirty_state() {
    let form = signup_form();
    let (store, shared) = session_store();
    let wizard = WizardController::builder(SIGNUP)
        .step("account", "Account")
        .step("interests", "Interests")
        .step("confirm", "Confirm")
        .config(DraftConfig::default().with_autosave(Some(Duration::from_millis(20))))
        .surface(form.clone())
        .store(shared)
        .clock(Arc::new(SystemClock))
        .build()
        .unwrap();
    assert!(wizard.draft().unwrap().autosave_running());

    form.input("name", "Alice");
    thread::sleep(Duration::from_millis(300));

    let stats = wizard.teardown().unwrap();
    assert!(stats.saves >= 1);
    assert!(stats.skipped_clean >= 1);
    assert!(!wizard.is_dirty());
    assert_eq!(
        store.read(SIGNUP_KEY).unwrap().data.get("name"),
        Some(&FieldValue::text("Alice"))
    );
    assert!(!wizard.draft().unwrap().autosave_running());
}

#[test]
fn no_second_write_while_one_is_in_flight() {
    let form = signup_form();
    let (store, gate) = GatedStore::new();
    let wizard = signup_wizard(&form, store.clone(), manual_clock());
    let draft = wizard.draft().unwrap();

    form.input("name", "Alice");
    thread::scope(|scope| {
        let pending = scope.spawn(|| draft.save_draft());
        gate.wait_for_write();

        assert_eq!(draft.autosave_tick(), AutosaveOutcome::Coalesced);
        // A change while the write is in flight is not covered by it.
        form.input("email", "alice@example.com");

        gate.release();
        pending.join().unwrap().unwrap();
    });

    assert_eq!(store.writes(), 1);
    assert!(draft.is_dirty());
}

#[test]
fn teardown_ignores_a_save_still_in_flight() {
    let form = signup_form();
    let (store, gate) = GatedStore::new();
    let events = WizardEvents::new();
    let saved = record::<DraftSaved>(&events);
    let wizard = signup_wizard_with(&form, store.clone(), manual_clock(), events);
    let draft = wizard.draft().unwrap();

    form.input("name", "Alice");
    thread::scope(|scope| {
        let pending = scope.spawn(|| draft.save_draft());
        gate.wait_for_write();
        draft.teardown();
        gate.release();
        assert_eq!(pending.join().unwrap(), Err(DraftError::TornDown));
    });

    assert!(saved.lock().unwrap().is_empty());
    assert!(draft.is_dirty());
    assert!(draft.is_torn_down());
    assert_eq!(draft.save_draft(), Err(DraftError::TornDown));
}

#[test]
fn separate_wizards_use_separate_keys() {
    let store = SessionSnapshotStore::new();
    let account_form = signup_form();
    let signup = signup_wizard(&account_form, Arc::new(store.clone()), manual_clock());

    let checkout_form =
        Arc::new(InMemoryForm::new("checkout-form").field("cart", "coupon", FieldKind::Text));
    let checkout = WizardController::builder("checkout")
        .step("cart", "Cart")
        .config(DraftConfig::default().with_autosave(None))
        .surface(checkout_form.clone())
        .store(Arc::new(store.clone()))
        .build()
        .unwrap();

    account_form.input("name", "Alice");
    checkout_form.input("coupon", "SAVE10");
    signup.save_draft().unwrap();
    checkout.save_draft().unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(checkout.draft().unwrap().key(), "wizard-draft-checkout");
    checkout.draft().unwrap().clear_draft().unwrap();
    assert!(signup.draft().unwrap().check_for_draft().is_some());
}
