use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tasklist_core::config::{STORAGE_KEY, STORAGE_VERSION};
use tasklist_core::db::open_db_in_memory;
use tasklist_core::{
    KeyValueSlot, MemoryKeyValueSlot, RepoError, SlotTaskRepository, SqliteKeyValueSlot, Task,
    TaskRepository,
};

fn sample_tasks() -> Vec<Task> {
    let created = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
    let mut done = Task::with_created_at(2, "Call &quot;Mom&quot;", created);
    done.toggle();
    vec![
        Task::with_created_at(1, "Buy bread", created),
        done,
        Task::new(3, "Écrire une lettre"),
    ]
}

#[test]
fn save_then_load_roundtrips_tasks() {
    let slot = MemoryKeyValueSlot::new();
    let repo = SlotTaskRepository::new(&slot);
    let tasks = sample_tasks();

    repo.save(&tasks).unwrap();
    let loaded = repo.load().unwrap();

    assert_eq!(loaded, tasks);
}

#[test]
fn save_writes_versioned_envelope_under_fixed_key() {
    let slot = MemoryKeyValueSlot::new();
    let repo = SlotTaskRepository::new(&slot);
    repo.save(&sample_tasks()).unwrap();

    let raw = slot.get(STORAGE_KEY).unwrap().expect("envelope should be stored");
    let value: Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(value["version"], STORAGE_VERSION);
    assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(value["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(
        value["tasks"][0],
        json!({
            "id": 1,
            "text": "Buy bread",
            "completed": false,
            "createdAt": "2024-01-15T08:30:00.000Z"
        })
    );
    assert_eq!(value["tasks"][1]["completed"], true);
}

#[test]
fn load_returns_empty_when_key_is_absent() {
    let repo = SlotTaskRepository::new(MemoryKeyValueSlot::new());
    assert!(repo.load().unwrap().is_empty());
}

#[test]
fn older_envelope_and_legacy_array_load_equivalently() {
    let records = json!([
        { "id": 10, "text": "A", "completed": false, "createdAt": "2023-12-31T23:59:59.999Z" },
        { "id": 11, "text": "B", "completed": true, "createdAt": "2024-01-01T00:00:00.000Z" }
    ]);
    let envelope = json!({
        "version": "0.9.0",
        "timestamp": "2024-01-02T00:00:00.000Z",
        "tasks": records.clone()
    });

    let envelope_slot = MemoryKeyValueSlot::new();
    envelope_slot
        .set(STORAGE_KEY, &envelope.to_string())
        .unwrap();
    let legacy_slot = MemoryKeyValueSlot::new();
    legacy_slot.set(STORAGE_KEY, &records.to_string()).unwrap();

    let from_envelope = SlotTaskRepository::new(&envelope_slot).load().unwrap();
    let from_legacy = SlotTaskRepository::new(&legacy_slot).load().unwrap();

    assert_eq!(from_envelope, from_legacy);
    assert_eq!(from_envelope.len(), 2);
    assert_eq!(from_envelope[1].id, 11);
    assert!(from_envelope[1].completed);
    assert_eq!(
        from_envelope[0].created_at,
        Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::milliseconds(999)
    );
}

#[test]
fn envelope_without_metadata_and_record_without_completed_load() {
    let slot = MemoryKeyValueSlot::new();
    slot.set(
        STORAGE_KEY,
        r#"{"tasks":[{"id":5,"text":"old","createdAt":"2022-06-01T10:00:00Z"}]}"#,
    )
    .unwrap();

    let loaded = SlotTaskRepository::new(&slot).load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(!loaded[0].completed);
}

#[test]
fn malformed_json_fails_with_decode_error() {
    let slot = MemoryKeyValueSlot::new();
    slot.set(STORAGE_KEY, "{not json").unwrap();

    let err = SlotTaskRepository::new(&slot).load().unwrap_err();
    assert!(matches!(err, RepoError::Decode(_)), "unexpected error: {err}");
}

#[test]
fn unreadable_record_shapes_fail_with_invalid_data() {
    let cases = [
        r#""just a string""#,
        r#"{"version":"1.0.0"}"#,
        r#"[{"id":"one","text":"x","completed":false,"createdAt":"2024-01-01T00:00:00Z"}]"#,
        r#"[{"id":-4,"text":"x","completed":false,"createdAt":"2024-01-01T00:00:00Z"}]"#,
        r#"[{"id":0,"text":"x","completed":false,"createdAt":"2024-01-01T00:00:00Z"}]"#,
        r#"[{"id":1,"text":"x","completed":false,"createdAt":"not a date"}]"#,
        r#"[{"id":1,"text":"x","createdAt":"2024-01-01T00:00:00Z"},{"id":1,"text":"y","createdAt":"2024-01-01T00:00:00Z"}]"#,
        r#"{"version":"one","tasks":[]}"#,
    ];

    for raw in cases {
        let slot = MemoryKeyValueSlot::new();
        slot.set(STORAGE_KEY, raw).unwrap();
        let err = SlotTaskRepository::new(&slot).load().unwrap_err();
        assert!(
            matches!(err, RepoError::InvalidData(_)),
            "payload {raw} gave unexpected error: {err}"
        );
    }
}

#[test]
fn browser_payload_with_fractional_ids_loads_under_integer_ids() {
    let slot = MemoryKeyValueSlot::new();
    slot.set(
        STORAGE_KEY,
        r#"{"version":"1.0.0","timestamp":"2024-06-10T15:49:00.000Z","tasks":[{"id":1718034512345.6789,"text":"Buy bread","completed":false,"createdAt":"2024-06-10T15:48:32.345Z"},{"id":1718034512345.1234,"text":"Call &quot;Mom&quot;","completed":true,"createdAt":"2024-06-10T15:48:32.345Z"},{"id":1718034512346,"text":"Pay rent","completed":false,"createdAt":"2024-06-10T15:48:32.346Z"}]}"#,
    )
    .unwrap();

    let loaded = SlotTaskRepository::new(&slot).load().unwrap();

    let texts: Vec<&str> = loaded.iter().map(|task| task.text.as_str()).collect();
    assert_eq!(texts, vec!["Buy bread", "Call &quot;Mom&quot;", "Pay rent"]);
    let ids: Vec<u64> = loaded.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![1_718_034_512_345, 1_718_034_512_347, 1_718_034_512_346]);
    assert_eq!(
        loaded.iter().map(|task| task.completed).collect::<Vec<_>>(),
        vec![false, true, false]
    );
    assert_eq!(
        loaded[0].created_at,
        Utc.with_ymd_and_hms(2024, 6, 10, 15, 48, 32).unwrap()
            + chrono::Duration::milliseconds(345)
    );

    // The next save writes integer ids, so a second load is stable.
    let repo = SlotTaskRepository::new(&slot);
    repo.save(&loaded).unwrap();
    assert_eq!(repo.load().unwrap(), loaded);
}

#[test]
fn newer_major_version_is_rejected() {
    let slot = MemoryKeyValueSlot::new();
    slot.set(STORAGE_KEY, r#"{"version":"2.0.0","tasks":[]}"#)
        .unwrap();

    let err = SlotTaskRepository::new(&slot).load().unwrap_err();
    assert!(matches!(err, RepoError::UnsupportedVersion(ref v) if v == "2.0.0"));
}

#[test]
fn save_failure_surfaces_storage_error() {
    let slot = MemoryKeyValueSlot::new();
    slot.set_simulate_write_error(true);

    let err = SlotTaskRepository::new(&slot)
        .save(&sample_tasks())
        .unwrap_err();
    assert!(matches!(err, RepoError::Storage(_)));
}

#[test]
fn clear_removes_key_and_swallows_failures() {
    let slot = MemoryKeyValueSlot::new();
    let repo = SlotTaskRepository::new(&slot);
    repo.save(&sample_tasks()).unwrap();

    slot.set_simulate_write_error(true);
    repo.clear();
    assert!(slot.get(STORAGE_KEY).unwrap().is_some());

    slot.set_simulate_write_error(false);
    repo.clear();
    assert!(slot.get(STORAGE_KEY).unwrap().is_none());
    assert!(repo.load().unwrap().is_empty());
}

#[test]
fn sqlite_slot_roundtrips_and_overwrites() {
    let conn = open_db_in_memory().unwrap();
    let repo = SlotTaskRepository::new(SqliteKeyValueSlot::new(&conn));
    let mut tasks = sample_tasks();

    repo.save(&tasks).unwrap();
    tasks.remove(0);
    repo.save(&tasks).unwrap();

    assert_eq!(repo.load().unwrap(), tasks);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM kv_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);

    repo.clear();
    assert!(repo.load().unwrap().is_empty());
}

#[test]
fn custom_key_isolates_collections() {
    let slot = MemoryKeyValueSlot::new();
    let first = SlotTaskRepository::with_key(&slot, "listA");
    let second = SlotTaskRepository::with_key(&slot, "listB");

    first.save(&sample_tasks()).unwrap();
    assert!(second.load().unwrap().is_empty());
    assert_eq!(first.load().unwrap().len(), 3);
}
