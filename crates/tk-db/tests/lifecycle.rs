//! Timer engine and task mutator driven against a real SQLite store.

use chrono::{DateTime, NaiveDate};
use tk_core::{
    Error, ManualClock, NewTask, SortKey, TaskFilter, TaskId, TaskMutator, TaskStore, TaskUpdate,
    TimeEntryStore, TimerEngine, TimerStateError, TimerStatus, UpdateOutcome, ValidationError,
};
use tk_db::Database;

fn setup() -> (Database, ManualClock) {
    let db = Database::open_in_memory().expect("open in-memory db");
    (db, ManualClock::new(DateTime::UNIX_EPOCH))
}

#[test]
fn write_report_scenario() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let mut timer = TimerEngine::with_clock(&clock);

    let id = tasks.create(&mut db, NewTask::named("Write report")).unwrap();
    timer.start(&mut db, id).unwrap();
    clock.advance_secs(5);
    timer.pause().unwrap();
    clock.advance_secs(100);
    timer.resume().unwrap();
    clock.advance_secs(3);
    let stopped = timer.stop(&mut db).unwrap();

    assert_eq!(stopped.duration_secs, 8);
    assert_eq!(tasks.get(&db, id).unwrap().unwrap().total_time, 8);

    let entries = tasks.time_entries(&db, id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].duration, Some(8));
    assert!(!entries[0].is_open());
}

#[test]
fn created_tasks_resolve() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);

    for name in ["a", "Write report", "  padded  ", "ünïcödé"] {
        let id = tasks.create(&mut db, NewTask::named(name)).unwrap();
        let task = tasks.get(&db, id).unwrap().expect("created task resolves");
        assert_eq!(task.name, name.trim());
    }
}

#[test]
fn blank_names_write_nothing() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);

    for name in ["", "   "] {
        let err = tasks.create(&mut db, NewTask::named(name)).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyName)));
    }
    assert!(
        tasks
            .list(&db, &TaskFilter::default(), SortKey::Name)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn second_start_leaves_the_open_entry_untouched() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let mut timer = TimerEngine::with_clock(&clock);
    let a = tasks.create(&mut db, NewTask::named("A")).unwrap();
    let b = tasks.create(&mut db, NewTask::named("B")).unwrap();

    let entry = timer.start(&mut db, a).unwrap();
    clock.advance_secs(2);
    let err = timer.start(&mut db, b).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState(TimerStateError::AlreadyRunning)
    ));

    let open = db.open_time_entries().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, entry);
    assert_eq!(open[0].task_id, a);
    assert!(db.list_time_entries(b).unwrap().is_empty());
}

#[test]
fn stop_adds_duration_and_one_total_time_row() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let mut timer = TimerEngine::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Focus")).unwrap();

    for secs in [40, 2] {
        let before = tasks.get(&db, id).unwrap().unwrap().total_time;
        let history_before = tasks.history(&db, id).unwrap().len();

        timer.start(&mut db, id).unwrap();
        clock.advance_secs(secs);
        let stopped = timer.stop(&mut db).unwrap();

        let after = tasks.get(&db, id).unwrap().unwrap().total_time;
        assert_eq!(after, before + stopped.duration_secs);

        let history = tasks.history(&db, id).unwrap();
        assert_eq!(history.len(), history_before + 1);
        assert_eq!(history[0].field_name, "total_time");
    }
    assert_eq!(tasks.get(&db, id).unwrap().unwrap().total_time, 42);
    assert_eq!(timer.status(), TimerStatus::Idle);
}

#[test]
fn update_records_old_and_new_values() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Draft")).unwrap();

    let update = TaskUpdate::from_fields([("name", "X"), ("category", "Y"), ("owner", "me")])
        .unwrap();
    clock.advance_secs(1);
    let outcome = tasks.update(&mut db, id, &update).unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied { fields: 2 });

    let history = tasks.history(&db, id).unwrap();
    assert_eq!(history.len(), 3);
    let mut latest: Vec<_> = history[..2]
        .iter()
        .map(|entry| {
            (
                entry.field_name.as_str(),
                entry.old_value.as_deref(),
                entry.new_value.as_deref(),
            )
        })
        .collect();
    latest.sort_unstable();
    assert_eq!(
        latest,
        vec![("category", None, Some("Y")), ("name", Some("Draft"), Some("X"))]
    );

    let task = tasks.get(&db, id).unwrap().unwrap();
    assert_eq!(task.name, "X");
    assert_eq!(task.category.as_deref(), Some("Y"));
}

#[test]
fn empty_or_unrecognized_updates_are_no_ops() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Stable")).unwrap();

    let unknown = TaskUpdate::from_fields([("owner", "me"), ("total_time", "5")]).unwrap();
    for update in [TaskUpdate::default(), unknown] {
        assert_eq!(
            tasks.update(&mut db, id, &update).unwrap(),
            UpdateOutcome::NoChanges
        );
    }
    assert_eq!(tasks.history(&db, id).unwrap().len(), 1);
}

#[test]
fn update_of_missing_task_writes_nothing() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Only")).unwrap();

    let update = TaskUpdate {
        completed: Some(true),
        ..TaskUpdate::default()
    };
    let err = tasks.update(&mut db, TaskId::new(404), &update).unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(missing) if missing == TaskId::new(404)));
    assert_eq!(tasks.history(&db, id).unwrap().len(), 1);
    assert!(!tasks.get(&db, id).unwrap().unwrap().completed);
}

#[test]
fn delete_cascades_and_get_returns_none() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let mut timer = TimerEngine::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Throwaway")).unwrap();
    timer.start(&mut db, id).unwrap();
    clock.advance_secs(3);
    timer.stop(&mut db).unwrap();

    tasks.delete(&mut db, id).unwrap();

    assert!(tasks.get(&db, id).unwrap().is_none());
    assert!(db.list_time_entries(id).unwrap().is_empty());
    assert!(db.list_history(id).unwrap().is_empty());
    assert!(matches!(
        tasks.delete(&mut db, id),
        Err(Error::TaskNotFound(_))
    ));
    assert!(matches!(tasks.history(&db, id), Err(Error::TaskNotFound(_))));
}

#[test]
fn deleting_the_timed_task_strands_the_session_until_abandoned() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let mut timer = TimerEngine::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Doomed")).unwrap();
    let entry = timer.start(&mut db, id).unwrap();

    tasks.delete(&mut db, id).unwrap();

    assert!(matches!(
        timer.stop(&mut db),
        Err(Error::TimeEntryNotFound(missing)) if missing == entry
    ));
    assert_eq!(timer.status(), TimerStatus::Running);
    timer.abandon();
    assert_eq!(timer.status(), TimerStatus::Idle);
}

#[test]
fn deadline_sort_places_undated_tasks_last() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    tasks.create(&mut db, NewTask::named("A no deadline")).unwrap();
    tasks
        .create(
            &mut db,
            NewTask {
                deadline: NaiveDate::from_ymd_opt(2030, 12, 31),
                ..NewTask::named("Z far away")
            },
        )
        .unwrap();

    let listed = tasks
        .list(&db, &TaskFilter::default(), SortKey::parse_lenient("deadline"))
        .unwrap();
    let names: Vec<_> = listed.iter().map(|task| task.name.as_str()).collect();
    assert_eq!(names, vec!["Z far away", "A no deadline"]);
}

#[test]
fn orphaned_entry_can_be_discarded() {
    let (mut db, clock) = setup();
    let tasks = TaskMutator::with_clock(&clock);
    let id = tasks.create(&mut db, NewTask::named("Crashed")).unwrap();
    {
        // An engine that never stops, like a process that died mid-session.
        let mut timer = TimerEngine::with_clock(&clock);
        timer.start(&mut db, id).unwrap();
        clock.advance_secs(30);
    }

    let orphans = db.open_time_entries().unwrap();
    assert_eq!(orphans.len(), 1);
    assert!(db.discard_time_entry(orphans[0].id).unwrap());
    assert!(db.open_time_entries().unwrap().is_empty());
    assert_eq!(tasks.get(&db, id).unwrap().unwrap().total_time, 0);
    assert_eq!(tasks.history(&db, id).unwrap().len(), 1);
}
