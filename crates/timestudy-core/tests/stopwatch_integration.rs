//! Integration tests for the lap stopwatch.

use proptest::prelude::*;
use timestudy_core::{
    AlwaysApprove, AlwaysDecline, CoreError, Database, LapTimer, ManualClock, SessionKind,
    SessionStore, StoredSession, TimerStatus,
};

fn setup() -> (ManualClock, LapTimer<ManualClock>) {
    let clock = ManualClock::at_epoch();
    (clock.clone(), LapTimer::new(clock))
}

#[test]
fn laps_at_one_two_and_a_half_and_four_seconds() {
    let (clock, mut timer) = setup();
    timer.start().unwrap();
    for at in [1000, 2500, 4000] {
        clock.set(chrono::DateTime::from_timestamp_millis(at).unwrap());
        timer.record_lap(None).unwrap();
    }

    let durations: Vec<u64> = timer.laps().iter().map(|l| l.lap_duration_ms).collect();
    let cumulative: Vec<u64> = timer
        .laps()
        .iter()
        .map(|l| l.cumulative_duration_ms)
        .collect();
    assert_eq!(durations, vec![1000, 1500, 1500]);
    assert_eq!(cumulative, vec![1000, 2500, 4000]);
}

#[test]
fn paused_time_is_not_counted() {
    let (clock, mut timer) = setup();
    timer.start().unwrap();
    clock.advance_ms(2000);
    timer.pause().unwrap();
    clock.advance_ms(60_000);
    assert_eq!(timer.elapsed_ms(), 2000);
    timer.start().unwrap();
    clock.advance_ms(1000);
    timer.record_lap(Some("Bolt tightening".into())).unwrap();

    let lap = &timer.laps()[0];
    assert_eq!(lap.cumulative_duration_ms, 3000);
    assert_eq!(lap.note, "Bolt tightening");
}

#[test]
fn save_persists_to_database_and_resave_updates_in_place() {
    let (clock, mut timer) = setup();
    let mut db = Database::open_memory().unwrap();

    timer.start().unwrap();
    clock.advance_ms(1200);
    timer.record_lap(None).unwrap();
    timer.save("Assembly Line A", &mut db).unwrap();
    let id = timer.saved_id().unwrap().clone();

    clock.advance_ms(800);
    timer.record_lap(Some("Panel fit".into())).unwrap();
    timer.annotate_lap(1, "Bracket weld").unwrap();
    timer.sync(&mut db).unwrap();

    let listed = db.list(SessionKind::Stopwatch).unwrap();
    assert_eq!(listed.len(), 1);
    match db.get(&id).unwrap().unwrap() {
        StoredSession::Laps(session) => {
            assert_eq!(session.name, "Assembly Line A");
            assert_eq!(session.total_laps, 2);
            assert!(session.laps_consistent());
            assert_eq!(session.laps[0].note, "Bracket weld");
            assert_eq!(session.laps[1].note, "Panel fit");
            assert_eq!(session.total_ms(), 2000);
        }
        other => panic!("expected a stopwatch session, got {other:?}"),
    }
}

#[test]
fn reset_needs_pause_and_approval() {
    let (clock, mut timer) = setup();
    timer.start().unwrap();
    clock.advance_ms(500);
    timer.record_lap(None).unwrap();

    assert!(matches!(
        timer.reset(&mut AlwaysApprove),
        Err(CoreError::InvalidState(_))
    ));
    timer.pause().unwrap();
    assert!(timer.reset(&mut AlwaysDecline).unwrap().is_none());
    assert_eq!(timer.laps().len(), 1);

    timer.reset(&mut AlwaysApprove).unwrap().unwrap();
    assert_eq!(timer.status(), TimerStatus::Stopped);
    assert!(timer.laps().is_empty());
    assert_eq!(timer.elapsed_ms(), 0);
}

#[test]
fn restored_state_keeps_running() {
    let (clock, mut timer) = setup();
    timer.start().unwrap();
    clock.advance_ms(700);
    let json = serde_json::to_string(timer.state()).unwrap();

    let restored = LapTimer::restore(clock.clone(), serde_json::from_str(&json).unwrap());
    clock.advance_ms(300);
    assert_eq!(restored.status(), TimerStatus::Running);
    assert_eq!(restored.elapsed_ms(), 1000);
}

proptest! {
    #[test]
    fn lap_arithmetic_holds_for_any_schedule(
        steps in proptest::collection::vec((1u32..30_000, 0u32..30_000, any::<bool>()), 1..25)
    ) {
        let (clock, mut timer) = setup();
        let mut store = timestudy_core::MemoryStore::new();
        timer.start().unwrap();

        let mut running_total = 0u64;
        for (run_ms, paused_ms, pause) in &steps {
            clock.advance_ms(*run_ms as i64);
            running_total += *run_ms as u64;
            timer.record_lap(None).unwrap();
            if *pause {
                timer.pause().unwrap();
                clock.advance_ms(*paused_ms as i64);
                timer.start().unwrap();
            }
        }

        prop_assert_eq!(timer.laps().len(), steps.len());
        prop_assert_eq!(timer.elapsed_ms(), running_total);
        let mut previous = 0u64;
        for (index, lap) in timer.laps().iter().enumerate() {
            prop_assert_eq!(lap.sequence_number as usize, index + 1);
            prop_assert!(lap.cumulative_duration_ms > previous);
            prop_assert_eq!(lap.lap_duration_ms, lap.cumulative_duration_ms - previous);
            prop_assert_eq!(lap.lap_duration_ms, steps[index].0 as u64);
            previous = lap.cumulative_duration_ms;
        }

        timer.save("prop run", &mut store).unwrap();
        let id = timer.saved_id().unwrap().clone();
        match store.get(&id).unwrap() {
            Some(StoredSession::Laps(session)) => prop_assert!(session.laps_consistent()),
            other => prop_assert!(false, "unexpected stored value {:?}", other),
        }
    }
}
