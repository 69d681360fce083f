use sanban_core::clock::{ClockSnapshot, OvertimeSnapshot};

fn main_time(ms: u64) -> ClockSnapshot {
    ClockSnapshot {
        main_remaining_ms: ms,
        overtime: None,
    }
}

#[test]
fn prediction_decrements_main_time() {
    let clock = main_time(30_000);
    let later = clock.predict_after(2_500);
    assert_eq!(later.main_remaining_ms, 27_500);
    assert!(later.overtime.is_none());
}

#[test]
fn prediction_saturates_at_zero() {
    let clock = main_time(1_200);
    let later = clock.predict_after(5_000);
    assert_eq!(later.main_remaining_ms, 0);
    assert_eq!(later.display_remaining(), 0);
}

#[test]
fn prediction_never_enters_overtime_locally() {
    // Main time exhausted: the rollover into an overtime period is the
    // authority's call, so prediction keeps the clock pinned at zero.
    let clock = main_time(800);
    let later = clock.predict_after(10_000);
    assert!(later.overtime.is_none());
    assert_eq!(later.display_remaining(), 0);
}

#[test]
fn prediction_decrements_overtime_when_present() {
    let clock = ClockSnapshot {
        main_remaining_ms: 0,
        overtime: Some(OvertimeSnapshot {
            remaining_ms: 10_000,
            periods_left: 4,
        }),
    };
    let later = clock.predict_after(3_100);
    let overtime = later.overtime.expect("overtime preserved");
    assert_eq!(overtime.remaining_ms, 6_900);
    assert_eq!(overtime.periods_left, 4);
    assert_eq!(later.display_remaining(), 6);
}

#[test]
fn display_floors_to_whole_seconds() {
    assert_eq!(main_time(29_999).display_remaining(), 29);
    assert_eq!(main_time(30_000).display_remaining(), 30);
    assert_eq!(main_time(999).display_remaining(), 0);
}
