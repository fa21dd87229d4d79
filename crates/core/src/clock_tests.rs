use super::*;

#[test]
fn fake_clock_advances_on_demand() {
    let clock = FakeClock::new(100);
    assert_eq!(clock.now(), 100);
    clock.advance(5);
    assert_eq!(clock.now(), 105);
    clock.set(0);
    assert_eq!(clock.now(), 0);
}

#[test]
fn system_clock_is_nonzero() {
    assert!(SystemClock.now() > 0);
}
