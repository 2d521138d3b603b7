// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::seconds(60));
    let t2 = clock.now();
    assert_eq!(t2 - t1, Duration::seconds(60));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::seconds(30));
    assert_eq!(clock1.now() - t1, Duration::seconds(30));
}

#[test]
fn today_rolls_over_at_utc_midnight() {
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap());
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

    clock.advance(Duration::seconds(1));
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
}
