/*
 *  schedule.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Wall-clock sleep window - blanks the display overnight
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::arbiter::Arbiter;
use chrono::{Local, NaiveTime};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Whether the display is currently allowed to show anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleState {
    Awake,
    Asleep,
}

/// Daily off/on window. `off` is when the display blanks, `on` when it
/// wakes; a window crossing midnight (off 23:00, on 07:00) is the common
/// case and handled by the wrap below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepSchedule {
    pub enabled: bool,
    pub off: NaiveTime,
    pub on: NaiveTime,
}

impl SleepSchedule {
    pub fn disabled() -> Self {
        SleepSchedule {
            enabled: false,
            off: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            on: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        }
    }
}

/// Evaluate the window at a given wall-clock time.
pub fn state_at(schedule: &SleepSchedule, now: NaiveTime) -> ScheduleState {
    if !schedule.enabled || schedule.off == schedule.on {
        return ScheduleState::Awake;
    }
    let asleep = if schedule.off < schedule.on {
        now >= schedule.off && now < schedule.on
    } else {
        // window wraps midnight
        now >= schedule.off || now < schedule.on
    };
    if asleep {
        ScheduleState::Asleep
    } else {
        ScheduleState::Awake
    }
}

/// Background task: re-evaluate the window twice a minute and push state
/// changes through the arbiter.
pub async fn run(schedule: SleepSchedule, arbiter: Arc<Arbiter>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    loop {
        ticker.tick().await;
        let state = state_at(&schedule, Local::now().time());
        if arbiter.snapshot().schedule != state {
            info!("sleep schedule: display now {:?}", state);
            arbiter.set_schedule(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn overnight() -> SleepSchedule {
        SleepSchedule {
            enabled: true,
            off: t(23, 0),
            on: t(7, 0),
        }
    }

    #[test]
    fn test_overnight_window() {
        let s = overnight();
        assert_eq!(state_at(&s, t(22, 59)), ScheduleState::Awake);
        assert_eq!(state_at(&s, t(23, 0)), ScheduleState::Asleep);
        assert_eq!(state_at(&s, t(3, 30)), ScheduleState::Asleep);
        assert_eq!(state_at(&s, t(6, 59)), ScheduleState::Asleep);
        assert_eq!(state_at(&s, t(7, 0)), ScheduleState::Awake);
        assert_eq!(state_at(&s, t(12, 0)), ScheduleState::Awake);
    }

    #[test]
    fn test_same_day_window() {
        let s = SleepSchedule {
            enabled: true,
            off: t(1, 0),
            on: t(6, 0),
        };
        assert_eq!(state_at(&s, t(0, 30)), ScheduleState::Awake);
        assert_eq!(state_at(&s, t(1, 0)), ScheduleState::Asleep);
        assert_eq!(state_at(&s, t(5, 59)), ScheduleState::Asleep);
        assert_eq!(state_at(&s, t(6, 0)), ScheduleState::Awake);
    }

    #[test]
    fn test_disabled_never_sleeps() {
        let mut s = overnight();
        s.enabled = false;
        assert_eq!(state_at(&s, t(3, 0)), ScheduleState::Awake);
    }

    #[test]
    fn test_degenerate_window_never_sleeps() {
        let s = SleepSchedule {
            enabled: true,
            off: t(8, 0),
            on: t(8, 0),
        };
        assert_eq!(state_at(&s, t(8, 0)), ScheduleState::Awake);
    }
}
