/*
 *  power.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Supply current estimation and brightness limiting
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

use serde::{Deserialize, Serialize};

/// WS2812B draw at full white, amps per LED.
pub const DEFAULT_AMPS_PER_LED: f64 = 0.06;

/// Power model parameters, published through the arbiter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSettings {
    pub enabled: bool,
    /// Supply ceiling in amps.
    pub ceiling_amps: f64,
    /// Full-white draw per LED.
    pub amps_per_led: f64,
    /// Quiescent draw per LED, independent of brightness.
    pub idle_amps_per_led: f64,
}

impl Default for PowerSettings {
    fn default() -> Self {
        PowerSettings {
            enabled: true,
            ceiling_amps: 8.5,
            amps_per_led: DEFAULT_AMPS_PER_LED,
            idle_amps_per_led: 0.0,
        }
    }
}

/// Result of one limiting pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOutcome {
    /// Brightness actually handed to the hardware, <= requested.
    pub applied: u8,
    pub limited: bool,
    /// Estimated draw at the applied brightness, in amps.
    pub estimate_amps: f64,
}

/// Estimated chain current for a frame with aggregate channel sum `s` shown
/// on `led_count` LEDs at the given brightness:
///
///   I(b) = (S / 255) * amps_per_led * (b / 255) + N * idle
#[inline]
pub fn estimate_current(
    channel_sum: u64,
    led_count: usize,
    brightness: u8,
    settings: &PowerSettings,
) -> f64 {
    (channel_sum as f64 / 255.0) * settings.amps_per_led * (brightness as f64 / 255.0)
        + led_count as f64 * settings.idle_amps_per_led
}

/// Clamp `requested` brightness so the frame's estimated draw stays under the
/// ceiling. Stateless and idempotent; the controller calls this once per tick
/// with the settings read from the current snapshot.
pub fn limit_brightness(
    channel_sum: u64,
    led_count: usize,
    requested: u8,
    settings: &PowerSettings,
) -> LimitOutcome {
    if !settings.enabled {
        return LimitOutcome {
            applied: requested,
            limited: false,
            estimate_amps: estimate_current(channel_sum, led_count, requested, settings),
        };
    }

    let at_requested = estimate_current(channel_sum, led_count, requested, settings);
    if at_requested <= settings.ceiling_amps {
        return LimitOutcome {
            applied: requested,
            limited: false,
            estimate_amps: at_requested,
        };
    }

    let idle = led_count as f64 * settings.idle_amps_per_led;
    if settings.ceiling_amps <= idle {
        // Ceiling unreachable even at full black
        return LimitOutcome {
            applied: 0,
            limited: true,
            estimate_amps: idle,
        };
    }

    // Largest b with I(b) <= ceiling; S > 0 here since the requested
    // estimate exceeded a ceiling that the idle term alone does not
    let b = ((settings.ceiling_amps - idle) * 255.0 * 255.0
        / (channel_sum as f64 * settings.amps_per_led))
        .floor();
    let applied = (b.max(0.0) as u64).min(requested as u64) as u8;

    LimitOutcome {
        applied,
        limited: true,
        estimate_amps: estimate_current(channel_sum, led_count, applied, settings),
    }
}
