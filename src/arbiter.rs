/*
 *  arbiter.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Hot-reload arbiter - serialized configuration writes, lock-free reads
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

use crate::layout::{Layout, LayoutDoc, LayoutError};
use crate::mapper::IndexTable;
use crate::pattern::{self, PatternSelection};
use crate::power::PowerSettings;
use crate::schedule::ScheduleState;
use log::info;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("unknown pattern \"{0}\"")]
    UnknownPattern(String),
    #[error("power ceiling must be positive, got {0}")]
    InvalidCeiling(f64),
}

/// One consistent view of the whole display configuration.
///
/// Immutable once published; the controller picks up the latest snapshot at
/// the top of each tick with a plain watch-channel borrow, so writers never
/// stall the render path.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub layout: Arc<Layout>,
    pub index_table: Arc<IndexTable>,
    pub brightness: u8,
    pub pattern: PatternSelection,
    pub schedule: ScheduleState,
    pub power: PowerSettings,
    /// Bumped on every layout replacement so the controller can detect a
    /// swap without comparing layouts.
    pub layout_epoch: u64,
}

/// Serializes every configuration change and publishes the resulting
/// snapshot. All operations are non-blocking for callers; internally each
/// takes the writer lock for the duration of one snapshot swap.
pub struct Arbiter {
    tx: Mutex<watch::Sender<Arc<Snapshot>>>,
}

impl Arbiter {
    /// Build the initial snapshot and the controller's receiver.
    pub fn new(
        layout: Layout,
        brightness: u8,
        power: PowerSettings,
    ) -> (Arc<Arbiter>, watch::Receiver<Arc<Snapshot>>) {
        let table = IndexTable::build(&layout);
        let snapshot = Snapshot {
            layout: Arc::new(layout),
            index_table: Arc::new(table),
            brightness,
            pattern: PatternSelection::External,
            schedule: ScheduleState::Awake,
            power,
            layout_epoch: 0,
        };
        let (tx, rx) = watch::channel(Arc::new(snapshot));
        (Arc::new(Arbiter { tx: Mutex::new(tx) }), rx)
    }

    /// Additional reader handles (status surface, ingress validation).
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.lock().unwrap().subscribe()
    }

    /// The snapshot as of now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.lock().unwrap().borrow().clone()
    }

    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let tx = self.tx.lock().unwrap();
        let current = tx.borrow().clone();
        tx.send_replace(Arc::new(update(current.as_ref())));
    }

    pub fn set_brightness(&self, brightness: u8) {
        self.publish(|cur| Snapshot {
            brightness,
            ..cur.clone()
        });
    }

    pub fn set_pattern(&self, selection: PatternSelection) -> Result<(), ControlError> {
        if let PatternSelection::Internal { name, .. } = &selection {
            if pattern::lookup(name).is_none() {
                return Err(ControlError::UnknownPattern(name.clone()));
            }
        }
        info!("pattern selection -> {}", selection.name());
        self.publish(|cur| Snapshot {
            pattern: selection,
            ..cur.clone()
        });
        Ok(())
    }

    pub fn set_schedule(&self, state: ScheduleState) {
        self.publish(|cur| Snapshot {
            schedule: state,
            ..cur.clone()
        });
    }

    pub fn set_power_ceiling(&self, amps: f64, enabled: bool) -> Result<(), ControlError> {
        if !(amps > 0.0) {
            return Err(ControlError::InvalidCeiling(amps));
        }
        self.publish(|cur| Snapshot {
            power: PowerSettings {
                ceiling_amps: amps,
                enabled,
                ..cur.power
            },
            ..cur.clone()
        });
        Ok(())
    }

    /// Parse and validate a new layout, build its index table, then publish
    /// both in one swap. Any failure leaves the prior snapshot untouched.
    pub fn set_layout(&self, doc: &LayoutDoc) -> Result<(), ControlError> {
        let layout = Layout::parse(doc)?;
        let table = IndexTable::build(&layout);
        let (w, h) = layout.canvas_size();
        info!(
            "layout reload: {}x{} canvas, {} LEDs",
            w,
            h,
            layout.led_count()
        );
        self.publish(|cur| Snapshot {
            layout: Arc::new(layout),
            index_table: Arc::new(table),
            layout_epoch: cur.layout_epoch + 1,
            ..cur.clone()
        });
        Ok(())
    }
}
