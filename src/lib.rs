/*
 *  lib.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
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

//! Display pipeline for a grid of addressable RGB LED panels.
//!
//! Frames from any number of producers (UDP, named pipe, the BLE bridge,
//! built-in pattern generators) converge on a latest-wins mailbox. A
//! dedicated controller thread drains it at a fixed cadence, rewrites each
//! frame into physical chain order, clamps brightness against the supply's
//! current ceiling, and pushes the result to the chain driver. Layout,
//! brightness, pattern and schedule changes are serialized by the arbiter
//! and picked up between ticks without pausing output.

pub mod arbiter;
pub mod config;
pub mod controller;
pub mod frame;
pub mod hw;
pub mod ingress;
pub mod layout;
pub mod mailbox;
pub mod mapper;
pub mod pacer;
pub mod pattern;
pub mod power;
pub mod schedule;
pub mod status;
pub mod telemetry;
