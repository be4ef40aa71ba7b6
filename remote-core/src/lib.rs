#![no_std]

// Shared logic for the projector remote sequencer.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware is reached only through `embedded-hal` traits
// and the small seams defined here (IR transmission and deep sleep), so the same
// state machine runs on the board, in the emulator, and under test.

pub mod fault;
pub mod ir;
pub mod presence;
pub mod remote;
pub mod sequencer;
pub mod sleep;
pub mod telemetry;
pub mod timing;
pub mod transmitter;
