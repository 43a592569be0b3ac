//! snapgrab library crate.
//!
//! This module exposes the internal components for integration testing.

pub mod capture;
pub mod config;
pub mod display;
pub mod geometry;
pub mod hotkeys;
pub mod permissions;
pub mod selection;
