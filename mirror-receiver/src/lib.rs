//! # mirror-receiver: screen-mirroring receiver service
//!
//! Runs a [`mirror_core::MirrorReceiver`] from a TOML configuration,
//! logs sender connect/disconnect events, and optionally appends the
//! decrypted video payload stream to a file in place of a decoder.

pub mod config;
pub mod dump;
pub mod service;
