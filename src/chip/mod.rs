//! Chip specific addresses and devices.

pub mod esp32;
