// File: src/lib.rs
pub mod config;
pub mod controller;
pub mod model;
pub mod paths;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod timer;

#[cfg(feature = "tui")]
pub mod tui;

// --- ANDROID SUPPORT ---
#[cfg(target_os = "android")]
pub mod mobile;

#[cfg(target_os = "android")]
uniffi::setup_scaffolding!();
