// Core modules modeling exports, entry-point registration, and loader resolution.
pub mod error;
pub mod exports;
pub mod loader;
pub mod platform;
pub mod registry;
