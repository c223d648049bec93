//! Marrow Core Library
//!
//! This crate provides common types, utilities, and error handling
//! shared across all Marrow components.

pub mod config;
pub mod error;
pub mod logging;
pub mod math;

pub use config::{ExportConfig, MaterialFlagSource, RootMotion};
pub use error::{Error, Result};
pub use math::{Quat, Vec3};

/// Re-export commonly used items
pub mod prelude {
    pub use crate::config::{ExportConfig, MaterialFlagSource, RootMotion};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::math::{Quat, Vec3};
}
