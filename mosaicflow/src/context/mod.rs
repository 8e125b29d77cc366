//! Run and stage execution context.
//!
//! This module provides:
//! - Run identities for correlating the stages of one run
//! - The context a stage receives while it executes

mod identity;
mod stage;

pub use identity::RunIdentity;
pub use stage::StageContext;
