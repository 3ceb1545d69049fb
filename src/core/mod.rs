//! Core infrastructure module.
//!
//! This module provides the foundational components shared by every other
//! part of the crate:
//!
//! - [`types`]: Fundamental data types and enumerations
//! - [`constants`]: System constants and configuration defaults
//! - [`error`]: Error handling and error types
//!
//! ```rust
//! use lightgbm_cegb::core::{
//!     types::{BoostingType, ModelTag},
//!     error::LightGBMError,
//! };
//!
//! let tag: ModelTag = "cegb_tree".parse()?;
//! assert!(tag.accepts(BoostingType::CEGB));
//! assert!(!tag.accepts(BoostingType::GBDT));
//! # Ok::<(), LightGBMError>(())
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{LightGBMError, Result};
pub use types::*;
