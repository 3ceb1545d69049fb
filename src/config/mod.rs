//! Configuration management.
//!
//! [`Config`] carries tree growth and boosting parameters; its nested
//! [`CegbConfig`] carries the cost model inputs of cost-efficient boosting.
//! Both are serde types and load from `.json` or `.toml` files.

pub mod cegb;
pub mod core;

pub use self::cegb::{format_penalty_table, parse_penalty_table, CegbConfig};
pub use self::core::{Config, ConfigBuilder};

