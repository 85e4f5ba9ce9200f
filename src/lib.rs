#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod store;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LayoutParameter, LinkStyle};
pub use error::{ConfigError, LayoutError, NormalizeError};
pub use ir::{Gender, Person};
pub use layout::{Layout, LayoutHints, Link, Tree, compute_layout};
pub use store::{Store, StoreEvent};
