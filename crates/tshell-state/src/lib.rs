#![forbid(unsafe_code)]

//! Layered application state for tshell.
//!
//! - [`merge`]: recursive in-place merge with optional pruning.
//! - [`ApplicationStateContainer`]: initial / additional / effective layers
//!   with `update` and `reload`.

pub mod container;
pub mod error;
pub mod merge;

pub use container::{ApplicationStateContainer, DEFAULT_VERSION};
pub use error::{Result, StateError};
pub use merge::{StateTree, merge, merged};
