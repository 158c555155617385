//! Configuration types
//!
//! - [`schema`]: per device-type typed config slots and their validation
//! - [`runtime`]: tunables for the runtime itself, loadable from postcard

pub mod runtime;
pub mod schema;

pub use runtime::*;
pub use schema::*;
