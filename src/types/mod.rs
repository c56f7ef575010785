//! Type definitions

pub mod plan;
pub mod route;
pub mod stop;

pub use plan::*;
pub use route::*;
pub use stop::*;
