//! Type definitions for rctrack

mod account;
mod error;
mod series;

pub use account::*;
pub use error::*;
pub use series::*;
