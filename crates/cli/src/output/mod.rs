//! Structured output envelope.

mod model;
mod result_builder;

pub use model::*;
pub use result_builder::{OutputFormat, ResultBuilder, print_result};
