//! Inspection helpers built on the public iteration surface.
//!
//! Enabled by the `debug` feature (on by default).

mod footprint;
mod graphviz;

pub use footprint::footprint;
pub use graphviz::{NodeMarks, write_graphviz};
