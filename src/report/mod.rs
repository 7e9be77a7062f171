//! Renderers over a finished [`InvestigationResult`](crate::engine::InvestigationResult).
//!
//! Each renderer is a free function reading the result through `&`; none of
//! them mutate it, and several can run over the same result.
//!
//! - [`flat`] — one line per distinct top-level package.
//! - [`tree`] — indented dependency tree per project.
//! - [`graphviz`] — `digraph` output, depth-limited, full, or per project.
//! - [`terminal`] — colored summary tables.
//! - [`output`] — writes the file set into an output directory.

pub mod flat;
pub mod graphviz;
pub mod output;
pub mod terminal;
pub mod tree;
