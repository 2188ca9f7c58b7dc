//! Migration graphs for `ob`
//!
//! Every released version of `ob` is identified by a content hash computed
//! by a per-graph hash procedure shipped in the tool's `migration/`
//! directory. Two graphs live next to those procedures:
//!
//! - `obelisk-handoff`: edges say whether crossing them forces the ambient
//!   tool to keep control instead of handing off to the project's copy
//! - `obelisk-upgrade`: edges carry the manual steps a user applies when
//!   moving the pinned copy forward
//!
//! This crate loads those graphs, answers path queries over them and runs the
//! hash procedures. It knows nothing about projects, git or process handoff;
//! see `ob-upgrade` for the protocols built on top.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod error;
pub mod graph;
pub mod hash;
pub mod name;
pub mod store;

pub use error::{GraphError, HashError, MigrationError, VertexRole};
pub use graph::{Edge, MigrationGraph, MigrationStep};
pub use hash::{HashOracle, HashProcedures, ScriptHashOracle, ScriptHashProcedures, VersionHash};
pub use name::{GraphName, UnknownGraphName};
pub use store::{graph_path, load_graph, parse_graph};
