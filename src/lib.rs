//! External multi-key sort engine for large record-oriented files.
//!
//! Five components, pulled together by [`orchestrator`]: a format/codec
//! agnostic record stream ([`stream`]), a typed key model and comparator
//! ([`key`]), a memory-bounded run generator ([`run_generator`]), a
//! k-way merger ([`merger`]), and the orchestrator itself.

#![warn(clippy::all)]

pub mod cli;
pub mod dedup;
pub mod error;
pub mod key;
pub mod locale;
pub mod merger;
pub mod orchestrator;
pub mod record;
pub mod run_generator;
pub mod stream;
pub mod value;

pub use error::{SortxError, SortxResult};
pub use key::{Comparator, DataType, KeySpec};
pub use orchestrator::{sort_file, sort_iter, Options, Stats};
pub use record::{FieldSelector, Record};
pub use value::Value;
