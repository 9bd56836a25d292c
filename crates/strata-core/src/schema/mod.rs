//! Schema model: tables, columns, indexes and foreign keys.
//!
//! Tables come from two places: declared metadata, and probes of a live
//! database ([`probe`]). Both produce the same value types, which the differ
//! compares as independent snapshots.

mod column;
pub mod export;
mod index;
mod kind;
pub mod probe;
mod table;

pub use column::Column;
pub use export::Tables;
pub use index::{ForeignKey, Index};
pub use kind::{DataKind, UnknownDataKind};
pub use table::Table;
