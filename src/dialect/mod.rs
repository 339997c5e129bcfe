//! Dialects (spec §4.5/§6): fixed parsers from grammar source text to a
//! [`crate::Grammar`]. [`bpeg`] is the primary, self-hosting surface syntax;
//! [`peg`] is the alternate `<-`/`/` syntax. Both build their clauses through
//! [`values::BootValue`], the single dynamic value every bootstrap action
//! produces or consumes — the Rust stand-in for the teacher's untyped
//! "action namespace" (`apegs_globals` in the source this lineage grew from).

pub mod bpeg;
pub mod peg;
mod values;

pub use values::BootValue;
