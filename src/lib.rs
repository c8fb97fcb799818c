//! Wire Plan Compiler
//!
//! Turns annotated type declarations into deterministic binary serialization
//! plans: per-record, per-field codec operations over an XDR-style wire
//! format, ready for a code emitter to render.
//!
//! ## Passes
//!
//! - **Alias Resolution**: follows alias chains to canonical wire kinds,
//!   within and across module boundaries, degrading unresolvable references
//!   to opaque records
//! - **Cycle Detection**: finds record reference cycles and marks every
//!   participant for a runtime recursion guard
//! - **Union Assembly**: correlates discriminant fields, payload carriers,
//!   constants, and case mappings into validated union configurations
//! - **Plan Synthesis**: combines resolved kinds with declared shapes into
//!   one concrete codec operation per field
//!
//! ## Pipeline
//!
//! ```text
//! ModuleSet ──▶ dependency graph ──▶ union assembly ──▶ field plans
//!                    │                     │                 │
//!                    └──────────── diagnostics ──────────────┘
//! ```
//!
//! Any fatal diagnostic aborts the run before a plan is surfaced; output is
//! all-or-nothing and byte-for-byte reproducible for the same input.

pub mod analyze;
pub mod error;
pub mod fingerprint;
pub mod loader;
pub mod model;

pub use analyze::{
    analyze, analyze_with, AnalysisOptions, AnalysisOutput, CanonicalKind, CarrierPolicy,
    Diagnostics, FieldPlan, RecordPlan, UnionConfig,
};
pub use error::{CompileError, Result};
pub use loader::{DirectoryLoader, InMemoryLoader, ModuleLoader, NullLoader};
pub use model::{Module, ModuleSet};
