//! Analysis pipeline
//!
//! Runs the four passes in order over a collected module set: record
//! dependency graph construction with cycle detection, union assembly, and
//! per-record field plan synthesis, with alias resolution serving all of
//! them on demand. The run fails closed: any fatal diagnostic aborts before
//! a plan is surfaced, so the emitter only ever sees fully validated input.

pub mod diagnostics;
pub mod graph;
pub mod plan;
pub mod resolve;
pub mod union;

pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use graph::{DependencyGraph, EdgeKind};
pub use plan::{FieldOp, FieldPlan, RecordPlan, UnionCase};
pub use resolve::{CanonicalKind, ElemShape, ResolvedType, Resolver};
pub use union::{CarrierPolicy, DefaultCase, UnionAssembler, UnionConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CompileError, Result};
use crate::fingerprint;
use crate::loader::ModuleLoader;
use crate::model::ModuleSet;

// =============================================================================
// Options and Output
// =============================================================================

/// Knobs for one analysis run
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// How union payload carrier fields are selected
    pub carrier_policy: CarrierPolicy,
}

/// Everything one successful analysis run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Synthesized record plans, sorted by record name
    pub records: Vec<RecordPlan>,
    /// Validated union configurations keyed by container name
    pub unions: BTreeMap<String, UnionConfig>,
    /// Detected reference cycles, in stable order
    pub cycles: Vec<Vec<String>>,
    /// Advisory diagnostics from the run. Never contains errors; a run
    /// with errors returns [`CompileError::Failed`] instead.
    pub diagnostics: Diagnostics,
    /// Content fingerprint of the input module set
    pub fingerprint: String,
}

impl AnalysisOutput {
    /// Look up a synthesized plan by record name
    pub fn plan(&self, record: &str) -> Option<&RecordPlan> {
        self.records.iter().find(|r| r.name == record)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Analyze a module set with default options.
pub fn analyze(modules: &ModuleSet, loader: &dyn ModuleLoader) -> Result<AnalysisOutput> {
    analyze_with(modules, loader, AnalysisOptions::default())
}

/// Analyze a module set, producing deterministic plans for every record.
///
/// All passes run to completion even after a fatal finding, so one failed
/// run reports every problem it can find. The result is gated afterwards:
/// any fatal diagnostic yields [`CompileError::Failed`] carrying the full
/// collection, and no partial output escapes.
pub fn analyze_with(
    modules: &ModuleSet,
    loader: &dyn ModuleLoader,
    options: AnalysisOptions,
) -> Result<AnalysisOutput> {
    let mut diags = Diagnostics::new();
    let mut resolver = Resolver::new(modules, loader);

    tracing::debug!("building record dependency graph");
    let mut graph = DependencyGraph::build(modules, &mut resolver, &mut diags);
    let cycles = graph.detect_cycles(&mut diags);

    tracing::debug!("assembling unions");
    let unions = UnionAssembler::new(modules)
        .with_policy(options.carrier_policy)
        .assemble(&mut resolver, &mut diags);

    tracing::debug!("synthesizing field plans");
    // Sorted record order keeps plan output reproducible regardless of
    // module declaration order.
    let mut declared: Vec<_> = modules.records().collect();
    declared.sort_unstable_by_key(|(_, r)| r.name());

    let mut records = Vec::with_capacity(declared.len());
    for (module, record) in declared {
        if let Some(plan) =
            plan::synthesize_record(module, record, &mut resolver, &graph, &unions, &mut diags)
        {
            records.push(plan);
        }
    }

    if diags.has_errors() {
        tracing::debug!(errors = diags.error_count(), "analysis failed");
        return Err(CompileError::Failed { diagnostics: diags });
    }

    tracing::debug!(records = records.len(), "analysis finished");
    Ok(AnalysisOutput {
        records,
        unions,
        cycles,
        diagnostics: diags,
        fingerprint: fingerprint::fingerprint(modules),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::NullLoader;
    use crate::model::{FieldDeclaration, Module, TypeDeclaration, TypeRef};

    fn set(types: Vec<TypeDeclaration>) -> ModuleSet {
        ModuleSet::new(vec![Module::new("core").with_types(types)]).unwrap()
    }

    #[test]
    fn test_analyze_sorts_records_by_name() {
        let modules = set(vec![
            TypeDeclaration::Record {
                name: "Zeta".into(),
                fields: vec![FieldDeclaration::new("V", TypeRef::plain("uint32"))],
            },
            TypeDeclaration::Record {
                name: "Alpha".into(),
                fields: vec![FieldDeclaration::new("V", TypeRef::plain("uint32"))],
            },
        ]);

        let output = analyze(&modules, &NullLoader).unwrap();
        let names: Vec<&str> = output.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_fatal_diagnostic_aborts_the_run() {
        let modules = set(vec![TypeDeclaration::Record {
            name: "Msg".into(),
            fields: vec![FieldDeclaration::new("Bad", TypeRef::plain("Missing"))],
        }]);

        let err = analyze(&modules, &NullLoader).unwrap_err();
        let diags = err.diagnostics().expect("failure carries diagnostics");
        assert!(diags.has_errors());
    }

    #[test]
    fn test_successful_output_carries_no_errors() {
        let modules = set(vec![
            TypeDeclaration::Record {
                name: "A".into(),
                fields: vec![FieldDeclaration::new("Next", TypeRef::plain("B"))],
            },
            TypeDeclaration::Record {
                name: "B".into(),
                fields: vec![FieldDeclaration::new("Back", TypeRef::plain("A"))],
            },
        ]);

        let output = analyze(&modules, &NullLoader).unwrap();
        assert!(!output.diagnostics.has_errors());
        assert_eq!(output.cycles.len(), 1);
        assert!(output.plan("A").unwrap().may_recurse);
    }
}
