//! Field plan synthesis
//!
//! For every field of every record, combines the resolved kind, the declared
//! array shape, and union membership into one concrete codec operation. The
//! ordered plan list plus the record's `may_recurse` flag is everything the
//! downstream emitter consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Location, Module, TypeDeclaration, TypeShape};

use super::diagnostics::{DiagnosticCode, Diagnostics};
use super::graph::DependencyGraph;
use super::resolve::{CanonicalKind, ElemShape, Resolver};
use super::union::UnionConfig;

// =============================================================================
// Field Plans
// =============================================================================

/// One union case in its synthesized, deterministically ordered form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnionCase {
    pub constant: String,
    pub payload: String,
}

/// The concrete codec operation synthesized for a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldPlan {
    /// Encode/decode a single primitive value
    Primitive(CanonicalKind),
    /// Invoke the named record's own encode/decode pair
    Delegate(String),
    /// Element loop; `fixed_len` is `None` for variable-length arrays
    Array {
        element: Box<FieldPlan>,
        fixed_len: Option<usize>,
    },
    /// Zero-copy fixed-size byte blob, no length prefix and no element loop
    FixedBytes(usize),
    /// Discriminant-driven payload dispatch. Cases are sorted by constant
    /// name, followed by void cases, followed by a no-op branch only when no
    /// catch-all exists.
    Union {
        discriminant_field: String,
        cases: Vec<UnionCase>,
        void_cases: Vec<String>,
        has_default: bool,
    },
}

/// A field together with its synthesized operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOp {
    pub field: String,
    pub plan: FieldPlan,
    /// Explicit default value expression from the field annotation, for the
    /// emitter's decode path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_default: Option<String>,
}

/// The complete synthesized plan for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPlan {
    pub name: String,
    /// Whether the generated codec must carry a runtime identity-set guard
    pub may_recurse: bool,
    /// Operations in field declaration order; excluded fields are absent
    pub fields: Vec<FieldOp>,
}

// =============================================================================
// Synthesis
// =============================================================================

/// Synthesize the ordered field plan list for one record.
///
/// Returns `None` when any field fails to synthesize; a record plan is never
/// partial. The recorded fatal diagnostics abort the run before emission.
pub fn synthesize_record(
    module: &Module,
    record: &TypeDeclaration,
    resolver: &mut Resolver<'_>,
    graph: &DependencyGraph,
    unions: &BTreeMap<String, UnionConfig>,
    diags: &mut Diagnostics,
) -> Option<RecordPlan> {
    let union = unions.get(record.name());
    let mut fields = Vec::with_capacity(record.fields().len());
    let mut failed = false;

    for field in record.fields() {
        if field.annotations.excluded {
            continue;
        }
        let location = Location::new(&module.name, record.name()).with_field(&field.name);

        // Union container fields first: the discriminant always travels as a
        // 32-bit value and the carrier dispatches per case, regardless of
        // what structural resolution would say.
        if let Some(config) = union {
            if field.annotations.discriminant {
                fields.push(FieldOp {
                    field: field.name.clone(),
                    plan: FieldPlan::Primitive(CanonicalKind::UnsignedInt32),
                    explicit_default: field.annotations.explicit_default.clone(),
                });
                continue;
            }
            if field.name == config.carrier_field {
                fields.push(FieldOp {
                    field: field.name.clone(),
                    plan: union_plan(config),
                    explicit_default: field.annotations.explicit_default.clone(),
                });
                continue;
            }
        }

        match synthesize_field(module, field, location, resolver, diags) {
            Some(plan) => fields.push(FieldOp {
                field: field.name.clone(),
                plan,
                explicit_default: field.annotations.explicit_default.clone(),
            }),
            None => failed = true,
        }
    }

    if failed {
        return None;
    }

    Some(RecordPlan {
        name: record.name().to_string(),
        may_recurse: graph.may_recurse(record.name()),
        fields,
    })
}

fn union_plan(config: &UnionConfig) -> FieldPlan {
    // BTreeMap iteration gives the sorted case order required for
    // byte-for-byte reproducible output.
    let cases = config
        .cases
        .iter()
        .map(|(constant, payload)| UnionCase {
            constant: constant.clone(),
            payload: payload.clone(),
        })
        .collect();
    FieldPlan::Union {
        discriminant_field: config.discriminant_field.clone(),
        cases,
        void_cases: config.void_cases.iter().cloned().collect(),
        has_default: config.default_case.is_some(),
    }
}

fn synthesize_field(
    module: &Module,
    field: &crate::model::FieldDeclaration,
    location: Location,
    resolver: &mut Resolver<'_>,
    diags: &mut Diagnostics,
) -> Option<FieldPlan> {
    let base = resolver.resolve_base(&field.ty, &module.name, diags);
    if base.kind == CanonicalKind::Unresolved {
        diags.report(
            location,
            DiagnosticCode::UnresolvedField,
            format!("field type '{}' could not be resolved", field.ty),
        );
        return None;
    }

    match field.ty.shape {
        TypeShape::Plain | TypeShape::Pointer => Some(wrap_shape(base.kind, base.shape)),
        TypeShape::Slice | TypeShape::SliceOfPointer => {
            if resolver.ref_is_byte(&field.ty, &module.name, diags) {
                return Some(FieldPlan::Primitive(CanonicalKind::VariableBytes));
            }
            if !base.shape.is_scalar() {
                diags.report(
                    location,
                    DiagnosticCode::UnsupportedShape,
                    format!("field type '{}' nests an array inside an array", field.ty),
                );
                return None;
            }
            Some(FieldPlan::Array {
                element: Box::new(element_plan(base.kind)),
                fixed_len: None,
            })
        }
        TypeShape::Array(n) => {
            if resolver.ref_is_byte(&field.ty, &module.name, diags) {
                // A fixed byte array decodes zero-copy into a caller buffer;
                // an element loop here would cost an allocation per field.
                return Some(FieldPlan::FixedBytes(n));
            }
            if !base.shape.is_scalar() {
                diags.report(
                    location,
                    DiagnosticCode::UnsupportedShape,
                    format!("field type '{}' nests an array inside an array", field.ty),
                );
                return None;
            }
            Some(FieldPlan::Array {
                element: Box::new(element_plan(base.kind)),
                fixed_len: Some(n),
            })
        }
    }
}

/// Re-apply an alias-carried array shape to the element plan
fn wrap_shape(kind: CanonicalKind, shape: ElemShape) -> FieldPlan {
    match shape {
        ElemShape::Scalar => element_plan(kind),
        ElemShape::Variable => FieldPlan::Array {
            element: Box::new(element_plan(kind)),
            fixed_len: None,
        },
        ElemShape::Fixed(n) => FieldPlan::Array {
            element: Box::new(element_plan(kind)),
            fixed_len: Some(n),
        },
    }
}

fn element_plan(kind: CanonicalKind) -> FieldPlan {
    match kind {
        CanonicalKind::Record(name) => FieldPlan::Delegate(name),
        CanonicalKind::FixedBytes(n) => FieldPlan::FixedBytes(n),
        other => FieldPlan::Primitive(other),
    }
}
