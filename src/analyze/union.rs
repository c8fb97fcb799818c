//! Union assembly
//!
//! Correlates discriminant-bearing container records with their payload
//! types and discriminant constants, computes void (payload-less) cases, and
//! validates every configuration before anything is handed to synthesis.
//! Assembly fails closed: a config that does not pass both the structural
//! and the referential validation pass never leaves this module.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{FieldDeclaration, Location, Module, ModuleSet, TypeDeclaration};

use super::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use super::resolve::{is_builtin_name, CanonicalKind, ElemShape, Resolver};

// =============================================================================
// Union Config
// =============================================================================

/// The catch-all case of a union, matching any unmapped discriminant value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCase {
    /// Payload type, or `None` for a payload-less default
    pub payload: Option<String>,
}

/// A finalized union configuration for one container record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionConfig {
    /// Owning container record
    pub container: String,
    /// The field whose value selects the active payload
    pub discriminant_field: String,
    /// Named discriminant type of the field, when it has one. Constants of
    /// this type form the void-case universe.
    pub discriminant_type: Option<String>,
    /// The field carrying the variant-specific payload bytes
    pub carrier_field: String,
    /// Constant name to payload type, in sorted constant order
    pub cases: BTreeMap<String, String>,
    /// Constants of the discriminant type with no payload. Empty when a
    /// default case covers them.
    pub void_cases: BTreeSet<String>,
    /// At most one catch-all case across the whole union
    pub default_case: Option<DefaultCase>,
}

// =============================================================================
// Carrier Policy
// =============================================================================

/// How the payload carrier field is selected within a container.
///
/// Carrier adjacency is a policy, not a hard-coded positional rule; when the
/// selected carrier is not the field immediately following the discriminant,
/// the ambiguity is reported as advisory rather than guessed silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarrierPolicy {
    /// The field declared immediately after the discriminant
    #[default]
    Adjacent,
    /// The first non-excluded byte-carrier field anywhere after the
    /// discriminant
    FirstBytesField,
}

// =============================================================================
// Assembler
// =============================================================================

/// Assembles union configurations across a whole module set
pub struct UnionAssembler<'a> {
    modules: &'a ModuleSet,
    policy: CarrierPolicy,
}

impl<'a> UnionAssembler<'a> {
    pub fn new(modules: &'a ModuleSet) -> Self {
        Self {
            modules,
            policy: CarrierPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CarrierPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble and validate every union in the module set.
    ///
    /// Containers that fail validation are reported fatally and omitted from
    /// the result; the caller aborts the run before synthesis consumes it.
    pub fn assemble(
        &self,
        resolver: &mut Resolver<'_>,
        diags: &mut Diagnostics,
    ) -> BTreeMap<String, UnionConfig> {
        let mut configs = BTreeMap::new();
        let mut discriminated: BTreeSet<String> = BTreeSet::new();

        for (module, record) in self.modules.records() {
            let discriminants: Vec<(usize, &FieldDeclaration)> = record
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| f.annotations.discriminant)
                .collect();

            if !discriminants.is_empty() {
                discriminated.insert(record.name().to_string());
            }

            match discriminants.len() {
                0 => continue,
                1 => {}
                n => {
                    diags.report(
                        Location::new(&module.name, record.name()),
                        DiagnosticCode::MultipleDiscriminants,
                        format!("union container has {} discriminant fields, expected exactly one", n),
                    );
                    continue;
                }
            }

            let (disc_index, disc_field) = discriminants[0];
            if let Some(config) =
                self.assemble_container(module, record, disc_index, disc_field, resolver, diags)
            {
                configs.insert(config.container.clone(), config);
            }
        }

        // Every gathered mapping must target a record that actually has a
        // discriminant; stray linkage fails closed instead of vanishing.
        for mapping in self.modules.case_mappings() {
            if !discriminated.contains(&mapping.container) {
                diags.report(
                    Location::new(&mapping.module, &mapping.container),
                    DiagnosticCode::OrphanCaseMapping,
                    format!(
                        "case mapping targets '{}', which has no discriminant field",
                        mapping.container
                    ),
                );
            }
        }

        tracing::debug!(unions = configs.len(), "union assembly finished");
        configs
    }

    fn assemble_container(
        &self,
        module: &Module,
        record: &TypeDeclaration,
        disc_index: usize,
        disc_field: &FieldDeclaration,
        resolver: &mut Resolver<'_>,
        diags: &mut Diagnostics,
    ) -> Option<UnionConfig> {
        let container = record.name();
        let location = Location::new(&module.name, container);

        // Structural pass.
        let resolved = resolver.resolve_ref(&disc_field.ty, &module.name, diags);
        if resolved.kind != CanonicalKind::UnsignedInt32 || resolved.shape != ElemShape::Scalar {
            diags.push(
                DiagnosticItem::new(
                    location.clone().with_field(&disc_field.name),
                    DiagnosticCode::BadDiscriminantKind,
                    format!(
                        "discriminant must resolve to uint32, found {}",
                        resolved.kind
                    ),
                ),
            );
            return None;
        }

        let carrier =
            self.select_carrier(module, record, disc_index, disc_field, resolver, diags)?;

        // The discriminant's named type scopes the constant universe; a
        // discriminant declared directly as a builtin has none.
        let discriminant_type = if is_builtin_name(&disc_field.ty.name) {
            None
        } else {
            Some(disc_field.ty.name.clone())
        };

        // Referential pass over the case mappings gathered module-set-wide.
        let mut cases: BTreeMap<String, String> = BTreeMap::new();
        let mut default_case: Option<DefaultCase> = None;
        let mut valid = true;

        for mapping in self.modules.case_mappings().filter(|m| m.container == container) {
            let map_location = Location::new(&mapping.module, &mapping.payload);

            if mapping.is_default {
                if default_case.is_some() {
                    diags.report(
                        map_location,
                        DiagnosticCode::MultipleDefaults,
                        format!("union '{}' has more than one default case", container),
                    );
                    valid = false;
                    continue;
                }
                if !self.check_payload(&mapping.payload, &mapping.module, resolver, diags) {
                    valid = false;
                    continue;
                }
                default_case = Some(DefaultCase {
                    payload: Some(mapping.payload.clone()),
                });
                continue;
            }

            let Some(constant_name) = mapping.constant.as_deref() else {
                // Extractor contract: only default mappings omit the constant.
                diags.report(
                    map_location,
                    DiagnosticCode::UnknownConstant,
                    format!("case mapping for union '{}' names no constant", container),
                );
                valid = false;
                continue;
            };

            let Some(constant) = self.modules.find_constant(constant_name) else {
                diags.report(
                    map_location,
                    DiagnosticCode::UnknownConstant,
                    format!("constant '{}' does not exist", constant_name),
                );
                valid = false;
                continue;
            };

            if let Some(disc_type) = &discriminant_type {
                if &constant.discriminant_type != disc_type {
                    diags.report(
                        map_location,
                        DiagnosticCode::ForeignConstant,
                        format!(
                            "constant '{}' belongs to '{}', not discriminant type '{}'",
                            constant_name, constant.discriminant_type, disc_type
                        ),
                    );
                    valid = false;
                    continue;
                }
            }

            if !self.check_payload(&mapping.payload, &mapping.module, resolver, diags) {
                valid = false;
                continue;
            }

            if cases
                .insert(constant_name.to_string(), mapping.payload.clone())
                .is_some()
            {
                diags.report(
                    Location::new(&mapping.module, container),
                    DiagnosticCode::DuplicateCase,
                    format!(
                        "constant '{}' is mapped more than once in union '{}'",
                        constant_name, container
                    ),
                );
                valid = false;
            }
        }

        if !valid {
            return None;
        }

        // Void cases: constants of the discriminant type not mapped to a
        // payload. A default case covers them all.
        let void_cases: BTreeSet<String> = if default_case.is_some() {
            BTreeSet::new()
        } else {
            discriminant_type
                .as_deref()
                .map(|ty| {
                    self.modules
                        .constants_of(ty)
                        .into_iter()
                        .filter(|c| !cases.contains_key(&c.name))
                        .map(|c| c.name.clone())
                        .collect()
                })
                .unwrap_or_default()
        };

        Some(UnionConfig {
            container: container.to_string(),
            discriminant_field: disc_field.name.clone(),
            discriminant_type,
            carrier_field: carrier,
            cases,
            void_cases,
            default_case,
        })
    }

    /// Select the payload carrier field under the active policy.
    fn select_carrier(
        &self,
        module: &Module,
        record: &TypeDeclaration,
        disc_index: usize,
        disc_field: &FieldDeclaration,
        resolver: &mut Resolver<'_>,
        diags: &mut Diagnostics,
    ) -> Option<String> {
        let location = Location::new(&module.name, record.name());
        let following = &record.fields()[disc_index + 1..];

        let selected = match self.policy {
            CarrierPolicy::Adjacent => {
                // An excluded adjacent field can never carry the payload;
                // accepting it would validate a union whose dispatch op the
                // synthesizer later drops with the field.
                if let Some(next) = following.first() {
                    if next.annotations.excluded {
                        diags.report(
                            location.clone().with_field(&next.name),
                            DiagnosticCode::MissingCarrier,
                            format!(
                                "carrier field '{}' adjacent to discriminant '{}' is excluded",
                                next.name, disc_field.name
                            ),
                        );
                        return None;
                    }
                }
                following.first()
            }
            CarrierPolicy::FirstBytesField => {
                let found = following.iter().position(|f| {
                    !f.annotations.excluded
                        && resolver.resolve_ref(&f.ty, &module.name, diags).kind
                            == CanonicalKind::VariableBytes
                });
                if let Some(pos) = found {
                    if pos != 0 {
                        diags.report(
                            location.clone().with_field(&following[pos].name),
                            DiagnosticCode::AmbiguousCarrier,
                            format!(
                                "carrier '{}' is not adjacent to discriminant '{}'",
                                following[pos].name, disc_field.name
                            ),
                        );
                    }
                    Some(&following[pos])
                } else {
                    None
                }
            }
        };

        match selected {
            Some(field) => Some(field.name.clone()),
            None => {
                diags.report(
                    location.with_field(&disc_field.name),
                    DiagnosticCode::MissingCarrier,
                    format!(
                        "no payload carrier field follows discriminant '{}'",
                        disc_field.name
                    ),
                );
                None
            }
        }
    }

    /// A payload must resolve to a record (directly or via alias), never back
    /// to a primitive or unresolved kind.
    fn check_payload(
        &self,
        payload: &str,
        module: &str,
        resolver: &mut Resolver<'_>,
        diags: &mut Diagnostics,
    ) -> bool {
        if self.modules.find_type(payload).is_none() {
            diags.report(
                Location::new(module, payload),
                DiagnosticCode::UnknownPayload,
                format!("payload type '{}' does not exist", payload),
            );
            return false;
        }
        let kind = resolver.resolve(payload, module, diags);
        if !kind.is_record() {
            diags.report(
                Location::new(module, payload),
                DiagnosticCode::BadPayloadKind,
                format!("payload type '{}' resolves to {}, expected a record", payload, kind),
            );
            return false;
        }
        true
    }
}
