//! Diagnostics
//!
//! Collects fatal and advisory findings from the analysis passes. Fatal
//! (error-severity) diagnostics abort the whole run before any plan is
//! surfaced; advisory (warning-severity) diagnostics are reported and
//! never block completion.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Location;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Resolution ===
    /// Alias chain loops back on itself; resolved as an opaque record
    AliasCycle,
    /// Referenced module could not be located or read
    UnresolvedModule,
    /// Cross-module alias chain bottoms out at yet another cross-module
    /// reference; resolved as an opaque record
    MultiHopAlias,

    // === Cycle Detection ===
    /// A reference cycle between records was found; participants get a
    /// runtime recursion guard
    ReferenceCycle,

    // === Union Structure ===
    /// Union container with more than one discriminant-annotated field
    MultipleDiscriminants,
    /// Discriminant field does not resolve to a 32-bit unsigned integer
    BadDiscriminantKind,
    /// No payload carrier field could be selected for the container
    MissingCarrier,
    /// Carrier selection was ambiguous under the active policy
    AmbiguousCarrier,
    /// More than one catch-all/default case across the union
    MultipleDefaults,
    /// Same discriminant constant mapped more than once
    DuplicateCase,

    // === Union References ===
    /// Case mapping names a constant that does not exist
    UnknownConstant,
    /// Case mapping names a constant of a different discriminant type
    ForeignConstant,
    /// Case mapping names a payload type that does not exist
    UnknownPayload,
    /// Payload type does not resolve to a record
    BadPayloadKind,
    /// Case mapping targets a type with no discriminant field
    OrphanCaseMapping,

    // === Synthesis ===
    /// Field kind could not be resolved
    UnresolvedField,
    /// Field shape has no codec operation (e.g. nested arrays)
    UnsupportedShape,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AliasCycle => "W001",
            Self::UnresolvedModule => "W002",
            Self::MultiHopAlias => "W003",
            Self::ReferenceCycle => "W004",
            Self::AmbiguousCarrier => "W005",
            Self::MultipleDiscriminants => "E001",
            Self::BadDiscriminantKind => "E002",
            Self::MissingCarrier => "E003",
            Self::MultipleDefaults => "E004",
            Self::DuplicateCase => "E005",
            Self::UnknownConstant => "E006",
            Self::ForeignConstant => "E007",
            Self::UnknownPayload => "E008",
            Self::BadPayloadKind => "E009",
            Self::UnresolvedField => "E010",
            Self::UnsupportedShape => "E011",
            Self::OrphanCaseMapping => "E012",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::AliasCycle
            | Self::UnresolvedModule
            | Self::MultiHopAlias
            | Self::ReferenceCycle
            | Self::AmbiguousCarrier => Severity::Warning,

            Self::MultipleDiscriminants
            | Self::BadDiscriminantKind
            | Self::MissingCarrier
            | Self::MultipleDefaults
            | Self::DuplicateCase
            | Self::UnknownConstant
            | Self::ForeignConstant
            | Self::UnknownPayload
            | Self::BadPayloadKind
            | Self::UnresolvedField
            | Self::UnsupportedShape
            | Self::OrphanCaseMapping => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level. Errors are fatal to the run; warnings are
/// advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Where the issue was found
    pub location: Location,
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (related types, chains, constants)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(location: Location, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            location,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.location
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from the analysis passes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item
    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Add a diagnostic from its parts
    pub fn report(&mut self, location: Location, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(location, code, message));
    }

    /// Add a diagnostic for an alias chain that loops
    pub fn alias_cycle(&mut self, location: Location, chain: &[String]) {
        self.push(
            DiagnosticItem::new(
                location,
                DiagnosticCode::AliasCycle,
                "alias chain loops; treating as opaque record",
            )
            .with_context(format!("chain: {}", chain.join(" -> "))),
        );
    }

    /// Add a diagnostic for an unreadable module
    pub fn unresolved_module(&mut self, location: Location, module: &str) {
        self.push(DiagnosticItem::new(
            location,
            DiagnosticCode::UnresolvedModule,
            format!(
                "module '{}' could not be loaded; treating reference as opaque record",
                module
            ),
        ));
    }

    /// Add a diagnostic for a reference cycle between records
    pub fn reference_cycle(&mut self, location: Location, path: &[String]) {
        self.push(
            DiagnosticItem::new(
                location,
                DiagnosticCode::ReferenceCycle,
                "reference cycle found; participating records get a runtime recursion guard",
            )
            .with_context(format!("cycle: {}", path.join(" -> "))),
        );
    }

    /// Check if there are any fatal diagnostics
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity() == Severity::Error)
    }

    /// Get all fatal diagnostics
    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Error)
    }

    /// Get all advisory diagnostics
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items
            .iter()
            .filter(|i| i.severity() == Severity::Warning)
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Merge another collection into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        if self.has_errors() {
            writeln!(
                f,
                "{} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            )?;
        } else if !self.is_empty() {
            writeln!(f, "{} warning(s)", self.warning_count())?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
