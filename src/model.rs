//! Declaration model
//!
//! The write-once snapshot of everything the upstream extractor collected:
//! type declarations, constants, per-field annotations, and payload-to-union
//! case mappings. Analysis passes read this model and never mutate it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::CompileError;

// =============================================================================
// Location
// =============================================================================

/// Location token attached to every diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Owning module name
    pub module: String,
    /// Owning type name
    pub type_name: String,
    /// Field name, when the diagnostic is scoped to a single field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Location {
    pub fn new(module: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            type_name: type_name.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.type_name)?;
        if let Some(field) = &self.field {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

// =============================================================================
// Type References
// =============================================================================

/// Declared shape of a type reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeShape {
    /// `T`
    Plain,
    /// `*T`
    Pointer,
    /// `[]T`
    Slice,
    /// `[]*T`
    SliceOfPointer,
    /// `[N]T`
    Array(usize),
}

impl TypeShape {
    /// Variable-length shapes (`[]T`, `[]*T`)
    pub fn is_variable(&self) -> bool {
        matches!(self, TypeShape::Slice | TypeShape::SliceOfPointer)
    }

    /// Single-element shapes (`T`, `*T`)
    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeShape::Plain | TypeShape::Pointer)
    }

    /// Fixed array length, if any
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            TypeShape::Array(n) => Some(*n),
            _ => None,
        }
    }
}

/// A by-name, possibly module-qualified, possibly shaped type reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Qualifying module, for cross-module references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Referenced type name
    pub name: String,
    /// Declared shape
    #[serde(default = "TypeShape::plain")]
    pub shape: TypeShape,
}

impl TypeShape {
    fn plain() -> Self {
        TypeShape::Plain
    }
}

impl TypeRef {
    /// Plain same-module reference: `T`
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
            shape: TypeShape::Plain,
        }
    }

    /// Module-qualified reference: `other.T`
    pub fn qualified(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            name: name.into(),
            shape: TypeShape::Plain,
        }
    }

    /// Same reference with a different shape
    pub fn shaped(mut self, shape: TypeShape) -> Self {
        self.shape = shape;
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            TypeShape::Plain => {}
            TypeShape::Pointer => write!(f, "*")?,
            TypeShape::Slice => write!(f, "[]")?,
            TypeShape::SliceOfPointer => write!(f, "[]*")?,
            TypeShape::Array(n) => write!(f, "[{}]", n)?,
        }
        if let Some(module) = &self.module {
            write!(f, "{}.", module)?;
        }
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Per-field annotation set, as extracted upstream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    /// Field is neither encoded nor decoded
    #[serde(default)]
    pub excluded: bool,
    /// Field is the union discriminant of its container
    #[serde(default)]
    pub discriminant: bool,
    /// Explicit default value expression for the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_default: Option<String>,
}

impl Annotations {
    /// Marks the field as the union discriminant
    pub fn discriminant() -> Self {
        Self {
            discriminant: true,
            ..Self::default()
        }
    }

    /// Marks the field as excluded from the wire format
    pub fn excluded() -> Self {
        Self {
            excluded: true,
            ..Self::default()
        }
    }
}

/// A field of a record declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    /// Declared type reference
    pub ty: TypeRef,
    #[serde(default)]
    pub annotations: Annotations,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Annotations::default(),
        }
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// A type declaration: a record with ordered fields, or an alias
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDeclaration {
    Record {
        name: String,
        fields: Vec<FieldDeclaration>,
    },
    Alias {
        name: String,
        target: TypeRef,
    },
}

impl TypeDeclaration {
    pub fn name(&self) -> &str {
        match self {
            TypeDeclaration::Record { name, .. } => name,
            TypeDeclaration::Alias { name, .. } => name,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, TypeDeclaration::Record { .. })
    }

    /// Record fields, or an empty slice for aliases
    pub fn fields(&self) -> &[FieldDeclaration] {
        match self {
            TypeDeclaration::Record { fields, .. } => fields,
            TypeDeclaration::Alias { .. } => &[],
        }
    }
}

/// An integer constant belonging to a discriminant type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDeclaration {
    pub name: String,
    /// Name of the discriminant type this constant belongs to
    pub discriminant_type: String,
    pub value: u32,
}

impl ConstantDeclaration {
    pub fn new(
        name: impl Into<String>,
        discriminant_type: impl Into<String>,
        value: u32,
    ) -> Self {
        Self {
            name: name.into(),
            discriminant_type: discriminant_type.into(),
            value,
        }
    }
}

/// Raw payload-to-union linkage gathered from a payload type declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMapping {
    /// Union container type name
    pub container: String,
    /// Discriminant constant selecting this payload; `None` only for the
    /// catch-all/default mapping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<String>,
    /// Payload type name
    pub payload: String,
    /// Catch-all case matching any unmapped discriminant value
    #[serde(default)]
    pub is_default: bool,
    /// Module the mapping was declared in
    pub module: String,
}

impl CaseMapping {
    pub fn new(
        container: impl Into<String>,
        constant: impl Into<String>,
        payload: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            constant: Some(constant.into()),
            payload: payload.into(),
            is_default: false,
            module: module.into(),
        }
    }

    pub fn default_case(
        container: impl Into<String>,
        payload: impl Into<String>,
        module: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            constant: None,
            payload: payload.into(),
            is_default: true,
            module: module.into(),
        }
    }
}

// =============================================================================
// Modules
// =============================================================================

/// All declarations collected from one module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
    #[serde(default)]
    pub constants: Vec<ConstantDeclaration>,
    #[serde(default)]
    pub case_mappings: Vec<CaseMapping>,
    /// Types that already expose a matching encode/decode pair. These always
    /// resolve to an opaque record delegating to their own codec.
    #[serde(default)]
    pub manual_codecs: BTreeSet<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_types(mut self, types: Vec<TypeDeclaration>) -> Self {
        self.types = types;
        self
    }

    pub fn with_constants(mut self, constants: Vec<ConstantDeclaration>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_case_mappings(mut self, mappings: Vec<CaseMapping>) -> Self {
        self.case_mappings = mappings;
        self
    }

    /// Look up a type declaration by name
    pub fn get_type(&self, name: &str) -> Option<&TypeDeclaration> {
        self.types.iter().find(|t| t.name() == name)
    }
}

/// The closed set of modules analyzed together.
///
/// Construction validates name uniqueness; after that the set is a read-only
/// snapshot for the whole compilation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSet {
    modules: Vec<Module>,
}

impl ModuleSet {
    /// Build a module set, rejecting duplicate type names anywhere in the
    /// set. Graph nodes, recursion flags, and canonical record kinds are all
    /// keyed by bare type name, so a name collision between two modules
    /// would conflate unrelated types.
    pub fn new(modules: Vec<Module>) -> Result<Self, CompileError> {
        {
            let mut seen = BTreeSet::new();
            for module in &modules {
                for decl in &module.types {
                    if !seen.insert(decl.name()) {
                        return Err(CompileError::DuplicateType {
                            module: module.name.clone(),
                            name: decl.name().to_string(),
                        });
                    }
                }
            }
        }
        Ok(Self { modules })
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// All record declarations with their owning module
    pub fn records(&self) -> impl Iterator<Item = (&Module, &TypeDeclaration)> {
        self.modules
            .iter()
            .flat_map(|m| m.types.iter().filter(|t| t.is_record()).map(move |t| (m, t)))
    }

    /// Find a type declaration anywhere in the set
    pub fn find_type(&self, name: &str) -> Option<(&Module, &TypeDeclaration)> {
        self.modules
            .iter()
            .find_map(|m| m.get_type(name).map(|t| (m, t)))
    }

    /// Find a type declaration in a specific module of the set
    pub fn find_type_in(&self, module: &str, name: &str) -> Option<&TypeDeclaration> {
        self.modules
            .iter()
            .find(|m| m.name == module)
            .and_then(|m| m.get_type(name))
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Whether a type carries a hand-written codec anywhere in the set
    pub fn has_manual_codec(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.manual_codecs.contains(name))
    }

    /// Find a constant declaration by name anywhere in the set
    pub fn find_constant(&self, name: &str) -> Option<&ConstantDeclaration> {
        self.modules
            .iter()
            .find_map(|m| m.constants.iter().find(|c| c.name == name))
    }

    /// All constants belonging to a discriminant type, across the set
    pub fn constants_of(&self, discriminant_type: &str) -> Vec<&ConstantDeclaration> {
        self.modules
            .iter()
            .flat_map(|m| m.constants.iter())
            .filter(|c| c.discriminant_type == discriminant_type)
            .collect()
    }

    /// All case mappings across the set
    pub fn case_mappings(&self) -> impl Iterator<Item = &CaseMapping> {
        self.modules.iter().flat_map(|m| m.case_mappings.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::plain("Foo").to_string(), "Foo");
        assert_eq!(
            TypeRef::plain("Foo").shaped(TypeShape::Slice).to_string(),
            "[]Foo"
        );
        assert_eq!(
            TypeRef::plain("byte").shaped(TypeShape::Array(32)).to_string(),
            "[32]byte"
        );
        assert_eq!(
            TypeRef::qualified("other", "Foo")
                .shaped(TypeShape::SliceOfPointer)
                .to_string(),
            "[]*other.Foo"
        );
    }

    #[test]
    fn test_location_display() {
        let loc = Location::new("core", "Message").with_field("Body");
        assert_eq!(loc.to_string(), "core::Message.Body");
    }

    #[test]
    fn test_module_set_rejects_duplicates() {
        let module = Module::new("core").with_types(vec![
            TypeDeclaration::Alias {
                name: "A".into(),
                target: TypeRef::plain("uint32"),
            },
            TypeDeclaration::Record {
                name: "A".into(),
                fields: vec![],
            },
        ]);
        let err = ModuleSet::new(vec![module]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_module_set_rejects_cross_module_duplicates() {
        let first = Module::new("alpha").with_types(vec![TypeDeclaration::Record {
            name: "Msg".into(),
            fields: vec![],
        }]);
        let second = Module::new("beta").with_types(vec![TypeDeclaration::Record {
            name: "Msg".into(),
            fields: vec![],
        }]);

        let err = ModuleSet::new(vec![first, second]).unwrap_err();
        assert!(err.to_string().contains("Msg"));
        assert!(err.to_string().contains("beta"));
    }

    #[test]
    fn test_constants_of_filters_by_type() {
        let module = Module::new("core").with_constants(vec![
            ConstantDeclaration::new("KIND_A", "Kind", 0),
            ConstantDeclaration::new("KIND_B", "Kind", 1),
            ConstantDeclaration::new("OTHER", "Other", 0),
        ]);
        let set = ModuleSet::new(vec![module]).unwrap();
        let kinds = set.constants_of("Kind");
        assert_eq!(kinds.len(), 2);
        assert!(set.find_constant("OTHER").is_some());
    }
}
