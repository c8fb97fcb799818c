//! Alias resolution
//!
//! Resolves declared field types to canonical wire kinds, following alias
//! chains within and across module boundaries and cutting cycles safely.
//! Unresolvable references degrade to opaque records delegating to their own
//! codec — never to a silently mis-typed primitive.
//!
//! Resolution is a pure function of the collected model; results are memoized
//! per type name for the duration of one compilation run. Cross-module lookup
//! goes through the injected [`ModuleLoader`] and is memoized the same way,
//! so no cached state leaks between independent runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::loader::ModuleLoader;
use crate::model::{Location, Module, ModuleSet, TypeDeclaration, TypeRef, TypeShape};

use super::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};

// =============================================================================
// Canonical Kind
// =============================================================================

/// The fully-resolved, alias-free wire classification of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalKind {
    UnsignedInt32,
    UnsignedInt64,
    SignedInt32,
    SignedInt64,
    Utf8String,
    /// Length-prefixed opaque byte string
    VariableBytes,
    /// Fixed-size byte blob, no length prefix
    FixedBytes(usize),
    Boolean,
    /// A slot admitting arbitrary runtime content; forces a recursion guard
    /// on any record containing one
    Dynamic,
    /// Delegates to the named record's own codec
    Record(String),
    /// Could not be classified; fatal at synthesis time
    Unresolved,
}

impl CanonicalKind {
    pub fn is_record(&self) -> bool {
        matches!(self, CanonicalKind::Record(_))
    }

    /// The record name this kind delegates to, if any
    pub fn record_name(&self) -> Option<&str> {
        match self {
            CanonicalKind::Record(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsignedInt32 => write!(f, "uint32"),
            Self::UnsignedInt64 => write!(f, "uint64"),
            Self::SignedInt32 => write!(f, "int32"),
            Self::SignedInt64 => write!(f, "int64"),
            Self::Utf8String => write!(f, "string"),
            Self::VariableBytes => write!(f, "bytes"),
            Self::FixedBytes(n) => write!(f, "bytes[{}]", n),
            Self::Boolean => write!(f, "bool"),
            Self::Dynamic => write!(f, "dynamic"),
            Self::Record(name) => write!(f, "record({})", name),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Array shape carried by a resolved type that did not collapse into the
/// kind itself (byte arrays collapse; everything else keeps its shape)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElemShape {
    /// Single element
    Scalar,
    /// Variable-length element sequence
    Variable,
    /// Fixed-length element sequence
    Fixed(usize),
}

impl ElemShape {
    pub fn is_scalar(&self) -> bool {
        matches!(self, ElemShape::Scalar)
    }
}

/// A fully resolved type reference: the canonical element kind plus any
/// surviving array shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedType {
    pub kind: CanonicalKind,
    pub shape: ElemShape,
}

impl ResolvedType {
    pub fn scalar(kind: CanonicalKind) -> Self {
        Self {
            kind,
            shape: ElemShape::Scalar,
        }
    }
}

// =============================================================================
// Base kinds
// =============================================================================

/// Internal resolution result. `Byte` is kept distinct from the public kinds
/// because single-byte elements collapse differently under array shapes
/// (`[N]byte` is a wire blob, plain `byte` widens to uint32 on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Base {
    Kind(CanonicalKind),
    Byte,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    base: Base,
    shape: ElemShape,
}

impl Entry {
    fn scalar(base: Base) -> Self {
        Self {
            base,
            shape: ElemShape::Scalar,
        }
    }

    fn record(name: &str) -> Self {
        Self::scalar(Base::Kind(CanonicalKind::Record(name.to_string())))
    }

    fn is_scalar_byte(&self) -> bool {
        self.base == Base::Byte && self.shape.is_scalar()
    }
}

/// Whether a name is one of the builtin primitives (i.e. it cannot scope a
/// constant universe or be declared by a module)
pub fn is_builtin_name(name: &str) -> bool {
    builtin(name).is_some()
}

/// Builtin primitive names as emitted by the upstream extractor
fn builtin(name: &str) -> Option<Base> {
    let kind = match name {
        "uint32" | "u32" => CanonicalKind::UnsignedInt32,
        "uint64" | "u64" => CanonicalKind::UnsignedInt64,
        "int32" | "i32" => CanonicalKind::SignedInt32,
        "int64" | "i64" => CanonicalKind::SignedInt64,
        "string" => CanonicalKind::Utf8String,
        "bytes" => CanonicalKind::VariableBytes,
        "bool" => CanonicalKind::Boolean,
        "any" => CanonicalKind::Dynamic,
        "byte" | "u8" => return Some(Base::Byte),
        _ => return None,
    };
    Some(Base::Kind(kind))
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves type references against a module set, loading foreign modules on
/// demand through an injected loader. One resolver serves one compilation
/// run; its caches never outlive it.
pub struct Resolver<'a> {
    modules: &'a ModuleSet,
    loader: &'a dyn ModuleLoader,
    /// Memoized cross-module loads; `None` records a failed load so the
    /// loader is asked only once per module
    loaded: HashMap<String, Option<Module>>,
    /// Memoized resolutions keyed by `module::name`
    cache: HashMap<String, Entry>,
}

impl<'a> Resolver<'a> {
    pub fn new(modules: &'a ModuleSet, loader: &'a dyn ModuleLoader) -> Self {
        Self {
            modules,
            loader,
            loaded: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Resolve a type name to its canonical wire kind.
    ///
    /// A plain single-byte type widens to uint32 on the wire; byte arrays
    /// are collapsed during chain resolution and come back as
    /// `VariableBytes`/`FixedBytes`.
    pub fn resolve(&mut self, name: &str, current_module: &str, diags: &mut Diagnostics) -> CanonicalKind {
        self.resolve_base(&TypeRef::plain(name), current_module, diags).kind
    }

    /// Resolve a reference's *name* (ignoring its declared shape), keeping
    /// any array shape the alias chain itself carries.
    pub fn resolve_base(
        &mut self,
        ty: &TypeRef,
        current_module: &str,
        diags: &mut Diagnostics,
    ) -> ResolvedType {
        let entry = self.entry(ty.module.as_deref(), &ty.name, current_module, diags);
        let kind = match entry.base {
            // A bare byte field occupies a full 4-byte slot on the wire.
            Base::Byte => CanonicalKind::UnsignedInt32,
            Base::Kind(kind) => kind,
        };
        ResolvedType {
            kind,
            shape: entry.shape,
        }
    }

    /// Resolve a full reference, composing the declared shape with the
    /// resolved element kind. Byte sequences collapse to wire blobs.
    pub fn resolve_ref(
        &mut self,
        ty: &TypeRef,
        current_module: &str,
        diags: &mut Diagnostics,
    ) -> ResolvedType {
        match ty.shape {
            TypeShape::Plain | TypeShape::Pointer => self.resolve_base(ty, current_module, diags),
            TypeShape::Slice | TypeShape::SliceOfPointer => {
                if self.ref_is_byte(ty, current_module, diags) {
                    ResolvedType::scalar(CanonicalKind::VariableBytes)
                } else {
                    let base = self.resolve_base(ty, current_module, diags);
                    ResolvedType {
                        kind: base.kind,
                        shape: ElemShape::Variable,
                    }
                }
            }
            TypeShape::Array(n) => {
                if self.ref_is_byte(ty, current_module, diags) {
                    ResolvedType::scalar(CanonicalKind::FixedBytes(n))
                } else {
                    let base = self.resolve_base(ty, current_module, diags);
                    ResolvedType {
                        kind: base.kind,
                        shape: ElemShape::Fixed(n),
                    }
                }
            }
        }
    }

    /// Whether a reference's name chain bottoms out at the single-byte kind
    pub fn ref_is_byte(
        &mut self,
        ty: &TypeRef,
        current_module: &str,
        diags: &mut Diagnostics,
    ) -> bool {
        self.entry(ty.module.as_deref(), &ty.name, current_module, diags)
            .is_scalar_byte()
    }

    // =========================================================================
    // Chain resolution
    // =========================================================================

    fn entry(
        &mut self,
        qualifier: Option<&str>,
        name: &str,
        current_module: &str,
        diags: &mut Diagnostics,
    ) -> Entry {
        let module = qualifier.unwrap_or(current_module);
        let key = format!("{}::{}", module, name);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let mut chain = Vec::new();
        // A qualifier pointing outside the module set is already one
        // loader hop.
        let hops = usize::from(qualifier.is_some() && !self.modules.has_module(module));
        let entry = self.chase(module, name, name, &mut chain, hops, diags);

        self.cache.insert(key, entry.clone());
        entry
    }

    /// Follow one alias chain to a primitive, record, or conservative cutoff.
    ///
    /// `original` is the name the caller asked about; every conservative
    /// cutoff resolves to `Record(original)` so unresolved types are always
    /// delegated, never mis-encoded.
    fn chase(
        &mut self,
        module: &str,
        name: &str,
        original: &str,
        chain: &mut Vec<String>,
        hops: usize,
        diags: &mut Diagnostics,
    ) -> Entry {
        let key = format!("{}::{}", module, name);
        if chain.contains(&key) {
            chain.push(key);
            diags.alias_cycle(Location::new(module, original), chain);
            return Entry::record(original);
        }
        chain.push(key);

        // Explicit encode/decode implementations win over structural
        // resolution.
        if self.has_manual_codec(name) {
            return Entry::record(name);
        }

        if let Some(base) = builtin(name) {
            return Entry::scalar(base);
        }

        let decl = match self.lookup(module, name, original, diags) {
            Lookup::Found(decl) => decl,
            Lookup::Cutoff(entry) => return entry,
            Lookup::Missing => {
                tracing::debug!(module, name, "type not found in module set");
                return Entry::scalar(Base::Kind(CanonicalKind::Unresolved));
            }
        };

        match decl {
            TypeDeclaration::Record { name, .. } => Entry::record(&name),
            TypeDeclaration::Alias { name: alias_name, target } => {
                self.chase_alias_target(module, &alias_name, &target, original, chain, hops, diags)
            }
        }
    }

    fn chase_alias_target(
        &mut self,
        module: &str,
        alias_name: &str,
        target: &TypeRef,
        original: &str,
        chain: &mut Vec<String>,
        hops: usize,
        diags: &mut Diagnostics,
    ) -> Entry {
        // Crossing into a module outside the set costs a loader hop; a chain
        // needing a second hop is a multi-hop alias and resolves
        // conservatively.
        let (next_module, hops) = match target.module.as_deref() {
            Some(m) if self.modules.has_module(m) => (m.to_string(), hops),
            Some(m) => {
                if hops >= 1 {
                    diags.push(
                        DiagnosticItem::new(
                            Location::new(module, original),
                            DiagnosticCode::MultiHopAlias,
                            format!(
                                "alias '{}' chains into a second foreign module '{}'; treating as opaque record",
                                alias_name, m
                            ),
                        )
                        .with_context(format!("chain: {}", chain.join(" -> "))),
                    );
                    return Entry::record(original);
                }
                (m.to_string(), hops + 1)
            }
            None => (module.to_string(), hops),
        };

        match target.shape {
            TypeShape::Plain | TypeShape::Pointer => {
                self.chase(&next_module, &target.name, original, chain, hops, diags)
            }
            TypeShape::Slice | TypeShape::SliceOfPointer => {
                let elem = self.chase(&next_module, &target.name, original, chain, hops, diags);
                if elem.is_scalar_byte() {
                    return Entry::scalar(Base::Kind(CanonicalKind::VariableBytes));
                }
                self.wrap_elem(module, alias_name, elem, ElemShape::Variable, diags)
            }
            TypeShape::Array(n) => {
                let elem = self.chase(&next_module, &target.name, original, chain, hops, diags);
                if elem.is_scalar_byte() {
                    // A fixed array of bytes is a zero-copy wire blob, not an
                    // element loop.
                    return Entry::scalar(Base::Kind(CanonicalKind::FixedBytes(n)));
                }
                self.wrap_elem(module, alias_name, elem, ElemShape::Fixed(n), diags)
            }
        }
    }

    /// Re-wrap a resolved element under an alias-carried array shape.
    /// Nested arrays have no codec operation and fail closed.
    fn wrap_elem(
        &mut self,
        module: &str,
        alias_name: &str,
        elem: Entry,
        shape: ElemShape,
        diags: &mut Diagnostics,
    ) -> Entry {
        if !elem.shape.is_scalar() {
            diags.report(
                Location::new(module, alias_name),
                DiagnosticCode::UnsupportedShape,
                format!("alias '{}' nests an array inside an array", alias_name),
            );
            return Entry::scalar(Base::Kind(CanonicalKind::Unresolved));
        }
        Entry {
            base: elem.base,
            shape,
        }
    }

    // =========================================================================
    // Declaration lookup
    // =========================================================================

    fn lookup(
        &mut self,
        module: &str,
        name: &str,
        original: &str,
        diags: &mut Diagnostics,
    ) -> Lookup {
        // The named module's own table first, then the rest of the set.
        if self.modules.has_module(module) {
            if let Some(decl) = self.modules.find_type_in(module, name) {
                return Lookup::Found(decl.clone());
            }
            if let Some((_, decl)) = self.modules.find_type(name) {
                return Lookup::Found(decl.clone());
            }
            return Lookup::Missing;
        }

        // Foreign module: consult the loader, once.
        match self.load_module(module) {
            Some(loaded) if loaded.manual_codecs.contains(name) => {
                Lookup::Cutoff(Entry::record(name))
            }
            Some(loaded) => match loaded.get_type(name) {
                Some(decl) => Lookup::Found(decl.clone()),
                None => {
                    diags.push(DiagnosticItem::new(
                        Location::new(module, original),
                        DiagnosticCode::UnresolvedModule,
                        format!(
                            "type '{}' not found in foreign module '{}'; treating reference as opaque record",
                            name, module
                        ),
                    ));
                    Lookup::Cutoff(Entry::record(original))
                }
            },
            None => {
                diags.unresolved_module(Location::new(module, original), module);
                Lookup::Cutoff(Entry::record(original))
            }
        }
    }

    fn load_module(&mut self, module: &str) -> Option<&Module> {
        if !self.loaded.contains_key(module) {
            let loaded = match self.loader.load(module) {
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(module, error = %err, "module load failed");
                    None
                }
            };
            self.loaded.insert(module.to_string(), loaded);
        }
        self.loaded.get(module).and_then(|m| m.as_ref())
    }

    fn has_manual_codec(&self, name: &str) -> bool {
        self.modules.has_manual_codec(name)
            || self
                .loaded
                .values()
                .flatten()
                .any(|m| m.manual_codecs.contains(name))
    }
}

enum Lookup {
    Found(TypeDeclaration),
    Cutoff(Entry),
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{InMemoryLoader, NullLoader};
    use crate::model::{FieldDeclaration, Module, ModuleSet};

    fn alias(name: &str, target: TypeRef) -> TypeDeclaration {
        TypeDeclaration::Alias {
            name: name.into(),
            target,
        }
    }

    fn record(name: &str) -> TypeDeclaration {
        TypeDeclaration::Record {
            name: name.into(),
            fields: vec![FieldDeclaration::new("Value", TypeRef::plain("uint32"))],
        }
    }

    fn set(types: Vec<TypeDeclaration>) -> ModuleSet {
        ModuleSet::new(vec![Module::new("core").with_types(types)]).unwrap()
    }

    #[test]
    fn test_resolves_builtin_primitives() {
        let modules = set(vec![]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("uint32", "core", &mut diags),
            CanonicalKind::UnsignedInt32
        );
        assert_eq!(
            resolver.resolve("string", "core", &mut diags),
            CanonicalKind::Utf8String
        );
        assert_eq!(
            resolver.resolve("any", "core", &mut diags),
            CanonicalKind::Dynamic
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_follows_alias_chain() {
        let modules = set(vec![
            alias("A", TypeRef::plain("B")),
            alias("B", TypeRef::plain("C")),
            alias("C", TypeRef::plain("uint64")),
        ]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("A", "core", &mut diags),
            CanonicalKind::UnsignedInt64
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let modules = set(vec![alias("A", TypeRef::plain("uint32")), record("Rec")]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        let first = resolver.resolve("A", "core", &mut diags);
        let second = resolver.resolve("A", "core", &mut diags);
        assert_eq!(first, second);

        let rec = resolver.resolve("Rec", "core", &mut diags);
        assert_eq!(rec, CanonicalKind::Record("Rec".into()));
        assert_eq!(resolver.resolve("Rec", "core", &mut diags), rec);
    }

    #[test]
    fn test_alias_cycle_degrades_to_record() {
        let modules = set(vec![
            alias("A", TypeRef::plain("B")),
            alias("B", TypeRef::plain("A")),
        ]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("A", "core", &mut diags),
            CanonicalKind::Record("A".into())
        );
        assert_eq!(diags.warning_count(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_self_alias_cycle_terminates() {
        let modules = set(vec![alias("A", TypeRef::plain("A"))]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("A", "core", &mut diags),
            CanonicalKind::Record("A".into())
        );
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_fixed_byte_array_collapses() {
        let modules = set(vec![
            alias("Hash", TypeRef::plain("byte").shaped(TypeShape::Array(32))),
            alias("Inner", TypeRef::plain("byte")),
            alias("Digest", TypeRef::plain("Inner").shaped(TypeShape::Array(20))),
        ]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Hash", "core", &mut diags),
            CanonicalKind::FixedBytes(32)
        );
        // Byte-ness survives an intermediate alias.
        assert_eq!(
            resolver.resolve("Digest", "core", &mut diags),
            CanonicalKind::FixedBytes(20)
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_byte_slice_is_variable_bytes() {
        let modules = set(vec![alias(
            "Blob",
            TypeRef::plain("byte").shaped(TypeShape::Slice),
        )]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Blob", "core", &mut diags),
            CanonicalKind::VariableBytes
        );
    }

    #[test]
    fn test_plain_byte_widens_to_uint32() {
        let modules = set(vec![alias("B", TypeRef::plain("byte"))]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("B", "core", &mut diags),
            CanonicalKind::UnsignedInt32
        );
    }

    #[test]
    fn test_alias_to_record_array_keeps_shape() {
        let modules = set(vec![
            record("Item"),
            alias("Items", TypeRef::plain("Item").shaped(TypeShape::Slice)),
        ]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        let resolved = resolver.resolve_base(&TypeRef::plain("Items"), "core", &mut diags);
        assert_eq!(resolved.kind, CanonicalKind::Record("Item".into()));
        assert_eq!(resolved.shape, ElemShape::Variable);
    }

    #[test]
    fn test_nested_arrays_fail_closed() {
        let modules = set(vec![
            record("Item"),
            alias("Row", TypeRef::plain("Item").shaped(TypeShape::Slice)),
            alias("Grid", TypeRef::plain("Row").shaped(TypeShape::Slice)),
        ]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        let resolved = resolver.resolve_base(&TypeRef::plain("Grid"), "core", &mut diags);
        assert_eq!(resolved.kind, CanonicalKind::Unresolved);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_unknown_name_is_unresolved() {
        let modules = set(vec![]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Missing", "core", &mut diags),
            CanonicalKind::Unresolved
        );
    }

    #[test]
    fn test_manual_codec_wins_over_structure() {
        let mut module = Module::new("core").with_types(vec![alias("Special", TypeRef::plain("uint32"))]);
        module.manual_codecs.insert("Special".into());
        let modules = ModuleSet::new(vec![module]).unwrap();
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Special", "core", &mut diags),
            CanonicalKind::Record("Special".into())
        );
    }

    #[test]
    fn test_cross_module_resolution_through_loader() {
        let modules = set(vec![alias("Remote", TypeRef::qualified("other", "Width"))]);
        let mut loader = InMemoryLoader::new();
        loader.insert(
            Module::new("other").with_types(vec![alias("Width", TypeRef::plain("uint64"))]),
        );
        let mut resolver = Resolver::new(&modules, &loader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Remote", "core", &mut diags),
            CanonicalKind::UnsignedInt64
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_loader_is_consulted_once_per_module() {
        use crate::loader::ModuleLoader;
        use std::cell::RefCell;

        struct CountingLoader {
            calls: RefCell<HashMap<String, usize>>,
        }

        impl ModuleLoader for CountingLoader {
            fn load(&self, module: &str) -> anyhow::Result<Option<Module>> {
                *self
                    .calls
                    .borrow_mut()
                    .entry(module.to_string())
                    .or_insert(0) += 1;
                if module == "net" {
                    Ok(Some(Module::new("net").with_types(vec![alias(
                        "Port",
                        TypeRef::plain("uint32"),
                    )])))
                } else {
                    Ok(None)
                }
            }
        }

        let modules = set(vec![
            alias("A", TypeRef::qualified("net", "Port")),
            alias("B", TypeRef::qualified("net", "Port")),
            alias("C", TypeRef::qualified("ghost", "T")),
            alias("D", TypeRef::qualified("ghost", "T")),
        ]);
        let loader = CountingLoader {
            calls: RefCell::new(HashMap::new()),
        };
        let mut resolver = Resolver::new(&modules, &loader);
        let mut diags = Diagnostics::new();

        for name in ["A", "B", "C", "D"] {
            resolver.resolve(name, "core", &mut diags);
        }

        // One load per module, including the one that does not exist.
        let calls = loader.calls.borrow();
        assert_eq!(calls["net"], 1);
        assert_eq!(calls["ghost"], 1);
    }

    #[test]
    fn test_unloadable_module_degrades_to_record() {
        let modules = set(vec![alias("Remote", TypeRef::qualified("missing", "T"))]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Remote", "core", &mut diags),
            CanonicalKind::Record("Remote".into())
        );
        assert_eq!(diags.warning_count(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_multi_hop_alias_degrades_to_record() {
        let modules = set(vec![alias("Remote", TypeRef::qualified("one", "T"))]);
        let mut loader = InMemoryLoader::new();
        loader.insert(
            Module::new("one").with_types(vec![alias("T", TypeRef::qualified("two", "U"))]),
        );
        loader.insert(
            Module::new("two").with_types(vec![alias("U", TypeRef::plain("uint32"))]),
        );
        let mut resolver = Resolver::new(&modules, &loader);
        let mut diags = Diagnostics::new();

        assert_eq!(
            resolver.resolve("Remote", "core", &mut diags),
            CanonicalKind::Record("Remote".into())
        );
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_ref_is_byte_follows_aliases() {
        let modules = set(vec![alias("Octet", TypeRef::plain("byte"))]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        assert!(resolver.ref_is_byte(&TypeRef::plain("Octet"), "core", &mut diags));
        assert!(!resolver.ref_is_byte(&TypeRef::plain("uint32"), "core", &mut diags));
    }

    #[test]
    fn test_resolve_ref_collapses_declared_byte_arrays() {
        let modules = set(vec![alias("Octet", TypeRef::plain("byte"))]);
        let mut resolver = Resolver::new(&modules, &NullLoader);
        let mut diags = Diagnostics::new();

        let fixed = resolver.resolve_ref(
            &TypeRef::plain("Octet").shaped(TypeShape::Array(16)),
            "core",
            &mut diags,
        );
        assert_eq!(fixed, ResolvedType::scalar(CanonicalKind::FixedBytes(16)));

        let variable = resolver.resolve_ref(
            &TypeRef::plain("byte").shaped(TypeShape::Slice),
            "core",
            &mut diags,
        );
        assert_eq!(variable, ResolvedType::scalar(CanonicalKind::VariableBytes));
    }
}
