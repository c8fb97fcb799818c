//! Input fingerprinting
//!
//! Computes a content hash over a canonical rendering of the module set.
//! Two runs over the same declarations produce the same fingerprint no
//! matter which order modules or types were collected in, so downstream
//! consumers can skip regeneration when nothing changed.

use sha2::{Digest, Sha256};

use crate::model::{Module, ModuleSet};

/// Compute the canonical SHA-256 fingerprint of a module set.
pub fn fingerprint(modules: &ModuleSet) -> String {
    let mut hasher = Sha256::new();

    let mut sorted: Vec<&Module> = modules.modules().iter().collect();
    sorted.sort_unstable_by(|a, b| a.name.cmp(&b.name));

    for module in sorted {
        hasher.update(module.name.as_bytes());
        hasher.update([0u8]);

        let mut types: Vec<_> = module.types.iter().collect();
        types.sort_unstable_by_key(|t| t.name());
        for decl in types {
            // serde_json emits struct fields in declaration order, so the
            // rendering is stable for a given model version.
            hash_json(&mut hasher, decl);
        }

        let mut constants: Vec<_> = module.constants.iter().collect();
        constants.sort_unstable_by_key(|c| c.name.as_str());
        for constant in constants {
            hash_json(&mut hasher, constant);
        }

        let mut mappings: Vec<_> = module.case_mappings.iter().collect();
        mappings.sort_unstable_by_key(|m| {
            (m.container.clone(), m.constant.clone(), m.payload.clone())
        });
        for mapping in mappings {
            hash_json(&mut hasher, mapping);
        }

        // BTreeSet iterates sorted already.
        for name in &module.manual_codecs {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
    }

    format!("{:x}", hasher.finalize())
}

fn hash_json<T: serde::Serialize>(hasher: &mut Sha256, value: &T) {
    // Serialization of the model cannot fail; every field is a plain
    // string, integer, or collection thereof.
    if let Ok(rendered) = serde_json::to_vec(value) {
        hasher.update(&rendered);
        hasher.update([0u8]);
    }
}
