//! Pod template hashing and generated names

use crate::pod::PodTemplate;
use sha2::{Digest, Sha256};

/// Label carrying the template hash on ReplicaSets and their Pods.
pub const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

/// Characters of the template hash kept in names and labels.
pub const TEMPLATE_HASH_LEN: usize = 10;
/// Random characters appended by `generate_name`.
pub const POD_NAME_SUFFIX_LEN: usize = 5;

/// Content hash of a pod template.
///
/// SHA-256 over the canonical JSON form (labels are a `BTreeMap`, so the
/// key order is stable), hex encoded, first 10 characters. A template that
/// carries the hash label is hashed without it, so a ReplicaSet's template
/// hashes to the same value as the Deployment template it came from.
#[must_use]
pub fn template_hash(template: &PodTemplate) -> String {
    let mut template = template.clone();
    template.labels.remove(POD_TEMPLATE_HASH_LABEL);

    let mut hasher = Sha256::new();
    // Serializing plain data structs into memory cannot fail.
    if let Ok(bytes) = serde_json::to_vec(&template) {
        hasher.update(&bytes);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(TEMPLATE_HASH_LEN);
    digest
}

/// `<prefix>-<5 random lowercase alphanumerics>`
#[must_use]
pub fn generate_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..POD_NAME_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_short() {
        let template = PodTemplate::new("nginx:1.25").with_label("app", "web");
        let first = template_hash(&template);
        assert_eq!(first.len(), TEMPLATE_HASH_LEN);
        assert_eq!(first, template_hash(&template.clone()));
    }

    #[test]
    fn test_hash_changes_with_image_and_labels() {
        let a = PodTemplate::new("nginx:1.25").with_label("app", "web");
        let b = PodTemplate::new("nginx:1.26").with_label("app", "web");
        let c = PodTemplate::new("nginx:1.25").with_label("app", "api");
        assert_ne!(template_hash(&a), template_hash(&b));
        assert_ne!(template_hash(&a), template_hash(&c));
    }

    #[test]
    fn test_hash_ignores_hash_label() {
        let template = PodTemplate::new("nginx:1.25").with_label("app", "web");
        let hash = template_hash(&template);
        let labelled = template.with_label(POD_TEMPLATE_HASH_LABEL, hash.clone());
        assert_eq!(template_hash(&labelled), hash);
    }

    #[test]
    fn test_generate_name() {
        let name = generate_name("web-abc");
        assert!(name.starts_with("web-abc-"));
        assert_eq!(name.len(), "web-abc-".len() + POD_NAME_SUFFIX_LEN);
        assert!(name["web-abc-".len()..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
