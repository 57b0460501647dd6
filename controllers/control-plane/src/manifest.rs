//! Seed manifests.
//!
//! A manifest is a multi-document YAML file of objects tagged by `kind`,
//! applied once at startup like `kubectl apply -f` would.

use crate::error::ControllerError;
use objects::Object;
use serde::Deserialize;
use std::path::Path;
use store::ObjectStore;
use tracing::info;

/// Parse every document in `yaml`. Empty documents are skipped.
pub fn parse_manifest(yaml: &str) -> Result<Vec<Object>, ControllerError> {
    let mut objects = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(yaml).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| ControllerError::Manifest(format!("document {index}: {e}")))?;
        if value.is_null() {
            continue;
        }
        let object: Object = serde_yaml::from_value(value)
            .map_err(|e| ControllerError::Manifest(format!("document {index}: {e}")))?;
        objects.push(object);
    }
    Ok(objects)
}

/// Create or update every object in `objects`, in order.
///
/// Existing objects are overwritten at their current version, so applying
/// the same manifest twice is a no-op apart from version bumps.
pub async fn apply_objects(store: &dyn ObjectStore, objects: Vec<Object>) -> Result<usize, ControllerError> {
    let mut applied = 0;
    for mut object in objects {
        let meta = object.meta();
        let current = store.get(object.kind(), &meta.namespace, &meta.name).await;
        let expected = match current {
            Some(current) => {
                // Keep the store-owned fields of the live object.
                let live = current.meta();
                let (uid, version) = (live.uid.clone(), live.resource_version);
                let meta = object.meta_mut();
                meta.uid = uid;
                meta.resource_version = version;
                version
            }
            None => 0,
        };
        let stored = store.apply(object, expected).await?;
        info!("Applied {}", stored.key());
        applied += 1;
    }
    Ok(applied)
}

/// Read `path` and apply everything in it.
pub async fn apply_manifest(store: &dyn ObjectStore, path: &Path) -> Result<usize, ControllerError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ControllerError::Manifest(format!("{}: {e}", path.display())))?;
    let objects = parse_manifest(&yaml)?;
    apply_objects(store, objects).await
}
