use crate::{
    error::StoreError,
    store::{BlobStore, Namespace, ObjectMeta},
};

/// Most recently modified object; equal timestamps go to the greatest key.
pub fn pick_latest(objects: &[ObjectMeta]) -> Option<&ObjectMeta> {
    objects.iter().max_by(|a, b| {
        a.last_modified.cmp(&b.last_modified).then_with(|| a.key.cmp(&b.key))
    })
}

/// Latest object under `namespace`, or `None` if the namespace is empty.
pub async fn latest_object(
    store: &dyn BlobStore,
    namespace: Namespace,
) -> Result<Option<ObjectMeta>, StoreError> {
    let objects = store.list(namespace.prefix()).await?;
    let latest = pick_latest(&objects).cloned();

    match &latest {
        Some(obj) => {
            tracing::debug!(%namespace, key = %obj.key, candidates = objects.len(), "latest object")
        }
        None => tracing::debug!(%namespace, "namespace is empty"),
    }

    Ok(latest)
}
