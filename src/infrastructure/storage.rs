use crate::services::uploads::UploadStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(
    upload_folder: &Path,
    max_file_size: usize,
) -> anyhow::Result<Arc<UploadStore>> {
    info!("🗂️  Upload Storage: {}", upload_folder.display());

    tokio::fs::create_dir_all(upload_folder).await?;

    Ok(Arc::new(UploadStore::new(upload_folder, max_file_size)))
}
