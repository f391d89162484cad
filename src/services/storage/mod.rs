pub mod supabase;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SignedUpload {
    pub path: String,
    pub upload_url: String,
}

/// Bucket storage for service images. Clients upload directly to the signed URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn create_signed_upload_url(&self, path: &str) -> anyhow::Result<SignedUpload>;

    fn public_url(&self, path: &str) -> String;
}
