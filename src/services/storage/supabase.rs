use anyhow::Context;
use async_trait::async_trait;

use super::{ObjectStorage, SignedUpload};

pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    bucket: String,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(project_url: String, service_key: String, bucket: String) -> Self {
        Self {
            base_url: format!("{}/storage/v1", project_url.trim_end_matches('/')),
            service_key,
            bucket,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn create_signed_upload_url(&self, path: &str) -> anyhow::Result<SignedUpload> {
        let url = format!("{}/object/upload/sign/{}/{path}", self.base_url, self.bucket);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .context("failed to call storage API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse storage response")?;

        if !status.is_success() {
            anyhow::bail!("storage API error ({}): {}", status, data);
        }

        // The returned url is relative to the storage root
        let signed = data["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing url in storage response"))?;

        Ok(SignedUpload {
            path: path.to_string(),
            upload_url: format!("{}{signed}", self.base_url),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{path}", self.base_url, self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let storage = SupabaseStorage::new(
            "https://proj.supabase.co".to_string(),
            "key".to_string(),
            "service-images".to_string(),
        );
        assert_eq!(
            storage.public_url("svc-1/abc.png"),
            "https://proj.supabase.co/storage/v1/object/public/service-images/svc-1/abc.png"
        );
    }
}
