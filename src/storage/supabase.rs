//! Supabase Storage backend.
//!
//! Upload: `POST {url}/storage/v1/object/{bucket}/{path}` with `x-upsert`.
//! Public URL: `{url}/storage/v1/object/public/{bucket}/{path}`.
//! Signed URL: `POST {url}/storage/v1/object/sign/{bucket}/{path}` with
//! `{"expiresIn": secs}`, answered by `{"signedURL": "/object/sign/…"}`.

use async_trait::async_trait;
use serde::Deserialize;

use super::{check_path, ObjectStorage, StorageError};
use crate::config::StorageConfig;

pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    key: String,
    bucket: String,
    public_urls: bool,
    signed_url_expiry_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    /// Build from config; both `supabase_url` and `supabase_key` must be set.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let base_url = config
            .supabase_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StorageError::NotConfigured("supabase_url is missing".into()))?;
        let key = config
            .supabase_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| StorageError::NotConfigured("supabase_key is missing".into()))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: config.bucket.clone(),
            public_urls: config.public_urls,
            signed_url_expiry_secs: config.signed_url_expiry_secs,
        })
    }

    fn object_url(&self, kind: &str, path: &str) -> String {
        match kind {
            "" => format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path),
            kind => format!(
                "{}/storage/v1/object/{}/{}/{}",
                self.base_url, kind, self.bucket, path
            ),
        }
    }

    async fn signed_url(&self, path: &str) -> Result<String, StorageError> {
        let response = self
            .client
            .post(self.object_url("sign", path))
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .json(&serde_json::json!({ "expiresIn": self.signed_url_expiry_secs }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::SignedUrl(format!("HTTP {status}: {body}")));
        }

        let signed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| StorageError::SignedUrl(e.to_string()))?;

        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        check_path(path)?;

        let response = self
            .client
            .post(self.object_url("", path))
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header("x-upsert", "true")
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload {
                status: status.as_u16(),
                body,
            });
        }

        if self.public_urls {
            Ok(self.object_url("public", path))
        } else {
            self.signed_url(path).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(url: &str, public: bool) -> StorageConfig {
        StorageConfig {
            supabase_url: Some(url.into()),
            supabase_key: Some("service-key".into()),
            public_urls: public,
            ..StorageConfig::default()
        }
    }

    #[test]
    fn requires_url_and_key() {
        let cfg = StorageConfig::default();
        assert!(matches!(
            SupabaseStorage::from_config(&cfg),
            Err(StorageError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn upload_returns_public_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/storage/v1/object/glossa-modules/audio/m/s.mp3")
            .match_header("x-upsert", "true")
            .match_header("content-type", "audio/mpeg")
            .match_header("authorization", "Bearer service-key")
            .match_body(Matcher::Exact("abc".into()))
            .with_status(200)
            .with_body(r#"{"Key":"glossa-modules/audio/m/s.mp3"}"#)
            .create_async()
            .await;

        let storage = SupabaseStorage::from_config(&config(&server.url(), true)).unwrap();
        let url = storage
            .upload("audio/m/s.mp3", b"abc".to_vec(), "audio/mpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/glossa-modules/audio/m/s.mp3",
                server.url()
            )
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_can_return_signed_url() {
        let mut server = Server::new_async().await;
        let _upload = server
            .mock("POST", "/storage/v1/object/glossa-modules/audio/m/s.mp3")
            .with_status(200)
            .create_async()
            .await;
        let sign = server
            .mock("POST", "/storage/v1/object/sign/glossa-modules/audio/m/s.mp3")
            .match_body(Matcher::Json(serde_json::json!({ "expiresIn": 31_536_000 })))
            .with_status(200)
            .with_body(r#"{"signedURL":"/object/sign/glossa-modules/audio/m/s.mp3?token=t"}"#)
            .create_async()
            .await;

        let storage = SupabaseStorage::from_config(&config(&server.url(), false)).unwrap();
        let url = storage
            .upload("audio/m/s.mp3", b"abc".to_vec(), "audio/mpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/sign/glossa-modules/audio/m/s.mp3?token=t",
                server.url()
            )
        );
        sign.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/storage/v1/object/glossa-modules/audio/m/s.mp3")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let storage = SupabaseStorage::from_config(&config(&server.url(), true)).unwrap();
        let err = storage
            .upload("audio/m/s.mp3", vec![1], "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Upload { status: 403, .. }));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever answering.
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut cfg = config(&format!("http://{addr}"), true);
        cfg.timeout_secs = 1;
        let storage = SupabaseStorage::from_config(&cfg).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            storage.upload("audio/m/s.mp3", vec![1], "audio/mpeg"),
        )
        .await
        .expect("upload should give up before the outer deadline");
        assert!(matches!(result, Err(StorageError::Timeout)));
    }
}
