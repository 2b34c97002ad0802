//! Sourcemap upload unit: one multipart POST per file.
//!
//! Fields sent: `push_api_key`, `app_name`, `revision`, `environment`,
//! `name[]` (logical artifact URL) and `file`. Any non-2xx response is a
//! retryable failure carrying the status and response body.

mod name;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::scheduler::UploadTask;
use crate::transport::{self, FormField, HttpOptions, RequestError};

pub use name::{artifact_name, DEFAULT_URL_PREFIX};

/// Ingestion endpoint used when config does not override it.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://appsignal.com/api/sourcemaps";

pub const FIELD_PUSH_API_KEY: &str = "push_api_key";
pub const FIELD_APP_NAME: &str = "app_name";
pub const FIELD_REVISION: &str = "revision";
pub const FIELD_ENVIRONMENT: &str = "environment";
pub const FIELD_NAME: &str = "name[]";
pub const FIELD_FILE: &str = "file";

/// Uploads sourcemaps for one app, environment and revision.
#[derive(Clone)]
pub struct SourcemapUploader {
    pub endpoint: String,
    pub push_api_key: String,
    pub app_name: String,
    pub environment: String,
    pub url_prefix: String,
    pub revision: String,
    pub http: HttpOptions,
}

impl fmt::Debug for SourcemapUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcemapUploader")
            .field("endpoint", &self.endpoint)
            .field("push_api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("environment", &self.environment)
            .field("url_prefix", &self.url_prefix)
            .field("revision", &self.revision)
            .finish()
    }
}

impl SourcemapUploader {
    /// Task for one sourcemap; the push API key is not part of the metadata
    /// and is only added when the request is built.
    pub fn task_for(&self, path: &Path) -> UploadTask {
        UploadTask::new(path)
            .with_field(FIELD_APP_NAME, self.app_name.as_str())
            .with_field(FIELD_REVISION, self.revision.as_str())
            .with_field(FIELD_ENVIRONMENT, self.environment.as_str())
            .with_field(FIELD_NAME, artifact_name(path, &self.url_prefix))
    }

    pub fn tasks_for(&self, paths: &[PathBuf]) -> Vec<UploadTask> {
        paths.iter().map(|p| self.task_for(p)).collect()
    }

    /// Send one sourcemap. Single attempt; callers wrap it in a retry run.
    pub async fn upload(&self, task: &UploadTask) -> Result<(), RequestError> {
        let path = task.source_path.clone();
        tracing::debug!(path = %path.display(), "starting sourcemap upload");

        let mut fields = Vec::with_capacity(task.metadata.len() + 2);
        fields.push(FormField::Text {
            name: FIELD_PUSH_API_KEY.to_string(),
            value: self.push_api_key.clone(),
        });
        for (name, value) in &task.metadata {
            fields.push(FormField::Text {
                name: name.clone(),
                value: value.clone(),
            });
        }

        let endpoint = self.endpoint.clone();
        let http = self.http;
        let read_path = path.clone();
        let result = transport::run_blocking(move || {
            let data = std::fs::read(&read_path).map_err(RequestError::Io)?;
            let file_name = read_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "sourcemap.map".to_string());
            fields.push(FormField::File {
                name: FIELD_FILE.to_string(),
                file_name,
                content_type: "application/json".to_string(),
                data,
            });
            transport::post_form(&endpoint, fields, http)
        })
        .await;

        match result {
            Ok(resp) => {
                tracing::debug!(
                    path = %path.display(),
                    status = resp.status,
                    name = task.metadata.get(FIELD_NAME).map(String::as_str).unwrap_or(""),
                    "finished sourcemap upload"
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), "uploading sourcemap failed: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader() -> SourcemapUploader {
        SourcemapUploader {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            push_api_key: "secret-key".to_string(),
            app_name: "storefront".to_string(),
            environment: "production".to_string(),
            url_prefix: "https://cdn.example.com/assets/".to_string(),
            revision: "4f2a9c1".to_string(),
            http: HttpOptions::default(),
        }
    }

    #[test]
    fn task_metadata_has_fields_but_not_the_key() {
        let task = uploader().task_for(Path::new("dist/assets/main.js.map"));
        assert_eq!(task.source_path, Path::new("dist/assets/main.js.map"));
        assert_eq!(task.metadata[FIELD_APP_NAME], "storefront");
        assert_eq!(task.metadata[FIELD_REVISION], "4f2a9c1");
        assert_eq!(task.metadata[FIELD_ENVIRONMENT], "production");
        assert_eq!(task.metadata[FIELD_NAME], "https://cdn.example.com/assets/main.js");
        assert!(!task.metadata.contains_key(FIELD_PUSH_API_KEY));
    }

    #[test]
    fn debug_output_redacts_key() {
        let rendered = format!("{:?}", uploader());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn missing_file_is_a_fatal_io_error() {
        use crate::retry::{Classify, FailureKind};

        let dir = tempfile::tempdir().unwrap();
        let up = uploader();
        let task = up.task_for(&dir.path().join("gone.js.map"));
        let err = up.upload(&task).await.unwrap_err();
        assert!(matches!(err, RequestError::Io(_)));
        assert_eq!(err.failure_kind(), FailureKind::Fatal);
    }
}
