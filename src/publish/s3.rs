use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::CalendarWriter;
use crate::config::TransportMode;

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Uploads calendars to `s3://<bucket>/<prefix><mode>/<file>`.
pub struct S3Writer {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3Writer {
    /// Creates a writer using the ambient AWS configuration (env vars,
    /// instance profile, etc.).
    pub async fn from_env(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    fn key(&self, mode: TransportMode, file_name: &str) -> String {
        format!("{}{}/{}", self.prefix, mode, file_name)
    }
}

#[async_trait]
impl CalendarWriter for S3Writer {
    async fn write(&self, mode: TransportMode, file_name: &str, body: &[u8]) -> Result<()> {
        let key = self.key(mode, file_name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body.to_vec()))
            .content_type(CALENDAR_CONTENT_TYPE)
            .send()
            .await
            .with_context(|| format!("S3 PutObject failed for s3://{}/{}", self.bucket, key))?;
        debug!(bucket = %self.bucket, key, "Uploaded calendar");
        Ok(())
    }
}
