//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from cosup-core.
//! COS speaks the S3 protocol, so the SDK is simply pointed at the regional
//! COS endpoint.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;

use cosup_core::{Error, ObjectInfo, ObjectStore, Result, StoreConfig};

/// S3 client bound to a single bucket
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from the resolved store configuration
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let endpoint = config.endpoint_url();

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            config.credentials.secret_id.clone(),
            config.credentials.secret_key.clone(),
            None, // session token
            None, // expiry
            "cosup-static-credentials",
        );

        // Build SDK config
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .load()
            .await;

        // COS rejects the streaming checksum trailers newer SDKs send by default
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .request_checksum_calculation(
                aws_sdk_s3::config::RequestChecksumCalculation::WhenRequired,
            )
            .build();

        tracing::debug!(
            bucket = %config.bucket,
            region = %config.region,
            path_style = config.path_style,
            "Using endpoint {endpoint}"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn upload_file(&self, key: &str, source: &Path) -> Result<ObjectInfo> {
        let size = tokio::fs::metadata(source).await?.len();
        let body = ByteStream::from_path(source)
            .await
            .map_err(body_error)?;
        let content_type = guess_content_type(source);

        let response = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(size as i64)
            .content_type(&content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(&self.bucket, e))?;

        let mut info = ObjectInfo::file(key, size);
        info.etag = response.e_tag().map(|etag| etag.trim_matches('"').to_string());
        info.content_type = Some(content_type);

        Ok(info)
    }

    async fn put_empty_object(&self, key: &str) -> Result<ObjectInfo> {
        let response = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(0)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| map_sdk_error(&self.bucket, e))?;

        let mut info = ObjectInfo::dir(key);
        info.etag = response.e_tag().map(|etag| etag.trim_matches('"').to_string());

        Ok(info)
    }
}

/// Content type for a local file, based on its extension
fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn body_error(err: aws_smithy_types::byte_stream::error::Error) -> Error {
    Error::Io(std::io::Error::other(err))
}

fn map_sdk_error<E>(bucket: &str, err: E) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let code = err.code().map(str::to_string);
    classify(bucket, code.as_deref(), DisplayErrorContext(&err).to_string())
}

/// Map a service error code (or, lacking one, the message) onto an error kind
fn classify(bucket: &str, code: Option<&str>, message: String) -> Error {
    let matches = |needle: &str| code == Some(needle) || message.contains(needle);

    if matches("AccessDenied") || matches("InvalidAccessKeyId") || matches("SignatureDoesNotMatch")
    {
        Error::Auth(message)
    } else if matches("NoSuchBucket") {
        Error::NotFound(format!("Bucket not found: {bucket}"))
    } else {
        Error::Network(message)
    }
}
