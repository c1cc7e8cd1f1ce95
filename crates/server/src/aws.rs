//! Shared AWS SDK configuration for the S3, Rekognition and SQS clients.

use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use tokio::sync::OnceCell;
use whoisit_core::config::{AwsConfig, ImagesConfig};

/// Lazily initializes the AWS default credentials chain on first signed request.
///
/// Building the chain probes the environment, profile files and instance metadata,
/// so it is deferred until a client actually needs credentials.
#[derive(Debug)]
struct LazyDefaultCredentialsProvider {
    region: String,
    chain: OnceCell<DefaultCredentialsChain>,
}

impl LazyDefaultCredentialsProvider {
    fn new(region: String) -> Self {
        Self {
            region,
            chain: OnceCell::new(),
        }
    }

    async fn chain(&self) -> &DefaultCredentialsChain {
        self.chain
            .get_or_init(|| async {
                DefaultCredentialsChain::builder()
                    .region(Region::new(self.region.clone()))
                    .build()
                    .await
            })
            .await
    }

    async fn credentials(&self) -> aws_credential_types::provider::Result {
        self.chain()
            .await
            .provide_credentials()
            .await
            .map_err(|err| {
                CredentialsError::provider_error(format!(
                    "default AWS credentials resolution failed: {err}"
                ))
            })
    }
}

impl ProvideCredentials for LazyDefaultCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        ProvideCredentialsFuture::new(self.credentials())
    }
}

/// Prepend `http://` to bare `host:port` endpoints such as `localstack:4566`.
fn normalize_endpoint(endpoint: &str) -> String {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

/// Build the configuration every AWS client in the process is created from.
///
/// The region is the images region. Explicit credentials win over the default chain.
pub fn sdk_config(images: &ImagesConfig, aws: &AwsConfig) -> SdkConfig {
    let credentials = match (&aws.access_key_id, &aws.secret_access_key) {
        (Some(key_id), Some(secret)) => SharedCredentialsProvider::new(Credentials::new(
            key_id,
            secret,
            None,
            None,
            "whoisit-config",
        )),
        _ => SharedCredentialsProvider::new(LazyDefaultCredentialsProvider::new(
            images.region.clone(),
        )),
    };

    let mut builder = SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(images.region.clone()))
        .credentials_provider(credentials);

    if let Some(endpoint) = &aws.endpoint {
        builder = builder.endpoint_url(normalize_endpoint(endpoint));
    }

    builder.build()
}
