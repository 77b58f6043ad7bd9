//! Shared AWS SDK configuration.

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_types::region::Region;
use aws_types::SdkConfig;
use tracing::info;

use crate::config::AwsConfig;

/// Load the SDK config every service client is built from.
///
/// Static credentials from the config take precedence over the default
/// provider chain (local dev / explicit config). The endpoint override is
/// only applied when `AWS_ENDPOINT_URL` is set, e.g. for LocalStack.
pub async fn sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(aws.region.clone()));

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "reminder-static",
        );
        loader = loader.credentials_provider(creds);
    }

    if let Some(endpoint) = aws.endpoint() {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk = loader.load().await;
    info!(
        region = %aws.region,
        static_credentials = aws.has_static_credentials(),
        endpoint_override = aws.endpoint_url.is_some(),
        "AWS SDK config loaded"
    );
    sdk
}
