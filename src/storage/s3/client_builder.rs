//! AWS S3 client construction from a [`ClientConfig`].
//!
//! Credential resolution order follows the configured [`S3Credentials`]
//! source: a named profile, explicit access keys, or the default
//! environment chain. Region, endpoint URL, path-style addressing, and
//! SDK retry settings are applied on top of the loaded base config.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::retry::RetryConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;

use crate::config::ClientConfig;
use crate::types::S3Credentials;

impl ClientConfig {
    /// Build an S3 client for this configuration.
    pub async fn create_client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        match &self.credential {
            S3Credentials::Profile(profile_name) => {
                loader = loader.profile_name(profile_name);
            }
            S3Credentials::Credentials { access_keys } => {
                let credentials = Credentials::new(
                    access_keys.access_key.clone(),
                    access_keys.secret_access_key.clone(),
                    access_keys.session_token.clone(),
                    None,
                    "s3rb-rs",
                );
                loader = loader.credentials_provider(credentials);
            }
            S3Credentials::FromEnvironment => {}
        }

        let location = &self.client_config_location;
        if location.aws_config_file.is_some() || location.aws_shared_credentials_file.is_some() {
            let mut profile_files = ProfileFiles::builder();
            if let Some(path) = &location.aws_config_file {
                profile_files = profile_files.with_file(ProfileFileKind::Config, path);
            }
            if let Some(path) = &location.aws_shared_credentials_file {
                profile_files = profile_files.with_file(ProfileFileKind::Credentials, path);
            }
            loader = loader.profile_files(profile_files.build());
        }

        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }

        loader = loader.retry_config(
            RetryConfig::standard()
                .with_max_attempts(self.retry_config.aws_max_attempts)
                .with_initial_backoff(Duration::from_millis(
                    self.retry_config.initial_backoff_milliseconds,
                )),
        );

        let sdk_config = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(self.force_path_style);
        if let Some(endpoint_url) = &self.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Client::from_conf(builder.build())
    }
}
