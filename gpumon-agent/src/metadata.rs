//! Instance identity from the EC2 instance metadata service.
//!
//! An IMDSv2 session token is requested first; when the token endpoint is not
//! available the requests are sent without one (IMDSv1).

use std::time::Duration;
use tracing::debug;

use crate::error::MetadataError;
use crate::metrics::InstanceIdentity;

pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

const TOKEN_PATH: &str = "/latest/api/token";
const METADATA_PATH: &str = "/latest/meta-data";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_TTL_SECONDS: &str = "21600";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MetadataClient {
    base_url: String,
    client: reqwest::Client,
}

impl MetadataClient {
    pub fn new(base_url: &str) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(MetadataError::Client)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn resolve_identity(&self) -> Result<InstanceIdentity, MetadataError> {
        let token = self.session_token().await;
        let token = token.as_deref();

        let instance_id = self.get("instance-id", token).await?;
        let image_id = self.get("ami-id", token).await?;
        let instance_type = self.get("instance-type", token).await?;
        let availability_zone = self.get("placement/availability-zone", token).await?;
        let region = region_from_zone(&availability_zone)?;

        Ok(InstanceIdentity {
            instance_id,
            image_id,
            instance_type,
            availability_zone,
            region,
        })
    }

    async fn session_token(&self) -> Option<String> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let response = self
            .client
            .put(&url)
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(token) => Some(token.trim().to_string()),
                Err(e) => {
                    debug!(error = %e, "Unreadable IMDSv2 token, falling back to IMDSv1");
                    None
                }
            },
            Ok(response) => {
                debug!(status = %response.status(), "IMDSv2 token refused, falling back to IMDSv1");
                None
            }
            Err(e) => {
                debug!(error = %e, "IMDSv2 token request failed, falling back to IMDSv1");
                None
            }
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<String, MetadataError> {
        let url = format!("{}{}/{}", self.base_url, METADATA_PATH, path);
        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let request_error = |source| MetadataError::Request {
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                path: path.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(request_error)?;
        Ok(body.trim().to_string())
    }
}

/// `us-east-1b` -> `us-east-1`
pub fn region_from_zone(zone: &str) -> Result<String, MetadataError> {
    let mut chars = zone.chars();
    chars.next_back();
    let region = chars.as_str();
    if region.is_empty() {
        return Err(MetadataError::InvalidZone(zone.to_string()));
    }
    Ok(region.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_drops_zone_letter() {
        assert_eq!(region_from_zone("us-east-1b").unwrap(), "us-east-1");
        assert_eq!(region_from_zone("eu-central-1a").unwrap(), "eu-central-1");
    }

    #[test]
    fn empty_zone_is_rejected() {
        assert!(matches!(
            region_from_zone(""),
            Err(MetadataError::InvalidZone(_))
        ));
        assert!(matches!(
            region_from_zone("a"),
            Err(MetadataError::InvalidZone(_))
        ));
    }
}
