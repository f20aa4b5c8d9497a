//! Provider console deep links.

use tracing::error;
use url::Url;

/// Domain of the provider's web console.
pub const CONSOLE_DOMAIN: &str = "aws.amazon.com";

/// Build the console URL for an instance.
///
/// Failure should not happen for real regions and ids; it is logged and
/// reported as `None` rather than propagated.
pub fn instance_url(region: &str, instance_id: &str) -> Option<Url> {
    let raw = format!(
        "https://{region}.console.{CONSOLE_DOMAIN}/ec2/v2/home?region={region}#Instances:instanceId={instance_id}"
    );
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            error!(%region, instance = %instance_id, error = %e, "failed to build console URL");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_instance_deep_link() {
        let url = instance_url("us-west-2", "i-0123456789abcdef0").unwrap();
        assert_eq!(
            url.as_str(),
            "https://us-west-2.console.aws.amazon.com/ec2/v2/home?region=us-west-2#Instances:instanceId=i-0123456789abcdef0"
        );
        assert_eq!(url.host_str(), Some("us-west-2.console.aws.amazon.com"));
        assert_eq!(url.fragment(), Some("Instances:instanceId=i-0123456789abcdef0"));
    }

    #[test]
    fn invalid_region_yields_none() {
        assert!(instance_url("not a region", "i-1").is_none());
    }
}
