//! Cloud metadata acquisition.
//!
//! A snapshot is fetched once at startup with bounded retry: the first
//! attempt is immediate, then one attempt per poll interval until the
//! overall timeout. An attempt succeeds only if every required document is
//! retrieved and decoded; the physical host topology is optional.

use crate::error::{CloudError, Result};
use crate::gce::{GceInstance, GpuDirectSupport, NetworkInterface};
use crate::provider::{CloudInstance, CloudProvider};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, instrument, warn};

/// Default GCE metadata server base URL.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal/computeMetadata/v1";

pub const PATH_INSTANCE_NAME: &str = "instance/name";
pub const PATH_MACHINE_TYPE: &str = "instance/machine-type";
pub const PATH_NETWORK_INTERFACES: &str = "instance/network-interfaces/?recursive=true&alt=json";
pub const PATH_PHYSICAL_HOST: &str = "instance/attributes/physical_host";

/// Read access to a metadata server, addressed by relative path.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn get(&self, path: &str) -> Result<String>;
}

/// Metadata client speaking HTTP to the GCE metadata server.
#[derive(Debug, Clone)]
pub struct HttpMetadataClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMetadataClient {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| CloudError::Http {
                path: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.endpoint, path);
        let http_err = |source| CloudError::Http {
            path: path.to_string(),
            source,
        };
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let body = response.text().await.map_err(http_err)?;
        Ok(body.trim().to_string())
    }
}

/// Shortest delay between attempts; smaller poll intervals are raised to it.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Retry cadence for snapshot acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Final segment of a `/`-separated path, `path.Base` style.
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// One acquisition attempt; any required failure fails the attempt.
async fn try_fetch_gce<C: MetadataClient + ?Sized>(client: &C) -> Result<GceInstance> {
    let name = client.get(PATH_INSTANCE_NAME).await?;
    let machine_type = base_name(&client.get(PATH_MACHINE_TYPE).await?).to_string();

    let raw_interfaces = client.get(PATH_NETWORK_INTERFACES).await?;
    let interfaces: Vec<NetworkInterface> =
        serde_json::from_str(&raw_interfaces).map_err(|source| CloudError::Decode {
            path: PATH_NETWORK_INTERFACES.to_string(),
            source,
        })?;

    let topology = match client.get(PATH_PHYSICAL_HOST).await {
        Ok(host) if !host.is_empty() => Some(host),
        Ok(_) => None,
        Err(e) => {
            warn!(
                instance = %name,
                error = %e,
                "Failed to retrieve physical host; not all VM types have it populated"
            );
            None
        }
    };

    Ok(GceInstance {
        accelerator_protocol: GpuDirectSupport::for_machine_type(&machine_type),
        name,
        machine_type,
        interfaces,
        topology,
    })
}

/// Acquire a GCE snapshot, retrying per `policy`.
#[instrument(skip(client))]
pub async fn fetch_gce_instance<C: MetadataClient + ?Sized>(
    client: &C,
    policy: &FetchPolicy,
) -> Result<GceInstance> {
    let mut last_error = String::from("no attempt completed");
    let mut attempt: u32 = 0;

    let outcome = timeout(policy.timeout, async {
        let mut ticker = interval(policy.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            attempt += 1;
            match try_fetch_gce(client).await {
                Ok(instance) => return instance,
                Err(e) => {
                    info!(attempt, error = %e, "Could not get instance metadata, retrying");
                    last_error = e.to_string();
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(instance) => {
            info!(
                instance = %instance.name,
                machine_type = %instance.machine_type,
                interfaces = instance.interfaces.len(),
                attempts = attempt,
                "Acquired instance metadata"
            );
            Ok(instance)
        }
        Err(_) => Err(CloudError::Timeout {
            after: policy.timeout,
            last_error,
        }),
    }
}

/// Acquire the snapshot for `provider`.
pub async fn get_instance<C: MetadataClient + ?Sized>(
    provider: CloudProvider,
    client: &C,
    policy: &FetchPolicy,
) -> Result<Box<dyn CloudInstance>> {
    match provider {
        CloudProvider::Gce => Ok(Box::new(fetch_gce_instance(client, policy).await?)),
        other => Err(CloudError::Unsupported(other)),
    }
}
