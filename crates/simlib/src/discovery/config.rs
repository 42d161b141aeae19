use std::time::Duration;
use tonic::transport;

use crate::discovery::pb::aggregated_discovery_service_client::AggregatedDiscoveryServiceClient;
use crate::error::Error;

#[derive(Clone, Debug, clap::Args)]
pub struct Config {
    /// Address of the control plane's plaintext discovery (ADS) endpoint.
    #[clap(
        long = "discovery-address",
        default_value = "127.0.0.1:15010",
        env = "DISCOVERY_ADDRESS"
    )]
    pub address: String,

    /// Timeout (in seconds) for connecting to the discovery endpoint
    #[clap(
        long = "discovery-connect-timeout",
        value_parser = |secs: &str| secs.parse().map(Duration::from_secs),
        default_value = "5",
        env = "DISCOVERY_CONNECT_TIMEOUT",
    )]
    pub connect_timeout: Duration,
}

impl Config {
    /// Open a channel to a discovery endpoint and wrap it in an ADS client.
    pub async fn ads_client(
        &self,
        address: &str,
    ) -> Result<AggregatedDiscoveryServiceClient<transport::Channel>, Error> {
        let channel = transport::Endpoint::new(format!("http://{address}"))?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await?;

        Ok(AggregatedDiscoveryServiceClient::new(channel))
    }
}
