use std::net::SocketAddr;
use std::time::Duration;
use tonic::transport;

use crate::error::Error;
use crate::etcd::pb::etcdserverpb::kv_client::KvClient;

#[derive(Clone, Debug, clap::Args)]
pub struct Config {
    /// etcd gRPC endpoints
    #[clap(
        long = "etcd-hosts",
        value_parser,
        value_delimiter = ',',
        default_value = "127.0.0.1:2379",
        env = "ETCD_HOSTS"
    )]
    pub hosts: Vec<SocketAddr>,

    /// Timeout (in seconds) for connecting to etcd
    #[clap(
        long = "etcd-connect-timeout",
        value_parser = |secs: &str| secs.parse().map(Duration::from_secs),
        default_value = "2",
        env = "ETCD_CONNECT_TIMEOUT",
    )]
    pub connect_timeout: Duration,

    /// Prefix to store etcd keys under.
    #[clap(long = "etcd-prefix", default_value = "/registry", env = "ETCD_PREFIX")]
    pub prefix: String,
}

impl Config {
    /// Connect to etcd by trying each host in turn
    pub async fn connect(&self) -> Result<transport::Channel, Error> {
        let mut last_error = None;
        for addr in &self.hosts {
            let endpoint = match transport::Endpoint::new(format!("http://{addr}")) {
                Ok(endpoint) => endpoint,
                Err(error) => {
                    tracing::warn!(?addr, ?error, "could not connect to etcd endpoint");
                    last_error = Some(error);
                    continue;
                }
            };

            match endpoint
                .connect_timeout(self.connect_timeout)
                .connect()
                .await
            {
                Ok(channel) => return Ok(channel),
                Err(error) => {
                    tracing::warn!(?addr, ?error, "could not connect to etcd endpoint");
                    last_error = Some(error);
                }
            }
        }

        tracing::error!("connection to all etcd hosts has failed");
        match last_error {
            Some(error) => Err(error.into()),
            None => Err(Error::Config("no etcd hosts given".to_owned())),
        }
    }

    /// Obtain a kv client by trying each etcd host in turn.
    pub async fn kv_client(&self) -> Result<KvClient<transport::Channel>, Error> {
        let conn = self.connect().await?;
        Ok(KvClient::new(conn))
    }
}
