use tonic::Request;

use crate::error::Error;
use crate::etcd;
use crate::etcd::pb::etcdserverpb::{DeleteRangeRequest, PutRequest};

/// Write a key, replacing any existing value.  Returns the revision the write
/// landed at.
pub async fn put(config: &etcd::Config, key: String, value: Vec<u8>) -> Result<i64, Error> {
    let mut kv_client = config.kv_client().await?;
    let response = kv_client
        .put(Request::new(PutRequest {
            key: key.into(),
            value,
            ..Default::default()
        }))
        .await?
        .into_inner();

    match response.header {
        Some(header) => Ok(header.revision),
        None => Err(Error::EtcdResponse("put response has no header".to_owned())),
    }
}

/// Delete a key.  Returns `false` if the key does not exist.
pub async fn delete_if_exists(config: &etcd::Config, key: String) -> Result<bool, Error> {
    let mut kv_client = config.kv_client().await?;
    let response = kv_client
        .delete_range(Request::new(DeleteRangeRequest {
            key: key.into(),
            ..Default::default()
        }))
        .await?
        .into_inner();

    Ok(response.deleted > 0)
}
