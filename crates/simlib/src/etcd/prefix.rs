use crate::etcd::config::Config;

/// Prefix under which the pods of a namespace are written.  Keys are pod
/// names, values are pod resources.
pub fn pods(config: &Config, namespace: &str) -> String {
    format!("{prefix}/pods/{namespace}/", prefix = config.prefix)
}
