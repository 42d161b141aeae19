use tonic_build::manual::{Builder, Method, Service};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::compile_protos("proto/etcdserverpb_rpc.proto")?;
    tonic_build::compile_protos("proto/mvccpb_kv.proto")?;

    // ADS client only: its messages are declared in `discovery::pb`.
    let ads = Service::builder()
        .name("AggregatedDiscoveryService")
        .package("envoy.service.discovery.v3")
        .method(
            Method::builder()
                .name("stream_aggregated_resources")
                .route_name("StreamAggregatedResources")
                .input_type("crate::discovery::pb::DiscoveryRequest")
                .output_type("crate::discovery::pb::DiscoveryResponse")
                .codec_path("tonic::codec::ProstCodec")
                .client_streaming()
                .server_streaming()
                .build(),
        )
        .build();
    Builder::new().build_server(false).compile(&[ads]);

    println!("cargo:rerun-if-changed=proto");
    Ok(())
}
