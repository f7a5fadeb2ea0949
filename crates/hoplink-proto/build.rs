fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    tonic_prost_build::compile_protos("proto/shortener/v1/shortener.proto")?;
    tonic_prost_build::compile_protos("proto/resolver/v1/resolver.proto")?;
    tonic_prost_build::compile_protos("proto/analytics/v1/analytics.proto")?;
    Ok(())
}
