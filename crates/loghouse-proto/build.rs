// Build script to compile protobuf files into Rust code.
//
// This runs at compile time and generates Rust structs and trait implementations
// from the .proto files in the proto/ directory.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::compile_protos("proto/log.proto")?;

    Ok(())
}
