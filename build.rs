// Generates the gRPC stubs for the auth and contact services.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/");

    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["proto/auth/v1/auth.proto", "proto/contact/v1/contact.proto"],
            &["proto"],
        )?;
    Ok(())
}
