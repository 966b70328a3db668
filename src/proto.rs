//! Generated gRPC types for the downstream services.

pub mod auth {
    tonic::include_proto!("auth.v1");
}

pub mod contact {
    tonic::include_proto!("contact.v1");
}
