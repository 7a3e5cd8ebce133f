//! Fixture crate: the compiler generated from `fixtures/catalog.schema.json`,
//! compiled as ordinary Rust.
pub mod catalog {
    include!(concat!(env!("OUT_DIR"), "/catalog.rs"));
}

/// IDL generated in the same run as [`catalog`].
pub const CATALOG_PROTO: &str = include_str!(concat!(env!("OUT_DIR"), "/catalog.proto"));

/// Source of [`catalog`].
pub const CATALOG_COMPILER: &str = include_str!(concat!(env!("OUT_DIR"), "/catalog.rs"));
