//! Test helpers para idmapper-server.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod client;

pub use assertions::*;
pub use client::{Fixture, TestClient, TestResponse, client, fixture};
