//! Concrete implementations of the seams in `crate::traits`.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`StaticCredentials`] / [`NoCredentials`] - fixed authorization header
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::InMemoryCredentials`] - Switchable authorization header

pub mod mock;
pub mod reqwest_http;
pub mod static_credentials;

pub use mock::{InMemoryCredentials, MockHttpClient};
pub use reqwest_http::ReqwestHttpClient;
pub use static_credentials::{NoCredentials, StaticCredentials};
