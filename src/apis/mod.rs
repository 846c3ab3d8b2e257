//! [`GameApi`](crate::api::GameApi) implementations.
//!
//! | Feature    | Implementation    |
//! |------------|-------------------|
//! | `http-api` | [`HttpGameApi`]   |

#[cfg(feature = "http-api")]
pub mod http;

#[cfg(feature = "http-api")]
pub use http::HttpGameApi;
