//! Test Helper Utilities
//!
//! Shared utilities for testing tunehub-api
#![allow(dead_code)]

pub mod audio_generator;
pub mod test_app;

pub use audio_generator::{
    generate_test_wav, image_bytes, sized_image_bytes, tagged_wav_bytes, wav_bytes, AudioConfig,
};
pub use test_app::{MultipartBody, TestApp};

use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;
use serde_json::Value;

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
