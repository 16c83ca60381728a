//! HTTP client for the external product/media API.
//!
//! The API itself (storage, compositing) is out of scope for this
//! repository; everything here is request construction and response
//! decoding for the three endpoints the studio UI calls, plus a raw image
//! fetch used to display stored and composited images.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Product, ProductId},
    error::ApiError,
    protocol::{
        CreateProductResponse, TryOnResponse, FIELD_IMAGE, FIELD_NAME, FIELD_PRODUCT_ID,
        FIELD_SELFIE,
    },
};
use tracing::debug;

pub mod workflow;

/// Per-request deadline. A hung call must never leave the UI busy forever,
/// so every request carries one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An image the user picked, read into memory and ready to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn into_part(self) -> Result<multipart::Part> {
        let mime = self
            .mime_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        multipart::Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&mime)
            .context("invalid mime type for upload part")
    }
}

pub struct ApiClient {
    http: Client,
    server_url: String,
}

impl ApiClient {
    pub fn new(server_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, server_url })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Full catalog, in server order.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let response = self
            .http
            .get(format!("{}/products", self.server_url))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn create_product(
        &self,
        name: &str,
        image: ImageUpload,
    ) -> Result<CreateProductResponse> {
        debug!(
            name,
            filename = %image.filename,
            size_bytes = image.bytes.len(),
            "uploading product image"
        );
        let form = multipart::Form::new()
            .part(FIELD_IMAGE, image.into_part()?)
            .text(FIELD_NAME, name.to_string());
        let response = self
            .http
            .post(format!("{}/products", self.server_url))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn try_on(&self, product_id: ProductId, selfie: ImageUpload) -> Result<TryOnResponse> {
        debug!(
            product_id = product_id.0,
            filename = %selfie.filename,
            "requesting try-on composite"
        );
        let form = multipart::Form::new()
            .part(FIELD_SELFIE, selfie.into_part()?)
            .text(FIELD_PRODUCT_ID, product_id.0.to_string());
        let response = self
            .http
            .post(format!("{}/products/try-on", self.server_url))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    /// Raw bytes of a stored image. `url` may be absolute or
    /// server-relative (`/img/1.jpg`), matching what the API hands out.
    pub async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let target = self.absolute_url(url);
        let response = self.http.get(&target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("image fetch from {target} failed with {status}"));
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.server_url, url.trim_start_matches('/'))
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.context("malformed response body");
    }
    let body = response.text().await.unwrap_or_default();
    Err(response_error(status, &body))
}

fn response_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => anyhow!("server rejected request ({status}): {err}"),
        Err(_) => anyhow!("server returned {status}"),
    }
}

#[cfg(test)]
mod tests;
