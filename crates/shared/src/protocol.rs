//! Wire contract for the external product/media API.

use serde::{Deserialize, Serialize};

/// Multipart field names, shared between the client and test servers.
pub const FIELD_IMAGE: &str = "image";
pub const FIELD_NAME: &str = "name";
pub const FIELD_SELFIE: &str = "selfie";
pub const FIELD_PRODUCT_ID: &str = "productId";

/// Response to `POST /products`: the stored location of the uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductResponse {
    pub url: String,
}

/// Response to `POST /products/try-on`: a reference to the composited image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnResponse {
    pub result_url: String,
}
