//! Backend commands queued from UI to backend worker.

use shared::domain::ProductId;
use std::path::PathBuf;

pub enum BackendCommand {
    RefreshCatalog,
    FetchProductImage {
        product_id: ProductId,
        image_url: String,
    },
    CreateProduct {
        name: String,
        image_path: PathBuf,
    },
    TryOn {
        product_id: ProductId,
        selfie_path: PathBuf,
    },
    FetchResultImage {
        result_url: String,
    },
}
