//! Backend worker: owns the tokio runtime and the API client, turning
//! queued commands into HTTP calls and completion events for the UI.

use std::path::Path;
use std::thread;

use anyhow::Context as _;
use client_core::{ApiClient, ImageUpload};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::ui::app::decode_preview_image;

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match ApiClient::new(&server_url) {
                Ok(client) => client,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err}"),
                    )));
                    tracing::error!("failed to build api client: {err}");
                    return;
                }
            };

            tracing::info!(server_url = client.server_url(), "backend worker ready");
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
            while let Ok(cmd) = cmd_rx.recv() {
                handle_command(&client, &ui_tx, cmd).await;
            }
        });
    });
}

async fn handle_command(client: &ApiClient, ui_tx: &Sender<UiEvent>, cmd: BackendCommand) {
    match cmd {
        BackendCommand::RefreshCatalog => {
            tracing::info!("backend: refresh_catalog");
            match client.list_products().await {
                Ok(products) => {
                    let _ = ui_tx.try_send(UiEvent::CatalogLoaded(products));
                }
                Err(err) => {
                    // Diagnostic only: the prior catalog stays on screen and
                    // the error banner is reserved for submissions.
                    tracing::warn!("backend: refresh_catalog failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::CatalogRefreshFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }
        BackendCommand::FetchProductImage {
            product_id,
            image_url,
        } => match client.fetch_image_bytes(&image_url).await {
            Ok(bytes) => match decode_preview_image(&bytes) {
                Ok(image) => {
                    let _ = ui_tx.try_send(UiEvent::ProductImageLoaded { product_id, image });
                }
                Err(reason) => {
                    let _ = ui_tx.try_send(UiEvent::ProductImageFailed { product_id, reason });
                }
            },
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::ProductImageFailed {
                    product_id,
                    reason: err.to_string(),
                });
            }
        },
        BackendCommand::CreateProduct { name, image_path } => {
            tracing::info!(name = %name, "backend: create_product");
            let result = match read_upload(&image_path).await {
                Ok(upload) => client.create_product(&name, upload).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(response) => {
                    let _ = ui_tx.try_send(UiEvent::ProductCreated { url: response.url });
                }
                Err(err) => {
                    tracing::error!("backend: create_product failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::CreateProduct,
                        err.to_string(),
                    )));
                }
            }
        }
        BackendCommand::TryOn {
            product_id,
            selfie_path,
        } => {
            tracing::info!(product_id = product_id.0, "backend: try_on");
            let result = match read_upload(&selfie_path).await {
                Ok(upload) => client.try_on(product_id, upload).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(response) => {
                    let _ = ui_tx.try_send(UiEvent::TryOnComplete {
                        result_url: response.result_url,
                    });
                }
                Err(err) => {
                    tracing::error!("backend: try_on failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::TryOn,
                        err.to_string(),
                    )));
                }
            }
        }
        BackendCommand::FetchResultImage { result_url } => {
            match client.fetch_image_bytes(&result_url).await {
                Ok(bytes) => match decode_preview_image(&bytes) {
                    Ok(image) => {
                        let _ = ui_tx.try_send(UiEvent::ResultImageLoaded {
                            image,
                            original_bytes: bytes,
                        });
                    }
                    Err(reason) => {
                        let _ = ui_tx.try_send(UiEvent::ResultImageFailed { reason });
                    }
                },
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::ResultImageFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}

async fn read_upload(path: &Path) -> anyhow::Result<ImageUpload> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.bin")
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mime_type = mime_guess::from_path(path).first_raw().map(str::to_string);
    Ok(ImageUpload {
        filename,
        mime_type,
        bytes,
    })
}
