use std::collections::HashMap;
use std::fs;
use std::path::Path;

use arboard::{Clipboard, ImageData};
use client_core::workflow::TryOnWorkflow;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use shared::domain::{Product, ProductId};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiErrorCategory, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

/// Default filename offered by the save-as dialog for a composited image.
const RESULT_DEFAULT_FILENAME: &str = "processed-image.jpg";
/// Largest edge of a decoded display image; bigger sources are downscaled
/// before becoming textures.
const PREVIEW_MAX_DIMENSION: u32 = 1024;
const IMAGE_PICKER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Decoded RGBA pixels ready to become a texture on the UI thread.
#[derive(Clone)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl PreviewImage {
    fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied([self.width, self.height], &self.rgba)
    }
}

/// Owned display texture for a locally picked file. Dropping it frees the
/// texture, so replacing a preview in the workflow releases the old one
/// exactly once.
pub struct TexturePreview {
    texture: TextureHandle,
}

enum RemoteImageState {
    Loading,
    Ready(TextureHandle),
    Failed(String),
}

enum ResultImageState {
    Loading,
    Ready {
        texture: TextureHandle,
        original_bytes: Vec<u8>,
    },
    Failed(String),
}

pub struct StudioApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    workflow: TryOnWorkflow<TexturePreview>,
    product_images: HashMap<ProductId, RemoteImageState>,
    result_image: Option<ResultImageState>,

    fatal_error: Option<String>,
    status: String,
}

impl StudioApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            workflow: TryOnWorkflow::new(),
            product_images: HashMap::new(),
            result_image: None,
            fatal_error: None,
            status: "Loading catalog...".to_string(),
        };
        // The catalog loads once, as soon as the UI is first presented.
        dispatch_backend_command(&app.cmd_tx, BackendCommand::RefreshCatalog, &mut app.status);
        app
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::CatalogLoaded(products) => {
                    self.request_missing_product_images(&products);
                    self.workflow.apply_catalog(products);
                    self.status = format!("{} products in catalog", self.workflow.catalog().len());
                }
                UiEvent::CatalogRefreshFailed { reason } => {
                    // Stays off the error banner; the status line still
                    // explains an empty grid.
                    self.status = format!("Could not load the product catalog: {reason}");
                }
                UiEvent::ProductImageLoaded { product_id, image } => {
                    let texture = ctx.load_texture(
                        format!("product-image:{}", product_id.0),
                        image.to_color_image(),
                        egui::TextureOptions::LINEAR,
                    );
                    self.product_images
                        .insert(product_id, RemoteImageState::Ready(texture));
                }
                UiEvent::ProductImageFailed { product_id, reason } => {
                    self.product_images
                        .insert(product_id, RemoteImageState::Failed(reason));
                }
                UiEvent::ProductCreated { url } => {
                    self.workflow.product_submit_succeeded(url);
                    self.status = "Product uploaded".to_string();
                    // The new product should appear in the grid right away.
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::RefreshCatalog,
                        &mut self.status,
                    );
                }
                UiEvent::TryOnComplete { result_url } => {
                    self.workflow.try_on_succeeded(result_url.clone());
                    self.result_image = Some(ResultImageState::Loading);
                    self.status = "Try-on complete".to_string();
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::FetchResultImage { result_url },
                        &mut self.status,
                    );
                }
                UiEvent::ResultImageLoaded {
                    image,
                    original_bytes,
                } => {
                    let texture = ctx.load_texture(
                        "try-on-result",
                        image.to_color_image(),
                        egui::TextureOptions::LINEAR,
                    );
                    self.result_image = Some(ResultImageState::Ready {
                        texture,
                        original_bytes,
                    });
                }
                UiEvent::ResultImageFailed { reason } => {
                    self.result_image = Some(ResultImageState::Failed(reason));
                }
                UiEvent::Error(err) => {
                    match err.context() {
                        UiErrorContext::CreateProduct => {
                            let banner = err
                                .context()
                                .banner_text()
                                .unwrap_or("Upload failed. Please try again.");
                            self.workflow.product_submit_failed(banner);
                        }
                        UiErrorContext::TryOn => {
                            let banner = err
                                .context()
                                .banner_text()
                                .unwrap_or("Image processing failed. Please try again.");
                            self.workflow.try_on_failed(banner);
                        }
                        UiErrorContext::BackendStartup => {
                            self.fatal_error = Some(err.message().to_string());
                        }
                    }
                    self.status =
                        format!("{} error: {}", err_label(err.category()), err.message());
                }
            }
        }
    }

    fn request_missing_product_images(&mut self, products: &[Product]) {
        for product in products {
            if self.product_images.contains_key(&product.id) {
                continue;
            }
            self.product_images
                .insert(product.id, RemoteImageState::Loading);
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::FetchProductImage {
                    product_id: product.id,
                    image_url: product.image_url.clone(),
                },
                &mut self.status,
            );
        }
    }

    fn show_error_banner(&mut self, ui: &mut egui::Ui) {
        let message = self
            .fatal_error
            .clone()
            .or_else(|| self.workflow.error().map(str::to_string));
        let Some(message) = message else {
            return;
        };

        let mut dismissed = false;
        egui::Frame::NONE
            .fill(egui::Color32::from_rgb(111, 53, 53))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new(&message).color(egui::Color32::WHITE));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Dismiss").clicked() {
                            dismissed = true;
                        }
                    });
                });
            });
        ui.add_space(8.0);

        if dismissed {
            self.fatal_error = None;
            self.workflow.clear_error();
        }
    }

    fn show_upload_card(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let mut pick_image = false;
        let mut submit = false;

        card_frame(ui).show(ui, |ui| {
            ui.strong("Upload a new product");
            ui.add_space(6.0);

            ui.label("Product name");
            ui.add(
                egui::TextEdit::singleline(self.workflow.product_name_mut())
                    .hint_text("Enter product name")
                    .desired_width(f32::INFINITY),
            );
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                if ui.button("Choose image...").clicked() {
                    pick_image = true;
                }
                match self.workflow.pending_image() {
                    Some(path) => {
                        ui.label(file_label(path));
                    }
                    None => {
                        ui.weak("Supported formats: JPG, PNG, GIF");
                    }
                }
            });

            if let Some(preview) = self.workflow.pending_preview() {
                ui.add_space(6.0);
                let size = scaled_size(preview.texture.size_vec2(), 200.0);
                ui.add(egui::Image::new(&preview.texture).fit_to_exact_size(size));
            }

            if let Some(url) = self.workflow.uploaded_url() {
                ui.add_space(4.0);
                ui.small(format!("Last upload stored at {url}"));
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let busy = self.workflow.is_busy();
                let label = if busy { "Uploading..." } else { "Upload product" };
                if ui
                    .add_enabled(self.workflow.can_submit_product(), egui::Button::new(label))
                    .clicked()
                {
                    submit = true;
                }
                if busy {
                    ui.spinner();
                }
            });
        });

        if pick_image {
            self.pick_product_image(ctx);
        }
        if submit {
            self.submit_product();
        }
    }

    fn show_catalog(&mut self, ui: &mut egui::Ui) {
        ui.strong("Select a product");
        ui.add_space(6.0);

        if self.workflow.catalog().is_empty() {
            ui.weak("No products yet. Upload one above.");
            return;
        }

        let mut clicked: Option<Product> = None;
        ui.horizontal_wrapped(|ui| {
            for product in self.workflow.catalog() {
                let selected =
                    self.workflow.selected_product().map(|p| p.id) == Some(product.id);
                let stroke = if selected {
                    egui::Stroke::new(2.0, ui.visuals().selection.bg_fill)
                } else {
                    egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
                };

                let card = ui.push_id(product.id.0, |ui| {
                    egui::Frame::NONE
                        .fill(ui.visuals().faint_bg_color)
                        .stroke(stroke)
                        .corner_radius(8.0)
                        .inner_margin(egui::Margin::symmetric(8, 8))
                        .show(ui, |ui| {
                            ui.set_width(164.0);
                            ui.vertical_centered(|ui| {
                                match self.product_images.get(&product.id) {
                                    Some(RemoteImageState::Ready(texture)) => {
                                        let size = scaled_size(texture.size_vec2(), 148.0);
                                        ui.add(
                                            egui::Image::new(texture).fit_to_exact_size(size),
                                        );
                                    }
                                    Some(RemoteImageState::Loading) => {
                                        ui.add_space(60.0);
                                        ui.spinner();
                                        ui.add_space(60.0);
                                    }
                                    Some(RemoteImageState::Failed(_)) | None => {
                                        ui.add_space(60.0);
                                        ui.weak("image unavailable");
                                        ui.add_space(60.0);
                                    }
                                }
                                ui.add_space(4.0);
                                ui.label(egui::RichText::new(&product.name).strong());
                            });
                        })
                });

                let response = card.response.interact(egui::Sense::click());
                if response.clicked() {
                    clicked = Some(product.clone());
                }
            }
        });

        if let Some(product) = clicked {
            self.workflow.select_product(product);
        }
    }

    fn show_selfie_card(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Some(product) = self.workflow.selected_product().cloned() else {
            return;
        };

        let mut pick_selfie = false;
        let mut process = false;

        card_frame(ui).show(ui, |ui| {
            ui.strong("Upload your photo");
            ui.add_space(4.0);
            ui.label(format!("Selected product: {}", product.name));
            if let Some(RemoteImageState::Ready(texture)) = self.product_images.get(&product.id) {
                let size = scaled_size(texture.size_vec2(), 100.0);
                ui.add(egui::Image::new(texture).fit_to_exact_size(size));
            }
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                if ui.button("Choose photo...").clicked() {
                    pick_selfie = true;
                }
                match self.workflow.selfie_image() {
                    Some(path) => {
                        ui.label(file_label(path));
                    }
                    None => {
                        ui.weak("Supported formats: JPG, PNG");
                    }
                }
            });

            if let Some(preview) = self.workflow.selfie_preview() {
                ui.add_space(6.0);
                let size = scaled_size(preview.texture.size_vec2(), 200.0);
                ui.add(egui::Image::new(&preview.texture).fit_to_exact_size(size));
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let busy = self.workflow.is_busy();
                let label = if busy { "Processing..." } else { "Process image" };
                if ui
                    .add_enabled(
                        self.workflow.can_process_try_on(),
                        egui::Button::new(label),
                    )
                    .clicked()
                {
                    process = true;
                }
                if busy {
                    ui.spinner();
                }
            });
        });

        if pick_selfie {
            self.pick_selfie(ctx);
        }
        if process {
            self.process_try_on();
        }
    }

    fn show_result_card(&mut self, ui: &mut egui::Ui) {
        let mut save = false;
        let mut copy = false;

        card_frame(ui).show(ui, |ui| {
            ui.strong("Processed result");
            ui.add_space(6.0);
            match &self.result_image {
                Some(ResultImageState::Loading) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Fetching the composited image...");
                    });
                }
                Some(ResultImageState::Ready { texture, .. }) => {
                    let size = scaled_size(texture.size_vec2(), 400.0);
                    ui.add(egui::Image::new(texture).fit_to_exact_size(size));
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("Save image").clicked() {
                            save = true;
                        }
                        if ui.button("Copy image").clicked() {
                            copy = true;
                        }
                    });
                }
                Some(ResultImageState::Failed(reason)) => {
                    ui.label(format!("Could not display the result: {reason}"));
                    if let Some(result) = self.workflow.result() {
                        ui.small(&result.result_url);
                    }
                }
                None => {}
            }
        });

        if save {
            self.save_result_image();
        }
        if copy {
            self.copy_result_image();
        }
    }

    fn pick_product_image(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_PICKER_EXTENSIONS)
            .pick_file()
        {
            let preview = load_preview_texture(ctx, &path);
            self.workflow.select_image(path, preview);
        }
    }

    fn pick_selfie(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_PICKER_EXTENSIONS)
            .pick_file()
        {
            let preview = load_preview_texture(ctx, &path);
            self.workflow.select_selfie(path, preview);
        }
    }

    fn submit_product(&mut self) {
        // begin_product_submit is the gate: None means no request goes out.
        let Some(submission) = self.workflow.begin_product_submit() else {
            return;
        };
        let queued = dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::CreateProduct {
                name: submission.name,
                image_path: submission.file,
            },
            &mut self.status,
        );
        if !queued {
            self.workflow
                .product_submit_failed("Upload failed. Please try again.");
        }
    }

    fn process_try_on(&mut self) {
        let Some(submission) = self.workflow.begin_try_on() else {
            return;
        };
        let queued = dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::TryOn {
                product_id: submission.product_id,
                selfie_path: submission.file,
            },
            &mut self.status,
        );
        if !queued {
            self.workflow
                .try_on_failed("Image processing failed. Please try again.");
        }
    }

    /// Writes the already-fetched composite to disk. No network is
    /// involved, and without a result this is a no-op.
    fn save_result_image(&mut self) {
        let Some(ResultImageState::Ready { original_bytes, .. }) = &self.result_image else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(RESULT_DEFAULT_FILENAME)
            .save_file()
        {
            match fs::write(&path, original_bytes) {
                Ok(()) => {
                    self.status = format!("Saved image to {}", path.display());
                }
                Err(err) => {
                    self.status = format!("Failed to save image: {err}");
                }
            }
        }
    }

    fn copy_result_image(&mut self) {
        let Some(ResultImageState::Ready { original_bytes, .. }) = &self.result_image else {
            return;
        };
        match decode_image_for_clipboard(original_bytes)
            .and_then(|(rgba, width, height)| write_clipboard_image(&rgba, width, height))
        {
            Ok(()) => self.status = "Copied result image to clipboard".to_string(),
            Err(err) => self.status = format!("Failed to copy image: {err}"),
        }
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Try-On Studio");
                        ui.weak("Upload products and preview them on your own photo.");
                    });
                    ui.add_space(10.0);

                    self.show_error_banner(ui);
                    self.show_upload_card(ui, ctx);
                    ui.add_space(12.0);
                    self.show_catalog(ui);
                    if self.workflow.selected_product().is_some() {
                        ui.add_space(12.0);
                        self.show_selfie_card(ui, ctx);
                    }
                    if self.workflow.result().is_some() {
                        ui.add_space(12.0);
                        self.show_result_card(ui);
                    }

                    ui.add_space(12.0);
                    ui.separator();
                    ui.horizontal(|ui| {
                        ui.small("Status:");
                        ui.small(egui::RichText::new(&self.status).weak());
                    });
                });
        });
    }
}

fn card_frame(ui: &egui::Ui) -> egui::Frame {
    egui::Frame::NONE
        .fill(ui.visuals().faint_bg_color)
        .stroke(egui::Stroke::new(
            1.0,
            ui.visuals().widgets.noninteractive.bg_stroke.color,
        ))
        .corner_radius(10.0)
        .inner_margin(egui::Margin::symmetric(14, 12))
}

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

fn scaled_size(size: egui::Vec2, max_edge: f32) -> egui::Vec2 {
    let longest = size.x.max(size.y).max(1.0);
    size * (max_edge / longest).min(1.0)
}

fn file_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    format!("{name} ({})", human_readable_bytes(size))
}

fn load_preview_texture(ctx: &egui::Context, path: &Path) -> Option<TexturePreview> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("failed to read picked file {}: {err}", path.display());
            return None;
        }
    };
    let image = match decode_preview_image(&bytes) {
        Ok(image) => image,
        Err(err) => {
            // The file is still accepted for upload; the server has the
            // final say on whether it is a usable image.
            tracing::warn!("failed to decode picked file {}: {err}", path.display());
            return None;
        }
    };
    let texture = ctx.load_texture(
        format!("file-preview:{}", path.display()),
        image.to_color_image(),
        egui::TextureOptions::LINEAR,
    );
    Some(TexturePreview { texture })
}

pub fn decode_preview_image(bytes: &[u8]) -> Result<PreviewImage, String> {
    let dynamic = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let resized = dynamic
        .thumbnail(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION)
        .to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}

fn decode_image_for_clipboard(bytes: &[u8]) -> Result<(Vec<u8>, usize, usize), String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    Ok((
        rgba.as_raw().to_vec(),
        rgba.width() as usize,
        rgba.height() as usize,
    ))
}

fn write_clipboard_image(rgba: &[u8], width: usize, height: usize) -> Result<(), String> {
    let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
    clipboard
        .set_image(ImageData {
            width,
            height,
            bytes: std::borrow::Cow::Owned(rgba.to_vec()),
        })
        .map_err(|err| err.to_string())
}

fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

#[cfg(test)]
mod tests {
    use super::{decode_preview_image, human_readable_bytes, scaled_size};

    #[test]
    fn formats_file_sizes_readably() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn rejects_undecodable_preview_bytes() {
        assert!(decode_preview_image(b"definitely not an image").is_err());
    }

    #[test]
    fn display_scaling_never_upscales() {
        let size = scaled_size(egui::vec2(100.0, 50.0), 400.0);
        assert_eq!(size, egui::vec2(100.0, 50.0));

        let size = scaled_size(egui::vec2(800.0, 400.0), 400.0);
        assert_eq!(size, egui::vec2(400.0, 200.0));
    }
}
