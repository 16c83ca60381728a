use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shared::domain::{Product, ProductId};

use crate::workflow::TryOnWorkflow;

/// Preview stand-in that counts how many times it has been released.
struct CountingPreview {
    releases: Arc<AtomicUsize>,
}

impl CountingPreview {
    fn new(releases: &Arc<AtomicUsize>) -> Self {
        Self {
            releases: Arc::clone(releases),
        }
    }
}

impl Drop for CountingPreview {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn product(id: i64, name: &str) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        image_url: format!("/img/{id}.jpg"),
    }
}

#[test]
fn replacing_the_product_image_releases_the_previous_preview_exactly_once() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();

    workflow.select_image(PathBuf::from("a.png"), Some(CountingPreview::new(&releases)));
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    workflow.select_image(PathBuf::from("b.png"), Some(CountingPreview::new(&releases)));
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    workflow.select_image(PathBuf::from("c.png"), Some(CountingPreview::new(&releases)));
    assert_eq!(releases.load(Ordering::SeqCst), 2);

    drop(workflow);
    assert_eq!(releases.load(Ordering::SeqCst), 3);
}

#[test]
fn selfie_previews_have_an_independent_lifecycle() {
    let product_releases = Arc::new(AtomicUsize::new(0));
    let selfie_releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();

    workflow.select_image(
        PathBuf::from("product.png"),
        Some(CountingPreview::new(&product_releases)),
    );
    workflow.select_selfie(
        PathBuf::from("selfie-a.jpg"),
        Some(CountingPreview::new(&selfie_releases)),
    );
    workflow.select_selfie(
        PathBuf::from("selfie-b.jpg"),
        Some(CountingPreview::new(&selfie_releases)),
    );

    assert_eq!(product_releases.load(Ordering::SeqCst), 0);
    assert_eq!(selfie_releases.load(Ordering::SeqCst), 1);
}

#[test]
fn submit_is_blocked_without_an_image() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    *workflow.product_name_mut() = "Blue Shirt".to_string();

    assert!(!workflow.can_submit_product());
    assert!(workflow.begin_product_submit().is_none());
    assert!(!workflow.is_busy());
}

#[test]
fn submit_is_blocked_with_a_blank_name() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_image(PathBuf::from("shirt.png"), None);
    *workflow.product_name_mut() = "   ".to_string();

    assert!(!workflow.can_submit_product());
    assert!(workflow.begin_product_submit().is_none());
    assert!(!workflow.is_busy());
}

#[test]
fn submit_trims_the_product_name() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_image(PathBuf::from("shirt.png"), None);
    *workflow.product_name_mut() = "  Blue Shirt ".to_string();

    let submission = workflow.begin_product_submit().expect("submission");
    assert_eq!(submission.name, "Blue Shirt");
    assert_eq!(submission.file, PathBuf::from("shirt.png"));
    assert!(workflow.is_busy());
}

#[test]
fn the_busy_flag_serializes_both_flows() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_image(PathBuf::from("shirt.png"), None);
    *workflow.product_name_mut() = "Blue Shirt".to_string();
    workflow.select_product(product(1, "Shirt"));
    workflow.select_selfie(PathBuf::from("selfie.jpg"), None);

    assert!(workflow.begin_product_submit().is_some());

    // Both operations are gated while the upload is in flight.
    assert!(workflow.begin_try_on().is_none());
    assert!(workflow.begin_product_submit().is_none());
    assert!(!workflow.can_process_try_on());

    workflow.product_submit_failed("Upload failed. Please try again.");
    assert!(!workflow.is_busy());
    assert!(workflow.begin_try_on().is_some());
}

#[test]
fn successful_product_submit_clears_the_pending_upload() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();
    workflow.select_image(
        PathBuf::from("shirt.png"),
        Some(CountingPreview::new(&releases)),
    );
    *workflow.product_name_mut() = "Blue Shirt".to_string();

    workflow.begin_product_submit().expect("submission");
    workflow.product_submit_succeeded("/img/9.jpg".to_string());

    assert!(workflow.pending_image().is_none());
    assert_eq!(workflow.product_name(), "");
    assert!(workflow.pending_preview().is_none());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(workflow.uploaded_url(), Some("/img/9.jpg"));
    assert!(!workflow.is_busy());
    assert!(workflow.error().is_none());
}

#[test]
fn failed_product_submit_keeps_the_upload_for_retry() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();
    workflow.select_image(
        PathBuf::from("shirt.png"),
        Some(CountingPreview::new(&releases)),
    );
    *workflow.product_name_mut() = "Blue Shirt".to_string();

    workflow.begin_product_submit().expect("submission");
    workflow.product_submit_failed("Upload failed. Please try again.");

    assert_eq!(workflow.pending_image(), Some(PathBuf::from("shirt.png").as_path()));
    assert_eq!(workflow.product_name(), "Blue Shirt");
    assert!(workflow.pending_preview().is_some());
    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert_eq!(workflow.error(), Some("Upload failed. Please try again."));
    assert!(!workflow.is_busy());
}

#[test]
fn a_new_submit_clears_the_previous_error() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_image(PathBuf::from("shirt.png"), None);
    *workflow.product_name_mut() = "Blue Shirt".to_string();

    workflow.begin_product_submit().expect("submission");
    workflow.product_submit_failed("Upload failed. Please try again.");
    assert!(workflow.error().is_some());

    workflow.begin_product_submit().expect("retry");
    assert!(workflow.error().is_none());
}

#[test]
fn try_on_requires_a_selected_product() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_selfie(PathBuf::from("selfie.jpg"), None);

    assert!(!workflow.can_process_try_on());
    assert!(workflow.begin_try_on().is_none());
    assert!(!workflow.is_busy());
}

#[test]
fn try_on_requires_a_selfie() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_product(product(1, "Shirt"));

    assert!(workflow.begin_try_on().is_none());
    assert!(!workflow.is_busy());
}

#[test]
fn successful_try_on_stores_the_result_and_clears_the_selfie() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();
    workflow.select_product(product(1, "Shirt"));
    workflow.select_selfie(
        PathBuf::from("selfie.jpg"),
        Some(CountingPreview::new(&releases)),
    );

    let submission = workflow.begin_try_on().expect("submission");
    assert_eq!(submission.product_id, ProductId(1));

    workflow.try_on_succeeded("/out/42.jpg".to_string());

    assert_eq!(workflow.result().expect("result").result_url, "/out/42.jpg");
    assert!(workflow.selfie_image().is_none());
    assert!(workflow.selfie_preview().is_none());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(!workflow.is_busy());
    // The product stays selected for another round.
    assert_eq!(workflow.selected_product().map(|p| p.id), Some(ProductId(1)));
}

#[test]
fn failed_try_on_keeps_the_selfie_and_sets_the_error() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();
    workflow.select_product(product(1, "Shirt"));
    workflow.select_selfie(
        PathBuf::from("selfie.jpg"),
        Some(CountingPreview::new(&releases)),
    );

    workflow.begin_try_on().expect("submission");
    workflow.try_on_failed("Image processing failed. Please try again.");

    assert!(workflow.selfie_image().is_some());
    assert!(workflow.selfie_preview().is_some());
    assert_eq!(releases.load(Ordering::SeqCst), 0);
    assert_eq!(
        workflow.error(),
        Some("Image processing failed. Please try again.")
    );
    assert!(!workflow.is_busy());
    assert!(workflow.result().is_none());
}

#[test]
fn a_new_result_overwrites_the_previous_one() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.select_product(product(1, "Shirt"));

    workflow.select_selfie(PathBuf::from("selfie-a.jpg"), None);
    workflow.begin_try_on().expect("submission");
    workflow.try_on_succeeded("/out/1.jpg".to_string());

    workflow.select_selfie(PathBuf::from("selfie-b.jpg"), None);
    workflow.begin_try_on().expect("submission");
    workflow.try_on_succeeded("/out/2.jpg".to_string());

    assert_eq!(workflow.result().expect("result").result_url, "/out/2.jpg");
}

#[test]
fn catalog_refresh_preserves_server_order() {
    let mut workflow: TryOnWorkflow<CountingPreview> = TryOnWorkflow::new();
    workflow.apply_catalog(vec![
        product(3, "Coat"),
        product(1, "Shirt"),
        product(2, "Hat"),
    ]);

    let ids: Vec<i64> = workflow.catalog().iter().map(|p| p.id.0).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn reselecting_a_product_keeps_the_selfie_and_result() {
    let releases = Arc::new(AtomicUsize::new(0));
    let mut workflow = TryOnWorkflow::new();
    workflow.select_product(product(1, "Shirt"));
    workflow.select_selfie(
        PathBuf::from("selfie.jpg"),
        Some(CountingPreview::new(&releases)),
    );
    workflow.begin_try_on().expect("submission");
    workflow.try_on_succeeded("/out/42.jpg".to_string());

    workflow.select_product(product(2, "Hat"));

    assert_eq!(workflow.selected_product().map(|p| p.id), Some(ProductId(2)));
    assert!(workflow.result().is_some());
    // A fresh selfie is still required after the previous one was consumed.
    assert!(workflow.selfie_image().is_none());

    workflow.select_selfie(
        PathBuf::from("selfie-2.jpg"),
        Some(CountingPreview::new(&releases)),
    );
    workflow.select_product(product(1, "Shirt"));
    assert!(workflow.selfie_image().is_some());
}
