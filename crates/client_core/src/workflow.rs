//! Client-side state for the upload / try-on screens.
//!
//! `TryOnWorkflow` owns everything the UI displays: the product catalog,
//! the upload being assembled, the selfie submission, the composited
//! result, one shared busy flag and one error slot. Network-triggering
//! operations split into a `begin_*` transition (precondition check, busy
//! latch, payload handoff) and a pair of completion transitions driven by
//! the caller once the request finishes.
//!
//! The type is generic over the preview resource `P` so display previews
//! can be modeled as owned values: replacing or clearing a preview drops
//! it, which is the single guaranteed release on every exit path. The GUI
//! instantiates `P` with a texture wrapper; tests use a drop-counting
//! guard.

use std::path::{Path, PathBuf};

use shared::domain::{Product, ProductId};
use tracing::debug;

/// Transient product upload being assembled by the user. At most one
/// exists at a time; it is discarded wholesale on successful submission.
struct PendingUpload<P> {
    file: Option<PathBuf>,
    name: String,
    preview: Option<P>,
}

impl<P> Default for PendingUpload<P> {
    fn default() -> Self {
        Self {
            file: None,
            name: String::new(),
            preview: None,
        }
    }
}

/// Transient selfie submission for the try-on flow.
struct SelfieSubmission<P> {
    file: Option<PathBuf>,
    preview: Option<P>,
}

impl<P> Default for SelfieSubmission<P> {
    fn default() -> Self {
        Self {
            file: None,
            preview: None,
        }
    }
}

/// Reference to a server-side composited image. Persists until the next
/// try-on request overwrites it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    pub result_url: String,
}

/// Payload handed to the caller by [`TryOnWorkflow::begin_product_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSubmission {
    pub file: PathBuf,
    pub name: String,
}

/// Payload handed to the caller by [`TryOnWorkflow::begin_try_on`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnSubmission {
    pub file: PathBuf,
    pub product_id: ProductId,
}

pub struct TryOnWorkflow<P> {
    catalog: Vec<Product>,
    selected: Option<Product>,
    pending: PendingUpload<P>,
    selfie: SelfieSubmission<P>,
    result: Option<ProcessedResult>,
    uploaded_url: Option<String>,
    busy: bool,
    error: Option<String>,
}

impl<P> Default for TryOnWorkflow<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TryOnWorkflow<P> {
    pub fn new() -> Self {
        Self {
            catalog: Vec::new(),
            selected: None,
            pending: PendingUpload::default(),
            selfie: SelfieSubmission::default(),
            result: None,
            uploaded_url: None,
            busy: false,
            error: None,
        }
    }

    /// Replaces the catalog with the server's list, preserving its order.
    /// A failed refresh never reaches this method, so the prior catalog
    /// stays visible in that case.
    pub fn apply_catalog(&mut self, products: Vec<Product>) {
        debug!(count = products.len(), "catalog refreshed");
        self.catalog = products;
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    /// Replaces the product image selection. The superseded preview (if
    /// any) is dropped here; a failed decode yields `preview: None` while
    /// the file itself is still accepted, as the server has the final say.
    pub fn select_image(&mut self, file: PathBuf, preview: Option<P>) {
        self.pending.file = Some(file);
        self.pending.preview = preview;
    }

    pub fn pending_image(&self) -> Option<&Path> {
        self.pending.file.as_deref()
    }

    pub fn pending_preview(&self) -> Option<&P> {
        self.pending.preview.as_ref()
    }

    pub fn product_name(&self) -> &str {
        &self.pending.name
    }

    /// Mutable name buffer, bound directly to the text input.
    pub fn product_name_mut(&mut self) -> &mut String {
        &mut self.pending.name
    }

    /// Stored location of the most recently uploaded product image.
    pub fn uploaded_url(&self) -> Option<&str> {
        self.uploaded_url.as_deref()
    }

    pub fn can_submit_product(&self) -> bool {
        !self.busy && self.pending.file.is_some() && !self.pending.name.trim().is_empty()
    }

    /// Latches busy and hands back the submission payload, or `None` when
    /// the image is missing, the name is blank, or a request is already in
    /// flight. A `None` here means no request may be issued.
    pub fn begin_product_submit(&mut self) -> Option<ProductSubmission> {
        if self.busy {
            return None;
        }
        let name = self.pending.name.trim();
        if name.is_empty() {
            return None;
        }
        let file = self.pending.file.clone()?;
        self.busy = true;
        self.error = None;
        Some(ProductSubmission {
            file,
            name: name.to_string(),
        })
    }

    /// The upload went through: record the stored URL and discard the
    /// pending upload (file, name, preview) in one step.
    pub fn product_submit_succeeded(&mut self, uploaded_url: String) {
        self.uploaded_url = Some(uploaded_url);
        self.pending = PendingUpload::default();
        self.busy = false;
    }

    /// The upload failed: keep the pending upload untouched so the user
    /// can retry with a single click.
    pub fn product_submit_failed(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.busy = false;
    }

    /// Marks a catalog entry as the try-on target. Deliberately leaves any
    /// selfie submission and prior result in place.
    pub fn select_product(&mut self, product: Product) {
        debug!(product_id = product.id.0, "product selected");
        self.selected = Some(product);
    }

    pub fn selected_product(&self) -> Option<&Product> {
        self.selected.as_ref()
    }

    /// Same contract as [`Self::select_image`], targeting the selfie.
    pub fn select_selfie(&mut self, file: PathBuf, preview: Option<P>) {
        self.selfie.file = Some(file);
        self.selfie.preview = preview;
    }

    pub fn selfie_image(&self) -> Option<&Path> {
        self.selfie.file.as_deref()
    }

    pub fn selfie_preview(&self) -> Option<&P> {
        self.selfie.preview.as_ref()
    }

    pub fn can_process_try_on(&self) -> bool {
        !self.busy && self.selfie.file.is_some() && self.selected.is_some()
    }

    /// Counterpart of [`Self::begin_product_submit`] for the try-on flow.
    /// The two flows share the busy flag, so at most one request is in
    /// flight across both.
    pub fn begin_try_on(&mut self) -> Option<TryOnSubmission> {
        if self.busy {
            return None;
        }
        let product_id = self.selected.as_ref()?.id;
        let file = self.selfie.file.clone()?;
        self.busy = true;
        self.error = None;
        Some(TryOnSubmission { file, product_id })
    }

    /// Composite ready: store the reference and discard the selfie and its
    /// preview. The selected product stays selected for another round.
    pub fn try_on_succeeded(&mut self, result_url: String) {
        self.result = Some(ProcessedResult { result_url });
        self.selfie = SelfieSubmission::default();
        self.busy = false;
    }

    /// Try-on failed: the selfie is retained for retry.
    pub fn try_on_failed(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.busy = false;
    }

    pub fn result(&self) -> Option<&ProcessedResult> {
        self.result.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
