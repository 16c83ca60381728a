//! UI/backend events and error modeling for the studio controller.

use shared::domain::{Product, ProductId};

use crate::ui::app::PreviewImage;

pub enum UiEvent {
    Info(String),
    CatalogLoaded(Vec<Product>),
    CatalogRefreshFailed {
        reason: String,
    },
    ProductImageLoaded {
        product_id: ProductId,
        image: PreviewImage,
    },
    ProductImageFailed {
        product_id: ProductId,
        reason: String,
    },
    ProductCreated {
        url: String,
    },
    TryOnComplete {
        result_url: String,
    },
    ResultImageLoaded {
        image: PreviewImage,
        original_bytes: Vec<u8>,
    },
    ResultImageFailed {
        reason: String,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    CreateProduct,
    TryOn,
}

impl UiErrorContext {
    /// Fixed banner text per user-facing failure kind. Exactly two kinds
    /// reach the banner with canned text; a startup failure shows its own
    /// message instead.
    pub fn banner_text(self) -> Option<&'static str> {
        match self {
            UiErrorContext::CreateProduct => Some("Upload failed. Please try again."),
            UiErrorContext::TryOn => Some("Image processing failed. Please try again."),
            UiErrorContext::BackendStartup => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("dns")
            || message_lower.contains("unavailable")
        {
            UiErrorCategory::Transport
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
            || message_lower.contains("rejected")
        {
            UiErrorCategory::Validation
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::{UiError, UiErrorCategory, UiErrorContext};

    #[test]
    fn classifies_timeouts_as_transport_errors() {
        let err = UiError::from_message(
            UiErrorContext::CreateProduct,
            "error sending request: operation timed out",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn classifies_server_rejections_as_validation_errors() {
        let err = UiError::from_message(
            UiErrorContext::TryOn,
            "server rejected request (422): Validation: selfie is required",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn unknown_messages_stay_unclassified() {
        let err = UiError::from_message(UiErrorContext::BackendStartup, "something odd happened");
        assert_eq!(err.category(), UiErrorCategory::Unknown);
    }

    #[test]
    fn each_submission_flow_has_its_own_banner_text() {
        assert_eq!(
            UiErrorContext::CreateProduct.banner_text(),
            Some("Upload failed. Please try again.")
        );
        assert_eq!(
            UiErrorContext::TryOn.banner_text(),
            Some("Image processing failed. Please try again.")
        );
        assert_eq!(UiErrorContext::BackendStartup.banner_text(), None);
    }
}
