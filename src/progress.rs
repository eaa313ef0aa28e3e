//! Progress-callback trait for per-document classification events.
//!
//! Inject an [`Arc<dyn ClassificationProgressCallback>`] via
//! [`crate::config::ClassifierConfigBuilder::progress_callback`] to receive
//! events as the batch runner works through a folder.
//!
//! # Example
//!
//! ```rust
//! use form_classifier::{ClassificationProgressCallback, ClassifierConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct VerifiedCounter {
//!     verified: AtomicUsize,
//! }
//!
//! impl ClassificationProgressCallback for VerifiedCounter {
//!     fn on_document_complete(&self, index: usize, total: usize, filename: &str, is_verified: bool) {
//!         if is_verified {
//!             self.verified.fetch_add(1, Ordering::SeqCst);
//!         }
//!         eprintln!("{}/{} {}", index, total, filename);
//!     }
//! }
//!
//! let counter = Arc::new(VerifiedCounter { verified: AtomicUsize::new(0) });
//!
//! let config = ClassifierConfig::builder()
//!     .progress_callback(counter as Arc<dyn ClassificationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// Documents are processed one at a time, so calls never overlap, but the
/// trait is still `Send + Sync` so the callback can be shared with other
/// tasks. All methods default to no-ops.
pub trait ClassificationProgressCallback: Send + Sync {
    /// Called once, after enumeration, before the first document.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is sent to the model.
    ///
    /// # Arguments
    /// * `index`   : 1-indexed position in the batch
    /// * `total`   : number of documents in the batch
    /// * `filename`: file name without directory
    fn on_document_start(&self, index: usize, total: usize, filename: &str) {
        let _ = (index, total, filename);
    }

    /// Called when a document was classified without error.
    fn on_document_complete(&self, index: usize, total: usize, filename: &str, is_verified: bool) {
        let _ = (index, total, filename, is_verified);
    }

    /// Called when a document failed; `diagnostic` is the multi-line text
    /// stored in the result's `error` field.
    fn on_document_error(&self, index: usize, total: usize, filename: &str, diagnostic: &str) {
        let _ = (index, total, filename, diagnostic);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, verified_count: usize) {
        let _ = (total_documents, verified_count);
    }
}

/// A callback that ignores every event. `FormClassifier` does not need one:
/// an unset `progress_callback` already skips all hooks.
pub struct NoopProgressCallback;

impl ClassificationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClassifierConfig`].
pub type ProgressCallback = Arc<dyn ClassificationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: Mutex<Vec<String>>,
        verified_total: AtomicUsize,
    }

    impl ClassificationProgressCallback for TrackingCallback {
        fn on_document_start(&self, _index: usize, _total: usize, _filename: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _index: usize, _total: usize, _filename: &str, _v: bool) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _index: usize, _total: usize, filename: &str, _d: &str) {
            self.errors.lock().unwrap().push(filename.to_string());
        }

        fn on_batch_complete(&self, _total: usize, verified_count: usize) {
            self.verified_total.store(verified_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a.pdf");
        cb.on_document_complete(1, 2, "a.pdf", true);
        cb.on_document_error(2, 2, "b.pdf", "Error Type: Unparseable");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_document_start(1, 2, "a.pdf");
        tracker.on_document_complete(1, 2, "a.pdf", true);
        tracker.on_document_start(2, 2, "b.pdf");
        tracker.on_document_error(2, 2, "b.pdf", "boom");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.errors.lock().unwrap(), vec!["b.pdf".to_string()]);
        assert_eq!(tracker.verified_total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start(1, 10, "x.pdf");
    }
}
