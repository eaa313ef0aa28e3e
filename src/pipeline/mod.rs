//! Pipeline stages for classifying one form.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ oracle ──▶ response ──▶ verify ──▶ ClassificationResult
//! (%PDF)    (Gemini)   (JSON)       (table)
//!                 └──────▶ diagnostics (on any failure)
//! ```
//!
//! 1. [`input`]: enumerate the input folder and pre-flight each document
//! 2. [`oracle`]: upload / generate / release against the model API; the
//!    only stage with network I/O
//! 3. [`response`]: strip fences, recover JSON, read the three fields
//! 4. [`diagnostics`]: multi-line failure record stored in the result
//! 5. [`classify`]: drives 1–4 for a single document and never fails

pub mod classify;
pub mod diagnostics;
pub mod input;
pub mod oracle;
pub mod response;
