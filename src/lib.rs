// ============================================================
// text-cnn — Convolutional Text Classifier (Burn)
// ============================================================
// Model-definition crate: one TextCNN architecture and its
// hyperparameter configuration, meant to be embedded in a larger
// training/serving pipeline. The pipeline owns data loading, the
// optimiser, checkpointing, and serving; this crate only defines
// the computation.
//
// What's in this crate:
//
//   config.rs — TextCnnConfig
//               Hyperparameter bundle with defaults, the
//               comma-separated filter-size spec parser,
//               validation, and a deterministic multi-line
//               rendering for logs
//
//   model.rs  — TextCnn<B>
//               Embedding lookup, one conv+ReLU+max-pool branch
//               per filter size, concatenation, training-only
//               dropout, dense projection, and the derived
//               scores / predictions / loss / accuracy
//
//   error.rs  — TextCnnError
//               Construction-time failures; nothing here is
//               recoverable, the embedding application reports
//               and aborts
//
// Reference: Kim (2014) Convolutional Neural Networks for
//            Sentence Classification
//            Burn Book §3 (Building Blocks)

/// Hyperparameter configuration and filter-spec parsing
pub mod config;

/// Construction-time error taxonomy
pub mod error;

/// The TextCNN architecture and its forward computation
pub mod model;

pub use config::TextCnnConfig;
pub use error::{Result, TextCnnError};
pub use model::{ClassificationOutput, ConvBranch, TextCnn};
