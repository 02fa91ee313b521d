// ============================================================
// Error Types
// ============================================================
// Everything that can go wrong in this crate goes wrong at
// configuration or construction time. There is no runtime
// recovery: a bad hyperparameter set cannot be repaired, so
// every variant is fatal and carries the offending values for
// the error message.
//
// Execution-time shape mismatches (e.g. feeding a label batch
// whose width differs from label_size) are NOT modelled here;
// they surface as panics from the tensor backend, to be caught
// and reported by the embedding application.

use thiserror::Error;

/// Errors raised while parsing or validating a [`TextCnnConfig`]
/// (and therefore while constructing a [`TextCnn`]).
///
/// [`TextCnnConfig`]: crate::config::TextCnnConfig
/// [`TextCnn`]: crate::model::TextCnn
#[derive(Debug, Error)]
pub enum TextCnnError {
    /// A token in the comma-separated filter-size spec did not
    /// parse as a positive integer.
    #[error("invalid filter size '{token}' in filter spec '{spec}'")]
    FilterSpecParse { spec: String, token: String },

    /// The filter-size list is empty: with no convolution
    /// branches the feature concatenation is ill-defined.
    #[error("filter_sizes must contain at least one filter size")]
    EmptyFilterSizes,

    /// A filter spans more positions than the input sequence has,
    /// which would require a negative pooling window.
    #[error("filter size {filter_size} exceeds max_seq_length {max_seq_length}")]
    FilterTooWide {
        filter_size:    usize,
        max_seq_length: usize,
    },

    /// A dimension hyperparameter that must be positive is zero.
    #[error("{field} must be a positive integer")]
    ZeroDimension { field: &'static str },

    /// Dropout is a probability of dropping, so it must lie in [0, 1).
    #[error("dropout_rate must be in [0, 1), got {0}")]
    InvalidDropoutRate(f64),

    /// The L2 penalty coefficient scales a sum of squares and
    /// cannot meaningfully be negative.
    #[error("l2_reg_lambda must be non-negative, got {0}")]
    NegativeL2Lambda(f64),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TextCnnError>;
