// ============================================================
// Model Configuration
// ============================================================
// The immutable hyperparameter bundle for the TextCNN model.
// Constructed once, read by `TextCnnConfig::init`, never mutated.
//
// Serialisable with serde so the embedding application can save
// the architecture next to its checkpoints and rebuild the same
// model at inference time (the weights themselves are the
// application's concern, not ours).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextCnnError};

// ─── TextCnnConfig ────────────────────────────────────────────────────────────
/// Hyperparameters of the TextCNN classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCnnConfig {
    /// Width of each learned token embedding vector
    pub embedding_dim: usize,

    /// Convolution window sizes, one branch per entry.
    /// Order is preserved; duplicates get independent parameters.
    pub filter_sizes: Vec<usize>,

    /// Number of convolution filters per window size
    pub num_filters: usize,

    /// Probability of dropping an activation during training.
    /// Must lie in [0, 1). Ignored entirely at inference.
    pub dropout_rate: f64,

    /// Coefficient on the L2 penalty over the output projection.
    /// 0.0 disables regularisation.
    pub l2_reg_lambda: f64,

    /// Fixed token length of every input sequence
    pub max_seq_length: usize,

    /// Number of distinct token ids the embedding table covers
    pub vocab_size: usize,

    /// Number of output classes
    pub label_size: usize,
}

impl Default for TextCnnConfig {
    fn default() -> Self {
        Self {
            embedding_dim:  128,
            filter_sizes:   vec![3, 4, 5],
            num_filters:    128,
            dropout_rate:   0.5,
            l2_reg_lambda:  0.0,
            max_seq_length: 128,
            vocab_size:     8192,
            label_size:     64,
        }
    }
}

impl TextCnnConfig {
    /// Parse a comma-separated filter-size spec such as `"3,4,5"`
    /// into an ordered list. The order of the spec is kept as-is:
    /// `"5,3,4"` yields `[5, 3, 4]`, never a sorted list.
    pub fn parse_filter_sizes(spec: &str) -> Result<Vec<usize>> {
        spec.split(',')
            .map(|token| {
                let token = token.trim();
                token
                    .parse::<usize>()
                    .map_err(|_| TextCnnError::FilterSpecParse {
                        spec:  spec.to_string(),
                        token: token.to_string(),
                    })
            })
            .collect()
    }

    /// Default configuration with the filter sizes taken from a
    /// comma-separated spec string.
    pub fn from_filter_spec(spec: &str) -> Result<Self> {
        Ok(Self {
            filter_sizes: Self::parse_filter_sizes(spec)?,
            ..Self::default()
        })
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_filter_sizes(mut self, filter_sizes: Vec<usize>) -> Self {
        self.filter_sizes = filter_sizes;
        self
    }

    pub fn with_num_filters(mut self, num_filters: usize) -> Self {
        self.num_filters = num_filters;
        self
    }

    pub fn with_dropout_rate(mut self, dropout_rate: f64) -> Self {
        self.dropout_rate = dropout_rate;
        self
    }

    pub fn with_l2_reg_lambda(mut self, l2_reg_lambda: f64) -> Self {
        self.l2_reg_lambda = l2_reg_lambda;
        self
    }

    pub fn with_max_seq_length(mut self, max_seq_length: usize) -> Self {
        self.max_seq_length = max_seq_length;
        self
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }

    pub fn with_label_size(mut self, label_size: usize) -> Self {
        self.label_size = label_size;
        self
    }

    /// Width of the flattened feature vector after pooling and
    /// concatenation: num_filters × number of filter sizes.
    pub fn total_filter_width(&self) -> usize {
        self.num_filters * self.filter_sizes.len()
    }

    /// Height of the valid max-pool window for one filter size.
    /// A valid convolution over L positions with window f leaves
    /// L − f + 1 outputs, and the pool collapses all of them.
    pub fn pool_height(&self, filter_size: usize) -> usize {
        self.max_seq_length - filter_size + 1
    }

    /// Check every invariant the model construction relies on.
    ///
    /// Called by [`init`](Self::init) before any parameter is
    /// allocated, so a bad configuration fails before it costs
    /// anything.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(TextCnnError::ZeroDimension { field: "embedding_dim" });
        }
        if self.num_filters == 0 {
            return Err(TextCnnError::ZeroDimension { field: "num_filters" });
        }
        if self.max_seq_length == 0 {
            return Err(TextCnnError::ZeroDimension { field: "max_seq_length" });
        }
        if self.vocab_size == 0 {
            return Err(TextCnnError::ZeroDimension { field: "vocab_size" });
        }
        if self.label_size == 0 {
            return Err(TextCnnError::ZeroDimension { field: "label_size" });
        }
        if self.filter_sizes.is_empty() {
            return Err(TextCnnError::EmptyFilterSizes);
        }
        for &f in &self.filter_sizes {
            if f == 0 {
                return Err(TextCnnError::ZeroDimension { field: "filter_sizes" });
            }
            if f > self.max_seq_length {
                return Err(TextCnnError::FilterTooWide {
                    filter_size:    f,
                    max_seq_length: self.max_seq_length,
                });
            }
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(TextCnnError::InvalidDropoutRate(self.dropout_rate));
        }
        if self.l2_reg_lambda < 0.0 {
            return Err(TextCnnError::NegativeL2Lambda(self.l2_reg_lambda));
        }
        Ok(())
    }
}

// One `key = value` line per field, in declaration order.
// Deterministic so it can be diffed between runs and parsed back
// when auditing a training log.
impl fmt::Display for TextCnnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "embedding_dim = {}", self.embedding_dim)?;
        writeln!(f, "filter_sizes = {:?}", self.filter_sizes)?;
        writeln!(f, "num_filters = {}", self.num_filters)?;
        writeln!(f, "dropout_rate = {}", self.dropout_rate)?;
        writeln!(f, "l2_reg_lambda = {}", self.l2_reg_lambda)?;
        writeln!(f, "max_seq_length = {}", self.max_seq_length)?;
        writeln!(f, "vocab_size = {}", self.vocab_size)?;
        write!(f, "label_size = {}", self.label_size)
    }
}
