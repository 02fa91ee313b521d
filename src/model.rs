// ============================================================
// TextCNN Model (Burn)
// ============================================================
// Convolutional text classifier over learned token embeddings:
//
//   token ids → embedding lookup → one conv+ReLU+max-pool branch
//   per filter size → concat → dropout (training only) →
//   dense projection → scores / predictions / loss / accuracy
//
// Pure graph definition: no training loop, no data loading, no
// checkpointing. The embedding application feeds batches, runs
// the optimiser, and owns the parameter lifecycle.
//
// Layout note: Burn convolutions are NCHW, so the embedded input
// carries its singleton channel at axis 1 as [batch, 1, seq, emb]
// rather than the NHWC trailing position; the arithmetic is
// identical either way.
//
// Reference: Kim (2014) Convolutional Neural Networks for
//            Sentence Classification
//            Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Initializer},
    prelude::*,
    tensor::{
        activation::{log_softmax, relu, softmax},
        module::{conv2d, embedding, max_pool2d},
        ops::ConvOptions,
    },
};

use crate::config::TextCnnConfig;
use crate::error::Result;

// ─── ConvBranch ───────────────────────────────────────────────────────────────
/// One convolution + max-pool branch for a single filter size.
///
/// Each entry in `filter_sizes` gets its own branch with
/// independent parameters, duplicate sizes included.
#[derive(Module, Debug)]
pub struct ConvBranch<B: Backend> {
    /// Convolution kernel — shape: [num_filters, 1, filter_size, embedding_dim]
    kernel: Param<Tensor<B, 4>>,

    /// Per-filter bias — shape: [num_filters]
    bias: Param<Tensor<B, 1>>,

    /// Number of consecutive token positions the kernel spans
    filter_size: usize,

    /// Valid max-pool window height: max_seq_length − filter_size + 1
    pool_height: usize,
}

impl<B: Backend> ConvBranch<B> {
    /// The window size this branch's parameters belong to.
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// [batch, 1, seq, emb] → [batch, num_filters, 1, 1]
    ///
    /// Valid unit-stride convolution, bias add, ReLU, then a valid
    /// max-pool that collapses the whole remaining sequence axis.
    fn forward(&self, embedded: Tensor<B, 4>) -> Tensor<B, 4> {
        let convolved = conv2d(
            embedded,
            self.kernel.val(),
            Some(self.bias.val()),
            ConvOptions::new([1, 1], [0, 0], [1, 1], 1),
        );
        let activated = relu(convolved);
        max_pool2d(activated, [self.pool_height, 1], [1, 1], [0, 0], [1, 1])
    }
}

// ─── TextCnn ──────────────────────────────────────────────────────────────────
/// The full TextCNN model.
///
/// B is the Burn backend (NdArray, Wgpu, Autodiff<...>): the
/// definition is backend-generic, the driver picks the device.
#[derive(Module, Debug)]
pub struct TextCnn<B: Backend> {
    /// Embedding table — shape: [vocab_size, embedding_dim], Uniform(−1, 1)
    embedding: Param<Tensor<B, 2>>,

    /// One branch per configured filter size, in spec order
    branches: Vec<ConvBranch<B>>,

    /// Applied to the flattened features during training only
    dropout: Dropout,

    /// Output projection — shape: [total_filter_width, label_size], Xavier
    output_weight: Param<Tensor<B, 2>>,

    /// Output bias — shape: [label_size], constant 0.1
    output_bias: Param<Tensor<B, 1>>,

    /// Coefficient on the L2 penalty added to the loss
    l2_reg_lambda: f64,

    /// Training mode: gates dropout. The mode is fixed per model
    /// instance, one instance per (config, mode) pair.
    is_training: bool,
}

/// Everything the external driver pulls from one forward pass.
pub struct ClassificationOutput<B: Backend> {
    /// Raw class scores — shape: [batch, label_size]
    pub scores: Tensor<B, 2>,

    /// Argmax class index per example — shape: [batch]
    pub predictions: Tensor<B, 1, Int>,

    /// Mean cross-entropy plus the scaled L2 penalty — scalar
    pub loss: Tensor<B, 1>,

    /// Fraction of examples whose prediction matches the label argmax
    pub accuracy: f64,
}

impl TextCnnConfig {
    /// Validate the configuration and declare every trainable
    /// parameter of the model on the given device.
    ///
    /// Logs the configuration and all declared/derived tensor
    /// shapes once, at info level. Fails fast on an invalid
    /// configuration; nothing is allocated in that case.
    pub fn init<B: Backend>(
        &self,
        is_training: bool,
        device: &B::Device,
    ) -> Result<TextCnn<B>> {
        self.validate()?;

        tracing::info!("TextCNN model config:\n{self}");
        tracing::info!("is_training = {is_training}");

        let embedding: Param<Tensor<B, 2>> =
            Initializer::Uniform { min: -1.0, max: 1.0 }
                .init([self.vocab_size, self.embedding_dim], device);
        tracing::info!(
            "embedding table: [{}, {}], embedded input: [batch, 1, {}, {}]",
            self.vocab_size,
            self.embedding_dim,
            self.max_seq_length,
            self.embedding_dim,
        );

        let branches = self
            .filter_sizes
            .iter()
            .map(|&filter_size| self.init_branch(filter_size, device))
            .collect::<Vec<_>>();

        let total_filter_width = self.total_filter_width();
        tracing::info!("flattened features: [batch, {total_filter_width}]");

        let output_weight: Param<Tensor<B, 2>> =
            Initializer::XavierUniform { gain: 1.0 }.init_with(
                [total_filter_width, self.label_size],
                Some(total_filter_width),
                Some(self.label_size),
                device,
            );
        let output_bias: Param<Tensor<B, 1>> =
            Initializer::Constant { value: 0.1 }.init([self.label_size], device);
        tracing::info!(
            "output projection: [{}, {}], scores: [batch, {}]",
            total_filter_width,
            self.label_size,
            self.label_size,
        );

        Ok(TextCnn {
            embedding,
            branches,
            dropout: DropoutConfig::new(self.dropout_rate).init(),
            output_weight,
            output_bias,
            l2_reg_lambda: self.l2_reg_lambda,
            is_training,
        })
    }

    fn init_branch<B: Backend>(
        &self,
        filter_size: usize,
        device: &B::Device,
    ) -> ConvBranch<B> {
        // Fan-in of one output unit: filter_size × embedding_dim × 1 channel
        let fan_in = filter_size * self.embedding_dim;
        let kernel: Param<Tensor<B, 4>> = Initializer::Normal {
            mean: 0.0,
            std:  (2.0 / fan_in as f64).sqrt(),
        }
        .init(
            [self.num_filters, 1, filter_size, self.embedding_dim],
            device,
        );
        let bias: Param<Tensor<B, 1>> =
            Initializer::Zeros.init([self.num_filters], device);

        let pool_height = self.pool_height(filter_size);
        tracing::info!(
            "conv-maxpool-{}: kernel [{}, 1, {}, {}], conv out [batch, {}, {}, 1], pooled [batch, {}, 1, 1]",
            filter_size,
            self.num_filters,
            filter_size,
            self.embedding_dim,
            self.num_filters,
            pool_height,
            self.num_filters,
        );

        ConvBranch {
            kernel,
            bias,
            filter_size,
            pool_height,
        }
    }
}

impl<B: Backend> TextCnn<B> {
    /// Filter size of each convolution branch, in construction
    /// order, one entry per occurrence (duplicates included).
    pub fn branch_filter_sizes(&self) -> Vec<usize> {
        self.branches.iter().map(ConvBranch::filter_size).collect()
    }

    /// Embedding lookup plus the singleton channel axis the
    /// convolutions expect: [batch, seq] → [batch, 1, seq, emb]
    fn embedded(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 4> {
        embedding(self.embedding.val(), tokens).unsqueeze_dim::<4>(1)
    }

    /// Run every convolution branch and concatenate the pooled
    /// outputs into the flat feature vector, pre-dropout.
    ///
    /// tokens: [batch, seq] → [batch, num_filters × branch count]
    pub fn pooled_features(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedded(tokens);
        let pooled: Vec<Tensor<B, 4>> = self
            .branches
            .iter()
            .map(|branch| branch.forward(embedded.clone()))
            .collect();
        Tensor::cat(pooled, 1).flatten::<2>(1, 3)
    }

    /// The feature vector actually fed to the output projection:
    /// dropout-regularised during training, untouched otherwise.
    pub fn regularized_features(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let features = self.pooled_features(tokens);
        if self.is_training {
            self.dropout.forward(features)
        } else {
            features
        }
    }

    /// Full forward pass to raw class scores.
    ///
    /// tokens: [batch, seq] → scores: [batch, label_size]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let features = self.regularized_features(tokens);
        features.matmul(self.output_weight.val())
            + self.output_bias.val().unsqueeze::<2>()
    }

    /// Softmax-normalised scores. Diagnostic only: predictions
    /// and the loss both work from the raw scores.
    pub fn probabilities(&self, scores: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(scores, 1)
    }

    /// Predicted class index per example: argmax over the label axis.
    ///
    /// scores: [batch, label_size] → [batch]
    pub fn predict(&self, scores: Tensor<B, 2>) -> Tensor<B, 1, Int> {
        scores.argmax(1).flatten::<1>(0, 1)
    }

    // L2 penalty over the output projection, with the conventional
    // 1/2 factor: 0.5 × (Σ W² + Σ b²)
    fn l2_penalty(&self) -> Tensor<B, 1> {
        let weight_sq = self.output_weight.val().powf_scalar(2.0).sum();
        let bias_sq = self.output_bias.val().powf_scalar(2.0).sum();
        (weight_sq + bias_sq).mul_scalar(0.5)
    }

    /// Mean softmax cross-entropy against one-hot (or soft) labels,
    /// plus l2_reg_lambda × the projection's L2 penalty.
    ///
    /// scores: [batch, label_size], labels: [batch, label_size] → scalar
    pub fn loss(&self, scores: Tensor<B, 2>, labels: Tensor<B, 2>) -> Tensor<B, 1> {
        let log_probs = log_softmax(scores, 1);
        let cross_entropy = (labels * log_probs).sum_dim(1).mean().neg();
        cross_entropy + self.l2_penalty().mul_scalar(self.l2_reg_lambda)
    }

    /// Fraction of examples where the predicted class equals the
    /// argmax of the true label vector. 1.0 = every prediction
    /// correct, 0.0 = none.
    pub fn accuracy(&self, predictions: Tensor<B, 1, Int>, labels: Tensor<B, 2>) -> f64 {
        let batch = predictions.dims()[0];
        let targets = labels.argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predictions
            .equal(targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        correct as f64 / batch as f64
    }

    /// One forward pass bundling everything the driver consumes:
    /// scores, predictions, loss, and batch accuracy.
    pub fn forward_classification(
        &self,
        tokens: Tensor<B, 2, Int>,
        labels: Tensor<B, 2>,
    ) -> ClassificationOutput<B> {
        let scores = self.forward(tokens);
        let predictions = self.predict(scores.clone());
        let loss = self.loss(scores.clone(), labels.clone());
        let accuracy = self.accuracy(predictions.clone(), labels);
        ClassificationOutput {
            scores,
            predictions,
            loss,
            accuracy,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextCnnError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    fn tiny_config() -> TextCnnConfig {
        TextCnnConfig::default()
            .with_embedding_dim(4)
            .with_vocab_size(10)
            .with_max_seq_length(6)
            .with_filter_sizes(vec![3])
            .with_num_filters(2)
            .with_label_size(3)
    }

    fn zero_tokens(batch: usize, seq: usize) -> Tensor<TestBackend, 2, Int> {
        Tensor::zeros([batch, seq], &device())
    }

    #[test]
    fn feature_width_is_filters_times_branch_count() {
        let cfg = tiny_config().with_filter_sizes(vec![2, 3, 4]);
        let model = cfg.init::<TestBackend>(false, &device()).unwrap();
        let features = model.pooled_features(zero_tokens(2, 6));
        assert_eq!(features.dims(), [2, 2 * 3]);
    }

    #[test]
    fn duplicate_filter_sizes_get_independent_branches() {
        let cfg = tiny_config().with_filter_sizes(vec![3, 3]);
        let model = cfg.init::<TestBackend>(false, &device()).unwrap();
        // embedding 10×4 + 2 × (kernel 2×1×3×4 + bias 2) + W 4×3 + b 3
        assert_eq!(model.num_params(), 40 + 2 * 26 + 12 + 3);
        assert_eq!(model.branch_filter_sizes(), vec![3, 3]);
        let features = model.pooled_features(zero_tokens(1, 6));
        assert_eq!(features.dims(), [1, 4]);
    }

    #[test]
    fn construction_fails_for_filter_wider_than_sequence() {
        let cfg = tiny_config().with_filter_sizes(vec![7]);
        let err = cfg.init::<TestBackend>(false, &device()).unwrap_err();
        assert!(matches!(
            err,
            TextCnnError::FilterTooWide { filter_size: 7, max_seq_length: 6 }
        ));
    }

    // With is_training = false the projection input must be the
    // pooled features unchanged, bit for bit.
    #[test]
    fn inference_features_bypass_dropout() {
        let model = tiny_config().init::<TestBackend>(false, &device()).unwrap();
        let tokens = zero_tokens(2, 6);
        let pooled = model.pooled_features(tokens.clone());
        let fed = model.regularized_features(tokens);
        assert_eq!(pooled.into_data(), fed.into_data());
    }

    #[test]
    fn accuracy_is_one_when_all_match_and_zero_when_none() {
        let model = tiny_config().init::<TestBackend>(false, &device()).unwrap();
        let predictions =
            Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2], &device());

        let matching = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &device(),
        );
        assert_eq!(model.accuracy(predictions.clone(), matching), 1.0);

        let disjoint = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
            &device(),
        );
        assert_eq!(model.accuracy(predictions, disjoint), 0.0);
    }

    #[test]
    fn tiny_batch_runs_end_to_end() {
        let model = tiny_config().init::<TestBackend>(false, &device()).unwrap();
        let tokens = zero_tokens(1, 6);
        let labels =
            Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.0]], &device());

        let out = model.forward_classification(tokens, labels);
        assert_eq!(out.scores.dims(), [1, 3]);

        let loss: f32 = out.loss.into_scalar().elem();
        assert!(loss.is_finite());

        let prediction: i64 = out.predictions.into_scalar().elem();
        assert!((0..3).contains(&prediction));
    }

    // The projection bias starts at 0.1, so the L2 penalty is
    // strictly positive and a non-zero lambda must raise the loss
    // above the bare cross-entropy.
    #[test]
    fn l2_lambda_adds_to_the_loss() {
        let model = tiny_config()
            .with_l2_reg_lambda(0.5)
            .init::<TestBackend>(false, &device())
            .unwrap();
        let tokens = zero_tokens(1, 6);
        let labels =
            Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0]], &device());

        let scores = model.forward(tokens);
        let log_probs = log_softmax(scores.clone(), 1);
        let bare_ce: f32 = (labels.clone() * log_probs)
            .sum_dim(1)
            .mean()
            .neg()
            .into_scalar()
            .elem();

        let loss: f32 = model.loss(scores, labels).into_scalar().elem();
        assert!(loss > bare_ce);
    }

    #[test]
    fn softmax_probabilities_sum_to_one() {
        let model = tiny_config().init::<TestBackend>(false, &device()).unwrap();
        let scores = model.forward(zero_tokens(1, 6));
        let total: f32 = model.probabilities(scores).sum().into_scalar().elem();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
