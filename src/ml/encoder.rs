// ============================================================
// Layer 5 — Transformer Encoder
// ============================================================
// Token ids in, contextual hidden states out:
//
//   tokens [batch, seq_len]
//     │ Embedding · sqrt(d_model)
//     ▼
//   PositionalEncoding
//     ▼
//   Block 1 → Block 2 → … → Block N        (each returns its weights)
//     ▼
//   hidden [batch, seq_len, d_model]  +  Vec<weights>, one per block
//
// The attention-weight list is built fresh on every forward
// call and handed back to the caller; nothing is cached on the
// model between calls.
//
// Reference: Vaswani et al. (2017) §3.1, §3.4
//            Burn Book §3 (Building Blocks)

use burn::{nn::Embedding, prelude::*};
use rand::Rng;

use crate::domain::{error::EncoderError, traits::Layer};
use crate::ml::{
    attention::{AttentionInput, ValidLens},
    block::{BlockOutput, EncoderBlock, EncoderBlockConfig},
    init::seeded_embedding,
    positional::PositionalEncoding,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TransformerEncoderConfig {
    pub vocab_size: usize,
    pub max_len:    usize,
    #[config(default = 512)]
    pub d_model:    usize,
    #[config(default = 8)]
    pub num_heads:  usize,
    #[config(default = 6)]
    pub n_blocks:   usize,
    #[config(default = 2048)]
    pub d_ff:       usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl TransformerEncoderConfig {
    /// Check every dimension before any weight is allocated.
    pub fn validate(&self) -> Result<(), EncoderError> {
        let sizes = [
            ("vocab_size", self.vocab_size),
            ("max_len",    self.max_len),
            ("d_model",    self.d_model),
            ("num_heads",  self.num_heads),
            ("n_blocks",   self.n_blocks),
            ("d_ff",       self.d_ff),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(EncoderError::InvalidConfig(format!("{name} must be positive")));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(EncoderError::HeadsDoNotDivide {
                d_model:   self.d_model,
                num_heads: self.num_heads,
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EncoderError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    /// Build the encoder, drawing every learned weight from `rng`.
    pub fn init<B: Backend, R: Rng + ?Sized>(
        &self,
        rng:    &mut R,
        device: &B::Device,
    ) -> Result<TransformerEncoder<B>, EncoderError> {
        self.validate()?;

        let embedding    = seeded_embedding(self.vocab_size, self.d_model, rng, device);
        let pos_encoding = PositionalEncoding::new(self.d_model, self.max_len, self.dropout, device);
        let block_cfg    = EncoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout);
        let blocks = (0..self.n_blocks)
            .map(|_| block_cfg.init(rng, device))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Encoder built: {} blocks, d_model={}, heads={}, d_ff={}",
            self.n_blocks, self.d_model, self.num_heads, self.d_ff
        );

        Ok(TransformerEncoder {
            embedding,
            pos_encoding,
            blocks,
            vocab_size: self.vocab_size,
            d_model:    self.d_model,
        })
    }
}

// ─── Inputs / Outputs ─────────────────────────────────────────────────────────
/// Token ids for the query, key and value streams, plus optional lengths.
///
/// For a self-attention encoder all three are the same tensor; see
/// [`EncoderInput::self_attn`].
#[derive(Debug, Clone)]
pub struct EncoderInput<B: Backend> {
    pub queries:    Tensor<B, 2, Int>,
    pub keys:       Tensor<B, 2, Int>,
    pub values:     Tensor<B, 2, Int>,
    pub valid_lens: Option<ValidLens<B>>,
}

impl<B: Backend> EncoderInput<B> {
    pub fn new(queries: Tensor<B, 2, Int>, keys: Tensor<B, 2, Int>, values: Tensor<B, 2, Int>) -> Self {
        Self { queries, keys, values, valid_lens: None }
    }

    pub fn self_attn(tokens: Tensor<B, 2, Int>) -> Self {
        Self::new(tokens.clone(), tokens.clone(), tokens)
    }

    pub fn with_valid_lens(mut self, valid_lens: Option<ValidLens<B>>) -> Self {
        self.valid_lens = valid_lens;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [batch, seq_len, d_model]
    pub hidden:            Tensor<B, 3>,
    /// One [batch, heads, seq_len, seq_len] tensor per block, in block order
    pub attention_weights: Vec<Tensor<B, 4>>,
}

// ─── TransformerEncoder ───────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub embedding:    Embedding<B>,
    pub pos_encoding: PositionalEncoding<B>,
    pub blocks:       Vec<EncoderBlock<B>>,
    pub vocab_size:   usize,
    pub d_model:      usize,
}

impl<B: Backend> TransformerEncoder<B> {
    pub fn blocks(&self) -> &[EncoderBlock<B>] {
        &self.blocks
    }

    /// Raw embedding lookup: [batch, seq_len] → [batch, seq_len, d_model].
    ///
    /// Fails on an empty batch or on ids outside `[0, vocab_size)`.
    pub fn embed(&self, tokens: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, EncoderError> {
        let [batch, seq_len] = tokens.dims();
        if batch == 0 || seq_len == 0 {
            return Err(EncoderError::shape(
                "tokens",
                "[batch >= 1, seq_len >= 1]",
                &[batch, seq_len],
            ));
        }
        let min = tokens.clone().min().into_scalar().elem::<i64>();
        let max = tokens.clone().max().into_scalar().elem::<i64>();
        for id in [min, max] {
            if id < 0 || id >= self.vocab_size as i64 {
                return Err(EncoderError::TokenOutOfRange { id, vocab_size: self.vocab_size });
            }
        }
        Ok(self.embedding.forward(tokens))
    }

    /// Add the sinusoidal position signal to an embedded batch.
    pub fn positional_encode(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>, EncoderError> {
        self.pos_encoding.forward(x)
    }

    /// Embedding · sqrt(d_model) followed by positional encoding.
    fn embed_and_encode(&self, tokens: Tensor<B, 2, Int>) -> Result<Tensor<B, 3>, EncoderError> {
        let embedded = self.embed(tokens)? * (self.d_model as f64).sqrt();
        self.positional_encode(embedded)
    }

    /// Self-attention shorthand: the same ids for queries, keys and values.
    pub fn encode(
        &self,
        tokens:     Tensor<B, 2, Int>,
        valid_lens: Option<ValidLens<B>>,
    ) -> Result<EncoderOutput<B>, EncoderError> {
        self.forward(EncoderInput::self_attn(tokens).with_valid_lens(valid_lens))
    }
}

impl<B: Backend> Layer<EncoderInput<B>> for TransformerEncoder<B> {
    type Output = EncoderOutput<B>;

    /// The first block sees the three embedded streams; every later
    /// block runs self-attention on the running hidden state.
    fn forward(&self, input: EncoderInput<B>) -> Result<EncoderOutput<B>, EncoderError> {
        let EncoderInput { queries, keys, values, valid_lens } = input;
        let dims = queries.dims();
        for (what, other) in [("keys", keys.dims()), ("values", values.dims())] {
            if other != dims {
                return Err(EncoderError::shape(what, format!("{dims:?}"), &other));
            }
        }

        let mut stage = AttentionInput::new(
            self.embed_and_encode(queries)?,
            self.embed_and_encode(keys)?,
            self.embed_and_encode(values)?,
        )
        .with_valid_lens(valid_lens.clone());

        let mut attention_weights = Vec::with_capacity(self.blocks.len());
        let mut hidden = stage.queries.clone();
        for (index, block) in self.blocks.iter().enumerate() {
            let BlockOutput { hidden: next, weights } = block.forward(stage)?;
            tracing::debug!("block {}: hidden {:?}, weights {:?}", index, next.dims(), weights.dims());
            attention_weights.push(weights);
            hidden = next;
            stage = AttentionInput::self_attn(hidden.clone()).with_valid_lens(valid_lens.clone());
        }

        Ok(EncoderOutput { hidden, attention_weights })
    }
}
