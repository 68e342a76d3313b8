use rust_tokenizers::error::TokenizerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("number of input and output paths should match (got {inputs} inputs, {outputs} outputs)")]
    InputOutputMismatch { inputs: usize, outputs: usize },
    #[error("failed to load sentencepiece model: {0}")]
    Model(#[from] TokenizerError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("worker pool shut down unexpectedly")]
    PoolDisconnected,
}
