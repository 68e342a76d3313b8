use std::path::PathBuf;

use clap::Parser;

use crate::encoder::OutputFormat;

#[derive(Parser, Debug)]
#[command(about = "Encode parallel text files with a sentencepiece model, in parallel, keeping input order")]
pub(crate) struct Cli {
    /// sentencepiece model to use for encoding
    #[arg(long)]
    pub(crate) model: PathBuf,

    /// input files to filter/encode, `-` for stdin
    #[arg(long, num_args = 1.., default_value = "-")]
    pub(crate) inputs: Vec<String>,

    /// paths to save encoded outputs, `-` for stdout
    #[arg(long, num_args = 1.., default_value = "-")]
    pub(crate) outputs: Vec<String>,

    #[arg(long = "output_format", value_enum, default_value = "piece")]
    pub(crate) output_format: OutputFormat,

    /// filter rows with fewer than N tokens
    #[arg(long, value_name = "N")]
    pub(crate) min_len: Option<usize>,

    /// filter rows with more than N tokens
    #[arg(long, value_name = "N")]
    pub(crate) max_len: Option<usize>,

    /// number of parallel workers (output keeps the same order as input)
    #[arg(long, value_name = "N", default_value_t = 12)]
    pub(crate) processes: usize,

    /// write empty lines through instead of dropping them
    #[arg(long, default_value_t = false)]
    pub(crate) keep_empty: bool,
}
