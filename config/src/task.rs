//! Task taxonomy and metric-reporting targets.

use serde::{Deserialize, Serialize};

/// Fine-tuning task. Determines the encoding scheme, the collator, and the
/// trainer configuration selected at dispatch time.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    /// Free-text generation with a standard language-model loss.
    #[default]
    CausalLm,
    /// Masked-word prediction with stochastic masking at collation time.
    MaskedLm,
    /// Sequence-to-sequence transformation over input/target text pairs.
    #[cfg_attr(feature = "clap", value(name = "seq2seq"))]
    #[serde(rename = "seq2seq")]
    Seq2Seq,
    /// Single- or pair-sequence classification over labeled rows.
    SequenceClassification,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CausalLm => write!(f, "causal-lm"),
            Self::MaskedLm => write!(f, "masked-lm"),
            Self::Seq2Seq => write!(f, "seq2seq"),
            Self::SequenceClassification => write!(f, "sequence-classification"),
        }
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "causal-lm" | "generation" => Ok(Self::CausalLm),
            "masked-lm" | "word-prediction" => Ok(Self::MaskedLm),
            "seq2seq" | "text-to-text" => Ok(Self::Seq2Seq),
            "sequence-classification" | "classification" => Ok(Self::SequenceClassification),
            _ => Err(format!(
                "unknown task '{s}'. Use: causal-lm, masked-lm, seq2seq, sequence-classification"
            )),
        }
    }
}

/// External metrics-reporting sink. An empty list means none.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ReportTarget {
    /// Export per-epoch metric logs to CSV files in the output directory.
    Csv,
    /// Print the trainer's end-of-run summary table.
    Summary,
}

impl std::fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Summary => write!(f, "summary"),
        }
    }
}
