//! Deterministic word-level tokenizer for tests.

use crate::tokenizer::TokenizerTrait;

pub const PAD: usize = 0;
pub const BOS: usize = 1;
pub const EOS: usize = 2;
pub const MASK: usize = 3;
pub const UNK: usize = 4;
pub const SEP: usize = 5;
const FIRST_WORD_ID: usize = 6;

/// Whitespace word-level tokenizer with a fixed vocabulary. Encoding and
/// decoding are exact inverses for texts made of known words, which is what
/// the round-trip tests rely on.
pub struct WordTokenizer {
    words: Vec<String>,
}

impl WordTokenizer {
    #[must_use]
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    fn word_id(&self, word: &str) -> usize {
        self.words
            .iter()
            .position(|w| w == word)
            .map_or(UNK, |idx| FIRST_WORD_ID + idx)
    }
}

impl TokenizerTrait for WordTokenizer {
    fn encode(&self, text: &str, _add_special_tokens: bool) -> Vec<usize> {
        text.split_whitespace()
            .map(|w| self.token_to_id(w).unwrap_or(UNK))
            .collect()
    }

    fn encode_pair(&self, text_a: &str, text_b: &str, add_special_tokens: bool) -> Vec<usize> {
        let mut ids = self.encode(text_a, add_special_tokens);
        ids.push(SEP);
        ids.extend(self.encode(text_b, add_special_tokens));
        ids
    }

    fn decode(&self, token_ids: &[usize], skip_special_tokens: bool) -> String {
        token_ids
            .iter()
            .filter_map(|&id| {
                if id >= FIRST_WORD_ID {
                    self.words.get(id - FIRST_WORD_ID).cloned()
                } else if skip_special_tokens {
                    None
                } else {
                    self.id_to_token(id)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn token_to_id(&self, token: &str) -> Option<usize> {
        match token {
            "<pad>" => Some(PAD),
            "<bos>" => Some(BOS),
            "<eos>" => Some(EOS),
            "<mask>" => Some(MASK),
            "<unk>" => Some(UNK),
            "<sep>" => Some(SEP),
            word => {
                let id = self.word_id(word);
                (id != UNK).then_some(id)
            }
        }
    }

    fn id_to_token(&self, id: usize) -> Option<String> {
        match id {
            PAD => Some("<pad>".to_string()),
            BOS => Some("<bos>".to_string()),
            EOS => Some("<eos>".to_string()),
            MASK => Some("<mask>".to_string()),
            UNK => Some("<unk>".to_string()),
            SEP => Some("<sep>".to_string()),
            _ => self.words.get(id - FIRST_WORD_ID).cloned(),
        }
    }

    fn vocab_size(&self) -> usize {
        FIRST_WORD_ID + self.words.len()
    }

    fn pad_token(&self) -> usize {
        PAD
    }

    fn eos_token(&self) -> usize {
        EOS
    }

    fn bos_token(&self) -> usize {
        BOS
    }

    fn mask_token(&self) -> Option<usize> {
        Some(MASK)
    }

    fn save(&self, dir: &std::path::Path) -> std::io::Result<()> {
        std::fs::write(dir.join("words.txt"), self.words.join("\n"))
    }
}
