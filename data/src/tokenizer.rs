use std::path::Path;

use tokenizers::tokenizer::Tokenizer as HfTokenizer;

pub trait TokenizerTrait: Send + Sync {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Vec<usize>;
    fn encode_pair(&self, text_a: &str, text_b: &str, add_special_tokens: bool) -> Vec<usize>;
    fn decode(&self, token_ids: &[usize], skip_special_tokens: bool) -> String;
    fn token_to_id(&self, token: &str) -> Option<usize>;
    fn id_to_token(&self, id: usize) -> Option<String>;
    fn vocab_size(&self) -> usize;
    fn pad_token(&self) -> usize;
    fn eos_token(&self) -> usize;
    fn bos_token(&self) -> usize;
    fn mask_token(&self) -> Option<usize>;
    /// Serialize the tokenizer into a directory, so a saved artifact
    /// round-trips into a fresh instance.
    fn save(&self, dir: &Path) -> std::io::Result<()>;
}

pub struct Tokenizer {
    inner: HfTokenizer,
    pad_token_id: usize,
    eos_token_id: usize,
    bos_token_id: usize,
    mask_token_id: Option<usize>,
}

impl Tokenizer {
    /// Creates a new Tokenizer with explicit token IDs.
    pub fn new(
        tokenizer: HfTokenizer,
        pad_token_id: usize,
        eos_token_id: usize,
        bos_token_id: usize,
        mask_token_id: Option<usize>,
    ) -> Self {
        Self {
            inner: tokenizer,
            pad_token_id,
            eos_token_id,
            bos_token_id,
            mask_token_id,
        }
    }

    /// Load a tokenizer from either a HuggingFace model name or a local file path.
    ///
    /// - If the path exists on disk, loads from file
    /// - Otherwise, treats as a HuggingFace model name (e.g., "gpt2", "bert-base-uncased")
    ///
    /// Tries to automatically detect special tokens (specialized tokens first, generic fallbacks last).
    #[must_use]
    pub fn load(identifier: &str) -> Self {
        let path = Path::new(identifier);
        let tokenizer = if path.is_dir() {
            let file = path.join("tokenizer.json");
            HfTokenizer::from_file(&file).unwrap_or_else(|e| {
                panic!("Failed to load tokenizer from '{}': {e}", file.display())
            })
        } else if path.exists() {
            HfTokenizer::from_file(identifier).unwrap_or_else(|e| {
                panic!("Failed to load tokenizer from file '{identifier}': {e}")
            })
        } else {
            HfTokenizer::from_pretrained(identifier, None)
                .unwrap_or_else(|e| panic!("Failed to load tokenizer '{identifier}': {e}"))
        };

        Self::from_hf_tokenizer(tokenizer)
    }

    /// Create from an already-loaded HuggingFace tokenizer with auto-detection of special tokens.
    /// Tries specialized tokens first, then falls back to generic ones.
    pub fn from_hf_tokenizer(tokenizer: HfTokenizer) -> Self {
        let eos_candidates = ["<eos>", "</s>", "[SEP]", "<|endoftext|>"];
        let bos_candidates = ["<bos>", "<s>", "[CLS]", "<|endoftext|>"];
        let pad_candidates = ["<pad>", "[PAD]", "</s>", "<|endoftext|>"];
        let mask_candidates = ["<mask>", "[MASK]"];

        let eos_token_id = eos_candidates
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .expect("Could not find EOS token") as usize;

        let bos_token_id = bos_candidates
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .unwrap_or(eos_token_id as u32) as usize;

        let pad_token_id = pad_candidates
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .unwrap_or(eos_token_id as u32) as usize;

        let mask_token_id = mask_candidates
            .iter()
            .find_map(|t| tokenizer.token_to_id(t))
            .map(|id| id as usize);

        Self {
            inner: tokenizer,
            pad_token_id,
            eos_token_id,
            bos_token_id,
            mask_token_id,
        }
    }

    /// GPT-2 tokenizer (vocab_size: 50257)
    #[must_use]
    pub fn gpt2() -> Self {
        Self::load("gpt2")
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::gpt2()
    }
}

impl TokenizerTrait for Tokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Vec<usize> {
        let encoding = self.inner.encode(text, add_special_tokens).unwrap();
        encoding.get_ids().iter().map(|&id| id as usize).collect()
    }

    fn encode_pair(&self, text_a: &str, text_b: &str, add_special_tokens: bool) -> Vec<usize> {
        let encoding = self
            .inner
            .encode((text_a, text_b), add_special_tokens)
            .unwrap();
        encoding.get_ids().iter().map(|&id| id as usize).collect()
    }

    fn decode(&self, token_ids: &[usize], skip_special_tokens: bool) -> String {
        let token_ids: Vec<u32> = token_ids
            .iter()
            .map(|&id| id.try_into().expect("Token id out of u32 range"))
            .collect();
        self.inner.decode(&token_ids, skip_special_tokens).unwrap()
    }

    fn token_to_id(&self, token: &str) -> Option<usize> {
        self.inner.token_to_id(token).map(|id| id as usize)
    }

    fn id_to_token(&self, id: usize) -> Option<String> {
        self.inner.id_to_token(id as u32)
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn pad_token(&self) -> usize {
        self.pad_token_id
    }

    fn eos_token(&self) -> usize {
        self.eos_token_id
    }

    fn bos_token(&self) -> usize {
        self.bos_token_id
    }

    fn mask_token(&self) -> Option<usize> {
        self.mask_token_id
    }

    fn save(&self, dir: &Path) -> std::io::Result<()> {
        let path = dir.join("tokenizer.json");
        self.inner.save(&path, false).map_err(std::io::Error::other)
    }
}
