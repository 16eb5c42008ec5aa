use candle_core::{Device, Tensor};
use storyqa_core::{Error, Result};
use tokenizers::Tokenizer;

use crate::model::candle_err;

/// Encode `text` into `[1, T]` id and attention-mask tensors. Inputs that
/// encode to more than `max_tokens` tokens are rejected, never truncated.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_tokens: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
    let ids = enc.get_ids();
    if ids.len() > max_tokens {
        return Err(Error::InputTooLarge { len: ids.len(), max: max_tokens });
    }
    let len = ids.len();
    let input_ids = Tensor::new(ids, device).and_then(|t| t.reshape((1, len))).map_err(candle_err)?;
    let attention_mask = Tensor::new(enc.get_attention_mask(), device).and_then(|t| t.reshape((1, len))).map_err(candle_err)?;
    Ok((input_ids, attention_mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokenizers::models::wordlevel::WordLevel;

    // No pre-tokenizer: the whole input is one word, so one token.
    fn one_token_tokenizer() -> Tokenizer {
        let vocab = HashMap::from([("[UNK]".to_string(), 0u32), ("spice".to_string(), 1u32)]);
        let model = WordLevel::builder().vocab(vocab).unk_token("[UNK]".into()).build().unwrap();
        Tokenizer::new(model)
    }

    #[test]
    fn sequence_length_follows_input() {
        let (ids, mask) = tokenize_on_device(&one_token_tokenizer(), "spice", 8, &Device::Cpu).unwrap();
        assert_eq!(ids.dims(), &[1, 1]);
        assert_eq!(mask.dims(), &[1, 1]);
        assert_eq!(ids.to_vec2::<u32>().unwrap(), vec![vec![1]]);
    }

    #[test]
    fn overlong_input_is_rejected_not_truncated() {
        let err = tokenize_on_device(&one_token_tokenizer(), "spice", 0, &Device::Cpu).unwrap_err();
        assert!(matches!(err, Error::InputTooLarge { len: 1, max: 0 }));
    }
}
