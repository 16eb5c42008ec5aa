//! Offline answer generator that quotes the context.
//!
//! Picks the context sentences sharing the most words with the question and
//! returns them in document order. Stands in for a language model when none
//! is configured.

use std::collections::HashSet;

use storyqa_core::traits::AnswerGenerator;
use storyqa_core::Result;

pub const NO_ANSWER: &str = "I could not find that in the document.";

#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self { max_sentences: 2 }
    }
}

impl ExtractiveGenerator {
    pub fn new(max_sentences: usize) -> Self {
        Self { max_sentences: max_sentences.max(1) }
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl AnswerGenerator for ExtractiveGenerator {
    fn generate(&self, _instruction: &str, context: &[String], question: &str) -> Result<String> {
        let wanted: HashSet<String> = words(question).collect();
        let mut seen = HashSet::new();
        // (score, position, sentence); overlapping chunks repeat sentences.
        let mut scored: Vec<(usize, usize, &str)> = Vec::new();
        for sentence in context.iter().flat_map(|c| sentences(c)) {
            if !seen.insert(sentence) {
                continue;
            }
            let score = words(sentence).filter(|w| wanted.contains(w)).count();
            if score > 0 {
                scored.push((score, scored.len(), sentence));
            }
        }
        if scored.is_empty() {
            return Ok(NO_ANSWER.to_string());
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(self.max_sentences);
        scored.sort_by_key(|s| s.1);
        Ok(scored.iter().map(|s| s.2).collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_best_matching_sentences() {
        let context = vec![
            "Paul rides a sandworm. The Fremen drink little water.".to_string(),
            "The Fremen drink little water. Sandworms produce the spice.".to_string(),
        ];
        let answer = ExtractiveGenerator::new(1).generate("", &context, "Who rides the sandworm?").unwrap();
        assert_eq!(answer, "Paul rides a sandworm.");
    }

    #[test]
    fn repeated_sentences_count_once() {
        let context = vec!["Water is life.".to_string(), "Water is life.".to_string()];
        let answer = ExtractiveGenerator::new(2).generate("", &context, "what about water").unwrap();
        assert_eq!(answer, "Water is life.");
    }

    #[test]
    fn unrelated_question_gets_fallback() {
        let context = vec!["Call me Ishmael.".to_string()];
        let answer = ExtractiveGenerator::default().generate("", &context, "sandworms?").unwrap();
        assert_eq!(answer, NO_ANSWER);
    }
}
