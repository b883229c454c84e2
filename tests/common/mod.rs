#![allow(dead_code)]

pub mod mocks;

use bankiq::types::Document;

/// Build a document whose text is `sentence` repeated until it reaches
/// `min_chars`, so it clears the chunker's minimum length.
pub fn filing(bank: &str, year: &str, file: &str, sentence: &str, min_chars: usize) -> Document {
    let mut text = String::new();
    while text.len() < min_chars {
        text.push_str(sentence);
        text.push(' ');
    }
    Document {
        bank: bank.to_string(),
        year: year.to_string(),
        filing_type: "10-K".to_string(),
        file: file.to_string(),
        text,
    }
}
