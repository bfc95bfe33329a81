//! Writes minimal primary headers for tests.

use crate::{BLOCK_SIZE, CARD_SIZE, Header};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Logical(bool),
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Literal,
}

impl Card {
    pub fn new(keyword: impl Into<String>, value: Literal) -> Self {
        Self { keyword: keyword.into(), value }
    }

    fn render(&self) -> String {
        let value = match &self.value {
            Literal::String(s) => format!("'{:<8}'", s.replace('\'', "''")),
            Literal::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Literal::Integer(i) => format!("{i:>20}"),
            Literal::Float(f) => {
                let mut text = f.to_string();
                if !text.contains(['.', 'e', 'E']) {
                    text.push_str(".0");
                }
                format!("{text:>20}")
            },
        };
        format!("{:<8}= {value}", self.keyword)
    }
}

/// Encode `cards` followed by `END`, padded to whole blocks.
pub fn encode(cards: &[Card]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BLOCK_SIZE);
    for line in cards.iter().map(Card::render).chain(["END".to_string()]) {
        let mut line = line.into_bytes();
        line.resize(CARD_SIZE, b' ');
        bytes.extend_from_slice(&line[..CARD_SIZE]);
    }
    bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, b' ');
    bytes
}

/// Parse `cards` back through [`Header::read`].
pub fn header(cards: &[Card]) -> Header {
    Header::read(encode(cards).as_slice()).unwrap()
}
