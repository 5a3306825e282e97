//! # Token Vocabulary Index

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{PAD_ID, PAD_TOK, TokenId, UNK_ID, UNK_TOK};

/// A bidirectional mapping between token/event strings and integer ids.
///
/// Ids 0 and 1 are reserved for [`UNK_TOK`] and [`PAD_TOK`] regardless of
/// corpus content. A `Vocab` is immutable after construction; datasets and
/// encoders receive a shared reference and never mutate or re-derive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VocabEncoding", into = "VocabEncoding")]
pub struct Vocab {
    itos: Vec<String>,
    stoi: HashMap<String, TokenId>,
}

/// Persisted form of a [`Vocab`]: the id→token table alone.
///
/// The reverse map is rebuilt on load, so serialize/deserialize
/// round-trips the token↔id mapping exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabEncoding {
    itos: Vec<String>,
}

impl From<VocabEncoding> for Vocab {
    fn from(encoding: VocabEncoding) -> Self {
        Vocab::from_itos(encoding.itos)
    }
}

impl From<Vocab> for VocabEncoding {
    fn from(vocab: Vocab) -> Self {
        VocabEncoding { itos: vocab.itos }
    }
}

impl Vocab {
    /// Build a vocabulary from an ordered token list.
    ///
    /// The list must start with the reserved tokens in slot order; the
    /// [`builder`](crate::vocab::builder) and the deserializer both
    /// guarantee this. On a duplicate token, the first occurrence wins.
    pub fn from_itos(itos: Vec<String>) -> Self {
        debug_assert!(itos.len() >= 2);
        debug_assert_eq!(itos[UNK_ID as usize], UNK_TOK);
        debug_assert_eq!(itos[PAD_ID as usize], PAD_TOK);

        let mut stoi = HashMap::with_capacity(itos.len());
        for (id, token) in itos.iter().enumerate() {
            stoi.entry(token.clone()).or_insert(id as TokenId);
        }
        Vocab { itos, stoi }
    }

    /// The number of entries, reserved tokens included.
    pub fn len(&self) -> usize {
        self.itos.len()
    }

    /// Returns true if the vocabulary holds only the reserved tokens.
    pub fn is_empty(&self) -> bool {
        self.itos.len() <= 2
    }

    /// Returns true if the token is in the vocabulary.
    pub fn contains(
        &self,
        token: &str,
    ) -> bool {
        self.stoi.contains_key(token)
    }

    /// Look up a token, mapping unseen tokens to [`UNK_ID`].
    pub fn lookup(
        &self,
        token: &str,
    ) -> TokenId {
        self.stoi.get(token).copied().unwrap_or(UNK_ID)
    }

    /// Look up an id.
    ///
    /// ## Returns
    /// The token string, or None if the id is out of range.
    pub fn token(
        &self,
        id: TokenId,
    ) -> Option<&str> {
        self.itos.get(id as usize).map(String::as_str)
    }

    /// Map a token sequence through the vocabulary.
    pub fn numericalize<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Vec<TokenId> {
        tokens.iter().map(|t| self.lookup(t.as_ref())).collect()
    }

    /// The full id→token table.
    pub fn itos(&self) -> &[String] {
        &self.itos
    }
}
