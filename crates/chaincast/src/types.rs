//! # Common Types

/// Integer id assigned to a token or event by a vocabulary.
pub type TokenId = u32;

/// The unknown-token string.
pub const UNK_TOK: &str = "<unk>";

/// The pad-token string.
pub const PAD_TOK: &str = "<pad>";

/// The reserved id of [`UNK_TOK`].
///
/// Unseen tokens numericalize to this id.
pub const UNK_ID: TokenId = 0;

/// The reserved id of [`PAD_TOK`].
///
/// Sequence fields are extended with this id when padded.
pub const PAD_ID: TokenId = 1;
