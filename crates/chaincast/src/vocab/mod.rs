//! # Event and Text Vocabularies
//!
//! See:
//! * [`token_vocab`] for the immutable string↔id mapping.
//! * [`builder`] to induce vocabularies from a corpus.
//! * [`io`] for vocabulary persistence.

pub mod builder;
pub mod io;
pub mod token_vocab;

pub use builder::{VocabBuilderOptions, VocabCounter, build_event_vocab, build_text_vocab};
pub use io::{load_vocab_path, save_vocab_path};
pub use token_vocab::Vocab;
