//! Reader for CoNLL-2009 style files extended with named-entity and
//! coreference bracket columns.
//!
//! Columns: `ID FORM LEMMA PLEMMA POS PPOS FEAT PFEAT HEAD PHEAD DEPREL
//! PDEPREL FILLPRED PRED APRED... NE COREF`, one APRED column per predicate.
//! Only the predicted (`P`-prefixed) annotation columns are used.

pub mod reader;
pub mod tags;

pub use reader::{read_document, ConllError};
