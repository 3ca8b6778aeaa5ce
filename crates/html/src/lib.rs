//! HTML parsing: tokenizer, tree builder, and an arena document tree.
//!
//! The pipeline is decoder → tokenizer → tree builder → [`Dom`]. Input is a
//! complete string (or byte buffer routed through the sniffing decoder);
//! the tokenizer is a single-pass scanner and the tree builder applies the
//! HTML5 tree-construction shape: scaffolding, foster parenting, foreign
//! content, and deterministic formatting recoveries. Malformed input never
//! fails a parse; errors are structured values, and only strict mode (or an
//! option conflict) returns `Err`.

pub mod dom;
pub mod error;
pub mod serialize;
pub mod tokenizer;

mod decode;
mod entities;
mod select;
mod session;
mod stream;
mod tag_tables;
mod tree_builder;

pub use crate::decode::decode_bytes;
pub use crate::dom::{Dom, Namespace, NodeData, NodeId, Origin};
pub use crate::error::{ErrorCode, ErrorOrigin, ParseError, ParseFailure};
pub use crate::select::{Selector, SelectorParseError};
pub use crate::session::{ParseOptions, Parsed, parse, parse_bytes, parse_fragment};
pub use crate::stream::{StreamEvent, StreamEvents, stream};
pub use crate::tokenizer::{Token, TokenKind, Tokenizer, tokenize};
pub use crate::tree_builder::FragmentContext;
