//! Code completion on top of the resolver
//!
//! [`detect_context`] decides what the caret asks for; [`complete`] turns
//! that into proposals using a resolution context placed at the caret.

mod complete;
mod detect;
mod filter;
mod options;

pub use complete::{CompletionItem, complete};
pub use detect::{CompletionContext, detect_context};
pub use filter::MemberFilter;
pub use options::CompletionOptions;
