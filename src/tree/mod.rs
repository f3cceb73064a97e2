//! Directory tree walking logic
//!
//! [`TreeWalker`] builds the filtered tree in memory. Everything downstream
//! (content reading, formatting, JSON) works on the resulting [`TreeNode`].

mod config;
mod gitignore;
mod node;
mod utils;
mod walker;

pub use config::WalkerConfig;
pub use gitignore::GitignoreStack;
pub use node::{ChangeMarker, EntryIssue, TreeNode};
pub use utils::{compare_entries, format_size, sort_nodes};
pub use walker::TreeWalker;
