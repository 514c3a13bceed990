// Git backend for Shelvery
// This crate wraps libgit2 with the operations the changelist and shelve
// stores need: status buckets, blob content, staging, commit and checkout.

mod repository;
mod status;

pub use repository::{Commit, Repository};
pub use status::{RenamedPath, StatusSnapshot};
