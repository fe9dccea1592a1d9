//! Git operations using the git CLI
//!
//! Provides functionality for:
//! - Running git scoped to a repository directory
//! - Listing and classifying local branches
//! - Listing tags
//! - Managing the origin remote

mod branch;
mod command;
mod remote;
mod tag;

pub use branch::*;
pub use command::*;
pub use remote::*;
pub use tag::*;

#[cfg(test)]
pub(crate) use command::tests::FakeGit;
