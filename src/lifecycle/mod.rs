//! Topic lifecycle core
//!
//! The parts with real invariants: the vote ledger and its re-vote rule
//! (`ledger`), the archive-and-rotate transaction (`archive`), the weekly
//! proposal clear (`rotation`), and the shared sweep both trigger sources
//! run (`trigger`).

pub mod archive;
pub mod ledger;
pub mod rotation;
pub mod trigger;

pub use archive::{archive_if_due, archive_topic, ArchiveOutcome};
pub use ledger::{cast_vote, is_revoter, VoteOutcome};
pub use rotation::rotate_proposals_if_due;
pub use trigger::{check_topics, sweep, SweepReport};
