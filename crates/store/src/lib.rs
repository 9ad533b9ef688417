pub mod db;
pub mod merge;
pub mod query;
pub mod runs;
pub mod schema;
pub mod source;

pub use db::Store;
pub use merge::MergeOutcome;
