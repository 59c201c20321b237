pub mod bml;
pub mod driver;
pub mod search;
pub mod sw;

pub use bml::BestMatch;
pub use driver::{classify, map_aln_file, map_read, map_records, Classification, ReadOutcome, Scoreboard};
pub use search::{search_read, CascadeSearch, HitCounts, SearchOutcome, ThresholdPolicy};
pub use sw::{local_align, local_align_with_buf, LocalAlignment, ScoringParams, SwBuffer};
