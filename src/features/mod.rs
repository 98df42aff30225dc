pub mod deliver;
pub mod summarize;

pub use summarize::SummaryEngine;
