//! Telegram webhook handling and request processing

pub mod handler;
pub mod parsing;
pub mod signature;

pub use handler::{
    AppState, SummaryJob, create_router, drain_summary_jobs, handle_update, run_summary_job,
};
