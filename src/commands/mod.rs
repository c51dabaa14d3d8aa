pub mod dedupe;
pub mod report;
pub mod status;
