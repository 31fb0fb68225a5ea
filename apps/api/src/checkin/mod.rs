// Weekly check-ins: validation, recording and post-commit enrichment.

pub mod handlers;
pub mod hooks;
pub mod recorder;
pub mod validation;
