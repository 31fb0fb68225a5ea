// Read-only resource library.

pub mod handlers;
