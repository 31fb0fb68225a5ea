// Goals: user CRUD, check-in driven auto-progression and rule-based suggestions.

pub mod handlers;
pub mod progression;
pub mod suggestions;
