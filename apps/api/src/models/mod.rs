pub mod checkin;
pub mod goal;
pub mod recommendation;
pub mod resource;
pub mod snapshot;
pub mod user;
