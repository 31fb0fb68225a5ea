// AI recommendations: cooldown gate, generator seam and batch history.

pub mod gate;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod service;
