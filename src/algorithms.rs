pub mod evaluation;
pub mod update;
