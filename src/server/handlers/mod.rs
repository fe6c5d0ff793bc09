pub mod ask;
pub mod graph;
pub mod health;
pub mod mask;
