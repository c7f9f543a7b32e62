pub mod ai_worker;
pub mod game;
pub mod publish;
pub mod rooms;
