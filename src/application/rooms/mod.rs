mod create_room;
mod join_room;
mod leave_room;
mod play_again;
mod set_options;
mod start_game;

pub use create_room::*;
pub use join_room::*;
pub use leave_room::*;
pub use play_again::*;
pub use set_options::*;
pub use start_game::*;
