pub mod actions;
pub mod executor;
pub mod plugin;
pub mod queue;
pub mod result_log;
pub mod results;

pub use actions::*;
pub use executor::{execute_single, execute_station_commands};
pub use plugin::StationActionsPlugin;
pub use queue::*;
pub use result_log::{LoggedCommand, StationCommandLog};
pub use results::*;
