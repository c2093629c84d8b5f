//! AI components (FSM state, configs, escalation record, watcher-архетип).

pub mod fsm;
pub mod watcher;

pub use fsm::*;
pub use watcher::*;
