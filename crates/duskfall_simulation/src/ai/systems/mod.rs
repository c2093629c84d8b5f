//! AI systems: FSM, alert network, escalation, реакции на события

pub mod alert;
pub mod escalation;
pub mod fsm;
pub mod movement;
pub mod reactions;
pub mod watcher;

pub use alert::{broadcast_alerts, register_agents, AgentRegistry};
pub use escalation::step_escalation;
pub use fsm::sentinel_fsm_transitions;
pub use movement::movement_from_state;
pub use reactions::{handle_agent_death, process_escort_calls, react_to_hits};
pub use watcher::{update_distortion, watcher_fsm_transitions};
