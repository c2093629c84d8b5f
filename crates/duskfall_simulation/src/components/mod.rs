//! ECS Components для симуляции враждебных агентов
//!
//! Организация по доменам:
//! - agent: базовые характеристики (id, health, скорость движения)
//! - perception: параметры восприятия (sight range, FOV, eye height)
//! - waypoints: патрульные маршруты (WaypointPath, PatrolAssignment)

pub mod agent;
pub mod perception;
pub mod waypoints;

// Re-exports для удобного импорта
pub use agent::*;
pub use perception::*;
pub use waypoints::*;
