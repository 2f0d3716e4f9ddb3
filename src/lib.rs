// src/lib.rs

pub mod chain;
pub mod config;
pub mod effective_field;
pub mod energy;
pub mod error;
pub mod external_field;
pub mod fit;
pub mod ground_state;
pub mod initial_states;
pub mod kinematics;
pub mod llg;
pub mod ode;
pub mod params;
pub mod phase;
pub mod trajectory;
pub mod vec3;

pub use error::ChainError;
