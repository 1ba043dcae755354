// Domain layer: search state, actions, request DTOs and ports.

pub mod model;
pub mod ports;
pub mod search;
