pub mod cwic;
pub mod granules;
pub mod handoffs;
pub mod links;
pub mod request;
pub mod size;
pub mod spatial;
pub mod store;

pub use crate::domain::model::{Action, Granule, GranuleResults, SearchState};
pub use crate::domain::ports::{Dispatch, EventEmitter};
pub use crate::utils::error::Result;
