pub mod component;
pub mod config;
pub mod contract;
pub mod entity;
pub mod error;
pub mod runtime;
pub mod schedule;
pub mod storage;
pub mod system;
pub(crate) mod util;
pub mod world;

pub use component::Component;
pub use strata_macros::Component;
pub use config::{PlannerKind, RuntimeConfig};
pub use contract::{Violation, ViolationHandler, ViolationKind};
pub use entity::{Entity, Range};
pub use error::Error;
pub use runtime::Runtime;
pub use schedule::Schedule;
pub use world::World;

pub use system::{Commands, Options, System, SystemHandle, With, Without};
