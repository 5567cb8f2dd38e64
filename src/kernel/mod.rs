pub mod event;
pub mod mutation;
pub mod reactor;
pub mod relabel;
pub mod scheduler;
pub mod segment;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod time;
