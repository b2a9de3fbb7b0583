pub mod turn;

pub use turn::{process_event, process_events, tenant_for, BatchOutcome};
