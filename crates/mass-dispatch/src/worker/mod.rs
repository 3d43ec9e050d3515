pub mod scheduled_dispatch_worker;

pub use scheduled_dispatch_worker::{ScheduledDispatchWorker, TriggerReport};
