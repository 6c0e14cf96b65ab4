pub mod job;
pub mod loaders;
pub mod log_event;
pub mod record;

pub use job::{Credentials, ExecutionMode, JobConfig, JobStatus, Scenario, DEFAULT_BATCH_SIZE};
pub use loaders::{load_records, parse};
pub use log_event::{LogEvent, Severity};
pub use record::{Batch, FieldValue, Record, ID_FIELD};
