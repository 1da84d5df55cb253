mod log_iterator;
mod log_manager;
mod log_record;

pub use log_iterator::LogIterator;
pub use log_manager::{LogManager, LogManagerError};
pub use log_record::{LogRecord, LogRecordError, RecordType};
