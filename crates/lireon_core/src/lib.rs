pub mod domain;
pub mod ports;
pub mod progress;
pub mod reading_log;
pub mod stats;

pub use domain::{
    Book, BookStatus, BookUpdate, Goals, NewBook, PageLog, Preference, ReadingSession, User,
};
pub use ports::{DatabaseService, PortError, PortResult, PreferenceStore};
pub use reading_log::ReadingLog;
