//! Storage abstraction layer for the Quickcare server.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, StorageError};
pub use traits::{AppointmentStore, RecordStore, UserStore};
pub use types::{
    AppointmentFilter, Page, PageParams, RecordFilter, UserFilter, DEFAULT_PAGE_SIZE,
};
