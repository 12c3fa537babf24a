//! Filter and pagination types shared by all storage backends.

use quickcare_core::{AppointmentStatus, Role};
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 1-based pagination parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * (self.limit as usize)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the full match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matches across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            self.total.div_ceil(self.limit as u64) as u32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maps the page items, keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Filter for user list queries.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Case-insensitive substring over name and email.
    pub search: Option<String>,
    /// Defaults to active-only when `None`.
    pub active: Option<bool>,
}

impl UserFilter {
    /// The effective active flag: list queries exclude deactivated
    /// accounts unless asked otherwise.
    pub fn effective_active(&self) -> Option<bool> {
        self.active.or(Some(true))
    }
}

/// Filter for appointment list queries.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Exact calendar day.
    pub date: Option<Date>,
}

/// Filter for medical record list queries. Inactive records are always
/// excluded by backends.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}
