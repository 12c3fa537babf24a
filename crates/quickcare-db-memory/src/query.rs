//! Filtering and pagination helpers for the in-memory backend.

use quickcare_core::{Appointment, MedicalRecord, User};
use quickcare_storage::{AppointmentFilter, Page, PageParams, RecordFilter, UserFilter};

/// Counts a full match set and slices out one page.
pub(crate) fn paginate<T>(items: Vec<T>, params: &PageParams) -> Page<T> {
    let total = items.len() as u64;
    let page_items = items
        .into_iter()
        .skip(params.offset())
        .take(params.limit as usize)
        .collect();
    Page::new(page_items, total, params)
}

pub(crate) fn user_matches(user: &User, filter: &UserFilter) -> bool {
    if let Some(role) = filter.role {
        if user.role != role {
            return false;
        }
    }
    if let Some(active) = filter.effective_active() {
        if user.active != active {
            return false;
        }
    }
    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        let hit = user.name.to_lowercase().contains(&needle)
            || user.email.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }
    true
}

pub(crate) fn appointment_matches(appt: &Appointment, filter: &AppointmentFilter) -> bool {
    if let Some(patient_id) = filter.patient_id {
        if appt.patient_id != patient_id {
            return false;
        }
    }
    if let Some(doctor_id) = filter.doctor_id {
        if appt.doctor_id != doctor_id {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if appt.status != status {
            return false;
        }
    }
    if let Some(date) = filter.date {
        if appt.date != date {
            return false;
        }
    }
    true
}

pub(crate) fn record_matches(record: &MedicalRecord, filter: &RecordFilter) -> bool {
    if !record.active {
        return false;
    }
    if let Some(patient_id) = filter.patient_id {
        if record.patient_id != patient_id {
            return false;
        }
    }
    if let Some(doctor_id) = filter.doctor_id {
        if record.doctor_id != doctor_id {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcare_core::Role;

    #[test]
    fn test_paginate_slices_and_counts() {
        let params = PageParams::new(2, 3);
        let page = paginate((1..=8).collect::<Vec<u32>>(), &params);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 8);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_paginate_past_the_end() {
        let params = PageParams::new(5, 10);
        let page = paginate(vec![1, 2, 3], &params);
        assert!(page.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_user_search_is_case_insensitive() {
        let user = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        let filter = UserFilter {
            search: Some("JANE".into()),
            ..Default::default()
        };
        assert!(user_matches(&user, &filter));

        let filter = UserFilter {
            search: Some("example.com".into()),
            ..Default::default()
        };
        assert!(user_matches(&user, &filter));

        let filter = UserFilter {
            search: Some("smith".into()),
            ..Default::default()
        };
        assert!(!user_matches(&user, &filter));
    }

    #[test]
    fn test_user_filter_excludes_inactive_by_default() {
        let mut user = User::new("Jane Roe", "jane@example.com", "hash", Role::Patient);
        user.active = false;
        assert!(!user_matches(&user, &UserFilter::default()));
        let filter = UserFilter {
            active: Some(false),
            ..Default::default()
        };
        assert!(user_matches(&user, &filter));
    }
}
