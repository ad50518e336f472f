//! Interval overlap checker
//!
//! Pure admissibility test for a candidate booking slot against a tenant's
//! existing appointments. Intervals are closed-open; two intervals overlap
//! iff `start_a < end_b && start_b < end_a`. Each comparison uses the
//! duration captured on the appointment itself, so the check never resolves
//! service records and cannot silently skip a comparison.

use agendapro_domain::{Appointment, CandidateSlot};
use uuid::Uuid;

/// Decide whether a candidate slot collides with any existing appointment.
///
/// Appointments on other dates are ignored, as is the appointment whose id
/// matches `exclude_id` (the edit-in-place case). Zero-duration candidates
/// degenerate to empty intervals and never conflict, since the comparison is
/// strict. Callers are expected to pre-filter cancelled appointments out of
/// `existing`.
pub fn has_conflict(
    candidate: &CandidateSlot,
    exclude_id: Option<Uuid>,
    existing: &[Appointment],
) -> bool {
    let start = candidate.start_minutes();
    let end = candidate.end_minutes();

    existing
        .iter()
        .filter(|appointment| appointment.date == candidate.date)
        .filter(|appointment| exclude_id != Some(appointment.id))
        .any(|appointment| start < appointment.end_minutes() && appointment.start_minutes() < end)
}
