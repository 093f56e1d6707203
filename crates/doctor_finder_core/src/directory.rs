//! crates/doctor_finder_core/src/directory.rs
//!
//! Browsing helpers over the doctor list: the department and hospital
//! indexes and the patient-facing filters.

use std::collections::BTreeSet;

use crate::domain::Doctor;

/// Criteria for listing doctors. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct DoctorFilter {
    /// Exact department match, ignoring case and surrounding whitespace.
    pub department: Option<String>,
    /// Exact hospital match, ignoring case and surrounding whitespace.
    pub hospital: Option<String>,
    /// Substring of the name, department or hospital.
    pub query: Option<String>,
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(normalized)
        .filter(|v| !v.is_empty())
}

impl DoctorFilter {
    pub fn matches(&self, doctor: &Doctor) -> bool {
        if let Some(department) = non_blank(&self.department) {
            if normalized(&doctor.department) != department {
                return false;
            }
        }
        if let Some(hospital) = non_blank(&self.hospital) {
            if normalized(&doctor.hospital) != hospital {
                return false;
            }
        }
        if let Some(query) = non_blank(&self.query) {
            let hit = [&doctor.name, &doctor.department, &doctor.hospital]
                .iter()
                .any(|field| field.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }
        true
    }
}

pub fn filter_doctors(doctors: Vec<Doctor>, filter: &DoctorFilter) -> Vec<Doctor> {
    doctors.into_iter().filter(|d| filter.matches(d)).collect()
}

/// Distinct, sorted department names, optionally narrowed by a search term.
pub fn departments(doctors: &[Doctor], search: Option<&str>) -> Vec<String> {
    distinct(doctors.iter().map(|d| d.department.as_str()), search)
}

/// Distinct, sorted hospital names, optionally narrowed by a search term.
pub fn hospitals(doctors: &[Doctor], search: Option<&str>) -> Vec<String> {
    distinct(doctors.iter().map(|d| d.hospital.as_str()), search)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>, search: Option<&str>) -> Vec<String> {
    let needle = search.map(normalized).filter(|s| !s.is_empty());
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| match &needle {
            Some(n) => v.to_lowercase().contains(n),
            None => true,
        })
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
