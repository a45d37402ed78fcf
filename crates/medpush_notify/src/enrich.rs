//! Feed enrichment
//!
//! Feed entries carry display fields of the patient and doctor they refer to.
//! Referenced entities are loaded in one batch per kind for a whole feed, and
//! a missing entity still yields a fully shaped object with null leaves.

use medpush_common::models::{DoctorProfile, Notification, PatientRecord};
use medpush_db::{DbError, DirectoryRepository};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Public profile fields of a doctor.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStatus {
    pub submit_status: bool,
    pub outcome_status: bool,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub hospital: Option<String>,
    pub governorate: Option<String>,
    /// The doctor who owns the patient record
    pub doctor: DoctorSummary,
    pub sections: SectionStatus,
}

/// A notification as shown in the feed.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub patient: PatientSummary,
    pub type_doctor: DoctorSummary,
}

impl From<&DoctorProfile> for DoctorSummary {
    fn from(doctor: &DoctorProfile) -> Self {
        Self {
            id: Some(doctor.id),
            name: doctor.name.clone(),
            image: doctor.image.clone(),
        }
    }
}

/// Referenced entities loaded for one feed.
#[derive(Debug, Default)]
pub struct References {
    patients: HashMap<i64, PatientRecord>,
    doctors: HashMap<i64, DoctorProfile>,
}

impl References {
    fn doctor(&self, id: Option<i64>) -> DoctorSummary {
        id.and_then(|id| self.doctors.get(&id))
            .map(DoctorSummary::from)
            .unwrap_or_default()
    }

    fn patient(&self, id: Option<i64>) -> PatientSummary {
        match id.and_then(|id| self.patients.get(&id)) {
            Some(patient) => PatientSummary {
                id: Some(patient.id),
                name: patient.name.clone(),
                hospital: patient.hospital.clone(),
                governorate: patient.governorate.clone(),
                doctor: self.doctor(patient.doctor_id),
                sections: SectionStatus {
                    submit_status: patient.submit_status,
                    outcome_status: patient.outcome_status,
                },
            },
            None => PatientSummary::default(),
        }
    }

    /// Attaches the loaded display fields to one notification.
    pub fn view(&self, notification: Notification) -> NotificationView {
        NotificationView {
            patient: self.patient(notification.patient_id),
            type_doctor: self.doctor(notification.type_doctor_id),
            notification,
        }
    }
}

/// Read access to the doctor/patient directory for enrichment.
pub struct Directory<D> {
    repo: D,
}

impl<D: DirectoryRepository> Directory<D> {
    pub fn new(repo: D) -> Self {
        Self { repo }
    }

    /// Loads every patient and doctor the given notifications refer to
    ///
    /// Issues at most one patient query and one doctor query. Patient owners
    /// are loaded together with the triggering doctors.
    pub async fn load<'n>(
        &self,
        notifications: impl IntoIterator<Item = &'n Notification>,
    ) -> Result<References, DbError> {
        let mut patient_ids = BTreeSet::new();
        let mut doctor_ids = BTreeSet::new();
        for notification in notifications {
            patient_ids.extend(notification.patient_id);
            doctor_ids.extend(notification.type_doctor_id);
        }

        let patient_ids: Vec<i64> = patient_ids.into_iter().collect();
        let patients = if patient_ids.is_empty() {
            Vec::new()
        } else {
            self.repo.patients_by_ids(&patient_ids).await?
        };
        doctor_ids.extend(patients.iter().filter_map(|p| p.doctor_id));

        let doctor_ids: Vec<i64> = doctor_ids.into_iter().collect();
        let doctors = if doctor_ids.is_empty() {
            Vec::new()
        } else {
            self.repo.doctors_by_ids(&doctor_ids).await?
        };

        debug!(
            "Loaded {} patients and {} doctors for feed enrichment",
            patients.len(),
            doctors.len()
        );

        Ok(References {
            patients: patients.into_iter().map(|p| (p.id, p)).collect(),
            doctors: doctors.into_iter().map(|d| (d.id, d)).collect(),
        })
    }
}
