use super::*;
use crate::DbClient;

async fn setup() -> SqlDirectoryRepository {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let repo = SqlDirectoryRepository::new(client);
    repo.init_schema().await.unwrap();
    repo
}

#[tokio::test]
async fn doctors_by_ids_skips_unknown_ids() {
    let repo = setup().await;
    repo.save_doctor(DoctorProfile {
        id: 1,
        name: Some("Dr. Salma".to_string()),
        image: Some("https://cdn.example/salma.png".to_string()),
    })
    .await
    .unwrap();

    let mut found = repo.doctors_by_ids(&[1, 2]).await.unwrap();
    assert_eq!(found.len(), 1);
    let doctor = found.remove(0);
    assert_eq!(doctor.name.as_deref(), Some("Dr. Salma"));
    assert!(repo.doctors_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn patients_carry_section_flags() {
    let repo = setup().await;
    repo.save_patient(PatientRecord {
        id: 10,
        doctor_id: Some(1),
        name: Some("Patient A".to_string()),
        hospital: Some("Kasr Al Ainy".to_string()),
        governorate: Some("Cairo".to_string()),
        submit_status: true,
        outcome_status: false,
    })
    .await
    .unwrap();

    let patients = repo.patients_by_ids(&[10]).await.unwrap();
    assert_eq!(patients.len(), 1);
    assert!(patients[0].submit_status);
    assert!(!patients[0].outcome_status);
    assert_eq!(patients[0].doctor_id, Some(1));
}
