use crate::test_support::{fixture, noon, Fixture, RecordingGateway};
use chrono::Duration;
use medpush_common::models::NewNotification;

async fn seed(f: &Fixture, doctor_id: i64, count: usize) {
    for n in 0..count {
        f.hub
            .store()
            .create(NewNotification::new(doctor_id, "Other", format!("note {}", n)))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(1));
    }
}

#[tokio::test]
async fn create_stamps_an_unread_row_with_the_clock() {
    let f = fixture(RecordingGateway::new()).await;

    let stored = f
        .hub
        .store()
        .create(
            NewNotification::new(7, "Outcome", "Outcome submitted")
                .with_type_id(Some(31))
                .with_patient(Some(12))
                .with_type_doctor(Some(9)),
        )
        .await
        .unwrap();

    assert!(!stored.read);
    assert_eq!(stored.created_at, noon());
    assert_eq!(stored.kind, "Outcome");
    assert_eq!(stored.type_id, Some(31));
    assert_eq!(f.hub.store().find(stored.id).await.unwrap(), Some(stored));
}

#[tokio::test]
async fn paginate_reports_page_metadata() {
    let f = fixture(RecordingGateway::new()).await;
    seed(&f, 7, 23).await;

    let page = f.hub.store().for_doctor(7).paginate(3, 10).await.unwrap();

    assert_eq!(page.data.len(), 3);
    assert_eq!(page.current_page, 3);
    assert_eq!(page.per_page, 10);
    assert_eq!(page.total, 23);
    assert_eq!(page.last_page, 3);
    assert_eq!(page.from, Some(21));
    assert_eq!(page.to, Some(23));
    // newest first, so the last page holds the oldest rows
    assert_eq!(page.data.last().map(|n| n.content.as_str()), Some("note 0"));
}

#[tokio::test]
async fn page_zero_means_first_page() {
    let f = fixture(RecordingGateway::new()).await;
    seed(&f, 7, 4).await;

    let page = f.hub.store().for_doctor(7).paginate(0, 10).await.unwrap();

    assert_eq!(page.current_page, 1);
    assert_eq!(page.data.len(), 4);
    assert_eq!(page.data[0].content, "note 3");
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let f = fixture(RecordingGateway::new()).await;
    seed(&f, 7, 4).await;

    let page = f.hub.store().for_doctor(7).paginate(5, 10).await.unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.total, 4);
    assert_eq!(page.last_page, 1);
    assert_eq!(page.from, None);
    assert_eq!(page.to, None);
}

#[tokio::test]
async fn empty_result_still_has_one_page() {
    let f = fixture(RecordingGateway::new()).await;

    let page = f.hub.store().for_doctor(7).paginate(1, 10).await.unwrap();

    assert_eq!(page.total, 0);
    assert_eq!(page.last_page, 1);
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn time_windows_split_at_the_boundary() {
    let f = fixture(RecordingGateway::new()).await;
    seed(&f, 7, 6).await;
    let boundary = noon() + Duration::minutes(2);

    let store = f.hub.store();
    let before = store.for_doctor(7).created_before(boundary).all().await.unwrap();
    let since = store
        .for_doctor(7)
        .created_on_or_after(boundary)
        .all()
        .await
        .unwrap();

    assert_eq!(before.len(), 2);
    assert_eq!(since.len(), 4);
    assert_eq!(since.last().map(|n| n.created_at), Some(boundary));
    assert_eq!(
        store.for_doctor(7).created_before(boundary).count().await.unwrap(),
        2
    );
}

#[tokio::test]
async fn queries_are_scoped_to_the_doctor() {
    let f = fixture(RecordingGateway::new()).await;
    seed(&f, 7, 3).await;
    seed(&f, 8, 2).await;

    assert_eq!(f.hub.store().for_doctor(8).count().await.unwrap(), 2);
    assert_eq!(f.hub.store().count_unread(7).await.unwrap(), 3);
}

#[tokio::test]
async fn bulk_create_writes_every_row() {
    let f = fixture(RecordingGateway::new()).await;
    let rows = (1..=4)
        .map(|doctor_id| NewNotification::new(doctor_id, "Other", "Ward round moved"))
        .collect();

    assert_eq!(f.hub.store().bulk_create(rows).await.unwrap(), 4);
    for doctor_id in 1..=4 {
        assert_eq!(f.hub.store().count_unread(doctor_id).await.unwrap(), 1);
    }
}

#[tokio::test]
async fn mark_read_and_delete_report_whether_anything_changed() {
    let f = fixture(RecordingGateway::new()).await;
    let stored = f
        .hub
        .store()
        .create(NewNotification::new(7, "Other", "hello"))
        .await
        .unwrap();
    let store = f.hub.store();

    assert!(store.mark_read(stored.id).await.unwrap());
    assert!(!store.mark_read(stored.id).await.unwrap());
    assert!(store.delete(stored.id).await.unwrap());
    assert!(!store.delete(stored.id).await.unwrap());
    assert_eq!(store.find(stored.id).await.unwrap(), None);
}
