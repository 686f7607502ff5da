use chrono::NaiveDate;
use preschool_core::db::open_db_in_memory;
use preschool_core::model::document::DocumentCategory;
use preschool_core::model::student::Student;
use preschool_core::{
    BlobStore, DocumentService, FsBlobStore, ServiceError, SqliteDocumentStore, StudentService,
    UploadRequest,
};
use uuid::Uuid;

fn upload<'a>(student_id: Uuid, file_name: &'a str, bytes: &'a [u8]) -> UploadRequest<'a> {
    UploadRequest {
        student_id,
        file_name,
        content_type: "application/pdf",
        category: DocumentCategory::Immunization,
        bytes,
    }
}

#[test]
fn upload_download_list_and_delete() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let kid = StudentService::new(store, org)
        .create_student(&Student::new("Ava", "Lee", NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        .unwrap();
    let service = DocumentService::new(store, FsBlobStore::new(dir.path()), org);

    let doc = service
        .upload(&upload(kid.id, "../shots record.pdf", b"%PDF-1.7 shots"))
        .unwrap();
    assert_eq!(doc.file_name, "shots_record.pdf");
    assert_eq!(doc.size_bytes, 14);
    assert_eq!(doc.storage_key, format!("{org}/{}/{}", kid.id, doc.id));

    let (meta, bytes) = service.download(doc.id).unwrap();
    assert_eq!(meta, doc);
    assert_eq!(bytes, b"%PDF-1.7 shots");

    let newer = service.upload(&upload(kid.id, "consent.pdf", b"ok")).unwrap();
    let listed: Vec<Uuid> = service
        .list_for_student(kid.id)
        .unwrap()
        .iter()
        .map(|doc| doc.id)
        .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&newer.id));

    service.delete(doc.id).unwrap();
    assert!(FsBlobStore::new(dir.path()).get(&doc.storage_key).unwrap().is_none());
    assert!(matches!(
        service.download(doc.id),
        Err(ServiceError::NotFound { entity: "student_documents", .. })
    ));
}

#[test]
fn upload_for_unknown_student_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let service = DocumentService::new(
        SqliteDocumentStore::new(&conn),
        FsBlobStore::new(dir.path()),
        Uuid::new_v4(),
    );

    assert!(matches!(
        service.upload(&upload(Uuid::new_v4(), "x.pdf", b"x")),
        Err(ServiceError::NotFound { entity: "students", .. })
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn missing_blob_is_reported_as_inconsistent() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let kid = StudentService::new(store, org)
        .create_student(&Student::new("Ava", "Lee", NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        .unwrap();
    let blobs = FsBlobStore::new(dir.path());
    let service = DocumentService::new(store, blobs.clone(), org);

    let doc = service.upload(&upload(kid.id, "x.pdf", b"x")).unwrap();
    assert!(blobs.delete(&doc.storage_key).unwrap());
    assert!(matches!(
        service.download(doc.id),
        Err(ServiceError::InconsistentState(_))
    ));
    // Metadata can still be removed once the blob is gone.
    service.delete(doc.id).unwrap();
}
