use chrono::NaiveDate;
use preschool_core::db::open_db_in_memory;
use preschool_core::model::attendance::AttendanceStatus;
use preschool_core::model::class::Class;
use preschool_core::model::organization::{Organization, OrganizationSettings};
use preschool_core::model::student::Student;
use preschool_core::{
    AttendanceService, CheckInRequest, ClassService, OrganizationService, ServiceError,
    SqliteDocumentStore, SqliteOrganizationRepository, StudentService,
};
use rusqlite::Connection;
use uuid::Uuid;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> i64 {
    date.and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

fn check_in_request(student_id: Uuid, date: NaiveDate, hour: u32, minute: u32) -> CheckInRequest {
    CheckInRequest {
        student_id,
        date,
        at_epoch_ms: at(date, hour, minute),
        checked_in_by: Some("parent".to_string()),
        notes: None,
    }
}

struct Fixture {
    org: Uuid,
    class_id: Uuid,
    students: Vec<Uuid>,
}

fn seed(conn: &Connection, count: usize) -> Fixture {
    let store = SqliteDocumentStore::new(conn);
    let org = Uuid::new_v4();
    let room = ClassService::new(store, org)
        .create_class(&Class::new("Robins", 20))
        .unwrap();
    let students = StudentService::new(store, org);
    let ids = (0..count)
        .map(|index| {
            let mut student = Student::new(
                format!("Kid{index}"),
                "Lee",
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            );
            student.class_id = Some(room.id);
            students.create_student(&student).unwrap().id
        })
        .collect();
    Fixture {
        org,
        class_id: room.id,
        students: ids,
    }
}

#[test]
fn check_in_classifies_present_and_late() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2);
    let service = AttendanceService::new(SqliteDocumentStore::new(&conn), fixture.org);

    let on_time = service
        .check_in(&check_in_request(fixture.students[0], day(2), 7, 15))
        .unwrap();
    assert_eq!(on_time.status, AttendanceStatus::Present);
    assert_eq!(on_time.class_id, Some(fixture.class_id));

    let late = service
        .check_in(&check_in_request(fixture.students[1], day(2), 7, 16))
        .unwrap();
    assert_eq!(late.status, AttendanceStatus::Late);

    assert!(matches!(
        service.check_in(&check_in_request(fixture.students[0], day(2), 8, 0)),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn late_threshold_follows_organization_settings() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let organizations = OrganizationService::new(SqliteOrganizationRepository::new(&conn), store);
    let org = organizations
        .create_organization(&Organization::new("Little Acorns"))
        .unwrap();

    let mut settings: OrganizationSettings = organizations.get_settings(org.id).unwrap();
    settings.opening_time = "08:30".to_string();
    settings.late_after_minutes = 0;
    // Local time is UTC+2.
    settings.utc_offset_minutes = 120;
    organizations.update_settings(&settings).unwrap();

    let students = StudentService::new(store, org.id);
    let kid = students
        .create_student(&Student::new("Ava", "Lee", NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        .unwrap();
    let service = AttendanceService::new(store, org.id);

    // 06:45 UTC is 08:45 local.
    let record = service
        .check_in(&check_in_request(kid.id, day(3), 6, 45))
        .unwrap();
    assert_eq!(record.status, AttendanceStatus::Late);
}

#[test]
fn late_threshold_beyond_closing_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let organizations = OrganizationService::new(SqliteOrganizationRepository::new(&conn), store);
    let org = organizations
        .create_organization(&Organization::new("Little Acorns"))
        .unwrap();

    let mut settings = organizations.get_settings(org.id).unwrap();
    settings.late_after_minutes = u32::MAX;
    assert!(matches!(
        organizations.update_settings(&settings),
        Err(ServiceError::Validation(_))
    ));

    let kid = StudentService::new(store, org.id)
        .create_student(&Student::new("Ava", "Lee", NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        .unwrap();
    let record = AttendanceService::new(store, org.id)
        .check_in(&check_in_request(kid.id, day(3), 9, 0))
        .unwrap();
    assert_eq!(record.status, AttendanceStatus::Late);
}

#[test]
fn check_out_requires_a_prior_check_in() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1);
    let service = AttendanceService::new(SqliteDocumentStore::new(&conn), fixture.org);
    let kid = fixture.students[0];

    assert!(matches!(
        service.check_out(kid, day(2), at(day(2), 16, 0), None),
        Err(ServiceError::InvalidState(_))
    ));

    service.check_in(&check_in_request(kid, day(2), 8, 0)).unwrap();
    assert!(matches!(
        service.check_out(kid, day(2), at(day(2), 7, 0), None),
        Err(ServiceError::Validation(_))
    ));

    let out = service
        .check_out(kid, day(2), at(day(2), 16, 0), Some("grandpa".to_string()))
        .unwrap();
    assert_eq!(out.check_out_at, Some(at(day(2), 16, 0)));
    assert!(!out.is_on_site());
    assert!(matches!(
        service.check_out(kid, day(2), at(day(2), 17, 0), None),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn absence_rules() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2);
    let service = AttendanceService::new(SqliteDocumentStore::new(&conn), fixture.org);
    let (first, second) = (fixture.students[0], fixture.students[1]);

    service.check_in(&check_in_request(first, day(2), 7, 0)).unwrap();
    assert!(matches!(
        service.mark_absent(first, day(2), false, None),
        Err(ServiceError::Conflict(_))
    ));

    let absent = service.mark_absent(second, day(2), false, None).unwrap();
    assert_eq!(absent.status, AttendanceStatus::Absent);
    let excused = service
        .mark_absent(second, day(2), true, Some("doctor visit".to_string()))
        .unwrap();
    assert_eq!(excused.id, absent.id);
    assert_eq!(excused.status, AttendanceStatus::Excused);

    // A late arrival replaces the absence.
    let arrived = service.check_in(&check_in_request(second, day(2), 10, 0)).unwrap();
    assert_eq!(arrived.id, absent.id);
    assert_eq!(arrived.status, AttendanceStatus::Late);
    assert_eq!(service.attendance_for_date(day(2)).unwrap().len(), 2);
}

#[test]
fn daily_summary_and_on_site_list() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 5);
    let service = AttendanceService::new(SqliteDocumentStore::new(&conn), fixture.org);
    let kids = &fixture.students;

    service.check_in(&check_in_request(kids[0], day(2), 7, 0)).unwrap();
    service.check_in(&check_in_request(kids[1], day(2), 9, 0)).unwrap();
    service
        .check_out(kids[0], day(2), at(day(2), 15, 0), None)
        .unwrap();
    service.mark_absent(kids[2], day(2), false, None).unwrap();
    service.mark_absent(kids[3], day(2), true, None).unwrap();

    let summary = service.daily_summary(day(2)).unwrap();
    assert_eq!(summary.present, 1);
    assert_eq!(summary.late, 1);
    assert_eq!(summary.absent, 1);
    assert_eq!(summary.excused, 1);
    assert_eq!(summary.checked_out, 1);
    assert_eq!(summary.not_recorded, 1);
    assert_eq!(summary.expected(), 5);

    let on_site = service.currently_checked_in(day(2)).unwrap();
    assert_eq!(on_site.len(), 1);
    assert_eq!(on_site[0].student_id, kids[1]);

    let ordered: Vec<Uuid> = service
        .attendance_for_date(day(2))
        .unwrap()
        .iter()
        .map(|record| record.student_id)
        .collect();
    assert_eq!(&ordered[..2], &[kids[0], kids[1]]);
}

#[test]
fn attendance_rates_exclude_excused_days() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 2);
    let service = AttendanceService::new(SqliteDocumentStore::new(&conn), fixture.org);
    let (kid, other) = (fixture.students[0], fixture.students[1]);

    service.check_in(&check_in_request(kid, day(2), 7, 0)).unwrap();
    service.check_in(&check_in_request(kid, day(3), 9, 0)).unwrap();
    service.mark_absent(kid, day(4), false, None).unwrap();
    service.mark_absent(kid, day(5), true, None).unwrap();
    service.check_in(&check_in_request(kid, day(9), 7, 0)).unwrap();
    service.mark_absent(other, day(2), false, None).unwrap();

    let week = service.student_attendance_rate(kid, day(2), day(6)).unwrap();
    assert_eq!((week.present, week.late, week.absent, week.excused), (1, 1, 1, 1));
    let rate = week.rate().unwrap();
    assert!((rate - 2.0 / 3.0).abs() < 1e-9);

    let history = service.attendance_for_student(kid, day(1), day(30)).unwrap();
    let dates: Vec<NaiveDate> = history.iter().map(|record| record.date).collect();
    assert_eq!(dates, vec![day(2), day(3), day(4), day(5), day(9)]);

    let class_rate = service
        .class_attendance_rate(fixture.class_id, day(2), day(2))
        .unwrap();
    assert_eq!(class_rate.rate(), Some(0.5));

    let empty = service.student_attendance_rate(kid, day(20), day(25)).unwrap();
    assert_eq!(empty.rate(), None);
    assert!(matches!(
        service.student_attendance_rate(kid, day(25), day(20)),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn inactive_students_cannot_check_in() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn, 1);
    let store = SqliteDocumentStore::new(&conn);
    StudentService::new(store, fixture.org)
        .withdraw_student(fixture.students[0])
        .unwrap();

    let service = AttendanceService::new(store, fixture.org);
    assert!(matches!(
        service.check_in(&check_in_request(fixture.students[0], day(2), 7, 0)),
        Err(ServiceError::InvalidState(_))
    ));
}
