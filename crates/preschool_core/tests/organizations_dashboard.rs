use chrono::NaiveDate;
use preschool_core::db::open_db_in_memory;
use preschool_core::model::class::Class;
use preschool_core::model::organization::{Organization, OrganizationStatus};
use preschool_core::model::staff::{Staff, StaffRole};
use preschool_core::model::student::Student;
use preschool_core::{
    AttendanceService, CheckInRequest, ClassService, DashboardService, OrganizationService,
    ServiceError, SqliteDocumentStore, SqliteOrganizationRepository, StaffService,
    StudentService,
};
use uuid::Uuid;

fn at(date: NaiveDate, hour: u32, minute: u32) -> i64 {
    date.and_hms_opt(hour, minute, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

#[test]
fn create_organization_stores_default_settings() {
    let conn = open_db_in_memory().unwrap();
    let service = OrganizationService::new(
        SqliteOrganizationRepository::new(&conn),
        SqliteDocumentStore::new(&conn),
    );

    let created = service
        .create_organization(&Organization::new(" Sunnyside Preschool "))
        .unwrap();
    let settings = service.get_settings(created.id).unwrap();
    assert_eq!(settings.organization_id, created.id);
    assert_eq!(settings.school_name, "Sunnyside Preschool");
    assert_eq!(settings.opening_time, "07:00");
    assert!(settings.meal_tracking_enabled);

    assert!(matches!(
        service.create_organization(&created),
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.get_settings(Uuid::new_v4()),
        Err(ServiceError::NotFound { entity: "organizations", .. })
    ));
}

#[test]
fn update_settings_validates_and_persists() {
    let conn = open_db_in_memory().unwrap();
    let service = OrganizationService::new(
        SqliteOrganizationRepository::new(&conn),
        SqliteDocumentStore::new(&conn),
    );
    let org = service
        .create_organization(&Organization::new("Sunnyside"))
        .unwrap();

    let mut settings = service.get_settings(org.id).unwrap();
    settings.opening_time = "08:30".to_string();
    settings.meal_tracking_enabled = false;
    let updated = service.update_settings(&settings).unwrap();
    assert_eq!(updated.opening_time, "08:30");
    assert!(!service.get_settings(org.id).unwrap().meal_tracking_enabled);

    settings.closing_time = "25:00".to_string();
    assert!(matches!(
        service.update_settings(&settings),
        Err(ServiceError::Validation(_))
    ));

    let mut orphan = settings.clone();
    orphan.organization_id = Uuid::new_v4();
    orphan.closing_time = "17:00".to_string();
    assert!(matches!(
        service.update_settings(&orphan),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn organizations_list_in_creation_order_and_update() {
    let conn = open_db_in_memory().unwrap();
    let service = OrganizationService::new(
        SqliteOrganizationRepository::new(&conn),
        SqliteDocumentStore::new(&conn),
    );

    let first = service.create_organization(&Organization::new("Acorn")).unwrap();
    let second = service.create_organization(&Organization::new("Birch")).unwrap();
    let names: Vec<String> = service
        .list_organizations()
        .unwrap()
        .into_iter()
        .map(|org| org.name)
        .collect();
    assert_eq!(names, vec!["Acorn", "Birch"]);

    let mut renamed = second.clone();
    renamed.name = "Birch Tree".to_string();
    renamed.status = OrganizationStatus::Suspended;
    service.update_organization(&renamed).unwrap();
    let stored = service.get_organization(second.id).unwrap().unwrap();
    assert_eq!(stored.name, "Birch Tree");
    assert_eq!(stored.status, OrganizationStatus::Suspended);
    assert!(service.get_organization(Uuid::new_v4()).unwrap().is_none());
    assert_eq!(service.get_organization(first.id).unwrap().unwrap(), first);
}

#[test]
fn dashboard_overview_counts_one_day() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();

    let room = ClassService::new(store, org)
        .create_class(&Class::new("Robins", 10))
        .unwrap();
    let students = StudentService::new(store, org);
    let ids: Vec<Uuid> = (0..4)
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
    students
        .add_to_waitlist(&Student::new(
            "Wait",
            "Ing",
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
        ))
        .unwrap();

    let staff = StaffService::new(store, org);
    staff
        .create_staff(&Staff::new("Grace", "Okafor", "grace@example.org", StaffRole::Teacher))
        .unwrap();
    let leaver = staff
        .create_staff(&Staff::new("Sam", "Ray", "sam@example.org", StaffRole::Cook))
        .unwrap();
    staff.deactivate_staff(leaver.id).unwrap();

    let attendance = AttendanceService::new(store, org);
    let request = |student_id: Uuid, hour: u32, minute: u32| CheckInRequest {
        student_id,
        date,
        at_epoch_ms: at(date, hour, minute),
        checked_in_by: None,
        notes: None,
    };
    attendance.check_in(&request(ids[0], 7, 5)).unwrap();
    attendance
        .check_out(ids[0], date, at(date, 12, 0), None)
        .unwrap();
    attendance.check_in(&request(ids[1], 8, 0)).unwrap();
    attendance.mark_absent(ids[2], date, false, None).unwrap();
    attendance
        .mark_absent(ids[3], date, true, Some("dentist".to_string()))
        .unwrap();

    let dashboard = DashboardService::new(store, org);
    let overview = dashboard.overview(date).unwrap();
    assert_eq!(overview.active_students, 4);
    assert_eq!(overview.waitlisted_students, 1);
    assert_eq!(overview.active_staff, 1);
    assert_eq!(overview.classes, 1);
    assert_eq!(overview.checked_in_now, 1);
    assert_eq!(overview.present_today, 2);
    let rate = overview.attendance_rate.unwrap();
    assert!((rate - 2.0 / 3.0).abs() < 1e-9);

    let quiet = dashboard.overview(date.succ_opt().unwrap()).unwrap();
    assert_eq!(quiet.present_today, 0);
    assert!(quiet.attendance_rate.is_none());
}
