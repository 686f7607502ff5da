use chrono::NaiveDate;
use preschool_core::db::open_db_in_memory;
use preschool_core::model::class::{Class, Program, ProgramSchedule};
use preschool_core::model::staff::{Staff, StaffRole};
use preschool_core::model::student::{Student, StudentStatus};
use preschool_core::{
    ClassService, ServiceError, SqliteDocumentStore, StaffFilter, StaffService, StudentService,
};
use uuid::Uuid;

fn teacher(first: &str, email: &str) -> Staff {
    Staff::new(first, "Okafor", email, StaffRole::Teacher)
}

fn student() -> Student {
    Student::new("Ava", "Lee", NaiveDate::from_ymd_opt(2021, 2, 1).unwrap())
}

#[test]
fn staff_email_is_normalized_and_unique() {
    let conn = open_db_in_memory().unwrap();
    let service = StaffService::new(SqliteDocumentStore::new(&conn), Uuid::new_v4());

    let created = service
        .create_staff(&teacher("Grace", "  Grace.Okafor@Example.org "))
        .unwrap();
    assert_eq!(created.email, "grace.okafor@example.org");

    assert!(matches!(
        service.create_staff(&teacher("Other", "GRACE.okafor@example.org")),
        Err(ServiceError::Conflict(_))
    ));

    let mut renamed = created.clone();
    renamed.first_name = "Gracie".to_string();
    assert_eq!(service.update_staff(&renamed).unwrap().first_name, "Gracie");
}

#[test]
fn list_staff_filters_by_role_and_activity() {
    let conn = open_db_in_memory().unwrap();
    let service = StaffService::new(SqliteDocumentStore::new(&conn), Uuid::new_v4());

    let grace = service.create_staff(&teacher("Grace", "grace@example.org")).unwrap();
    service.create_staff(&teacher("Ade", "ade@example.org")).unwrap();
    service
        .create_staff(&Staff::new("Pat", "Cook", "pat@example.org", StaffRole::Cook))
        .unwrap();
    service.deactivate_staff(grace.id).unwrap();

    assert_eq!(service.list_staff(StaffFilter::default()).unwrap().len(), 3);
    let active_teachers = service
        .list_staff(StaffFilter {
            role: Some(StaffRole::Teacher),
            active_only: true,
        })
        .unwrap();
    assert_eq!(active_teachers.len(), 1);
    assert_eq!(active_teachers[0].first_name, "Ade");
}

#[test]
fn assignment_updates_staff_and_class_together() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let staff = StaffService::new(store, org);
    let classes = ClassService::new(store, org);

    let grace = staff.create_staff(&teacher("Grace", "grace@example.org")).unwrap();
    let room = classes.create_class(&Class::new("Robins", 12)).unwrap();

    staff.assign_to_class(grace.id, room.id).unwrap();
    staff.assign_to_class(grace.id, room.id).unwrap();
    assert_eq!(classes.get_class(room.id).unwrap().unwrap().teacher_ids, vec![grace.id]);
    assert_eq!(staff.get_staff(grace.id).unwrap().unwrap().class_ids, vec![room.id]);
    assert_eq!(staff.staff_for_class(room.id).unwrap().len(), 1);

    staff.remove_from_class(grace.id, room.id).unwrap();
    assert!(classes.get_class(room.id).unwrap().unwrap().teacher_ids.is_empty());
    assert!(staff.staff_for_class(room.id).unwrap().is_empty());

    staff.deactivate_staff(grace.id).unwrap();
    assert!(matches!(
        staff.assign_to_class(grace.id, room.id),
        Err(ServiceError::InvalidState(_))
    ));
}

#[test]
fn deleting_staff_or_class_cleans_the_other_side() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let staff = StaffService::new(store, org);
    let classes = ClassService::new(store, org);

    let grace = staff.create_staff(&teacher("Grace", "grace@example.org")).unwrap();
    let ade = staff.create_staff(&teacher("Ade", "ade@example.org")).unwrap();
    let robins = classes.create_class(&Class::new("Robins", 12)).unwrap();
    let wrens = classes.create_class(&Class::new("Wrens", 12)).unwrap();
    staff.assign_to_class(grace.id, robins.id).unwrap();
    staff.assign_to_class(ade.id, robins.id).unwrap();
    staff.assign_to_class(ade.id, wrens.id).unwrap();

    staff.delete_staff(grace.id).unwrap();
    assert_eq!(classes.get_class(robins.id).unwrap().unwrap().teacher_ids, vec![ade.id]);

    classes.delete_class(robins.id).unwrap();
    assert_eq!(staff.get_staff(ade.id).unwrap().unwrap().class_ids, vec![wrens.id]);
}

#[test]
fn class_rules_protect_enrolled_students_and_programs() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let classes = ClassService::new(store, org);
    let students = StudentService::new(store, org);

    let program = classes
        .create_program(&Program::new("Full day", ProgramSchedule::FullDay, 5))
        .unwrap();
    let mut room = Class::new("Robins", 2);
    room.program_id = Some(program.id);
    let room = classes.create_class(&room).unwrap();

    let mut enrolled = student();
    enrolled.class_id = Some(room.id);
    students.create_student(&enrolled).unwrap();
    let mut second = Student::new("Leo", "Park", enrolled.date_of_birth);
    second.class_id = Some(room.id);
    students.create_student(&second).unwrap();

    let occupancy = classes.class_occupancy(room.id).unwrap();
    assert_eq!((occupancy.enrolled, occupancy.available), (2, 0));
    let roster: Vec<String> = classes
        .class_roster(room.id)
        .unwrap()
        .iter()
        .map(Student::full_name)
        .collect();
    assert_eq!(roster, vec!["Ava Lee", "Leo Park"]);

    let mut shrunk = room.clone();
    shrunk.capacity = 1;
    assert!(matches!(classes.update_class(&shrunk), Err(ServiceError::Conflict(_))));
    assert!(matches!(classes.delete_class(room.id), Err(ServiceError::Conflict(_))));
    assert!(matches!(
        classes.delete_program(program.id),
        Err(ServiceError::Conflict(_))
    ));

    let mut ghost_program = Class::new("Finches", 4);
    ghost_program.program_id = Some(Uuid::new_v4());
    assert!(matches!(
        classes.create_class(&ghost_program),
        Err(ServiceError::NotFound { entity: "programs", .. })
    ));
}

#[test]
fn programs_and_classes_list_by_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let classes = ClassService::new(store, Uuid::new_v4());

    for name in ["Wrens", "robins", "Finches"] {
        classes.create_class(&Class::new(name, 10)).unwrap();
    }
    let names: Vec<String> = classes
        .list_classes()
        .unwrap()
        .into_iter()
        .map(|class| class.name)
        .collect();
    assert_eq!(names, vec!["Finches", "robins", "Wrens"]);

    let half = classes
        .create_program(&Program::new("Half day", ProgramSchedule::HalfDayMorning, 3))
        .unwrap();
    assert!(matches!(
        classes.create_program(&Program::new("Weekend", ProgramSchedule::FullDay, 8)),
        Err(ServiceError::Validation(_))
    ));
    classes.delete_program(half.id).unwrap();
    assert!(classes.list_programs().unwrap().is_empty());
}

#[test]
fn deleting_class_or_program_detaches_remaining_students() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let org = Uuid::new_v4();
    let classes = ClassService::new(store, org);
    let students = StudentService::new(store, org);

    let program = classes
        .create_program(&Program::new("Full day", ProgramSchedule::FullDay, 5))
        .unwrap();
    let room = classes.create_class(&Class::new("Robins", 4)).unwrap();

    let mut resting = student();
    resting.status = StudentStatus::Inactive;
    resting.class_id = Some(room.id);
    resting.program_id = Some(program.id);
    let resting = students.create_student(&resting).unwrap();

    classes.delete_class(room.id).unwrap();
    let stored = students.get_student(resting.id).unwrap().unwrap();
    assert_eq!(stored.class_id, None);
    assert_eq!(stored.program_id, Some(program.id));

    classes.delete_program(program.id).unwrap();
    let mut edited = students.get_student(resting.id).unwrap().unwrap();
    assert_eq!(edited.program_id, None);

    edited.medical_notes = Some("asthma".to_string());
    let updated = students.update_student(&edited).unwrap();
    assert_eq!(updated.medical_notes.as_deref(), Some("asthma"));
}
