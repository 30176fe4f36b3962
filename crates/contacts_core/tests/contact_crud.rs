use contacts_core::db::open_db_in_memory;
use contacts_core::{
    Contact, ContactListQuery, ContactRepository, ContactService, ContactServiceError,
    ContactSort, ContactValidationError, PageRequest, RepoError, SqliteContactRepository,
};

fn contact(first_name: &str, last_name: &str, email: &str) -> Contact {
    Contact::new(first_name, last_name, email)
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let mut draft = contact("Jean", "Dupont", "jean@x.com");
    draft.phone = Some("+212612345678".to_string());
    draft.birthday = chrono::NaiveDate::from_ymd_opt(1990, 5, 15);
    let id = repo.create_contact(&draft).unwrap();

    let loaded = repo.get_contact(id, false).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.first_name, "Jean");
    assert_eq!(loaded.email, "jean@x.com");
    assert_eq!(loaded.phone.as_deref(), Some("+212612345678"));
    assert_eq!(loaded.birthday, draft.birthday);
    assert!(!loaded.is_deleted);
    assert!(loaded.created_at.is_some());
    assert_eq!(loaded.created_at, loaded.updated_at);
}

#[test]
fn create_rejects_invalid_contact() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let err = repo
        .create_contact(&contact("J", "Dupont", "jean@x.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ContactValidationError::Length { .. })
    ));

    let err = repo
        .create_contact(&contact("Jean", "Dupont", "not-an-email"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ContactValidationError::InvalidEmail(_))
    ));
}

#[test]
fn duplicate_active_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    repo.create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    let err = repo
        .create_contact(&contact("Jeanne", "Durand", "JEAN@x.com"))
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail(email) if email == "JEAN@x.com"));
}

#[test]
fn soft_deleted_contact_frees_its_email() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let first = repo
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    repo.soft_delete_contact(first).unwrap();

    let second = repo
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    assert_ne!(first, second);
    assert!(repo.get_contact(first, false).unwrap().is_none());
    assert!(repo.get_contact(first, true).unwrap().unwrap().is_deleted);
}

#[test]
fn soft_delete_twice_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let id = repo
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    repo.soft_delete_contact(id).unwrap();

    let err = repo.soft_delete_contact(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn update_refreshes_fields_but_not_created_at() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let id = repo
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    let mut stored = repo.get_contact(id, false).unwrap().unwrap();
    let created_at = stored.created_at;

    stored.city = Some("Rabat".to_string());
    repo.update_contact(&stored).unwrap();

    let loaded = repo.get_contact(id, false).unwrap().unwrap();
    assert_eq!(loaded.city.as_deref(), Some("Rabat"));
    assert_eq!(loaded.created_at, created_at);
    assert!(loaded.updated_at.is_some());
}

#[test]
fn update_requires_id_and_active_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let draft = contact("Jean", "Dupont", "jean@x.com");
    assert!(matches!(
        repo.update_contact(&draft).unwrap_err(),
        RepoError::MissingId
    ));

    let id = repo.create_contact(&draft).unwrap();
    let mut stored = repo.get_contact(id, false).unwrap().unwrap();
    repo.soft_delete_contact(id).unwrap();
    stored.city = Some("Rabat".to_string());
    assert!(matches!(
        repo.update_contact(&stored).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn search_is_case_insensitive_over_names_and_email() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    repo.create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    repo.create_contact(&contact("Marie", "Curie", "marie@lab.org"))
        .unwrap();
    repo.create_contact(&contact("Ali", "Bennani", "ali@dupont-sa.ma"))
        .unwrap();

    let query = ContactListQuery {
        search: Some("DUPONT".to_string()),
        sort: ContactSort::FirstNameAsc,
        ..ContactListQuery::default()
    };
    let names = repo
        .list_contacts(&query)
        .unwrap()
        .into_iter()
        .map(|contact| contact.first_name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ali".to_string(), "Jean".to_string()]);
    assert_eq!(repo.count_contacts(&query).unwrap(), 2);
}

#[test]
fn search_treats_like_wildcards_literally() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    repo.create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();

    let query = ContactListQuery {
        search: Some("%".to_string()),
        ..ContactListQuery::default()
    };
    assert!(repo.list_contacts(&query).unwrap().is_empty());
}

#[test]
fn list_active_contacts_skips_deleted_rows_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let first = repo
        .create_contact(&contact("Zoe", "Zidane", "zoe@x.com"))
        .unwrap();
    let second = repo
        .create_contact(&contact("Adam", "Alaoui", "adam@x.com"))
        .unwrap();
    let third = repo
        .create_contact(&contact("Marie", "Curie", "marie@x.com"))
        .unwrap();
    repo.soft_delete_contact(second).unwrap();

    let ids = repo
        .list_active_contacts()
        .unwrap()
        .into_iter()
        .filter_map(|contact| contact.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![first, third]);
}

#[test]
fn insert_contacts_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::new(&conn);

    let batch = vec![
        contact("Jean", "Dupont", "jean@x.com"),
        contact("Marie", "Curie", "marie@x.com"),
        contact("Jeanne", "Dupont", "jean@x.com"),
    ];
    let err = repo.insert_contacts(&batch).unwrap_err();
    assert!(matches!(err, RepoError::DuplicateEmail(_)));
    assert_eq!(repo.count_contacts(&ContactListQuery::default()).unwrap(), 0);

    assert_eq!(repo.insert_contacts(&batch[..2]).unwrap(), 2);
    assert_eq!(repo.count_contacts(&ContactListQuery::default()).unwrap(), 2);
}

#[test]
fn service_pages_sorted_by_last_name() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::new(SqliteContactRepository::new(&conn));

    for (index, last_name) in ["Martin", "Bernard", "Alaoui", "Dubois", "Petit"]
        .iter()
        .enumerate()
    {
        service
            .create_contact(&contact("Test", last_name, &format!("user{index}@x.com")))
            .unwrap();
    }

    let first_page = service.find_page(None, PageRequest::new(0, 2)).unwrap();
    assert_eq!(first_page.total_items, 5);
    assert_eq!(first_page.total_pages, 3);
    assert_eq!(
        first_page
            .items
            .iter()
            .map(|contact| contact.last_name.as_str())
            .collect::<Vec<_>>(),
        vec!["Alaoui", "Bernard"]
    );

    let last_page = service.find_page(None, PageRequest::new(2, 2)).unwrap();
    assert_eq!(last_page.items.len(), 1);
    assert_eq!(last_page.items[0].last_name, "Petit");

    let beyond = service.find_page(None, PageRequest::new(9, 2)).unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_items, 5);
}

#[test]
fn service_default_page_holds_ten_contacts() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::new(SqliteContactRepository::new(&conn));

    for index in 0..12 {
        service
            .create_contact(&contact("Test", "Contact", &format!("user{index}@x.com")))
            .unwrap();
    }

    let page = service.find_page(None, PageRequest::default()).unwrap();
    assert_eq!(page.size, 10);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total_pages, 2);
}

#[test]
fn service_update_copies_editable_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::new(SqliteContactRepository::new(&conn));

    let created = service
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    let id = created.id.unwrap();

    let mut changes = contact("Jean", "Durand", "jean.durand@x.com");
    changes.id = Some(999);
    changes.is_deleted = true;
    changes.notes = Some("moved".to_string());

    let updated = service.update_contact(id, &changes).unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.last_name, "Durand");
    assert_eq!(updated.email, "jean.durand@x.com");
    assert_eq!(updated.notes.as_deref(), Some("moved"));
    assert!(!updated.is_deleted);
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn service_reports_missing_and_deleted_contacts_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::new(SqliteContactRepository::new(&conn));

    assert!(matches!(
        service.find_by_id(42).unwrap_err(),
        ContactServiceError::NotFound(42)
    ));

    let id = service
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap()
        .id
        .unwrap();
    service.delete_contact(id).unwrap();

    assert!(matches!(
        service.find_by_id(id).unwrap_err(),
        ContactServiceError::NotFound(missing) if missing == id
    ));
    assert!(matches!(
        service.delete_contact(id).unwrap_err(),
        ContactServiceError::NotFound(_)
    ));
    assert!(matches!(
        service
            .update_contact(id, &contact("Jean", "Dupont", "jean@x.com"))
            .unwrap_err(),
        ContactServiceError::NotFound(_)
    ));
}

#[test]
fn service_search_filters_page() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::new(SqliteContactRepository::new(&conn));

    service
        .create_contact(&contact("Jean", "Dupont", "jean@x.com"))
        .unwrap();
    service
        .create_contact(&contact("Marie", "Curie", "marie@x.com"))
        .unwrap();

    let page = service
        .find_page(Some("mar"), PageRequest::default())
        .unwrap();
    assert_eq!(page.total_items, 1);
    assert_eq!(page.items[0].last_name, "Curie");
}
