//! Repository behaviour against a real (in-memory) SQLite database.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use reserva_core::{
    Appointment, AppointmentId, AppointmentStatus, AuthorizationId, AuthorizationType, Channel,
    Contact, ContactAuthorization, ContactId, OrganizationId, ServiceId, StaffMemberId,
};
use reserva_db::repositories::{
    AppointmentRepository, AuthorizationRepository, ContactRepository, ScheduleRepository,
    SqlAppointmentRepository, SqlAuthorizationRepository, SqlContactRepository,
    SqlScheduleRepository,
};
use reserva_db::{connect_with_settings, migrations, DbPool};

async fn test_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    pool
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn seed_service(pool: &DbPool, id: ServiceId, name: &str, duration: i64) {
    sqlx::query("INSERT INTO services (id, name, duration_minutes) VALUES (?, ?, ?)")
        .bind(id.0.to_string())
        .bind(name)
        .bind(duration)
        .execute(pool)
        .await
        .expect("insert service");
}

async fn seed_contact(pool: &DbPool, contact: &Contact, created_by: StaffMemberId) {
    SqlContactRepository::new(pool.clone())
        .insert(contact, &created_by)
        .await
        .expect("insert contact");
}

fn contact(organization_id: OrganizationId) -> Contact {
    Contact {
        id: ContactId(Uuid::new_v4()),
        organization_id,
        phone: "3001234567".to_string(),
        country_code: "+57".to_string(),
        first_name: "Laura".to_string(),
        last_name: "Gomez".to_string(),
    }
}

fn appointment(
    organization_id: OrganizationId,
    contact_id: ContactId,
    service_id: ServiceId,
    member_id: StaffMemberId,
    day: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Appointment {
    Appointment {
        id: AppointmentId(Uuid::new_v4()),
        organization_id,
        contact_id,
        service_id,
        member_id,
        appointment_date: day,
        start_time: start,
        end_time: end,
        status: AppointmentStatus::Scheduled,
        notes: None,
    }
}

#[tokio::test]
async fn contact_lookup_matches_on_the_full_phone_tuple() {
    let pool = test_pool().await;
    let repo = SqlContactRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let created_by = StaffMemberId(Uuid::new_v4());

    let existing = contact(organization_id);
    seed_contact(&pool, &existing, created_by).await;

    let found = repo
        .find_by_phone(&organization_id, "3001234567", "+57")
        .await
        .expect("lookup");
    assert_eq!(found, Some(existing.id));

    let other_country = repo
        .find_by_phone(&organization_id, "3001234567", "+52")
        .await
        .expect("lookup");
    assert_eq!(other_country, None);

    let other_org = repo
        .find_by_phone(&OrganizationId(Uuid::new_v4()), "3001234567", "+57")
        .await
        .expect("lookup");
    assert_eq!(other_org, None);
}

#[tokio::test]
async fn duplicate_contact_insert_is_rejected_by_the_unique_constraint() {
    let pool = test_pool().await;
    let repo = SqlContactRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let created_by = StaffMemberId(Uuid::new_v4());

    let first = contact(organization_id);
    seed_contact(&pool, &first, created_by).await;

    let mut duplicate = contact(organization_id);
    duplicate.id = ContactId(Uuid::new_v4());
    let result = repo.insert(&duplicate, &created_by).await;
    assert!(result.is_err(), "same (org, phone, country_code) tuple must not insert twice");
}

#[tokio::test]
async fn booked_intervals_skip_cancelled_and_excluded_rows() {
    let pool = test_pool().await;
    let repo = SqlAppointmentRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let service_id = ServiceId(Uuid::new_v4());
    let member_id = StaffMemberId(Uuid::new_v4());
    let created_by = member_id;
    let day = date(2025, 3, 10);

    seed_service(&pool, service_id, "Manicure", 30).await;
    let owner = contact(organization_id);
    seed_contact(&pool, &owner, created_by).await;

    let live =
        appointment(organization_id, owner.id, service_id, member_id, day, t(10, 0), t(10, 30));
    let mut cancelled =
        appointment(organization_id, owner.id, service_id, member_id, day, t(11, 0), t(11, 30));
    cancelled.status = AppointmentStatus::Cancelled;
    repo.insert(&live, &created_by).await.expect("insert live");
    repo.insert(&cancelled, &created_by).await.expect("insert cancelled");

    let booked = repo.booked_intervals(&[member_id], day, None).await.expect("booked");
    let intervals = booked.get(&member_id).expect("member has bookings");
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, t(10, 0));

    let excluding_own = repo
        .booked_intervals(&[member_id], day, Some(&live.id))
        .await
        .expect("booked excluding own row");
    assert!(excluding_own.get(&member_id).is_none());
}

#[tokio::test]
async fn guarded_status_update_only_fires_from_the_expected_state() {
    let pool = test_pool().await;
    let repo = SqlAppointmentRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let service_id = ServiceId(Uuid::new_v4());
    let member_id = StaffMemberId(Uuid::new_v4());
    let day = date(2025, 3, 10);

    seed_service(&pool, service_id, "Manicure", 30).await;
    let owner = contact(organization_id);
    seed_contact(&pool, &owner, member_id).await;

    let appt =
        appointment(organization_id, owner.id, service_id, member_id, day, t(9, 0), t(9, 30));
    repo.insert(&appt, &member_id).await.expect("insert");

    let confirmed = repo
        .update_status_if(&appt.id, AppointmentStatus::Scheduled, AppointmentStatus::Confirmed)
        .await
        .expect("confirm");
    assert_eq!(confirmed, 1);

    let confirmed_again = repo
        .update_status_if(&appt.id, AppointmentStatus::Scheduled, AppointmentStatus::Confirmed)
        .await
        .expect("second confirm");
    assert_eq!(confirmed_again, 0, "guard must not fire from `confirmed`");

    let cancelled = repo
        .update_status(&appt.id, AppointmentStatus::Cancelled)
        .await
        .expect("cancel");
    assert_eq!(cancelled, 1);
    let cancelled_again = repo
        .update_status(&appt.id, AppointmentStatus::Cancelled)
        .await
        .expect("cancel again");
    assert_eq!(cancelled_again, 1, "unconditional update still finds the row");
}

#[tokio::test]
async fn reschedule_write_updates_every_field_and_resets_status() {
    let pool = test_pool().await;
    let repo = SqlAppointmentRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let service_id = ServiceId(Uuid::new_v4());
    let member_id = StaffMemberId(Uuid::new_v4());
    let new_member_id = StaffMemberId(Uuid::new_v4());
    let day = date(2025, 3, 10);

    seed_service(&pool, service_id, "Masaje", 60).await;
    let owner = contact(organization_id);
    seed_contact(&pool, &owner, member_id).await;

    let mut appt =
        appointment(organization_id, owner.id, service_id, member_id, day, t(9, 0), t(10, 0));
    appt.status = AppointmentStatus::Confirmed;
    repo.insert(&appt, &member_id).await.expect("insert");

    let updated = repo
        .apply_reschedule(&appt.id, date(2025, 3, 12), t(14, 0), t(15, 0), &new_member_id, "moved")
        .await
        .expect("reschedule");
    assert_eq!(updated, 1);

    let stored = repo.find_by_id(&appt.id).await.expect("read back").expect("row exists");
    assert_eq!(stored.appointment_date, date(2025, 3, 12));
    assert_eq!(stored.start_time, t(14, 0));
    assert_eq!(stored.end_time, t(15, 0));
    assert_eq!(stored.member_id, new_member_id);
    assert_eq!(stored.status, AppointmentStatus::Scheduled);
    assert_eq!(stored.notes.as_deref(), Some("moved"));
}

#[tokio::test]
async fn upcoming_listing_filters_by_date_and_time() {
    let pool = test_pool().await;
    let repo = SqlAppointmentRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let service_id = ServiceId(Uuid::new_v4());
    let member_id = StaffMemberId(Uuid::new_v4());
    let today = date(2025, 3, 10);

    seed_service(&pool, service_id, "Manicure", 30).await;
    let owner = contact(organization_id);
    seed_contact(&pool, &owner, member_id).await;

    for (day, start, end) in [
        (today, t(8, 0), t(8, 30)),
        (today, t(15, 0), t(15, 30)),
        (date(2025, 3, 11), t(9, 0), t(9, 30)),
    ] {
        let appt = appointment(organization_id, owner.id, service_id, member_id, day, start, end);
        repo.insert(&appt, &member_id).await.expect("insert");
    }

    let upcoming = repo.list_from(&owner.id, today, t(12, 0)).await.expect("list upcoming");
    assert_eq!(upcoming.len(), 2, "this morning's appointment is in the past");
    assert_eq!(upcoming[0].start_time, t(15, 0));
    assert_eq!(upcoming[0].service_name, "Manicure");
    assert_eq!(upcoming[1].appointment_date, date(2025, 3, 11));
}

#[tokio::test]
async fn latest_active_authorization_wins_by_recency() {
    let pool = test_pool().await;
    let repo = SqlAuthorizationRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let created_by = StaffMemberId(Uuid::new_v4());

    let owner = contact(organization_id);
    seed_contact(&pool, &owner, created_by).await;

    assert_eq!(repo.latest_active(&owner.id, Channel::Whatsapp).await.expect("read"), None);

    let older = ContactAuthorization {
        id: AuthorizationId(Uuid::new_v4()),
        contact_id: owner.id,
        organization_id,
        authorization_type: AuthorizationType::OptOut,
        channel: Channel::Whatsapp,
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    };
    repo.insert(&older, &created_by).await.expect("insert older");

    repo.deactivate_active(&owner.id, Channel::Whatsapp).await.expect("deactivate");
    let newer = ContactAuthorization {
        id: AuthorizationId(Uuid::new_v4()),
        contact_id: owner.id,
        organization_id,
        authorization_type: AuthorizationType::OptIn,
        channel: Channel::Whatsapp,
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap(),
    };
    repo.insert(&newer, &created_by).await.expect("insert newer");

    assert_eq!(
        repo.latest_active(&owner.id, Channel::Whatsapp).await.expect("read"),
        Some(AuthorizationType::OptIn)
    );
}

#[tokio::test]
async fn schedule_reads_resolve_services_staff_and_windows() {
    let pool = test_pool().await;
    let repo = SqlScheduleRepository::new(pool.clone());
    let organization_id = OrganizationId(Uuid::new_v4());
    let service_id = ServiceId(Uuid::new_v4());
    let member_id = StaffMemberId(Uuid::new_v4());
    let monday = date(2025, 3, 10);

    seed_service(&pool, service_id, "Manicure", 30).await;
    sqlx::query("INSERT INTO staff_assignments (service_id, member_id) VALUES (?, ?)")
        .bind(service_id.0.to_string())
        .bind(member_id.0.to_string())
        .execute(&pool)
        .await
        .expect("assign");

    sqlx::query(
        "INSERT INTO organization_availability
         (organization_id, day_of_week, is_available, start_time, end_time)
         VALUES (?, 1, 1, '09:00:00', '17:00:00')",
    )
    .bind(organization_id.0.to_string())
    .execute(&pool)
    .await
    .expect("org weekday");

    sqlx::query(
        "INSERT INTO organization_special_dates
         (organization_id, date, is_available)
         VALUES (?, ?, 0)",
    )
    .bind(organization_id.0.to_string())
    .bind(monday.to_string())
    .execute(&pool)
    .await
    .expect("org special date");

    let service = repo.find_service(&service_id).await.expect("read").expect("found");
    assert_eq!(service.duration_minutes, 30);
    assert_eq!(service.name, "Manicure");

    assert_eq!(repo.assigned_staff(&service_id).await.expect("staff"), vec![member_id]);

    let weekday = repo
        .organization_weekday(&organization_id, 1)
        .await
        .expect("read")
        .expect("weekday row");
    assert!(weekday.is_available);
    assert_eq!(weekday.start_time, Some(t(9, 0)));

    let special = repo
        .organization_special_date(&organization_id, monday)
        .await
        .expect("read")
        .expect("special row");
    assert!(!special.is_available, "the holiday closes the day");

    assert!(repo
        .staff_weekdays(&[member_id], 1)
        .await
        .expect("staff weekdays")
        .is_empty());
}
