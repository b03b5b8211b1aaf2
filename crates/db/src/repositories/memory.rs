//! In-memory repository implementations for exercising the booking logic
//! without a database. Seeding happens through the `set_*`/`add_*` helpers;
//! behaviour mirrors the SQL implementations including status filtering and
//! result ordering.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::RwLock;

use reserva_core::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentSummary, AuthorizationType, Channel,
    Contact, ContactAuthorization, ContactId, DaySchedule, OrganizationId, Service, ServiceId,
    StaffMemberId, TimeInterval,
};

use super::{
    AppointmentRepository, AuthorizationRepository, ContactRepository, RepositoryError,
    ScheduleRepository,
};

#[derive(Default)]
pub struct InMemoryScheduleRepository {
    services: RwLock<HashMap<ServiceId, Service>>,
    assignments: RwLock<Vec<(ServiceId, StaffMemberId)>>,
    org_weekdays: RwLock<HashMap<(OrganizationId, u32), DaySchedule>>,
    org_special_dates: RwLock<HashMap<(OrganizationId, NaiveDate), DaySchedule>>,
    staff_weekdays: RwLock<HashMap<(StaffMemberId, u32), DaySchedule>>,
    staff_special_dates: RwLock<HashMap<(StaffMemberId, NaiveDate), DaySchedule>>,
}

impl InMemoryScheduleRepository {
    pub async fn add_service(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn assign(&self, service_id: ServiceId, member_id: StaffMemberId) {
        self.assignments.write().await.push((service_id, member_id));
    }

    pub async fn set_org_weekday(
        &self,
        organization_id: OrganizationId,
        weekday: u32,
        schedule: DaySchedule,
    ) {
        self.org_weekdays.write().await.insert((organization_id, weekday), schedule);
    }

    pub async fn set_org_special_date(
        &self,
        organization_id: OrganizationId,
        date: NaiveDate,
        schedule: DaySchedule,
    ) {
        self.org_special_dates.write().await.insert((organization_id, date), schedule);
    }

    pub async fn set_staff_weekday(
        &self,
        member_id: StaffMemberId,
        weekday: u32,
        schedule: DaySchedule,
    ) {
        self.staff_weekdays.write().await.insert((member_id, weekday), schedule);
    }

    pub async fn set_staff_special_date(
        &self,
        member_id: StaffMemberId,
        date: NaiveDate,
        schedule: DaySchedule,
    ) {
        self.staff_special_dates.write().await.insert((member_id, date), schedule);
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn find_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        Ok(self.services.read().await.get(id).cloned())
    }

    async fn assigned_staff(
        &self,
        service_id: &ServiceId,
    ) -> Result<Vec<StaffMemberId>, RepositoryError> {
        let mut members: Vec<StaffMemberId> = self
            .assignments
            .read()
            .await
            .iter()
            .filter(|(service, _)| service == service_id)
            .map(|(_, member)| *member)
            .collect();
        members.sort();
        Ok(members)
    }

    async fn organization_special_date(
        &self,
        organization_id: &OrganizationId,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, RepositoryError> {
        Ok(self.org_special_dates.read().await.get(&(*organization_id, date)).cloned())
    }

    async fn organization_weekday(
        &self,
        organization_id: &OrganizationId,
        weekday: u32,
    ) -> Result<Option<DaySchedule>, RepositoryError> {
        Ok(self.org_weekdays.read().await.get(&(*organization_id, weekday)).cloned())
    }

    async fn staff_special_dates(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError> {
        let special_dates = self.staff_special_dates.read().await;
        Ok(member_ids
            .iter()
            .filter_map(|member| {
                special_dates.get(&(*member, date)).cloned().map(|schedule| (*member, schedule))
            })
            .collect())
    }

    async fn staff_weekdays(
        &self,
        member_ids: &[StaffMemberId],
        weekday: u32,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError> {
        let weekdays = self.staff_weekdays.read().await;
        Ok(member_ids
            .iter()
            .filter_map(|member| {
                weekdays.get(&(*member, weekday)).cloned().map(|schedule| (*member, schedule))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    service_names: RwLock<HashMap<ServiceId, String>>,
}

impl InMemoryAppointmentRepository {
    /// Summaries join the service name; register it the way the SQL schema's
    /// foreign key would provide it.
    pub async fn register_service_name(&self, service_id: ServiceId, name: impl Into<String>) {
        self.service_names.write().await.insert(service_id, name.into());
    }

    pub async fn get(&self, id: &AppointmentId) -> Option<Appointment> {
        self.appointments.read().await.get(id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.appointments.read().await.len()
    }

    async fn summaries(
        &self,
        filter: impl Fn(&Appointment) -> bool,
    ) -> Vec<AppointmentSummary> {
        let service_names = self.service_names.read().await;
        let mut rows: Vec<AppointmentSummary> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| appointment.status.is_booked() && filter(appointment))
            .map(|appointment| AppointmentSummary {
                appointment_id: appointment.id,
                appointment_date: appointment.appointment_date,
                start_time: appointment.start_time,
                service_id: appointment.service_id,
                member_id: appointment.member_id,
                service_name: service_names
                    .get(&appointment.service_id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();
        rows.sort_by_key(|summary| (summary.appointment_date, summary.start_time));
        rows
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(
        &self,
        appointment: &Appointment,
        _created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        self.appointments.write().await.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.appointments.read().await.get(id).cloned())
    }

    async fn booked_intervals(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
        exclude: Option<&AppointmentId>,
    ) -> Result<HashMap<StaffMemberId, Vec<TimeInterval>>, RepositoryError> {
        let mut booked: HashMap<StaffMemberId, Vec<TimeInterval>> = HashMap::new();
        for appointment in self.appointments.read().await.values() {
            if !appointment.status.is_booked()
                || appointment.appointment_date != date
                || !member_ids.contains(&appointment.member_id)
                || exclude == Some(&appointment.id)
            {
                continue;
            }
            if let Some(interval) = appointment.interval() {
                booked.entry(appointment.member_id).or_default().push(interval);
            }
        }
        for intervals in booked.values_mut() {
            intervals.sort();
        }
        Ok(booked)
    }

    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<u64, RepositoryError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(id) {
            Some(appointment) => {
                appointment.status = status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_status_if(
        &self,
        id: &AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<u64, RepositoryError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(id) {
            Some(appointment) if appointment.status == from => {
                appointment.status = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn apply_reschedule(
        &self,
        id: &AppointmentId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        member_id: &StaffMemberId,
        notes: &str,
    ) -> Result<u64, RepositoryError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(id) {
            Some(appointment) => {
                appointment.appointment_date = date;
                appointment.start_time = start_time;
                appointment.end_time = end_time;
                appointment.member_id = *member_id;
                appointment.notes = Some(notes.to_string());
                appointment.status = AppointmentStatus::Scheduled;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn find_for_contact(
        &self,
        contact_id: &ContactId,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError> {
        Ok(self
            .summaries(|appointment| {
                appointment.contact_id == *contact_id
                    && appointment.appointment_date == date
                    && start_time.map_or(true, |start| appointment.start_time == start)
            })
            .await)
    }

    async fn list_from(
        &self,
        contact_id: &ContactId,
        from_date: NaiveDate,
        from_time: NaiveTime,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError> {
        Ok(self
            .summaries(|appointment| {
                appointment.contact_id == *contact_id
                    && (appointment.appointment_date > from_date
                        || (appointment.appointment_date == from_date
                            && appointment.start_time >= from_time))
            })
            .await)
    }
}

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<Vec<Contact>>,
}

impl InMemoryContactRepository {
    pub async fn all(&self) -> Vec<Contact> {
        self.contacts.read().await.clone()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_by_phone(
        &self,
        organization_id: &OrganizationId,
        phone: &str,
        country_code: &str,
    ) -> Result<Option<ContactId>, RepositoryError> {
        Ok(self
            .contacts
            .read()
            .await
            .iter()
            .find(|contact| {
                contact.organization_id == *organization_id
                    && contact.phone == phone
                    && contact.country_code == country_code
            })
            .map(|contact| contact.id))
    }

    async fn insert(
        &self,
        contact: &Contact,
        _created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        self.contacts.write().await.push(contact.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAuthorizationRepository {
    authorizations: RwLock<Vec<ContactAuthorization>>,
}

impl InMemoryAuthorizationRepository {
    pub async fn active_count(&self, contact_id: &ContactId, channel: Channel) -> usize {
        self.authorizations
            .read()
            .await
            .iter()
            .filter(|row| {
                row.contact_id == *contact_id && row.channel == channel && row.is_active
            })
            .count()
    }

    pub async fn all(&self) -> Vec<ContactAuthorization> {
        self.authorizations.read().await.clone()
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryAuthorizationRepository {
    async fn latest_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<Option<AuthorizationType>, RepositoryError> {
        Ok(self
            .authorizations
            .read()
            .await
            .iter()
            .filter(|row| {
                row.contact_id == *contact_id && row.channel == channel && row.is_active
            })
            .max_by_key(|row| (row.created_at, row.id))
            .map(|row| row.authorization_type))
    }

    async fn deactivate_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<u64, RepositoryError> {
        let mut deactivated = 0;
        for row in self.authorizations.write().await.iter_mut() {
            if row.contact_id == *contact_id && row.channel == channel && row.is_active {
                row.is_active = false;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }

    async fn insert(
        &self,
        authorization: &ContactAuthorization,
        _created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        self.authorizations.write().await.push(authorization.clone());
        Ok(())
    }
}
