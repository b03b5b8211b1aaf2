//! The tool-call surface consumed by the conversational layer.
//!
//! Every operation takes loosely-typed string inputs straight from a tool
//! call, validates them at the boundary, and returns a serialisable result
//! with a `success` flag and a user-facing Spanish `message`, never an error.
//! The orchestration layer relays `message` to the end user, so a failed
//! datastore call must still produce something a person can read.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use reserva_core::timefmt;
use reserva_core::{
    compute_available_slots, resolve_day_schedule, Appointment, AppointmentId, AppointmentStatus,
    AppointmentSummary, AuthorizationId, AuthorizationType, Channel, Contact, ContactAuthorization,
    ContactId, MemberDay, OptInStatus, OrganizationId, ServiceId, Slot, StaffMemberId,
    TimeInterval,
};
use reserva_db::repositories::{
    AppointmentRepository, AuthorizationRepository, ContactRepository, RepositoryError,
    ScheduleRepository,
};

use crate::dates::{resolve_relative_date, DateResolveError};

pub struct BookingTools {
    schedule: Arc<dyn ScheduleRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    contacts: Arc<dyn ContactRepository>,
    authorizations: Arc<dyn AuthorizationRepository>,
    /// Audit identity for writes no human staff member initiates directly
    /// (contact creation, consent records).
    system_actor: StaffMemberId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotView {
    pub start_time: String,
    pub end_time: String,
    pub member_id: StaffMemberId,
}

impl From<&Slot> for SlotView {
    fn from(slot: &Slot) -> Self {
        Self {
            start_time: timefmt::fmt_hm(slot.start_time),
            end_time: timefmt::fmt_hm(slot.end_time),
            member_id: slot.member_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub success: bool,
    pub appointment_id: Option<AppointmentId>,
    pub opt_in_status: OptInStatus,
    pub message: String,
}

impl BookingConfirmation {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            appointment_id: None,
            opt_in_status: OptInStatus::NotSet,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub appointment_id: Option<AppointmentId>,
    pub message: String,
}

impl OperationOutcome {
    fn success(appointment_id: AppointmentId, message: impl Into<String>) -> Self {
        Self { success: true, appointment_id: Some(appointment_id), message: message.into() }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, appointment_id: None, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContactResolution {
    pub success: bool,
    pub contact_id: Option<ContactId>,
    pub message: String,
    pub is_existing_contact: bool,
}

impl ContactResolution {
    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, contact_id: None, message: message.into(), is_existing_contact: false }
    }
}

/// Three-way lookup result. Collapsing this to found/not-found would lose
/// the disambiguation case, so the variants are part of the contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AppointmentLookup {
    Match {
        success: bool,
        appointment_id: AppointmentId,
        summary: String,
        service_id: ServiceId,
        member_id: StaffMemberId,
    },
    Candidates { success: bool, candidates: Vec<AppointmentCandidate>, message: String },
    NotFound { success: bool, message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppointmentCandidate {
    pub id: AppointmentId,
    pub date: NaiveDate,
    pub time: String,
    pub service: String,
}

impl AppointmentLookup {
    fn matched(summary: &AppointmentSummary) -> Self {
        Self::Match {
            success: true,
            appointment_id: summary.appointment_id,
            summary: format!(
                "{} {} {}",
                summary.service_name,
                summary.appointment_date,
                timefmt::fmt_hm(summary.start_time)
            ),
            service_id: summary.service_id,
            member_id: summary.member_id,
        }
    }

    fn candidates(matches: Vec<AppointmentSummary>) -> Self {
        Self::Candidates {
            success: true,
            candidates: matches
                .into_iter()
                .map(|summary| AppointmentCandidate {
                    id: summary.appointment_id,
                    date: summary.appointment_date,
                    time: timefmt::fmt_hm(summary.start_time),
                    service: summary.service_name,
                })
                .collect(),
            message: "Se encontraron varias citas; indica la hora exacta.".to_string(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { success: false, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptInResult {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotSelection {
    pub success: bool,
    pub message: String,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<String>,
    pub member_id: Option<StaffMemberId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DateResolution {
    pub success: bool,
    pub selected_date: Option<NaiveDate>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppointmentInfo {
    pub appointment_id: AppointmentId,
    pub summary: String,
}

enum ToolError {
    Validation(String),
    Repository(RepositoryError),
}

impl From<RepositoryError> for ToolError {
    fn from(error: RepositoryError) -> Self {
        Self::Repository(error)
    }
}

/// Maps an internal error to the user-facing message for `action` (e.g.
/// "agendar la cita"). Repository errors are logged, never shown.
fn failure_message(error: ToolError, action: &str) -> String {
    match error {
        ToolError::Validation(message) => message,
        ToolError::Repository(error) => {
            tracing::warn!(error = %error, action, "tool operation failed");
            format!("No pude {action} por un error interno.")
        }
    }
}

fn parse_uuid_field(value: &str, field: &'static str) -> Result<Uuid, ToolError> {
    Uuid::parse_str(value.trim()).map_err(|_| {
        ToolError::Validation(format!("El campo `{field}` no es un identificador válido."))
    })
}

fn parse_date_field(value: &str, field: &'static str) -> Result<NaiveDate, ToolError> {
    timefmt::parse_date(value).ok_or_else(|| {
        ToolError::Validation(format!("El campo `{field}` debe tener formato YYYY-MM-DD."))
    })
}

fn parse_time_field(value: &str, field: &'static str) -> Result<NaiveTime, ToolError> {
    timefmt::parse_time(value).ok_or_else(|| {
        ToolError::Validation(format!("El campo `{field}` debe tener formato HH:MM."))
    })
}

fn add_minutes(start: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(i64::from(minutes)));
    (wrapped == 0).then_some(end)
}

impl BookingTools {
    pub fn new(
        schedule: Arc<dyn ScheduleRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        contacts: Arc<dyn ContactRepository>,
        authorizations: Arc<dyn AuthorizationRepository>,
        system_actor: StaffMemberId,
    ) -> Self {
        Self { schedule, appointments, contacts, authorizations, system_actor }
    }

    /// Bookable slots for a service on a date. Every miss (unknown service,
    /// nobody assigned, closed day, malformed input) is "no availability":
    /// the caller always gets a list, possibly empty.
    pub async fn check_availability(
        &self,
        service_id: &str,
        organization_id: &str,
        date: &str,
    ) -> Vec<SlotView> {
        match self.compute_availability(service_id, organization_id, date).await {
            Ok(slots) => slots,
            Err(ToolError::Validation(message)) => {
                tracing::debug!(%message, "availability request rejected");
                Vec::new()
            }
            Err(ToolError::Repository(error)) => {
                tracing::warn!(error = %error, "availability lookup failed");
                Vec::new()
            }
        }
    }

    async fn compute_availability(
        &self,
        service_id: &str,
        organization_id: &str,
        date: &str,
    ) -> Result<Vec<SlotView>, ToolError> {
        let service_id = ServiceId(parse_uuid_field(service_id, "service_id")?);
        let organization_id = OrganizationId(parse_uuid_field(organization_id, "organization_id")?);
        let date = parse_date_field(date, "date")?;
        let weekday = date.weekday().number_from_monday();

        let Some(service) = self.schedule.find_service(&service_id).await? else {
            return Ok(Vec::new());
        };
        let members = self.schedule.assigned_staff(&service_id).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }

        // Independent read-only fetches; issued concurrently.
        let (org_day, staff_special, staff_weekday, booked) = tokio::try_join!(
            self.resolve_org_day(&organization_id, date, weekday),
            self.schedule.staff_special_dates(&members, date),
            self.schedule.staff_weekdays(&members, weekday),
            self.appointments.booked_intervals(&members, date, None),
        )?;

        let Some(org_day) = org_day else {
            return Ok(Vec::new());
        };
        if !org_day.is_available {
            tracing::debug!(date = %date, "organization closed");
            return Ok(Vec::new());
        }
        let org_intervals = org_day.working_intervals();
        if org_intervals.is_empty() {
            return Ok(Vec::new());
        }

        let member_days: Vec<MemberDay> = members
            .iter()
            .map(|member| {
                let schedule = resolve_day_schedule(
                    staff_special.get(member).cloned(),
                    staff_weekday.get(member).cloned(),
                );
                MemberDay {
                    member_id: *member,
                    // No record at all means unavailable, not open all day.
                    working: schedule
                        .map(|day| day.working_intervals())
                        .unwrap_or_default(),
                    booked: booked.get(member).cloned().unwrap_or_default(),
                }
            })
            .collect();

        let slots = compute_available_slots(service.duration_minutes, &org_intervals, &member_days);
        tracing::debug!(date = %date, count = slots.len(), "availability computed");
        Ok(slots.iter().map(SlotView::from).collect())
    }

    async fn resolve_org_day(
        &self,
        organization_id: &OrganizationId,
        date: NaiveDate,
        weekday: u32,
    ) -> Result<Option<reserva_core::DaySchedule>, RepositoryError> {
        let special = self.schedule.organization_special_date(organization_id, date).await?;
        let weekday_default = if special.is_some() {
            None
        } else {
            self.schedule.organization_weekday(organization_id, weekday).await?
        };
        Ok(resolve_day_schedule(special, weekday_default))
    }

    pub async fn resolve_contact_on_booking(
        &self,
        organization_id: &str,
        phone_number: &str,
        country_code: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> ContactResolution {
        self.resolve_contact_inner(organization_id, phone_number, country_code, first_name, last_name)
            .await
            .unwrap_or_else(|error| {
                ContactResolution::failure(failure_message(error, "resolver el contacto"))
            })
    }

    async fn resolve_contact_inner(
        &self,
        organization_id: &str,
        phone_number: &str,
        country_code: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<ContactResolution, ToolError> {
        let organization_id = OrganizationId(parse_uuid_field(organization_id, "organization_id")?);
        let phone = phone_number.trim();
        if phone.is_empty() {
            return Err(ToolError::Validation(
                "El campo `phone_number` no puede estar vacío.".to_string(),
            ));
        }
        let country = country_code.trim();
        if country.is_empty() {
            return Err(ToolError::Validation(
                "El campo `country_code` no puede estar vacío.".to_string(),
            ));
        }

        if let Some(existing) = self.contacts.find_by_phone(&organization_id, phone, country).await? {
            return Ok(ContactResolution {
                success: true,
                contact_id: Some(existing),
                message: "Contacto reconocido.".to_string(),
                is_existing_contact: true,
            });
        }

        // Lookup-then-insert without a transaction; a concurrent first
        // booking for the same phone can still race this.
        let contact = Contact {
            id: ContactId(Uuid::new_v4()),
            organization_id,
            phone: phone.to_string(),
            country_code: country.to_string(),
            first_name: non_empty_or(first_name, "Nuevo"),
            last_name: non_empty_or(last_name, "Contacto"),
        };
        self.contacts.insert(&contact, &self.system_actor).await?;

        Ok(ContactResolution {
            success: true,
            contact_id: Some(contact.id),
            message: "Nuevo contacto creado.".to_string(),
            is_existing_contact: false,
        })
    }

    pub async fn book_appointment(
        &self,
        organization_id: &str,
        contact_id: &str,
        service_id: &str,
        member_id: &str,
        appointment_date: &str,
        start_time: &str,
    ) -> BookingConfirmation {
        self.book_inner(organization_id, contact_id, service_id, member_id, appointment_date, start_time)
            .await
            .unwrap_or_else(|error| {
                BookingConfirmation::failure(failure_message(error, "agendar la cita"))
            })
    }

    async fn book_inner(
        &self,
        organization_id: &str,
        contact_id: &str,
        service_id: &str,
        member_id: &str,
        appointment_date: &str,
        start_time: &str,
    ) -> Result<BookingConfirmation, ToolError> {
        let organization_id = OrganizationId(parse_uuid_field(organization_id, "organization_id")?);
        let contact_id = ContactId(parse_uuid_field(contact_id, "contact_id")?);
        let service_id = ServiceId(parse_uuid_field(service_id, "service_id")?);
        let member_id = StaffMemberId(parse_uuid_field(member_id, "member_id")?);
        let date = parse_date_field(appointment_date, "appointment_date")?;
        let start = parse_time_field(start_time, "start_time")?;

        let Some(service) = self.schedule.find_service(&service_id).await? else {
            return Ok(BookingConfirmation::failure(
                "No pude encontrar el servicio para agendar.",
            ));
        };
        let Some(end) = add_minutes(start, service.duration_minutes) else {
            return Ok(BookingConfirmation::failure(
                "La hora de inicio no permite completar el servicio ese día.",
            ));
        };
        let Some(requested) = TimeInterval::new(start, end) else {
            return Ok(BookingConfirmation::failure(
                "La hora de inicio no permite completar el servicio ese día.",
            ));
        };

        // Best-effort double-booking guard. Read-then-insert, not atomic:
        // two concurrent bookings can still both pass the check.
        let booked = self.appointments.booked_intervals(&[member_id], date, None).await?;
        let conflict = booked
            .get(&member_id)
            .map_or(false, |intervals| intervals.iter().any(|interval| interval.overlaps(&requested)));
        if conflict {
            return Ok(BookingConfirmation::failure(
                "Ese horario ya está ocupado. ¿Quieres ver otras opciones?",
            ));
        }

        let appointment = Appointment {
            id: AppointmentId(Uuid::new_v4()),
            organization_id,
            contact_id,
            service_id,
            member_id,
            appointment_date: date,
            start_time: start,
            end_time: end,
            status: AppointmentStatus::Scheduled,
            notes: None,
        };
        self.appointments.insert(&appointment, &member_id).await?;
        tracing::info!(appointment_id = %appointment.id.0, date = %date, "appointment booked");

        // The appointment exists at this point; a failed consent read must
        // not turn the booking into a reported failure.
        let opt_in_status = match self.authorizations.latest_active(&contact_id, Channel::Whatsapp).await
        {
            Ok(latest) => OptInStatus::from(latest),
            Err(error) => {
                tracing::warn!(error = %error, "opt-in lookup failed after booking");
                OptInStatus::NotSet
            }
        };

        Ok(BookingConfirmation {
            success: true,
            appointment_id: Some(appointment.id),
            opt_in_status,
            message: format!(
                "Cita agendada con éxito para el {date} a las {}.",
                timefmt::fmt_hm(start)
            ),
        })
    }

    pub async fn cancel_appointment(&self, appointment_id: &str) -> OperationOutcome {
        self.cancel_inner(appointment_id).await.unwrap_or_else(|error| {
            OperationOutcome::failure(failure_message(error, "cancelar la cita"))
        })
    }

    async fn cancel_inner(&self, appointment_id: &str) -> Result<OperationOutcome, ToolError> {
        let id = AppointmentId(parse_uuid_field(appointment_id, "appointment_id")?);

        // Unconditional update: cancelling twice is fine as long as the row
        // exists.
        let updated = self.appointments.update_status(&id, AppointmentStatus::Cancelled).await?;
        if updated == 0 {
            return Ok(OperationOutcome::failure("No encontré la cita a cancelar."));
        }

        Ok(OperationOutcome::success(id, "Tu cita ha sido cancelada con éxito."))
    }

    pub async fn confirm_appointment(&self, appointment_id: &str) -> OperationOutcome {
        self.confirm_inner(appointment_id).await.unwrap_or_else(|error| {
            OperationOutcome::failure(failure_message(error, "confirmar la cita"))
        })
    }

    async fn confirm_inner(&self, appointment_id: &str) -> Result<OperationOutcome, ToolError> {
        let id = AppointmentId(parse_uuid_field(appointment_id, "appointment_id")?);

        let Some(appointment) = self.appointments.find_by_id(&id).await? else {
            return Ok(OperationOutcome::failure("No encontré la cita a confirmar."));
        };
        match appointment.status {
            AppointmentStatus::Scheduled => {}
            AppointmentStatus::Confirmed => {
                return Ok(OperationOutcome::failure("La cita ya estaba confirmada."));
            }
            AppointmentStatus::Cancelled => {
                return Ok(OperationOutcome::failure(
                    "No puedo confirmar una cita cancelada.",
                ));
            }
        }

        let updated = self
            .appointments
            .update_status_if(&id, AppointmentStatus::Scheduled, AppointmentStatus::Confirmed)
            .await?;
        if updated == 0 {
            return Ok(OperationOutcome::failure(
                "La cita cambió de estado; inténtalo de nuevo.",
            ));
        }

        Ok(OperationOutcome::success(id, "Cita confirmada."))
    }

    pub async fn reschedule_appointment(
        &self,
        appointment_id: &str,
        new_date: &str,
        new_start_time: &str,
        member_id: &str,
        comment: Option<&str>,
    ) -> OperationOutcome {
        self.reschedule_inner(appointment_id, new_date, new_start_time, member_id, comment)
            .await
            .unwrap_or_else(|error| {
                OperationOutcome::failure(failure_message(error, "reagendar la cita"))
            })
    }

    async fn reschedule_inner(
        &self,
        appointment_id: &str,
        new_date: &str,
        new_start_time: &str,
        member_id: &str,
        comment: Option<&str>,
    ) -> Result<OperationOutcome, ToolError> {
        let id = AppointmentId(parse_uuid_field(appointment_id, "appointment_id")?);
        let date = parse_date_field(new_date, "new_date")?;
        let start = parse_time_field(new_start_time, "new_start_time")?;
        let member_id = StaffMemberId(parse_uuid_field(member_id, "member_id")?);

        let Some(appointment) = self.appointments.find_by_id(&id).await? else {
            return Ok(OperationOutcome::failure("No encontré la cita a reagendar."));
        };
        if appointment.status == AppointmentStatus::Cancelled {
            return Ok(OperationOutcome::failure("No puedo reagendar una cita cancelada."));
        }

        let Some(service) = self.schedule.find_service(&appointment.service_id).await? else {
            return Ok(OperationOutcome::failure(
                "No pude obtener la duración del servicio.",
            ));
        };
        let Some(end) = add_minutes(start, service.duration_minutes) else {
            return Ok(OperationOutcome::failure(
                "La nueva hora no permite completar el servicio ese día.",
            ));
        };
        let Some(requested) = TimeInterval::new(start, end) else {
            return Ok(OperationOutcome::failure(
                "La nueva hora no permite completar el servicio ese día.",
            ));
        };

        // Same best-effort guard as booking, ignoring this appointment's own
        // row.
        let booked = self.appointments.booked_intervals(&[member_id], date, Some(&id)).await?;
        let conflict = booked
            .get(&member_id)
            .map_or(false, |intervals| intervals.iter().any(|interval| interval.overlaps(&requested)));
        if conflict {
            return Ok(OperationOutcome::failure(
                "Ese horario ya está ocupado. ¿Quieres ver otras opciones?",
            ));
        }

        let mut audit_line = format!(
            "Reagendado de {} {} a {} {}",
            appointment.appointment_date,
            timefmt::fmt_hms(appointment.start_time),
            date,
            timefmt::fmt_hms(start)
        );
        if let Some(comment) = comment.map(str::trim).filter(|comment| !comment.is_empty()) {
            audit_line.push_str(" | Nota: ");
            audit_line.push_str(comment);
        }
        // Notes accumulate; prior history is never overwritten.
        let notes = match appointment.notes.as_deref().map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{audit_line}"),
            _ => audit_line,
        };

        let updated = self
            .appointments
            .apply_reschedule(&id, date, start, end, &member_id, &notes)
            .await?;
        if updated == 0 {
            return Ok(OperationOutcome::failure("No encontré la cita a reagendar."));
        }
        tracing::info!(appointment_id = %id.0, date = %date, "appointment rescheduled");

        Ok(OperationOutcome::success(id, "Cita reagendada con éxito."))
    }

    pub async fn find_appointment_for_cancellation(
        &self,
        contact_id: &str,
        date_str: &str,
        time_str: Option<&str>,
    ) -> AppointmentLookup {
        self.find_appointment(contact_id, date_str, time_str).await
    }

    pub async fn find_appointment_for_update(
        &self,
        contact_id: &str,
        date_str: &str,
        time_str: Option<&str>,
    ) -> AppointmentLookup {
        self.find_appointment(contact_id, date_str, time_str).await
    }

    async fn find_appointment(
        &self,
        contact_id: &str,
        date_str: &str,
        time_str: Option<&str>,
    ) -> AppointmentLookup {
        self.find_appointment_inner(contact_id, date_str, time_str)
            .await
            .unwrap_or_else(|error| {
                AppointmentLookup::not_found(failure_message(error, "buscar la cita"))
            })
    }

    async fn find_appointment_inner(
        &self,
        contact_id: &str,
        date_str: &str,
        time_str: Option<&str>,
    ) -> Result<AppointmentLookup, ToolError> {
        let contact_id = ContactId(parse_uuid_field(contact_id, "contact_id")?);
        let date = parse_date_field(date_str, "date_str")?;
        let start = match time_str {
            Some(raw) => Some(parse_time_field(raw, "time_str")?),
            None => None,
        };

        let mut matches = self.appointments.find_for_contact(&contact_id, date, start).await?;
        Ok(match matches.len() {
            0 => AppointmentLookup::not_found("No encontré una cita que coincida."),
            1 => AppointmentLookup::matched(&matches.remove(0)),
            _ => AppointmentLookup::candidates(matches),
        })
    }

    pub async fn create_whatsapp_opt_in(
        &self,
        contact_id: &str,
        organization_id: &str,
    ) -> OptInResult {
        self.opt_in_inner(contact_id, organization_id).await.unwrap_or_else(|error| OptInResult {
            success: false,
            message: failure_message(error, "guardar la preferencia"),
        })
    }

    async fn opt_in_inner(
        &self,
        contact_id: &str,
        organization_id: &str,
    ) -> Result<OptInResult, ToolError> {
        let contact_id = ContactId(parse_uuid_field(contact_id, "contact_id")?);
        let organization_id = OrganizationId(parse_uuid_field(organization_id, "organization_id")?);

        // Deactivate strictly before inserting; reordering would let two
        // active consent rows coexist.
        self.authorizations.deactivate_active(&contact_id, Channel::Whatsapp).await?;

        let authorization = ContactAuthorization {
            id: AuthorizationId(Uuid::new_v4()),
            contact_id,
            organization_id,
            authorization_type: AuthorizationType::OptIn,
            channel: Channel::Whatsapp,
            is_active: true,
            created_at: Utc::now(),
        };
        self.authorizations.insert(&authorization, &self.system_actor).await?;

        Ok(OptInResult { success: true, message: "Preferencia de notificaciones guardada.".to_string() })
    }

    /// A contact's upcoming appointments from the caller-supplied "now".
    /// Errors degrade to an empty list; there is nothing actionable for the
    /// end user in a failed listing.
    pub async fn list_upcoming_appointments(
        &self,
        contact_id: &str,
        today: &str,
        now_time: &str,
    ) -> Vec<AppointmentInfo> {
        let result: Result<Vec<AppointmentInfo>, ToolError> = async {
            let contact_id = ContactId(parse_uuid_field(contact_id, "contact_id")?);
            let today = parse_date_field(today, "today")?;
            let now_time = parse_time_field(now_time, "now_time")?;
            let rows = self.appointments.list_from(&contact_id, today, now_time).await?;
            Ok(rows.iter().map(appointment_info).collect())
        }
        .await;

        result.unwrap_or_else(|error| {
            failure_message(error, "consultar las citas");
            Vec::new()
        })
    }

    pub async fn list_appointments_on_date(
        &self,
        contact_id: &str,
        date_str: &str,
    ) -> Vec<AppointmentInfo> {
        let result: Result<Vec<AppointmentInfo>, ToolError> = async {
            let contact_id = ContactId(parse_uuid_field(contact_id, "contact_id")?);
            let date = parse_date_field(date_str, "date_str")?;
            let rows = self.appointments.find_for_contact(&contact_id, date, None).await?;
            Ok(rows.iter().map(appointment_info).collect())
        }
        .await;

        result.unwrap_or_else(|error| {
            failure_message(error, "consultar las citas");
            Vec::new()
        })
    }
}

fn appointment_info(summary: &AppointmentSummary) -> AppointmentInfo {
    AppointmentInfo {
        appointment_id: summary.appointment_id,
        summary: format!(
            "Cita para «{}» el {} a las {}",
            summary.service_name,
            summary.appointment_date,
            timefmt::fmt_hm(summary.start_time)
        ),
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Picks one of the previously offered slots by start time. Purely a lookup:
/// the offered list came from `check_availability` and is carried in the
/// conversation context.
pub fn select_appointment_slot(
    available_slots: &[Slot],
    appointment_date: NaiveDate,
    start_time: &str,
) -> SlotSelection {
    let Some(start) = timefmt::parse_time(start_time) else {
        return SlotSelection {
            success: false,
            message: format!("La hora `{start_time}` no tiene un formato válido."),
            selected_date: None,
            selected_time: None,
            member_id: None,
        };
    };

    match available_slots.iter().find(|slot| slot.start_time == start) {
        Some(slot) => SlotSelection {
            success: true,
            message: format!(
                "Perfecto, has seleccionado el {appointment_date} a las {}.",
                timefmt::fmt_hm(start)
            ),
            selected_date: Some(appointment_date),
            selected_time: Some(timefmt::fmt_hm(start)),
            member_id: Some(slot.member_id),
        },
        None => SlotSelection {
            success: false,
            message: format!(
                "No encontré el horario {} entre las opciones ofrecidas.",
                timefmt::fmt_hm(start)
            ),
            selected_date: None,
            selected_time: None,
            member_id: None,
        },
    }
}

/// Resolves a Spanish date expression against the caller-supplied `today`
/// (the orchestration layer owns timezone handling).
pub fn resolve_date(date_text: &str, today: &str) -> DateResolution {
    let Some(today) = timefmt::parse_date(today) else {
        return DateResolution {
            success: false,
            selected_date: None,
            message: "El campo `today` debe tener formato YYYY-MM-DD.".to_string(),
        };
    };

    match resolve_relative_date(date_text, today) {
        Ok(date) => DateResolution {
            success: true,
            selected_date: Some(date),
            message: format!("Fecha interpretada: {date}."),
        },
        Err(DateResolveError::InvalidDate) => DateResolution {
            success: false,
            selected_date: None,
            message: "Fecha inválida.".to_string(),
        },
        Err(DateResolveError::Unrecognized) => DateResolution {
            success: false,
            selected_date: None,
            message: "No pude interpretar la fecha.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use reserva_core::{
        DaySchedule, OrganizationId, Service, ServiceId, Slot, StaffMemberId,
    };
    use reserva_db::repositories::{
        InMemoryAppointmentRepository, InMemoryAuthorizationRepository, InMemoryContactRepository,
        InMemoryScheduleRepository,
    };

    use super::{resolve_date, select_appointment_slot, AppointmentLookup, BookingTools};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    struct Harness {
        schedule: Arc<InMemoryScheduleRepository>,
        appointments: Arc<InMemoryAppointmentRepository>,
        authorizations: Arc<InMemoryAuthorizationRepository>,
        tools: BookingTools,
    }

    fn harness() -> Harness {
        let schedule = Arc::new(InMemoryScheduleRepository::default());
        let appointments = Arc::new(InMemoryAppointmentRepository::default());
        let contacts = Arc::new(InMemoryContactRepository::default());
        let authorizations = Arc::new(InMemoryAuthorizationRepository::default());
        let tools = BookingTools::new(
            schedule.clone(),
            appointments.clone(),
            contacts.clone(),
            authorizations.clone(),
            StaffMemberId(Uuid::from_u128(0xA0)),
        );
        Harness { schedule, appointments, authorizations, tools }
    }

    const ORG: &str = "99999999-9999-4999-8999-999999999999";
    const SERVICE: &str = "11111111-1111-4111-8111-111111111111";
    const MEMBER: &str = "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
    const CONTACT: &str = "cccccccc-cccc-4ccc-8ccc-cccccccccccc";

    async fn seed_monday_schedule(harness: &Harness) {
        let service_id = ServiceId(Uuid::parse_str(SERVICE).unwrap());
        let member_id = StaffMemberId(Uuid::parse_str(MEMBER).unwrap());
        let organization_id = OrganizationId(Uuid::parse_str(ORG).unwrap());

        harness
            .schedule
            .add_service(Service { id: service_id, name: "Manicure".to_string(), duration_minutes: 30 })
            .await;
        harness.schedule.assign(service_id, member_id).await;
        harness
            .schedule
            .set_org_weekday(organization_id, 1, DaySchedule::open(t(9, 0), t(17, 0)))
            .await;
        harness
            .schedule
            .set_staff_weekday(member_id, 1, DaySchedule::open(t(9, 0), t(17, 0)))
            .await;
        harness.appointments.register_service_name(service_id, "Manicure").await;
    }

    #[tokio::test]
    async fn malformed_inputs_produce_no_availability() {
        let harness = harness();
        assert!(harness.tools.check_availability("not-a-uuid", ORG, "2025-03-10").await.is_empty());
        assert!(harness.tools.check_availability(SERVICE, ORG, "10/03/2025").await.is_empty());
    }

    #[tokio::test]
    async fn unknown_service_is_empty_not_an_error() {
        let harness = harness();
        let slots = harness.tools.check_availability(SERVICE, ORG, "2025-03-10").await;
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn open_monday_yields_the_full_grid() {
        let harness = harness();
        seed_monday_schedule(&harness).await;

        // 2025-03-10 is a Monday.
        let slots = harness.tools.check_availability(SERVICE, ORG, "2025-03-10").await;
        assert_eq!(slots.len(), 31);
        assert_eq!(slots.first().unwrap().start_time, "09:00");
        assert_eq!(slots.last().unwrap().start_time, "16:30");
        assert!(slots.iter().all(|slot| slot.member_id.0.to_string() == MEMBER));
    }

    #[tokio::test]
    async fn booking_requires_a_known_service() {
        let harness = harness();
        let confirmation = harness
            .tools
            .book_appointment(ORG, CONTACT, SERVICE, MEMBER, "2025-03-10", "10:00")
            .await;
        assert!(!confirmation.success);
        assert_eq!(harness.appointments.count().await, 0, "nothing may be inserted");
    }

    #[tokio::test]
    async fn booking_validation_names_the_offending_field() {
        let harness = harness();
        seed_monday_schedule(&harness).await;

        let confirmation = harness
            .tools
            .book_appointment(ORG, CONTACT, SERVICE, MEMBER, "10/03/2025", "10:00")
            .await;
        assert!(!confirmation.success);
        assert!(confirmation.message.contains("appointment_date"));

        let confirmation = harness
            .tools
            .book_appointment(ORG, CONTACT, SERVICE, "zzz", "2025-03-10", "10:00")
            .await;
        assert!(!confirmation.success);
        assert!(confirmation.message.contains("member_id"));
    }

    #[tokio::test]
    async fn confirm_rejects_a_cancelled_appointment() {
        let harness = harness();
        seed_monday_schedule(&harness).await;

        let booked = harness
            .tools
            .book_appointment(ORG, CONTACT, SERVICE, MEMBER, "2025-03-10", "10:00")
            .await;
        assert!(booked.success);
        let id = booked.appointment_id.unwrap().0.to_string();

        assert!(harness.tools.cancel_appointment(&id).await.success);
        let confirm = harness.tools.confirm_appointment(&id).await;
        assert!(!confirm.success);
        assert!(confirm.message.contains("cancelada"));
    }

    #[tokio::test]
    async fn lookup_is_three_way() {
        let harness = harness();
        seed_monday_schedule(&harness).await;

        let none = harness
            .tools
            .find_appointment_for_cancellation(CONTACT, "2025-03-10", None)
            .await;
        assert!(matches!(none, AppointmentLookup::NotFound { .. }));

        harness.tools.book_appointment(ORG, CONTACT, SERVICE, MEMBER, "2025-03-10", "10:00").await;
        let single = harness
            .tools
            .find_appointment_for_cancellation(CONTACT, "2025-03-10", None)
            .await;
        assert!(matches!(single, AppointmentLookup::Match { .. }));

        harness.tools.book_appointment(ORG, CONTACT, SERVICE, MEMBER, "2025-03-10", "14:00").await;
        let several = harness
            .tools
            .find_appointment_for_cancellation(CONTACT, "2025-03-10", None)
            .await;
        match several {
            AppointmentLookup::Candidates { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("expected candidates, got {other:?}"),
        }

        let narrowed = harness
            .tools
            .find_appointment_for_update(CONTACT, "2025-03-10", Some("14:00"))
            .await;
        assert!(matches!(narrowed, AppointmentLookup::Match { .. }));
    }

    #[tokio::test]
    async fn double_opt_in_keeps_one_active_record() {
        let harness = harness();
        let contact_id = reserva_core::ContactId(Uuid::parse_str(CONTACT).unwrap());

        assert!(harness.tools.create_whatsapp_opt_in(CONTACT, ORG).await.success);
        assert!(harness.tools.create_whatsapp_opt_in(CONTACT, ORG).await.success);

        assert_eq!(
            harness.authorizations.active_count(&contact_id, reserva_core::Channel::Whatsapp).await,
            1
        );
        assert_eq!(harness.authorizations.all().await.len(), 2, "history is append-only");
    }

    #[test]
    fn slot_selection_matches_on_start_time() {
        let member = StaffMemberId(Uuid::from_u128(7));
        let slots = vec![
            Slot { start_time: t(9, 0), end_time: t(9, 30), member_id: member },
            Slot { start_time: t(9, 15), end_time: t(9, 45), member_id: member },
        ];
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let selected = select_appointment_slot(&slots, date, "09:15");
        assert!(selected.success);
        assert_eq!(selected.member_id, Some(member));
        assert_eq!(selected.selected_time.as_deref(), Some("09:15"));

        let missing = select_appointment_slot(&slots, date, "11:00");
        assert!(!missing.success);

        let malformed = select_appointment_slot(&slots, date, "9h15");
        assert!(!malformed.success);
    }

    #[test]
    fn date_resolution_wraps_the_resolver() {
        let resolved = resolve_date("mañana", "2025-03-10");
        assert!(resolved.success);
        assert_eq!(
            resolved.selected_date,
            Some(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap())
        );

        assert!(!resolve_date("mañana", "not-a-date").success);
        assert!(!resolve_date("31/02", "2025-03-10").success);
    }
}
