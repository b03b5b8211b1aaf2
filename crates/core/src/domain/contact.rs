use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{AuthorizationId, ContactId, OrganizationId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub organization_id: OrganizationId,
    pub phone: String,
    pub country_code: String,
    pub first_name: String,
    pub last_name: String,
}

/// Notification channels a contact can authorize. Only WhatsApp exists today;
/// the column is free-form so new channels are additive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationType {
    OptIn,
    OptOut,
}

impl AuthorizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OptIn => "opt_in",
            Self::OptOut => "opt_out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "opt_in" => Some(Self::OptIn),
            "opt_out" => Some(Self::OptOut),
            _ => None,
        }
    }
}

/// Consent state reported back to the conversational layer after a booking:
/// `NotSet` is the signal to ask the user for notification consent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptInStatus {
    OptIn,
    OptOut,
    NotSet,
}

impl From<Option<AuthorizationType>> for OptInStatus {
    fn from(value: Option<AuthorizationType>) -> Self {
        match value {
            Some(AuthorizationType::OptIn) => Self::OptIn,
            Some(AuthorizationType::OptOut) => Self::OptOut,
            None => Self::NotSet,
        }
    }
}

/// One row of the append-only consent log. At most one row per
/// (contact, channel) may be active at a time; writers must deactivate the
/// prior active row before inserting a new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactAuthorization {
    pub id: AuthorizationId,
    pub contact_id: ContactId,
    pub organization_id: OrganizationId,
    pub authorization_type: AuthorizationType,
    pub channel: Channel,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
