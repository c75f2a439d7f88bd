use std::fmt;

use serde::{Deserialize, Serialize};

use crate::availability::{AvailabilitySnapshot, DomainStatus};
use crate::validation::{validate_email, validate_store_name, FieldError};

/// Store category offered by the creation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    Fashion,
    Electronics,
    Groceries,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Fashion, Self::Electronics, Self::Groceries];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fashion => "Fashion",
            Self::Electronics => "Electronics",
            Self::Groceries => "Groceries",
        }
    }
}

/// Country the store operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Country {
    #[default]
    Bangladesh,
}

impl Country {
    pub const ALL: [Country; 1] = [Self::Bangladesh];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bangladesh => "Bangladesh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Bdt,
}

impl Currency {
    pub const ALL: [Currency; 1] = [Self::Bdt];

    pub fn code(self) -> &'static str {
        match self {
            Self::Bdt => "BDT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bdt => "BDT (৳ Taka)",
        }
    }
}

/// Raw values of the store creation form as submitted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct StoreDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub location: Country,
    #[serde(default)]
    pub currency: Currency,
}

/// JSON body accepted by the remote store creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateStoreRequest {
    pub name: String,
    pub currency: Currency,
    pub country: Country,
    pub domain: String,
    pub category: Category,
    pub email: String,
}

/// Per-field failures collected by [`SubmissionGate::evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub name: Option<FieldError>,
    pub email: Option<FieldError>,
    pub domain: Option<FieldError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.domain.is_none()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = [self.name, self.email, self.domain]
            .into_iter()
            .flatten()
            .map(|err| err.to_string())
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}

/// Decides whether a draft may be sent to the store API.
pub struct SubmissionGate;

impl SubmissionGate {
    /// Validates every field independently against the latest availability snapshot.
    ///
    /// The request is only produced when the name and email are valid and the
    /// snapshot reports the submitted domain as available.
    pub fn evaluate(
        draft: &StoreDraft,
        availability: &AvailabilitySnapshot,
    ) -> Result<CreateStoreRequest, FormErrors> {
        let domain = draft.domain.trim();
        let errors = FormErrors {
            name: validate_store_name(&draft.name).err(),
            email: validate_email(&draft.email).err(),
            domain: domain_error(domain, availability),
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CreateStoreRequest {
            name: draft.name.clone(),
            currency: draft.currency,
            country: draft.location,
            domain: domain.to_string(),
            category: draft.category,
            email: draft.email.clone(),
        })
    }
}

fn domain_error(domain: &str, availability: &AvailabilitySnapshot) -> Option<FieldError> {
    if domain.is_empty() {
        return Some(FieldError::DomainEmpty);
    }
    if availability.domain != domain {
        return Some(FieldError::DomainUnconfirmed);
    }
    match availability.status {
        DomainStatus::Available => None,
        DomainStatus::Idle | DomainStatus::Checking => Some(FieldError::DomainUnconfirmed),
        status @ (DomainStatus::Taken | DomainStatus::Failed) => {
            Some(FieldError::DomainRejected(status))
        }
    }
}
