//! Lead capture handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::AppState;
use trades_common::{
    db::{models::Lead, NewLead, Repository},
    errors::{AppError, Result},
    metrics::record_lead,
};

/// Contact form submission
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(min = 5, max = 40))]
    pub phone: Option<String>,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub message: String,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub source_path: String,

    /// UTM parameters as a flat JSON object
    #[serde(default)]
    pub utm: Option<Value>,
}

impl CreateLeadRequest {
    /// Blank optional fields count as absent
    fn normalize(mut self) -> Self {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        self.email = blank_to_none(self.email);
        self.phone = blank_to_none(self.phone);
        self.name = self.name.trim().to_string();
        self
    }

    /// Validate and convert into a storable lead
    fn into_new_lead(self) -> Result<NewLead> {
        let request = self.normalize();

        request.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: e.field_errors().keys().next().map(|k| k.to_string()),
        })?;

        if request.email.is_none() && request.phone.is_none() {
            return Err(AppError::Validation {
                message: "Either email or phone is required".into(),
                field: Some("email".into()),
            });
        }

        let utm = match request.utm {
            None | Some(Value::Null) => Value::Object(Default::default()),
            Some(Value::Object(map)) => Value::Object(map),
            Some(_) => {
                return Err(AppError::Validation {
                    message: "utm must be a JSON object".into(),
                    field: Some("utm".into()),
                })
            }
        };

        Ok(NewLead {
            name: request.name,
            email: request.email.unwrap_or_default(),
            phone: request.phone.unwrap_or_default(),
            message: request.message,
            source_path: request.source_path,
            utm,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub source_path: String,
    pub utm: Value,
    pub created_at: String,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            source_path: lead.source_path,
            utm: lead.utm,
            created_at: lead.created_at.to_rfc3339(),
        }
    }
}

/// Store a lead (create-only)
pub async fn create_lead(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateLeadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LeadResponse>)> {
    let Json(request) = payload.map_err(|e| AppError::InvalidFormat {
        message: e.body_text(),
    })?;
    let new_lead = request.into_new_lead()?;

    let repo = Repository::new(state.db.clone());
    let lead = repo.create_lead(new_lead).await?;
    record_lead(true);

    tracing::info!(
        lead_id = lead.id,
        source_path = %lead.source_path,
        "Lead captured"
    );

    Ok((StatusCode::CREATED, Json(lead.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_or_phone_required() {
        let request = CreateLeadRequest {
            name: "Ana".into(),
            email: Some("   ".into()),
            ..Default::default()
        };
        let err = request.into_new_lead().unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "email"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let request = CreateLeadRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(matches!(request.into_new_lead(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_phone_only_lead_with_default_utm() {
        let request = CreateLeadRequest {
            name: " Ana ".into(),
            phone: Some("+1 555 0100".into()),
            source_path: "/services/roofing".into(),
            ..Default::default()
        };
        let lead = request.into_new_lead().unwrap();
        assert_eq!(lead.name, "Ana");
        assert_eq!(lead.email, "");
        assert_eq!(lead.utm, json!({}));
    }

    #[test]
    fn test_utm_must_be_object() {
        let request = CreateLeadRequest {
            email: Some("ana@example.com".into()),
            utm: Some(json!(["google"])),
            ..Default::default()
        };
        let err = request.into_new_lead().unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "utm"));
    }
}
