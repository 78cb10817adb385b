//! Validated JSON extractor - Combines deserialization with validation.
//!
//! Rejections are reported in the coded error-list wire format, one entry
//! per failed field.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::{
    AppError, ErrorDescription, CODE_INVALID_EMAIL, CODE_INVALID_JSON_SCHEMA, CODE_INVALID_NAME,
    CODE_INVALID_PASSWORD,
};

/// JSON extractor that validates the payload before the handler runs.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            AppError::Validation(vec![ErrorDescription {
                code: CODE_INVALID_JSON_SCHEMA,
                msg: format!("invalid json schema: {}", e.body_text()),
            }])
        })?;

        value
            .validate()
            .map_err(|e| AppError::Validation(describe_validation_errors(&e)))?;

        Ok(ValidatedJson(value))
    }
}

/// Map field-level validation failures onto wire error codes.
fn describe_validation_errors(errors: &ValidationErrors) -> Vec<ErrorDescription> {
    let mut descriptions: Vec<ErrorDescription> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| ErrorDescription {
                code: field_code(&field),
                msg: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid")),
            })
        })
        .collect();

    // HashMap iteration order is unstable; keep responses deterministic.
    descriptions.sort_by_key(|d| d.code);
    descriptions
}

fn field_code(field: &str) -> u16 {
    match field {
        "email" => CODE_INVALID_EMAIL,
        "password" => CODE_INVALID_PASSWORD,
        "name" => CODE_INVALID_NAME,
        _ => CODE_INVALID_JSON_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(email(message = "invalid email"))]
        email: String,
        #[validate(length(min = 1, message = "invalid name"))]
        name: String,
        #[validate(length(min = 4, message = "invalid password"))]
        password: String,
    }

    #[test]
    fn field_failures_map_to_their_codes() {
        let payload = Payload {
            email: "not-an-address".to_string(),
            name: String::new(),
            password: "abc".to_string(),
        };

        let errors = payload.validate().unwrap_err();
        let descriptions = describe_validation_errors(&errors);

        let codes: Vec<u16> = descriptions.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![CODE_INVALID_EMAIL, CODE_INVALID_PASSWORD, CODE_INVALID_NAME]
        );
    }

    #[test]
    fn valid_payload_produces_no_descriptions() {
        let payload = Payload {
            email: "ann@x.com".to_string(),
            name: "ann".to_string(),
            password: "secret".to_string(),
        };

        assert!(payload.validate().is_ok());
    }

    #[test]
    fn unknown_fields_fall_back_to_the_schema_code() {
        assert_eq!(field_code("nickname"), CODE_INVALID_JSON_SCHEMA);
    }
}
