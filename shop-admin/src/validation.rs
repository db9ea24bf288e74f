use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shop_core::errors::ShopError;
use validator::Validate;

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        "url" => Some("must be a valid URL"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

type FieldErrors = BTreeMap<String, Vec<String>>;

fn push_validation_errors(out: &mut FieldErrors, prefix: &str, errs: &validator::ValidationErrors) {
    for (field, kind) in errs.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    out.entry(key.clone()).or_default().push(msg);
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, &join_path(prefix, field), nested.as_ref());
            }
            validator::ValidationErrorsKind::List(list) => {
                let base = join_path(prefix, field);
                for (idx, nested) in list {
                    push_validation_errors(out, &format!("{base}[{idx}]"), nested.as_ref());
                }
            }
        }
    }
}

/// Deserialize and validate a payload; failures become 422 with
/// per-field messages under `errors`.
pub fn validate<T>(data: &Value, error_message: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(data.clone()).map_err(|e| {
        ShopError::unprocessable(error_message)
            .with_errors(json!({"_schema": [e.to_string()]}))
            .into_anyhow()
    })?;

    parsed.validate().map_err(|e| {
        let mut fields = FieldErrors::new();
        push_validation_errors(&mut fields, "", &e);
        ShopError::unprocessable(error_message)
            .with_errors(json!(fields))
            .into_anyhow()
    })?;

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use shop_core::errors::ShopError;
    use validator::Validate;

    use super::validate;

    #[derive(Debug, Deserialize, Validate)]
    struct Line {
        #[validate(range(min = 1, message = "quantity must be at least 1"))]
        quantity: u32,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Order {
        #[validate(email(message = "email must be valid"))]
        email: String,

        #[validate(nested)]
        products: Vec<Line>,
    }

    #[test]
    fn nested_and_list_errors_are_flattened_with_paths() {
        let data = json!({
            "email": "not-an-email",
            "products": [{"quantity": 0}]
        });

        let err = validate::<Order>(&data, "Order validation failed").unwrap_err();
        let shop = ShopError::from_anyhow(&err).expect("must be ShopError");
        let errors = shop.errors.as_ref().unwrap();

        assert_eq!(shop.code(), 422);
        assert_eq!(errors["email"][0], "email must be valid");
        assert_eq!(errors["products[0].quantity"][0], "quantity must be at least 1");
    }

    #[test]
    fn type_mismatches_are_reported_under_schema() {
        let err = validate::<Order>(&json!({"email": 3}), "Order validation failed").unwrap_err();
        let shop = ShopError::from_anyhow(&err).unwrap();
        assert!(shop.errors.as_ref().unwrap().get("_schema").is_some());
    }
}
