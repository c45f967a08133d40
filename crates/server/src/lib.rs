use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::{EngineError, Money};

pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod accounts;
mod dashboard;
mod server;
mod shops;
mod transactions;
mod user;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        // Never 403: a foreign resource must look like a missing one.
        EngineError::Denied => StatusCode::NOT_FOUND,
        EngineError::ConcurrentModification(_)
        | EngineError::NonZeroBalance(_)
        | EngineError::AlreadyReversed
        | EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidAccount(_)
        | EngineError::SameAccount
        | EngineError::ReasonRequired
        | EngineError::InvalidTransaction(_)
        | EngineError::InvalidName(_)
        | EngineError::InvalidTimezone(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidCursor(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, error) = match self {
            ServerError::Engine(err) => (
                status_for_engine_error(&err),
                err.code(),
                message_for_engine_error(err),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", err),
        };

        (
            status,
            Json(ErrorBody {
                code: code.to_string(),
                error,
            }),
        )
            .into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Parse a decimal amount from a request body into minor units.
fn parse_amount(input: &str) -> Result<i64, ServerError> {
    let money: Money = input.parse()?;
    Ok(money.minor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn engine_denied_maps_to_404() {
        let res = ServerError::from(EngineError::Denied).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflicts_map_to_409() {
        for err in [
            EngineError::ConcurrentModification("x".to_string()),
            EngineError::NonZeroBalance("x".to_string()),
            EngineError::AlreadyReversed,
            EngineError::ExistingKey("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::SameAccount).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn database_errors_hide_the_message() {
        let err = EngineError::from(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        let res = ServerError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "INTERNAL");
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn amounts_are_parsed_as_decimals() {
        assert_eq!(parse_amount("150").ok(), Some(15_000));
        assert_eq!(parse_amount("1,5").ok(), Some(150));
        assert!(parse_amount("1.005").is_err());
    }
}
