use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::AppError;

/// `{ success, error, message }` with the payload fields flattened in.
#[derive(Debug, Serialize)]
pub struct Envelope<T = Map<String, Value>> {
    pub success: bool,
    pub error: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl Envelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            error: true,
            message: message.into(),
            data: Map::new(),
        }
    }
}

pub struct Reply<T = Map<String, Value>> {
    status: StatusCode,
    body: Envelope<T>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Reply::with(StatusCode::OK, message, Map::new())
    }
}

impl<T: Serialize> Reply<T> {
    pub fn with(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Reply {
            status,
            body: Envelope {
                success: true,
                error: false,
                message: message.into(),
                data,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// JSON body whose rejections answer in the envelope instead of plain text.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::Validation(format!("Malformed request body: {}", rejection.body_text()))
}
