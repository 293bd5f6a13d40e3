use super::{add_log, failure, HttpState, LogEntry, RequestData};
use crate::domain::document::Document;
use crate::domain::error::{AppError, Result};
use crate::domain::workflow::WorkflowView;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use std::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

/// Either a browser data URI or a MIME type with a base64 payload.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDocumentRequest {
    #[validate(length(min = 1))]
    pub document_data_uri: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub mime_type: Option<String>,
    #[validate(length(min = 1))]
    pub data: Option<String>,
    #[validate(length(max = 255))]
    pub file_name: Option<String>,
}

impl SubmitDocumentRequest {
    fn into_document(self) -> Result<Document> {
        let document = match (self.document_data_uri, self.data) {
            (Some(data_uri), _) => Document::from_data_uri(&data_uri)?,
            (None, Some(data)) => {
                let mime_type = self.mime_type.ok_or_else(|| {
                    AppError::ValidationError("mimeType is required with data.".to_string())
                })?;
                Document::from_base64(&mime_type, &data)?
            }
            (None, None) => {
                return Err(AppError::ValidationError(
                    "Provide documentDataUri, or mimeType with base64 data.".to_string(),
                ))
            }
        };
        Ok(document.with_file_name(self.file_name))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1))]
    pub feedback: String,
}

fn respond(logs: &Mutex<Vec<LogEntry>>, context: &str, result: Result<WorkflowView>) -> HttpResponse {
    match result {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => failure(logs, context, e),
    }
}

fn validated<T: Validate>(req: &web::Json<T>) -> Result<()> {
    req.req_data()
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))
}

#[post("/sessions")]
async fn create_session(data: web::Data<HttpState>) -> impl Responder {
    let view = data.app_state.workflow.create_session();
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Session {} created", view.id),
    );
    HttpResponse::Created().json(view)
}

#[get("/sessions/{id}")]
async fn get_session(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data.app_state.workflow.view(path.into_inner());
    respond(&data.logs, "Session lookup", result)
}

#[delete("/sessions/{id}")]
async fn delete_session(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    match data.app_state.workflow.delete_session(path.into_inner()) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => failure(&data.logs, "Session removal", e),
    }
}

#[post("/sessions/{id}/document")]
async fn submit_document(
    data: web::Data<HttpState>,
    path: web::Path<Uuid>,
    req: web::Json<SubmitDocumentRequest>,
) -> impl Responder {
    let session_id = path.into_inner();
    if let Err(e) = validated(&req) {
        return failure(&data.logs, "Document upload", e);
    }
    let document = match req.into_inner().into_document() {
        Ok(document) => document,
        Err(e) => return failure(&data.logs, "Document upload", e),
    };

    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Document received for session {} ({} bytes, {})",
            session_id,
            document.len(),
            document.mime_type
        ),
    );

    let result = data
        .app_state
        .workflow
        .submit_document(session_id, document)
        .await;
    respond(&data.logs, "Document upload", result)
}

#[post("/sessions/{id}/parse-feedback")]
async fn submit_parse_feedback(
    data: web::Data<HttpState>,
    path: web::Path<Uuid>,
    req: web::Json<FeedbackRequest>,
) -> impl Responder {
    if let Err(e) = validated(&req) {
        return failure(&data.logs, "Parse feedback", e);
    }
    let result = data
        .app_state
        .workflow
        .submit_parse_feedback(path.into_inner(), &req.req_data().feedback)
        .await;
    respond(&data.logs, "Parse feedback", result)
}

#[post("/sessions/{id}/generate")]
async fn generate(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data.app_state.workflow.generate(path.into_inner()).await;
    respond(&data.logs, "Generation", result)
}

#[post("/sessions/{id}/refine")]
async fn refine(
    data: web::Data<HttpState>,
    path: web::Path<Uuid>,
    req: web::Json<FeedbackRequest>,
) -> impl Responder {
    if let Err(e) = validated(&req) {
        return failure(&data.logs, "Refinement", e);
    }
    let result = data
        .app_state
        .workflow
        .refine(path.into_inner(), &req.req_data().feedback)
        .await;
    respond(&data.logs, "Refinement", result)
}

#[post("/sessions/{id}/approve")]
async fn approve(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data.app_state.workflow.approve(path.into_inner());
    respond(&data.logs, "Approval", result)
}

#[post("/sessions/{id}/compliance")]
async fn check_compliance(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data
        .app_state
        .workflow
        .check_compliance(path.into_inner())
        .await;
    respond(&data.logs, "Compliance check", result)
}

#[post("/sessions/{id}/export")]
async fn export(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data.app_state.workflow.export(path.into_inner()).await;
    respond(&data.logs, "Jira export", result)
}

#[post("/sessions/{id}/restart")]
async fn restart(data: web::Data<HttpState>, path: web::Path<Uuid>) -> impl Responder {
    let result = data.app_state.workflow.restart(path.into_inner());
    respond(&data.logs, "Restart", result)
}

pub(super) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_session)
        .service(get_session)
        .service(delete_session)
        .service(submit_document)
        .service(submit_parse_feedback)
        .service(generate)
        .service(refine)
        .service(approve)
        .service(check_compliance)
        .service(export)
        .service(restart);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> SubmitDocumentRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_data_uri_request_becomes_document() {
        let document = request(
            r#"{"documentDataUri": "data:text/plain;base64,UkVRLTE=", "fileName": "srs.txt"}"#,
        )
        .into_document()
        .unwrap();

        assert_eq!(document.bytes, b"REQ-1".to_vec());
        assert_eq!(document.mime_type, "text/plain");
        assert_eq!(document.file_name.as_deref(), Some("srs.txt"));
    }

    #[test]
    fn test_base64_request_needs_mime_type() {
        let result = request(r#"{"data": "UkVRLTE="}"#).into_document();
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let document = request(r#"{"mimeType": "text/markdown", "data": "UkVRLTE="}"#)
            .into_document()
            .unwrap();
        assert_eq!(document.mime_type, "text/markdown");
    }

    #[test]
    fn test_empty_request_is_rejected() {
        let result = request("{}").into_document();
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_empty_feedback_fails_validation() {
        let req: FeedbackRequest = serde_json::from_str(r#"{"feedback": ""}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
