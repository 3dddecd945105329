use crate::{
    flux::{FluxClient, GenerationOutcome},
    models::{file_extension, FileUpload, GenerationQuery, GenerationRequest},
    server::AppState,
    uploads::UploadError,
};
use actix_multipart::Multipart;
use actix_web::{
    error::InternalError,
    http::StatusCode,
    web, HttpRequest, HttpResponse, ResponseError,
};
use futures::StreamExt;
use serde_json::json;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| {
            let body = format!("Invalid request body: {}", err);
            InternalError::from_response(err, bad_request_text(body)).into()
        }),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| {
            let body = format!("Invalid query: {}", err);
            InternalError::from_response(err, bad_request_text(body)).into()
        }),
    )
    .service(
        web::scope("/v1")
            .route("/generate-image", web::post().to(generate_image))
            .route("/upload/{id}", web::post().to(upload_image)),
    )
    .route("/uploads/{filename}", web::get().to(serve_upload))
    .route("/health", web::get().to(health));
}

fn bad_request_text(body: String) -> HttpResponse {
    HttpResponse::BadRequest().content_type(TEXT_PLAIN).body(body)
}

pub async fn generate_image(
    state: web::Data<AppState>,
    query: web::Query<GenerationQuery>,
    body: web::Json<GenerationRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    if let Err(message) = request.validate() {
        return bad_request_text(message);
    }

    let client = FluxClient::new(state.config.flux.clone());
    match client.generate(query.model, &request).await {
        Ok(GenerationOutcome::Image {
            bytes,
            content_type,
        }) => HttpResponse::Ok().content_type(content_type).body(bytes),
        Ok(outcome) => {
            let status = StatusCode::from_u16(outcome.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status)
                .content_type(TEXT_PLAIN)
                .body(outcome.message().unwrap_or_default())
        }
        Err(e) => {
            log::error!("Image generation failed: {}", e);
            HttpResponse::InternalServerError()
                .content_type(TEXT_PLAIN)
                .body(format!("Error generating image: {}", e))
        }
    }
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(UploadError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if let UploadError::Internal(e) = self {
            log::error!("Upload failed: {}", e);
        }
        HttpResponse::build(ResponseError::status_code(self)).json(json!({ "detail": self.to_string() }))
    }
}

pub async fn upload_image(
    state: web::Data<AppState>,
    path: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse, UploadError> {
    let id = path.into_inner();
    let uploads = &state.uploads;
    uploads.parse_id(&id)?;

    let mut upload: Option<FileUpload> = None;
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| UploadError::InvalidPayload(e.to_string()))?;

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);
        let filename = match (filename, &upload) {
            (Some(name), None) => name,
            _ => {
                // Not a file, or a second file: drain and ignore.
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| UploadError::InvalidPayload(e.to_string()))?;
                }
                continue;
            }
        };

        uploads.check_extension(&filename)?;
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::InvalidPayload(e.to_string()))?;
            uploads.check_size(content.len() + chunk.len())?;
            content.extend_from_slice(&chunk);
        }

        upload = Some(FileUpload::new(filename, content_type, content));
    }

    let upload = upload.ok_or_else(|| UploadError::InvalidPayload("No file provided".into()))?;
    let response = uploads.upload(&id, upload).await?;
    Ok(HttpResponse::Ok().json(response))
}

fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).unwrap_or_default().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

pub async fn serve_upload(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let filename = req.match_info().query("filename");
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return HttpResponse::NotFound().content_type(TEXT_PLAIN).body("Not found");
    }

    let path = state.uploads.config().upload_dir.join(filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(content_type_for(filename))
            .body(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            HttpResponse::NotFound().content_type(TEXT_PLAIN).body("Not found")
        }
        Err(e) => {
            log::error!("Failed to read {}: {}", path.display(), e);
            HttpResponse::InternalServerError()
                .content_type(TEXT_PLAIN)
                .body("Failed to read file")
        }
    }
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.uploads.store().health_check().await {
        Ok(true) => HttpResponse::Ok().json(json!({ "status": "ok", "database": true })),
        Ok(false) => {
            HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": false }))
        }
        Err(e) => {
            log::warn!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": false }))
        }
    }
}
