//! The HTTP inference endpoint.
use crate::config::ServeConfig;
use crate::history::History;
use actix_multipart::{Multipart, MultipartError};
use actix_web::error::BlockingError;
use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse, HttpServer, ResponseError, get, middleware, post, web};
use futures_util::TryStreamExt;
use paddy_core::internal::*;
use paddy_vision::DecodeError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

pub const FILE_FIELDS: &[&str] = &["file", "image"];

pub struct AppState {
    pub runner: InferenceRunner,
    pub history: Mutex<History>,
    pub config: ServeConfig,
}

impl AppState {
    pub fn new(model: Arc<ModelArtifact>, config: ServeConfig) -> AppState {
        AppState {
            runner: InferenceRunner::new(model),
            history: Mutex::new(History::new(config.history_capacity)),
            config,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PayloadTooLarge(usize),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => write!(f, "{msg}"),
            ApiError::PayloadTooLarge(limit) => write!(f, "Upload exceeds {limit} bytes"),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<PaddyError> for ApiError {
    fn from(e: PaddyError) -> ApiError {
        if let Some(decode) = e.downcast_ref::<DecodeError>() {
            warn!("Rejected upload: {decode}");
            ApiError::BadRequest(decode.to_string())
        } else if let Some(mismatch) = e.downcast_ref::<ShapeMismatch>() {
            error!("Preprocessing and model disagree: {mismatch}");
            ApiError::Internal(mismatch.to_string())
        } else {
            error!("{e:?}");
            ApiError::Internal(format!("{e:#}"))
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> ApiError {
        warn!("Bad multipart upload: {e}");
        ApiError::BadRequest(format!("Invalid multipart upload: {e}"))
    }
}

impl From<BlockingError> for ApiError {
    fn from(e: BlockingError) -> ApiError {
        ApiError::Internal(e.to_string())
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct PredictQuery {
    #[serde(default)]
    pub scores: bool,
}

#[derive(Serialize, Debug)]
pub struct PredictResponse {
    pub id: u64,
    pub prediction: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f32>>,
}

struct Upload {
    bytes: Vec<u8>,
    filename: Option<String>,
}

async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload, ApiError> {
    let mut upload = None;
    while let Some(mut field) = payload.try_next().await? {
        let wanted = upload.is_none() && field.name().is_some_and(|n| FILE_FIELDS.contains(&n));
        let filename =
            field.content_disposition().and_then(|cd| cd.get_filename()).map(|s| s.to_string());
        let mut bytes = vec![];
        while let Some(chunk) = field.try_next().await? {
            if wanted {
                if bytes.len() + chunk.len() > limit {
                    warn!("Rejected upload larger than {limit} bytes");
                    return Err(ApiError::PayloadTooLarge(limit));
                }
                bytes.extend_from_slice(&chunk);
            }
        }
        if wanted {
            upload = Some(Upload { bytes, filename });
        }
    }
    upload.ok_or_else(|| {
        warn!("Upload without a file field");
        ApiError::BadRequest(format!("No file uploaded (expected a field named {FILE_FIELDS:?})"))
    })
}

#[post("/predict")]
pub async fn predict(
    state: web::Data<AppState>,
    query: web::Query<PredictQuery>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(payload, state.config.max_upload_bytes).await?;
    debug!("Received {} bytes ({:?})", upload.bytes.len(), upload.filename);
    let with_scores = query.scores;
    let runner = state.runner.clone();
    let prediction = web::block(move || -> PaddyResult<Prediction> {
        let input = paddy_vision::preprocess(&upload.bytes, runner.model().contract())?;
        if with_scores { runner.infer_with_scores(&input) } else { runner.infer(&input) }
    })
    .await??;
    let id = state.history.lock().record(
        time::OffsetDateTime::now_utc(),
        &prediction,
        upload.filename,
    );
    info!(
        "Classified upload #{id} as {} ({:?}, confidence {:.3})",
        prediction.class, prediction.label, prediction.confidence
    );
    let probabilities = prediction.probabilities();
    Ok(HttpResponse::Ok().json(PredictResponse {
        id,
        prediction: prediction.class,
        label: prediction.label,
        confidence: prediction.confidence,
        scores: prediction.scores,
        probabilities,
    }))
}

#[get("/health")]
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/model")]
pub async fn model_info(state: web::Data<AppState>) -> HttpResponse {
    let model = state.runner.model();
    HttpResponse::Ok().json(json!({
        "name": model.name(),
        "version": model.version(),
        "input": model.contract(),
        "input_shape": &*model.input_shape(),
        "num_classes": model.num_classes(),
        "labels": model.labels(),
        "parameters": model.parameter_count(),
        "layers": model.summary(),
    }))
}

#[get("/api/history")]
pub async fn history(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let items = state.history.lock().items()?;
    Ok(HttpResponse::Ok().json(items))
}

#[get("/api/dashboard")]
pub async fn dashboard(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let dashboard = state.history.lock().dashboard(&state.config.healthy_label)?;
    Ok(HttpResponse::Ok().json(dashboard))
}

/// CORS preflight answers, 404 for everything else.
async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::NoContent()
            .insert_header(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
            .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
            .finish()
    } else {
        HttpResponse::NotFound().json(json!({ "error": format!("No route for {}", req.path()) }))
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(predict)
        .service(health)
        .service(model_info)
        .service(history)
        .service(dashboard)
        .default_service(web::to(fallback));
}

pub async fn run(config: ServeConfig, model: Arc<ModelArtifact>) -> std::io::Result<()> {
    let (host, port, workers) = (config.host.clone(), config.port, config.workers);
    let allow_origin = config.allow_origin.clone();
    let state = web::Data::new(AppState::new(model, config));

    info!("Starting server at {host}:{port} with {workers} workers");
    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", allow_origin.clone())),
            )
            .app_data(state.clone())
            .configure(routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

pub fn serve(config: ServeConfig, model: ModelArtifact) -> PaddyResult<()> {
    actix_web::rt::System::new().block_on(run(config, Arc::new(model)))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::{App, test};
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use paddy_core::ops::array::Flatten;
    use paddy_core::ops::nn::{Activation, Dense};
    use std::io::Cursor;

    const BOUNDARY: &str = "paddyboundary";

    fn model() -> Arc<ModelArtifact> {
        let model = ModelArtifact::builder("toy", InputContract::new(8, 8))
            .layer(Flatten::default())
            .layer(Dense::new(
                Arc::new(Tensor::zero(&[8 * 8 * 3, 3])),
                Some(rctensor1(&[0.1, 0.7, 0.2])),
            ))
            .layer(Activation::Softmax)
            .labels(["healthy", "blast", "tungro"])
            .build()
            .unwrap();
        Arc::new(model)
    }

    fn state(max_upload_bytes: usize) -> web::Data<AppState> {
        let config = ServeConfig { max_upload_bytes, ..ServeConfig::default() };
        web::Data::new(AppState::new(model(), config))
    }

    fn png() -> Vec<u8> {
        let image = RgbImage::from_pixel(20, 12, Rgb([30, 160, 40]));
        let mut bytes = Cursor::new(vec![]);
        DynamicImage::ImageRgb8(image).write_to(&mut bytes, ImageOutputFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn multipart(field: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, field: &str, data: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart(field, data))
    }

    #[actix_web::test]
    async fn health() {
        let app = test::init_service(App::new().app_data(state(1024)).configure(routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        assert_eq!(test::read_body(resp).await, "Ok");
    }

    #[actix_web::test]
    async fn predict_then_history() {
        let state = state(1 << 20);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let resp = test::call_service(&app, upload("/predict", "file", &png()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["prediction"], 1);
        assert_eq!(body["label"], "blast");
        assert!(body.get("scores").is_none());

        let req = upload("/predict?scores=true", "image", &png()).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["scores"].as_array().unwrap().len(), 3);
        assert_eq!(body["probabilities"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::get().uri("/api/history").to_request();
        let items: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(items.as_array().unwrap().len(), 2);
        assert_eq!(items[0]["id"], 2);
        assert_eq!(items[0]["image_filename"], "leaf.png");
        assert_eq!(items[0]["disease"], "blast");
        assert_eq!(items[0]["severity"], "low");
        assert!(items[0].get("label").is_none());

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let stats: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total_classifications"], 2);
        assert_eq!(stats["classification_distribution"][0]["label"], "blast");
        assert_eq!(stats["classifications_by_month"][0]["diseases"], 2);
    }

    #[actix_web::test]
    async fn garbage_is_a_bad_request() {
        let state = state(1 << 20);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;
        let resp =
            test::call_service(&app, upload("/predict", "file", b"not an image").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("decode"));
        assert!(state.history.lock().is_empty());
    }

    #[actix_web::test]
    async fn missing_file_field() {
        let app = test::init_service(App::new().app_data(state(1 << 20)).configure(routes)).await;
        let resp = test::call_service(&app, upload("/predict", "photo", &png()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn too_large() {
        let app = test::init_service(App::new().app_data(state(16)).configure(routes)).await;
        let resp = test::call_service(&app, upload("/predict", "file", &png()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn model_description() {
        let app = test::init_service(App::new().app_data(state(1024)).configure(routes)).await;
        let req = test::TestRequest::get().uri("/model").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "toy");
        assert_eq!(body["num_classes"], 3);
        assert_eq!(body["input"]["width"], 8);
        assert_eq!(body["layers"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn preflight_and_unknown_routes() {
        let app = test::init_service(App::new().app_data(state(1024)).configure(routes)).await;
        let req = test::TestRequest::default().method(Method::OPTIONS).uri("/predict").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
        let req = test::TestRequest::get().uri("/nope").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn shape_mismatch_is_a_server_error() {
        let e: PaddyError = ShapeMismatch::new("model input", &[1, 8, 8, 3], &[1, 4, 4, 3]).into();
        let e = ApiError::from(e.context("Evaluating layer #0 (Flatten)"));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(e.error_response().into_body()).await.unwrap()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("Shape mismatch"));
    }

    #[actix_web::test]
    async fn wrapped_decode_error_is_a_bad_request() {
        let e: PaddyError = DecodeError { reason: "truncated".into() }.into();
        let e = ApiError::from(e.context("Preprocessing upload"));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(e.error_response().into_body()).await.unwrap()).unwrap();
        assert_eq!(body["error"], "Could not decode image: truncated");
    }
}
