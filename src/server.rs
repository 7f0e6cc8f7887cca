use crate::asset;
use crate::client::AssetApi;
use crate::constants;
use crate::error::BoxError;
use crate::form::ParsedRequest;
use crate::multipart::Multipart;
use crate::size_limit::SizeLimit;
use crate::upload::{PreparedUpload, Uploader};
use crate::verify::{self, VerifyRequest};
use crate::writer::{self, MultipartWriter};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

const ACTION_HEADER: &str = "x-action";
const VERIFY_USER_ACTION: &str = "verify-user";
const ECHO_PREVIEW_LEN: usize = 100;

/// Request handling for the relay: routing, body limits, and the conversion
/// of every outcome into a JSON response with CORS headers.
pub struct App<A> {
    uploader: Uploader<A>,
    size_limit: SizeLimit,
}

impl<A: AssetApi> App<A> {
    pub fn new(uploader: Uploader<A>, size_limit: SizeLimit) -> App<A> {
        App { uploader, size_limit }
    }

    /// Handles one request. Never fails: errors become JSON error bodies.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let mut response = match self.route(req).await {
            Ok(response) => response,
            Err(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    log::error!("{} {} failed: {}", method, path, err);
                } else {
                    log::info!("{} {} rejected with {}: {}", method, path, status, err);
                }
                json_response(status, &err.to_json())
            }
        };

        add_cors_headers(response.headers_mut());
        Ok(response)
    }

    async fn route<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        if req.method() == Method::OPTIONS {
            return Ok(empty_response(StatusCode::OK));
        }

        let path = req.uri().path().trim_end_matches('/').to_owned();

        match (req.method().clone(), path.as_str()) {
            (Method::POST, "/api/upload") if is_verify_action(req.headers()) => self.verify_json(req).await,
            (Method::POST, "/api/upload") => self.upload(req).await,
            (Method::POST, "/api/verify") => self.verify_json(req).await,
            (Method::GET, "/api/verify") => self.verify_query(req).await,
            (Method::POST, "/api/preview") => self.preview(req).await,
            (_, "/api/debug") => self.echo(req).await,
            (_, "/api/test") => self.reachability(req).await,
            (_, "/api/upload") | (_, "/api/verify") | (_, "/api/preview") => {
                Ok(json_response(StatusCode::METHOD_NOT_ALLOWED, &json!({ "error": "POST only" })))
            }
            _ => Ok(json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))),
        }
    }

    async fn upload<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let form = self.read_form(req).await?;
        let result = self.uploader.upload_form(form).await?;

        Ok(json_response(StatusCode::OK, &result))
    }

    async fn verify_json<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let body = read_body(req.into_body(), constants::JSON_BODY_SIZE_LIMIT).await?;
        let request = VerifyRequest::from_json(&body)?;
        let result = verify::verify_credentials(self.uploader.api(), request).await?;

        Ok(json_response(StatusCode::OK, &result))
    }

    async fn verify_query<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>> {
        let uid = query_param(&req, "uid").ok_or_else(|| crate::Error::Validation("Add ?uid=YOUR_ID&key=YOUR_KEY".to_owned()))?;
        verify::validate_user_id(&uid)?;

        let result = verify::lookup_user(self.uploader.api(), &uid).await?;
        Ok(json_response(StatusCode::OK, &result))
    }

    /// Shows what an upload would send without contacting the assets API.
    async fn preview<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let form = self.read_form(req).await?;

        let fields: Map<String, Value> = form
            .fields()
            .iter()
            .filter(|(name, _)| name.as_str() != "apiKey")
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        let has_api_key = form.field("apiKey").map_or(false, |key| key.len() > 10);

        let prepared = PreparedUpload::from_form(form)?;
        let metadata = prepared.spec.metadata_json()?;
        let mime_type = prepared.mime_type();

        let boundary = writer::boundary_for(&[metadata.as_bytes(), &prepared.file.data]);
        let head = MultipartWriter::with_boundary(boundary.clone());
        let encoded = writer::encode_with_boundary(boundary.clone(), &metadata, &prepared.file, mime_type);

        let body = json!({
            "parsed": {
                "fields": fields,
                "file": {
                    "filename": prepared.file.file_name,
                    "contentType": prepared.file.content_type.as_ref().map(|mime| mime.to_string()),
                    "size": prepared.file.len(),
                    "first20hex": hex_prefix(&prepared.file.data, 20),
                },
            },
            "wouldSend": {
                "boundary": boundary,
                "assetType": prepared.spec.asset_type,
                "mimeType": mime_type,
                "metadata": serde_json::from_str::<Value>(&metadata).unwrap_or(Value::Null),
                "part1Header": head.part_head(constants::METADATA_PART_NAME, Some(constants::METADATA_FILE_NAME), mime::APPLICATION_JSON.as_ref()),
                "part2Header": head.part_head(constants::FILE_PART_NAME, Some(writer::outbound_file_name(&prepared.file)), mime_type),
                "closing": head.closing(),
                "fileSize": prepared.file.len(),
                "extension": asset::file_extension(&prepared.file.file_name),
                "totalBodySize": encoded.bytes.len(),
                "hasApiKey": has_api_key,
            },
        });

        Ok(json_response(StatusCode::OK, &body))
    }

    /// Describes the received request without interpreting the body.
    async fn echo<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let method = req.method().to_string();
        let content_type = header_or_none(req.headers(), header::CONTENT_TYPE);
        let content_length = header_or_none(req.headers(), header::CONTENT_LENGTH);

        let body = read_body(req.into_body(), self.size_limit.whole_stream).await?;
        let head = &body[..body.len().min(ECHO_PREVIEW_LEN)];

        Ok(json_response(
            StatusCode::OK,
            &json!({
                "method": method,
                "contentType": content_type,
                "contentLength": content_length,
                "bodySize": body.len(),
                "hasBody": !body.is_empty(),
                "first100": String::from_utf8_lossy(head),
            }),
        ))
    }

    /// Checks that the users API answers. Failures are reported in the body.
    async fn reachability<B>(&self, req: Request<B>) -> crate::Result<Response<Full<Bytes>>> {
        let uid = query_param(&req, "uid").unwrap_or_else(|| "1".to_owned());
        verify::validate_user_id(&uid)?;

        let body = match self.uploader.api().get_user(&uid).await {
            Ok(response) => json!({ "works": true, "robloxResponse": response.json() }),
            Err(err) => {
                log::warn!("users API unreachable: {}", err);
                json!({ "works": false, "error": err.to_string() })
            }
        };

        Ok(json_response(StatusCode::OK, &body))
    }

    async fn read_form<B>(&self, req: Request<B>) -> crate::Result<ParsedRequest>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .ok_or(crate::Error::NoMultipart)?;
        let boundary = crate::parse_boundary(content_type)?;

        let body = read_body(req.into_body(), self.size_limit.whole_stream).await?;
        log::debug!("received multipart body of {} bytes", body.len());

        Multipart::with_size_limit(body, boundary, self.size_limit.clone()).parse()
    }
}

fn query_param<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    })
}

fn header_or_none(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none")
        .to_owned()
}

fn is_verify_action(headers: &HeaderMap) -> bool {
    headers
        .get(ACTION_HEADER)
        .and_then(|val| val.to_str().ok())
        .map_or(false, |action| action == VERIFY_USER_ACTION)
}

async fn read_body<B>(body: B, limit: usize) -> crate::Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(crate::Error::StreamSizeExceeded { limit }),
        Err(err) => Err(crate::Error::StreamReadFailed(err)),
    }
}

fn hex_prefix(data: &[u8], len: usize) -> String {
    data.iter().take(len).map(|byte| format!("{:02x}", byte)).collect()
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|err| {
        log::error!("failed to serialize response body: {}", err);
        br#"{"error":"Server error"}"#.to_vec()
    });

    let mut response = Response::new(Full::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, x-action"),
    );
}

/// Accepts connections forever, serving each on its own task.
pub async fn serve<A>(listener: TcpListener, app: Arc<App<A>>)
where
    A: AssetApi + 'static,
{
    loop {
        let (socket, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::error!("failed to accept connection: {}", err);
                continue;
            }
        };

        let io = TokioIo::new(socket);
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let app = Arc::clone(&app);
                async move { app.handle(req).await }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                log::warn!("connection from {} failed: {}", remote_addr, err);
            }
        });
    }
}
