use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use asset_relay::{
    App, AssetApi, AssetType, AssetUploadSpec, EncodedBody, FilePart, FormPart, Multipart, MultipartWriter, PollPolicy,
    RemoteApi, RemoteResponse, SizeLimit, Uploader,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "X-BOUNDARY";

#[test]
fn test_multipart_basic() {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    let parsed = Multipart::new(data, BOUNDARY).parse().unwrap();

    assert_eq!(parsed.field("My Field"), Some("abcd"));

    let file = parsed.file().unwrap();
    assert_eq!(file.name, "file");
    assert_eq!(file.file_name, "a-text-file.txt");
    assert_eq!(file.content_type, Some(mime::TEXT_PLAIN));
    assert_eq!(&file.data[..], b"Hello world\nHello\r\nWorld\rAgain");
}

#[test]
fn test_multipart_empty() {
    let parsed = Multipart::new("--X-BOUNDARY--\r\n", BOUNDARY).parse().unwrap();
    assert!(parsed.fields().is_empty());
    assert!(parsed.file().is_none());
}

#[test]
fn test_multipart_duplicate_names() {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"displayName\"\r\n\r\nfirst\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"one.rbxm\"\r\n\r\n1\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"displayName\"\r\n\r\nsecond\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"two.rbxm\"\r\n\r\n2\r\n--X-BOUNDARY--\r\n";

    let parsed = Multipart::new(data, BOUNDARY).parse().unwrap();

    // last field wins, first file wins
    assert_eq!(parsed.field("displayName"), Some("second"));
    assert_eq!(parsed.file().unwrap().file_name, "one.rbxm");
}

#[test]
fn test_writer_output_decodes_back() {
    let payloads: [&[u8]; 4] = [
        b"\x00\x01\x02\xff binary",
        b"line\r\n--X-BOUNDAR\r\nalmost",
        b"\r\n--X-BOUNDARYX not a delimiter",
        b"--X-BOUNDARY-ish at start\r\n\r\n",
    ];

    for payload in payloads {
        let mut writer = MultipartWriter::with_boundary(BOUNDARY);
        writer.write_part("userId", None, "text/plain", b"123");
        writer.write_part("apiKey", None, "text/plain", b"abcdefghijklmnopqrst");
        writer.write_part("file", Some("model.rbxm"), "application/octet-stream", payload);
        let body = writer.finish();

        let parsed = Multipart::new(body.bytes.clone(), BOUNDARY).parse().unwrap();
        assert_eq!(parsed.field("userId"), Some("123"));
        assert_eq!(parsed.field("apiKey"), Some("abcdefghijklmnopqrst"));
        assert_eq!(&parsed.file().unwrap().data[..], payload);
    }
}

#[test]
fn test_encoded_upload_layout() {
    let spec = AssetUploadSpec::new(AssetType::Model, Some("Car"), None, "123");
    let file = FilePart::new("file", "model.rbxm", &b"0123456789"[..]);
    let body = asset_relay::encode(&spec.metadata_json().unwrap(), &file, "application/xml");

    let boundary = asset_relay::parse_boundary(body.content_type()).unwrap();
    assert_eq!(boundary, body.boundary);

    let parts = Multipart::new(body.bytes.clone(), boundary).parts().unwrap();
    assert_eq!(parts.len(), 2);

    match &parts[0] {
        FormPart::File(metadata) => {
            assert_eq!(metadata.name, "request");
            assert_eq!(metadata.file_name, "request.json");
            assert_eq!(metadata.content_type, Some(mime::APPLICATION_JSON));
            let value: Value = serde_json::from_slice(&metadata.data).unwrap();
            assert_eq!(value["assetType"], "Model");
            assert_eq!(value["creationContext"]["creator"]["userId"], "123");
        }
        other => panic!("unexpected part {:?}", other),
    }

    match &parts[1] {
        FormPart::File(content) => {
            assert_eq!(content.name, "fileContent");
            assert_eq!(content.file_name, "model.rbxm");
            assert_eq!(content.content_type.as_ref().map(|m| m.essence_str()), Some("application/xml"));
            assert_eq!(&content.data[..], b"0123456789");
        }
        other => panic!("unexpected part {:?}", other),
    }
}

/// An [`AssetApi`] that replays a fixed script of operation polls.
struct ScriptedApi {
    create: RemoteResponse,
    polls: Mutex<VecDeque<asset_relay::Result<RemoteResponse>>>,
    poll_count: AtomicU32,
}

impl ScriptedApi {
    fn new(create: Value, polls: Vec<asset_relay::Result<RemoteResponse>>) -> ScriptedApi {
        ScriptedApi {
            create: RemoteResponse::new(StatusCode::OK, serde_json::to_vec(&create).unwrap()),
            polls: Mutex::new(polls.into()),
            poll_count: AtomicU32::new(0),
        }
    }
}

fn ok_json(value: Value) -> asset_relay::Result<RemoteResponse> {
    Ok(RemoteResponse::new(StatusCode::OK, serde_json::to_vec(&value).unwrap()))
}

#[async_trait]
impl AssetApi for ScriptedApi {
    async fn create_asset(&self, _api_key: &str, _body: EncodedBody) -> asset_relay::Result<RemoteResponse> {
        Ok(self.create.clone())
    }

    async fn get_operation(&self, _api_key: &str, _path: &str) -> asset_relay::Result<RemoteResponse> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok_json(json!({ "done": false })))
    }

    async fn probe_api_key(&self, _api_key: &str) -> asset_relay::Result<RemoteResponse> {
        Ok(RemoteResponse::new(StatusCode::OK, Bytes::new()))
    }

    async fn get_user(&self, _user_id: &str) -> asset_relay::Result<RemoteResponse> {
        ok_json(json!({ "name": "builder" }))
    }
}

fn sample_upload() -> (AssetUploadSpec, FilePart) {
    (
        AssetUploadSpec::new(AssetType::Model, None, None, "123"),
        FilePart::new("file", "model.rbxm", &b"0123456789"[..]),
    )
}

#[tokio::test(start_paused = true)]
async fn test_poll_until_done() {
    let mut polls: Vec<_> = (0..4).map(|_| ok_json(json!({ "done": false }))).collect();
    polls.push(ok_json(json!({ "done": true, "response": { "assetId": "999" } })));

    let uploader = Uploader::new(
        ScriptedApi::new(json!({ "path": "operations/abc", "done": false }), polls),
        PollPolicy::default(),
    );

    let (spec, file) = sample_upload();
    let result = uploader.submit(&spec, &file, "key").await.unwrap();

    assert_eq!(result.asset_id.as_deref(), Some("999"));
    assert_eq!(result.insert_url.as_deref(), Some("rbxassetid://999"));
    assert_eq!(result.toolbox_url.as_deref(), Some("https://www.roblox.com/library/999"));
    assert_eq!(result.raw["done"], true);
    assert_eq!(uploader.api().poll_count.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn test_poll_gives_up_softly() {
    let uploader = Uploader::new(
        ScriptedApi::new(json!({ "path": "operations/never" }), Vec::new()),
        PollPolicy {
            max_attempts: 10,
            interval: Duration::from_secs(2),
        },
    );

    let (spec, file) = sample_upload();
    let result = uploader.submit(&spec, &file, "key").await.unwrap();

    assert!(result.success);
    assert_eq!(result.asset_id, None);
    assert_eq!(result.toolbox_url, None);
    assert_eq!(result.raw, json!({ "path": "operations/never" }));
    assert_eq!(uploader.api().poll_count.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn test_poll_retries_transient_failures() {
    let polls = vec![
        Err(asset_relay::Error::Transport("connection reset".into())),
        Ok(RemoteResponse::new(StatusCode::BAD_GATEWAY, "upstream")),
        ok_json(json!({ "done": true, "response": { "path": "assets/4242" } })),
    ];

    let uploader = Uploader::new(
        ScriptedApi::new(json!({ "path": "operations/flaky" }), polls),
        PollPolicy::default(),
    );

    let (spec, file) = sample_upload();
    let result = uploader.submit(&spec, &file, "key").await.unwrap();

    assert_eq!(result.asset_id.as_deref(), Some("4242"));
    assert_eq!(uploader.api().poll_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_synchronous_asset_id_skips_polling() {
    let uploader = Uploader::new(
        ScriptedApi::new(json!({ "assetId": 555 }), Vec::new()),
        PollPolicy::default(),
    );

    let (spec, file) = sample_upload();
    let result = uploader.submit(&spec, &file, "key").await.unwrap();

    assert_eq!(result.asset_id.as_deref(), Some("555"));
    assert_eq!(uploader.api().poll_count.load(Ordering::SeqCst), 0);
}

fn form_body(parts: &[(&str, Option<&str>, &[u8])]) -> Bytes {
    let mut writer = MultipartWriter::with_boundary(BOUNDARY);
    for (name, file_name, data) in parts {
        writer.write_part(name, *file_name, "text/plain", data);
    }
    writer.finish().bytes
}

fn upload_request(uri: &str, body: Bytes) -> Request<Full<Bytes>> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Full::new(body))
        .unwrap()
}

async fn json_body(response: Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn app_for(server: &MockServer) -> App<RemoteApi> {
    let api = RemoteApi::new(server.uri(), server.uri(), Duration::from_secs(5)).unwrap();
    let policy = PollPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(10),
    };
    App::new(Uploader::new(api, policy), SizeLimit::default())
}

#[tokio::test]
async fn test_end_to_end_upload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/assets/v1/assets"))
        .and(header("x-api-key", "abcdefghijklmnopqrst"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "path": "operations/abc", "done": false })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/assets/v1/operations/abc"))
        .and(header("x-api-key", "abcdefghijklmnopqrst"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "done": true, "response": { "assetId": "999" } })),
        )
        .mount(&server)
        .await;

    let app = app_for(&server);
    let body = form_body(&[
        ("userId", None, b"123"),
        ("apiKey", None, b"abcdefghijklmnopqrst"),
        ("file", Some("model.rbxm"), b"\x00\x01rbxm\r\n\xff!!"),
    ]);

    let response = app.handle(upload_request("/api/upload", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");

    let value = json_body(response).await;
    assert_eq!(value["success"], true);
    assert_eq!(value["assetId"], "999");
    assert_eq!(value["insertUrl"], "rbxassetid://999");
    assert_eq!(value["toolboxUrl"], "https://www.roblox.com/library/999");

    let requests = server.received_requests().await.unwrap();
    let upload = requests.iter().find(|req| req.method.as_str() == "POST").unwrap();
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    let boundary = asset_relay::parse_boundary(content_type).unwrap();

    let parts = Multipart::new(upload.body.clone(), boundary).parts().unwrap();
    assert_eq!(parts.len(), 2);

    let sent = String::from_utf8_lossy(&upload.body);
    assert!(sent.contains("name=\"request\"; filename=\"request.json\""));
    assert!(sent.contains("Content-Type: application/xml"));
    assert!(sent.contains("\"assetType\":\"Model\""));

    match &parts[1] {
        FormPart::File(file) => assert_eq!(&file.data[..], b"\x00\x01rbxm\r\n\xff!!"),
        other => panic!("unexpected part {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_credentials_never_reach_remote() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let cases: [&[(&str, Option<&str>, &[u8])]; 3] = [
        &[("apiKey", None, b"key"), ("file", Some("a.rbxm"), b"x")],
        &[("userId", None, b"123"), ("file", Some("a.rbxm"), b"x")],
        &[("userId", None, b"123"), ("apiKey", None, b"key")],
    ];

    for parts in cases {
        let response = app.handle(upload_request("/api/upload", form_body(parts))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value = json_body(response).await;
        assert!(!value["error"].as_str().unwrap().is_empty());
    }

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_status_passthrough() {
    for (status, message) in [
        (401, "Invalid API Key"),
        (403, "API Key lacks permissions — enable Assets Read+Write and IP 0.0.0.0/0"),
        (429, "Rate limited — wait a minute"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/assets/v1/assets"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "message": "remote says no" })))
            .mount(&server)
            .await;

        let app = app_for(&server);
        let body = form_body(&[
            ("userId", None, b"123"),
            ("apiKey", None, b"key"),
            ("file", Some("a.png"), b"png"),
        ]);

        let response = app.handle(upload_request("/api/upload", body)).await.unwrap();
        assert_eq!(response.status().as_u16(), status);

        let value = json_body(response).await;
        assert_eq!(value["error"], message);
        assert_eq!(value["details"]["message"], "remote says no");
    }
}

#[tokio::test]
async fn test_methods_and_cors() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/upload")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-allow-methods"));
    assert!(response.into_body().collect().await.unwrap().to_bytes().is_empty());

    let request = Request::builder()
        .method("PUT")
        .uri("/api/upload")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(response).await["error"], "POST only");
}

#[tokio::test]
async fn test_malformed_multipart_is_rejected() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let response = app
        .handle(upload_request("/api/upload", Bytes::from_static(b"userId=1&apiKey=2")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from_static(b"{}")))
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Content-Type is not multipart/form-data");
}

#[tokio::test]
async fn test_verify_user_action() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "displayName": "Builder", "isBanned": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/v1/assets"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("x-action", "verify-user")
        .body(Full::new(Bytes::from_static(br#"{"userId":"123","apiKey":"key"}"#)))
        .unwrap();

    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = json_body(response).await;
    assert_eq!(value["valid"], true);
    assert_eq!(value["displayName"], "Builder");
    assert_eq!(value["keyValid"], false);
    assert_eq!(value["keyError"], "API Key lacks Assets permissions (403)");
}

#[tokio::test]
async fn test_verify_rejects_banned_and_unknown_users() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "gone", "isBanned": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = app_for(&server);

    for (body, expected) in [
        (&br#"{"userId":"1","apiKey":"k"}"#[..], "User is banned"),
        (&br#"{"userId":"2","apiKey":"k"}"#[..], "User ID not found on Roblox"),
        (&br#"{"userId":"abc","apiKey":"k"}"#[..], "User ID must be a number"),
        (&br#"{"userId":"1"}"#[..], "Missing userId or apiKey"),
    ] {
        let request = Request::builder()
            .method("POST")
            .uri("/api/verify")
            .body(Full::new(Bytes::from_static(body)))
            .unwrap();

        let response = app.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], expected);
    }
}

#[tokio::test]
async fn test_verify_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "seventy" })))
        .mount(&server)
        .await;

    let app = app_for(&server);

    let request = Request::builder()
        .method("GET")
        .uri("/api/verify?uid=77&key=k")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = json_body(response).await;
    assert_eq!(value, json!({ "valid": true, "displayName": "seventy", "userId": "77" }));

    let request = Request::builder()
        .method("GET")
        .uri("/api/verify")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Add ?uid=YOUR_ID&key=YOUR_KEY");
}

#[tokio::test]
async fn test_verify_query_rejects_bad_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = app_for(&server);

    for (uri, expected) in [
        ("/api/verify?uid=404", "User ID not found on Roblox"),
        ("/api/verify?uid=..%2Fadmin", "User ID must be a number"),
    ] {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = app.handle(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], expected);
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_preview_does_not_call_remote() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let body = form_body(&[
        ("userId", None, b"123"),
        ("apiKey", None, b"abcdefghijklmnopqrst"),
        ("assetType", None, b"Decal"),
        ("file", Some("texture.png"), b"\x89PNG"),
    ]);

    let response = app.handle(upload_request("/api/preview", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = json_body(response).await;
    assert!(value["parsed"]["fields"].get("apiKey").is_none());
    assert_eq!(value["parsed"]["fields"]["userId"], "123");
    assert_eq!(value["parsed"]["file"]["first20hex"], "89504e47");
    assert_eq!(value["wouldSend"]["assetType"], "Decal");
    assert_eq!(value["wouldSend"]["mimeType"], "image/png");
    assert_eq!(value["wouldSend"]["hasApiKey"], true);
    assert!(value["wouldSend"]["part2Header"]
        .as_str()
        .unwrap()
        .contains("filename=\"texture.png\""));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_size_limit() {
    let server = MockServer::start().await;
    let api = RemoteApi::new(server.uri(), server.uri(), Duration::from_secs(5)).unwrap();
    let app = App::new(
        Uploader::new(api, PollPolicy::default()),
        SizeLimit::new().for_field("file", 4),
    );

    let body = form_body(&[
        ("userId", None, b"123"),
        ("apiKey", None, b"key"),
        ("file", Some("a.rbxm"), b"0123456789"),
    ]);

    let response = app.handle(upload_request("/api/upload", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_under_other_name_is_not_uploaded() {
    let server = MockServer::start().await;
    let api = RemoteApi::new(server.uri(), server.uri(), Duration::from_secs(5)).unwrap();
    let app = App::new(
        Uploader::new(api, PollPolicy::default()),
        SizeLimit::new().for_field("file", 4),
    );

    let body = form_body(&[
        ("userId", None, b"123"),
        ("apiKey", None, b"key"),
        ("thumbnail", Some("a.rbxm"), b"0123456789"),
    ]);

    let response = app.handle(upload_request("/api/upload", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file uploaded");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_debug_echoes_request() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    let request = Request::builder()
        .method("POST")
        .uri("/api/debug")
        .header(CONTENT_TYPE, "multipart/form-data; boundary=X")
        .body(Full::new(Bytes::from(vec![b'a'; 150])))
        .unwrap();

    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = json_body(response).await;
    assert_eq!(value["method"], "POST");
    assert_eq!(value["contentType"], "multipart/form-data; boundary=X");
    assert_eq!(value["contentLength"], "none");
    assert_eq!(value["bodySize"], 150);
    assert_eq!(value["hasBody"], true);
    assert_eq!(value["first100"].as_str().unwrap().len(), 100);
}

#[tokio::test]
async fn test_users_api_reachability() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "name": "Roblox" })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let request = Request::builder()
        .method("GET")
        .uri("/api/test")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "works": true, "robloxResponse": { "id": 1, "name": "Roblox" } })
    );
}

#[tokio::test]
async fn test_users_api_unreachable_is_reported() {
    let api = RemoteApi::new("http://127.0.0.1:9", "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let app = App::new(Uploader::new(api, PollPolicy::default()), SizeLimit::default());

    let request = Request::builder()
        .method("GET")
        .uri("/api/test?uid=42")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = json_body(response).await;
    assert_eq!(value["works"], false);
    assert!(!value["error"].as_str().unwrap().is_empty());
}
