//! Test client helpers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use idmapper_core::{ActorCache, MappingCache, MemorySource, Snapshot, SnapshotCache};
use idmapper_server::metrics::build_recorder_handle;
use idmapper_server::{AppState, MapperRegistry, create_router};
use tower::ServiceExt;

/// Helper para tests de integracion HTTP.
pub struct TestClient {
    app: Router,
}

impl TestClient {
    /// Crea un nuevo test client con el router proporcionado.
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    /// Hace un GET request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .uri(uri)
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Hace un POST request sin body.
    pub async fn post(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .uri(uri)
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Hace un GET request con headers personalizados.
    pub async fn get_with_headers(&self, uri: &str, headers: Vec<(&str, &str)>) -> TestResponse {
        let mut builder = Request::builder().uri(uri).method("GET");

        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Ejecuta un request arbitrario.
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        TestResponse::from_response(response).await
    }
}

/// Wrapper sobre Response con helpers para assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    async fn from_response(response: Response<Body>) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        Self {
            status,
            headers,
            body,
        }
    }

    /// Retorna el body como string.
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Body is not valid UTF-8")
    }

    /// Parsea el body como JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON")
    }

    /// Retorna un header especifico.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Verifica que el status sea el esperado.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Verifica que el Content-Type contenga el valor esperado.
    pub fn assert_content_type_contains(&self, expected: &str) -> &Self {
        let content_type = self
            .header("content-type")
            .expect("Response missing Content-Type header");

        assert!(
            content_type.contains(expected),
            "Expected Content-Type to contain '{}' but got '{}'",
            expected,
            content_type
        );
        self
    }

    /// Verifica que un header exista.
    pub fn assert_header_exists(&self, name: &str) -> &Self {
        assert!(
            self.headers.contains_key(name),
            "Expected header '{}' to exist",
            name
        );
        self
    }

    /// Verifica que un header tenga un valor especifico.
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let value = self
            .header(name)
            .unwrap_or_else(|| panic!("Header '{}' not found", name));

        assert_eq!(value, expected, "Unexpected value for header '{}'", name);
        self
    }
}

/// Router con dos mappers en memoria y acceso a sus fuentes.
pub struct Fixture {
    pub client: TestClient,
    pub registry: Arc<MapperRegistry>,
    /// Fuente de `countries` (cache con lock)
    pub countries: Arc<MemorySource>,
    /// Fuente de `languages` (cache actor)
    pub languages: Arc<MemorySource>,
}

pub async fn fixture() -> Fixture {
    fixture_with_prefix("/v1").await
}

pub async fn fixture_with_prefix(prefix: &str) -> Fixture {
    let countries = Arc::new(MemorySource::new(
        "countries",
        Snapshot::from_iter([("sk", "Slovakia"), ("us", "USA")]),
    ));
    let languages = Arc::new(MemorySource::new(
        "languages",
        Snapshot::from_iter([("sk", "Slovak"), ("en", "English")]),
    ));

    let countries_cache: Arc<dyn MappingCache> =
        Arc::new(SnapshotCache::new(Arc::clone(&countries)).await.unwrap());
    let languages_cache: Arc<dyn MappingCache> =
        Arc::new(ActorCache::spawn(Arc::clone(&languages)).await.unwrap());

    let registry = Arc::new(
        MapperRegistry::from_caches([
            (
                "countries".to_string(),
                countries_cache,
                Duration::from_secs(86_400),
            ),
            (
                "languages".to_string(),
                languages_cache,
                Duration::from_secs(86_400),
            ),
        ])
        .unwrap(),
    );

    let app = create_router(
        AppState::new(Arc::clone(&registry)),
        prefix,
        build_recorder_handle(),
    );

    Fixture {
        client: TestClient::new(app),
        registry,
        countries,
        languages,
    }
}

/// Crea un TestClient con el router por defecto.
pub async fn client() -> TestClient {
    fixture().await.client
}
