use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use exio_ghg::domain::Year;
use exio_ghg::error::GhgError;
use exio_ghg::server::{MapPages, router};

#[derive(Default)]
struct FakePages {
    requested: Mutex<Vec<u16>>,
}

impl MapPages for FakePages {
    fn page(&self, year: Year) -> Result<String, GhgError> {
        self.requested.lock().unwrap().push(year.value());
        if year.value() == 1995 {
            return Err(GhgError::Archive("Z.txt not found".to_string()));
        }
        Ok(format!("<html>map {year}</html>"))
    }
}

async fn get(pages: Arc<FakePages>, uri: &str) -> (StatusCode, String) {
    let app = router(pages, Year::new(2017).unwrap());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn root_serves_default_year() {
    let pages = Arc::new(FakePages::default());
    let (status, body) = get(pages.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>map 2017</html>");
    assert_eq!(*pages.requested.lock().unwrap(), vec![2017]);
}

#[tokio::test]
async fn year_path_selects_year() {
    let pages = Arc::new(FakePages::default());
    let (status, body) = get(pages, "/2018").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<html>map 2018</html>");
}

#[tokio::test]
async fn malformed_year_is_bad_request() {
    let pages = Arc::new(FakePages::default());
    let (status, _) = get(pages.clone(), "/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(pages.clone(), "/1900").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(pages.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pipeline_failure_is_server_error() {
    let pages = Arc::new(FakePages::default());
    let (status, body) = get(pages, "/1995").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Z.txt not found"));
}
