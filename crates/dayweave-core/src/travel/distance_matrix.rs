//! Network-backed estimator speaking the Google Distance Matrix JSON API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::calculator::{Estimate, EstimatorError, TravelTimeCalculator};
use super::TransportMode;
use crate::calendar::Location;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<MatrixValue>,
    distance: Option<MatrixValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixValue {
    value: f64,
}

pub struct DistanceMatrixEstimator {
    client: Client,
    runtime: tokio::runtime::Runtime,
    base_url: Url,
    api_key: String,
}

impl DistanceMatrixEstimator {
    /// # Errors
    /// Fails when `base_url` does not parse or the HTTP runtime cannot start.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self, EstimatorError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EstimatorError::permanent(format!("invalid base url '{base_url}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EstimatorError::permanent(format!("http client: {e}")))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| EstimatorError::permanent(format!("http runtime: {e}")))?;
        Ok(Self {
            client,
            runtime,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, from: &Location, to: &Location, mode: TransportMode) -> Result<Url, EstimatorError> {
        let origin = waypoint(from)?;
        let destination = waypoint(to)?;
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("origins", &origin)
            .append_pair("destinations", &destination)
            .append_pair("mode", mode.api_name())
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<MatrixResponse, EstimatorError> {
        let resp = self.client.get(url).send().await.map_err(classify_request_error)?;

        let status = resp.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(EstimatorError::transient(format!("distance matrix HTTP {status}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(EstimatorError::permanent(format!(
                "distance matrix HTTP {status}: {text}"
            )));
        }

        resp.json::<MatrixResponse>()
            .await
            .map_err(|e| EstimatorError::permanent(format!("malformed distance matrix response: {e}")))
    }
}

impl TravelTimeCalculator for DistanceMatrixEstimator {
    fn name(&self) -> &'static str {
        "distance_matrix"
    }

    fn estimate(
        &self,
        from: &Location,
        to: &Location,
        mode: TransportMode,
    ) -> Result<Estimate, EstimatorError> {
        let url = self.endpoint(from, to, mode)?;
        let body = self.runtime.block_on(self.fetch(url))?;
        interpret(body)
    }
}

fn interpret(body: MatrixResponse) -> Result<Estimate, EstimatorError> {
    if body.status != "OK" {
        let detail = body.error_message.unwrap_or_default();
        return Err(status_error(&body.status, &detail));
    }

    let element = body
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| EstimatorError::permanent("distance matrix returned no elements"))?;

    if element.status != "OK" {
        return Err(status_error(&element.status, ""));
    }

    let seconds = element
        .duration
        .ok_or_else(|| EstimatorError::permanent("distance matrix element has no duration"))?
        .value;
    Ok(Estimate {
        duration_minutes: (seconds / 60.0).ceil() as i64,
        distance_km: element.distance.map(|d| d.value / 1000.0),
    })
}

fn status_error(status: &str, detail: &str) -> EstimatorError {
    let message = if detail.is_empty() {
        format!("distance matrix status {status}")
    } else {
        format!("distance matrix status {status}: {detail}")
    };
    match status {
        "UNKNOWN_ERROR" | "OVER_QUERY_LIMIT" => EstimatorError::transient(message),
        _ => EstimatorError::permanent(message),
    }
}

fn classify_request_error(err: reqwest::Error) -> EstimatorError {
    if err.is_timeout() || err.is_connect() {
        EstimatorError::transient(format!("distance matrix unreachable: {err}"))
    } else {
        EstimatorError::permanent(format!("distance matrix request failed: {err}"))
    }
}

/// `lat,lng` when geocoded, otherwise the whitespace-normalized address.
fn waypoint(location: &Location) -> Result<String, EstimatorError> {
    if let Some((lat, lng)) = location.coordinates() {
        return Ok(format!("{lat},{lng}"));
    }
    match location.address.as_deref() {
        Some(address) if !address.trim().is_empty() => {
            Ok(address.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        _ => Err(EstimatorError::permanent("location has neither coordinates nor address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::calculator::EstimatorErrorKind;
    use mockito::Matcher;

    const OK_BODY: &str = r#"{
        "status": "OK",
        "rows": [{ "elements": [{
            "status": "OK",
            "duration": { "value": 1250, "text": "21 mins" },
            "distance": { "value": 8300, "text": "8.3 km" }
        }]}]
    }"#;

    fn estimator(server: &mockito::Server) -> DistanceMatrixEstimator {
        let base = format!("{}/maps/api/distancematrix/json", server.url());
        DistanceMatrixEstimator::new(&base, "test-key", Duration::from_secs(5)).unwrap()
    }

    fn office() -> Location {
        Location::from_coordinates(48.8566, 2.3522).unwrap()
    }

    fn gym() -> Location {
        Location::from_address("  12 Rue   Oberkampf,  Paris ").unwrap()
    }

    #[test]
    fn parses_duration_and_distance() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/maps/api/distancematrix/json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("origins".into(), "48.8566,2.3522".into()),
                Matcher::UrlEncoded("destinations".into(), "12 Rue Oberkampf, Paris".into()),
                Matcher::UrlEncoded("mode".into(), "bicycling".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create();

        let est = estimator(&server)
            .estimate(&office(), &gym(), TransportMode::Cycling)
            .unwrap();
        mock.assert();
        assert_eq!(est.duration_minutes, 21);
        assert_eq!(est.distance_km, Some(8.3));
    }

    #[test]
    fn rate_limit_is_transient() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "OVER_QUERY_LIMIT", "rows": []}"#)
            .create();

        let err = estimator(&server)
            .estimate(&office(), &gym(), TransportMode::Driving)
            .unwrap_err();
        assert_eq!(err.kind, EstimatorErrorKind::Transient);
    }

    #[test]
    fn unroutable_element_is_permanent() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "OK", "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]}"#)
            .create();

        let err = estimator(&server)
            .estimate(&office(), &gym(), TransportMode::Walking)
            .unwrap_err();
        assert_eq!(err.kind, EstimatorErrorKind::Permanent);
        assert!(err.message.contains("ZERO_RESULTS"));
    }

    #[test]
    fn server_error_is_transient() {
        let mut server = mockito::Server::new();
        server.mock("GET", Matcher::Any).with_status(503).create();

        let err = estimator(&server)
            .estimate(&office(), &gym(), TransportMode::Transit)
            .unwrap_err();
        assert!(err.is_transient());
    }
}
