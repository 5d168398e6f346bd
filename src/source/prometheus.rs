use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{MetricSource, QueryRange, Sample, SourceError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    data: Option<Data>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(default)]
    result: Vec<Series>,
}

/// One result row: `value` for instant queries, `values` for range queries.
#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    value: Option<(f64, String)>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

fn parse_point((timestamp, value): &(f64, String)) -> Result<Sample, SourceError> {
    let value: f64 = value
        .parse()
        .map_err(|_| SourceError::Decode(format!("non-numeric sample value {value:?}")))?;
    Ok(Sample::new(*timestamp as i64, value))
}

/// Checks the envelope and returns the first result row, warning when the
/// query matched more than one series.
fn first_series(body: &str) -> Result<Series, SourceError> {
    let response: Response = serde_json::from_str(body)?;
    debug!(body, "prometheus response");

    if response.status != "success" {
        return Err(SourceError::Status {
            status: response.error_type.unwrap_or(response.status),
            message: response.error.unwrap_or_default(),
        });
    }

    let mut result = response.data.map(|d| d.result).unwrap_or_default();
    if result.len() > 1 {
        warn!("more than 1 result in prometheus response ({})", result.len());
    }
    if result.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(result.swap_remove(0))
}

/// Decodes an `/api/v1/query` response body.
pub fn decode_instant(body: &str) -> Result<Sample, SourceError> {
    let series = first_series(body)?;
    let point = series.value.ok_or(SourceError::Empty)?;
    parse_point(&point)
}

/// Decodes an `/api/v1/query_range` response body.
pub fn decode_range(body: &str) -> Result<Vec<Sample>, SourceError> {
    let series = first_series(body)?;
    series.values.iter().map(parse_point).collect()
}

/// Prometheus HTTP API client.
pub struct Prometheus {
    base: String,
    agent: ureq::Agent,
}

impl Prometheus {
    pub fn new(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { base, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, SourceError> {
        let mut request = self.agent.get(&format!("{}{}", self.base, path));
        for (key, value) in params {
            request = request.query(key, value);
        }

        let response = match request.call() {
            Ok(response) => response,
            // Error statuses still carry a JSON body describing the failure.
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(SourceError::Transport(e.to_string())),
        };
        response
            .into_string()
            .map_err(|e| SourceError::Transport(e.to_string()))
    }
}

impl MetricSource for Prometheus {
    fn instant(&mut self, query: &str) -> Result<Sample, SourceError> {
        let body = self.get("/api/v1/query", &[("query", query.to_string())])?;
        decode_instant(&body)
    }

    fn range(&mut self, query: &str, range: &QueryRange) -> Result<Vec<Sample>, SourceError> {
        let body = self.get(
            "/api/v1/query_range",
            &[
                ("query", query.to_string()),
                ("start", range.start.to_string()),
                ("end", range.end.to_string()),
                ("step", range.step.to_string()),
            ],
        )?;
        decode_range(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_instant_vector() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[
            {"metric":{"instance":"a"},"value":[1659101350.781,"0.25"]}
        ]}}"#;
        assert_eq!(decode_instant(body).unwrap(), Sample::new(1659101350, 0.25));
    }

    #[test]
    fn multiple_rows_use_the_first() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[
            {"metric":{"instance":"a"},"value":[10,"1"]},
            {"metric":{"instance":"b"},"value":[10,"2"]}
        ]}}"#;
        assert_eq!(decode_instant(body).unwrap().value, 1.0);
    }

    #[test]
    fn empty_result_is_no_data() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        assert!(matches!(decode_instant(body), Err(SourceError::Empty)));
    }

    #[test]
    fn decodes_range_matrix() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[
            {"metric":{},"values":[[0,"0"],[10,"0.5"],[20,"NaN"]]}
        ]}}"#;
        let samples = decode_range(body).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1], Sample::new(10, 0.5));
        assert!(samples[2].value.is_nan());
    }

    #[test]
    fn error_envelope_is_reported() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 3"}"#;
        match decode_range(body) {
            Err(SourceError::Status { status, message }) => {
                assert_eq!(status, "bad_data");
                assert_eq!(message, "parse error at char 3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_instant("<html>"), Err(SourceError::Decode(_))));
        let body = r#"{"status":"success","data":{"result":[{"value":[1,"abc"]}]}}"#;
        assert!(matches!(decode_instant(body), Err(SourceError::Decode(_))));
    }

    #[test]
    fn host_gets_a_scheme() {
        assert_eq!(Prometheus::new("localhost:9090").base_url(), "http://localhost:9090");
        assert_eq!(
            Prometheus::new("https://prom.example/").base_url(),
            "https://prom.example"
        );
    }
}
