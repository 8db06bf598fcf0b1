//! Stateless request builder and response parser for the destinations API.
//!
//! # Design
//! `DestinationClient` holds only the endpoint URL. `build_list_destinations`
//! produces the one `GET` the API offers and `parse_list_destinations`
//! classifies whatever came back. The round-trip in between belongs to a
//! `Transport` or to a host that does its own I/O.

use crate::error::FetchError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::DestinationResponse;

/// Longest error body kept in `FetchError::Http`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct DestinationClient {
    base_url: String,
}

impl DestinationClient {
    /// The base URL *is* the resource: no path segment or query is appended.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_destinations(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.base_url.clone(),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        }
    }

    pub fn parse_list_destinations(
        &self,
        response: HttpResponse,
    ) -> Result<DestinationResponse, FetchError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Err(FetchError::Decode("empty body".to_string()));
        }
        let parsed: Option<DestinationResponse> = serde_json::from_str(&response.body)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        parsed.ok_or_else(|| FetchError::Decode("null body".to_string()))
    }
}

fn check_status(response: &HttpResponse) -> Result<(), FetchError> {
    if response.is_success() {
        return Ok(());
    }
    let mut body = response.body.clone();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(FetchError::Http {
        status: response.status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DestinationClient {
        DestinationClient::new("http://localhost:3000/destinations")
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_list_destinations_targets_base_url() {
        let req = client().build_list_destinations();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/destinations");
        assert!(req.body.is_none());
        assert_eq!(req.header("Accept"), Some("application/json"));
    }

    #[test]
    fn trailing_slash_is_kept() {
        let client = DestinationClient::new(" https://api.example.com/v1/ ");
        assert_eq!(client.build_list_destinations().url, "https://api.example.com/v1/");
    }

    #[test]
    fn parse_list_destinations_success() {
        let parsed = client()
            .parse_list_destinations(ok(r#"[{"property_name":"Hut","fare":10.0},{}]"#))
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].property_name.as_deref(), Some("Hut"));
    }

    #[test]
    fn empty_array_is_an_empty_collection() {
        let parsed = client().parse_list_destinations(ok("[]")).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn other_2xx_statuses_are_success() {
        let mut response = ok("[]");
        response.status = 203;
        assert!(client().parse_list_destinations(response).is_ok());
    }

    #[test]
    fn server_error_is_http_error() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: "boom".to_string(),
        };
        let err = client().parse_list_destinations(response).unwrap_err();
        assert_eq!(
            err,
            FetchError::Http {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[test]
    fn not_found_is_http_error_even_with_array_body() {
        let response = HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: "[]".to_string(),
        };
        let err = client().parse_list_destinations(response).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn error_body_is_truncated_on_char_boundary() {
        let response = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: "é".repeat(400),
        };
        match client().parse_list_destinations(response).unwrap_err() {
            FetchError::Http { body, .. } => {
                assert!(body.len() <= MAX_ERROR_BODY);
                assert!(body.chars().all(|c| c == 'é'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_json_is_decode_error() {
        let err = client().parse_list_destinations(ok("not json")).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn object_instead_of_array_is_decode_error() {
        let err = client()
            .parse_list_destinations(ok(r#"{"property_name":"Hut"}"#))
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn null_and_blank_bodies_are_decode_errors() {
        for body in ["null", "", "  \n"] {
            let err = client().parse_list_destinations(ok(body)).unwrap_err();
            assert!(matches!(err, FetchError::Decode(_)), "body {body:?}");
        }
    }
}
