use std::{borrow::Cow, collections::HashMap, str::FromStr};

pub(crate) const DEFAULT_BREEZE_ENDPOINT: &str = "https://dc.services.visualstudio.com";
const FIELDS_SEPARATOR: char = ';';
const FIELD_KEY_VALUE_SEPARATOR: char = '=';

#[derive(Debug)]
pub(crate) struct ConnectionString {
    pub(crate) ingestion_endpoint: String,
    pub(crate) instrumentation_key: String,
}

/// Errors from parsing an Application Insights connection string.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A field is not a `key=value` pair.
    #[error("invalid format")]
    InvalidFormat,
    /// There is no `InstrumentationKey` field.
    #[error("missing instrumentation key")]
    MissingInstrumentationKey,
    /// The `Authorization` field is something other than `ikey`.
    #[error("unsupported authorization; only \"ikey\" is supported")]
    UnsupportedAuthorization,
    /// The ingestion endpoint is not an absolute http(s) URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl FromStr for ConnectionString {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result: HashMap<String, String> = s
            .split(FIELDS_SEPARATOR)
            .filter(|kv| !kv.trim().is_empty())
            .map(|kv| {
                let parts: Vec<&str> = kv.split(FIELD_KEY_VALUE_SEPARATOR).collect();
                if parts.len() == 2 {
                    Ok((parts[0].trim().to_lowercase(), parts[1].to_string()))
                } else {
                    Err(ParseError::InvalidFormat)
                }
            })
            .collect::<Result<_, _>>()?;

        let ingestion_endpoint =
            if let Some(ingestion_endpoint) = result.remove("ingestionendpoint") {
                sanitize_url(ingestion_endpoint)?
            } else if let Some(endpoint_suffix) = result.remove("endpointsuffix") {
                let location_prefix = result
                    .remove("location")
                    .map(|x| format!("{}.", x))
                    .unwrap_or_default();
                sanitize_url(format!("https://{}dc.{}", location_prefix, endpoint_suffix))?
            } else {
                DEFAULT_BREEZE_ENDPOINT.to_string()
            };

        if let Some(authorization) = result.remove("authorization") {
            if !authorization.eq_ignore_ascii_case("ikey") {
                return Err(ParseError::UnsupportedAuthorization);
            }
        }
        let instrumentation_key = result
            .remove("instrumentationkey")
            .ok_or(ParseError::MissingInstrumentationKey)?;

        Ok(ConnectionString {
            ingestion_endpoint,
            instrumentation_key,
        })
    }
}

impl ConnectionString {
    /// Track endpoint of the ingestion service.
    pub(crate) fn track_endpoint(&self) -> String {
        format!("{}/v2/track", self.ingestion_endpoint)
    }
}

fn sanitize_url(url: String) -> Result<String, ParseError> {
    let mut new_url: Cow<str> = url.trim().into();
    if !new_url.starts_with("https://") {
        new_url = new_url.replace("http://", "https://").into();
    }

    let new_url = new_url.trim_end_matches('/');
    match new_url.parse::<http::Uri>() {
        Ok(uri) if uri.scheme().is_some() && uri.host().is_some() => Ok(new_url.to_string()),
        _ => Err(ParseError::InvalidEndpoint(new_url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(
        "Authorization=ikey;InstrumentationKey=instr_key;IngestionEndpoint=https://ingest",
        "https://ingest",
        "instr_key" ; "default")]
    #[test_case(
        "Authorization=ikey;InstrumentationKey=instr_key;IngestionEndpoint= http://ingest/  ",
        "https://ingest",
        "instr_key" ; "sanitize url")]
    #[test_case(
        "Foo=1;InstrumentationKey=instr_key;Bar=2;IngestionEndpoint=https://ingest;Baz=3",
        "https://ingest",
        "instr_key" ; "ignore unknown fields")]
    #[test_case(
        "InstrumentationKey=instr_key",
        DEFAULT_BREEZE_ENDPOINT,
        "instr_key" ; "default endpoint")]
    #[test_case(
        "InstrumentationKey=instr_key;EndpointSuffix=ai.contoso.com",
        "https://dc.ai.contoso.com",
        "instr_key" ; "endpoint suffix")]
    #[test_case(
        "InstrumentationKey=instr_key;EndpointSuffix=ai.contoso.com;Location=westus2",
        "https://westus2.dc.ai.contoso.com",
        "instr_key" ; "endpoint suffix & location")]
    #[test_case(
        "InstrumentationKey=instr_key;EndpointSuffix=ai.contoso.com;IngestionEndpoint=https://ingest",
        "https://ingest",
        "instr_key" ; "endpoint suffix & override")]
    #[test_case(
        "InstrumentationKey=instr_key;",
        DEFAULT_BREEZE_ENDPOINT,
        "instr_key" ; "trailing separator")]
    fn parse_succeeds(
        connection_string: &'static str,
        expected_ingestion_endpoint: &'static str,
        expected_instrumentation_key: &'static str,
    ) {
        let result: ConnectionString = connection_string.parse().unwrap();
        assert_eq!(expected_ingestion_endpoint, result.ingestion_endpoint);
        assert_eq!(expected_instrumentation_key, result.instrumentation_key);
    }

    #[test_case("Authorization=foo;InstrumentationKey=instr_key", ParseError::UnsupportedAuthorization ; "authorization != ikey")]
    #[test_case("InstrumentationKey=instr_key;NoValue", ParseError::InvalidFormat ; "field without value")]
    #[test_case("InstrumentationKey=instr_key;InvalidValue=foo=bar", ParseError::InvalidFormat ; "2 equals signs")]
    #[test_case("IngestionEndpoint=https://ingest", ParseError::MissingInstrumentationKey ; "no instrumentation key")]
    fn parse_fails(connection_string: &'static str, expected: ParseError) {
        let err = connection_string.parse::<ConnectionString>().unwrap_err();
        assert_eq!(expected, err);
    }

    #[test]
    fn invalid_endpoint() {
        let err = "InstrumentationKey=instr_key;IngestionEndpoint=not a url"
            .parse::<ConnectionString>()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidEndpoint(_)));
    }

    #[test]
    fn track_endpoint() {
        let cs: ConnectionString = "InstrumentationKey=k".parse().unwrap();
        assert_eq!(
            "https://dc.services.visualstudio.com/v2/track",
            cs.track_endpoint()
        );
    }
}
