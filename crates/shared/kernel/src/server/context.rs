use crate::server::error::ApiError;
use axum::extract::{FromRef, FromRequestParts, Query};
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri};
use mkt_domain::catalog::{Carrier, Region};
use mkt_domain::config::ApiConfig;
use mkt_domain::constants::{CARRIER_HEADER, REGION_HEADER, USER_HEADER};
use mkt_domain::features::FeatureProfile;
use mkt_domain::listing::UserId;
use tracing::debug;

/// Multi-valued query string parameters in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parses the query string of `uri`.
    ///
    /// # Errors
    /// Returns [`ApiError::Validation`] for an undecodable query string.
    pub fn from_uri(uri: &Uri) -> Result<Self, ApiError> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)?;
        Ok(Self(pairs))
    }

    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// The first non-empty value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, v)| k == name && !v.is_empty()).map(|(_, v)| v.as_str())
    }

    /// Every non-empty value of `name`, in request order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.0.iter().filter(|(k, v)| k == name && !v.is_empty()).map(|(_, v)| v.as_str()).collect()
    }

    /// Values of `name` with comma separated lists expanded (`sort=rating,name`).
    #[must_use]
    pub fn get_list(&self, name: &str) -> Vec<&str> {
        self.get_all(name)
            .into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// `true` for `1`, `true`, `yes` and `on`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Per-request marketplace context: caller, region, carrier, language, query parameters and the
/// device feature profile.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: Option<UserId>,
    pub region: &'static Region,
    pub carrier: Option<&'static Carrier>,
    pub lang: String,
    pub params: QueryParams,
    pub profile: Option<FeatureProfile>,
    pub path: String,
}

impl RequestContext {
    /// Builds the context from request parts.
    ///
    /// Region comes from the `region` parameter, then the region header, then the configured
    /// default. Unknown slugs fall back to the next source.
    ///
    /// # Errors
    /// Returns [`ApiError::Forbidden`] for a malformed user header and
    /// [`ApiError::Validation`] for an undecodable query string.
    pub fn from_parts(uri: &Uri, headers: &HeaderMap, config: &ApiConfig) -> Result<Self, ApiError> {
        let params = QueryParams::from_uri(uri)?;

        let user = match header_str(headers, USER_HEADER) {
            Some(raw) => Some(
                raw.parse::<UserId>().map_err(|_| ApiError::forbidden("Invalid user credentials"))?,
            ),
            None => None,
        };

        let region = [params.get("region"), header_str(headers, REGION_HEADER)]
            .into_iter()
            .flatten()
            .find_map(|slug| {
                let region = Region::by_slug(slug);
                if region.is_none() {
                    debug!(region = slug, "Ignoring unknown region");
                }
                region
            })
            .or_else(|| Region::by_slug(&config.market.default_region))
            .unwrap_or_else(Region::worldwide);

        let carrier = params
            .get("carrier")
            .or_else(|| header_str(headers, CARRIER_HEADER))
            .and_then(Carrier::by_slug);

        let lang = params
            .get("lang")
            .map(str::to_owned)
            .or_else(|| accept_language(headers))
            .unwrap_or_else(|| config.market.default_locale.clone());

        let profile = feature_profile(&params);

        Ok(Self { user, region, carrier, lang, params, profile, path: uri.path().to_owned() })
    }

    /// The authenticated caller.
    ///
    /// # Errors
    /// Returns [`ApiError::Forbidden`] for anonymous requests.
    pub fn require_user(&self) -> Result<UserId, ApiError> {
        self.user.ok_or_else(|| ApiError::forbidden("Authentication credentials were not provided"))
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    ApiConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = ApiConfig::from_ref(state);
        Self::from_parts(&parts.uri, &parts.headers, &config)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn accept_language(headers: &HeaderMap) -> Option<String> {
    header_str(headers, ACCEPT_LANGUAGE.as_str())
        .and_then(|raw| raw.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or(tag).trim())
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_owned)
}

/// Only Firefox OS and Android clients send a usable `pro` signature.
fn feature_profile(params: &QueryParams) -> Option<FeatureProfile> {
    let mobile = ["dev", "platform"]
        .into_iter()
        .any(|name| matches!(params.get(name), Some("firefoxos" | "android")));
    if !mobile {
        return None;
    }
    let signature = params.get("pro")?;
    FeatureProfile::from_signature(signature)
        .inspect_err(|err| debug!(signature, ?err, "Ignoring malformed feature profile"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use mkt_domain::features::FeatureSet;

    fn context(uri: &str, headers: &[(&'static str, &'static str)]) -> Result<RequestContext, ApiError> {
        let uri: Uri = uri.parse().unwrap();
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_static(value));
        }
        RequestContext::from_parts(&uri, &map, &ApiConfig::default())
    }

    #[test]
    fn region_prefers_parameter_then_header_then_default() {
        assert_eq!(context("/?region=us", &[("x-mkt-region", "br")]).unwrap().region.slug, "us");
        assert_eq!(context("/?region=mars", &[("x-mkt-region", "br")]).unwrap().region.slug, "br");
        assert_eq!(context("/", &[]).unwrap().region.slug, "restofworld");
    }

    #[test]
    fn user_header_must_be_numeric() {
        assert_eq!(context("/", &[("x-mkt-user", "31")]).unwrap().user, Some(31));
        let err = context("/", &[("x-mkt-user", "admin")]).unwrap_err();
        assert_eq!(err.http_status(), 403);
        assert_eq!(context("/", &[]).unwrap().require_user().unwrap_err().http_status(), 403);
    }

    #[test]
    fn language_falls_back_to_accept_language() {
        assert_eq!(context("/?lang=es", &[]).unwrap().lang, "es");
        assert_eq!(context("/", &[("accept-language", "pt-BR;q=0.9, en")]).unwrap().lang, "pt-BR");
        assert_eq!(context("/", &[]).unwrap().lang, "en-US");
    }

    #[test]
    fn feature_profile_needs_a_mobile_platform() {
        let ctx = context("/?dev=firefoxos&pro=4.3.1", &[]).unwrap();
        assert_eq!(ctx.profile.map(|p| p.supported()), Some(FeatureSet::APPS));

        assert!(context("/?dev=desktop&pro=4.3.1", &[]).unwrap().profile.is_none());
        assert!(context("/?dev=android&pro=garbage", &[]).unwrap().profile.is_none());
    }

    #[test]
    fn feature_profile_accepts_either_device_parameter() {
        let ctx = context("/?dev=desktop&platform=firefoxos&pro=4.3.1", &[]).unwrap();
        assert!(ctx.profile.is_some());
        assert!(context("/?platform=android&pro=4.3.1", &[]).unwrap().profile.is_some());
        assert!(context("/?dev=desktop&platform=desktop&pro=4.3.1", &[]).unwrap().profile.is_none());
    }

    #[test]
    fn params_keep_every_value() {
        let ctx = context("/?premium_types=free&premium_types=premium&sort=rating,%20name&q=", &[])
            .unwrap();
        assert_eq!(ctx.params.get_all("premium_types"), vec!["free", "premium"]);
        assert_eq!(ctx.params.get_list("sort"), vec!["rating", "name"]);
        assert!(!ctx.params.contains("q"));
        assert_eq!(ctx.carrier, None);
    }
}
