//! 从 HTTP 请求提取访客身份

use actix_web::HttpRequest;
use actix_web::http::header::{AUTHORIZATION, HeaderMap, USER_AGENT};
use tracing::trace;

use super::jwt::JwtService;
use crate::views::{AddressSources, VisitorIdentity, resolve_visitor};

/// Builds a [`VisitorIdentity`] from request headers, the peer address
/// and an optional session token.
///
/// Token problems never block recording: the visitor is then anonymous.
pub struct VisitorExtractor {
    jwt: Option<JwtService>,
    auth_cookie: String,
}

impl VisitorExtractor {
    pub fn new(jwt: Option<JwtService>, auth_cookie: impl Into<String>) -> Self {
        Self {
            jwt,
            auth_cookie: auth_cookie.into(),
        }
    }

    pub fn from_config() -> Self {
        let config = crate::config::get_config();
        Self::new(JwtService::from_config(), config.api.auth_cookie.clone())
    }

    pub fn extract(&self, req: &HttpRequest) -> VisitorIdentity {
        let headers = req.headers();
        let peer = req.peer_addr().map(|addr| addr.ip().to_string());

        let sources = AddressSources {
            forwarded_for: header_str(headers, "x-forwarded-for"),
            real_ip: header_str(headers, "x-real-ip"),
            peer: peer.as_deref(),
        };

        resolve_visitor(
            self.user_id(req),
            sources,
            headers.get(USER_AGENT).and_then(|h| h.to_str().ok()),
        )
    }

    fn user_id(&self, req: &HttpRequest) -> Option<i64> {
        let jwt = self.jwt.as_ref()?;
        let token = req
            .cookie(&self.auth_cookie)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(req.headers()))?;

        match jwt.validate_token(&token) {
            Ok(claims) => Some(claims.user_id),
            Err(e) => {
                trace!("Ignoring invalid session token: {}", e);
                None
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
