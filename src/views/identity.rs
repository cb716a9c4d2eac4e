//! 访客身份解析
//!
//! Pure derivation of the (user id, address, signature) tuple from the
//! raw request metadata. Never fails, never yields an empty string.

/// Sentinel used when an address or signature cannot be determined
pub const UNKNOWN: &str = "unknown";

const IPV4_MAPPED_PREFIX: &str = "::ffff:";

/// Width of the ledger `ip_address` column. Longer header values are
/// treated as undeterminable instead of being truncated by the database.
pub const MAX_ADDRESS_LEN: usize = 64;

/// Best-effort identity of whoever triggered a view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitorIdentity {
    pub user_id: Option<i64>,
    pub address: String,
    pub signature: String,
}

impl VisitorIdentity {
    pub fn new(user_id: Option<i64>, address: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            user_id,
            address: address.into(),
            signature: signature.into(),
        }
    }

    pub fn has_known_address(&self) -> bool {
        self.address != UNKNOWN
    }
}

/// 地址来源（按优先级）
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressSources<'a> {
    /// `X-Forwarded-For`, a comma separated proxy chain
    pub forwarded_for: Option<&'a str>,
    /// `X-Real-IP`
    pub real_ip: Option<&'a str>,
    /// Transport-layer peer address
    pub peer: Option<&'a str>,
}

/// 解析客户端地址
///
/// 1. 非空的 X-Forwarded-For → 第一个条目（trim 后，空则 `unknown`）
/// 2. 非空的 X-Real-IP → trim 后的值
/// 3. 对端地址，去掉 `::ffff:` 前缀
/// 4. `unknown`
///
/// 超过 [`MAX_ADDRESS_LEN`] 的值一律视为 `unknown`
pub fn resolve_address(sources: AddressSources<'_>) -> String {
    if let Some(forwarded) = sources.forwarded_for.filter(|v| !v.is_empty()) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        return or_unknown(first);
    }

    if let Some(real_ip) = sources.real_ip.filter(|v| !v.is_empty()) {
        return or_unknown(real_ip.trim());
    }

    if let Some(peer) = sources.peer.filter(|v| !v.is_empty()) {
        let peer = peer.strip_prefix(IPV4_MAPPED_PREFIX).unwrap_or(peer);
        return or_unknown(peer);
    }

    UNKNOWN.to_string()
}

/// Client signature (User-Agent), `unknown` when absent or blank
pub fn resolve_signature(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn resolve_visitor(
    user_id: Option<i64>,
    sources: AddressSources<'_>,
    signature: Option<&str>,
) -> VisitorIdentity {
    VisitorIdentity {
        user_id,
        address: resolve_address(sources),
        signature: resolve_signature(signature),
    }
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() || value.len() > MAX_ADDRESS_LEN {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}
