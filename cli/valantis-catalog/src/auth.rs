//! Daily rotating `X-Auth` token.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

/// Header carrying the authentication token on every request.
pub const AUTH_HEADER: &str = "X-Auth";

/// Compute the token for the UTC calendar day of `now`.
///
/// The token is the hex encoded MD5 digest of `"{password}_{YYYYMMDD}"`.
/// It is a freshness stamp shared with the service, not a credential.
pub fn auth_token(password: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y%m%d");
    let digest = Md5::digest(format!("{password}_{stamp}").as_bytes());
    hex::encode(digest)
}
