// ── Authorization list ──
//
// One pre-authorized client per line: `<mac> <ip> <bssid> <ssid>`.
// Blank lines and `#` comments are skipped.

use std::io;
use std::net::IpAddr;
use std::path::Path;

use odin_core::{AuthorizedClient, MacAddress};

use crate::ConfigError;

/// Read the authorization file at `path`.
///
/// A missing file yields an empty list; a deployment without one simply
/// has no statically known clients.
pub fn load_authorization_file(path: &Path) -> Result<Vec<AuthorizedClient>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    parse_authorization(&contents, &path.display().to_string())
}

/// Parse authorization list `contents`; `origin` names the source in errors.
pub fn parse_authorization(
    contents: &str,
    origin: &str,
) -> Result<Vec<AuthorizedClient>, ConfigError> {
    let mut clients = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fail = |reason: String| ConfigError::AuthorizationLine {
            path: origin.to_owned(),
            line: idx + 1,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [mac, ip, bssid, ssid] = fields.as_slice() else {
            return Err(fail(format!(
                "expected `<mac> <ip> <bssid> <ssid>`, got {} field(s)",
                fields.len()
            )));
        };

        let mac: MacAddress = mac.parse().map_err(|e| fail(format!("client: {e}")))?;
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| fail(format!("invalid IP address: {ip}")))?;
        let bssid: MacAddress = bssid.parse().map_err(|e| fail(format!("bssid: {e}")))?;

        clients.push(AuthorizedClient {
            mac,
            ip,
            bssid,
            ssid: (*ssid).to_owned(),
        });
    }
    Ok(clients)
}
