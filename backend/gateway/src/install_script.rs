//! Bash scripts served to accepters by `GET /api/install/:token`.
//!
//! Every value interpolated into a script is shell-quoted. Host names are
//! additionally restricted to `[A-Za-z0-9.:-]` before they get here.

use serde::Deserialize;

use sshpair_security::sudo::shell_quote;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// Send the accepter's key to the offerer.
    #[default]
    Send,
    /// Append the offerer's key to the accepter's `authorized_keys`.
    Grant,
}

/// Whether `host` is safe to embed in a URL and a script.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 253
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-'))
}

/// Strip a `:port` suffix (and IPv6 brackets) from a `Host` header value.
pub fn host_without_port(header: &str) -> &str {
    let header = header.trim();
    if let Some(rest) = header.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match header.rsplit_once(':') {
        // A single colon is a port separator; more than one is a bare IPv6 address.
        Some((host, _)) if !host.contains(':') => host,
        _ => header,
    }
}

/// `http://host:port`, bracketing IPv6 literals.
pub fn base_url(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// The copy-paste command shown on the offerer's screen.
pub fn oneliner(base: &str, token: &str, mode: InstallMode) -> String {
    let url = match mode {
        InstallMode::Send => format!("{base}/api/install/{token}"),
        InstallMode::Grant => format!("{base}/api/install/{token}?mode=grant"),
    };
    format!("curl -fsSL {} | bash", shell_quote(&url))
}

pub fn render(base: &str, token: &str, mode: InstallMode) -> String {
    let header = format!(
        "#!/usr/bin/env bash\nset -euo pipefail\n\nSSHPAIR_URL={}\nSSHPAIR_TOKEN={}\n",
        shell_quote(base),
        shell_quote(token),
    );
    let body = match mode {
        InstallMode::Send => SEND_BODY,
        InstallMode::Grant => GRANT_BODY,
    };
    format!("{header}{body}")
}

const SEND_BODY: &str = r#"SSH_DIR="$HOME/.ssh"
KEY="$SSH_DIR/id_ed25519"

mkdir -p "$SSH_DIR" && chmod 700 "$SSH_DIR"
if [ -s "$KEY.pub" ]; then
  PUB_FILE="$KEY.pub"
elif [ -s "$SSH_DIR/id_rsa.pub" ]; then
  PUB_FILE="$SSH_DIR/id_rsa.pub"
else
  echo "sshpair: generating $KEY"
  ssh-keygen -q -t ed25519 -N '' -f "$KEY"
  PUB_FILE="$KEY.pub"
fi

json_escape() { printf '%s' "$1" | sed -e 's/\\/\\\\/g' -e 's/"/\\"/g'; }

PUBKEY="$(tr -d '\r\n' < "$PUB_FILE")"
ME="$(id -un)"
HOST="$(hostname)"
BODY="{\"pubkey\":\"$(json_escape "$PUBKEY")\",\"user\":\"$(json_escape "$ME")\",\"hostname\":\"$(json_escape "$HOST")\"}"

curl -fsS -X POST -H 'Content-Type: application/json' \
  --data "$BODY" "$SSHPAIR_URL/api/pairing/$SSHPAIR_TOKEN" > /dev/null
echo "sshpair: key sent. The offerer can now run: ssh $ME@$HOST"
"#;

const GRANT_BODY: &str = r#"SSH_DIR="$HOME/.ssh"
AUTH="$SSH_DIR/authorized_keys"

OFFERER_KEY="$(curl -fsS "$SSHPAIR_URL/api/publickey?token=$SSHPAIR_TOKEN" | tr -d '\r')"
if [ -z "$OFFERER_KEY" ]; then
  echo "sshpair: offerer returned no key" >&2
  exit 1
fi

mkdir -p "$SSH_DIR" && chmod 700 "$SSH_DIR"
touch "$AUTH" && chmod 600 "$AUTH"

KEY_ID="$(printf '%s' "$OFFERER_KEY" | awk '{print $1" "$2}')"
if grep -qF "$KEY_ID" "$AUTH"; then
  echo "sshpair: offerer key already authorized"
  exit 0
fi

printf '\n# sshpair %s offerer@%s\n%s\n' \
  "$(date -u +%Y-%m-%dT%H:%M:%SZ)" "${SSHPAIR_URL#http://}" "$OFFERER_KEY" >> "$AUTH"
echo "sshpair: offerer key added to $AUTH"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_validation() {
        assert!(is_valid_host("192.168.1.20"));
        assert!(is_valid_host("box.local"));
        assert!(is_valid_host("fe80::1"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("evil;rm -rf ~"));
        assert!(!is_valid_host("$(id)"));
        assert!(!is_valid_host("a b"));
    }

    #[test]
    fn strips_ports() {
        assert_eq!(host_without_port("10.0.0.2:4321"), "10.0.0.2");
        assert_eq!(host_without_port("box.lan"), "box.lan");
        assert_eq!(host_without_port("[fe80::1]:4321"), "fe80::1");
        assert_eq!(host_without_port("fe80::1"), "fe80::1");
    }

    #[test]
    fn base_url_brackets_ipv6() {
        assert_eq!(base_url("10.0.0.2", 4321), "http://10.0.0.2:4321");
        assert_eq!(base_url("fe80::1", 4321), "http://[fe80::1]:4321");
    }

    #[test]
    fn oneliners_quote_the_url() {
        let base = base_url("10.0.0.2", 4321);
        assert_eq!(
            oneliner(&base, "abcd", InstallMode::Send),
            "curl -fsSL 'http://10.0.0.2:4321/api/install/abcd' | bash"
        );
        assert_eq!(
            oneliner(&base, "abcd", InstallMode::Grant),
            "curl -fsSL 'http://10.0.0.2:4321/api/install/abcd?mode=grant' | bash"
        );
    }

    #[test]
    fn send_script_posts_to_pairing_route() {
        let script = render("http://10.0.0.2:4321", "deadbeef", InstallMode::Send);
        assert!(script.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));
        assert!(script.contains("SSHPAIR_URL='http://10.0.0.2:4321'"));
        assert!(script.contains("SSHPAIR_TOKEN='deadbeef'"));
        assert!(script.contains("/api/pairing/$SSHPAIR_TOKEN"));
        assert!(script.contains("ssh-keygen -q -t ed25519"));
        assert!(!script.contains("/api/publickey"));
    }

    #[test]
    fn grant_script_appends_offerer_key() {
        let script = render("http://10.0.0.2:4321", "deadbeef", InstallMode::Grant);
        assert!(script.contains("/api/publickey?token=$SSHPAIR_TOKEN"));
        assert!(script.contains(">> \"$AUTH\""));
        assert!(script.contains("# sshpair %s"));
        assert!(!script.contains("/api/pairing/"));
    }
}
