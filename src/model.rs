use serde::Deserialize;

/// One joined network as reported by `zerotier-cli -j listnetworks`.
///
/// Fields are optional: the backend omits or nulls entries depending on its
/// version and the network's authorization state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: Option<String>,
    /// Older payloads carry the id under `nwid` only.
    pub nwid: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub port_device_name: Option<String>,
    #[serde(default)]
    pub assigned_addresses: Vec<String>,
    pub mac: Option<String>,
    pub mtu: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub bridge: Option<bool>,
    pub dhcp: Option<bool>,
    pub allow_default: Option<bool>,
    pub allow_global: Option<bool>,
    pub allow_managed: Option<bool>,
    #[serde(rename = "allowDNS")]
    pub allow_dns: Option<bool>,
}

impl Network {
    /// Canonical network id, whichever field the backend populated.
    pub fn network_id(&self) -> &str {
        self.id
            .as_deref()
            .or(self.nwid.as_deref())
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some("") | None => "Unknown Name",
            Some(name) => name,
        }
    }
}

/// One peer as reported by `zerotier-cli -j peers`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub address: Option<String>,
    pub version: Option<String>,
    pub role: Option<String>,
    pub latency: Option<i64>,
    #[serde(default)]
    pub paths: Vec<PeerPath>,
}

impl Peer {
    /// The backend reports "-1.-1.-1" for peers whose version is unknown.
    pub fn display_version(&self) -> &str {
        match self.version.as_deref() {
            Some("-1.-1.-1") | Some("") | None => "-",
            Some(version) => version,
        }
    }
}

/// One physical path of a peer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPath {
    pub active: Option<bool>,
    pub address: Option<String>,
    pub expired: Option<bool>,
    pub last_receive: Option<i64>,
    pub last_send: Option<i64>,
    pub preferred: Option<bool>,
    pub trusted_path_id: Option<i64>,
}

/// Parsed `zerotier-cli status` line:
/// `200 info <address> <version> <ONLINE|OFFLINE|TUNNELED>`.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub address: String,
    pub version: String,
    pub status: String,
}

impl NodeStatus {
    pub fn parse(text: &str) -> Option<Self> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < 5 {
            return None;
        }
        Some(Self {
            address: words[2].to_string(),
            version: words[3].to_string(),
            status: words[4].to_string(),
        })
    }
}

/// One interface entry from `ip --json address`.
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceAddr {
    pub ifname: String,
    #[serde(default)]
    pub operstate: Option<String>,
}

impl InterfaceAddr {
    pub fn is_down(&self) -> bool {
        self.operstate
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("down"))
    }
}
