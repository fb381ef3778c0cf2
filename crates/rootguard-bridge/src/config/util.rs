pub(super) fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

pub(super) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}

pub(super) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "enabled" | "on" => Some(true),
        "0" | "false" | "no" | "disabled" | "off" => Some(false),
        _ => None,
    }
}

pub(super) fn parse_ports(raw: &str) -> Option<Vec<u16>> {
    split_csv(raw)
        .iter()
        .map(|port| port.parse::<u16>().ok())
        .collect()
}
