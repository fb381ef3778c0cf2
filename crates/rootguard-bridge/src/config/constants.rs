pub(super) const CONFIG_PATH_ENV: &str = "ROOTGUARD_CONFIG";

#[cfg(target_os = "android")]
pub(super) const CONFIG_CANDIDATES: [&str; 2] = [
    "/data/local/tmp/rootguard.conf",
    "./rootguard.conf",
];

#[cfg(not(target_os = "android"))]
pub(super) const CONFIG_CANDIDATES: [&str; 3] = [
    "/etc/rootguard/rootguard.conf",
    "./conf/rootguard.conf",
    "./rootguard.conf",
];
