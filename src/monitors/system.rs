//! Host snapshot collection backed by `sysinfo`.

use std::{
    collections::BTreeSet,
    net::IpAddr,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sysinfo::{Disks, Networks, System};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use crate::{SystemInfo, util::read_body_limited};

/// Source of host snapshots for the notification loop.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Collects a snapshot. Fields that cannot be read stay zero or empty.
    async fn collect(&self) -> SystemInfo;
}

pub struct SysinfoCollector {
    system: Mutex<System>,
    root_path: PathBuf,
    public_ip: Option<PublicIpResolver>,
}

impl SysinfoCollector {
    pub fn new() -> Self {
        Self::with_public_ip(Some(PublicIpResolver::new()))
    }

    /// Collector that never contacts the public IP services.
    pub fn offline() -> Self {
        Self::with_public_ip(None)
    }

    pub fn with_public_ip(public_ip: Option<PublicIpResolver>) -> Self {
        Self {
            system: Mutex::new(System::new_all()),
            root_path: root_path(),
            public_ip,
        }
    }

    fn lock_system(&self) -> MutexGuard<'_, System> {
        self.system.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_host(system: &System) -> SystemInfo {
        let cpus = system.cpus();
        let cpu_model = cpu_model(cpus.first().map(|cpu| cpu.brand()));

        let memory_total = system.total_memory();
        let memory_used = system.used_memory();
        let memory_free = match system.available_memory() {
            0 => system.free_memory(),
            available => available,
        };

        SystemInfo {
            os: std::env::consts::OS.to_string(),
            os_version: os_version(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: System::host_name().unwrap_or_default(),
            num_cpu: cpus.len(),
            cpu_model,
            cpu_usage: f64::from(system.global_cpu_usage()),
            memory_total,
            memory_used,
            memory_usage: percentage(memory_used, memory_total),
            memory_free,
            uptime_seconds: System::uptime(),
            ..Default::default()
        }
    }

    fn read_disk(info: &mut SystemInfo, root: &Path) {
        info.disk_path = root.display().to_string();

        let disks = Disks::new_with_refreshed_list();
        let Some(disk) = disks.list().iter().find(|disk| disk.mount_point() == root) else {
            debug!("no disk mounted at {}", root.display());
            return;
        };

        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);

        info.disk_total = total;
        info.disk_used = used;
        info.disk_free = free;
        info.disk_usage = percentage(used, total);
    }
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotProvider for SysinfoCollector {
    #[instrument(skip_all)]
    async fn collect(&self) -> SystemInfo {
        self.lock_system().refresh_cpu_usage();

        // usage is computed from the difference between two refreshes
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;

        let mut info = {
            let mut system = self.lock_system();
            system.refresh_cpu_usage();
            system.refresh_memory();
            Self::read_host(&system)
        };

        Self::read_disk(&mut info, &self.root_path);
        info.local_ips = local_ips();

        if let Some(resolver) = &self.public_ip {
            info.public_ip = resolver.lookup().await;
        }

        trace!(
            "collected snapshot: cpu {:.1}%, memory {:.1}%, disk {:.1}%",
            info.cpu_usage, info.memory_usage, info.disk_usage
        );

        info
    }
}

/// Brand string of the first CPU, or `CPU 0` when the brand is blank.
fn cpu_model(brand: Option<&str>) -> String {
    match brand.map(str::trim) {
        None => String::new(),
        Some("") => "CPU 0".to_string(),
        Some(brand) => brand.to_string(),
    }
}

fn percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 / total as f64 * 100.0
}

fn os_version() -> String {
    [System::name(), System::os_version()]
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn root_path() -> PathBuf {
    if cfg!(windows) {
        let drive = std::env::var("SystemDrive")
            .ok()
            .map(|drive| drive.trim().to_string())
            .filter(|drive| !drive.is_empty())
            .unwrap_or_else(|| "C:".to_string());

        if drive.ends_with('\\') {
            PathBuf::from(drive)
        } else {
            PathBuf::from(format!("{drive}\\"))
        }
    } else {
        PathBuf::from("/")
    }
}

fn local_ips() -> Vec<String> {
    let networks = Networks::new_with_refreshed_list();
    let addrs = networks
        .list()
        .iter()
        .filter(|(name, _)| interface_is_up(name))
        .flat_map(|(_, data)| data.ip_networks().iter().map(|network| network.addr));

    select_local_ips(addrs)
}

/// Interfaces that are down or not present are skipped. Anything
/// else, including `unknown` which tunnels report, counts as up.
fn operstate_is_up(operstate: &str) -> bool {
    !matches!(operstate.trim(), "down" | "lowerlayerdown" | "notpresent")
}

#[cfg(target_os = "linux")]
fn interface_is_up(name: &str) -> bool {
    match std::fs::read_to_string(format!("/sys/class/net/{name}/operstate")) {
        Ok(operstate) => operstate_is_up(&operstate),
        Err(e) => {
            trace!("no operstate for {name}: {e}");
            true
        }
    }
}

// sysinfo exposes no link state on other platforms
#[cfg(not(target_os = "linux"))]
fn interface_is_up(_name: &str) -> bool {
    true
}

/// Picks the addresses worth showing for this host: private addresses when
/// there are any, globally routable unicast addresses otherwise. Loopback and
/// link-local addresses never qualify. The result is sorted and free of
/// duplicates.
pub fn select_local_ips(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<String> {
    let mut private = BTreeSet::new();
    let mut global = BTreeSet::new();

    for addr in addrs {
        let addr = addr.to_canonical();
        if addr.is_loopback() || is_link_local(&addr) {
            continue;
        }

        if is_private(&addr) {
            private.insert(addr.to_string());
        } else if is_global_unicast(&addr) {
            global.insert(addr.to_string());
        }
    }

    let selected = if private.is_empty() { global } else { private };
    selected.into_iter().collect()
}

fn is_link_local(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_unicast_link_local(),
    }
}

fn is_private(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => v6.is_unique_local(),
    }
}

fn is_global_unicast(addr: &IpAddr) -> bool {
    if addr.is_unspecified() || addr.is_multicast() {
        return false;
    }

    match addr {
        IpAddr::V4(v4) => !v4.is_broadcast(),
        IpAddr::V6(_) => true,
    }
}

pub const PUBLIC_IP_ENDPOINTS: [&str; 2] = [
    "https://api64.ipify.org?format=text",
    "https://api.ipify.org?format=text",
];
pub const PUBLIC_IP_TTL: Duration = Duration::from_secs(30 * 60);

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(2);
const PUBLIC_IP_BODY_LIMIT: usize = 128;

#[derive(Debug, Clone)]
struct CachedIp {
    value: String,
    fetched_at: Instant,
}

/// Looks up the public address of the host through plain-text IP echo
/// services and caches the answer.
#[derive(Debug)]
pub struct PublicIpResolver {
    client: Client,
    endpoints: Vec<String>,
    ttl: Duration,
    cache: RwLock<Option<CachedIp>>,
}

impl PublicIpResolver {
    pub fn new() -> Self {
        Self::with_endpoints(
            PUBLIC_IP_ENDPOINTS.iter().map(|url| url.to_string()).collect(),
            PUBLIC_IP_TTL,
        )
    }

    pub fn with_endpoints(endpoints: Vec<String>, ttl: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Returns the cached address while it is fresh. Otherwise asks every
    /// endpoint in order; when all of them fail the stale value (or an empty
    /// string) is returned.
    pub async fn lookup(&self) -> String {
        let stale = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if !cached.value.is_empty() && cached.fetched_at.elapsed() < self.ttl => {
                    return cached.value.clone();
                }
                Some(cached) => cached.value.clone(),
                None => String::new(),
            }
        };

        for endpoint in &self.endpoints {
            if let Some(value) = self.fetch(endpoint).await {
                *self.cache.write().await = Some(CachedIp {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                return value;
            }
        }

        stale
    }

    async fn fetch(&self, endpoint: &str) -> Option<String> {
        let response = match self
            .client
            .get(endpoint)
            .timeout(PUBLIC_IP_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("public ip lookup via {endpoint} failed: {e}");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!("public ip lookup via {endpoint} returned {}", response.status());
            return None;
        }

        let body = read_body_limited(response, PUBLIC_IP_BODY_LIMIT).await;
        let text = String::from_utf8_lossy(&body);
        let candidate = text.trim();

        match candidate.parse::<IpAddr>() {
            Ok(_) => Some(candidate.to_string()),
            Err(_) => {
                debug!("public ip lookup via {endpoint} returned an invalid address");
                None
            }
        }
    }
}

impl Default for PublicIpResolver {
    fn default() -> Self {
        Self::new()
    }
}
