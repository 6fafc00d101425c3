//! Network and power context probes.
//!
//! Pure synchronous reads of platform state. Probes never block beyond small
//! sysfs files and never fail: anything unreadable maps to the most
//! conservative class.

use std::fs;
use std::path::{Path, PathBuf};

/// Reachability tier used to size prefetch depth and fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkClass {
    Wifi,
    Cellular4G,
    Cellular3G,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerClass {
    Normal,
    LowBattery,
    PowerSaver,
}

pub trait ContextMonitor {
    fn network_class(&self) -> NetworkClass;
    fn power_class(&self) -> PowerClass;

    /// Speculative work is allowed only on mains-grade power with any
    /// network at all.
    fn prefetch_allowed(&self) -> bool {
        self.power_class() == PowerClass::Normal && self.network_class() != NetworkClass::Offline
    }
}

/// Battery percentage below which the host counts as low on power.
const LOW_BATTERY_PERCENT: u64 = 15;

/// Sysfs-backed monitor for Linux hosts.
pub struct SystemMonitor {
    net_root: PathBuf,
    power_root: PathBuf,
    profile_path: PathBuf,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self {
            net_root: PathBuf::from("/sys/class/net"),
            power_root: PathBuf::from("/sys/class/power_supply"),
            profile_path: PathBuf::from("/sys/firmware/acpi/platform_profile"),
        }
    }

    #[cfg(test)]
    fn with_roots(net_root: PathBuf, power_root: PathBuf, profile_path: PathBuf) -> Self {
        Self {
            net_root,
            power_root,
            profile_path,
        }
    }

    fn interface_up(path: &Path) -> bool {
        fs::read_to_string(path.join("operstate"))
            .map(|s| s.trim() == "up")
            .unwrap_or(false)
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextMonitor for SystemMonitor {
    fn network_class(&self) -> NetworkClass {
        let Ok(entries) = fs::read_dir(&self.net_root) else {
            return NetworkClass::Offline;
        };

        let mut best = NetworkClass::Offline;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" || !Self::interface_up(&entry.path()) {
                continue;
            }
            if entry.path().join("wireless").is_dir() || name.starts_with("wl") {
                return NetworkClass::Wifi;
            }
            if name.starts_with("wwan") || name.starts_with("ppp") {
                // Link generation is not knowable from sysfs; assume the
                // slower tier.
                if best == NetworkClass::Offline {
                    best = NetworkClass::Cellular3G;
                }
            } else {
                // Wired links get the unmetered tier.
                best = NetworkClass::Wifi;
            }
        }
        best
    }

    fn power_class(&self) -> PowerClass {
        if let Ok(profile) = fs::read_to_string(&self.profile_path) {
            if profile.trim() == "low-power" {
                return PowerClass::PowerSaver;
            }
        }

        let Ok(entries) = fs::read_dir(&self.power_root) else {
            return PowerClass::PowerSaver;
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("BAT") {
                continue;
            }
            let capacity = fs::read_to_string(entry.path().join("capacity"))
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok());
            return match capacity {
                Some(pct) if pct < LOW_BATTERY_PERCENT => PowerClass::LowBattery,
                Some(_) => PowerClass::Normal,
                None => PowerClass::PowerSaver,
            };
        }

        // Battery-less host on mains power.
        PowerClass::Normal
    }
}

/// Monitor with fixed answers, for tests and command-line overrides.
pub struct FixedMonitor {
    pub network: NetworkClass,
    pub power: PowerClass,
}

impl FixedMonitor {
    pub fn new(network: NetworkClass, power: PowerClass) -> Self {
        Self { network, power }
    }
}

impl ContextMonitor for FixedMonitor {
    fn network_class(&self) -> NetworkClass {
        self.network
    }

    fn power_class(&self) -> PowerClass {
        self.power
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FakeHost {
        _dir: TempDir,
        net: PathBuf,
        power: PathBuf,
        profile: PathBuf,
    }

    impl FakeHost {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let net = dir.path().join("net");
            let power = dir.path().join("power_supply");
            let profile = dir.path().join("platform_profile");
            fs::create_dir_all(&net).unwrap();
            fs::create_dir_all(&power).unwrap();
            Self {
                _dir: dir,
                net,
                power,
                profile,
            }
        }

        fn monitor(&self) -> SystemMonitor {
            SystemMonitor::with_roots(self.net.clone(), self.power.clone(), self.profile.clone())
        }

        fn add_iface(&self, name: &str, state: &str, wireless: bool) {
            let path = self.net.join(name);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("operstate"), state).unwrap();
            if wireless {
                fs::create_dir_all(path.join("wireless")).unwrap();
            }
        }

        fn add_battery(&self, capacity: &str) {
            let path = self.power.join("BAT0");
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("capacity"), capacity).unwrap();
        }
    }

    #[test]
    fn test_wireless_interface_up_is_wifi() {
        let host = FakeHost::new();
        host.add_iface("wlan0", "up", true);
        assert_eq!(host.monitor().network_class(), NetworkClass::Wifi);
    }

    #[test]
    fn test_no_interface_up_is_offline() {
        let host = FakeHost::new();
        host.add_iface("lo", "up", false);
        host.add_iface("wlan0", "down", true);
        assert_eq!(host.monitor().network_class(), NetworkClass::Offline);
    }

    #[test]
    fn test_modem_classifies_as_conservative_cellular() {
        let host = FakeHost::new();
        host.add_iface("wwan0", "up", false);
        assert_eq!(host.monitor().network_class(), NetworkClass::Cellular3G);
    }

    #[test]
    fn test_wired_link_gets_unmetered_tier() {
        let host = FakeHost::new();
        host.add_iface("enp0s1", "up", false);
        assert_eq!(host.monitor().network_class(), NetworkClass::Wifi);
    }

    #[test]
    fn test_low_battery() {
        let host = FakeHost::new();
        host.add_battery("10");
        assert_eq!(host.monitor().power_class(), PowerClass::LowBattery);
    }

    #[test]
    fn test_healthy_battery_is_normal() {
        let host = FakeHost::new();
        host.add_battery("80");
        assert_eq!(host.monitor().power_class(), PowerClass::Normal);
    }

    #[test]
    fn test_unreadable_capacity_is_power_saver() {
        let host = FakeHost::new();
        host.add_battery("garbage");
        assert_eq!(host.monitor().power_class(), PowerClass::PowerSaver);
    }

    #[test]
    fn test_no_battery_is_mains_power() {
        let host = FakeHost::new();
        assert_eq!(host.monitor().power_class(), PowerClass::Normal);
    }

    #[test]
    fn test_low_power_profile_is_power_saver() {
        let host = FakeHost::new();
        host.add_battery("80");
        fs::write(&host.profile, "low-power\n").unwrap();
        assert_eq!(host.monitor().power_class(), PowerClass::PowerSaver);
    }

    #[test]
    fn test_prefetch_gate() {
        let allowed = FixedMonitor::new(NetworkClass::Wifi, PowerClass::Normal);
        assert!(allowed.prefetch_allowed());

        let offline = FixedMonitor::new(NetworkClass::Offline, PowerClass::Normal);
        assert!(!offline.prefetch_allowed());

        let saving = FixedMonitor::new(NetworkClass::Wifi, PowerClass::PowerSaver);
        assert!(!saving.prefetch_allowed());

        let low = FixedMonitor::new(NetworkClass::Cellular4G, PowerClass::LowBattery);
        assert!(!low.prefetch_allowed());
    }
}
