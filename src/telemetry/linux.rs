// Linux-specific helpers: /proc and /sys fallbacks for counters sysinfo
// does not expose.

/// Cached and Buffers from /proc/meminfo, in bytes (the file reports kB).
pub(super) fn read_meminfo_cached_buffers() -> Option<(u64, u64)> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/meminfo").ok()?;
        let mut cached = None;
        let mut buffers = None;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("Cached:") {
                cached = parse_kb(rest);
            } else if let Some(rest) = line.strip_prefix("Buffers:") {
                buffers = parse_kb(rest);
            }
            if cached.is_some() && buffers.is_some() {
                break;
            }
        }
        return Some((cached?, buffers?));
    }
    #[cfg(not(target_os = "linux"))]
    None
}

#[cfg(target_os = "linux")]
fn parse_kb(rest: &str) -> Option<u64> {
    rest.trim()
        .split_whitespace()
        .next()?
        .parse::<u64>()
        .ok()
        .map(|kb| kb * 1024)
}

/// First readable thermal zone, in degrees Celsius (the sysfs files report
/// millidegrees). Fallback when sysinfo components expose no CPU sensor.
pub(super) fn read_thermal_zone_temp() -> Option<f32> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/sys/class/thermal").ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("thermal_zone"))
            {
                continue;
            }
            if let Ok(content) = std::fs::read_to_string(path.join("temp"))
                && let Ok(milli) = content.trim().parse::<i64>()
                && milli > 0
            {
                return Some(milli as f32 / 1000.0);
            }
        }
    }
    None
}

/// Total dropped packets (rx + tx) across interfaces from /proc/net/dev.
/// sysinfo reports errors but not drops.
pub(super) fn read_net_dev_dropped() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/dev").ok()?;
        let mut total: u64 = 0;
        for line in content.lines().skip(2) {
            let Some((name, counters)) = line.split_once(':') else {
                continue;
            };
            if name.trim() == "lo" {
                continue;
            }
            let fields: Vec<u64> = counters
                .split_whitespace()
                .filter_map(|f| f.parse().ok())
                .collect();
            // rx: bytes packets errs drop …  tx starts at field 8
            if fields.len() >= 12 {
                total += fields[3] + fields[11];
            }
        }
        return Some(total);
    }
    #[cfg(not(target_os = "linux"))]
    None
}
