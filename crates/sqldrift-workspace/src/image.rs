//! Container image resolution for workspace flavors

use sqldrift_core::{Flavor, Vendor};

/// Fallback image when no native image exists for a flavor/arch pair.
const SUBSTITUTE_IMAGE: &str = "mysql:8.0";

/// Outcome of resolving a flavor to a container image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub image: String,
    /// True when no native image exists and the fallback was substituted
    pub substituted: bool,
    /// Session variables required to approximate the requested flavor's
    /// behavior on the substituted server
    pub extra_session_params: Vec<(String, String)>,
}

impl ResolvedImage {
    fn native(image: String) -> Self {
        Self {
            image,
            substituted: false,
            extra_session_params: Vec::new(),
        }
    }

    fn substitute(requested: &Flavor) -> Self {
        let mut extra_session_params = Vec::new();
        // A 5.x-era request approximates its utf8mb4 default collation,
        // which changed in 8.0.
        if requested.vendor.is_mysql_compatible() && requested.major == 5 {
            extra_session_params.push((
                "default_collation_for_utf8mb4".to_string(),
                "utf8mb4_general_ci".to_string(),
            ));
        }
        Self {
            image: SUBSTITUTE_IMAGE.to_string(),
            substituted: true,
            extra_session_params,
        }
    }
}

/// The host architecture as used in image resolution: `amd64` or `arm64`.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64",
        _ => "amd64",
    }
}

fn tag(flavor: &Flavor) -> String {
    match flavor.patch {
        Some(patch) => format!("{}.{}.{}", flavor.major, flavor.minor, patch),
        None => format!("{}.{}", flavor.major, flavor.minor),
    }
}

/// Resolve the container image for a flavor on a host architecture.
///
/// Combinations with no native image substitute `mysql:8.0`; the caller
/// is expected to log a warning when `substituted` is set.
pub fn resolve_image(flavor: &Flavor, arch: &str) -> ResolvedImage {
    match flavor.vendor {
        Vendor::Mariadb => ResolvedImage::native(format!("mariadb:{}", tag(flavor))),
        Vendor::Aurora => resolve_aurora(flavor, arch),
        Vendor::Percona => resolve_percona(flavor, arch),
        Vendor::Mysql => resolve_mysql(flavor, arch),
    }
}

/// Aurora has no image of its own; it falls through to the MySQL image
/// for the corresponding version, with the usual architecture rules.
fn resolve_aurora(flavor: &Flavor, arch: &str) -> ResolvedImage {
    let mapped = Flavor {
        vendor: Vendor::Mysql,
        ..*flavor
    };
    let mut resolved = resolve_mysql(&mapped, arch);
    if resolved.substituted {
        // Report the substitution against the original request.
        resolved = ResolvedImage::substitute(flavor);
    }
    resolved
}

fn resolve_percona(flavor: &Flavor, arch: &str) -> ResolvedImage {
    if flavor.major == 5 {
        return if arch == "amd64" {
            ResolvedImage::native(format!("percona:{}", tag(flavor)))
        } else {
            ResolvedImage::substitute(flavor)
        };
    }

    let base = format!("percona/percona-server:{}", tag(flavor));
    if arch != "arm64" {
        return ResolvedImage::native(base);
    }

    // A missing patch number means the latest of that series, which is
    // past the aarch64-suffix era on every branch.
    match (flavor.major, flavor.minor, flavor.patch) {
        // 8.0.0-8.0.32 were never published for arm64
        (8, 0, Some(0..=32)) => ResolvedImage::substitute(flavor),
        (8, 0, Some(33..=40)) => ResolvedImage::native(format!("{base}-aarch64")),
        (8, 1..=3, _) => ResolvedImage::native(format!("{base}.0-aarch64")),
        (8, 4, Some(1..=3)) => ResolvedImage::native(format!("{base}-aarch64")),
        _ => ResolvedImage::native(base),
    }
}

fn resolve_mysql(flavor: &Flavor, arch: &str) -> ResolvedImage {
    if arch != "arm64" {
        return ResolvedImage::native(format!("mysql:{}", tag(flavor)));
    }

    match (flavor.major, flavor.minor, flavor.patch) {
        // Anything below 8.0.12 never shipped for arm64
        (..=7, _, _) | (8, 0, Some(0..=11)) => ResolvedImage::substitute(flavor),
        (8, 0, Some(12..=28)) => {
            ResolvedImage::native(format!("mysql/mysql-server:{}", tag(flavor)))
        }
        _ => ResolvedImage::native(format!("mysql:{}", tag(flavor))),
    }
}

#[cfg(test)]
mod tests;
