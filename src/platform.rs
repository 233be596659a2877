//! Host OS detection and install instructions for missing tools.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, OnceLock};

/// Name used when suggesting the tool itself as an installer.
pub const TOOL_NAME: &str = "buildrt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    FreeBsd,
    MacOs,
    Other,
}

impl OsKind {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "freebsd") {
            Self::FreeBsd
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

/// Operating system plus the contents of `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub kind: OsKind,
    pub os_release: BTreeMap<String, String>,
}

/// Parse `KEY=value` lines, skipping blanks and comments and stripping quotes.
pub fn parse_os_release(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.trim_matches('"').to_owned()))
        .collect()
}

static DETECTED: OnceLock<OsInfo> = OnceLock::new();

impl OsInfo {
    pub fn new(kind: OsKind, os_release: BTreeMap<String, String>) -> Self {
        Self { kind, os_release }
    }

    /// Host information, read once per process.
    pub fn detect() -> &'static OsInfo {
        DETECTED.get_or_init(|| {
            let os_release = Self::read_os_release(Path::new("/etc/os-release"));
            let info = Self::new(OsKind::current(), os_release);
            tracing::debug!(kind = ?info.kind, id = info.id(), "detected host OS");
            info
        })
    }

    /// Missing or unreadable files give an empty map.
    pub fn read_os_release(path: &Path) -> BTreeMap<String, String> {
        std::fs::read_to_string(path)
            .map(|text| parse_os_release(&text))
            .unwrap_or_default()
    }

    pub fn id(&self) -> &str {
        self.os_release.get("ID").map_or("", String::as_str)
    }

    fn id_like(&self) -> &str {
        self.os_release.get("ID_LIKE").map_or("", String::as_str)
    }

    pub fn is_linux(&self) -> bool {
        self.kind == OsKind::Linux
    }

    pub fn is_freebsd(&self) -> bool {
        self.kind == OsKind::FreeBsd
    }

    pub fn is_mac(&self) -> bool {
        self.kind == OsKind::MacOs
    }

    fn is_linux_distribution(&self, kind: &str) -> bool {
        self.is_linux() && (self.id().contains(kind) || self.id_like().contains(kind))
    }

    pub fn is_ubuntu(&self) -> bool {
        self.is_linux_distribution("ubuntu")
    }

    pub fn is_debian(&self) -> bool {
        self.is_linux_distribution("debian")
    }

    pub fn is_suse(&self) -> bool {
        self.is_linux_distribution("suse") || self.is_linux_distribution("opensuse")
    }

    pub fn is_cheribsd(&self) -> bool {
        self.is_freebsd() && self.id() == "cheribsd"
    }

    pub fn uses_apt(&self) -> bool {
        self.is_debian() || self.is_ubuntu()
    }

    pub fn uses_zypper(&self) -> bool {
        self.is_suse()
    }

    /// Command used to install system packages.
    pub fn package_manager(&self, compat_abi: bool) -> &'static str {
        match self.kind {
            OsKind::MacOs => "brew",
            OsKind::FreeBsd if self.is_cheribsd() => {
                if compat_abi {
                    "pkg64"
                } else {
                    "pkg64c"
                }
            }
            OsKind::FreeBsd => "pkg",
            OsKind::Linux if self.uses_zypper() => "zypper",
            OsKind::Linux if self.uses_apt() => "apt",
            _ => "<system package manager>",
        }
    }

    /// Build install instructions for `name`.
    ///
    /// Without a known package name for the host's package manager the name
    /// is guessed (`lib<name>-dev` / `lib<name>-devel` for libraries) and the
    /// hint says so.
    pub fn install_instructions(
        &self,
        name: &str,
        is_lib: bool,
        packages: &PackageNames,
    ) -> InstallInstructions {
        let manager = self.package_manager(packages.compat_abi);
        let mut guessed = false;

        let install_name = if self.is_mac() && packages.homebrew.is_some() {
            packages.homebrew.clone()
        } else if self.is_freebsd() && packages.freebsd.is_some() {
            packages.freebsd.clone()
        } else if self.uses_apt() {
            packages.apt.clone().or_else(|| {
                guessed = true;
                Some(if is_lib {
                    format!("lib{name}-dev")
                } else {
                    name.to_owned()
                })
            })
        } else if self.uses_zypper() {
            if packages.zypper.is_some() {
                packages.zypper.clone()
            } else if !is_lib && which::which("command-not-found").is_ok() {
                let program = name.to_owned();
                return InstallInstructions::lazy(move || command_not_found_hint(&program))
                    .target_opt(packages.target.clone())
                    .alternative_opt(packages.alternative.clone());
            } else {
                guessed = true;
                Some(if is_lib {
                    format!("lib{name}-devel")
                } else {
                    name.to_owned()
                })
            }
        } else {
            guessed = true;
            Some(name.to_owned())
        };
        let mut install_name = install_name.unwrap_or_else(|| name.to_owned());

        if guessed && let Some(default) = &packages.default {
            guessed = false;
            install_name = default.clone();
        }

        let message = if guessed {
            format!(
                "Possibly running `{manager} install {install_name}` fixes this. \
                 Note: package name may not be correct."
            )
        } else {
            format!("Run `{manager} install {install_name}`")
        };
        InstallInstructions::new(message)
            .target_opt(packages.target.clone())
            .alternative_opt(packages.alternative.clone())
    }
}

fn command_not_found_hint(program: &str) -> String {
    let output = which::which("command-not-found")
        .ok()
        .and_then(|bin| Command::new(bin).arg(program).output().ok());
    let hint = output
        .map(|o| {
            let mut text = String::from_utf8_lossy(&o.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&o.stderr));
            text.trim().to_owned()
        })
        .unwrap_or_default();

    if !hint.is_empty() && !hint.contains(&format!("{program}: command not found")) {
        return match hint.find("The program") {
            Some(start) => hint[start..].to_owned(),
            None => hint,
        };
    }
    format!("Could not find package for program {program}. Maybe `zypper in {program}` will work.")
}

/// Per-package-manager package names and extra suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageNames {
    /// Used instead of a guessed name
    pub default: Option<String>,
    pub homebrew: Option<String>,
    pub apt: Option<String>,
    pub zypper: Option<String>,
    pub freebsd: Option<String>,
    /// Target of this tool that can install the dependency locally
    pub target: Option<String>,
    pub alternative: Option<String>,
    pub compat_abi: bool,
}

impl PackageNames {
    /// The same package name everywhere.
    pub fn everywhere(name: &str) -> Self {
        Self {
            default: Some(name.to_owned()),
            homebrew: Some(name.to_owned()),
            apt: Some(name.to_owned()),
            zypper: Some(name.to_owned()),
            freebsd: Some(name.to_owned()),
            ..Self::default()
        }
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_owned());
        self
    }

    pub fn alternative(mut self, alternative: &str) -> Self {
        self.alternative = Some(alternative.to_owned());
        self
    }
}

#[derive(Clone)]
enum HintText {
    Fixed(String),
    Lazy(Arc<dyn Fn() -> String + Send + Sync>),
}

/// Fixit text explaining how to install something that is missing.
#[derive(Clone)]
pub struct InstallInstructions {
    message: HintText,
    pub target: Option<String>,
    pub alternative: Option<String>,
}

impl InstallInstructions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: HintText::Fixed(message.into()),
            target: None,
            alternative: None,
        }
    }

    /// Message computed only when the hint is shown.
    pub fn lazy(message: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            message: HintText::Lazy(Arc::new(message)),
            target: None,
            alternative: None,
        }
    }

    pub fn target(self, target: impl Into<String>) -> Self {
        self.target_opt(Some(target.into()))
    }

    fn target_opt(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn alternative(self, alternative: impl Into<String>) -> Self {
        self.alternative_opt(Some(alternative.into()))
    }

    fn alternative_opt(mut self, alternative: Option<String>) -> Self {
        self.alternative = alternative;
        self
    }

    /// The full hint text.
    pub fn fixit_hint(&self) -> String {
        let mut result = match &self.message {
            HintText::Fixed(text) => text.clone(),
            HintText::Lazy(f) => f(),
        };
        if let Some(target) = &self.target {
            if result.is_empty() {
                result.push_str("Run ");
            } else {
                result.push_str("\nYou can also try running ");
            }
            result.push_str(&format!("`{TOOL_NAME} {target}` to install locally."));
        }
        if let Some(alternative) = &self.alternative {
            debug_assert!(!result.is_empty(), "alternative without a primary suggestion");
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&format!("Alternatively {alternative}"));
        }
        result
    }

    /// Instructions for installing CMake on the current host.
    pub fn cmake() -> Self {
        let packages = PackageNames::everywhere("cmake").target("cmake");
        OsInfo::detect().install_instructions("cmake", false, &packages)
    }
}

impl fmt::Debug for InstallInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.message {
            HintText::Fixed(text) => text.as_str(),
            HintText::Lazy(_) => "<lazy>",
        };
        f.debug_struct("InstallInstructions")
            .field("message", &message)
            .field("target", &self.target)
            .field("alternative", &self.alternative)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux(os_release: &str) -> OsInfo {
        OsInfo::new(OsKind::Linux, parse_os_release(os_release))
    }

    #[test]
    fn test_parse_os_release() {
        let map = parse_os_release(
            "# comment\nNAME=\"Ubuntu\"\n\nID=ubuntu\nID_LIKE=debian\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n",
        );
        assert_eq!(map.get("NAME").map(String::as_str), Some("Ubuntu"));
        assert_eq!(map.get("ID").map(String::as_str), Some("ubuntu"));
        assert_eq!(map.get("PRETTY_NAME").map(String::as_str), Some("Ubuntu 24.04 LTS"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_missing_os_release_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(OsInfo::read_os_release(&dir.path().join("os-release")).is_empty());
    }

    #[test]
    fn test_distribution_detection() {
        let ubuntu = linux("ID=ubuntu\nID_LIKE=debian\n");
        assert!(ubuntu.is_ubuntu());
        assert!(ubuntu.is_debian());
        assert!(ubuntu.uses_apt());
        assert!(!ubuntu.uses_zypper());
        assert_eq!(ubuntu.package_manager(false), "apt");

        let suse = linux("ID=\"opensuse-tumbleweed\"\nID_LIKE=\"opensuse suse\"\n");
        assert!(suse.is_suse());
        assert_eq!(suse.package_manager(false), "zypper");

        let arch = linux("ID=arch\n");
        assert_eq!(arch.package_manager(false), "<system package manager>");
    }

    #[test]
    fn test_linux_ids_ignored_on_other_os() {
        let mac = OsInfo::new(OsKind::MacOs, parse_os_release("ID=ubuntu\n"));
        assert!(!mac.is_ubuntu());
        assert_eq!(mac.package_manager(false), "brew");
    }

    #[test]
    fn test_cheribsd_package_manager() {
        let cheribsd = OsInfo::new(OsKind::FreeBsd, parse_os_release("ID=cheribsd\n"));
        assert!(cheribsd.is_cheribsd());
        assert_eq!(cheribsd.package_manager(false), "pkg64c");
        assert_eq!(cheribsd.package_manager(true), "pkg64");

        let freebsd = OsInfo::new(OsKind::FreeBsd, parse_os_release("ID=freebsd\n"));
        assert_eq!(freebsd.package_manager(false), "pkg");
    }

    #[test]
    fn test_apt_guesses_library_name() {
        let debian = linux("ID=debian\n");
        let hint = debian
            .install_instructions("glib", true, &PackageNames::default())
            .fixit_hint();
        assert_eq!(
            hint,
            "Possibly running `apt install libglib-dev` fixes this. Note: package name may not be correct."
        );
    }

    #[test]
    fn test_default_replaces_guess() {
        let debian = linux("ID=debian\n");
        let packages = PackageNames {
            default: Some("ninja-build".to_owned()),
            ..Default::default()
        };
        let hint = debian.install_instructions("ninja", false, &packages).fixit_hint();
        assert_eq!(hint, "Run `apt install ninja-build`");
    }

    #[test]
    fn test_homebrew_name_used_on_mac() {
        let mac = OsInfo::new(OsKind::MacOs, BTreeMap::new());
        let packages = PackageNames {
            homebrew: Some("gnu-sed".to_owned()),
            ..Default::default()
        };
        let hint = mac.install_instructions("sed", false, &packages).fixit_hint();
        assert_eq!(hint, "Run `brew install gnu-sed`");
    }

    #[test]
    fn test_hint_with_target_and_alternative() {
        let hint = InstallInstructions::new("Run `apt install cmake`")
            .target("cmake")
            .alternative("download a release from cmake.org")
            .fixit_hint();
        assert_eq!(
            hint,
            "Run `apt install cmake`\n\
             You can also try running `buildrt cmake` to install locally.\n\
             Alternatively download a release from cmake.org"
        );
    }

    #[test]
    fn test_hint_target_only() {
        let hint = InstallInstructions::new("").target("qemu").fixit_hint();
        assert_eq!(hint, "Run `buildrt qemu` to install locally.");
    }

    #[test]
    fn test_lazy_message_evaluated_on_demand() {
        let hint = InstallInstructions::lazy(|| "computed".to_owned());
        assert_eq!(hint.fixit_hint(), "computed");
        assert!(format!("{hint:?}").contains("<lazy>"));
    }
}
