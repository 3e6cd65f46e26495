// ─── Platform ───
// Host OS/architecture as the rest of the engine sees it: Mojang rule names,
// runtime catalog keys, natives classifiers and the classpath separator.

use std::fmt;

/// Host platform. Detected once and passed around by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows64,
    Windows86,
    WindowsArm64,
    Osx,
    OsxArm64,
    Linux,
    LinuxArm,
    LinuxOther,
    Unsupported,
}

impl Platform {
    pub fn detect() -> Self {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map `std::env::consts` style OS/arch strings to a platform.
    pub fn from_parts(os: &str, arch: &str) -> Self {
        match (os, arch) {
            ("windows", "x86_64") => Platform::Windows64,
            ("windows", "x86") => Platform::Windows86,
            ("windows", "aarch64") => Platform::WindowsArm64,
            ("macos", "aarch64") => Platform::OsxArm64,
            ("macos", _) => Platform::Osx,
            ("linux", "x86_64") => Platform::Linux,
            ("linux", "aarch64") | ("linux", "arm") => Platform::LinuxArm,
            ("linux", _) => Platform::LinuxOther,
            _ => Platform::Unsupported,
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(
            self,
            Platform::Windows64 | Platform::Windows86 | Platform::WindowsArm64
        )
    }

    pub fn is_mac(self) -> bool {
        matches!(self, Platform::Osx | Platform::OsxArm64)
    }

    /// OS name as used by `rules[].os.name` in version manifests.
    pub fn os_name(self) -> &'static str {
        if self.is_windows() {
            "windows"
        } else if self.is_mac() {
            "osx"
        } else {
            "linux"
        }
    }

    /// Architecture as used by `rules[].os.arch`.
    pub fn arch_name(self) -> &'static str {
        match self {
            Platform::Windows86 => "x86",
            Platform::WindowsArm64 | Platform::OsxArm64 | Platform::LinuxArm => "arm64",
            _ => "x86_64",
        }
    }

    /// Key of the Java runtime catalog. `None` when Mojang ships no runtime.
    pub fn runtime_catalog_key(self) -> Option<&'static str> {
        match self {
            Platform::Windows64 => Some("windows-x64"),
            Platform::Windows86 => Some("windows-x86"),
            Platform::WindowsArm64 => Some("windows-arm64"),
            Platform::Osx => Some("mac-os"),
            Platform::OsxArm64 => Some("mac-os-arm64"),
            Platform::Linux => Some("linux"),
            Platform::LinuxArm | Platform::LinuxOther | Platform::Unsupported => None,
        }
    }

    pub fn classpath_separator(self) -> &'static str {
        if self.is_windows() {
            ";"
        } else {
            ":"
        }
    }

    /// Whether runtime files flagged `executable` need a permission bit set.
    pub fn needs_exec_bit(self) -> bool {
        !self.is_windows()
    }

    /// Name of the environment variable the dynamic loader searches.
    pub fn library_path_var(self) -> Option<&'static str> {
        if self.is_windows() {
            Some("PATH")
        } else if self.is_mac() {
            Some("DYLD_LIBRARY_PATH")
        } else if self == Platform::Unsupported {
            None
        } else {
            Some("LD_LIBRARY_PATH")
        }
    }

    /// Whether a natives classifier (`natives-windows-x86`, `natives-macos-arm64`,
    /// `natives-linux` ...) targets this platform.
    pub fn matches_natives_classifier(self, classifier: &str) -> bool {
        let Some(rest) = classifier.strip_prefix("natives-") else {
            return false;
        };
        let (os, arch) = match rest.split_once('-') {
            Some((os, arch)) => (os, Some(arch)),
            None => (rest, None),
        };

        match os {
            "windows" => match arch {
                None | Some("64") => self == Platform::Windows64,
                Some("x86") | Some("32") => self == Platform::Windows86,
                Some("arm64") => self == Platform::WindowsArm64,
                Some(_) => false,
            },
            // Legacy jars carry one `natives-osx` build for every Mac.
            "osx" => match arch {
                None => self.is_mac(),
                Some("arm64") => self == Platform::OsxArm64,
                Some(_) => false,
            },
            "macos" => match arch {
                None => self == Platform::Osx,
                Some("arm64") => self == Platform::OsxArm64,
                Some(_) => false,
            },
            "linux" => match arch {
                None => self == Platform::Linux,
                Some("aarch_64") | Some("arm64") | Some("arm32") => self == Platform::LinuxArm,
                Some(_) => false,
            },
            _ => false,
        }
    }

    /// Replace `${arch}` in legacy `natives` classifier templates.
    pub fn legacy_arch_bits(self) -> &'static str {
        match self {
            Platform::Windows86 => "32",
            _ => "64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows64 => "windows-x64",
            Platform::Windows86 => "windows-x86",
            Platform::WindowsArm64 => "windows-arm64",
            Platform::Osx => "osx",
            Platform::OsxArm64 => "osx-arm64",
            Platform::Linux => "linux",
            Platform::LinuxArm => "linux-arm",
            Platform::LinuxOther => "linux-other",
            Platform::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_from_consts() {
        assert_eq!(Platform::from_parts("windows", "x86_64"), Platform::Windows64);
        assert_eq!(Platform::from_parts("macos", "aarch64"), Platform::OsxArm64);
        assert_eq!(Platform::from_parts("linux", "riscv64"), Platform::LinuxOther);
        assert_eq!(Platform::from_parts("freebsd", "x86_64"), Platform::Unsupported);
    }

    #[test]
    fn separator_follows_os() {
        assert_eq!(Platform::Windows86.classpath_separator(), ";");
        assert_eq!(Platform::Linux.classpath_separator(), ":");
        assert_eq!(Platform::OsxArm64.classpath_separator(), ":");
    }

    #[test]
    fn catalog_keys() {
        assert_eq!(Platform::Osx.runtime_catalog_key(), Some("mac-os"));
        assert_eq!(Platform::WindowsArm64.runtime_catalog_key(), Some("windows-arm64"));
        assert_eq!(Platform::LinuxArm.runtime_catalog_key(), None);
    }

    #[test]
    fn natives_classifiers() {
        assert!(Platform::Linux.matches_natives_classifier("natives-linux"));
        assert!(!Platform::LinuxArm.matches_natives_classifier("natives-linux"));
        assert!(Platform::Windows86.matches_natives_classifier("natives-windows-x86"));
        assert!(Platform::Windows64.matches_natives_classifier("natives-windows"));
        assert!(!Platform::Windows64.matches_natives_classifier("natives-windows-arm64"));
        assert!(Platform::OsxArm64.matches_natives_classifier("natives-macos-arm64"));
        assert!(Platform::Osx.matches_natives_classifier("natives-osx"));
        assert!(!Platform::Linux.matches_natives_classifier("lwjgl-3.3.1"));
    }

    #[test]
    fn legacy_osx_natives_apply_to_apple_silicon() {
        assert!(Platform::OsxArm64.matches_natives_classifier("natives-osx"));
        assert!(!Platform::OsxArm64.matches_natives_classifier("natives-macos"));
        assert!(!Platform::Linux.matches_natives_classifier("natives-osx"));
    }
}
