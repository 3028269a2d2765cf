use std::fmt;

/// The dialect a file is written in. The grammar is the same for all of
/// them; callers use the type to pick formatting and analysis rules.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    Build,
    Bzl,
    Workspace,
    Module,
    #[default]
    Default,
}

impl FileType {
    /// Guesses the dialect from a file name such as `BUILD.bazel` or `defs.bzl`.
    pub fn from_filename(name: &str) -> Self {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name).to_lowercase();
        let base = base.strip_suffix(".oss").unwrap_or(&base);

        if base == "module.bazel" {
            return FileType::Module;
        }

        let ext = base.rfind('.').map_or("", |i| &base[i..]);
        match ext {
            ".bzl" => return FileType::Bzl,
            ".sky" => return FileType::Default,
            _ => {}
        }

        if ext == ".build" || base == "build" || base.starts_with("build.") {
            FileType::Build
        } else if ext == ".workspace" || base == "workspace" || base.starts_with("workspace.") {
            FileType::Workspace
        } else {
            FileType::Default
        }
    }

    /// Whether files of this type list targets rather than define logic.
    pub fn is_build_like(self) -> bool {
        matches!(self, FileType::Build | FileType::Workspace | FileType::Module)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Build => "BUILD",
            FileType::Bzl => ".bzl",
            FileType::Workspace => "WORKSPACE",
            FileType::Module => "MODULE.bazel",
            FileType::Default => "default",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename() {
        let cases = [
            ("BUILD", FileType::Build),
            ("build", FileType::Build),
            ("bUIld", FileType::Build),
            ("BUILD.bazel", FileType::Build),
            ("BUILD.oss", FileType::Build),
            ("build.bzl", FileType::Bzl),
            ("build.sky", FileType::Default),
            ("WORKSPACE", FileType::Workspace),
            ("external.BUILD", FileType::Build),
            ("BUILD.external", FileType::Build),
            ("aBUILD", FileType::Default),
            ("thing.sky", FileType::Default),
            ("my.WORKSPACE", FileType::Workspace),
            ("thing.bzl", FileType::Bzl),
            ("workspace.bazel", FileType::Workspace),
            ("workspace.bzl", FileType::Bzl),
            ("MODULE.bazel", FileType::Module),
            ("foo/bar/BUILD", FileType::Build),
            ("foo.bar", FileType::Default),
        ];
        for (name, expected) in cases {
            assert_eq!(FileType::from_filename(name), expected, "{}", name);
        }
    }

    #[test]
    fn test_build_like() {
        assert!(FileType::Build.is_build_like());
        assert!(FileType::Module.is_build_like());
        assert!(!FileType::Bzl.is_build_like());
        assert!(!FileType::Default.is_build_like());
    }
}
