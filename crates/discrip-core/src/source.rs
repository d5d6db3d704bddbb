//! Input selectors understood by `makemkvcon`.

use std::fmt;
use std::path::PathBuf;

/// Where the ripping tool reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A physical drive node, e.g. `/dev/sr0`.
    Device(PathBuf),
    /// A disc image file.
    Image(PathBuf),
    /// A file or folder holding a disc structure.
    File(PathBuf),
    /// A drive by the tool's own index.
    Disc(u32),
}

impl Source {
    /// The argument passed to the tool, e.g. `dev:/dev/sr0`.
    pub fn selector(&self) -> String {
        match self {
            Self::Device(path) => format!("dev:{}", path.display()),
            Self::Image(path) => format!("iso:{}", path.display()),
            Self::File(path) => format!("file:{}", path.display()),
            Self::Disc(index) => format!("disc:{index}"),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector())
    }
}
