use std::path::{Path, PathBuf};

pub fn path_append(path: impl AsRef<Path>, append: &str) -> PathBuf {
    let mut os = path.as_ref().to_path_buf().into_os_string();
    os.push(append);

    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_append() {
        assert_eq!(
            PathBuf::from("/var/lib/drain/n1.yml.tmp"),
            path_append("/var/lib/drain/n1.yml", ".tmp")
        );
    }
}
