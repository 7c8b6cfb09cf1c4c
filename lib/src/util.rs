use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append `suffix` to the file name of `path` (`a/b.txt` -> `a/b.txt<suffix>`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Replace the extension of `path`, adding `tag` to the stem (`a/b.csv` -> `a/b_<tag>.csv`).
pub fn tagged(path: &Path, tag: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, tag, ext.to_string_lossy()),
        None => format!("{}_{}", stem, tag),
    };
    path.with_file_name(name)
}

pub fn header(header: &str) {
    let len = header.len();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}

#[test]
fn test_paths() {
    assert_eq!(
        with_suffix(Path::new("out/a.txt"), ".dropped.tsv"),
        Path::new("out/a.txt.dropped.tsv")
    );
    assert_eq!(
        tagged(Path::new("in/DAR.breast_filtered_header.csv"), "classification"),
        Path::new("in/DAR.breast_filtered_header_classification.csv")
    );
    assert_eq!(tagged(Path::new("x"), "y"), Path::new("x_y"));
}
