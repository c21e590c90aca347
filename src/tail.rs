use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Granularity of the backward scan.
const BLOCK_SIZE: u64 = 1024;

/// Returns up to the last `max_lines` lines of `path`, oldest first.
///
/// The file is read backward in fixed-size blocks, stopping as soon as the
/// buffer holds more newlines than lines requested, so the cost is bounded
/// by the tail size rather than the file size. Any failure to open or read
/// the file collapses to an empty result; callers treat "no file" and "no
/// lines" the same way.
pub fn tail_lines(path: &Path, max_lines: usize) -> Vec<String> {
    scan_backward(path, max_lines).unwrap_or_default()
}

fn scan_backward(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let mut offset = file.metadata()?.len();
    let mut data: Vec<u8> = Vec::new();
    let mut newlines = 0usize;

    while offset > 0 && newlines <= max_lines {
        let step = BLOCK_SIZE.min(offset);
        offset -= step;
        file.seek(SeekFrom::Start(offset))?;
        let mut block = vec![0u8; step as usize];
        file.read_exact(&mut block)?;
        newlines += block.iter().filter(|&&b| b == b'\n').count();
        block.extend_from_slice(&data);
        data = block;
    }

    let text = String::from_utf8_lossy(&data);
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();
    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn numbered_lines(dir: &tempfile::TempDir, name: &str, count: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut text = String::new();
        for i in 0..count {
            text.push_str(&format!("line {i}\n"));
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn returns_last_lines_of_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = numbered_lines(&dir, "big.log", 1000);
        let lines = tail_lines(&path, 50);
        assert_eq!(lines.len(), 50);
        assert_eq!(lines.first().map(String::as_str), Some("line 950"));
        assert_eq!(lines.last().map(String::as_str), Some("line 999"));
    }

    #[test]
    fn short_file_returns_everything_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = numbered_lines(&dir, "short.log", 10);
        let lines = tail_lines(&path, 50);
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[9], "line 9");
    }

    #[test]
    fn missing_file_is_empty() {
        let lines = tail_lines(Path::new("/nonexistent/dir/app.log"), 10);
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.log");
        fs::write(&path, "").unwrap();
        assert!(tail_lines(&path, 10).is_empty());
    }

    #[test]
    fn counts_a_final_line_without_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open.log");
        fs::write(&path, "a\nb\nc").unwrap();
        assert_eq!(tail_lines(&path, 2), vec!["b", "c"]);
    }

    #[test]
    fn file_smaller_than_one_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.log");
        fs::write(&path, "one\ntwo\n").unwrap();
        assert_eq!(tail_lines(&path, 1), vec!["two"]);
    }

    #[test]
    fn file_sized_exactly_on_block_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aligned.log");
        let line = "x".repeat((BLOCK_SIZE - 1) as usize);
        fs::write(&path, format!("{line}\n{line}\n")).unwrap();
        let lines = tail_lines(&path, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], line);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.log");
        fs::write(&path, [0xff, 0xfe, b'\n', b'o', b'k', b'\n']).unwrap();
        assert_eq!(tail_lines(&path, 1), vec!["ok"]);
    }

    #[test]
    fn zero_lines_requested_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = numbered_lines(&dir, "some.log", 5);
        assert!(tail_lines(&path, 0).is_empty());
    }

    #[test]
    fn repeated_reads_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = numbered_lines(&dir, "stable.log", 200);
        assert_eq!(tail_lines(&path, 30), tail_lines(&path, 30));
    }
}
