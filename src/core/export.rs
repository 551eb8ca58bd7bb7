// src/core/export.rs

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::core::errors::ExportError;
use crate::core::fetcher::CollectionKind;

#[derive(Serialize)]
struct ExportDocument<'a, R: Serialize> {
    scan_id: &'a str,
    collection: CollectionKind,
    exported_at: DateTime<Utc>,
    count: usize,
    rows: &'a [&'a R],
}

/// Writes a filtered/sorted view as pretty JSON to `<dir>/<scan_id>-<kind>.json`,
/// replacing any previous export of the same scan and collection.
pub fn export_view<R: Serialize>(
    rows: &[&R],
    kind: CollectionKind,
    scan_id: &str,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let path = dir.join(format!("{}-{}.json", file_safe(scan_id), kind));
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    let document = ExportDocument {
        scan_id,
        collection: kind,
        exported_at: Utc::now(),
        count: rows.len(),
        rows,
    };

    let file = File::create(&path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush().map_err(io_err)?;

    info!(path = %path.display(), rows = rows.len(), %kind, "View exported.");
    Ok(path)
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RecordType;
    use crate::core::testing::dns;
    use crate::core::view::{build_view, FilterTerm};

    #[test]
    fn exports_only_the_visible_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            dns("api.example.com", RecordType::A, "10.0.0.1"),
            dns("www.example.com", RecordType::Cname, "edge.example.net"),
        ];
        let view = build_view(&rows, &[FilterTerm::new("api", false)], None);

        let path = export_view(&view, CollectionKind::DnsRecords, "scan/1", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "scan_1-dns-records.json");

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["collection"], "dns-records");
        assert_eq!(written["count"], 1);
        assert_eq!(written["rows"][0]["domain"], "api.example.com");
        assert_eq!(written["rows"][0]["record_type"], "A");
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let rows: Vec<&crate::core::models::DnsRecord> = Vec::new();
        let path = export_view(&rows, CollectionKind::RawResults, "s", &nested).unwrap();
        assert!(path.exists());
    }
}
