use crate::core::product_transformer::{IMAGES_COLUMN, PRICES_COLUMN, SKU_COLUMN};
use crate::domain::model::Row;
use crate::utils::error::{ImportError, Result};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 讀取商品 CSV：表頭只讀一次，之後逐列產生 Row
pub struct CsvRowSource {
    path: PathBuf,
    delimiter: u8,
    schema_column: String,
}

impl CsvRowSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8, schema_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delimiter,
            schema_column: schema_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 開檔並驗證表頭；表頭無法讀取或缺少必要欄位時回傳 `MalformedSource`
    pub fn open(&self) -> Result<CsvRows> {
        let file = File::open(&self.path).map_err(|e| self.malformed(format!("cannot open file: {}", e)))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(file);

        let headers: Arc<[String]> = reader
            .headers()
            .map_err(|e| self.malformed(format!("unreadable header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(self.malformed("header row is empty".to_string()));
        }

        let required = [SKU_COLUMN, PRICES_COLUMN, IMAGES_COLUMN, self.schema_column.as_str()];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == column))
            .collect();
        if !missing.is_empty() {
            return Err(self.malformed(format!("missing required columns: {}", missing.join(", "))));
        }

        tracing::debug!("📄 Opened {} with {} columns", self.path.display(), headers.len());

        Ok(CsvRows {
            headers,
            records: reader.into_records(),
        })
    }

    fn malformed(&self, message: String) -> ImportError {
        ImportError::MalformedSource {
            path: self.path.display().to_string(),
            message,
        }
    }
}

/// 逐列迭代；完全空白的列略過
pub struct CsvRows {
    headers: Arc<[String]>,
    records: StringRecordsIntoIter<File>,
}

impl CsvRows {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for CsvRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(ImportError::CsvError(e))),
            };

            if record.iter().all(|value| value.trim().is_empty()) {
                continue;
            }

            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or_default();
            let mut values: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();
            if values.len() > self.headers.len() {
                let dropped: Vec<&str> = values[self.headers.len()..]
                    .iter()
                    .map(String::as_str)
                    .filter(|v| !v.is_empty())
                    .collect();
                if !dropped.is_empty() {
                    tracing::warn!(
                        "⚠️ Line {}: {} cells beyond the header were ignored: {:?}",
                        line,
                        dropped.len(),
                        dropped
                    );
                }
            }
            values.resize(self.headers.len(), String::new());

            return Some(Ok(Row::new(line, Arc::clone(&self.headers), values)));
        }
    }
}
