//! 試算表輸出

use std::path::{Path, PathBuf};

use mrp_core::{MrpError, Result};

use crate::workbook::{Sheet, Workbook};

/// 試算表輸出介面
pub trait WorkbookWriter {
    /// 輸出試算表，回傳產生的檔案
    fn write(&self, workbook: &Workbook) -> Result<Vec<PathBuf>>;
}

/// 每張工作表輸出一個 CSV 檔
pub struct CsvWorkbookWriter {
    dir: PathBuf,
}

impl CsvWorkbookWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sheet_path(&self, workbook: &Workbook, sheet: &Sheet) -> PathBuf {
        let mut slug = String::with_capacity(sheet.name.len());
        for ch in sheet.name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch);
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_matches('_');
        self.dir.join(format!("{}_{}.csv", workbook.file_stem, slug))
    }

    fn write_sheet(&self, path: &Path, sheet: &Sheet) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| MrpError::Export(format!("{}: {}", path.display(), e)))?;

        for row in &sheet.rows {
            let record: Vec<String> = if row.is_empty() {
                vec![String::new()]
            } else {
                row.iter().map(ToString::to_string).collect()
            };
            writer
                .write_record(&record)
                .map_err(|e| MrpError::Export(format!("{}: {}", path.display(), e)))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl WorkbookWriter for CsvWorkbookWriter {
    fn write(&self, workbook: &Workbook) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.dir)?;

        let mut paths = Vec::with_capacity(workbook.sheets.len());
        for sheet in &workbook.sheets {
            let path = self.sheet_path(workbook, sheet);
            self.write_sheet(&path, sheet)?;
            tracing::debug!("輸出工作表 {} → {}", sheet.name, path.display());
            paths.push(path);
        }

        tracing::info!("試算表 {} 輸出 {} 個檔案", workbook.file_stem, paths.len());
        Ok(paths)
    }
}
