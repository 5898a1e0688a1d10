//! CSV file data adapter: one `<SYMBOL>.csv` per symbol in a directory.

use crate::domain::error::NetreturnError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, NetreturnError> {
        let path = self.csv_path(symbol);
        if !path.is_file() {
            return Err(NetreturnError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let source_name = path.display().to_string();
        let format_err = |reason: String| NetreturnError::DataFormat {
            source_name: source_name.clone(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| format_err(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let row = result.map_err(|e| format_err(format!("row {}: {e}", line + 2)))?;

            if start_date.is_some_and(|s| row.date < s) || end_date.is_some_and(|e| row.date > e) {
                continue;
            }

            let bar = OhlcvBar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            };
            bar.check()
                .map_err(|reason| format_err(format!("{}: {reason}", row.date)))?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(format_err(format!("duplicate date {}", pair[0].date)));
        }

        debug!("Loaded {} bars for {symbol} from {source_name}", bars.len());
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, NetreturnError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| NetreturnError::Io {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv")
                && let Some(stem) = path.file_stem()
            {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(path.join("MSFT.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn fetch_ohlcv_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_ohlcv("AAPL", None, None).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(15));
        assert_eq!(bars[0].symbol, "AAPL");
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[2].date, date(17));
    }

    #[test]
    fn fetch_ohlcv_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter
            .fetch_ohlcv("AAPL", Some(date(16)), Some(date(16)))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(16));

        let bars = adapter.fetch_ohlcv("AAPL", Some(date(16)), None).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn fetch_ohlcv_missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_ohlcv("XYZ", None, None).unwrap_err();
        assert!(matches!(err, NetreturnError::NoData { ref symbol } if symbol == "XYZ"));
    }

    #[test]
    fn fetch_ohlcv_rejects_duplicate_dates() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("DUP.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-15,1,1,1,1,0\n\
             2024-01-15,2,2,2,2,0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_ohlcv("DUP", None, None).unwrap_err();
        assert!(matches!(
            err,
            NetreturnError::DataFormat { ref reason, .. } if reason.contains("duplicate")
        ));
    }

    #[test]
    fn fetch_ohlcv_rejects_bad_values() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,1,1,-5,0\n",
        )
        .unwrap();
        fs::write(
            path.join("TXT.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,1,1,abc,0\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        assert!(matches!(
            adapter.fetch_ohlcv("BAD", None, None),
            Err(NetreturnError::DataFormat { .. })
        ));
        assert!(matches!(
            adapter.fetch_ohlcv("TXT", None, None),
            Err(NetreturnError::DataFormat { .. })
        ));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn list_symbols_missing_dir_is_io_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/netreturn/data"));
        assert!(matches!(
            adapter.list_symbols(),
            Err(NetreturnError::Io { .. })
        ));
    }
}
