//! Comma-separated tokenization shared by header and record parsing.

use csv::{ReaderBuilder, StringRecord};

/// Split one line into fields using CSV rules
///
/// Quoted fields (e.g. the bracketed CSI payload) stay intact so column
/// positions match the header. An empty line yields an empty record.
pub fn tokenize(line: &str) -> Result<StringRecord, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record)
    } else {
        Ok(StringRecord::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        let record = tokenize("type,id,esp_epoch_us").unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(&record[2], "esp_epoch_us");
    }

    #[test]
    fn test_quoted_payload_stays_one_field() {
        let record = tokenize("CSI_DATA,1,1700000000000000,\"[1,2,3,4]\"").unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(&record[3], "[1,2,3,4]");
    }

    #[test]
    fn test_empty_line() {
        let record = tokenize("").unwrap();
        assert!(record.is_empty());
    }
}
