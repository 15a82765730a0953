use std::error::Error;

use crate::record::{Checklist, Record};

/// Serialize a filtered record set to CSV bytes for download
///
/// One header row, one line per record in the order given. Dates are ISO,
/// null cells are empty, checklist booleans are TRUE/FALSE. This is the only
/// export surface; nothing else is persisted.
pub fn to_csv(records: &[Record]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        "licenseNumber",
        "storeName",
        "repName",
        "status",
        "clientSentiment",
        "onboardingDate",
        "deliveryDate",
        "score",
    ];
    header.extend(Checklist::LABELS);
    header.push("summary");
    header.push("fullTranscript");
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = vec![
            record.license_number.clone(),
            record.store_name.clone(),
            record.rep_name.clone(),
            record
                .status
                .as_ref()
                .map(|s| s.label().to_string())
                .unwrap_or_default(),
            record
                .sentiment
                .as_ref()
                .map(|s| s.label().to_string())
                .unwrap_or_default(),
            record
                .onboarding_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            record
                .delivery_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            record.score.map(|s| s.to_string()).unwrap_or_default(),
        ];
        for field in record.checklist.fields() {
            row.push(match field {
                Some(true) => "TRUE".to_string(),
                Some(false) => "FALSE".to_string(),
                None => String::new(),
            });
        }
        row.push(record.summary.clone());
        row.push(record.transcript.clone());
        writer.write_record(&row)?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Sentiment, Status};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_record() -> Record {
        let mut checklist = Checklist::default();
        checklist.kit_received = Some(true);
        checklist.expectations_set = Some(false);
        Record {
            license_number: "C-100".to_string(),
            store_name: "Harbor, North".to_string(),
            rep_name: "Jordan".to_string(),
            status: Some(Status::Confirmed),
            sentiment: Some(Sentiment::Positive),
            onboarding_date: Some(d(2024, 6, 1)),
            delivery_date: None,
            score: Some(8.5),
            checklist,
            summary: "Smooth call".to_string(),
            transcript: "Rep: hello. Client: hi.".to_string(),
        }
    }

    #[test]
    fn header_covers_all_columns() {
        let bytes = to_csv(&[]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), 8 + Checklist::LABELS.len() + 2);
        assert_eq!(&header[0], "licenseNumber");
        assert_eq!(&header[header.len() - 2], "summary");
        assert_eq!(&header[header.len() - 1], "fullTranscript");
    }

    #[test]
    fn rows_round_trip_through_a_csv_reader() {
        let bytes = to_csv(&[sample_record()]).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(&row[0], "C-100");
        // Embedded comma survives quoting.
        assert_eq!(&row[1], "Harbor, North");
        assert_eq!(&row[3], "Confirmed");
        assert_eq!(&row[5], "2024-06-01");
        // Null delivery date stays an empty cell, not a zero.
        assert_eq!(&row[6], "");
        assert_eq!(&row[9], "TRUE");
        assert_eq!(&row[13], "FALSE");
        assert_eq!(&row[14], "Smooth call");
        assert_eq!(&row[15], "Rep: hello. Client: hi.");
    }
}
