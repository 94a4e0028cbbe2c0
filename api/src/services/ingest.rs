//! Boat log ingestion.
//!
//! Each log is a CSV file for one boat with a header row of channel names.
//! Rows are tagged with the boat identity derived from the file name, the
//! tack is derived from the apparent wind angle, and every boat's rows are
//! stably sorted by timestamp. Any bad file aborts the whole load.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::helpers::parse_timestamp;
use crate::models::{BoatTrack, ChannelValue, Dataset, Position, Sample, Tack};

/// Errors that can occur while ingesting boat logs.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error reading log '{source_name}': {error}")]
    Io {
        source_name: String,
        error: std::io::Error,
    },
    #[error("CSV error in '{source_name}': {error}")]
    Csv {
        source_name: String,
        error: csv::Error,
    },
    #[error("Invalid timestamp '{value}' in '{source_name}' at data row {row}")]
    InvalidTimestamp {
        source_name: String,
        row: usize,
        value: String,
    },
    #[error("Missing required channel '{channel}' in '{source_name}'")]
    MissingRequiredChannel {
        source_name: String,
        channel: String,
    },
    #[error("Log '{0}' does not name a boat")]
    EmptyBoatId(String),
}

/// Column and file-name conventions used when reading logs.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Prefix stripped from file names to get the boat identity.
    pub file_prefix: String,
    pub timestamp_channel: String,
    pub latitude_channel: String,
    pub longitude_channel: String,
    pub apparent_wind_angle_channel: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            file_prefix: "data_".to_string(),
            timestamp_channel: "DATETIME".to_string(),
            latitude_channel: "LATITUDE_GPS_unk".to_string(),
            longitude_channel: "LONGITUDE_GPS_unk".to_string(),
            apparent_wind_angle_channel: "AWA_SGP_deg".to_string(),
        }
    }
}

/// Derive the boat identity from a log file name.
///
/// `data_Alpha.csv` → `Alpha`. Any leading directories are ignored.
pub fn boat_id_from_source_name(source_name: &str, prefix: &str) -> String {
    let file_name = Path::new(source_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source_name);
    let stem = file_name
        .strip_suffix(".csv")
        .or_else(|| file_name.strip_suffix(".CSV"))
        .unwrap_or(file_name);
    let stem = stem.trim();
    stem.strip_prefix(prefix).unwrap_or(stem).trim().to_string()
}

/// Ingest named log sources, in order, into one dataset.
///
/// Sources that map to the same boat are concatenated before sorting.
pub fn ingest<R: Read>(
    sources: impl IntoIterator<Item = (String, R)>,
    options: &IngestOptions,
) -> Result<Dataset, IngestError> {
    let mut tracks: Vec<BoatTrack> = Vec::new();
    let mut track_index: HashMap<String, usize> = HashMap::new();
    let mut channels: Vec<String> = Vec::new();

    for (source_name, reader) in sources {
        let boat_id = boat_id_from_source_name(&source_name, &options.file_prefix);
        if boat_id.is_empty() {
            return Err(IngestError::EmptyBoatId(source_name));
        }

        let (samples, headers) = read_log(&source_name, &boat_id, reader, options)?;
        tracing::info!(
            "Read {} rows for boat '{}' from {}",
            samples.len(),
            boat_id,
            source_name
        );

        for header in headers {
            if !channels.contains(&header) {
                channels.push(header);
            }
        }

        match track_index.get(&boat_id) {
            Some(&i) => {
                tracing::debug!("Appending {} to existing track '{}'", source_name, boat_id);
                tracks[i].samples.extend(samples);
            }
            None => {
                track_index.insert(boat_id.clone(), tracks.len());
                tracks.push(BoatTrack { boat_id, samples });
            }
        }
    }

    for track in &mut tracks {
        // Stable: duplicate timestamps keep arrival order
        track.samples.sort_by_key(|s| s.timestamp);
    }

    Ok(Dataset::new(tracks, channels))
}

/// Ingest log files from disk in the given order.
pub fn ingest_files(paths: &[PathBuf], options: &IngestOptions) -> Result<Dataset, IngestError> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|error| IngestError::Io {
            source_name: name.clone(),
            error,
        })?;
        sources.push((name, file));
    }
    ingest(sources, options)
}

/// Scan a directory for `*.csv` logs (name order) and ingest them.
pub fn load_logs_from_dir(dir: &Path, options: &IngestOptions) -> Result<Dataset, IngestError> {
    if !dir.exists() {
        tracing::warn!("Data directory does not exist: {}", dir.display());
        return Ok(Dataset::default());
    }
    let io_err = |error| IngestError::Io {
        source_name: dir.display().to_string(),
        error,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            paths.push(path);
        }
    }
    paths.sort();
    ingest_files(&paths, options)
}

/// Column positions of the channels the engine interprets itself.
struct CoreColumns {
    timestamp: usize,
    latitude: usize,
    longitude: usize,
    apparent_wind_angle: Option<usize>,
}

fn read_log<R: Read>(
    source_name: &str,
    boat_id: &str,
    reader: R,
    options: &IngestOptions,
) -> Result<(Vec<Sample>, Vec<String>), IngestError> {
    let csv_err = |error| IngestError::Csv {
        source_name: source_name.to_string(),
        error,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| {
        column(name).ok_or_else(|| IngestError::MissingRequiredChannel {
            source_name: source_name.to_string(),
            channel: name.to_string(),
        })
    };
    let cols = CoreColumns {
        timestamp: required(options.timestamp_channel.as_str())?,
        latitude: required(options.latitude_channel.as_str())?,
        longitude: required(options.longitude_channel.as_str())?,
        apparent_wind_angle: column(options.apparent_wind_angle_channel.as_str()),
    };
    if cols.apparent_wind_angle.is_none() {
        tracing::warn!(
            "'{}' has no '{}' channel; boat '{}' will have no tack",
            source_name,
            options.apparent_wind_angle_channel,
            boat_id
        );
    }

    let mut samples = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let raw_ts = record.get(cols.timestamp).unwrap_or("");
        let timestamp =
            parse_timestamp(raw_ts).ok_or_else(|| IngestError::InvalidTimestamp {
                source_name: source_name.to_string(),
                row: row + 1,
                value: raw_ts.to_string(),
            })?;

        let number_at = |i: usize| {
            record
                .get(i)
                .and_then(ChannelValue::from_cell)
                .and_then(|v| v.as_f64())
        };
        let position = match (number_at(cols.latitude), number_at(cols.longitude)) {
            (Some(lat), Some(lon)) => Some(Position { lat, lon }),
            _ => None,
        };
        let apparent_wind_angle = cols.apparent_wind_angle.and_then(number_at);

        let channels = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != cols.timestamp)
            .filter_map(|(_, (name, cell))| {
                ChannelValue::from_cell(cell).map(|v| (name.clone(), v))
            })
            .collect();

        samples.push(Sample {
            boat_id: boat_id.to_string(),
            timestamp,
            position,
            apparent_wind_angle,
            tack: apparent_wind_angle.map(Tack::from_apparent_wind_angle),
            channels,
        });
    }

    let channel_names = headers
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != cols.timestamp)
        .map(|(_, h)| h)
        .collect();

    Ok((samples, channel_names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelReading;
    use chrono::{Duration, TimeZone, Utc};
    use std::io::Cursor;

    const HEADER: &str = "DATETIME,LATITUDE_GPS_unk,LONGITUDE_GPS_unk,AWA_SGP_deg,BOAT_SPEED_km_h_1";

    fn source(name: &str, body: &str) -> (String, Cursor<Vec<u8>>) {
        (name.to_string(), Cursor::new(body.as_bytes().to_vec()))
    }

    /// 100 rows at 10 s intervals from midnight.
    fn hundred_rows() -> String {
        let mut csv = format!("{}\n", HEADER);
        for i in 0..100 {
            let t = Utc.with_ymd_and_hms(2025, 1, 19, 0, 0, 0).unwrap() + Duration::seconds(i * 10);
            let awa = if i % 3 == 0 { -40.0 } else { 40.0 };
            csv.push_str(&format!(
                "{},{},151.24,{},{}\n",
                t.format("%Y-%m-%d %H:%M:%S"),
                -33.84 + i as f64 * 1e-4,
                awa,
                30.0 + (i % 7) as f64
            ));
        }
        csv
    }

    #[test]
    fn test_boat_id_from_source_name() {
        assert_eq!(boat_id_from_source_name("data_Alpha.csv", "data_"), "Alpha");
        assert_eq!(boat_id_from_source_name("data_ Beta .csv", "data_"), "Beta");
        assert_eq!(
            boat_id_from_source_name("/logs/data_GBR.csv", "data_"),
            "GBR"
        );
        assert_eq!(boat_id_from_source_name("NZL.csv", "data_"), "NZL");
    }

    #[test]
    fn test_ingest_two_boats_in_source_order() {
        let ds = ingest(
            vec![
                source("data_Beta.csv", &hundred_rows()),
                source("data_Alpha.csv", &hundred_rows()),
            ],
            &IngestOptions::default(),
        )
        .unwrap();

        assert_eq!(ds.boat_ids().collect::<Vec<_>>(), vec!["Beta", "Alpha"]);
        assert_eq!(ds.track("Alpha").unwrap().samples.len(), 100);
        let (start, end) = ds.time_bounds().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 19, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 19, 0, 16, 30).unwrap());
    }

    #[test]
    fn test_ingest_sorts_unsorted_rows_stably() {
        let body = format!(
            "{}\n\
             2025-01-19 00:00:20,1.0,2.0,10,1\n\
             2025-01-19 00:00:10,1.0,2.0,10,2\n\
             2025-01-19 00:00:20,1.0,2.0,10,3\n\
             2025-01-19 00:00:00,1.0,2.0,10,4\n",
            HEADER
        );
        let ds = ingest(vec![source("data_A.csv", &body)], &IngestOptions::default()).unwrap();
        let samples = &ds.track("A").unwrap().samples;
        assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        let speeds: Vec<f64> = samples
            .iter()
            .map(|s| s.channels["BOAT_SPEED_km_h_1"].as_f64().unwrap())
            .collect();
        // Tied rows at 00:00:20 keep their original order (1 before 3)
        assert_eq!(speeds, vec![4.0, 2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_ingest_derives_tack() {
        let body = format!(
            "{}\n\
             2025-01-19 00:00:00,1.0,2.0,5,1\n\
             2025-01-19 00:00:10,1.0,2.0,-5,1\n\
             2025-01-19 00:00:20,1.0,2.0,0,1\n\
             2025-01-19 00:00:30,1.0,2.0,,1\n",
            HEADER
        );
        let ds = ingest(vec![source("data_A.csv", &body)], &IngestOptions::default()).unwrap();
        let tacks: Vec<Option<Tack>> = ds
            .track("A")
            .unwrap()
            .samples
            .iter()
            .map(|s| s.tack)
            .collect();
        assert_eq!(
            tacks,
            vec![Some(Tack::Starboard), Some(Tack::Port), Some(Tack::Port), None]
        );
    }

    #[test]
    fn test_boat_without_wind_angle_has_no_tack() {
        let body = "DATETIME,LATITUDE_GPS_unk,LONGITUDE_GPS_unk\n2025-01-19 00:00:00,1.0,2.0\n";
        let ds = ingest(vec![source("data_A.csv", body)], &IngestOptions::default()).unwrap();
        assert_eq!(ds.track("A").unwrap().samples[0].tack, None);
    }

    #[test]
    fn test_same_boat_sources_are_concatenated() {
        let first = format!("{}\n2025-01-19 00:00:10,1.0,2.0,5,1\n", HEADER);
        let second = format!("{}\n2025-01-19 00:00:00,1.0,2.0,5,2\n", HEADER);
        let ds = ingest(
            vec![source("data_A.csv", &first), source("data_ A.csv", &second)],
            &IngestOptions::default(),
        )
        .unwrap();
        assert_eq!(ds.tracks().len(), 1);
        let samples = &ds.track("A").unwrap().samples;
        assert_eq!(samples.len(), 2);
        assert!(samples[0].timestamp < samples[1].timestamp);
    }

    #[test]
    fn test_channel_union_and_missing_values() {
        let alpha = format!("{}\n2025-01-19 00:00:00,1.0,2.0,5,12\n", HEADER);
        let beta = "DATETIME,LATITUDE_GPS_unk,LONGITUDE_GPS_unk,TWS_SGP_km_h_1\n\
                    2025-01-19 00:00:00,1.0,2.0,20\n";
        let ds = ingest(
            vec![source("data_Alpha.csv", &alpha), source("data_Beta.csv", beta)],
            &IngestOptions::default(),
        )
        .unwrap();

        assert_eq!(
            ds.channels(),
            &[
                "LATITUDE_GPS_unk",
                "LONGITUDE_GPS_unk",
                "AWA_SGP_deg",
                "BOAT_SPEED_km_h_1",
                "TWS_SGP_km_h_1"
            ]
        );
        let beta_sample = &ds.track("Beta").unwrap().samples[0];
        assert_eq!(
            ds.reading(beta_sample, "BOAT_SPEED_km_h_1"),
            ChannelReading::Missing
        );
    }

    #[test]
    fn test_blank_coordinates_give_no_position() {
        let body = format!("{}\n2025-01-19 00:00:00,,2.0,5,1\n", HEADER);
        let ds = ingest(vec![source("data_A.csv", &body)], &IngestOptions::default()).unwrap();
        assert_eq!(ds.track("A").unwrap().samples[0].position, None);
    }

    #[test]
    fn test_invalid_timestamp_rejects_whole_load() {
        let good = hundred_rows();
        let bad = format!(
            "{}\n2025-01-19 00:00:00,1.0,2.0,5,1\nyesterday,1.0,2.0,5,1\n",
            HEADER
        );
        let err = ingest(
            vec![source("data_Good.csv", &good), source("data_Bad.csv", &bad)],
            &IngestOptions::default(),
        )
        .unwrap_err();
        match err {
            IngestError::InvalidTimestamp {
                source_name,
                row,
                value,
            } => {
                assert_eq!(source_name, "data_Bad.csv");
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_timestamp_channel_errors() {
        let body = "TIME,LATITUDE_GPS_unk,LONGITUDE_GPS_unk\n00:00,1.0,2.0\n";
        let err = ingest(vec![source("data_A.csv", body)], &IngestOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingRequiredChannel { ref channel, .. } if channel == "DATETIME"
        ));
    }

    #[test]
    fn test_empty_boat_id_errors() {
        let err = ingest(
            vec![source("data_.csv", &hundred_rows())],
            &IngestOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::EmptyBoatId(_)));
    }

    #[test]
    fn test_ragged_row_errors() {
        let body = format!("{}\n2025-01-19 00:00:00,1.0\n", HEADER);
        let err = ingest(vec![source("data_A.csv", &body)], &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Csv { .. }));
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let ds = load_logs_from_dir(
            Path::new("/definitely/not/here"),
            &IngestOptions::default(),
        )
        .unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn test_load_bundled_data_dir() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let ds = load_logs_from_dir(&dir, &IngestOptions::default()).unwrap();
        assert_eq!(ds.boat_ids().collect::<Vec<_>>(), vec!["Alpha", "Beta"]);
        assert_eq!(ds.sample_count(), 60);
        assert!(ds.has_channel("TRK_LEG_NUM_unk"));
        // Blank speed cell is absent, not zero
        let beta = &ds.track("Beta").unwrap().samples[7];
        assert!(!beta.channels.contains_key("BOAT_SPEED_km_h_1"));
    }
}
