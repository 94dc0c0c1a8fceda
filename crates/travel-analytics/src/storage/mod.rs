//! Storage layer for travel-analytics.
//!
//! This module provides `SQLite`-based persistent storage for flights and
//! cached weather snapshots.

pub mod migrations;
pub mod schema;
mod seed;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{city_key, Flight, FlightFilter, NewFlight, WeatherCache};

pub use seed::sample_flights;

/// Storage format for scheduled departure/arrival times.
const NAIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Columns selected for every flight query, in `row_to_flight` order.
const FLIGHT_COLUMNS: &str = "id, flight_number, airline, origin, destination, \
                              departure_time, arrival_time, status, created_at";

/// Storage engine for flights and the weather cache.
///
/// Wraps a single `SQLite` connection. The connection is guarded by a mutex
/// so one `Storage` can be shared between request handlers; each method holds
/// the lock for a single statement (or one transaction when seeding).
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps readers from blocking the occasional cache write
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the database, flushing any pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` refuses to close the connection.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| Error::internal("storage lock poisoned"))?;
        conn.close().map_err(|(_, err)| Error::DatabaseQuery(err))?;
        info!("Database at {} closed", self.path.display());
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("storage lock poisoned"))
    }

    /// Poison the connection lock so every later call fails.
    #[cfg(test)]
    pub(crate) fn poison_lock(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.conn.lock();
            panic!("poisoning storage lock");
        }));
    }

    /// Check that the database answers queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn ping(&self) -> Result<()> {
        let _: i64 = self.conn()?.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }

    // === Flights ===

    /// Insert a flight, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_flight(&self, flight: &NewFlight) -> Result<i64> {
        let conn = self.conn()?;
        let id = Self::insert_flight_with(&conn, flight)?;
        debug!("Inserted flight {} with id {}", flight.flight_number, id);
        Ok(id)
    }

    fn insert_flight_with(conn: &Connection, flight: &NewFlight) -> Result<i64> {
        conn.execute(
            r"
            INSERT INTO flights (
                flight_number, airline, origin, destination,
                departure_time, arrival_time, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                flight.flight_number,
                flight.airline,
                flight.origin,
                flight.destination,
                flight.departure_time.map(format_naive),
                flight.arrival_time.map(format_naive),
                flight.status,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert the sample flights if the flights table is empty.
    ///
    /// Returns the number of flights inserted (zero when data already exists).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn seed_sample_flights(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        if existing > 0 {
            debug!("Flights table has {} rows, skipping seed", existing);
            return Ok(0);
        }

        let flights = sample_flights();
        for flight in &flights {
            Self::insert_flight_with(&tx, flight)?;
        }
        tx.commit()?;

        info!("Seeded {} sample flights", flights.len());
        Ok(flights.len())
    }

    /// List flights matching every supplied filter, in storage order.
    ///
    /// Origin and destination match exactly after upper-casing; airline is a
    /// case-insensitive substring match. Blank filters are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_flights(&self, filter: &FlightFilter) -> Result<Vec<Flight>> {
        let filter = filter.normalized();
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(origin) = filter.origin {
            values.push(origin);
            clauses.push(format!("origin = ?{}", values.len()));
        }
        if let Some(destination) = filter.destination {
            values.push(destination);
            clauses.push(format!("destination = ?{}", values.len()));
        }
        if let Some(airline) = filter.airline {
            values.push(format!("%{}%", escape_like(&airline)));
            clauses.push(format!("airline LIKE ?{} ESCAPE '\\'", values.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights{where_clause} ORDER BY id");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let flights = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_flight)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Listed {} flights", flights.len());
        Ok(flights)
    }

    /// Get a flight by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_flight(&self, id: i64) -> Result<Option<Flight>> {
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?1");
        let flight = self
            .conn()?
            .query_row(&sql, [id], Self::row_to_flight)
            .optional()?;
        Ok(flight)
    }

    /// Count all flights.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_all(&self) -> Result<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count flights with exactly the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_by_status(&self, status: &str) -> Result<i64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM flights WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Weather cache ===

    /// Get the cached weather for a city (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_weather_cache(&self, city: &str) -> Result<Option<WeatherCache>> {
        let entry = self
            .conn()?
            .query_row(
                r"
                SELECT city, temperature, conditions, wind_speed, timestamp
                FROM weather_cache WHERE city = ?1
                ",
                [city_key(city)],
                Self::row_to_weather,
            )
            .optional()?;
        Ok(entry)
    }

    /// Insert or replace the cached weather for a city.
    ///
    /// A single statement keyed on the unique city index, so concurrent
    /// refreshes of one city leave exactly one row (last writer wins).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_weather_cache(&self, entry: &WeatherCache) -> Result<()> {
        let city = city_key(&entry.city);
        self.conn()?.execute(
            r"
            INSERT INTO weather_cache (city, temperature, conditions, wind_speed, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(city) DO UPDATE SET
                temperature = excluded.temperature,
                conditions = excluded.conditions,
                wind_speed = excluded.wind_speed,
                timestamp = excluded.timestamp
            ",
            params![
                city,
                entry.temperature,
                entry.conditions,
                entry.wind_speed,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        debug!("Stored weather snapshot for {}", city);
        Ok(())
    }

    /// Convert a database row to a Flight struct.
    fn row_to_flight(row: &rusqlite::Row) -> rusqlite::Result<Flight> {
        let departure: Option<String> = row.get(5)?;
        let arrival: Option<String> = row.get(6)?;
        let created_at: String = row.get(8)?;

        Ok(Flight {
            id: row.get(0)?,
            flight_number: row.get(1)?,
            airline: row.get(2)?,
            origin: row.get(3)?,
            destination: row.get(4)?,
            departure_time: departure.as_deref().and_then(parse_naive),
            arrival_time: arrival.as_deref().and_then(parse_naive),
            status: row.get(7)?,
            created_at: parse_utc(&created_at),
        })
    }

    /// Convert a database row to a `WeatherCache` struct.
    fn row_to_weather(row: &rusqlite::Row) -> rusqlite::Result<WeatherCache> {
        let temperature: Option<f64> = row.get(1)?;
        let conditions: Option<String> = row.get(2)?;
        let wind_speed: Option<f64> = row.get(3)?;
        let timestamp: String = row.get(4)?;

        Ok(WeatherCache {
            city: row.get(0)?,
            temperature: temperature.unwrap_or_default(),
            conditions: conditions.unwrap_or_default(),
            wind_speed: wind_speed.unwrap_or_default(),
            timestamp: parse_utc(&timestamp),
        })
    }
}

fn format_naive(value: NaiveDateTime) -> String {
    value.format(NAIVE_TIME_FORMAT).to_string()
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, NAIVE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|_| warn!("Unparseable flight time: {}", value))
        .ok()
}

/// Parse a stored RFC 3339 timestamp.
///
/// Unreadable values are treated as the epoch so a stale cache entry is
/// refreshed instead of served.
fn parse_utc(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |_| {
            warn!("Unparseable timestamp: {}", value);
            DateTime::<Utc>::UNIX_EPOCH
        },
        |dt| dt.with_timezone(&Utc),
    )
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status;
    use chrono::{Duration, NaiveDate};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn seeded_storage() -> Storage {
        let storage = create_test_storage();
        storage.seed_sample_flights().unwrap();
        storage
    }

    fn snapshot(city: &str, temperature: f64) -> WeatherCache {
        WeatherCache {
            city: city.to_string(),
            temperature,
            conditions: "rain".to_string(),
            wind_speed: 8.0,
            timestamp: Utc::now(),
        }
    }

    fn weather_rows(storage: &Storage, city: &str) -> i64 {
        storage
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM weather_cache WHERE city = ?1",
                [city],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("travel.db");

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.path(), path.as_path());
        assert!(path.exists());
        storage.close().unwrap();
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("travel.db");

        let storage = Storage::open(&path).unwrap();
        storage.seed_sample_flights().unwrap();
        storage.close().unwrap();

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.count_all().unwrap(), 2);
        assert_eq!(storage.seed_sample_flights().unwrap(), 0);
    }

    #[test]
    fn test_ping() {
        let storage = create_test_storage();
        assert!(storage.ping().is_ok());
    }

    #[test]
    fn test_poisoned_lock_fails_queries() {
        let storage = seeded_storage();
        storage.poison_lock();

        let err = storage.ping().unwrap_err();
        assert!(err.to_string().contains("storage lock poisoned"));
        assert!(storage.count_all().is_err());
    }

    #[test]
    fn test_seed_only_when_empty() {
        let storage = create_test_storage();
        assert_eq!(storage.seed_sample_flights().unwrap(), 2);
        assert_eq!(storage.seed_sample_flights().unwrap(), 0);
        assert_eq!(storage.count_all().unwrap(), 2);
    }

    #[test]
    fn test_list_flights_no_filters_returns_seeded() {
        let storage = seeded_storage();
        let flights = storage.list_flights(&FlightFilter::default()).unwrap();

        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].flight_number, "AA123");
        assert_eq!(flights[1].flight_number, "UA456");
    }

    #[test]
    fn test_list_flights_by_origin_is_case_insensitive_on_input() {
        let storage = seeded_storage();
        let filter = FlightFilter {
            origin: Some("jfk".to_string()),
            ..FlightFilter::default()
        };

        let flights = storage.list_flights(&filter).unwrap();
        assert_eq!(flights.len(), 1);
        assert!(flights.iter().all(|f| f.origin == "JFK"));
    }

    #[test]
    fn test_list_flights_filters_are_anded() {
        let storage = seeded_storage();
        let filter = FlightFilter {
            origin: Some("JFK".to_string()),
            destination: Some("ORD".to_string()),
            airline: None,
        };
        assert!(storage.list_flights(&filter).unwrap().is_empty());

        let filter = FlightFilter {
            origin: Some("sfo".to_string()),
            destination: Some("ord".to_string()),
            airline: Some("UNITED".to_string()),
        };
        let flights = storage.list_flights(&filter).unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].flight_number, "UA456");
    }

    #[test]
    fn test_list_flights_airline_substring() {
        let storage = seeded_storage();
        let filter = FlightFilter {
            airline: Some("airlines".to_string()),
            ..FlightFilter::default()
        };
        assert_eq!(storage.list_flights(&filter).unwrap().len(), 2);

        let filter = FlightFilter {
            airline: Some("merican".to_string()),
            ..FlightFilter::default()
        };
        let flights = storage.list_flights(&filter).unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].airline.as_deref(), Some("American Airlines"));
    }

    #[test]
    fn test_list_flights_airline_wildcards_match_literally() {
        let storage = seeded_storage();
        let filter = FlightFilter {
            airline: Some("%".to_string()),
            ..FlightFilter::default()
        };
        assert!(storage.list_flights(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let storage = seeded_storage();
        let filter = FlightFilter {
            origin: Some(String::new()),
            destination: Some("  ".to_string()),
            airline: Some(String::new()),
        };
        assert_eq!(storage.list_flights(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_flights_allowed() {
        let storage = create_test_storage();
        let flight = NewFlight::new("AA123", "JFK", "LAX");
        let first = storage.insert_flight(&flight).unwrap();
        let second = storage.insert_flight(&flight).unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.count_all().unwrap(), 2);
    }

    #[test]
    fn test_get_flight_round_trips_times() {
        let storage = create_test_storage();
        let departure = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let arrival = departure + Duration::minutes(210);
        let id = storage
            .insert_flight(
                &NewFlight::new("AA123", "JFK", "LAX")
                    .airline("American Airlines")
                    .schedule(departure, arrival)
                    .status(status::ON_TIME),
            )
            .unwrap();

        let flight = storage.get_flight(id).unwrap().unwrap();
        assert_eq!(flight.id, id);
        assert_eq!(flight.departure_time, Some(departure));
        assert_eq!(flight.arrival_time, Some(arrival));
        assert_eq!(flight.status, "on_time");
    }

    #[test]
    fn test_get_flight_without_times() {
        let storage = create_test_storage();
        let id = storage
            .insert_flight(&NewFlight::new("DL1", "ATL", "BOS"))
            .unwrap();

        let flight = storage.get_flight(id).unwrap().unwrap();
        assert!(flight.departure_time.is_none());
        assert!(flight.arrival_time.is_none());
        assert_eq!(flight.status, status::SCHEDULED);
    }

    #[test]
    fn test_get_flight_nonexistent() {
        let storage = seeded_storage();
        assert!(storage.get_flight(99999).unwrap().is_none());
    }

    #[test]
    fn test_counts() {
        let storage = seeded_storage();
        storage
            .insert_flight(&NewFlight::new("BA1", "LHR", "JFK").status(status::CANCELED))
            .unwrap();

        assert_eq!(storage.count_all().unwrap(), 3);
        assert_eq!(storage.count_by_status(status::ON_TIME).unwrap(), 1);
        assert_eq!(storage.count_by_status(status::DELAYED).unwrap(), 1);
        assert_eq!(storage.count_by_status(status::CANCELED).unwrap(), 1);
        assert_eq!(storage.count_by_status("diverted").unwrap(), 0);
    }

    #[test]
    fn test_weather_cache_missing() {
        let storage = create_test_storage();
        assert!(storage.get_weather_cache("london").unwrap().is_none());
    }

    #[test]
    fn test_weather_cache_lookup_is_case_insensitive() {
        let storage = create_test_storage();
        storage.upsert_weather_cache(&snapshot("London", 52.0)).unwrap();

        let entry = storage.get_weather_cache("LONDON").unwrap().unwrap();
        assert_eq!(entry.city, "london");
        assert!((entry.temperature - 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let storage = create_test_storage();
        storage.upsert_weather_cache(&snapshot("london", 52.0)).unwrap();

        let mut updated = snapshot("London", 40.0);
        updated.conditions = "fog".to_string();
        storage.upsert_weather_cache(&updated).unwrap();

        let entry = storage.get_weather_cache("london").unwrap().unwrap();
        assert_eq!(entry.conditions, "fog");
        assert!((entry.temperature - 40.0).abs() < f64::EPSILON);
        assert_eq!(weather_rows(&storage, "london"), 1);
    }

    #[test]
    fn test_concurrent_upserts_leave_one_row() {
        let storage = std::sync::Arc::new(create_test_storage());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let storage = std::sync::Arc::clone(&storage);
                std::thread::spawn(move || {
                    storage
                        .upsert_weather_cache(&snapshot("tokyo", f64::from(i)))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(weather_rows(&storage, "tokyo"), 1);
    }

    #[test]
    fn test_weather_timestamp_round_trips() {
        let storage = create_test_storage();
        let mut entry = snapshot("miami", 80.0);
        entry.timestamp = Utc::now() - Duration::hours(2);
        storage.upsert_weather_cache(&entry).unwrap();

        let stored = storage.get_weather_cache("miami").unwrap().unwrap();
        assert_eq!(stored.timestamp, entry.timestamp);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("United"), "United");
    }

    #[test]
    fn test_parse_utc_falls_back_to_epoch() {
        assert_eq!(parse_utc("not a time"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }
}
