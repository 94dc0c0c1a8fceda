//! `SQLite` schema definitions for travel-analytics.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the flights table.
pub const CREATE_FLIGHTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flight_number TEXT NOT NULL,
    airline TEXT,
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    departure_time TEXT,
    arrival_time TEXT,
    status TEXT NOT NULL DEFAULT 'scheduled',
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `origin` for filtering.
pub const CREATE_ORIGIN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_origin ON flights(origin)
";

/// SQL statement to create an index on `destination` for filtering.
pub const CREATE_DESTINATION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_destination ON flights(destination)
";

/// SQL statement to create an index on `status` for the analytics counts.
pub const CREATE_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_status ON flights(status)
";

/// SQL statement to create the weather cache table.
pub const CREATE_WEATHER_CACHE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS weather_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    city TEXT NOT NULL,
    temperature REAL,
    conditions TEXT,
    wind_speed REAL,
    timestamp TEXT NOT NULL
)
";

/// SQL statement making `city` the conflict target for weather upserts.
///
/// Created by migration 2 after any duplicate rows have been collapsed.
pub const CREATE_WEATHER_CITY_UNIQUE_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_weather_cache_city ON weather_cache(city)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FLIGHTS_TABLE,
    CREATE_ORIGIN_INDEX,
    CREATE_DESTINATION_INDEX,
    CREATE_STATUS_INDEX,
    CREATE_WEATHER_CACHE_TABLE,
    CREATE_METADATA_TABLE,
];
