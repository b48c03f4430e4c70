//! Integration tests for the station engine using the `TestWorld` harness and
//! seeded property checks over `StationWorld`.
