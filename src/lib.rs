/*!
# Attendance Tracker

A single-user attendance tracker for faculty and teaching assistants, built in Rust.

## Overview

An instructor signs in, picks one of their classes, takes attendance for the
current session and reviews per-student statistics. Everything lives in
memory except the sign-in state, which is kept in a small local key-value
file so it survives a restart.

## Architecture

### Attendance Store
- Owns every class together with its students and sessions
- Creates sessions (newest first, everyone present by default)
- Upserts attendance records and recomputes the marked student's
  percentage from the full session history of the class
- Notifies subscribed listeners after each applied mutation

### Collaborators
- **Auth store** - Argon2-verified sign-in against a built-in directory,
  persisted through the key-value store
- **Export** - Class summaries and single-session sheets as XLSX (and CSV)
- **Stats** - Rankings, highest/lowest/average and at-risk students

## Key Invariants

- At most one attendance record per student per session
- `attendance_percentage` is always `round(100 * present / total)` over the
  sessions holding a record for that student, and stays untouched while
  there are none
- Sessions of a class are ordered most-recent-first

## Modules

- **model**: Students, sessions, attendance records and classes
- **store**: The attendance store and its mutation operations
- **seed**: Built-in demo classes and rosters
- **stats**: Derived per-class statistics
- **export**: XLSX/CSV export and JSON class import
- **auth**: Sign-in state and user profile
- **kv**: Compressed key-value persistence
- **config**: Environment-driven configuration
- **logger**: Log output setup
- **error**: Error types
*/

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod kv;
pub mod logger;
pub mod model;
pub mod seed;
pub mod stats;
pub mod store;

/// Re-export the types most callers need
pub use error::*;
pub use model::*;
pub use stats::{AttendanceBand, ClassStats};
pub use store::{AttendanceStore, ListenerId, StoreEvent};
