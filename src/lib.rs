/*!
# Onboarding Dashboard

A password-gated web dashboard over a hand-maintained client onboarding
spreadsheet, built in Rust.

## Overview

The dashboard fetches rows from a published sheet (or a local CSV during
development), normalizes them into typed onboarding records, and serves a
single-page view with month-to-date KPIs, interactive filters, charts, and a
CSV download of the filtered selection. All data lives in memory; a manual
refresh re-fetches the sheet.

## Architecture

The application follows a fetch-normalize-derive pipeline behind a small
web layer:

### Data Layer
- **source**: fetches raw rows from a CSV file or a published-sheet URL
- **normalize**: maps hand-maintained headers onto the record schema,
  parsing dates, scores, and checklist booleans with null sentinels
- **record**: the typed domain model (records, metrics, filter state)

### Derivation Layer
- **metrics**: month-to-date and prior-month KPI computation
- **filter**: predicate filtering, free-text search, and dropdown options
- **chart**: SVG chart rendering over the filtered record set
- **export**: CSV serialization of the filtered selection

### Web Layer
- **app**: axum routing, the in-memory snapshot, and request handlers
- **auth**: shared-key sessions and the SSO domain allow-list
- **config**: declarative JSON startup settings

## REST API Endpoints

- `GET /` - the dashboard page (redirects to `/login` when unauthenticated)
- `GET|POST /login`, `POST /logout` - shared-key session management
- `GET /api/summary` - month-to-date KPIs plus prior-month comparison
- `GET /api/records` - filtered records and their metric set
- `GET /api/options` - distinct dropdown values and the data date extent
- `POST /api/refresh` - re-fetch the sheet and replace the snapshot
- `GET /api/export.csv` - download the filtered selection
- `GET /api/chart/{kind}` - SVG charts (`status`, `reps`, `timeline`,
  `days`, `sentiment`, `checklist`)
*/

pub mod app;
pub mod auth;
pub mod chart;
pub mod config;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod source;

pub use record::{Checklist, FilterSpec, MetricSet, Record, Sentiment, Status};
