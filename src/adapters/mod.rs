// Adapters layer: concrete implementations for external systems (http, storage, spreadsheets).

pub mod http;
pub mod spreadsheet;
pub mod storage;
